//! Logger construction from the resolved [`Logging`] config.

use env_logger::{Builder, Target};
use keystone_rs_config::Logging;
use log::{Level, LevelFilter};
use std::io::Write;

/// Map a configured level name to a filter. Unknown names fall back to info.
pub fn level_filter(level: &str) -> LevelFilter {
    match level.to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

/// Build an `env_logger` writing to stderr, as text or one JSON object per line.
pub(crate) fn builder(conf: &Logging) -> Builder {
    let mut builder = Builder::new();
    builder
        .filter_level(level_filter(&conf.level))
        .target(Target::Stderr);
    if conf.json {
        builder.format(|buf, record| {
            let line = json_line(
                record.level(),
                record.target(),
                &record.args().to_string(),
                &buf.timestamp_millis().to_string(),
            );
            writeln!(buf, "{line}")
        });
    } else {
        builder.format_timestamp_millis();
    }
    builder
}

fn json_line(level: Level, target: &str, message: &str, time: &str) -> String {
    serde_json::json!({
        "severity": severity(level),
        "message": message,
        "target": target,
        "time": time,
    })
    .to_string()
}

/// Cloud Logging severity names.
fn severity(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARNING",
        Level::Info => "INFO",
        Level::Debug | Level::Trace => "DEBUG",
    }
}
