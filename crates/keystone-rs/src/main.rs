//! Command-line inspection of layered keystone configuration.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use keystone_rs::InitContext;
use keystone_rs::config::{self, Common, ConfigFs, DirFs, Resolution};
use log::info;
use std::path::PathBuf;

/// Command-line options for the keystone tool.
#[derive(Debug, Parser)]
#[command(name = "keystone", version, about = "Inspect layered service configuration")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve the standard config for an application and print it.
    Resolve {
        /// Directory holding the application's config files.
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Output format for the resolved config.
        #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
        /// Print the applied layers instead of the config.
        #[arg(long)]
        layers: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

/// Entry point for the keystone tool.
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut context = InitContext::new();

    match cli.command {
        Command::Resolve {
            dir,
            format,
            layers,
        } => {
            let files = dir.map(DirFs::new);
            let mut conf = Common::default();
            let resolution = config::load(
                &mut conf,
                files.as_ref().map(|files| files as &dyn ConfigFs),
            )
            .context("failed to resolve config")?;
            context
                .init_logging(&conf.logging)
                .context("failed to initialize logging")?;
            info!("resolved config (layers={})", resolution.layers.len());

            let output = if layers {
                render_layers(&resolution)
            } else {
                match format {
                    OutputFormat::Yaml => {
                        serde_yaml::to_string(&conf).context("failed to render yaml")?
                    }
                    OutputFormat::Json => {
                        serde_json::to_string_pretty(&conf).context("failed to render json")?
                    }
                }
            };
            println!("{}", output.trim_end());
        }
    }
    Ok(())
}

fn render_layers(resolution: &Resolution) -> String {
    resolution
        .layers
        .iter()
        .map(|layer| format!("{}\t{}", layer.source, layer.name))
        .collect::<Vec<_>>()
        .join("\n")
}
