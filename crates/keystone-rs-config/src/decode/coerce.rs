//! Weak scalar typing: one coercion rule per destination kind.

use crate::Scalar;

/// Declared type of a scalar destination, as requested by the deserializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    /// `bool` fields.
    Bool,
    /// Signed and unsigned integer fields of any width.
    Int,
    /// `f32` and `f64` fields.
    Float,
    /// `String`, `char`, paths and unit enum variants.
    Str,
}

type Coercion = fn(&Scalar) -> Result<Scalar, String>;

impl ScalarKind {
    /// Kind a scalar already has, or `None` for null.
    pub fn of(value: &Scalar) -> Option<Self> {
        match value {
            Scalar::Null => None,
            Scalar::Bool(_) => Some(ScalarKind::Bool),
            Scalar::Int(_) | Scalar::Uint(_) => Some(ScalarKind::Int),
            Scalar::Float(_) => Some(ScalarKind::Float),
            Scalar::Str(_) => Some(ScalarKind::Str),
        }
    }

    /// Coerce `value` into this kind's canonical scalar variant.
    ///
    /// Integers stay [`Scalar::Int`] unless they only fit in a `u64`; the
    /// visitor for the destination type checks the final width.
    pub fn coerce(self, value: &Scalar) -> Result<Scalar, String> {
        let rule: Coercion = match self {
            ScalarKind::Bool => coerce_bool,
            ScalarKind::Int => coerce_int,
            ScalarKind::Float => coerce_float,
            ScalarKind::Str => coerce_str,
        };
        rule(value)
    }
}

fn unexpected(expected: &str, value: &Scalar) -> String {
    format!("expected {expected}, found {value}")
}

fn coerce_bool(value: &Scalar) -> Result<Scalar, String> {
    let value = match value {
        Scalar::Bool(value) => *value,
        Scalar::Int(value) => *value != 0,
        Scalar::Uint(value) => *value != 0,
        Scalar::Float(value) => *value != 0.0,
        Scalar::Str(text) => match text.as_str() {
            "" => false,
            "1" | "t" | "T" | "true" | "TRUE" | "True" => true,
            "0" | "f" | "F" | "false" | "FALSE" | "False" => false,
            _ => return Err(format!("{text:?} is not a valid bool")),
        },
        Scalar::Null => return Err(unexpected("bool", value)),
    };
    Ok(Scalar::Bool(value))
}

fn coerce_int(value: &Scalar) -> Result<Scalar, String> {
    let value = match value {
        Scalar::Int(value) => Scalar::Int(*value),
        Scalar::Uint(value) => Scalar::Uint(*value),
        Scalar::Bool(value) => Scalar::Int(i64::from(*value)),
        Scalar::Float(value) => float_to_int(*value)?,
        Scalar::Str(text) if text.is_empty() => Scalar::Int(0),
        Scalar::Str(text) => match text.parse::<i64>() {
            Ok(value) => Scalar::Int(value),
            Err(err) => text
                .parse::<u64>()
                .map(Scalar::Uint)
                .map_err(|_| format!("{text:?} is not a valid integer: {err}"))?,
        },
        Scalar::Null => return Err(unexpected("integer", value)),
    };
    Ok(value)
}

fn float_to_int(value: f64) -> Result<Scalar, String> {
    let value = value.trunc();
    if value.is_finite() && value >= i64::MIN as f64 && value < i64::MAX as f64 {
        Ok(Scalar::Int(value as i64))
    } else if value.is_finite() && value >= 0.0 && value < u64::MAX as f64 {
        Ok(Scalar::Uint(value as u64))
    } else {
        Err(format!("{value} does not fit in an integer"))
    }
}

fn coerce_float(value: &Scalar) -> Result<Scalar, String> {
    let value = match value {
        Scalar::Float(value) => *value,
        Scalar::Int(value) => *value as f64,
        Scalar::Uint(value) => *value as f64,
        Scalar::Bool(value) => f64::from(u8::from(*value)),
        Scalar::Str(text) if text.is_empty() => 0.0,
        Scalar::Str(text) => text
            .parse()
            .map_err(|err| format!("{text:?} is not a valid float: {err}"))?,
        Scalar::Null => return Err(unexpected("float", value)),
    };
    Ok(Scalar::Float(value))
}

fn coerce_str(value: &Scalar) -> Result<Scalar, String> {
    let value = match value {
        Scalar::Str(text) => text.clone(),
        Scalar::Bool(true) => "1".to_string(),
        Scalar::Bool(false) => "0".to_string(),
        Scalar::Int(value) => value.to_string(),
        Scalar::Uint(value) => value.to_string(),
        Scalar::Float(value) => value.to_string(),
        Scalar::Null => return Err(unexpected("string", value)),
    };
    Ok(Scalar::Str(value))
}
