//! serde [`Deserializer`] over config values.
//!
//! Scalars are coerced to whatever the visitor asks for, so `"true"`
//! decodes into a `bool` and `8` into a `String`. Errors carry the dotted
//! path of the value that failed.

use super::coerce::ScalarKind;
use crate::tree::join_path;
use crate::{ConfigTree, ConfigValue, Scalar};
use serde::de::value::{BorrowedStrDeserializer, StrDeserializer};
use serde::de::{
    self, DeserializeSeed, Deserializer, EnumAccess, IntoDeserializer, MapAccess, SeqAccess,
    VariantAccess, Visitor,
};
use serde::forward_to_deserialize_any;
use std::fmt;

/// Decode failure before it is turned into a `ConfigError`.
#[derive(Debug)]
pub(crate) struct DecodeError {
    pub(crate) field: Option<String>,
    pub(crate) value: String,
    pub(crate) message: String,
}

impl DecodeError {
    /// Attach the location unless a deeper value already claimed the error.
    fn at(mut self, path: &str, value: &ConfigValue) -> Self {
        if self.field.is_none() {
            self.field = Some(path.to_string());
            self.value = value.describe();
        }
        self
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for DecodeError {}

impl de::Error for DecodeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self {
            field: None,
            value: String::new(),
            message: msg.to_string(),
        }
    }
}

pub(crate) struct ValueDeserializer<'de> {
    value: &'de ConfigValue,
    path: String,
}

impl<'de> ValueDeserializer<'de> {
    pub(crate) fn new(value: &'de ConfigValue, path: String) -> Self {
        Self { value, path }
    }

    fn fail(&self, message: impl Into<String>) -> DecodeError {
        DecodeError {
            field: Some(self.path.clone()),
            value: self.value.describe(),
            message: message.into(),
        }
    }

    fn shape_error(&self, expected: &str) -> DecodeError {
        self.fail(format!("expected {expected}, found {}", self.value.shape()))
    }

    fn deserialize_kind<V: Visitor<'de>>(
        self,
        kind: ScalarKind,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        let ConfigValue::Scalar(scalar) = self.value else {
            return Err(self.shape_error("scalar"));
        };
        let coerced = kind.coerce(scalar).map_err(|message| self.fail(message))?;
        visit_scalar(coerced, visitor).map_err(|err| err.at(&self.path, self.value))
    }
}

fn visit_scalar<'de, V: Visitor<'de>>(scalar: Scalar, visitor: V) -> Result<V::Value, DecodeError> {
    match scalar {
        Scalar::Null => visitor.visit_unit(),
        Scalar::Bool(value) => visitor.visit_bool(value),
        Scalar::Int(value) => visitor.visit_i64(value),
        Scalar::Uint(value) => visitor.visit_u64(value),
        Scalar::Float(value) => visitor.visit_f64(value),
        Scalar::Str(value) => visitor.visit_string(value),
    }
}

macro_rules! deserialize_kind {
    ($kind:expr => $($method:ident)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
                self.deserialize_kind($kind, visitor)
            }
        )*
    };
}

impl<'de> Deserializer<'de> for ValueDeserializer<'de> {
    type Error = DecodeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        let result = match self.value {
            ConfigValue::Scalar(scalar) => visit_scalar(scalar.clone(), visitor),
            ConfigValue::List(items) => visitor.visit_seq(SeqDeserializer::new(items, &self.path)),
            ConfigValue::Map(tree) => visitor.visit_map(MapDeserializer::new(tree, &self.path)),
        };
        result.map_err(|err| err.at(&self.path, self.value))
    }

    deserialize_kind!(ScalarKind::Bool => deserialize_bool);
    deserialize_kind!(ScalarKind::Int =>
        deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64 deserialize_i128
        deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64 deserialize_u128);
    deserialize_kind!(ScalarKind::Float => deserialize_f32 deserialize_f64);
    deserialize_kind!(ScalarKind::Str =>
        deserialize_char deserialize_str deserialize_string deserialize_identifier);

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.value {
            ConfigValue::Scalar(Scalar::Null) => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        let items = match self.value {
            ConfigValue::List(items) => items.as_slice(),
            // A lone scalar lifts into a one-element list.
            ConfigValue::Scalar(scalar) if *scalar != Scalar::Null => {
                std::slice::from_ref(self.value)
            }
            _ => return Err(self.shape_error("list")),
        };
        visitor
            .visit_seq(SeqDeserializer::new(items, &self.path))
            .map_err(|err| err.at(&self.path, self.value))
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        let ConfigValue::Map(tree) = self.value else {
            return Err(self.shape_error("map"));
        };
        visitor
            .visit_map(MapDeserializer::new(tree, &self.path))
            .map_err(|err| err.at(&self.path, self.value))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        let result = match self.value {
            ConfigValue::Scalar(Scalar::Str(variant)) => {
                let variant: StrDeserializer<'_, DecodeError> = variant.as_str().into_deserializer();
                visitor.visit_enum(variant)
            }
            ConfigValue::Map(tree) if tree.len() == 1 => {
                let Some((variant, value)) = tree.entries.first() else {
                    return Err(self.shape_error("enum variant"));
                };
                visitor.visit_enum(EnumDeserializer {
                    variant,
                    value,
                    path: join_path(&self.path, variant),
                })
            }
            _ => return Err(self.shape_error("enum variant")),
        };
        result.map_err(|err| err.at(&self.path, self.value))
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bytes byte_buf unit unit_struct
    }
}

struct MapDeserializer<'de> {
    iter: indexmap::map::Iter<'de, String, ConfigValue>,
    pending: Option<(&'de str, &'de ConfigValue)>,
    path: String,
}

impl<'de> MapDeserializer<'de> {
    fn new(tree: &'de ConfigTree, path: &str) -> Self {
        Self {
            iter: tree.entries.iter(),
            pending: None,
            path: path.to_string(),
        }
    }
}

impl<'de> MapAccess<'de> for MapDeserializer<'de> {
    type Error = DecodeError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, Self::Error> {
        let Some((key, value)) = self.iter.next() else {
            return Ok(None);
        };
        self.pending = Some((key.as_str(), value));
        let key: BorrowedStrDeserializer<'de, DecodeError> = BorrowedStrDeserializer::new(key);
        seed.deserialize(key).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, Self::Error> {
        let (key, value) = self
            .pending
            .take()
            .ok_or_else(|| <DecodeError as de::Error>::custom("map value requested before its key"))?;
        seed.deserialize(ValueDeserializer::new(value, join_path(&self.path, key)))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct SeqDeserializer<'de> {
    iter: std::iter::Enumerate<std::slice::Iter<'de, ConfigValue>>,
    path: String,
}

impl<'de> SeqDeserializer<'de> {
    fn new(items: &'de [ConfigValue], path: &str) -> Self {
        Self {
            iter: items.iter().enumerate(),
            path: path.to_string(),
        }
    }
}

impl<'de> SeqAccess<'de> for SeqDeserializer<'de> {
    type Error = DecodeError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, Self::Error> {
        let Some((idx, item)) = self.iter.next() else {
            return Ok(None);
        };
        let path = format!("{}[{idx}]", self.path);
        seed.deserialize(ValueDeserializer::new(item, path)).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

/// Externally tagged enum written as a single-key map: `{variant: value}`.
struct EnumDeserializer<'de> {
    variant: &'de str,
    value: &'de ConfigValue,
    path: String,
}

impl<'de> EnumAccess<'de> for EnumDeserializer<'de> {
    type Error = DecodeError;
    type Variant = ValueDeserializer<'de>;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, Self::Variant), Self::Error> {
        let variant: BorrowedStrDeserializer<'de, DecodeError> =
            BorrowedStrDeserializer::new(self.variant);
        let variant = seed.deserialize(variant)?;
        Ok((variant, ValueDeserializer::new(self.value, self.path)))
    }
}

impl<'de> VariantAccess<'de> for ValueDeserializer<'de> {
    type Error = DecodeError;

    fn unit_variant(self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(
        self,
        seed: T,
    ) -> Result<T::Value, Self::Error> {
        seed.deserialize(self)
    }

    fn tuple_variant<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_map(visitor)
    }
}
