//! Dynamic message model
//!
//! Messages are untyped at compile time: a [`Message`] maps field names to
//! [`Value`]s and is checked against a registered type only when it meets
//! the encode or decode engine. This is the Rust face of the engine's
//! schema-driven design; nothing here knows about the wire format.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;

use crate::{ProtoError, Result};

/// A dynamically typed field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Bytes(Bytes),
    Message(Message),
    List(Vec<Value>),
    Map(HashMap<MapKey, Value>),
}

/// Key of a map-typed field (the protobuf-legal key space)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Str(String),
}

impl Value {
    /// Variant name used in type-mismatch errors
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::I32(_) | Self::I64(_) | Self::U32(_) | Self::U64(_) => "integer",
            Self::F32(_) | Self::F64(_) => "float",
            Self::Str(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Message(_) => "message",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Raw 64-bit pattern of an integer-compatible value
    ///
    /// Signed variants sign-extend, unsigned variants zero-extend, and
    /// strings go through [`parse_int`]. Floats are rejected; integer
    /// fields never coerce silently from floating point.
    pub(crate) fn to_raw_u64(&self) -> Result<u64> {
        match self {
            Self::I32(v) => Ok(*v as i64 as u64),
            Self::I64(v) => Ok(*v as u64),
            Self::U32(v) => Ok(u64::from(*v)),
            Self::U64(v) => Ok(*v),
            Self::Bool(v) => Ok(u64::from(*v)),
            Self::Str(s) => parse_int(s),
            _ => Err(ProtoError::BadInteger(String::new())),
        }
    }

    /// Floating-point view of a numeric value
    pub(crate) fn to_f64(&self) -> Option<f64> {
        match self {
            Self::F32(v) => Some(f64::from(*v)),
            Self::F64(v) => Some(*v),
            Self::I32(v) => Some(f64::from(*v)),
            Self::I64(v) => Some(*v as f64),
            Self::U32(v) => Some(f64::from(*v)),
            Self::U64(v) => Some(*v as f64),
            Self::Str(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Byte view of a string or bytes value
    pub(crate) fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Str(s) => Some(s.as_bytes()),
            Self::Bytes(b) => Some(b.as_ref()),
            _ => None,
        }
    }
}

impl From<MapKey> for Value {
    fn from(key: MapKey) -> Self {
        match key {
            MapKey::Bool(v) => Self::Bool(v),
            MapKey::Int(v) => Self::I64(v),
            MapKey::Uint(v) => Self::U64(v),
            MapKey::Str(v) => Self::Str(v),
        }
    }
}

impl TryFrom<Value> for MapKey {
    type Error = Value;

    fn try_from(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Bool(v) => Ok(Self::Bool(v)),
            Value::I32(v) => Ok(Self::Int(i64::from(v))),
            Value::I64(v) => Ok(Self::Int(v)),
            Value::U32(v) => Ok(Self::Uint(u64::from(v))),
            Value::U64(v) => Ok(Self::Uint(v)),
            Value::Str(v) => Ok(Self::Str(v)),
            other => Err(other),
        }
    }
}

/// Field-name to value mapping with an optional shared default table
///
/// The default table backs the metatable-style materialization mode: absent
/// fields fall through [`Message::get`] to a per-type table built once and
/// shared by every message decoded against that type. Equality compares the
/// explicitly present fields only.
#[derive(Debug, Clone, Default)]
pub struct Message {
    fields: HashMap<String, Value>,
    defaults: Option<Arc<Message>>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of explicitly present fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Value of a field, falling back to the shared default table
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .get(name)
            .or_else(|| self.defaults.as_ref()?.get(name))
    }

    /// Value of a field, ignoring the default table
    pub fn get_present(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(name.into(), value)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    /// Iterate explicitly present fields in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Shared default table, if one was attached by the decoder
    pub fn defaults(&self) -> Option<&Arc<Message>> {
        self.defaults.as_ref()
    }

    pub(crate) fn set_defaults(&mut self, defaults: Arc<Message>) {
        self.defaults = Some(defaults);
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl FromIterator<(String, Value)> for Message {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
            defaults: None,
        }
    }
}

/// Parse the permissive textual integer forms accepted for 64-bit fields
///
/// Accepts optional `#` markers and sign characters, then either `0x` hex
/// or decimal digits. Returns the two's-complement 64-bit pattern.
pub(crate) fn parse_int(text: &str) -> Result<u64> {
    let mut neg = false;
    let mut rest = text;
    while let Some(ch) = rest.chars().next() {
        match ch {
            '#' | '+' => {}
            '-' => neg = !neg,
            _ => break,
        }
        rest = &rest[1..];
    }
    let value = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else {
        rest.parse::<u64>()
    }
    .map_err(|_| ProtoError::BadInteger(text.to_string()))?;
    Ok(if neg { value.wrapping_neg() } else { value })
}
