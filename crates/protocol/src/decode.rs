//! Decode engine
//!
//! Reconstructs a dynamic [`Message`] from wire-format bytes against a
//! registered type. Unknown field numbers are skipped by wire type, never
//! reported; forward-compatible reads are the point of a schema registry.
//! Known fields whose wire type disagrees with their declared kind fail
//! hard, naming the field, the expected wire type, and the byte offset; the
//! one legal substitution is a packed run arriving for a repeated field
//! whose natural wire type is not length-delimited (and vice versa).
//!
//! What an un-set field looks like to the caller is configurable through
//! [`DecodeOptions::default_mode`]; the wire bytes are interpreted the same
//! way in every mode.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;

use crate::codec;
use crate::registry::{Field, Registry, TypeId};
use crate::slice::Slice;
use crate::value::{parse_int, MapKey, Message, Value};
use crate::wire::{make_tag, tag_number, tag_wire_type, FieldKind, WireType};
use crate::{ProtoError, Result};

/// How enum values materialize
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnumMode {
    /// Symbolic constant name, falling back to the integer for values the
    /// enum does not declare
    #[default]
    Name,
    /// Always the integer
    Value,
}

/// How 64-bit integers outside the 32-bit range materialize
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Int64Mode {
    /// Native integer values
    #[default]
    Number,
    /// Decimal strings
    String,
    /// `0x`-prefixed hexadecimal strings
    Hex,
}

/// What an absent field looks like after decode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DefaultMode {
    /// Proto3 types behave like [`DefaultMode::Copy`], proto2 types like
    /// [`DefaultMode::None`]
    #[default]
    Auto,
    /// Absent fields are pre-populated with their declared or zero default
    Copy,
    /// Absent fields fall through to a shared per-type default table
    /// attached to each decoded message
    Lazy,
    /// Absent fields are simply missing
    None,
}

/// Decode-side configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions {
    pub enum_mode: EnumMode,
    pub int64_mode: Int64Mode,
    pub default_mode: DefaultMode,
}

impl Registry {
    /// Decode wire bytes against the named type with default options
    pub fn decode(&self, type_name: &str, bytes: &[u8]) -> Result<Message> {
        self.decode_with(type_name, bytes, DecodeOptions::default())
    }

    /// Decode wire bytes against the named type
    pub fn decode_with(
        &self,
        type_name: &str,
        bytes: &[u8],
        options: DecodeOptions,
    ) -> Result<Message> {
        let type_id = self
            .type_by_name(type_name)
            .ok_or_else(|| ProtoError::unknown_type(type_name))?;
        let mut decoder = Decoder {
            reg: self,
            options,
            default_tables: HashMap::new(),
        };
        let mut message = decoder.new_message(type_id);
        decoder.message(type_id, &mut message, &mut Slice::new(bytes))?;
        Ok(message)
    }

    /// Decode wire bytes, merging fields into an existing message
    ///
    /// The target is used as-is: no default materialization is applied to
    /// it, and fields it already holds are kept unless the input overwrites
    /// them. Nested messages still follow `options`.
    pub fn decode_into(
        &self,
        type_name: &str,
        bytes: &[u8],
        message: &mut Message,
        options: DecodeOptions,
    ) -> Result<()> {
        let type_id = self
            .type_by_name(type_name)
            .ok_or_else(|| ProtoError::unknown_type(type_name))?;
        let mut decoder = Decoder {
            reg: self,
            options,
            default_tables: HashMap::new(),
        };
        decoder.message(type_id, message, &mut Slice::new(bytes))
    }
}

struct Decoder<'r> {
    reg: &'r Registry,
    options: DecodeOptions,
    /// Shared default tables for [`DefaultMode::Lazy`], built once per type
    default_tables: HashMap<TypeId, Arc<Message>>,
}

impl Decoder<'_> {
    fn message(&mut self, type_id: TypeId, message: &mut Message, s: &mut Slice<'_>) -> Result<()> {
        let reg = self.reg;
        while let Some(tag) = s.read_tag()? {
            let field = reg
                .field_by_number(type_id, tag_number(tag) as i32)
                .and_then(|fid| reg.get_field(fid));
            let Some(field) = field else {
                s.skip_value(tag)?;
                continue;
            };
            let is_map = field
                .value_type
                .and_then(|vt| reg.get_type(vt))
                .is_some_and(|vt| vt.is_map);
            if is_map {
                self.map_field(field, message, s)?;
            } else if field.repeated {
                self.repeated_field(field, tag, message, s)?;
            } else {
                self.check_wire_type(field, tag, s)?;
                if let Some(value) = self.field_value(field, s)? {
                    message.insert(self.reg.name_str(field.name), value);
                }
            }
        }
        Ok(())
    }

    /// Hard failure unless the wire type is what the declared kind requires
    fn check_wire_type(&self, field: &Field, tag: u32, s: &Slice<'_>) -> Result<()> {
        let expected = field.kind.wire_type();
        let actual = tag_wire_type(tag).ok_or_else(|| ProtoError::bad_varint(s.offset()))?;
        if actual == expected {
            return Ok(());
        }
        Err(ProtoError::WireTypeMismatch {
            field: self.reg.name_str(field.name).to_string(),
            kind: field.kind.as_str(),
            expected: expected.as_str(),
            actual: actual.as_str(),
            offset: s.offset(),
        })
    }

    /// Read one value of the field's kind from the cursor
    ///
    /// Returns `None` when the value must be dropped (message field whose
    /// type was never resolved or has been deleted).
    fn field_value(&mut self, field: &Field, s: &mut Slice<'_>) -> Result<Option<Value>> {
        let value = match field.kind {
            FieldKind::Enum => {
                let raw = s.read_varint64()?;
                let constant = match self.options.enum_mode {
                    EnumMode::Name => field
                        .value_type
                        .and_then(|vt| self.reg.field_by_number(vt, raw as i32))
                        .and_then(|fid| self.reg.get_field(fid)),
                    EnumMode::Value => None,
                };
                match constant {
                    Some(c) => Value::Str(self.reg.name_str(c.name).to_string()),
                    None => Value::I32(raw as i64 as i32),
                }
            }
            FieldKind::Message => {
                let mut sub = s.read_bytes()?;
                let live = field.value_type.filter(|&vt| self.reg.get_type(vt).is_some());
                let Some(vt) = live else {
                    return Ok(None);
                };
                let mut nested = self.new_message(vt);
                self.message(vt, &mut nested, &mut sub)?;
                Value::Message(nested)
            }
            FieldKind::Bool => Value::Bool(s.read_varint64()? != 0),
            FieldKind::Int32 => Value::I32(s.read_varint64()? as i32),
            FieldKind::Uint32 => Value::U32(s.read_varint64()? as u32),
            FieldKind::Sint32 => Value::I32(codec::decode_sint32(s.read_varint64()? as u32)),
            FieldKind::Int64 => self.int_output_signed(s.read_varint64()? as i64),
            FieldKind::Uint64 => self.int_output_unsigned(s.read_varint64()?),
            FieldKind::Sint64 => self.int_output_signed(codec::decode_sint64(s.read_varint64()?)),
            FieldKind::Float => Value::F32(codec::decode_float(s.read_fixed32()?)),
            FieldKind::Fixed32 => Value::U32(s.read_fixed32()?),
            FieldKind::Sfixed32 => Value::I32(s.read_fixed32()? as i32),
            FieldKind::Double => Value::F64(codec::decode_double(s.read_fixed64()?)),
            FieldKind::Fixed64 => self.int_output_unsigned(s.read_fixed64()?),
            FieldKind::Sfixed64 => self.int_output_signed(s.read_fixed64()? as i64),
            FieldKind::String => {
                let sub = s.read_bytes()?;
                Value::Str(String::from_utf8_lossy(sub.as_bytes()).into_owned())
            }
            FieldKind::Bytes => {
                let sub = s.read_bytes()?;
                Value::Bytes(Bytes::copy_from_slice(sub.as_bytes()))
            }
            FieldKind::Group => {
                // Groups carry no dynamic value; consume and drop the body.
                s.skip_group(make_tag(field.number as u32, WireType::GroupStart))?;
                return Ok(None);
            }
        };
        Ok(Some(value))
    }

    fn repeated_field(
        &mut self,
        field: &Field,
        tag: u32,
        message: &mut Message,
        s: &mut Slice<'_>,
    ) -> Result<()> {
        let name = self.reg.name_str(field.name).to_string();
        let mut items = match message.remove(&name) {
            Some(Value::List(items)) => items,
            _ => Vec::new(),
        };
        let natural = field.kind.wire_type();
        let packed_run = tag_wire_type(tag) == Some(WireType::Bytes) && natural != WireType::Bytes;
        if packed_run {
            let mut sub = s.read_bytes()?;
            while !sub.is_empty() {
                if let Some(value) = self.field_value(field, &mut sub)? {
                    items.push(value);
                }
            }
        } else {
            self.check_wire_type(field, tag, s)?;
            if let Some(value) = self.field_value(field, s)? {
                items.push(value);
            }
        }
        message.insert(name, Value::List(items));
        Ok(())
    }

    /// Map entries arrive as synthetic 2-field submessages; absent keys or
    /// values are synthesized from that sub-field's default
    fn map_field(&mut self, field: &Field, message: &mut Message, s: &mut Slice<'_>) -> Result<()> {
        let name = self.reg.name_str(field.name).to_string();
        let mut entries = match message.remove(&name) {
            Some(Value::Map(entries)) => entries,
            _ => HashMap::new(),
        };
        let mut sub = s.read_bytes()?;
        if let Some(entry_type) = field.value_type {
            let reg = self.reg;
            let key_field = reg
                .field_by_number(entry_type, 1)
                .and_then(|fid| reg.get_field(fid));
            let value_field = reg
                .field_by_number(entry_type, 2)
                .and_then(|fid| reg.get_field(fid));
            let mut key = None;
            let mut value = None;
            while let Some(tag) = sub.read_tag()? {
                match (tag_number(tag), key_field, value_field) {
                    (1, Some(kf), _) => {
                        self.check_wire_type(kf, tag, &sub)?;
                        key = self.field_value(kf, &mut sub)?;
                    }
                    (2, _, Some(vf)) => {
                        self.check_wire_type(vf, tag, &sub)?;
                        value = self.field_value(vf, &mut sub)?;
                    }
                    _ => sub.skip_value(tag)?,
                }
            }
            if key.is_none() {
                key = key_field.and_then(|kf| self.default_of(kf, true));
            }
            if value.is_none() {
                value = value_field.and_then(|vf| self.default_of(vf, true));
            }
            if let (Some(key), Some(value)) = (key, value) {
                if let Ok(key) = MapKey::try_from(key) {
                    entries.insert(key, value);
                }
            }
        }
        message.insert(name, Value::Map(entries));
        Ok(())
    }

    // =========================================================================
    // Default materialization
    // =========================================================================

    /// Create the container a decoded message of `type_id` starts from
    fn new_message(&mut self, type_id: TypeId) -> Message {
        let Some(ty) = self.reg.get_type(type_id) else {
            return Message::new();
        };
        let mode = match self.options.default_mode {
            DefaultMode::Auto if ty.is_proto3 => DefaultMode::Copy,
            DefaultMode::Auto => DefaultMode::None,
            other => other,
        };
        let proto3 = ty.is_proto3;
        let mut message = Message::new();
        match mode {
            DefaultMode::Copy => {
                let reg = self.reg;
                for fid in reg.iter_fields(type_id) {
                    let Some(field) = reg.get_field(fid) else {
                        continue;
                    };
                    if field.oneof_index != 0 {
                        continue;
                    }
                    if let Some(value) = self.default_of(field, proto3) {
                        message.insert(reg.name_str(field.name), value);
                    }
                }
            }
            DefaultMode::Lazy => {
                let reg = self.reg;
                for fid in reg.iter_fields(type_id) {
                    let Some(field) = reg.get_field(fid) else {
                        continue;
                    };
                    if field.repeated {
                        message.insert(reg.name_str(field.name), Value::List(Vec::new()));
                    }
                }
                let defaults = self.default_table(type_id, proto3);
                message.set_defaults(defaults);
            }
            DefaultMode::None | DefaultMode::Auto => {}
        }
        message
    }

    /// Shared per-type default table, built on first use
    fn default_table(&mut self, type_id: TypeId, proto3: bool) -> Arc<Message> {
        if let Some(table) = self.default_tables.get(&type_id) {
            return Arc::clone(table);
        }
        let reg = self.reg;
        let mut table = Message::new();
        for fid in reg.iter_fields(type_id) {
            let Some(field) = reg.get_field(fid) else {
                continue;
            };
            if field.repeated {
                continue;
            }
            if let Some(value) = self.default_of(field, proto3) {
                table.insert(reg.name_str(field.name), value);
            }
        }
        let table = Arc::new(table);
        self.default_tables.insert(type_id, Arc::clone(&table));
        table
    }

    /// Declared or zero default of a field, if it has one
    fn default_of(&self, field: &Field, proto3: bool) -> Option<Value> {
        if proto3 && field.repeated {
            return Some(Value::List(Vec::new()));
        }
        let declared = field
            .default_value
            .map(|name| self.reg.name_str(name).to_string());
        match field.kind {
            FieldKind::String => match declared {
                Some(text) => Some(Value::Str(text)),
                None if proto3 => Some(Value::Str(String::new())),
                None => None,
            },
            FieldKind::Bytes => match declared {
                Some(text) => Some(Value::Bytes(Bytes::from(text.into_bytes()))),
                None if proto3 => Some(Value::Bytes(Bytes::new())),
                None => None,
            },
            FieldKind::Enum => {
                let enum_type = field.value_type?;
                let by_default_name = field
                    .default_value
                    .and_then(|name| {
                        let text = self.reg.name_str(name);
                        self.reg.field_by_name(enum_type, text)
                    })
                    .and_then(|fid| self.reg.get_field(fid));
                if let Some(constant) = by_default_name {
                    return Some(match self.options.enum_mode {
                        EnumMode::Value => Value::I32(constant.number),
                        EnumMode::Name => Value::Str(self.reg.name_str(constant.name).to_string()),
                    });
                }
                if proto3 {
                    let zero = self
                        .reg
                        .field_by_number(enum_type, 0)
                        .and_then(|fid| self.reg.get_field(fid));
                    return Some(match (zero, self.options.enum_mode) {
                        (Some(c), EnumMode::Name) => {
                            Value::Str(self.reg.name_str(c.name).to_string())
                        }
                        _ => Value::I32(0),
                    });
                }
                None
            }
            FieldKind::Message | FieldKind::Group => None,
            FieldKind::Bool => match declared.as_deref() {
                Some("true") => Some(Value::Bool(true)),
                Some("false") => Some(Value::Bool(false)),
                Some(_) => None,
                None if proto3 => Some(Value::Bool(false)),
                None => None,
            },
            FieldKind::Double => match declared {
                Some(text) => text.parse().ok().map(Value::F64),
                None if proto3 => Some(Value::F64(0.0)),
                None => None,
            },
            FieldKind::Float => match declared {
                Some(text) => text.parse().ok().map(Value::F32),
                None if proto3 => Some(Value::F32(0.0)),
                None => None,
            },
            _ => match declared {
                Some(text) => {
                    let raw = parse_int(&text).ok()?;
                    Some(self.int_default(field.kind, raw))
                }
                None if proto3 => Some(self.int_default(field.kind, 0)),
                None => None,
            },
        }
    }

    fn int_default(&self, kind: FieldKind, raw: u64) -> Value {
        match kind {
            FieldKind::Int32 | FieldKind::Sint32 | FieldKind::Sfixed32 => Value::I32(raw as i32),
            FieldKind::Uint32 | FieldKind::Fixed32 => Value::U32(raw as u32),
            FieldKind::Uint64 | FieldKind::Fixed64 => self.int_output_unsigned(raw),
            _ => self.int_output_signed(raw as i64),
        }
    }

    // =========================================================================
    // Integer representation
    // =========================================================================

    /// 64-bit signed output, honoring [`Int64Mode`] outside the i32 range
    fn int_output_signed(&self, value: i64) -> Value {
        if i32::try_from(value).is_ok() {
            return Value::I64(value);
        }
        match self.options.int64_mode {
            Int64Mode::Number => Value::I64(value),
            Int64Mode::String => Value::Str(value.to_string()),
            Int64Mode::Hex => {
                let magnitude = value.unsigned_abs();
                if value < 0 {
                    Value::Str(format!("-0x{magnitude:X}"))
                } else {
                    Value::Str(format!("0x{magnitude:X}"))
                }
            }
        }
    }

    /// 64-bit unsigned output, honoring [`Int64Mode`] outside the i32 range
    fn int_output_unsigned(&self, value: u64) -> Value {
        if value <= i32::MAX as u64 {
            return Value::U64(value);
        }
        match self.options.int64_mode {
            Int64Mode::Number => Value::U64(value),
            Int64Mode::String => Value::Str(value.to_string()),
            Int64Mode::Hex => Value::Str(format!("0x{value:X}")),
        }
    }
}
