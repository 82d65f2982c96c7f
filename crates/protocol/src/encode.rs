//! Encode engine
//!
//! Walks a dynamic [`Message`] against a registered type and emits
//! wire-format bytes. Field names the type does not declare are ignored;
//! values that do not fit their declared kind fail with an error naming the
//! field, the expected kind, and the actual value kind.
//!
//! Nested messages are written speculatively into the same buffer and
//! length-prefixed retroactively, so the engine is single-pass. Zero-valued
//! proto3 scalars are written the same way and then un-written, which keeps
//! the presence rules in one place: a oneof member survives at zero value,
//! anything else does not.

use bytes::Bytes;

use crate::buffer::Buffer;
use crate::codec;
use crate::registry::{Field, Registry, TypeId};
use crate::value::{parse_int, Message, Value};
use crate::wire::{make_tag, FieldKind, WireType};
use crate::{ProtoError, Result};

impl Registry {
    /// Encode `message` against the named type into fresh bytes
    pub fn encode(&self, type_name: &str, message: &Message) -> Result<Bytes> {
        let mut buf = Buffer::new();
        self.encode_into(type_name, message, &mut buf)?;
        Ok(buf.into_bytes())
    }

    /// Encode `message` against the named type, appending to `buf`
    ///
    /// Reusing one buffer across calls avoids re-allocation in encode
    /// loops; the caller resets it between messages.
    pub fn encode_into(&self, type_name: &str, message: &Message, buf: &mut Buffer) -> Result<()> {
        let type_id = self
            .type_by_name(type_name)
            .ok_or_else(|| ProtoError::unknown_type(type_name))?;
        Encoder { reg: self, buf }.message(type_id, message)
    }
}

struct Encoder<'r, 'b> {
    reg: &'r Registry,
    buf: &'b mut Buffer,
}

impl Encoder<'_, '_> {
    fn message(&mut self, type_id: TypeId, message: &Message) -> Result<()> {
        let reg = self.reg;
        let Some(ty) = reg.get_type(type_id) else {
            return Ok(());
        };
        let proto3 = ty.is_proto3;
        for (name, value) in message.iter() {
            let Some(fid) = reg.field_by_name(type_id, name) else {
                continue;
            };
            let Some(field) = reg.get_field(fid) else {
                continue;
            };
            let value_type = field.value_type.map(|vt| (vt, reg.get_type(vt)));
            match value_type {
                Some((_, Some(vt))) if vt.is_map => self.map_field(field, value)?,
                // A deleted value type drops the field entirely.
                Some((_, None)) => continue,
                _ if field.repeated => self.repeated_field(field, value)?,
                _ => {
                    let mark = self.buf.mark();
                    let wrote_zero = self.tag_field(field, value)?;
                    if wrote_zero && proto3 && field.oneof_index == 0 {
                        self.buf.truncate(mark);
                    }
                }
            }
        }
        Ok(())
    }

    /// Write tag plus value; returns true when the value was the kind's
    /// zero value (candidate for proto3 presence suppression)
    fn tag_field(&mut self, field: &Field, value: &Value) -> Result<bool> {
        self.buf
            .add_varint32(make_tag(field.number as u32, field.kind.wire_type()));
        match field.kind {
            FieldKind::Enum => self.enum_value(field, value),
            FieldKind::Message => {
                let Value::Message(nested) = value else {
                    return Err(self.mismatch(field, "message", value));
                };
                let mark = self.buf.mark();
                if let Some(vt) = field.value_type {
                    self.message(vt, nested)?;
                }
                self.buf.add_length(mark);
                Ok(false)
            }
            _ => self.scalar_value(field, value),
        }
    }

    /// Write a bare value in the field's wire representation; returns the
    /// zero-value flag
    fn scalar_value(&mut self, field: &Field, value: &Value) -> Result<bool> {
        match field.kind {
            FieldKind::Bool => {
                let Value::Bool(v) = value else {
                    return Err(self.mismatch(field, "bool", value));
                };
                self.buf.add_varint32(u32::from(*v));
                Ok(!*v)
            }
            FieldKind::Double => {
                let v = self.float_value(field, value)?;
                self.buf.add_fixed64(codec::encode_double(v));
                Ok(v == 0.0)
            }
            FieldKind::Float => {
                let v = self.float_value(field, value)?;
                self.buf.add_fixed32(codec::encode_float(v as f32));
                Ok(v == 0.0)
            }
            FieldKind::Int32 => {
                let raw = self.int_value(field, value)?;
                // int32 negatives sign-extend to the 10-byte varint form.
                self.buf.add_varint64(codec::expand_sig(raw as u32));
                Ok(raw == 0)
            }
            FieldKind::Uint32 => {
                let raw = self.int_value(field, value)?;
                self.buf.add_varint32(raw as u32);
                Ok(raw == 0)
            }
            FieldKind::Sint32 => {
                let raw = self.int_value(field, value)?;
                self.buf.add_varint32(codec::encode_sint32(raw as i32));
                Ok(raw == 0)
            }
            FieldKind::Int64 | FieldKind::Uint64 => {
                let raw = self.int_value(field, value)?;
                self.buf.add_varint64(raw);
                Ok(raw == 0)
            }
            FieldKind::Sint64 => {
                let raw = self.int_value(field, value)?;
                self.buf.add_varint64(codec::encode_sint64(raw as i64));
                Ok(raw == 0)
            }
            FieldKind::Fixed32 | FieldKind::Sfixed32 => {
                let raw = self.int_value(field, value)?;
                self.buf.add_fixed32(raw as u32);
                Ok(raw == 0)
            }
            FieldKind::Fixed64 | FieldKind::Sfixed64 => {
                let raw = self.int_value(field, value)?;
                self.buf.add_fixed64(raw);
                Ok(raw == 0)
            }
            FieldKind::String | FieldKind::Bytes => {
                let Some(bytes) = value.as_bytes() else {
                    return Err(self.mismatch(field, "string", value));
                };
                self.buf.add_bytes(bytes);
                Ok(bytes.is_empty())
            }
            FieldKind::Enum => self.enum_value(field, value),
            FieldKind::Message | FieldKind::Group => Err(ProtoError::TypeMismatch {
                field: self.reg.name_str(field.name).to_string(),
                expected: "packable scalar",
                actual: field.kind.as_str(),
            }),
        }
    }

    /// Enums accept the symbolic constant name or a raw integer
    fn enum_value(&mut self, field: &Field, value: &Value) -> Result<bool> {
        if let Value::Str(name) = value {
            let constant = field
                .value_type
                .and_then(|vt| self.reg.field_by_name(vt, name))
                .and_then(|fid| self.reg.get_field(fid));
            let Some(constant) = constant else {
                return Err(ProtoError::UnknownEnum {
                    field: self.reg.name_str(field.name).to_string(),
                    value: name.clone(),
                });
            };
            self.buf.add_varint64(codec::expand_sig(constant.number as u32));
            return Ok(constant.number == 0);
        }
        let raw = self.int_value(field, value)?;
        self.buf.add_varint64(raw);
        Ok(raw == 0)
    }

    fn repeated_field(&mut self, field: &Field, value: &Value) -> Result<()> {
        let Value::List(items) = value else {
            return Err(self.mismatch(field, "list", value));
        };
        if field.packed {
            self.buf
                .add_varint32(make_tag(field.number as u32, WireType::Bytes));
            let mark = self.buf.mark();
            for item in items {
                self.scalar_value(field, item)?;
            }
            self.buf.add_length(mark);
        } else {
            for item in items {
                self.tag_field(field, item)?;
            }
        }
        Ok(())
    }

    /// Each map entry is a synthetic 2-field submessage: key = 1, value = 2
    ///
    /// Zero-valued keys and values are omitted from the entry; the decoder
    /// synthesizes them back from defaults.
    fn map_field(&mut self, field: &Field, value: &Value) -> Result<()> {
        let Value::Map(entries) = value else {
            return Err(self.mismatch(field, "map", value));
        };
        let Some(entry_type) = field.value_type else {
            return Ok(());
        };
        let reg = self.reg;
        let key_field = reg
            .field_by_number(entry_type, 1)
            .and_then(|fid| reg.get_field(fid));
        let value_field = reg
            .field_by_number(entry_type, 2)
            .and_then(|fid| reg.get_field(fid));
        let (Some(kf), Some(vf)) = (key_field, value_field) else {
            return Ok(());
        };
        for (key, entry_value) in entries {
            self.buf
                .add_varint32(make_tag(field.number as u32, WireType::Bytes));
            let entry_mark = self.buf.mark();
            let key_value = Value::from(key.clone());

            let mark = self.buf.mark();
            if self.tag_field(kf, &key_value)? {
                self.buf.truncate(mark);
            }

            let mark = self.buf.mark();
            if self.tag_field(vf, entry_value)? {
                self.buf.truncate(mark);
            }

            self.buf.add_length(entry_mark);
        }
        Ok(())
    }

    fn int_value(&self, field: &Field, value: &Value) -> Result<u64> {
        match value {
            Value::Str(text) => parse_int(text),
            Value::Bool(_)
            | Value::I32(_)
            | Value::I64(_)
            | Value::U32(_)
            | Value::U64(_) => value.to_raw_u64(),
            other => Err(self.mismatch(field, "number", other)),
        }
    }

    fn float_value(&self, field: &Field, value: &Value) -> Result<f64> {
        value
            .to_f64()
            .ok_or_else(|| self.mismatch(field, "number", value))
    }

    fn mismatch(&self, field: &Field, expected: &'static str, value: &Value) -> ProtoError {
        ProtoError::TypeMismatch {
            field: self.reg.name_str(field.name).to_string(),
            expected,
            actual: value.kind_str(),
        }
    }
}
