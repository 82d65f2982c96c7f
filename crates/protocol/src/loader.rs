//! Descriptor loader
//!
//! Parses a serialized `FileDescriptorSet` (the self-describing schema
//! format) and populates a [`Registry`]. Parsing is two-phase: a
//! recursive-descent pass reads the raw descriptor messages into
//! intermediate records, then a load pass walks those records, qualifying
//! every declared name with its dotted package path and registering types,
//! fields, enums, oneofs, and extensions.
//!
//! Any malformed length prefix or tag unwinds straight back to
//! [`Registry::load`] as an error carrying the byte offset at which parsing
//! stopped. Types registered before the failure stay registered; callers
//! needing atomicity load into a scratch registry and swap it in on
//! success.
//!
//! Forward references are legal: a field whose `type_name` has not been
//! declared yet gets a placeholder type that the later declaration fills
//! in, even across files.

use tracing::debug;

use crate::registry::{Registry, TypeId};
use crate::slice::Slice;
use crate::wire::{make_tag, FieldKind, WireType};
use crate::Result;

// Descriptor field numbers, per the self-describing schema format.
const FILE_SET_FILE: u32 = 1;

const FILE_PACKAGE: u32 = 2;
const FILE_MESSAGE_TYPE: u32 = 4;
const FILE_ENUM_TYPE: u32 = 5;
const FILE_EXTENSION: u32 = 7;
const FILE_SYNTAX: u32 = 12;

const MSG_NAME: u32 = 1;
const MSG_FIELD: u32 = 2;
const MSG_NESTED_TYPE: u32 = 3;
const MSG_ENUM_TYPE: u32 = 4;
const MSG_EXTENSION: u32 = 6;
const MSG_OPTIONS: u32 = 7;
const MSG_ONEOF_DECL: u32 = 8;
const MSG_OPTIONS_MAP_ENTRY: u32 = 7;

const FIELD_NAME: u32 = 1;
const FIELD_EXTENDEE: u32 = 2;
const FIELD_NUMBER: u32 = 3;
const FIELD_LABEL: u32 = 4;
const FIELD_TYPE: u32 = 5;
const FIELD_TYPE_NAME: u32 = 6;
const FIELD_DEFAULT_VALUE: u32 = 7;
const FIELD_OPTIONS: u32 = 8;
const FIELD_ONEOF_INDEX: u32 = 9;
const FIELD_OPTIONS_PACKED: u32 = 2;

const ENUM_NAME: u32 = 1;
const ENUM_VALUE: u32 = 2;
const ENUM_VALUE_NAME: u32 = 1;
const ENUM_VALUE_NUMBER: u32 = 2;

const ONEOF_NAME: u32 = 1;

const LABEL_REPEATED: i32 = 3;

#[derive(Debug, Default)]
struct FieldInfo {
    name: String,
    type_name: String,
    extendee: String,
    default_value: String,
    number: i32,
    label: i32,
    kind: i32,
    /// 1-based; 0 = not a oneof member
    oneof_index: u32,
    packed: Option<bool>,
}

#[derive(Debug, Default)]
struct EnumValueInfo {
    name: String,
    number: i32,
}

#[derive(Debug, Default)]
struct EnumInfo {
    name: String,
    values: Vec<EnumValueInfo>,
}

#[derive(Debug, Default)]
struct TypeInfo {
    name: String,
    is_map: bool,
    fields: Vec<FieldInfo>,
    extensions: Vec<FieldInfo>,
    enums: Vec<EnumInfo>,
    nested: Vec<TypeInfo>,
    oneofs: Vec<String>,
}

#[derive(Debug, Default)]
struct FileInfo {
    package: String,
    syntax: String,
    enums: Vec<EnumInfo>,
    messages: Vec<TypeInfo>,
    extensions: Vec<FieldInfo>,
}

impl Registry {
    /// Load a serialized descriptor set into the registry
    ///
    /// Files are parsed and registered one at a time. On failure the error
    /// carries the byte offset at which parsing stopped, and files
    /// registered before the failure are not rolled back.
    pub fn load(&mut self, bytes: &[u8]) -> Result<()> {
        let mut s = Slice::new(bytes);
        let mut prefix = String::new();
        let mut files = 0usize;
        while let Some(tag) = s.read_tag()? {
            if tag == make_tag(FILE_SET_FILE, WireType::Bytes) {
                let file = parse_file(&mut s.read_bytes()?)?;
                self.load_file(&file, &mut prefix);
                files += 1;
            } else {
                s.skip_value(tag)?;
            }
        }
        debug!(files, "descriptor set loaded");
        Ok(())
    }

    fn load_file(&mut self, file: &FileInfo, prefix: &mut String) {
        let mark = prefix.len();
        if !file.package.is_empty() {
            prefix.push('.');
            prefix.push_str(&file.package);
        }
        let proto3 = file.syntax == "proto3";
        for decl in &file.enums {
            self.load_enum(decl, prefix);
        }
        for decl in &file.messages {
            self.load_message(decl, prefix, proto3);
        }
        for decl in &file.extensions {
            self.load_field(decl, None, proto3);
        }
        debug!(
            package = %file.package,
            messages = file.messages.len(),
            enums = file.enums.len(),
            proto3,
            "descriptor file loaded"
        );
        prefix.truncate(mark);
    }

    fn load_enum(&mut self, decl: &EnumInfo, prefix: &mut String) {
        let mark = prefix.len();
        prefix.push('.');
        prefix.push_str(&decl.name);
        let tid = self.get_or_create_type(prefix);
        self.type_mut(tid).is_enum = true;
        for value in &decl.values {
            self.get_or_create_field(tid, &value.name, value.number);
        }
        prefix.truncate(mark);
    }

    fn load_message(&mut self, decl: &TypeInfo, prefix: &mut String, proto3: bool) {
        let mark = prefix.len();
        prefix.push('.');
        prefix.push_str(&decl.name);
        let tid = self.get_or_create_type(prefix);
        {
            let ty = self.type_mut(tid);
            ty.is_map = decl.is_map;
            ty.is_proto3 = proto3;
        }
        for (i, name) in decl.oneofs.iter().enumerate() {
            self.set_oneof(tid, i as u32 + 1, name);
        }
        for field in &decl.fields {
            self.load_field(field, Some(tid), proto3);
        }
        for field in &decl.extensions {
            self.load_field(field, None, proto3);
        }
        for nested in &decl.enums {
            self.load_enum(nested, prefix);
        }
        for nested in &decl.nested {
            self.load_message(nested, prefix, proto3);
        }
        prefix.truncate(mark);
    }

    fn load_field(&mut self, decl: &FieldInfo, owner: Option<TypeId>, proto3: bool) {
        let Some(kind) = FieldKind::from_descriptor(decl.kind) else {
            return;
        };
        // Forward references create a placeholder filled in by the later
        // declaration.
        let value_type = if decl.type_name.is_empty() {
            None
        } else {
            Some(self.get_or_create_type(&decl.type_name))
        };
        if value_type.is_none()
            && matches!(kind, FieldKind::Message | FieldKind::Enum | FieldKind::Group)
        {
            return;
        }
        let owner = match owner {
            Some(tid) => tid,
            None if !decl.extendee.is_empty() => self.get_or_create_type(&decl.extendee),
            None => return,
        };
        let default_value = (!decl.default_value.is_empty())
            .then(|| self.names.intern(&decl.default_value));
        let fid = self.get_or_create_field(owner, &decl.name, decl.number);
        let repeated = decl.label == LABEL_REPEATED;
        if let Some(field) = self.field_mut(fid) {
            field.kind = kind;
            field.value_type = value_type;
            field.default_value = default_value;
            field.oneof_index = decl.oneof_index;
            field.repeated = repeated;
            field.packed = kind.packable() && decl.packed.unwrap_or(proto3 && repeated);
            field.scalar = value_type.is_none();
        }
    }
}

// =============================================================================
// Parse phase
// =============================================================================

fn parse_file(s: &mut Slice<'_>) -> Result<FileInfo> {
    let mut info = FileInfo::default();
    while let Some(tag) = s.read_tag()? {
        if tag == make_tag(FILE_PACKAGE, WireType::Bytes) {
            info.package = read_string(s)?;
        } else if tag == make_tag(FILE_MESSAGE_TYPE, WireType::Bytes) {
            info.messages.push(parse_message(&mut s.read_bytes()?)?);
        } else if tag == make_tag(FILE_ENUM_TYPE, WireType::Bytes) {
            info.enums.push(parse_enum(&mut s.read_bytes()?)?);
        } else if tag == make_tag(FILE_EXTENSION, WireType::Bytes) {
            info.extensions.push(parse_field(&mut s.read_bytes()?)?);
        } else if tag == make_tag(FILE_SYNTAX, WireType::Bytes) {
            info.syntax = read_string(s)?;
        } else {
            s.skip_value(tag)?;
        }
    }
    Ok(info)
}

fn parse_message(s: &mut Slice<'_>) -> Result<TypeInfo> {
    let mut info = TypeInfo::default();
    while let Some(tag) = s.read_tag()? {
        if tag == make_tag(MSG_NAME, WireType::Bytes) {
            info.name = read_string(s)?;
        } else if tag == make_tag(MSG_FIELD, WireType::Bytes) {
            info.fields.push(parse_field(&mut s.read_bytes()?)?);
        } else if tag == make_tag(MSG_NESTED_TYPE, WireType::Bytes) {
            info.nested.push(parse_message(&mut s.read_bytes()?)?);
        } else if tag == make_tag(MSG_ENUM_TYPE, WireType::Bytes) {
            info.enums.push(parse_enum(&mut s.read_bytes()?)?);
        } else if tag == make_tag(MSG_EXTENSION, WireType::Bytes) {
            info.extensions.push(parse_field(&mut s.read_bytes()?)?);
        } else if tag == make_tag(MSG_OPTIONS, WireType::Bytes) {
            parse_message_options(&mut s.read_bytes()?, &mut info)?;
        } else if tag == make_tag(MSG_ONEOF_DECL, WireType::Bytes) {
            parse_oneof(&mut s.read_bytes()?, &mut info)?;
        } else {
            s.skip_value(tag)?;
        }
    }
    Ok(info)
}

fn parse_message_options(s: &mut Slice<'_>, info: &mut TypeInfo) -> Result<()> {
    while let Some(tag) = s.read_tag()? {
        if tag == make_tag(MSG_OPTIONS_MAP_ENTRY, WireType::Varint) {
            info.is_map = s.read_varint64()? != 0;
        } else {
            s.skip_value(tag)?;
        }
    }
    Ok(())
}

fn parse_oneof(s: &mut Slice<'_>, info: &mut TypeInfo) -> Result<()> {
    while let Some(tag) = s.read_tag()? {
        if tag == make_tag(ONEOF_NAME, WireType::Bytes) {
            info.oneofs.push(read_string(s)?);
        } else {
            s.skip_value(tag)?;
        }
    }
    Ok(())
}

fn parse_field(s: &mut Slice<'_>) -> Result<FieldInfo> {
    let mut info = FieldInfo::default();
    while let Some(tag) = s.read_tag()? {
        if tag == make_tag(FIELD_NAME, WireType::Bytes) {
            info.name = read_string(s)?;
        } else if tag == make_tag(FIELD_EXTENDEE, WireType::Bytes) {
            info.extendee = read_string(s)?;
        } else if tag == make_tag(FIELD_NUMBER, WireType::Varint) {
            info.number = s.read_varint32()? as i32;
        } else if tag == make_tag(FIELD_LABEL, WireType::Varint) {
            info.label = s.read_varint32()? as i32;
        } else if tag == make_tag(FIELD_TYPE, WireType::Varint) {
            info.kind = s.read_varint32()? as i32;
        } else if tag == make_tag(FIELD_TYPE_NAME, WireType::Bytes) {
            info.type_name = read_string(s)?;
        } else if tag == make_tag(FIELD_DEFAULT_VALUE, WireType::Bytes) {
            info.default_value = read_string(s)?;
        } else if tag == make_tag(FIELD_OPTIONS, WireType::Bytes) {
            parse_field_options(&mut s.read_bytes()?, &mut info)?;
        } else if tag == make_tag(FIELD_ONEOF_INDEX, WireType::Varint) {
            // Stored 1-based so 0 can mean "not a oneof member".
            info.oneof_index = s.read_varint32()? + 1;
        } else {
            s.skip_value(tag)?;
        }
    }
    Ok(info)
}

fn parse_field_options(s: &mut Slice<'_>, info: &mut FieldInfo) -> Result<()> {
    while let Some(tag) = s.read_tag()? {
        if tag == make_tag(FIELD_OPTIONS_PACKED, WireType::Varint) {
            info.packed = Some(s.read_varint64()? != 0);
        } else {
            s.skip_value(tag)?;
        }
    }
    Ok(())
}

fn parse_enum(s: &mut Slice<'_>) -> Result<EnumInfo> {
    let mut info = EnumInfo::default();
    while let Some(tag) = s.read_tag()? {
        if tag == make_tag(ENUM_NAME, WireType::Bytes) {
            info.name = read_string(s)?;
        } else if tag == make_tag(ENUM_VALUE, WireType::Bytes) {
            info.values.push(parse_enum_value(&mut s.read_bytes()?)?);
        } else {
            s.skip_value(tag)?;
        }
    }
    Ok(info)
}

fn parse_enum_value(s: &mut Slice<'_>) -> Result<EnumValueInfo> {
    let mut info = EnumValueInfo::default();
    while let Some(tag) = s.read_tag()? {
        if tag == make_tag(ENUM_VALUE_NAME, WireType::Bytes) {
            info.name = read_string(s)?;
        } else if tag == make_tag(ENUM_VALUE_NUMBER, WireType::Varint) {
            info.number = s.read_varint32()? as i32;
        } else {
            s.skip_value(tag)?;
        }
    }
    Ok(info)
}

fn read_string(s: &mut Slice<'_>) -> Result<String> {
    let sub = s.read_bytes()?;
    Ok(String::from_utf8_lossy(sub.as_bytes()).into_owned())
}
