//! Test helpers
//!
//! Builds serialized descriptor sets by hand, the same way the loader will
//! read them: raw tag/length/payload bytes. Keeping the builder primitive
//! makes the fixtures double as wire-format documentation.

use crate::wire::FieldKind;
use crate::Registry;

/// Varint encode into a fresh vec
pub(crate) fn raw_varint(value: u64) -> Vec<u8> {
    let mut scratch = [0u8; crate::MAX_VARINT_LEN];
    let len = crate::codec::write_varint64(&mut scratch, value);
    scratch[..len].to_vec()
}

/// `tag(field, VARINT)` followed by the value
pub(crate) fn tagged_varint(field: u32, value: u64) -> Vec<u8> {
    let mut out = raw_varint(u64::from(field << 3));
    out.extend(raw_varint(value));
    out
}

/// `tag(field, BYTES)` followed by a length-prefixed payload
pub(crate) fn tagged_bytes(field: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = raw_varint(u64::from(field << 3 | 2));
    out.extend(raw_varint(payload.len() as u64));
    out.extend_from_slice(payload);
    out
}

/// `tag(field, BYTES)` followed by a length-prefixed string
pub(crate) fn tagged_str(field: u32, text: &str) -> Vec<u8> {
    tagged_bytes(field, text.as_bytes())
}

/// A `FieldDescriptorProto` under construction
pub(crate) struct FieldDesc<'a> {
    pub name: &'a str,
    pub number: i32,
    pub kind: FieldKind,
    pub repeated: bool,
    pub type_name: &'a str,
    pub packed: Option<bool>,
    /// Descriptor-form (0-based) oneof index
    pub oneof_index: Option<u32>,
    pub default_value: &'a str,
}

impl Default for FieldDesc<'_> {
    fn default() -> Self {
        Self {
            name: "",
            number: 0,
            kind: FieldKind::Int32,
            repeated: false,
            type_name: "",
            packed: None,
            oneof_index: None,
            default_value: "",
        }
    }
}

/// Serialize a `FieldDescriptorProto`
pub(crate) fn field_desc(desc: &FieldDesc<'_>) -> Vec<u8> {
    let mut out = tagged_str(1, desc.name);
    out.extend(tagged_varint(3, desc.number as u64));
    out.extend(tagged_varint(4, if desc.repeated { 3 } else { 1 }));
    out.extend(tagged_varint(5, desc.kind as u64));
    if !desc.type_name.is_empty() {
        out.extend(tagged_str(6, desc.type_name));
    }
    if !desc.default_value.is_empty() {
        out.extend(tagged_str(7, desc.default_value));
    }
    if let Some(packed) = desc.packed {
        out.extend(tagged_bytes(8, &tagged_varint(2, u64::from(packed))));
    }
    if let Some(index) = desc.oneof_index {
        out.extend(tagged_varint(9, u64::from(index)));
    }
    out
}

/// Serialize a `DescriptorProto`
pub(crate) fn message_desc(
    name: &str,
    fields: &[Vec<u8>],
    nested: &[Vec<u8>],
    enums: &[Vec<u8>],
    oneofs: &[&str],
    map_entry: bool,
) -> Vec<u8> {
    let mut out = tagged_str(1, name);
    for field in fields {
        out.extend(tagged_bytes(2, field));
    }
    for decl in nested {
        out.extend(tagged_bytes(3, decl));
    }
    for decl in enums {
        out.extend(tagged_bytes(4, decl));
    }
    if map_entry {
        out.extend(tagged_bytes(7, &tagged_varint(7, 1)));
    }
    for oneof in oneofs {
        out.extend(tagged_bytes(8, &tagged_str(1, oneof)));
    }
    out
}

/// Serialize an `EnumDescriptorProto`
pub(crate) fn enum_desc(name: &str, values: &[(&str, i64)]) -> Vec<u8> {
    let mut out = tagged_str(1, name);
    for (value_name, number) in values {
        let mut value = tagged_str(1, value_name);
        value.extend(tagged_varint(2, *number as u64));
        out.extend(tagged_bytes(2, &value));
    }
    out
}

/// Serialize a `FileDescriptorProto`
pub(crate) fn file_desc(
    package: &str,
    syntax: &str,
    messages: &[Vec<u8>],
    enums: &[Vec<u8>],
) -> Vec<u8> {
    let mut out = Vec::new();
    if !package.is_empty() {
        out.extend(tagged_str(2, package));
    }
    for decl in messages {
        out.extend(tagged_bytes(4, decl));
    }
    for decl in enums {
        out.extend(tagged_bytes(5, decl));
    }
    if !syntax.is_empty() {
        out.extend(tagged_str(12, syntax));
    }
    out
}

/// Serialize a `FileDescriptorSet`
pub(crate) fn file_set(files: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    for file in files {
        out.extend(tagged_bytes(1, file));
    }
    out
}

/// Load a descriptor set into a fresh registry, panicking on failure
pub(crate) fn registry_with(descriptor: &[u8]) -> Registry {
    let mut registry = Registry::new();
    registry.load(descriptor).expect("descriptor should load");
    registry
}

/// proto3 `test.Point { int32 x = 1; int32 y = 2; }`
pub(crate) fn point_schema() -> Vec<u8> {
    let point = message_desc(
        "Point",
        &[
            field_desc(&FieldDesc {
                name: "x",
                number: 1,
                ..Default::default()
            }),
            field_desc(&FieldDesc {
                name: "y",
                number: 2,
                ..Default::default()
            }),
        ],
        &[],
        &[],
        &[],
        false,
    );
    file_set(&[file_desc("test", "proto3", &[point], &[])])
}

/// proto3 `test.M { repeated int32 vals = 1; }` (packed by default)
pub(crate) fn packed_schema() -> Vec<u8> {
    let msg = message_desc(
        "M",
        &[field_desc(&FieldDesc {
            name: "vals",
            number: 1,
            repeated: true,
            ..Default::default()
        })],
        &[],
        &[],
        &[],
        false,
    );
    file_set(&[file_desc("test", "proto3", &[msg], &[])])
}

/// proto3 `test.Every` covering one field per scalar kind plus string/bytes
pub(crate) fn scalar_schema() -> Vec<u8> {
    let fields: Vec<Vec<u8>> = [
        ("f_double", FieldKind::Double),
        ("f_float", FieldKind::Float),
        ("f_int64", FieldKind::Int64),
        ("f_uint64", FieldKind::Uint64),
        ("f_int32", FieldKind::Int32),
        ("f_fixed64", FieldKind::Fixed64),
        ("f_fixed32", FieldKind::Fixed32),
        ("f_bool", FieldKind::Bool),
        ("f_string", FieldKind::String),
        ("f_bytes", FieldKind::Bytes),
        ("f_uint32", FieldKind::Uint32),
        ("f_sfixed32", FieldKind::Sfixed32),
        ("f_sfixed64", FieldKind::Sfixed64),
        ("f_sint32", FieldKind::Sint32),
        ("f_sint64", FieldKind::Sint64),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (name, kind))| {
        field_desc(&FieldDesc {
            name,
            number: i as i32 + 1,
            kind,
            ..Default::default()
        })
    })
    .collect();
    let msg = message_desc("Every", &fields, &[], &[], &[], false);
    file_set(&[file_desc("test", "proto3", &[msg], &[])])
}

/// proto3 `test.User { Point home = 1; string name = 2; }` with nested Point
pub(crate) fn nested_schema() -> Vec<u8> {
    let point = message_desc(
        "Point",
        &[
            field_desc(&FieldDesc {
                name: "x",
                number: 1,
                ..Default::default()
            }),
            field_desc(&FieldDesc {
                name: "y",
                number: 2,
                ..Default::default()
            }),
        ],
        &[],
        &[],
        &[],
        false,
    );
    let user = message_desc(
        "User",
        &[
            field_desc(&FieldDesc {
                name: "home",
                number: 1,
                kind: FieldKind::Message,
                type_name: ".test.Point",
                ..Default::default()
            }),
            field_desc(&FieldDesc {
                name: "name",
                number: 2,
                kind: FieldKind::String,
                ..Default::default()
            }),
        ],
        &[],
        &[],
        &[],
        false,
    );
    file_set(&[file_desc("test", "proto3", &[user, point], &[])])
}

/// proto3 `test.Paint { Color color = 1; }` with `Color { NONE RED GREEN }`
pub(crate) fn enum_schema() -> Vec<u8> {
    let color = enum_desc("Color", &[("NONE", 0), ("RED", 1), ("GREEN", 2)]);
    let paint = message_desc(
        "Paint",
        &[field_desc(&FieldDesc {
            name: "color",
            number: 1,
            kind: FieldKind::Enum,
            type_name: ".test.Color",
            ..Default::default()
        })],
        &[],
        &[],
        &[],
        false,
    );
    file_set(&[file_desc("test", "proto3", &[paint], &[color])])
}

/// proto3 `test.Labels { map<string, int32> tags = 1; }`
pub(crate) fn map_schema() -> Vec<u8> {
    let entry = message_desc(
        "TagsEntry",
        &[
            field_desc(&FieldDesc {
                name: "key",
                number: 1,
                kind: FieldKind::String,
                ..Default::default()
            }),
            field_desc(&FieldDesc {
                name: "value",
                number: 2,
                ..Default::default()
            }),
        ],
        &[],
        &[],
        &[],
        true,
    );
    let labels = message_desc(
        "Labels",
        &[field_desc(&FieldDesc {
            name: "tags",
            number: 1,
            kind: FieldKind::Message,
            repeated: true,
            type_name: ".test.Labels.TagsEntry",
            ..Default::default()
        })],
        &[entry],
        &[],
        &[],
        false,
    );
    file_set(&[file_desc("test", "proto3", &[labels], &[])])
}

/// proto3 `test.Shape { oneof kind { int32 radius = 1; int32 width = 2; } }`
pub(crate) fn oneof_schema() -> Vec<u8> {
    let shape = message_desc(
        "Shape",
        &[
            field_desc(&FieldDesc {
                name: "radius",
                number: 1,
                oneof_index: Some(0),
                ..Default::default()
            }),
            field_desc(&FieldDesc {
                name: "width",
                number: 2,
                oneof_index: Some(0),
                ..Default::default()
            }),
        ],
        &[],
        &[],
        &["kind"],
        false,
    );
    file_set(&[file_desc("test", "proto3", &[shape], &[])])
}
