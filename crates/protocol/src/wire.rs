//! Wire-format tags and type enumerations
//!
//! These mirror the protobuf wire specification and the descriptor `Type`
//! enumeration. The values are used on the wire and must not change.
//!
//! # Tag Layout
//!
//! ```text
//! tag = varint(field_number << 3 | wire_type)
//! ```

/// Physical encoding of a field value (the low 3 bits of a tag)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    /// Base-128 varint
    Varint = 0,
    /// 8 raw little-endian bytes
    Fixed64 = 1,
    /// Varint length prefix followed by raw bytes
    Bytes = 2,
    /// Start of a group (legacy)
    GroupStart = 3,
    /// End of a group (legacy)
    GroupEnd = 4,
    /// 4 raw little-endian bytes
    Fixed32 = 5,
}

impl WireType {
    /// Parse a wire type from the low 3 bits of a tag
    #[inline]
    pub const fn from_tag_bits(value: u32) -> Option<Self> {
        match value & 7 {
            0 => Some(Self::Varint),
            1 => Some(Self::Fixed64),
            2 => Some(Self::Bytes),
            3 => Some(Self::GroupStart),
            4 => Some(Self::GroupEnd),
            5 => Some(Self::Fixed32),
            _ => None,
        }
    }

    /// Wire name used in error messages
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Varint => "varint",
            Self::Fixed64 => "64bit",
            Self::Bytes => "bytes",
            Self::GroupStart => "gstart",
            Self::GroupEnd => "gend",
            Self::Fixed32 => "32bit",
        }
    }
}

impl std::fmt::Display for WireType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Declared kind of a field (the descriptor `Type` enumeration)
///
/// NOTE: the discriminants are descriptor wire values and must match
/// `FieldDescriptorProto.Type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FieldKind {
    Double = 1,
    Float = 2,
    Int64 = 3,
    Uint64 = 4,
    Int32 = 5,
    Fixed64 = 6,
    Fixed32 = 7,
    Bool = 8,
    String = 9,
    Group = 10,
    Message = 11,
    Bytes = 12,
    Uint32 = 13,
    Enum = 14,
    Sfixed32 = 15,
    Sfixed64 = 16,
    Sint32 = 17,
    Sint64 = 18,
}

impl FieldKind {
    /// Parse a kind from its descriptor value
    #[inline]
    pub const fn from_descriptor(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::Double),
            2 => Some(Self::Float),
            3 => Some(Self::Int64),
            4 => Some(Self::Uint64),
            5 => Some(Self::Int32),
            6 => Some(Self::Fixed64),
            7 => Some(Self::Fixed32),
            8 => Some(Self::Bool),
            9 => Some(Self::String),
            10 => Some(Self::Group),
            11 => Some(Self::Message),
            12 => Some(Self::Bytes),
            13 => Some(Self::Uint32),
            14 => Some(Self::Enum),
            15 => Some(Self::Sfixed32),
            16 => Some(Self::Sfixed64),
            17 => Some(Self::Sint32),
            18 => Some(Self::Sint64),
            _ => None,
        }
    }

    /// Wire type this kind is physically encoded with
    #[inline]
    pub const fn wire_type(self) -> WireType {
        match self {
            Self::Double | Self::Fixed64 | Self::Sfixed64 => WireType::Fixed64,
            Self::Float | Self::Fixed32 | Self::Sfixed32 => WireType::Fixed32,
            Self::String | Self::Message | Self::Bytes => WireType::Bytes,
            Self::Group => WireType::GroupStart,
            _ => WireType::Varint,
        }
    }

    /// Length-delimited kinds never pack
    #[inline]
    pub const fn packable(self) -> bool {
        !matches!(self, Self::String | Self::Group | Self::Message | Self::Bytes)
    }

    /// Descriptor name used in error messages
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Double => "double",
            Self::Float => "float",
            Self::Int64 => "int64",
            Self::Uint64 => "uint64",
            Self::Int32 => "int32",
            Self::Fixed64 => "fixed64",
            Self::Fixed32 => "fixed32",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Group => "group",
            Self::Message => "message",
            Self::Bytes => "bytes",
            Self::Uint32 => "uint32",
            Self::Enum => "enum",
            Self::Sfixed32 => "sfixed32",
            Self::Sfixed64 => "sfixed64",
            Self::Sint32 => "sint32",
            Self::Sint64 => "sint64",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Build a tag from a field number and wire type
#[inline]
pub const fn make_tag(field_number: u32, wire_type: WireType) -> u32 {
    field_number << 3 | wire_type as u32
}

/// Field number carried by a tag
#[inline]
pub const fn tag_number(tag: u32) -> u32 {
    tag >> 3
}

/// Wire type carried by a tag
#[inline]
pub const fn tag_wire_type(tag: u32) -> Option<WireType> {
    WireType::from_tag_bits(tag)
}
