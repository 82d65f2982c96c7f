//! dynapb protocol - schema-driven protobuf codec with runtime reflection
//!
//! This crate implements the Protocol Buffers wire format without code
//! generation. Message types are loaded at runtime from a serialized
//! descriptor set into a [`Registry`], and dynamic [`Message`] values are
//! encoded and decoded against the registered schema:
//!
//! - `Slice` / `Buffer` - zero-copy read cursor and growable write sink
//! - `NameTable` - content-addressed interned strings
//! - `Registry` - the reflection database of types and fields
//! - descriptor loader - populates the registry from schema bytes
//! - encode/decode engines - walk dynamic messages against the schema
//!
//! # Design Principles
//!
//! - **Zero-copy reads**: decoding advances a borrowed cursor; bytes are
//!   only copied when a value is materialized
//! - **Explicit state**: the registry is a plain value, shared deliberately
//!   or not at all; there is no process-wide global
//! - **Permissive evolution**: unknown fields skip cleanly and forward
//!   type references resolve once the declaration arrives
//!
//! # Example
//!
//! ```ignore
//! use dynapb_protocol::{Message, Registry, Value};
//!
//! let mut registry = Registry::new();
//! registry.load(&descriptor_bytes)?;
//!
//! let point = Message::new()
//!     .with("x", Value::I32(150))
//!     .with("y", Value::I32(-3));
//! let bytes = registry.encode("pkg.Point", &point)?;
//! let back = registry.decode("pkg.Point", &bytes)?;
//! ```

mod buffer;
mod codec;
mod decode;
mod encode;
mod error;
mod loader;
mod names;
mod registry;
mod slice;
mod value;
mod wire;

pub use buffer::{Buffer, BUFFER_INIT_CAPACITY};
pub use codec::{
    decode_double, decode_float, decode_sint32, decode_sint64, encode_double, encode_float,
    encode_sint32, encode_sint64, expand_sig, varint_size, MAX_VARINT_LEN,
};
pub use decode::{DecodeOptions, DefaultMode, EnumMode, Int64Mode};
pub use error::ProtoError;
pub use names::{Name, NameTable};
pub use registry::{Field, FieldId, Registry, Type, TypeId};
pub use slice::Slice;
pub use value::{MapKey, Message, Value};
pub use wire::{make_tag, tag_number, tag_wire_type, FieldKind, WireType};

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, ProtoError>;

// Test modules - only compiled during testing
#[cfg(test)]
mod testutil;

#[cfg(test)]
mod codec_test;
#[cfg(test)]
mod names_test;
