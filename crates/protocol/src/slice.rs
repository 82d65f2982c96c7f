//! Zero-copy read cursor
//!
//! A [`Slice`] borrows a `[start, end)` byte range it does not own and only
//! ever moves its read position forward. All decoding goes through a `Slice`;
//! nothing is copied until a value is materialized.
//!
//! Sub-slices produced by [`Slice::read_bytes`] remember the absolute offset
//! of their first byte within the original message, so errors raised deep
//! inside nested payloads still report positions the caller can map back to
//! the input.
//!
//! On failure every read restores the cursor to the start of the value, so
//! the reported offset always points at the offending bytes.

use crate::codec::MAX_VARINT_LEN;
use crate::wire::{self, WireType};
use crate::{ProtoError, Result};

/// Borrowed, forward-only view over wire-format bytes
#[derive(Debug, Clone, Copy)]
pub struct Slice<'a> {
    data: &'a [u8],
    pos: usize,
    /// Absolute offset of `data[0]` within the original message
    head: usize,
}

impl<'a> Slice<'a> {
    /// Wrap a byte range, treating its first byte as offset 0
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, head: 0 }
    }

    /// Absolute offset of the read position within the original message
    #[inline]
    pub fn offset(&self) -> usize {
        self.head + self.pos
    }

    /// Bytes left to read
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True when the cursor has consumed every byte
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Unread bytes as a plain slice
    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Read one varint, up to 64 bits
    pub fn read_varint64(&mut self) -> Result<u64> {
        let bytes = self.as_bytes();
        let mut value = 0u64;
        for (i, &byte) in bytes.iter().take(MAX_VARINT_LEN).enumerate() {
            value |= u64::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                self.pos += i + 1;
                return Ok(value);
            }
        }
        Err(ProtoError::bad_varint(self.offset()))
    }

    /// Read one varint, truncated to 32 bits
    ///
    /// Oversized encodings are accepted and truncated, matching wire
    /// behavior for `int32` values that were sign-extended on encode.
    #[inline]
    pub fn read_varint32(&mut self) -> Result<u32> {
        self.read_varint64().map(|v| v as u32)
    }

    /// Read 4 little-endian bytes
    pub fn read_fixed32(&mut self) -> Result<u32> {
        match self.as_bytes().first_chunk::<4>() {
            Some(raw) => {
                self.pos += 4;
                Ok(u32::from_le_bytes(*raw))
            }
            None => Err(ProtoError::bad_fixed(32, self.offset())),
        }
    }

    /// Read 8 little-endian bytes
    pub fn read_fixed64(&mut self) -> Result<u64> {
        match self.as_bytes().first_chunk::<8>() {
            Some(raw) => {
                self.pos += 8;
                Ok(u64::from_le_bytes(*raw))
            }
            None => Err(ProtoError::bad_fixed(64, self.offset())),
        }
    }

    /// Split off the next `len` bytes as a sub-cursor
    pub fn read_slice(&mut self, len: usize) -> Result<Slice<'a>> {
        if self.remaining() < len {
            return Err(ProtoError::truncated_bytes(len as u64, self.offset()));
        }
        let sub = Slice {
            data: &self.data[self.pos..self.pos + len],
            pos: 0,
            head: self.offset(),
        };
        self.pos += len;
        Ok(sub)
    }

    /// Read a varint length prefix, then that many bytes as a sub-cursor
    pub fn read_bytes(&mut self) -> Result<Slice<'a>> {
        let start = self.pos;
        let len = self.read_varint64()?;
        if self.remaining() < len as usize {
            let err = ProtoError::truncated_bytes(len, self.offset());
            self.pos = start;
            return Err(err);
        }
        self.read_slice(len as usize)
    }

    /// Read the next field tag, or `None` at a clean end of input
    ///
    /// A truncated tag varint mid-stream is an error, not an end marker.
    pub fn read_tag(&mut self) -> Result<Option<u32>> {
        if self.is_empty() {
            return Ok(None);
        }
        self.read_varint32().map(Some)
    }

    /// Skip a varint value
    pub fn skip_varint(&mut self) -> Result<()> {
        self.read_varint64().map(drop)
    }

    /// Skip exactly `len` bytes
    pub fn skip_len(&mut self, len: usize) -> Result<()> {
        if self.remaining() < len {
            return Err(ProtoError::truncated_bytes(len as u64, self.offset()));
        }
        self.pos += len;
        Ok(())
    }

    /// Skip a length-prefixed payload
    pub fn skip_bytes(&mut self) -> Result<()> {
        let start = self.pos;
        let len = self.read_varint64()?;
        if self.remaining() < len as usize {
            let err = ProtoError::truncated_bytes(len, self.offset());
            self.pos = start;
            return Err(err);
        }
        self.pos += len as usize;
        Ok(())
    }

    /// Skip a group body up to and including its matching end tag
    pub fn skip_group(&mut self, tag: u32) -> Result<()> {
        let start = self.pos;
        while let Some(inner) = self.read_tag()? {
            if wire::tag_wire_type(inner) == Some(WireType::GroupEnd) {
                if wire::tag_number(inner) == wire::tag_number(tag) {
                    return Ok(());
                }
                break;
            }
            self.skip_value(inner)?;
        }
        let err = ProtoError::UnterminatedGroup {
            field_number: wire::tag_number(tag),
            offset: self.offset(),
        };
        self.pos = start;
        Err(err)
    }

    /// Skip one value according to the wire type carried by `tag`
    ///
    /// This is how unknown field numbers are dropped without failing the
    /// decode (forward-compatible reads).
    pub fn skip_value(&mut self, tag: u32) -> Result<()> {
        match wire::tag_wire_type(tag) {
            Some(WireType::Varint) => self.skip_varint(),
            Some(WireType::Fixed64) => self.skip_len(8),
            Some(WireType::Bytes) => self.skip_bytes(),
            Some(WireType::Fixed32) => self.skip_len(4),
            Some(WireType::GroupStart) => self.skip_group(tag),
            Some(WireType::GroupEnd) | None => Err(ProtoError::bad_varint(self.offset())),
        }
    }
}

impl<'a> From<&'a [u8]> for Slice<'a> {
    fn from(data: &'a [u8]) -> Self {
        Self::new(data)
    }
}
