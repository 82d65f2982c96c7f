//! Growable append-only byte sink
//!
//! [`Buffer`] is the write-side counterpart of [`Slice`](crate::Slice). It
//! owns its backing storage and supports one operation a plain `Vec` does
//! not make obvious: retroactively length-prefixing a span of bytes that was
//! written before its length was known ([`Buffer::add_length`]). Nested
//! messages are encoded speculatively into the same buffer and prefixed
//! afterwards, so encoding never needs a second pass.
//!
//! Growth re-allocates, so views returned by [`Buffer::result`] must not be
//! held across further appends (the borrow checker enforces this).

use bytes::Bytes;

use crate::codec::{self, MAX_VARINT_LEN};

/// Initial capacity in bytes
pub const BUFFER_INIT_CAPACITY: usize = 1024;

/// Append-only byte sink with retroactive length prefixing
#[derive(Debug, Default)]
pub struct Buffer {
    buf: Vec<u8>,
}

impl Buffer {
    /// Create an empty buffer; storage is reserved lazily
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Written length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True when nothing has been written
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Borrowed view of the written bytes
    #[inline]
    pub fn result(&self) -> &[u8] {
        &self.buf
    }

    /// Clear the written length without releasing capacity
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Freeze into a reference-counted byte buffer
    pub fn into_bytes(self) -> Bytes {
        Bytes::from(self.buf)
    }

    /// Ensure room for `extra` more bytes
    ///
    /// Capacity starts at [`BUFFER_INIT_CAPACITY`] and grows by 1.5x until
    /// the request fits.
    pub fn reserve(&mut self, extra: usize) {
        let needed = self.buf.len() + extra;
        if needed <= self.buf.capacity() {
            return;
        }
        let mut cap = self.buf.capacity().max(BUFFER_INIT_CAPACITY);
        while cap < needed {
            cap += cap >> 1;
        }
        self.buf.reserve_exact(cap - self.buf.len());
    }

    /// Append a single byte
    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.reserve(1);
        self.buf.push(byte);
    }

    /// Append raw bytes
    pub fn add_slice(&mut self, bytes: &[u8]) -> usize {
        self.reserve(bytes.len());
        self.buf.extend_from_slice(bytes);
        bytes.len()
    }

    /// Append a varint, returning the bytes written
    pub fn add_varint64(&mut self, value: u64) -> usize {
        let mut scratch = [0u8; MAX_VARINT_LEN];
        let len = codec::write_varint64(&mut scratch, value);
        self.add_slice(&scratch[..len])
    }

    /// Append a 32-bit varint
    #[inline]
    pub fn add_varint32(&mut self, value: u32) -> usize {
        self.add_varint64(u64::from(value))
    }

    /// Append 4 little-endian bytes
    pub fn add_fixed32(&mut self, value: u32) -> usize {
        self.add_slice(&value.to_le_bytes())
    }

    /// Append 8 little-endian bytes
    pub fn add_fixed64(&mut self, value: u64) -> usize {
        self.add_slice(&value.to_le_bytes())
    }

    /// Append a varint length prefix followed by the bytes themselves
    pub fn add_bytes(&mut self, bytes: &[u8]) -> usize {
        self.add_varint64(bytes.len() as u64) + self.add_slice(bytes)
    }

    /// Current write position, for a later [`Buffer::add_length`]
    #[inline]
    pub fn mark(&self) -> usize {
        self.buf.len()
    }

    /// Length-prefix everything written since `mark`
    ///
    /// Computes `len() - mark`, varint-encodes it, and splices the prefix in
    /// at `mark`, shifting the span right. Returns the prefix size.
    pub fn add_length(&mut self, mark: usize) -> usize {
        debug_assert!(mark <= self.buf.len());
        let span = self.buf.len() - mark;
        let mut scratch = [0u8; MAX_VARINT_LEN];
        let prefix = codec::write_varint64(&mut scratch, span as u64);
        self.reserve(prefix);
        self.buf.extend_from_slice(&scratch[..prefix]);
        self.buf[mark..].rotate_right(prefix);
        prefix
    }

    /// Drop everything written since `mark`
    ///
    /// Used by the encoder to un-write values that turn out to be omitted
    /// (proto3 zero-value suppression).
    pub fn truncate(&mut self, mark: usize) {
        debug_assert!(mark <= self.buf.len());
        self.buf.truncate(mark);
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        &self.buf
    }
}
