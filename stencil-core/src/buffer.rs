//! Growable output buffer with absolute-offset overwrite

use bytes::{BufMut, Bytes, BytesMut};

const INITIAL_CAPACITY: usize = 16;

/// Byte sink owned by exactly one execution
///
/// Writes land at an absolute offset: bytes inside the current length are
/// overwritten, writes past the end grow the buffer (zero-filling any gap).
/// Capacity doubles whenever a write would overflow it.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    bytes: BytesMut,
}

impl OutputBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    /// Create an empty buffer with room for `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: BytesMut::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing has been written
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Currently allocated capacity
    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    /// View of the written bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Shorten the buffer to `len` bytes (no-op if already shorter)
    pub fn truncate(&mut self, len: usize) {
        self.bytes.truncate(len);
    }

    /// Write `data` starting at `offset`, overwriting and growing as needed
    pub fn write_at(&mut self, offset: usize, data: &[u8]) {
        let end = offset + data.len();
        self.extend_to(offset);
        let overlap = self.bytes.len().min(end) - offset;
        self.bytes[offset..offset + overlap].copy_from_slice(&data[..overlap]);
        if overlap < data.len() {
            self.ensure_capacity(end);
            self.bytes.put_slice(&data[overlap..]);
        }
    }

    /// Write `count` copies of `byte` starting at `offset`
    pub fn fill_at(&mut self, offset: usize, byte: u8, count: usize) {
        let end = offset + count;
        self.extend_to(offset);
        let overlap = self.bytes.len().min(end) - offset;
        self.bytes[offset..offset + overlap].fill(byte);
        if overlap < count {
            self.ensure_capacity(end);
            self.bytes.put_bytes(byte, count - overlap);
        }
    }

    /// Freeze the first `len` bytes into an immutable result
    pub fn finish(mut self, len: usize) -> Bytes {
        self.extend_to(len);
        self.bytes.truncate(len);
        self.bytes.freeze()
    }

    fn extend_to(&mut self, len: usize) {
        if len > self.bytes.len() {
            self.ensure_capacity(len);
            let gap = len - self.bytes.len();
            self.bytes.put_bytes(0, gap);
        }
    }

    fn ensure_capacity(&mut self, needed: usize) {
        let capacity = self.bytes.capacity();
        if needed > capacity {
            let target = needed.max(capacity.saturating_mul(2)).max(INITIAL_CAPACITY);
            self.bytes.reserve(target - self.bytes.len());
        }
    }
}
