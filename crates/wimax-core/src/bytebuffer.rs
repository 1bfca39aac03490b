use std::fmt;

use crate::pdu_parse_error::PduParseErr;

/// Byte-aligned cursor over a buffer, used for all message encoding and decoding.
/// Multi-byte fields are big-endian.
pub struct ByteBuffer {
    buffer: Vec<u8>,
    pos: usize,              // next byte offset for read/write
    end: usize,              // bytes at or after this are out of window
    flag_autoexpand: bool,   // if true, writes past the end grow the buffer
}

impl ByteBuffer {
    /// Create a zeroed buffer holding exactly `len` bytes
    pub fn new(len: usize) -> Self {
        ByteBuffer {
            buffer: vec![0; len],
            pos: 0,
            end: len,
            flag_autoexpand: false,
        }
    }

    /// Create an empty buffer with some initial capacity. Writes advance the end pointer.
    pub fn new_autoexpand(initial_capacity: usize) -> Self {
        ByteBuffer {
            buffer: Vec::with_capacity(initial_capacity),
            pos: 0,
            end: 0,
            flag_autoexpand: true,
        }
    }

    pub fn from_vec(data: Vec<u8>) -> Self {
        let end = data.len();
        ByteBuffer {
            buffer: data,
            pos: 0,
            end,
            flag_autoexpand: false,
        }
    }

    pub fn from_bytes(data: &[u8]) -> Self {
        Self::from_vec(data.to_vec())
    }

    /// Peeks `num_bytes` (at most 8) big-endian bytes at pos without consuming them
    pub fn peek_field(&self, num_bytes: usize) -> Option<u64> {
        assert!(num_bytes <= 8, "can't peek more than 8 bytes at once");
        if self.pos + num_bytes > self.end {
            return None;
        }
        let mut v = 0u64;
        for b in &self.buffer[self.pos..self.pos + num_bytes] {
            v = (v << 8) | *b as u64;
        }
        Some(v)
    }

    pub fn read_uint(&mut self, num_bytes: usize) -> Option<u64> {
        let v = self.peek_field(num_bytes)?;
        self.pos += num_bytes;
        Some(v)
    }

    /// Reads a big-endian unsigned field, or returns BufferEnded naming the field
    pub fn read_field(&mut self, num_bytes: usize, field: &'static str) -> Result<u64, PduParseErr> {
        self.read_uint(num_bytes).ok_or(PduParseErr::BufferEnded { field: Some(field) })
    }

    /// Reads `num_bytes` raw bytes
    pub fn read_bytes(&mut self, num_bytes: usize, field: &'static str) -> Result<Vec<u8>, PduParseErr> {
        if self.pos + num_bytes > self.end {
            return Err(PduParseErr::BufferEnded { field: Some(field) });
        }
        let out = self.buffer[self.pos..self.pos + num_bytes].to_vec();
        self.pos += num_bytes;
        Ok(out)
    }

    /// Reads into a fixed-size array
    pub fn read_array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], PduParseErr> {
        if self.pos + N > self.end {
            return Err(PduParseErr::BufferEnded { field: Some(field) });
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buffer[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }

    fn reserve_write(&mut self, num_bytes: usize) {
        let needed = self.pos + num_bytes;
        if needed > self.end {
            assert!(self.flag_autoexpand, "write would exceed buffer end");
            if needed > self.buffer.len() {
                self.buffer.resize(needed, 0);
            }
            self.end = needed;
        }
    }

    /// Writes the lowest `num_bytes` bytes of `value`, big-endian
    pub fn write_uint(&mut self, value: u64, num_bytes: usize) {
        assert!(num_bytes <= 8, "can't write more than 8 bytes at once");
        assert!(num_bytes == 8 || value >> (num_bytes * 8) == 0, "value exceeds num_bytes");
        self.reserve_write(num_bytes);
        for i in 0..num_bytes {
            let shift = (num_bytes - 1 - i) * 8;
            self.buffer[self.pos + i] = (value >> shift) as u8;
        }
        self.pos += num_bytes;
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.reserve_write(data.len());
        self.buffer[self.pos..self.pos + data.len()].copy_from_slice(data);
        self.pos += data.len();
    }

    /// Total length of the window
    pub fn get_len(&self) -> usize {
        self.end
    }

    pub fn get_len_remaining(&self) -> usize {
        self.end - self.pos
    }

    pub fn get_pos(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, offset: usize) {
        assert!(offset <= self.end, "seek beyond end");
        self.pos = offset;
    }

    /// Skips `num_bytes`, failing if fewer remain
    pub fn skip(&mut self, num_bytes: usize, field: &'static str) -> Result<(), PduParseErr> {
        if self.pos + num_bytes > self.end {
            return Err(PduParseErr::BufferEnded { field: Some(field) });
        }
        self.pos += num_bytes;
        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[..self.end]
    }

    pub fn into_bytes(mut self) -> Vec<u8> {
        self.buffer.truncate(self.end);
        self.buffer
    }

    /// Hex dump of the whole window
    pub fn dump_hex(&self) -> String {
        let mut s = String::with_capacity(self.end * 2);
        for b in &self.buffer[..self.end] {
            s.push_str(&format!("{:02x}", b));
        }
        s
    }
}

impl fmt::Display for ByteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteBuffer {{ pos: {}, len: {}, data: {} }}", self.pos, self.end, self.dump_hex())
    }
}

impl fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
