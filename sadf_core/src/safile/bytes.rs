// Endian-aware field access over mapped file bytes and encode buffers.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use super::error::{FormatError, Result};

/// Byte order the producer used when writing the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    pub fn read_u16(self, buf: &[u8]) -> u16 {
        match self {
            Endian::Little => LittleEndian::read_u16(buf),
            Endian::Big => BigEndian::read_u16(buf),
        }
    }

    pub fn read_u32(self, buf: &[u8]) -> u32 {
        match self {
            Endian::Little => LittleEndian::read_u32(buf),
            Endian::Big => BigEndian::read_u32(buf),
        }
    }

    pub fn read_u64(self, buf: &[u8]) -> u64 {
        match self {
            Endian::Little => LittleEndian::read_u64(buf),
            Endian::Big => BigEndian::read_u64(buf),
        }
    }

    fn write_u16(self, buf: &mut [u8], value: u16) {
        match self {
            Endian::Little => LittleEndian::write_u16(buf, value),
            Endian::Big => BigEndian::write_u16(buf, value),
        }
    }

    fn write_u32(self, buf: &mut [u8], value: u32) {
        match self {
            Endian::Little => LittleEndian::write_u32(buf, value),
            Endian::Big => BigEndian::write_u32(buf, value),
        }
    }

    fn write_u64(self, buf: &mut [u8], value: u64) {
        match self {
            Endian::Little => LittleEndian::write_u64(buf, value),
            Endian::Big => BigEndian::write_u64(buf, value),
        }
    }
}

impl std::fmt::Display for Endian {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endian::Little => write!(f, "little-endian"),
            Endian::Big => write!(f, "big-endian"),
        }
    }
}

/// Bounds-checked sequential reader. Offsets reported in errors are absolute
/// positions within `data`.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    endian: Endian,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8], endian: Endian) -> Self {
        Self::at(data, 0, endian)
    }

    pub fn at(data: &'a [u8], pos: usize, endian: Endian) -> Self {
        Self { data, pos, endian }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_at_end(&self) -> bool {
        self.remaining() == 0
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(FormatError::Truncated {
                offset: self.pos,
                needed: len,
                available: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.take(len).map(|_| ())
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16> {
        let endian = self.endian;
        Ok(endian.read_u16(self.take(2)?))
    }

    pub fn u32(&mut self) -> Result<u32> {
        let endian = self.endian;
        Ok(endian.read_u32(self.take(4)?))
    }

    pub fn u64(&mut self) -> Result<u64> {
        let endian = self.endian;
        Ok(endian.read_u64(self.take(8)?))
    }

    /// NUL-padded text field of exactly `len` bytes
    pub fn text(&mut self, len: usize) -> Result<String> {
        Ok(decode_text(self.take(len)?).into_owned())
    }
}

/// Decode a NUL-padded byte field, replacing invalid UTF-8
pub fn decode_text(raw: &[u8]) -> std::borrow::Cow<'_, str> {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end])
}

/// Growable encode buffer mirroring [`ByteCursor`]
#[derive(Debug)]
pub struct ByteSink {
    buf: Vec<u8>,
    endian: Endian,
}

impl ByteSink {
    pub fn new(endian: Endian) -> Self {
        Self::with_capacity(endian, 0)
    }

    pub fn with_capacity(endian: Endian, capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            endian,
        }
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn u16(&mut self, value: u16) -> &mut Self {
        let mut raw = [0u8; 2];
        self.endian.write_u16(&mut raw, value);
        self.buf.extend_from_slice(&raw);
        self
    }

    pub fn u32(&mut self, value: u32) -> &mut Self {
        let mut raw = [0u8; 4];
        self.endian.write_u32(&mut raw, value);
        self.buf.extend_from_slice(&raw);
        self
    }

    pub fn u64(&mut self, value: u64) -> &mut Self {
        let mut raw = [0u8; 8];
        self.endian.write_u64(&mut raw, value);
        self.buf.extend_from_slice(&raw);
        self
    }

    pub fn zeros(&mut self, len: usize) -> &mut Self {
        self.buf.resize(self.buf.len() + len, 0);
        self
    }

    /// Text truncated or NUL-padded to exactly `len` bytes
    pub fn text(&mut self, value: &str, len: usize) -> &mut Self {
        let raw = value.as_bytes();
        let used = raw.len().min(len);
        self.buf.extend_from_slice(&raw[..used]);
        self.zeros(len - used)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
