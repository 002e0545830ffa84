use crate::{ErrorKind, StreamError, StreamResult};
use java_string::JavaStr;
use std::borrow::Cow;

/// Monotonic positional reader over an immutable byte buffer. All multi-byte
/// integers on the wire are big-endian.
#[derive(Debug, Copy, Clone)]
pub struct ByteCursor<'data> {
    data: &'data [u8],
    pos: usize,
}

impl<'data> ByteCursor<'data> {
    pub fn new(data: &'data [u8]) -> ByteCursor<'data> {
        ByteCursor { data, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Bytes left between the current position and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Moves the position forward by `n` bytes and returns the prior
    /// position.
    pub fn advance(&mut self, n: usize) -> StreamResult<usize> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| self.eof(n))?;
        Ok(std::mem::replace(&mut self.pos, end))
    }

    pub fn read_bytes(&mut self, n: usize) -> StreamResult<&'data [u8]> {
        let start = self.advance(n)?;
        Ok(&self.data[start..start + n])
    }

    fn read_array<const N: usize>(&mut self) -> StreamResult<[u8; N]> {
        let slice = self.read_bytes(N)?;
        // SAFETY: just read the correct amount of bytes so the conversion to array should succeed
        let array = unsafe { slice.try_into().unwrap_unchecked() };
        Ok(array)
    }

    pub fn read_u8(&mut self) -> StreamResult<u8> {
        self.read_array::<1>().map(|arr| arr[0])
    }

    pub fn read_i8(&mut self) -> StreamResult<i8> {
        self.read_u8().map(|u| u as i8)
    }

    pub fn read_u16(&mut self) -> StreamResult<u16> {
        self.read_array::<2>().map(u16::from_be_bytes)
    }

    pub fn read_i16(&mut self) -> StreamResult<i16> {
        self.read_u16().map(|u| u as i16)
    }

    pub fn read_u32(&mut self) -> StreamResult<u32> {
        self.read_array::<4>().map(u32::from_be_bytes)
    }

    pub fn read_i32(&mut self) -> StreamResult<i32> {
        self.read_u32().map(|u| u as i32)
    }

    pub fn read_i64(&mut self) -> StreamResult<i64> {
        self.read_array::<8>().map(i64::from_be_bytes)
    }

    pub fn read_f32(&mut self) -> StreamResult<f32> {
        self.read_u32().map(f32::from_bits)
    }

    pub fn read_f64(&mut self) -> StreamResult<f64> {
        self.read_i64().map(|i| f64::from_bits(i as u64))
    }

    /// Reads `n` bytes as lowercase hex, two digits per byte.
    pub fn read_hex(&mut self, n: usize) -> StreamResult<String> {
        let bytes = self.read_bytes(n)?;
        Ok(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Reads a u16 length followed by that many bytes of modified UTF-8.
    pub fn read_utf(&mut self) -> StreamResult<Cow<'data, JavaStr>> {
        let len = self.read_u16()? as usize;
        self.read_modified_utf8(len)
    }

    /// Reads a u64 length followed by that many bytes of modified UTF-8.
    /// Lengths above 2^32 are not supported.
    pub fn read_long_utf(&mut self) -> StreamResult<Cow<'data, JavaStr>> {
        let at = self.pos;
        if self.read_u32()? != 0 {
            return Err(StreamError {
                kind: ErrorKind::LongStringOverflow,
                offset: at,
            });
        }
        let len = self.read_u32()? as usize;
        self.read_modified_utf8(len)
    }

    fn read_modified_utf8(&mut self, len: usize) -> StreamResult<Cow<'data, JavaStr>> {
        let at = self.pos;
        let bytes = self.read_bytes(len)?;
        JavaStr::from_modified_utf8(bytes).map_err(|e| StreamError {
            kind: ErrorKind::Utf8(e),
            offset: at,
        })
    }

    fn eof(&self, wanted: usize) -> StreamError {
        StreamError {
            kind: ErrorKind::PrematureEndOfInput {
                wanted,
                len: self.data.len(),
            },
            offset: self.pos,
        }
    }
}
