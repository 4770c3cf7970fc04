//! Endian-aware seekable reader over an in-memory IGZ buffer.
//!
//! IGZ files are random-access by absolute offset: the object graph is walked
//! by seeking to fixed-up pointers rather than by consuming a stream, so the
//! cursor keeps an explicit position instead of shrinking a slice. Endianness
//! is fixed at construction and applies to every multi-byte read.

use half::f16;
use thiserror::Error;

use crate::data::Endianness;

/// Errors produced by primitive reads.
#[derive(Debug, Error)]
pub enum CursorError {
    #[error("read of {need} bytes at 0x{offset:X} runs past end of buffer (len 0x{len:X})")]
    OutOfBounds {
        offset: usize,
        need: usize,
        len: usize,
    },
    #[error("string at 0x{offset:X} has no NUL terminator before end of buffer")]
    UnterminatedString { offset: usize },
}

/// A seekable, bounds-checked reader over a borrowed byte buffer.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    endian: Endianness,
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8], endian: Endianness) -> Self {
        ByteCursor {
            data,
            endian,
            pos: 0,
        }
    }

    pub fn endian(&self) -> Endianness {
        self.endian
    }

    /// Absolute seek. Seeking past the end is allowed; the next read fails.
    pub fn seek_to(&mut self, offset: u64) {
        self.pos = offset as usize;
    }

    /// Relative seek from the current position.
    pub fn skip(&mut self, delta: i64) {
        self.pos = (self.pos as i64 + delta) as usize;
    }

    pub fn tell(&self) -> u64 {
        self.pos as u64
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], CursorError> {
        let bytes = self
            .data
            .get(self.pos..self.pos + N)
            .ok_or(CursorError::OutOfBounds {
                offset: self.pos,
                need: N,
                len: self.data.len(),
            })?;
        self.pos += N;
        Ok(bytes.try_into().unwrap())
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], CursorError> {
        let bytes = self
            .data
            .get(self.pos..self.pos + count)
            .ok_or(CursorError::OutOfBounds {
                offset: self.pos,
                need: count,
                len: self.data.len(),
            })?;
        self.pos += count;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8, CursorError> {
        Ok(self.take::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, CursorError> {
        let b = self.take::<2>()?;
        Ok(match self.endian {
            Endianness::Little => u16::from_le_bytes(b),
            Endianness::Big => u16::from_be_bytes(b),
        })
    }

    pub fn read_u32(&mut self) -> Result<u32, CursorError> {
        let b = self.take::<4>()?;
        Ok(match self.endian {
            Endianness::Little => u32::from_le_bytes(b),
            Endianness::Big => u32::from_be_bytes(b),
        })
    }

    pub fn read_u64(&mut self) -> Result<u64, CursorError> {
        let b = self.take::<8>()?;
        Ok(match self.endian {
            Endianness::Little => u64::from_le_bytes(b),
            Endianness::Big => u64::from_be_bytes(b),
        })
    }

    pub fn read_i32(&mut self) -> Result<i32, CursorError> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_f32(&mut self) -> Result<f32, CursorError> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, CursorError> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// IEEE 754 half-precision read, widened to `f32`. Subnormals, infinities
    /// and NaN all round-trip through [`half::f16`].
    pub fn read_half(&mut self) -> Result<f32, CursorError> {
        Ok(f16::from_bits(self.read_u16()?).to_f32())
    }

    /// Read a NUL-terminated string and advance past the terminator.
    ///
    /// Non-UTF-8 bytes are replaced rather than rejected; game data
    /// occasionally carries latin-1 artist names in node labels.
    pub fn read_cstring(&mut self) -> Result<String, CursorError> {
        let start = self.pos;
        let remaining = self
            .data
            .get(start..)
            .ok_or(CursorError::UnterminatedString { offset: start })?;
        let nul = remaining
            .iter()
            .position(|&b| b == 0)
            .ok_or(CursorError::UnterminatedString { offset: start })?;
        self.pos = start + nul + 1;
        Ok(String::from_utf8_lossy(&remaining[..nul]).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endian_reads() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let mut le = ByteCursor::new(&data, Endianness::Little);
        assert_eq!(le.read_u32().unwrap(), 0x04030201);
        let mut be = ByteCursor::new(&data, Endianness::Big);
        assert_eq!(be.read_u32().unwrap(), 0x01020304);
    }

    #[test]
    fn half_float_fixtures() {
        let data = [0x00, 0x3C, 0x00, 0xC0, 0x00, 0x7C, 0x01, 0x00];
        let mut bs = ByteCursor::new(&data, Endianness::Little);
        assert_eq!(bs.read_half().unwrap(), 1.0);
        assert_eq!(bs.read_half().unwrap(), -2.0);
        assert_eq!(bs.read_half().unwrap(), f32::INFINITY);
        // smallest subnormal: 2^-24
        assert_eq!(bs.read_half().unwrap(), 2.0f32.powi(-24));
    }

    #[test]
    fn half_float_nan() {
        let data = [0x01, 0x7C];
        let mut bs = ByteCursor::new(&data, Endianness::Little);
        assert!(bs.read_half().unwrap().is_nan());
    }

    #[test]
    fn cstring_reads_and_advances() {
        let data = b"abc\0def\0";
        let mut bs = ByteCursor::new(data, Endianness::Little);
        assert_eq!(bs.read_cstring().unwrap(), "abc");
        assert_eq!(bs.tell(), 4);
        assert_eq!(bs.read_cstring().unwrap(), "def");
    }

    #[test]
    fn cstring_without_terminator_fails() {
        let data = b"abc";
        let mut bs = ByteCursor::new(data, Endianness::Little);
        assert!(matches!(
            bs.read_cstring(),
            Err(CursorError::UnterminatedString { offset: 0 })
        ));
    }

    #[test]
    fn read_past_end_fails() {
        let data = [0u8; 2];
        let mut bs = ByteCursor::new(&data, Endianness::Little);
        assert!(matches!(
            bs.read_u32(),
            Err(CursorError::OutOfBounds { offset: 0, need: 4, len: 2 })
        ));
        // seeking past the end is fine until the next read
        bs.seek_to(100);
        assert!(bs.read_u8().is_err());
    }
}
