//! Bounds-checked cursor over a MySQL packet.
//!
//! Every fixed layout in the protocol is read field by field through
//! [`PacketCursor`]; each read checks the remaining length first and fails
//! with [`DecodeError::Underrun`] instead of panicking on truncated input.

use bytes::Buf;

use crate::error::DecodeError;

/// Lead byte marking a NULL length-encoded value.
pub const LENENC_NULL: u8 = 0xfb;
/// Lead byte for a 2-byte length-encoded integer.
pub const LENENC_U16: u8 = 0xfc;
/// Lead byte for a 3-byte length-encoded integer.
pub const LENENC_U24: u8 = 0xfd;
/// Lead byte for an 8-byte length-encoded integer.
pub const LENENC_U64: u8 = 0xfe;

/// Little-endian reader over a borrowed packet slice.
#[derive(Debug, Clone)]
pub struct PacketCursor<'a> {
    buf: &'a [u8],
    start_len: usize,
}

impl<'a> PacketCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            start_len: buf.len(),
        }
    }

    /// Bytes left to read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    /// Bytes consumed since the cursor was created.
    #[inline]
    pub fn position(&self) -> usize {
        self.start_len - self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Look at the next byte without consuming it.
    pub fn peek_u8(&self) -> Option<u8> {
        self.buf.first().copied()
    }

    #[inline]
    fn need(&self, field: &'static str, needed: usize) -> Result<(), DecodeError> {
        if self.buf.len() < needed {
            Err(DecodeError::Underrun {
                field,
                needed,
                have: self.buf.len(),
            })
        } else {
            Ok(())
        }
    }

    pub fn read_u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        self.need(field, 1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_u16(&mut self, field: &'static str) -> Result<u16, DecodeError> {
        self.need(field, 2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn read_u24(&mut self, field: &'static str) -> Result<u32, DecodeError> {
        self.need(field, 3)?;
        Ok(self.buf.get_uint_le(3) as u32)
    }

    pub fn read_u32(&mut self, field: &'static str) -> Result<u32, DecodeError> {
        self.need(field, 4)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn read_u64(&mut self, field: &'static str) -> Result<u64, DecodeError> {
        self.need(field, 8)?;
        Ok(self.buf.get_u64_le())
    }

    pub fn read_f32(&mut self, field: &'static str) -> Result<f32, DecodeError> {
        self.need(field, 4)?;
        Ok(self.buf.get_f32_le())
    }

    pub fn read_f64(&mut self, field: &'static str) -> Result<f64, DecodeError> {
        self.need(field, 8)?;
        Ok(self.buf.get_f64_le())
    }

    /// Borrow the next `len` bytes.
    pub fn read_bytes(&mut self, field: &'static str, len: usize) -> Result<&'a [u8], DecodeError> {
        self.need(field, len)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    pub fn skip(&mut self, field: &'static str, len: usize) -> Result<(), DecodeError> {
        self.read_bytes(field, len).map(|_| ())
    }

    /// Everything that is left, leaving the cursor empty.
    pub fn rest(&mut self) -> &'a [u8] {
        std::mem::take(&mut self.buf)
    }

    /// NUL-terminated string; the terminator is consumed but not returned.
    pub fn read_nul_string(&mut self, field: &'static str) -> Result<String, DecodeError> {
        let end = self
            .buf
            .iter()
            .position(|&b| b == 0)
            .ok_or(DecodeError::MissingTerminator { field })?;
        let s = String::from_utf8_lossy(&self.buf[..end]).into_owned();
        self.buf = &self.buf[end + 1..];
        Ok(s)
    }

    /// Length-encoded integer where NULL is allowed.
    pub fn read_lenenc_int_nullable(
        &mut self,
        field: &'static str,
    ) -> Result<Option<u64>, DecodeError> {
        let lead = self.read_u8(field)?;
        match lead {
            0..=0xfa => Ok(Some(lead as u64)),
            LENENC_NULL => Ok(None),
            LENENC_U16 => Ok(Some(self.read_u16(field)? as u64)),
            LENENC_U24 => Ok(Some(self.read_u24(field)? as u64)),
            LENENC_U64 => self.read_u64(field).map(Some),
            _ => Err(DecodeError::InvalidLengthEncoding { lead }),
        }
    }

    /// Length-encoded integer where NULL is a protocol error.
    pub fn read_lenenc_int(&mut self, field: &'static str) -> Result<u64, DecodeError> {
        self.read_lenenc_int_nullable(field)?
            .ok_or(DecodeError::UnexpectedNull { field })
    }

    /// Length-encoded byte string, `None` for the NULL marker.
    pub fn read_lenenc_bytes_nullable(
        &mut self,
        field: &'static str,
    ) -> Result<Option<&'a [u8]>, DecodeError> {
        match self.read_lenenc_int_nullable(field)? {
            Some(len) => {
                let len = usize::try_from(len).map_err(|_| DecodeError::Underrun {
                    field,
                    needed: usize::MAX,
                    have: self.buf.len(),
                })?;
                self.read_bytes(field, len).map(Some)
            }
            None => Ok(None),
        }
    }

    pub fn read_lenenc_bytes(&mut self, field: &'static str) -> Result<&'a [u8], DecodeError> {
        self.read_lenenc_bytes_nullable(field)?
            .ok_or(DecodeError::UnexpectedNull { field })
    }

    /// Length-encoded string decoded as (lossy) UTF-8.
    pub fn read_lenenc_string(&mut self, field: &'static str) -> Result<String, DecodeError> {
        self.read_lenenc_bytes(field)
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }
}
