//! NULL bitmaps for binary-protocol rows and statement parameters.

use serde::Serialize;

use super::reader::PacketCursor;
use crate::error::DecodeError;

/// Which of the two bitmap layouts is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BitmapLayout {
    /// COM_STMT_EXECUTE parameters: bit 0 of byte 0 is parameter 0.
    ExecuteParams,
    /// Binary result rows: the first two bits are reserved.
    ResultRow,
}

impl BitmapLayout {
    /// Reserved bits before index 0.
    pub const fn offset(self) -> usize {
        match self {
            BitmapLayout::ExecuteParams => 0,
            BitmapLayout::ResultRow => 2,
        }
    }

    /// Bytes on the wire for `count` entries.
    pub const fn byte_len(self, count: usize) -> usize {
        (count + self.offset()).div_ceil(8)
    }
}

/// Decoded NULL bitmap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NullBitmap {
    #[serde(serialize_with = "crate::mysql::structure::serialize_hex")]
    bytes: Vec<u8>,
    count: usize,
    layout: BitmapLayout,
}

impl NullBitmap {
    /// Read a bitmap covering `count` entries from the cursor.
    pub fn read(
        cursor: &mut PacketCursor<'_>,
        count: usize,
        layout: BitmapLayout,
    ) -> Result<Self, DecodeError> {
        let bytes = cursor.read_bytes("null_bitmap", layout.byte_len(count))?;
        Ok(Self {
            bytes: bytes.to_vec(),
            count,
            layout,
        })
    }

    /// Whether entry `index` is NULL.
    pub fn is_null(&self, index: usize) -> Result<bool, DecodeError> {
        if index >= self.count {
            return Err(DecodeError::BitmapOutOfRange {
                index,
                count: self.count,
            });
        }
        let bit = index + self.layout.offset();
        Ok(self.bytes[bit / 8] & (1 << (bit % 8)) != 0)
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn layout(&self) -> BitmapLayout {
        self.layout
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
