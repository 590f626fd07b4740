//! Compressed protocol envelope.
//!
//! Once `CLIENT_COMPRESS` is negotiated every unit on the wire is
//! `[3-byte compressed length][sequence][3-byte uncompressed length][payload]`.
//! An uncompressed length of 0 means the payload was sent as-is; otherwise it
//! is a zlib (RFC 1950) stream.

use std::io::Read;

use flate2::read::ZlibDecoder;

use super::read_u24;
use crate::error::FramingError;

/// Size of the compressed envelope header.
pub const COMPRESSED_HEADER_LEN: usize = 7;

/// Parsed compressed envelope header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressedHeader {
    pub compressed_len: usize,
    pub sequence: u8,
    pub uncompressed_len: usize,
}

impl CompressedHeader {
    /// Parse a header from the front of `data`, if enough bytes are present.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < COMPRESSED_HEADER_LEN {
            return None;
        }
        Some(Self {
            compressed_len: read_u24(&data[0..3]),
            sequence: data[3],
            uncompressed_len: read_u24(&data[4..7]),
        })
    }

    /// Header plus payload.
    pub fn unit_len(&self) -> usize {
        COMPRESSED_HEADER_LEN + self.compressed_len
    }
}

/// Recover the plain bytes carried by one compressed unit.
pub fn decompress_packet(header: &CompressedHeader, payload: &[u8]) -> Result<Vec<u8>, FramingError> {
    if header.uncompressed_len == 0 {
        return Ok(payload.to_vec());
    }

    // One byte past the declared size is enough to know it lied
    let limit = header.uncompressed_len as u64 + 1;
    let mut inflated = Vec::with_capacity(header.uncompressed_len);
    ZlibDecoder::new(payload)
        .take(limit)
        .read_to_end(&mut inflated)
        .map_err(|e| FramingError::Decompress {
            reason: e.to_string(),
        })?;

    if inflated.len() > header.uncompressed_len {
        return Err(FramingError::Oversized {
            expected: header.uncompressed_len,
        });
    }
    if inflated.len() != header.uncompressed_len {
        return Err(FramingError::SizeMismatch {
            expected: header.uncompressed_len,
            actual: inflated.len(),
        });
    }

    Ok(inflated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn unit(data: &[u8]) -> (CompressedHeader, &[u8]) {
        let header = CompressedHeader::parse(data).unwrap();
        (header, &data[COMPRESSED_HEADER_LEN..header.unit_len()])
    }

    // Test 1: Uncompressed payload passes through
    #[test]
    fn test_no_compression() {
        let input = [
            0x0d, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x09, 0x00, 0x00, 0x00, 0x03, b'S', b'E',
            b'L', b'E', b'C', b'T', b' ', b'1',
        ];
        let (header, payload) = unit(&input);
        assert_eq!(header.compressed_len, 13);
        assert_eq!(header.uncompressed_len, 0);

        let plain = decompress_packet(&header, payload).unwrap();
        assert_eq!(plain, &input[7..]);
    }

    // Test 2: Captured zlib unit with one inner packet
    #[test]
    fn test_one_packet_example() {
        let input = [
            0x22, 0x00, 0x00, 0x00, 0x32, 0x00, 0x00, 0x78, 0x9c, 0xd3, 0x63, 0x60, 0x60, 0x60,
            0x2e, 0x4e, 0xcd, 0x49, 0x4d, 0x2e, 0x51, 0x50, 0x32, 0x30, 0x34, 0x32, 0x36, 0x31,
            0x35, 0x33, 0xb7, 0xb0, 0xc4, 0xcd, 0x52, 0x02, 0x00, 0x0c, 0xd1, 0x0a, 0x6c,
        ];
        let (header, payload) = unit(&input);
        let plain = decompress_packet(&header, payload).unwrap();

        let mut expected = vec![0x2e, 0x00, 0x00, 0x00, 0x03];
        expected.extend_from_slice(b"select \"012345678901234567890123456789012345\"");
        assert_eq!(plain, expected);
    }

    // Test 3: Round trip through flate2
    #[test]
    fn test_zlib_round_trip() {
        let inner = [0x05, 0x00, 0x00, 0x00, 0x03, b'P', b'I', b'N', b'G'];
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&inner).unwrap();
        let compressed = encoder.finish().unwrap();

        let header = CompressedHeader {
            compressed_len: compressed.len(),
            sequence: 0,
            uncompressed_len: inner.len(),
        };
        assert_eq!(decompress_packet(&header, &compressed).unwrap(), inner);
    }

    // Test 4: Wrong declared size
    #[test]
    fn test_size_mismatch() {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"abc").unwrap();
        let compressed = encoder.finish().unwrap();

        let header = CompressedHeader {
            compressed_len: compressed.len(),
            sequence: 0,
            uncompressed_len: 10,
        };
        assert_eq!(
            decompress_packet(&header, &compressed),
            Err(FramingError::SizeMismatch {
                expected: 10,
                actual: 3
            })
        );
    }

    // Test 5: Garbage payload
    #[test]
    fn test_corrupt_stream() {
        let header = CompressedHeader {
            compressed_len: 4,
            sequence: 0,
            uncompressed_len: 10,
        };
        assert!(matches!(
            decompress_packet(&header, &[0x01, 0x02, 0x03, 0x04]),
            Err(FramingError::Decompress { .. })
        ));
    }

    // Test 6: Short header
    #[test]
    fn test_short_header() {
        assert!(CompressedHeader::parse(&[0x01, 0x00, 0x00, 0x00]).is_none());
    }

    // Test 5: Inflation stops one byte past the declared size
    #[test]
    fn test_inflation_is_bounded() {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(&vec![0u8; 4 * 1024 * 1024]).unwrap();
        let compressed = encoder.finish().unwrap();
        assert!(compressed.len() < 16 * 1024);

        let header = CompressedHeader {
            compressed_len: compressed.len(),
            sequence: 0,
            uncompressed_len: 16,
        };
        assert_eq!(
            decompress_packet(&header, &compressed),
            Err(FramingError::Oversized { expected: 16 })
        );
    }
}
