//! MySQL packet framing.
//!
//! ## Components
//!
//! - [`PacketBuffer`] - Per-direction queue of captured chunks with their timestamps
//! - [`Splitter`] - Incremental framer that yields complete MySQL packets
//! - [`compress`] - The 7-byte compressed envelope (zlib via `flate2`)
//!
//! A plain packet is `[3-byte LE payload length][sequence][payload]`. All
//! packets handed to the decoders include the 4-byte header.

mod buffer;
pub mod compress;
mod splitter;

pub use buffer::{Packet, PacketBuffer, PacketReplay, Seen};
pub use compress::{decompress_packet, CompressedHeader, COMPRESSED_HEADER_LEN};
pub use splitter::{split_packets, CompressionStart, Splitter};

/// Capture time in microseconds since the Unix epoch.
pub type Timestamp = i64;

/// Size of the plain packet header.
pub const HEADER_LEN: usize = 4;

/// Read a 3-byte little-endian length.
#[inline]
pub fn read_u24(bytes: &[u8]) -> usize {
    bytes[0] as usize | (bytes[1] as usize) << 8 | (bytes[2] as usize) << 16
}

/// Declared payload length of a framed packet, if the header is complete.
#[inline]
pub fn payload_len(packet: &[u8]) -> Option<usize> {
    (packet.len() >= HEADER_LEN).then(|| read_u24(packet))
}

/// Sequence number of a framed packet.
#[inline]
pub fn sequence(packet: &[u8]) -> Option<u8> {
    packet.get(3).copied()
}

/// Payload of a framed packet (everything after the header).
#[inline]
pub fn payload(packet: &[u8]) -> &[u8] {
    packet.get(HEADER_LEN..).unwrap_or(&[])
}
