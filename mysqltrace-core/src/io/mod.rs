//! Capture file input.
//!
//! ## Components
//!
//! - [`GenericPcapReader`] - PCAP/PCAPNG records from any `Read` source
//! - [`DecompressReader`] - Transparent gzip decoding of capture files
//! - [`RawPacket`] - One captured frame with its timestamp and link type

mod decompress;
mod pcap_stream;

use bytes::Bytes;

pub use decompress::{Compression, DecompressReader, FileDecoder};
pub use pcap_stream::{GenericPcapReader, PcapFormat};

/// A captured frame as stored in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    /// 1-based position in the capture.
    pub frame_number: u64,
    /// Capture time in microseconds since the Unix epoch.
    pub timestamp_us: i64,
    pub captured_length: u32,
    pub original_length: u32,
    /// Link-layer header type of the interface the frame came from.
    pub link_type: u16,
    pub data: Bytes,
}

impl RawPacket {
    /// Whether the snap length cut the frame short.
    pub fn is_truncated(&self) -> bool {
        self.captured_length < self.original_length
    }
}
