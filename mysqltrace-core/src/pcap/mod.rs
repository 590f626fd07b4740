//! Capture file reading.
//!
//! - [`PcapReader`] - Opens a file, undoes gzip and detects PCAP vs PCAPNG
//! - [`crate::io::RawPacket`] - The frames it yields (re-exported from `io`)

mod reader;

pub use reader::PcapReader;
