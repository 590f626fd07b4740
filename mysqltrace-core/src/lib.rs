//! # mysqltrace-core
//!
//! Passive MySQL wire-protocol decoding for packet captures.
//!
//! This crate turns a PCAP/PCAPNG capture into per-connection transcripts of
//! typed MySQL events. Requests and responses are reassembled independently
//! and merged back into one conversation by timestamp, so the decoder always
//! knows which request a response answers.
//!
//! ## Features
//!
//! - **Capture Reading**: PCAP and PCAPNG, either endianness, micro or
//!   nanosecond timestamps, optionally gzip-compressed
//! - **TCP Reassembly**: Per-direction sequence tracking with out-of-order
//!   buffering and retransmission handling
//! - **Session Correlation**: Login, compression negotiation and prepared
//!   statement metadata carried across the two streams
//! - **Protocol Decoding**: Greeting, login, text and binary protocol
//!   commands, result sets, OK/ERR/EOF and progress reports
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mysqltrace_core::prelude::*;
//!
//! let mut reader = PcapReader::open("capture.pcap")?;
//! let mut manager = StreamManager::with_defaults();
//! while let Some(packet) = reader.next_packet()? {
//!     manager.process_packet(&packet);
//! }
//!
//! for builder in manager.finish() {
//!     let connection = builder.drain()?;
//!     println!("{}: {} events", connection.address, connection.items.len());
//! }
//! # Ok::<(), mysqltrace_core::Error>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                        mysqltrace-core                              |
//! +---------------------------------------------------------------------+
//! |  io/         - RawPacket, PCAP/PCAPNG record reading, gzip          |
//! |  pcap/       - File-backed PcapReader                               |
//! |  stream/     - Frame decode, connection roles, TCP reassembly       |
//! |  mysql/      - Framing, decoders, session correlation, summaries    |
//! |  error/      - Error types                                          |
//! +---------------------------------------------------------------------+
//! ```

pub mod error;
pub mod io;
pub mod mysql;
pub mod pcap;
pub mod prelude;
pub mod stream;

// Re-export commonly used types at crate root for convenience
pub use error::{DecodeError, Error, FramingError, PcapError, Result};
pub use io::{Compression, PcapFormat, RawPacket};
pub use mysql::{
    summarize, CommandSummary, Connection, ConnectionBuilder, Event, ResponseStatus,
    SessionConfig, SessionRegistry, Transmission,
};
pub use pcap::PcapReader;
pub use stream::{
    classify_direction, decode_frame, ConnectionAddress, Direction, Endpoint, StreamConfig,
    StreamManager, StreamStats, TcpSegment,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
