//! Convenient re-exports for common usage.
//!
//! # Example
//!
//! ```rust,no_run
//! use mysqltrace_core::prelude::*;
//!
//! let manager = StreamManager::with_defaults();
//! assert!(manager.registry().is_empty());
//! ```

// Capture input
pub use crate::io::RawPacket;
pub use crate::pcap::PcapReader;

// Stream handling
pub use crate::stream::{ConnectionAddress, Direction, StreamConfig, StreamManager};

// Session output
pub use crate::mysql::{
    summarize, CommandSummary, Connection, ConnectionBuilder, Event, SessionConfig,
    SessionRegistry, Transmission,
};

// Error types
pub use crate::error::{Error, Result};
