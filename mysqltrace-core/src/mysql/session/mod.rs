//! Per-connection session correlation.
//!
//! ## Components
//!
//! - [`ConnectionBuilder`] - Buffers both directions of one connection and replays them
//! - [`SessionRegistry`] - Thread-safe map of in-flight builders keyed by address
//! - [`Connection`] / [`Transmission`] - The ordered transcript produced by a replay

mod builder;
mod registry;

pub use builder::{ConnectionBuilder, SessionConfig, StatementInfo};
pub use registry::SessionRegistry;

use bytes::Bytes;
use serde::Serialize;

use crate::mysql::packet::Seen;
use crate::mysql::structure::Event;
use crate::stream::{ConnectionAddress, Direction};

/// One decoded event with where and when it was seen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transmission {
    pub direction: Direction,
    pub kind: &'static str,
    pub seen: Seen,
    pub event: Event,
    /// MySQL packets that produced the event, when raw capture is enabled.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "crate::mysql::structure::serialize_opt_hex"
    )]
    pub raw: Option<Bytes>,
}

impl Transmission {
    pub fn first_seen(&self) -> Option<i64> {
        self.seen.first().copied()
    }

    pub fn is_request(&self) -> bool {
        self.direction == Direction::ToServer
    }
}

/// Ordered transcript of one MySQL connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Connection {
    pub address: ConnectionAddress,
    pub items: Vec<Transmission>,
}

impl Connection {
    /// Number of events that failed to decode.
    pub fn decode_errors(&self) -> usize {
        self.items.iter().filter(|t| t.event.is_decode_error()).count()
    }
}
