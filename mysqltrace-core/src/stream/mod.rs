//! TCP stream handling.
//!
//! Turns captured frames into ordered, timestamped byte chunks per
//! connection direction and hands them to the session registry.
//!
//! ## Components
//!
//! - [`frame`] - Link/IP/TCP header extraction
//! - [`ConnectionTracker`] - Decides which endpoint is the MySQL client
//! - [`StreamBuffer`] - Per-direction sequence-number reassembly
//! - [`StreamManager`] - Drives the above for every captured packet

mod connection;
pub mod frame;
mod manager;
mod reassembly;

use std::fmt;

use serde::Serialize;

pub use connection::{
    classify_direction, ConnectionAddress, ConnectionKey, ConnectionTracker, Endpoint,
};
pub use frame::{decode_frame, TcpSegment};
pub use manager::{StreamConfig, StreamManager, StreamStats};
pub use reassembly::{Chunk, StreamBuffer};

/// Direction of data flow in a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Client to server: requests.
    ToServer,
    /// Server to client: responses.
    ToClient,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::ToServer => "to_server",
            Direction::ToClient => "to_client",
        }
    }

    pub fn reverse(self) -> Self {
        match self {
            Direction::ToServer => Direction::ToClient,
            Direction::ToClient => Direction::ToServer,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// TCP flags that matter for connection tracking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TcpFlags {
    pub syn: bool,
    pub ack: bool,
    pub fin: bool,
    pub rst: bool,
}

impl TcpFlags {
    /// First packet of the handshake, sent by the client.
    pub fn is_syn_only(&self) -> bool {
        self.syn && !self.ack
    }

    /// The sender will send no more data.
    pub fn closes(&self) -> bool {
        self.fin || self.rst
    }
}
