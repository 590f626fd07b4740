//! MySQL wire protocol.
//!
//! Reassembled TCP bytes enter through [`session::SessionRegistry`], are
//! framed by [`packet::Splitter`], decoded by the request and response
//! decoders in [`decoding`], and come out as an ordered
//! [`session::Connection`] of typed [`structure::Event`]s.
//!
//! ## Components
//!
//! - [`packet`] - Buffers, framing and the compressed envelope
//! - [`decoding`] - Cursor, bitmap, value reader and the two decoders
//! - [`structure`] - Command codes, flags, field types, values and events
//! - [`session`] - Cross-stream replay and the connection registry
//! - [`summary`] - Request/response pairing for compact output

pub mod decoding;
pub mod packet;
pub mod session;
pub mod structure;
pub mod summary;

pub use session::{Connection, ConnectionBuilder, SessionConfig, SessionRegistry, Transmission};
pub use structure::Event;
pub use summary::{summarize, CommandSummary, ResponseStatus};
