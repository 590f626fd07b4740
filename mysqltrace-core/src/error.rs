//! Error types for mysqltrace-core.
//!
//! This module provides structured error types for all mysqltrace-core operations:
//!
//! - [`enum@Error`] - Main error enum that wraps all error types
//! - [`PcapError`] - Errors from capture file reading
//! - [`FramingError`] - Errors from MySQL packet framing and the compression envelope
//! - [`DecodeError`] - Errors from decoding a single MySQL packet
//!
//! Framing and decode errors are recoverable at the packet level: the session
//! correlator turns them into `DecodeError` events and keeps replaying. Only
//! [`Error::Internal`] signals a broken invariant.

use thiserror::Error;

/// Main error type for mysqltrace-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Error reading or parsing a capture file
    #[error("PCAP error: {0}")]
    Pcap(#[from] PcapError),

    /// Error splitting bytes into MySQL packets
    #[error("Framing error: {0}")]
    Framing(#[from] FramingError),

    /// Error decoding a MySQL packet
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal invariant violated (a bug, not bad input)
    #[error("Internal error: {reason}")]
    Internal { reason: String },
}

/// Errors related to capture file reading.
#[derive(Error, Debug)]
pub enum PcapError {
    /// File not found
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// Invalid PCAP format
    #[error("Invalid PCAP format: {reason}")]
    InvalidFormat { reason: String },

    /// Unsupported link type
    #[error("Unsupported link type: {link_type}")]
    UnsupportedLinkType { link_type: u16 },
}

/// Errors raised while assembling MySQL packets from a byte stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    /// The zlib payload of a compressed packet could not be inflated
    #[error("compressed packet: {reason}")]
    Decompress { reason: String },

    /// Inflated payload length disagrees with the compressed header
    #[error("compressed packet: header declared {expected} bytes, inflated {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// Payload inflates past the length declared in the compressed header
    #[error("compressed packet: inflates past the declared {expected} bytes")]
    Oversized { expected: usize },
}

/// Errors raised while decoding the contents of one MySQL packet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Field needs more bytes than the packet has left
    #[error("{field}: buffer underrun (need {needed} bytes, have {have})")]
    Underrun {
        field: &'static str,
        needed: usize,
        have: usize,
    },

    /// Null bitmap lookup past the logical bit count
    #[error("null bitmap index {index} out of range (count {count})")]
    BitmapOutOfRange { index: usize, count: usize },

    /// Length-encoded integer with a lead byte that has no meaning
    #[error("invalid length-encoded integer lead byte {lead:#04x}")]
    InvalidLengthEncoding { lead: u8 },

    /// NULL marker where a value is required
    #[error("{field}: unexpected NULL")]
    UnexpectedNull { field: &'static str },

    /// NUL-terminated string with no terminator
    #[error("{field}: missing NUL terminator")]
    MissingTerminator { field: &'static str },

    /// Temporal value with a length byte outside the allowed set
    #[error("{field_type}: invalid temporal length {length}")]
    InvalidTemporalLength {
        field_type: &'static str,
        length: u8,
    },

    /// Packet with no payload where a command or response byte is required
    #[error("empty packet")]
    EmptyPacket,

    /// Server packet after a login that is none of OK, error, auth switch or auth-more-data
    #[error("unexpected authentication packet lead byte {lead:#04x}")]
    UnexpectedAuthPacket { lead: u8 },
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
