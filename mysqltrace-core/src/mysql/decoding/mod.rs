//! MySQL packet decoders.
//!
//! The request and response decoders turn one complete packet (header
//! included) into an [`Event`](crate::mysql::structure::Event). They never
//! mutate shared state; whatever they need to know about the other side of
//! the conversation is read through [`CorrelatorView`].
//!
//! ## Components
//!
//! - [`PacketCursor`] - Bounds-checked little-endian reader
//! - [`NullBitmap`] - NULL bitmaps for execute parameters and binary rows
//! - [`read_value`] - Binary-protocol value reader shared by both sides
//! - [`RequestDecoder`] - Client to server packets
//! - [`ResponseDecoder`] - Server to client packets, including multi-packet result sets

pub mod bitmap;
pub mod reader;
mod request;
mod response;
mod value;

use std::collections::HashMap;

pub use bitmap::{BitmapLayout, NullBitmap};
pub use reader::PacketCursor;
pub use request::RequestDecoder;
pub use response::{ResponseDecoder, ResponseState};
pub use value::read_value;

use crate::mysql::structure::{ParamType, RequestKind};

/// Read-only view of the connection state the decoders depend on.
pub trait CorrelatorView {
    /// Kind of the most recent client request.
    fn previous_request(&self) -> Option<RequestKind>;

    /// Whether the last server packet was the handshake greeting.
    fn just_saw_greeting(&self) -> bool;

    /// Whether the compressed protocol has been negotiated.
    fn compressed(&self) -> bool;

    /// Whether the server's last packet continued authentication
    /// (auth switch or auth-more-data), so the client answers with plugin data.
    fn auth_in_progress(&self) -> bool;

    /// Parameter count of a prepared statement, 0 when unknown.
    fn params_for(&self, statement_id: u32) -> u16;

    /// Parameter types last bound to a prepared statement.
    fn param_types_for(&self, statement_id: u32) -> Option<&[ParamType]>;
}

/// Fixed [`CorrelatorView`] for decoding packets outside a live session.
#[derive(Debug, Clone, Default)]
pub struct StaticView {
    pub previous_request: Option<RequestKind>,
    pub just_saw_greeting: bool,
    pub compressed: bool,
    pub auth_in_progress: bool,
    pub statements: HashMap<u32, (u16, Vec<ParamType>)>,
}

impl StaticView {
    pub fn after(previous_request: RequestKind) -> Self {
        Self {
            previous_request: Some(previous_request),
            ..Self::default()
        }
    }

    /// Register a prepared statement with `param_count` parameters.
    pub fn with_statement(mut self, statement_id: u32, param_count: u16) -> Self {
        self.statements
            .entry(statement_id)
            .or_insert((0, Vec::new()))
            .0 = param_count;
        self
    }

    pub fn with_param_types(mut self, statement_id: u32, types: Vec<ParamType>) -> Self {
        self.statements
            .entry(statement_id)
            .or_insert((0, Vec::new()))
            .1 = types;
        self
    }
}

impl CorrelatorView for StaticView {
    fn previous_request(&self) -> Option<RequestKind> {
        self.previous_request
    }

    fn just_saw_greeting(&self) -> bool {
        self.just_saw_greeting
    }

    fn compressed(&self) -> bool {
        self.compressed
    }

    fn auth_in_progress(&self) -> bool {
        self.auth_in_progress
    }

    fn params_for(&self, statement_id: u32) -> u16 {
        self.statements
            .get(&statement_id)
            .map(|(count, _)| *count)
            .unwrap_or(0)
    }

    fn param_types_for(&self, statement_id: u32) -> Option<&[ParamType]> {
        self.statements
            .get(&statement_id)
            .map(|(_, types)| types.as_slice())
            .filter(|types| !types.is_empty())
    }
}
