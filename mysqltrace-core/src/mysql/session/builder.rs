//! Cross-stream replay of one connection.
//!
//! Both directions are buffered independently while the capture is read.
//! [`ConnectionBuilder::drain`] then walks the two buffers in timestamp
//! order, frames and decodes each side, and threads the state one side needs
//! from the other (last request, greeting seen, compression, prepared
//! statements) through a [`CorrelatorView`].

use std::collections::HashMap;

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace};

use super::{Connection, Transmission};
use crate::error::{Error, Result};
use crate::mysql::decoding::{CorrelatorView, RequestDecoder, ResponseDecoder};
use crate::mysql::packet::{
    CompressionStart, Packet, PacketBuffer, PacketReplay, Seen, Splitter, Timestamp,
};
use crate::mysql::structure::{DecodeErrorEvent, Event, ParamType, RequestKind};
use crate::stream::{ConnectionAddress, Direction};

/// Replay options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Order the transcript by first timestamp.
    pub sort_items: bool,
    /// Attach the raw MySQL packets to each transmission.
    pub keep_raw: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sort_items: true,
            keep_raw: false,
        }
    }
}

/// What the session knows about one prepared statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementInfo {
    pub param_count: u16,
    /// Types from the most recent execute that bound them.
    pub param_types: Vec<ParamType>,
}

/// Accumulates both directions of one connection until it can be replayed.
#[derive(Debug, Clone)]
pub struct ConnectionBuilder {
    address: ConnectionAddress,
    config: SessionConfig,
    requests: PacketBuffer,
    responses: PacketBuffer,
    request_closed: bool,
    response_closed: bool,
}

impl ConnectionBuilder {
    pub fn new(address: ConnectionAddress, config: SessionConfig) -> Self {
        Self {
            address,
            config,
            requests: PacketBuffer::new(),
            responses: PacketBuffer::new(),
            request_closed: false,
            response_closed: false,
        }
    }

    pub fn address(&self) -> &ConnectionAddress {
        &self.address
    }

    pub fn add_packet(&mut self, direction: Direction, packet: Packet) {
        match direction {
            Direction::ToServer => self.requests.write(packet),
            Direction::ToClient => self.responses.write(packet),
        }
    }

    /// Buffer reassembled bytes seen at `seen`.
    pub fn deliver(&mut self, direction: Direction, seen: Timestamp, data: impl Into<Bytes>) {
        self.add_packet(direction, Packet::new([seen], data));
    }

    /// Record that no more bytes will arrive in `direction`.
    pub fn mark_complete(&mut self, direction: Direction) {
        match direction {
            Direction::ToServer => self.request_closed = true,
            Direction::ToClient => self.response_closed = true,
        }
    }

    /// Both directions have been closed.
    pub fn is_complete(&self) -> bool {
        self.request_closed && self.response_closed
    }

    /// Bytes buffered across both directions.
    pub fn buffered_bytes(&self) -> usize {
        self.requests.byte_len() + self.responses.byte_len()
    }

    /// Replay everything buffered so far into a transcript.
    ///
    /// The buffers are not consumed, so draining twice gives the same result.
    pub fn drain(&self) -> Result<Connection> {
        let mut replay = Replay::new(self.address.clone(), self.config);
        let mut requests = self.requests.replay();
        let mut responses = self.responses.replay();

        while let Some(direction) = next_direction(&requests, &responses) {
            let cursor = match direction {
                Direction::ToServer => &mut requests,
                Direction::ToClient => &mut responses,
            };
            let packet = cursor.peek().ok_or_else(|| Error::Internal {
                reason: format!("{direction} buffer exhausted during replay"),
            })?;
            cursor.advance();
            replay.feed(direction, packet);
        }

        Ok(replay.finish())
    }
}

/// Pick the side whose next packet was seen first. Responses win only when
/// strictly earlier, and packets with no timestamp sort before everything.
fn next_direction(requests: &PacketReplay<'_>, responses: &PacketReplay<'_>) -> Option<Direction> {
    let key = |p: &Packet| p.first_seen().unwrap_or(Timestamp::MIN);
    match (requests.peek(), responses.peek()) {
        (None, None) => None,
        (Some(_), None) => Some(Direction::ToServer),
        (None, Some(_)) => Some(Direction::ToClient),
        (Some(request), Some(response)) if key(response) < key(request) => {
            Some(Direction::ToClient)
        }
        (Some(_), Some(_)) => Some(Direction::ToServer),
    }
}

/// State shared between the two decoders during a replay.
#[derive(Debug, Default)]
struct SessionState {
    previous_request: Option<RequestKind>,
    just_saw_greeting: bool,
    compressed: bool,
    auth_in_progress: bool,
    statements: HashMap<u32, StatementInfo>,
}

impl CorrelatorView for SessionState {
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
            .map(|s| s.param_count)
            .unwrap_or(0)
    }

    fn param_types_for(&self, statement_id: u32) -> Option<&[ParamType]> {
        self.statements
            .get(&statement_id)
            .map(|s| s.param_types.as_slice())
            .filter(|types| !types.is_empty())
    }
}

/// Framing and timestamp bookkeeping for one direction.
#[derive(Debug, Default)]
struct Side {
    splitter: Splitter,
    pending_seen: Seen,
    last_seen: Seen,
    raw: BytesMut,
}

impl Side {
    /// Timestamps for the next event: those of the packets fed since the
    /// last event, or the last event's when it came from the same packet.
    fn take_seen(&mut self) -> Seen {
        if !self.pending_seen.is_empty() {
            self.last_seen = std::mem::take(&mut self.pending_seen);
        }
        self.last_seen.clone()
    }
}

struct Replay {
    address: ConnectionAddress,
    config: SessionConfig,
    state: SessionState,
    requests: Side,
    responses: Side,
    request_decoder: RequestDecoder,
    response_decoder: ResponseDecoder,
    items: Vec<Transmission>,
}

impl Replay {
    fn new(address: ConnectionAddress, config: SessionConfig) -> Self {
        Self {
            address,
            config,
            state: SessionState::default(),
            requests: Side::default(),
            responses: Side::default(),
            request_decoder: RequestDecoder::new(),
            response_decoder: ResponseDecoder::new(),
            items: Vec::new(),
        }
    }

    fn side_mut(&mut self, direction: Direction) -> &mut Side {
        match direction {
            Direction::ToServer => &mut self.requests,
            Direction::ToClient => &mut self.responses,
        }
    }

    fn feed(&mut self, direction: Direction, packet: &Packet) {
        let side = self.side_mut(direction);
        side.pending_seen.extend(packet.seen().iter().copied());
        side.splitter.push(packet.data());

        loop {
            match self.side_mut(direction).splitter.next_packet() {
                Ok(Some(mysql_packet)) => self.decode(direction, mysql_packet),
                Ok(None) => break,
                Err(e) => self.emit_error(direction, e.to_string(), packet.data().clone()),
            }
        }
    }

    fn decode(&mut self, direction: Direction, mysql_packet: Bytes) {
        if self.config.keep_raw {
            self.side_mut(direction).raw.extend_from_slice(&mysql_packet);
        }

        match direction {
            Direction::ToServer => {
                match self.request_decoder.decode(&mysql_packet, &self.state) {
                    Ok(event) => {
                        // A new command ends whatever response was still open
                        if let Some(partial) = self.response_decoder.interrupt() {
                            self.after_response(&partial);
                            self.emit(Direction::ToClient, partial);
                        }
                        self.after_request(&event);
                        self.emit(direction, event);
                    }
                    Err(e) => self.emit_error(direction, e.to_string(), mysql_packet),
                }
            }
            Direction::ToClient => {
                match self.response_decoder.decode(&mysql_packet, &self.state) {
                    Ok(Some(event)) => {
                        self.after_response(&event);
                        self.emit(direction, event);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        self.state.just_saw_greeting = false;
                        self.state.auth_in_progress = false;
                        self.emit_error(direction, e.to_string(), mysql_packet);
                    }
                }
            }
        }
    }

    fn after_request(&mut self, event: &Event) {
        if let Some(kind) = event.request_kind() {
            self.state.previous_request = Some(kind);
        }

        match event {
            Event::Login(login) if login.compression() => {
                debug!(address = %self.address, "compressed protocol negotiated");
                self.state.compressed = true;
                self.requests
                    .splitter
                    .enable_compression(CompressionStart::Immediate);
                self.responses
                    .splitter
                    .enable_compression(CompressionStart::AfterNextPacket);
            }
            Event::Execute(execute) if execute.new_params_bound => {
                let info = self.state.statements.entry(execute.statement_id).or_default();
                info.param_types = execute.param_types.clone();
            }
            _ => {}
        }
    }

    fn after_response(&mut self, event: &Event) {
        self.state.just_saw_greeting = matches!(event, Event::Greeting(_));
        self.state.auth_in_progress =
            matches!(event, Event::AuthSwitch(_) | Event::AuthMoreData(_));

        if let Event::PrepareOk(prepare) = event {
            trace!(
                statement_id = prepare.statement_id,
                params = prepare.num_params,
                "statement registered"
            );
            self.state.statements.insert(
                prepare.statement_id,
                StatementInfo {
                    param_count: prepare.num_params,
                    param_types: prepare.params.iter().map(ParamType::from).collect(),
                },
            );
        }
    }

    fn emit_error(&mut self, direction: Direction, message: String, packet: Bytes) {
        debug!(address = %self.address, %direction, %message, "undecodable packet");
        let event = Event::DecodeError(DecodeErrorEvent {
            direction,
            message,
            previous_request: self.state.previous_request,
            just_saw_greeting: self.state.just_saw_greeting,
            compressed: self.state.compressed,
            packet,
        });
        self.emit(direction, event);
    }

    fn emit(&mut self, direction: Direction, event: Event) {
        let keep_raw = self.config.keep_raw;
        let side = self.side_mut(direction);
        let seen = side.take_seen();
        let raw = keep_raw.then(|| side.raw.split().freeze());

        self.items.push(Transmission {
            direction,
            kind: event.kind(),
            seen,
            event,
            raw,
        });
    }

    fn finish(mut self) -> Connection {
        if let Some(event) = self.response_decoder.flush() {
            trace!(address = %self.address, "flushing partial response");
            self.after_response(&event);
            self.emit(Direction::ToClient, event);
        }

        for direction in [Direction::ToServer, Direction::ToClient] {
            let leftover = self.side_mut(direction).splitter.buffered();
            if leftover > 0 {
                debug!(address = %self.address, %direction, leftover, "trailing partial packet");
            }
        }

        if self.config.sort_items {
            // Stable, so same-timestamp items keep replay order
            self.items
                .sort_by_key(|t| (t.seen.is_empty(), t.first_seen()));
        }

        Connection {
            address: self.address,
            items: self.items,
        }
    }
}
