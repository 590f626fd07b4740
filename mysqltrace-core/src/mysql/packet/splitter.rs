//! Incremental packet framer.
//!
//! Bytes arrive in whatever chunks TCP reassembly produced. The [`Splitter`]
//! buffers them and hands out complete packets one at a time, so that the
//! caller can react to a packet (for example a login asking for compression)
//! before the following bytes are framed.

use bytes::{Buf, Bytes, BytesMut};
use tracing::trace;

use super::compress::{decompress_packet, CompressedHeader};
use super::{read_u24, HEADER_LEN};
use crate::error::FramingError;

/// When compression takes effect after it is negotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionStart {
    /// The very next bytes are compressed (client side).
    Immediate,
    /// One more plain packet follows first (the server's reply to the login).
    AfterNextPacket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Plain,
    PlainThenCompressed,
    Compressed,
}

/// Stateful framer for one direction of a connection.
#[derive(Debug)]
pub struct Splitter {
    mode: Mode,
    /// Bytes as received: plain packets, or compressed units.
    raw: BytesMut,
    /// Inflated bytes waiting to be framed as plain packets.
    inflated: BytesMut,
}

impl Splitter {
    pub fn new() -> Self {
        Self {
            mode: Mode::Plain,
            raw: BytesMut::new(),
            inflated: BytesMut::new(),
        }
    }

    /// Switch to the compressed envelope.
    pub fn enable_compression(&mut self, start: CompressionStart) {
        self.mode = match start {
            CompressionStart::Immediate => Mode::Compressed,
            CompressionStart::AfterNextPacket => Mode::PlainThenCompressed,
        };
    }

    /// Whether incoming bytes are currently read as compressed units.
    pub fn is_compressed(&self) -> bool {
        self.mode == Mode::Compressed
    }

    /// Bytes held back waiting for the rest of a packet.
    pub fn buffered(&self) -> usize {
        self.raw.len() + self.inflated.len()
    }

    /// True when a partial packet is pending.
    pub fn is_incomplete(&self) -> bool {
        self.buffered() > 0
    }

    /// Add captured bytes without framing them yet.
    pub fn push(&mut self, chunk: &[u8]) {
        self.raw.extend_from_slice(chunk);
    }

    /// Take the next complete packet, header included.
    ///
    /// `Ok(None)` means more input is needed. On error the offending
    /// compressed unit has been dropped and framing can continue.
    pub fn next_packet(&mut self) -> Result<Option<Bytes>, FramingError> {
        loop {
            match self.mode {
                Mode::Plain => return Ok(take_packet(&mut self.raw)),
                Mode::PlainThenCompressed => {
                    let packet = take_packet(&mut self.raw);
                    if packet.is_some() {
                        trace!("first packet after compression negotiated, switching");
                        self.mode = Mode::Compressed;
                    }
                    return Ok(packet);
                }
                Mode::Compressed => {
                    if let Some(packet) = take_packet(&mut self.inflated) {
                        return Ok(Some(packet));
                    }
                    let Some(header) = CompressedHeader::parse(&self.raw) else {
                        return Ok(None);
                    };
                    if self.raw.len() < header.unit_len() {
                        return Ok(None);
                    }
                    let unit = self.raw.split_to(header.unit_len());
                    let plain = decompress_packet(&header, &unit[super::COMPRESSED_HEADER_LEN..])?;
                    self.inflated.extend_from_slice(&plain);
                }
            }
        }
    }

    /// Feed a chunk and forward every packet it completes into `sink`.
    ///
    /// Returns the number of bytes forwarded.
    pub fn write(&mut self, chunk: &[u8], sink: &mut Vec<Bytes>) -> Result<usize, FramingError> {
        self.push(chunk);
        let mut forwarded = 0;
        while let Some(packet) = self.next_packet()? {
            forwarded += packet.len();
            sink.push(packet);
        }
        Ok(forwarded)
    }
}

impl Default for Splitter {
    fn default() -> Self {
        Self::new()
    }
}

/// Split one complete plain packet off the front of `buf`.
fn take_packet(buf: &mut BytesMut) -> Option<Bytes> {
    if buf.len() < HEADER_LEN {
        return None;
    }
    let total = HEADER_LEN + read_u24(buf);
    if buf.len() < total {
        return None;
    }
    Some(buf.split_to(total).freeze())
}

/// Split a byte slice into complete plain packets and the trailing remainder.
pub fn split_packets(mut data: &[u8]) -> (Vec<&[u8]>, &[u8]) {
    let mut packets = Vec::new();
    while data.len() >= HEADER_LEN {
        let total = HEADER_LEN + read_u24(data);
        if data.len() < total {
            break;
        }
        packets.push(&data[..total]);
        data.advance(total);
    }
    (packets, data)
}
