use bytes::Bytes;
use smallvec::SmallVec;

use super::Timestamp;

/// Capture times attached to a packet or event.
pub type Seen = SmallVec<[Timestamp; 2]>;

/// Bytes captured from one direction, tagged with when they were seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    seen: Seen,
    data: Bytes,
}

impl Packet {
    pub fn new<I>(seen: I, data: impl Into<Bytes>) -> Self
    where
        I: IntoIterator<Item = Timestamp>,
    {
        Self {
            seen: seen.into_iter().collect(),
            data: data.into(),
        }
    }

    pub fn seen(&self) -> &[Timestamp] {
        &self.seen
    }

    pub fn first_seen(&self) -> Option<Timestamp> {
        self.seen.first().copied()
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Ordered packets for one direction of a connection.
///
/// Written by the capture side, replayed (without being consumed) by the
/// session correlator.
#[derive(Debug, Clone, Default)]
pub struct PacketBuffer {
    packets: Vec<Packet>,
    bytes: usize,
}

impl PacketBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a packet. One written without timestamps is assumed to have
    /// been seen at the same time as the previous packet.
    pub fn write(&mut self, mut packet: Packet) {
        if packet.seen.is_empty() {
            if let Some(last) = self.packets.last() {
                packet.seen = last.seen.clone();
            }
        }
        self.bytes += packet.len();
        self.packets.push(packet);
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Total payload bytes buffered.
    pub fn byte_len(&self) -> usize {
        self.bytes
    }

    pub fn iter(&self) -> impl Iterator<Item = &Packet> {
        self.packets.iter()
    }

    /// Start a peek-then-advance replay from the first packet.
    pub fn replay(&self) -> PacketReplay<'_> {
        PacketReplay {
            packets: &self.packets,
            pos: 0,
        }
    }
}

/// Read position over a [`PacketBuffer`].
#[derive(Debug, Clone)]
pub struct PacketReplay<'a> {
    packets: &'a [Packet],
    pos: usize,
}

impl<'a> PacketReplay<'a> {
    /// Next packet without consuming it.
    pub fn peek(&self) -> Option<&'a Packet> {
        self.packets.get(self.pos)
    }

    /// Move past the current packet.
    pub fn advance(&mut self) {
        if self.pos < self.packets.len() {
            self.pos += 1;
        }
    }

    /// Rewind to the first packet.
    pub fn reset(&mut self) {
        self.pos = 0;
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.packets.len()
    }
}
