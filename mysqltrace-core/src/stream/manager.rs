use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace};

use crate::io::RawPacket;
use crate::mysql::packet::Timestamp;
use crate::mysql::session::{ConnectionBuilder, SessionRegistry};

use super::{
    decode_frame, Chunk, ConnectionAddress, ConnectionTracker, Direction, StreamBuffer, TcpSegment,
};

/// Configuration for the StreamManager.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Port the MySQL server listens on. Overrides the lower-port guess and
    /// drops flows that do not touch it.
    pub server_port: Option<u16>,
    /// Maximum out-of-order bytes held per direction.
    pub max_connection_buffer: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            server_port: None,
            max_connection_buffer: 16 * 1024 * 1024, // 16 MB per direction
        }
    }
}

/// Counters collected while processing a capture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    pub frames: u64,
    /// Frames that did not carry TCP over IP.
    pub skipped_frames: u64,
    /// TCP segments outside the configured server port.
    pub filtered_segments: u64,
    pub payload_bytes: u64,
    pub retransmits: u64,
    pub out_of_order: u64,
    /// Bytes lost to the reassembly limit.
    pub dropped_bytes: u64,
    pub connections_closed: u64,
}

/// Drives reassembly for every captured packet and feeds the ordered bytes
/// to a [`SessionRegistry`].
pub struct StreamManager {
    config: StreamConfig,
    tracker: ConnectionTracker,
    buffers: HashMap<(ConnectionAddress, Direction), StreamBuffer>,
    registry: Arc<SessionRegistry>,
    stats: StreamStats,
    /// Connections closed since the last `take_completed`.
    newly_closed: usize,
}

impl StreamManager {
    pub fn new(config: StreamConfig, registry: Arc<SessionRegistry>) -> Self {
        Self {
            tracker: ConnectionTracker::new(config.server_port),
            config,
            buffers: HashMap::new(),
            registry,
            stats: StreamStats::default(),
            newly_closed: 0,
        }
    }

    /// Create with default config and a fresh registry.
    pub fn with_defaults() -> Self {
        Self::new(StreamConfig::default(), Arc::new(SessionRegistry::default()))
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    /// Decode a captured frame and process the TCP segment it carries.
    pub fn process_packet(&mut self, packet: &RawPacket) {
        self.stats.frames += 1;
        match decode_frame(packet.link_type, &packet.data) {
            Some(segment) => self.process_segment(segment, packet.timestamp_us),
            None => {
                trace!(frame = packet.frame_number, "not a TCP frame");
                self.stats.skipped_frames += 1;
            }
        }
    }

    /// Process a TCP segment.
    ///
    /// Contiguous payload is delivered to the registry immediately. FIN
    /// closes the sender's direction once everything before it is out; RST
    /// closes both.
    pub fn process_segment(&mut self, segment: TcpSegment, timestamp: Timestamp) {
        if let Some(port) = self.config.server_port {
            if segment.src.port != port && segment.dst.port != port {
                self.stats.filtered_segments += 1;
                return;
            }
        }

        // 1. Resolve connection and direction
        let (address, direction) = self
            .tracker
            .get_or_create(segment.src, segment.dst, segment.flags);
        let key = (address.clone(), direction);
        let max_pending = self.config.max_connection_buffer;
        let buffer = self
            .buffers
            .entry(key)
            .or_insert_with(|| StreamBuffer::new(max_pending));

        // 2. SYN fixes the initial sequence number
        if segment.flags.syn && buffer.segment_count == 0 {
            buffer.set_initial_seq(segment.seq);
        }

        // 3. Reassemble and deliver
        self.stats.payload_bytes += segment.payload.len() as u64;
        let chunks = buffer.add_segment(segment.seq, segment.payload, timestamp);
        self.deliver(&address, direction, chunks);

        // 4. Closing
        if segment.flags.rst {
            debug!(%address, %direction, "connection reset");
            self.close(&address, Direction::ToServer);
            self.close(&address, Direction::ToClient);
        } else if segment.flags.fin {
            self.close(&address, direction);
        }

        if self.is_fully_closed(&address) {
            self.finalize_connection(&address);
        }
    }

    fn deliver(&self, address: &ConnectionAddress, direction: Direction, chunks: Vec<Chunk>) {
        for chunk in chunks {
            self.registry
                .deliver(address, direction, chunk.timestamp, chunk.data);
        }
    }

    /// Flush what is left in one direction and tell the registry it is done.
    fn close(&mut self, address: &ConnectionAddress, direction: Direction) {
        let key = (address.clone(), direction);
        let max_pending = self.config.max_connection_buffer;
        let buffer = self
            .buffers
            .entry(key)
            .or_insert_with(|| StreamBuffer::new(max_pending));
        if buffer.fin_received {
            return;
        }
        buffer.fin_received = true;
        let chunks = buffer.flush_pending();
        self.deliver(address, direction, chunks);
        self.registry.close(address, direction);
    }

    fn is_fully_closed(&self, address: &ConnectionAddress) -> bool {
        [Direction::ToServer, Direction::ToClient].iter().all(|&d| {
            self.buffers
                .get(&(address.clone(), d))
                .is_some_and(StreamBuffer::is_complete)
        })
    }

    /// Drop reassembly state so a reused tuple starts fresh.
    fn finalize_connection(&mut self, address: &ConnectionAddress) {
        for direction in [Direction::ToServer, Direction::ToClient] {
            if let Some(buffer) = self.buffers.remove(&(address.clone(), direction)) {
                self.record(&buffer);
            }
        }
        self.tracker.remove(address);
        self.stats.connections_closed += 1;
        self.newly_closed += 1;
        debug!(%address, "connection closed");
    }

    fn record(&mut self, buffer: &StreamBuffer) {
        self.stats.retransmits += u64::from(buffer.retransmit_count);
        self.stats.out_of_order += u64::from(buffer.out_of_order_count);
        self.stats.dropped_bytes += buffer.dropped_bytes as u64;
    }

    /// Connections whose both directions have closed since the last call,
    /// in the order they were first seen.
    pub fn take_completed(&mut self) -> Vec<ConnectionBuilder> {
        if self.newly_closed == 0 {
            return Vec::new();
        }
        self.newly_closed = 0;
        self.registry.take_completed()
    }

    /// End of capture: flush every open stream and hand back all remaining
    /// connections, closed or not.
    pub fn finish(&mut self) -> Vec<ConnectionBuilder> {
        let buffers: Vec<_> = self.buffers.drain().collect();
        for ((address, direction), mut buffer) in buffers {
            let chunks = buffer.flush_pending();
            self.deliver(&address, direction, chunks);
            self.record(&buffer);
        }
        debug!(stats = ?self.stats, "capture finished");
        self.registry.finish()
    }
}
