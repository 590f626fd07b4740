use std::collections::BTreeMap;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::mysql::packet::Timestamp;

/// Contiguous stream bytes released by reassembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// When the bytes became contiguous.
    pub timestamp: Timestamp,
    pub data: Bytes,
}

/// An out-of-order segment waiting for the gap before it to fill.
#[derive(Debug, Clone)]
struct Pending {
    data: Bytes,
    timestamp: Timestamp,
}

/// Reassembly state for one direction of a TCP stream.
///
/// Segments go in with their sequence numbers; ordered chunks come out as
/// soon as they are contiguous. Nothing is held once delivered.
#[derive(Debug)]
pub struct StreamBuffer {
    /// Next expected sequence number.
    expected_seq: u32,
    /// Initial sequence number, from the SYN or the first segment seen.
    initial_seq: Option<u32>,
    /// Out-of-order segments keyed by sequence number.
    pending: BTreeMap<u32, Pending>,
    pending_bytes: usize,
    max_pending: usize,
    overflow_warned: bool,
    pub segment_count: u32,
    pub retransmit_count: u32,
    pub out_of_order_count: u32,
    /// Payload discarded because the pending cap was reached.
    pub dropped_bytes: usize,
    pub fin_received: bool,
}

impl StreamBuffer {
    /// `max_pending` bounds the bytes held while waiting for a gap to fill.
    pub fn new(max_pending: usize) -> Self {
        Self {
            expected_seq: 0,
            initial_seq: None,
            pending: BTreeMap::new(),
            pending_bytes: 0,
            max_pending,
            overflow_warned: false,
            segment_count: 0,
            retransmit_count: 0,
            out_of_order_count: 0,
            dropped_bytes: 0,
            fin_received: false,
        }
    }

    /// Set the initial sequence number from a SYN.
    pub fn set_initial_seq(&mut self, seq: u32) {
        self.initial_seq = Some(seq);
        self.expected_seq = seq.wrapping_add(1); // SYN consumes one seq
    }

    /// Add a segment and return whatever became contiguous, in order.
    pub fn add_segment(&mut self, seq: u32, data: Bytes, timestamp: Timestamp) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        if data.is_empty() {
            return chunks;
        }
        self.segment_count += 1;

        // No SYN seen: the first segment defines the start
        if self.initial_seq.is_none() {
            self.initial_seq = Some(seq);
            self.expected_seq = seq;
        }

        let (seq, data) = match self.trim_delivered(seq, data) {
            Some(trimmed) => trimmed,
            None => {
                self.retransmit_count += 1;
                return chunks;
            }
        };

        if seq == self.expected_seq {
            self.expected_seq = seq_add(seq, data.len());
            chunks.push(Chunk { timestamp, data });
            self.release_pending(timestamp, &mut chunks);
        } else {
            self.out_of_order_count += 1;
            self.hold(seq, data, timestamp);
        }
        chunks
    }

    /// Cut off the part of a segment that was already delivered. `None` when
    /// nothing new remains.
    fn trim_delivered(&self, seq: u32, data: Bytes) -> Option<(u32, Bytes)> {
        if !seq_lt(seq, self.expected_seq) {
            return Some((seq, data));
        }
        if seq_le(seq_add(seq, data.len()), self.expected_seq) {
            return None;
        }
        let overlap = self.expected_seq.wrapping_sub(seq) as usize;
        Some((self.expected_seq, data.slice(overlap..)))
    }

    fn hold(&mut self, seq: u32, data: Bytes, timestamp: Timestamp) {
        if self.pending_bytes + data.len() > self.max_pending {
            if !self.overflow_warned {
                warn!(
                    pending = self.pending_bytes,
                    limit = self.max_pending,
                    "reassembly buffer full, dropping out-of-order data"
                );
                self.overflow_warned = true;
            }
            self.dropped_bytes += data.len();
            return;
        }

        // Keep the longer copy when a segment is retransmitted out of order
        let longer = self
            .pending
            .get(&seq)
            .map_or(true, |existing| existing.data.len() < data.len());
        if longer {
            self.pending_bytes += data.len();
            if let Some(old) = self.pending.insert(seq, Pending { data, timestamp }) {
                self.pending_bytes -= old.data.len();
            }
        }
    }

    /// Move pending segments that are now in order into `chunks`.
    fn release_pending(&mut self, now: Timestamp, chunks: &mut Vec<Chunk>) {
        while let Some((&seq, _)) = self.pending.first_key_value() {
            if !seq_le(seq, self.expected_seq) {
                break; // Gap
            }
            let Some(segment) = self.pending.remove(&seq) else {
                break;
            };
            self.pending_bytes -= segment.data.len();

            if let Some((seq, data)) = self.trim_delivered(seq, segment.data) {
                self.expected_seq = seq_add(seq, data.len());
                chunks.push(Chunk {
                    timestamp: now.max(segment.timestamp),
                    data,
                });
            }
        }
    }

    /// Give up on missing data and deliver everything still pending.
    ///
    /// Used when the stream ends with holes; the bytes after a gap are still
    /// worth decoding.
    pub fn flush_pending(&mut self) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        while let Some((seq, timestamp)) = self
            .pending
            .first_key_value()
            .map(|(&seq, segment)| (seq, segment.timestamp))
        {
            if seq_lt(self.expected_seq, seq) {
                debug!(
                    missing = seq.wrapping_sub(self.expected_seq),
                    "skipping gap in stream"
                );
                self.expected_seq = seq;
            }
            self.release_pending(timestamp, &mut chunks);
        }
        chunks
    }

    /// Bytes held out of order.
    pub fn pending_bytes(&self) -> usize {
        self.pending_bytes
    }

    /// FIN seen and nothing left waiting.
    pub fn is_complete(&self) -> bool {
        self.fin_received && self.pending.is_empty()
    }
}

// Sequence number comparison helpers
fn seq_lt(a: u32, b: u32) -> bool {
    (a.wrapping_sub(b) as i32) < 0
}

fn seq_le(a: u32, b: u32) -> bool {
    a == b || seq_lt(a, b)
}

fn seq_add(a: u32, n: usize) -> u32 {
    a.wrapping_add(n as u32)
}
