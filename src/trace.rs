//! Capture processing: read frames, reassemble, replay connections.
//!
//! Reading and reassembly run on one blocking task per capture. Every
//! connection that completes is replayed on its own blocking task, and the
//! results are collected in the order connections were first seen.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use mysqltrace_core::{
    Connection, ConnectionBuilder, PcapReader, SessionConfig, SessionRegistry, StreamConfig,
    StreamManager, StreamStats,
};

/// Settings for processing one capture.
#[derive(Debug, Clone, Default)]
pub struct TraceOptions {
    pub stream: StreamConfig,
    pub session: SessionConfig,
}

/// Everything recovered from one capture file.
#[derive(Debug)]
pub struct CaptureTrace {
    pub path: PathBuf,
    pub connections: Vec<Connection>,
    pub stats: StreamStats,
    /// Connections dropped because replay hit an internal error.
    pub failed: usize,
}

type Replay = JoinHandle<mysqltrace_core::Result<Connection>>;

/// Decode every MySQL connection in a capture file.
pub async fn trace_capture(path: impl AsRef<Path>, options: TraceOptions) -> Result<CaptureTrace> {
    let path = path.as_ref().to_path_buf();
    let reader_path = path.clone();
    let (stats, replays) = tokio::task::spawn_blocking(move || read_capture(&reader_path, options))
        .await
        .context("capture reader task failed")??;

    let mut connections = Vec::with_capacity(replays.len());
    let mut failed = 0;
    for replay in replays {
        match replay.await.context("replay task failed")? {
            Ok(connection) => connections.push(connection),
            Err(e) => {
                error!(error = %e, "skipping connection");
                failed += 1;
            }
        }
    }

    info!(
        path = %path.display(),
        connections = connections.len(),
        failed,
        "capture decoded"
    );
    Ok(CaptureTrace {
        path,
        connections,
        stats,
        failed,
    })
}

fn read_capture(path: &Path, options: TraceOptions) -> Result<(StreamStats, Vec<Replay>)> {
    let mut reader = PcapReader::open(path)
        .with_context(|| format!("Failed to open capture: {}", path.display()))?;
    debug!(
        path = %path.display(),
        format = ?reader.format(),
        compression = %reader.compression(),
        "reading capture"
    );

    let registry = Arc::new(SessionRegistry::new(options.session));
    let mut manager = StreamManager::new(options.stream, registry);
    let mut replays = Vec::new();

    loop {
        match reader.next_packet() {
            Ok(Some(packet)) => {
                if packet.is_truncated() {
                    debug!(frame = packet.frame_number, "frame truncated by snap length");
                }
                manager.process_packet(&packet);
                replays.extend(manager.take_completed().into_iter().map(spawn_replay));
            }
            Ok(None) => break,
            Err(e) => {
                // Keep what was read before a damaged or cut-off record
                warn!(
                    path = %path.display(),
                    frame = reader.frame_count(),
                    error = %e,
                    "stopping at unreadable record"
                );
                break;
            }
        }
    }

    replays.extend(manager.finish().into_iter().map(spawn_replay));
    let stats = manager.stats().clone();
    info!(
        frames = stats.frames,
        skipped = stats.skipped_frames,
        retransmits = stats.retransmits,
        dropped_bytes = stats.dropped_bytes,
        "capture read"
    );
    Ok((stats, replays))
}

fn spawn_replay(builder: ConnectionBuilder) -> Replay {
    tokio::task::spawn_blocking(move || builder.drain())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    // Test 1: Missing capture is an error with the path in context
    #[tokio::test]
    async fn test_missing_capture() {
        let err = trace_capture("/nonexistent/capture.pcap", TraceOptions::default())
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/capture.pcap"));
    }

    // Test 2: Capture with no MySQL traffic yields no connections
    #[tokio::test]
    async fn test_empty_capture() {
        let mut data = vec![0xd4, 0xc3, 0xb2, 0xa1, 0x02, 0x00, 0x04, 0x00];
        data.extend_from_slice(&[0; 8]);
        data.extend_from_slice(&65535u32.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(&data).unwrap();

        let trace = trace_capture(temp.path(), TraceOptions::default()).await.unwrap();
        assert!(trace.connections.is_empty());
        assert_eq!(trace.stats.frames, 0);
        assert_eq!(trace.failed, 0);
    }
}
