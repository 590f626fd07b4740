//! Integration tests for mysqltrace.
//!
//! Tests the full capture pipeline and output formatting using synthetic,
//! gzip-compressed captures.

use std::io::Write;

use flate2::write::GzEncoder;
use mysqltrace::cli::{OutputFormat, OutputFormatter};
use mysqltrace::{trace_capture, TraceOptions};
use tempfile::NamedTempFile;

/// Prepare response for a statement with three VARSTRING parameters.
const PREPARE_OK: [u8; 106] = [
    0x0c, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00,
    0x17, 0x00, 0x00, 0x02, 0x03, 0x64, 0x65, 0x66, 0x00, 0x00, 0x00, 0x01, 0x3f, 0x00, 0x0c, 0x3f,
    0x00, 0x00, 0x00, 0x00, 0x00, 0xfd, 0x80, 0x00, 0x00, 0x00, 0x00, 0x17, 0x00, 0x00, 0x03, 0x03,
    0x64, 0x65, 0x66, 0x00, 0x00, 0x00, 0x01, 0x3f, 0x00, 0x0c, 0x3f, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xfd, 0x80, 0x00, 0x00, 0x00, 0x00, 0x17, 0x00, 0x00, 0x04, 0x03, 0x64, 0x65, 0x66, 0x00, 0x00,
    0x00, 0x01, 0x3f, 0x00, 0x0c, 0x3f, 0x00, 0x00, 0x00, 0x00, 0x00, 0xfd, 0x80, 0x00, 0x00, 0x00,
    0x00, 0x05, 0x00, 0x00, 0x05, 0xfe, 0x00, 0x00, 0x03, 0x00,
];

/// Execute of statement 1 with ("person4", NULL, "Life story").
const EXECUTE: [u8; 41] = [
    0x25, 0x00, 0x00, 0x00, 0x17, 0x01, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0x01,
    0xfe, 0x00, 0x06, 0x00, 0xfe, 0x00, 0x07, 0x70, 0x65, 0x72, 0x73, 0x6f, 0x6e, 0x34, 0x0a, 0x4c,
    0x69, 0x66, 0x65, 0x20, 0x73, 0x74, 0x6f, 0x72, 0x79,
];

const OK: [u8; 11] = [0x07, 0x00, 0x00, 0x01, 0x00, 0x01, 0x01, 0x02, 0x00, 0x00, 0x00];

fn prepare_request() -> Vec<u8> {
    let body = b"\x16INSERT INTO people VALUES (?, ?, ?)";
    let mut packet = (body.len() as u32).to_le_bytes()[..3].to_vec();
    packet.push(0);
    packet.extend_from_slice(body);
    packet
}

/// Build an Ethernet/IPv4/TCP PSH-ACK frame between 10.1.1.1:45000 and 10.1.1.2:3306.
fn build_frame(to_server: bool, seq: u32, payload: &[u8]) -> Vec<u8> {
    let (src, dst, sport, dport) = if to_server {
        ([10, 1, 1, 1], [10, 1, 1, 2], 45000u16, 3306u16)
    } else {
        ([10, 1, 1, 2], [10, 1, 1, 1], 3306, 45000)
    };

    let mut packet = Vec::new();

    // Ethernet header
    packet.extend_from_slice(&[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]); // dst MAC
    packet.extend_from_slice(&[0x11, 0x22, 0x33, 0x44, 0x55, 0x66]); // src MAC
    packet.extend_from_slice(&[0x08, 0x00]); // ethertype: IPv4

    // IPv4 header
    packet.extend_from_slice(&[0x45, 0x00]);
    packet.extend_from_slice(&((40 + payload.len()) as u16).to_be_bytes()); // Total length
    packet.extend_from_slice(&[0x00, 0x01, 0x40, 0x00, 0x40, 0x06, 0x00, 0x00]);
    packet.extend_from_slice(&src);
    packet.extend_from_slice(&dst);

    // TCP header
    packet.extend_from_slice(&sport.to_be_bytes());
    packet.extend_from_slice(&dport.to_be_bytes());
    packet.extend_from_slice(&seq.to_be_bytes());
    packet.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]); // Ack
    packet.extend_from_slice(&[0x50, 0x18]); // Data offset 5, PSH+ACK
    packet.extend_from_slice(&[0xff, 0xff, 0x00, 0x00, 0x00, 0x00]);

    packet.extend_from_slice(payload);
    packet
}

/// Gzip-compressed legacy PCAP with one record per frame.
fn write_capture(frames: &[(u32, Vec<u8>)]) -> NamedTempFile {
    let mut pcap = vec![0xd4, 0xc3, 0xb2, 0xa1, 0x02, 0x00, 0x04, 0x00];
    pcap.extend_from_slice(&[0; 8]);
    pcap.extend_from_slice(&65535u32.to_le_bytes());
    pcap.extend_from_slice(&1u32.to_le_bytes());
    for (usec, frame) in frames {
        pcap.extend_from_slice(&1_700_000_000u32.to_le_bytes());
        pcap.extend_from_slice(&usec.to_le_bytes());
        pcap.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        pcap.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        pcap.extend_from_slice(frame);
    }

    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&pcap).unwrap();
    let mut temp = NamedTempFile::new().unwrap();
    temp.write_all(&encoder.finish().unwrap()).unwrap();
    temp.flush().unwrap();
    temp
}

/// Prepare and execute, with the prepare response split across two segments.
fn prepared_statement_capture() -> NamedTempFile {
    let prepare = prepare_request();
    let execute_seq = 1 + prepare.len() as u32;
    write_capture(&[
        (10, build_frame(true, 1, &prepare)),
        (20, build_frame(false, 1, &PREPARE_OK[..50])),
        (21, build_frame(false, 51, &PREPARE_OK[50..])),
        (30, build_frame(true, execute_seq, &EXECUTE)),
        (40, build_frame(false, 1 + PREPARE_OK.len() as u32, &OK)),
    ])
}

#[tokio::test]
async fn test_prepared_statement_through_gzip_capture() {
    let capture = prepared_statement_capture();
    let trace = trace_capture(capture.path(), TraceOptions::default())
        .await
        .unwrap();

    assert_eq!(trace.connections.len(), 1);
    assert_eq!(trace.failed, 0);
    assert_eq!(trace.stats.frames, 5);

    let connection = &trace.connections[0];
    let kinds: Vec<_> = connection.items.iter().map(|t| t.kind).collect();
    assert_eq!(kinds, vec!["Prepare", "PrepareOK", "Execute", "OK"]);

    let json = serde_json::to_value(connection).unwrap();
    assert_eq!(
        json["items"][2]["event"]["params"],
        serde_json::json!(["person4", null, "Life story"])
    );
}

#[tokio::test]
async fn test_summary_output_for_capture() {
    let capture = prepared_statement_capture();
    let trace = trace_capture(capture.path(), TraceOptions::default())
        .await
        .unwrap();

    let mut out = Vec::new();
    let formatter = OutputFormatter::new(OutputFormat::Summary);
    for connection in &trace.connections {
        formatter.write(connection, &mut out).unwrap();
    }
    let text = String::from_utf8(out).unwrap();

    assert!(text.starts_with("== 10.1.1.1:45000 -> 10.1.1.2:3306 (4 events, 0 decode errors)"));
    assert!(text.contains("INSERT INTO people VALUES (?, ?, ?)"));
    assert!(text.contains("-> prepared #1 (3 params)"));
    assert!(text.contains("-> OK (1 affected)"));
}

#[tokio::test]
async fn test_server_port_mismatch_yields_nothing() {
    let capture = prepared_statement_capture();
    let mut options = TraceOptions::default();
    options.stream.server_port = Some(3307);

    let trace = trace_capture(capture.path(), options).await.unwrap();
    assert!(trace.connections.is_empty());
    assert_eq!(trace.stats.filtered_segments, 5);
}
