//! Fuzz target for capture file parsing.
//!
//! Tests handling of malformed PCAP/PCAPNG files including:
//! - Magic byte detection
//! - Global header parsing
//! - Packet record headers (caplen, origlen, timestamps)
//! - Link, IP and TCP header extraction for every record

#![no_main]

use libfuzzer_sys::fuzz_target;
use mysqltrace_core::io::{GenericPcapReader, PcapFormat};
use mysqltrace_core::stream::StreamManager;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Format detection - should never panic
    let Ok(format) = PcapFormat::detect(data) else {
        return;
    };
    let Ok(mut reader) = GenericPcapReader::with_format(Cursor::new(data), format) else {
        return;
    };

    // Every readable record goes through reassembly and replay
    let mut manager = StreamManager::with_defaults();
    while let Ok(Some(packet)) = reader.next_packet() {
        manager.process_packet(&packet);
    }
    for builder in manager.finish() {
        let _ = builder.drain();
    }
});
