//! Fuzz target for MySQL packet framing.
//!
//! The first byte picks the compression mode and a chunk size; the rest is
//! fed to the splitter in chunks of that size. Framing must never panic and
//! must never hand out more bytes than went in for plain streams.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mysqltrace_core::mysql::packet::{CompressionStart, Splitter};

fuzz_target!(|data: &[u8]| {
    let Some((&control, stream)) = data.split_first() else {
        return;
    };

    let mut splitter = Splitter::new();
    match control & 0x03 {
        1 => splitter.enable_compression(CompressionStart::Immediate),
        2 => splitter.enable_compression(CompressionStart::AfterNextPacket),
        _ => {}
    }
    let chunk_size = usize::from(control >> 2).max(1);

    let mut sink = Vec::new();
    for chunk in stream.chunks(chunk_size) {
        if splitter.write(chunk, &mut sink).is_err() {
            return;
        }
    }

    if !splitter.is_compressed() {
        let framed: usize = sink.iter().map(|p| p.len()).sum();
        assert!(framed + splitter.buffered() <= stream.len());
    }
});
