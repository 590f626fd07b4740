//! PCAP/PCAPNG reader over any `Read` source, built on `pcap_parser`.

use std::io::{BufReader, Read};

use bytes::Bytes;
use pcap_parser::pcapng::Block;
use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{LegacyPcapReader, PcapBlockOwned, PcapError as ParserError, PcapNGReader};
use tracing::trace;

use super::RawPacket;
use crate::error::{Error, PcapError};

/// Buffer size for the `pcap_parser` readers (256KB).
const BUFFER_SIZE: usize = 262144;

/// Format of the capture file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PcapFormat {
    /// Classic PCAP (little-endian, microseconds)
    LegacyLeMicro,
    /// Classic PCAP (big-endian, microseconds)
    LegacyBeMicro,
    /// Classic PCAP (little-endian, nanoseconds)
    LegacyLeNano,
    /// Classic PCAP (big-endian, nanoseconds)
    LegacyBeNano,
    PcapNg,
}

impl PcapFormat {
    /// Detect the format from the magic bytes at the start of the file.
    pub fn detect(data: &[u8]) -> Result<Self, Error> {
        let Some(magic) = data.get(..4) else {
            return Err(Error::Pcap(PcapError::InvalidFormat {
                reason: "Data too small for PCAP magic".into(),
            }));
        };

        match magic {
            [0xd4, 0xc3, 0xb2, 0xa1] => Ok(PcapFormat::LegacyLeMicro),
            [0xa1, 0xb2, 0xc3, 0xd4] => Ok(PcapFormat::LegacyBeMicro),
            [0x4d, 0x3c, 0xb2, 0xa1] => Ok(PcapFormat::LegacyLeNano),
            [0xa1, 0xb2, 0x3c, 0x4d] => Ok(PcapFormat::LegacyBeNano),
            [0x0a, 0x0d, 0x0d, 0x0a] => Ok(PcapFormat::PcapNg),
            _ => Err(Error::Pcap(PcapError::InvalidFormat {
                reason: format!("Unknown PCAP magic: {}", hex::encode(magic)),
            })),
        }
    }

    pub fn is_pcapng(&self) -> bool {
        matches!(self, PcapFormat::PcapNg)
    }

    pub fn is_legacy(&self) -> bool {
        !self.is_pcapng()
    }

    /// Whether legacy record timestamps carry nanoseconds.
    pub fn is_nanosecond(&self) -> bool {
        matches!(self, PcapFormat::LegacyLeNano | PcapFormat::LegacyBeNano)
    }
}

/// Capture reader producing owned [`RawPacket`]s.
pub struct GenericPcapReader<R: Read> {
    inner: ReaderInner<R>,
    format: PcapFormat,
    frame_number: u64,
    link_type: u16,
}

enum ReaderInner<R: Read> {
    Legacy(LegacyPcapReader<BufReader<R>>),
    Ng(PcapNGReader<BufReader<R>>),
}

impl<R: Read> GenericPcapReader<R> {
    /// Create a reader for a source whose format is already known.
    ///
    /// Use [`PcapFormat::detect`] on the first bytes to find it.
    pub fn with_format(source: R, format: PcapFormat) -> Result<Self, Error> {
        let buf_reader = BufReader::with_capacity(BUFFER_SIZE, source);

        let inner = if format.is_pcapng() {
            let reader = PcapNGReader::new(BUFFER_SIZE, buf_reader).map_err(|e| {
                Error::Pcap(PcapError::InvalidFormat {
                    reason: format!("Failed to parse PCAPNG: {}", e),
                })
            })?;
            ReaderInner::Ng(reader)
        } else {
            let reader = LegacyPcapReader::new(BUFFER_SIZE, buf_reader).map_err(|e| {
                Error::Pcap(PcapError::InvalidFormat {
                    reason: format!("Failed to parse legacy PCAP: {}", e),
                })
            })?;
            ReaderInner::Legacy(reader)
        };

        Ok(GenericPcapReader {
            inner,
            format,
            frame_number: 0,
            link_type: 1, // Ethernet until a header says otherwise
        })
    }

    /// Read the next packet, `Ok(None)` at end of file.
    pub fn next_packet(&mut self) -> Result<Option<RawPacket>, Error> {
        match &mut self.inner {
            ReaderInner::Legacy(reader) => read_legacy_packet(
                reader,
                self.format.is_nanosecond(),
                &mut self.frame_number,
                &mut self.link_type,
            ),
            ReaderInner::Ng(reader) => {
                read_pcapng_packet(reader, &mut self.frame_number, &mut self.link_type)
            }
        }
    }

    pub fn format(&self) -> PcapFormat {
        self.format
    }

    /// Link type of the most recent header (1 = Ethernet).
    pub fn link_type(&self) -> u16 {
        self.link_type
    }

    /// Packets returned so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_number
    }
}

fn refill_error(kind: &str, e: impl std::fmt::Display) -> Error {
    Error::Pcap(PcapError::InvalidFormat {
        reason: format!("{kind} refill error: {e}"),
    })
}

fn parse_error(kind: &str, e: impl std::fmt::Display) -> Error {
    Error::Pcap(PcapError::InvalidFormat {
        reason: format!("{kind} parse error: {e}"),
    })
}

fn read_legacy_packet<S: Read>(
    reader: &mut LegacyPcapReader<S>,
    nanosecond: bool,
    frame_number: &mut u64,
    link_type: &mut u16,
) -> Result<Option<RawPacket>, Error> {
    loop {
        match reader.next() {
            Ok((offset, block)) => {
                let packet = match block {
                    PcapBlockOwned::Legacy(packet) => {
                        *frame_number += 1;
                        let fraction = if nanosecond {
                            i64::from(packet.ts_usec) / 1_000
                        } else {
                            i64::from(packet.ts_usec)
                        };
                        Some(RawPacket {
                            frame_number: *frame_number,
                            timestamp_us: i64::from(packet.ts_sec) * 1_000_000 + fraction,
                            captured_length: packet.caplen,
                            original_length: packet.origlen,
                            link_type: *link_type,
                            data: Bytes::copy_from_slice(packet.data),
                        })
                    }
                    PcapBlockOwned::LegacyHeader(header) => {
                        *link_type = header.network.0 as u16;
                        trace!(link_type = *link_type, "legacy pcap header");
                        None
                    }
                    _ => None,
                };
                reader.consume(offset);
                if packet.is_some() {
                    return Ok(packet);
                }
            }
            Err(ParserError::Eof) => return Ok(None),
            Err(ParserError::Incomplete(_)) => {
                reader.refill().map_err(|e| refill_error("Legacy PCAP", e))?;
            }
            Err(e) => return Err(parse_error("Legacy PCAP", e)),
        }
    }
}

fn read_pcapng_packet<S: Read>(
    reader: &mut PcapNGReader<S>,
    frame_number: &mut u64,
    link_type: &mut u16,
) -> Result<Option<RawPacket>, Error> {
    loop {
        match reader.next() {
            Ok((offset, block)) => {
                let packet = match block {
                    PcapBlockOwned::NG(Block::InterfaceDescription(idb)) => {
                        *link_type = idb.linktype.0 as u16;
                        trace!(link_type = *link_type, "pcapng interface");
                        None
                    }
                    PcapBlockOwned::NG(Block::EnhancedPacket(epb)) => {
                        *frame_number += 1;
                        Some(RawPacket {
                            frame_number: *frame_number,
                            timestamp_us: (i64::from(epb.ts_high) << 32) | i64::from(epb.ts_low),
                            captured_length: epb.caplen,
                            original_length: epb.origlen,
                            link_type: *link_type,
                            data: Bytes::copy_from_slice(epb.data),
                        })
                    }
                    PcapBlockOwned::NG(Block::SimplePacket(spb)) => {
                        *frame_number += 1;
                        Some(RawPacket {
                            frame_number: *frame_number,
                            timestamp_us: 0,
                            captured_length: spb.data.len() as u32,
                            original_length: spb.origlen,
                            link_type: *link_type,
                            data: Bytes::copy_from_slice(spb.data),
                        })
                    }
                    _ => None,
                };
                reader.consume(offset);
                if packet.is_some() {
                    return Ok(packet);
                }
            }
            Err(ParserError::Eof) => return Ok(None),
            Err(ParserError::Incomplete(_)) => {
                reader.refill().map_err(|e| refill_error("PCAPNG", e))?;
            }
            Err(e) => return Err(parse_error("PCAPNG", e)),
        }
    }
}
