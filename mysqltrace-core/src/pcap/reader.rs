//! File-backed capture reader.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use tracing::debug;

use crate::error::{Error, PcapError};
use crate::io::{Compression, FileDecoder, GenericPcapReader, PcapFormat, RawPacket};

/// Reader for PCAP and PCAPNG files, optionally gzip-compressed.
///
/// # Example
///
/// ```no_run
/// use mysqltrace_core::pcap::PcapReader;
///
/// let mut reader = PcapReader::open("capture.pcap.gz")?;
/// while let Some(packet) = reader.next_packet()? {
///     println!("frame {}: {} bytes", packet.frame_number, packet.data.len());
/// }
/// # Ok::<(), mysqltrace_core::Error>(())
/// ```
pub struct PcapReader {
    inner: GenericPcapReader<FileDecoder>,
    compression: Compression,
}

fn open_file(path: &Path) -> Result<File, Error> {
    File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::Pcap(PcapError::FileNotFound {
            path: path.display().to_string(),
        }),
        _ => Error::Io(e),
    })
}

/// Read up to `buf.len()` bytes, stopping early only at end of input.
fn read_prefix(source: &mut impl Read, buf: &mut [u8]) -> Result<usize, Error> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        }
    }
    Ok(filled)
}

impl PcapReader {
    /// Open a capture, detecting compression and format from magic bytes.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();

        let mut header = [0u8; 4];
        let read = read_prefix(&mut open_file(path)?, &mut header)?;
        if read < header.len() {
            return Err(Error::Pcap(PcapError::InvalidFormat {
                reason: "File too short".to_string(),
            }));
        }
        let compression = Compression::detect(&header);

        // The PCAP magic sits behind the compression, so peek through a
        // throwaway decoder and start over with a fresh one.
        let mut magic = [0u8; 4];
        let mut sniff = FileDecoder::new(open_file(path)?, compression);
        if read_prefix(&mut sniff, &mut magic)? < magic.len() {
            return Err(Error::Pcap(PcapError::InvalidFormat {
                reason: "File too short to read magic number".to_string(),
            }));
        }
        let format = PcapFormat::detect(&magic)?;
        debug!(path = %path.display(), %compression, ?format, "opened capture");

        let decoder = FileDecoder::new(open_file(path)?, compression);
        let inner = GenericPcapReader::with_format(decoder, format)?;
        Ok(Self { inner, compression })
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn format(&self) -> PcapFormat {
        self.inner.format()
    }

    /// Link type of the capture (1 = Ethernet).
    pub fn link_type(&self) -> u16 {
        self.inner.link_type()
    }

    pub fn frame_count(&self) -> u64 {
        self.inner.frame_count()
    }

    /// Read the next packet, `Ok(None)` at end of file.
    pub fn next_packet(&mut self) -> Result<Option<RawPacket>, Error> {
        self.inner.next_packet()
    }
}

impl Iterator for PcapReader {
    type Item = Result<RawPacket, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_packet().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn minimal_pcap() -> Vec<u8> {
        let mut data = vec![0xd4, 0xc3, 0xb2, 0xa1, 0x02, 0x00, 0x04, 0x00];
        data.extend_from_slice(&[0; 8]);
        data.extend_from_slice(&65535u32.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());

        for (sec, frame) in [(10u32, [0xaa; 14]), (11, [0xbb; 14])] {
            data.extend_from_slice(&sec.to_le_bytes());
            data.extend_from_slice(&0u32.to_le_bytes());
            data.extend_from_slice(&14u32.to_le_bytes());
            data.extend_from_slice(&14u32.to_le_bytes());
            data.extend_from_slice(&frame);
        }
        data
    }

    fn write_temp(bytes: &[u8]) -> NamedTempFile {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(bytes).unwrap();
        temp.flush().unwrap();
        temp
    }

    // Test 1: Plain capture through the iterator
    #[test]
    fn test_open_plain() {
        let temp = write_temp(&minimal_pcap());
        let reader = PcapReader::open(temp.path()).unwrap();
        assert_eq!(reader.compression(), Compression::None);
        assert_eq!(reader.format(), PcapFormat::LegacyLeMicro);

        let packets: Vec<RawPacket> = reader.collect::<Result<_, _>>().unwrap();
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[1].timestamp_us, 11_000_000);
        assert_eq!(packets[1].data[0], 0xbb);
    }

    // Test 2: Gzip-wrapped capture
    #[test]
    fn test_open_gzip() {
        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&minimal_pcap()).unwrap();
        let temp = write_temp(&encoder.finish().unwrap());

        let mut reader = PcapReader::open(temp.path()).unwrap();
        assert_eq!(reader.compression(), Compression::Gzip);
        assert_eq!(reader.next_packet().unwrap().unwrap().frame_number, 1);
        assert_eq!(reader.next_packet().unwrap().unwrap().frame_number, 2);
        assert!(reader.next_packet().unwrap().is_none());
        assert_eq!(reader.frame_count(), 2);
        assert_eq!(reader.link_type(), 1);
    }

    // Test 3: Missing, short and unrecognised files
    #[test]
    fn test_open_errors() {
        assert!(matches!(
            PcapReader::open("/nonexistent/capture.pcap"),
            Err(Error::Pcap(PcapError::FileNotFound { .. }))
        ));

        let short = write_temp(&[0xd4, 0xc3]);
        assert!(matches!(
            PcapReader::open(short.path()),
            Err(Error::Pcap(PcapError::InvalidFormat { .. }))
        ));

        let text = write_temp(b"not a capture file");
        assert!(matches!(
            PcapReader::open(text.path()),
            Err(Error::Pcap(PcapError::InvalidFormat { .. }))
        ));
    }
}
