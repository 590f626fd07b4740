//! Command-line argument definitions.

use clap::Parser;
use std::path::PathBuf;

use mysqltrace_core::{SessionConfig, StreamConfig};

use super::OutputFormat;
use crate::trace::TraceOptions;

/// Reconstruct MySQL client/server conversations from packet captures.
#[derive(Parser, Debug)]
#[command(name = "mysqltrace")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// PCAP or PCAPNG files to decode (optionally gzip-compressed)
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Port the MySQL server listens on; other flows are ignored
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Keep events in replay order instead of sorting by capture time
    #[arg(long = "no-sort")]
    pub no_sort: bool,

    /// Attach the raw MySQL packet bytes (hex) to every event
    #[arg(long = "raw-data")]
    pub raw_data: bool,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Write output to a file instead of stdout
    #[arg(short = 'o', long = "output", value_name = "OUTPUT_FILE")]
    pub output: Option<PathBuf>,

    /// Enable verbose output (repeat for more)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Log filter used when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    pub fn trace_options(&self) -> TraceOptions {
        TraceOptions {
            stream: StreamConfig {
                server_port: self.server_port,
                ..StreamConfig::default()
            },
            session: SessionConfig {
                sort_items: !self.no_sort,
                keep_raw: self.raw_data,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test 1: Flags map onto stream and session configuration
    #[test]
    fn test_trace_options() {
        let args = Args::parse_from([
            "mysqltrace",
            "--server-port",
            "33060",
            "--no-sort",
            "--raw-data",
            "a.pcap",
            "b.pcapng.gz",
        ]);
        assert_eq!(args.files.len(), 2);

        let options = args.trace_options();
        assert_eq!(options.stream.server_port, Some(33060));
        assert!(!options.session.sort_items);
        assert!(options.session.keep_raw);
    }

    // Test 2: Defaults and verbosity levels
    #[test]
    fn test_defaults_and_verbosity() {
        let args = Args::parse_from(["mysqltrace", "capture.pcap"]);
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.log_filter(), "warn");
        assert!(args.trace_options().session.sort_items);

        let args = Args::parse_from(["mysqltrace", "-vv", "--format", "summary", "capture.pcap"]);
        assert_eq!(args.log_filter(), "debug");
        assert_eq!(args.format, OutputFormat::Summary);
    }

    // Test 3: At least one file is required
    #[test]
    fn test_file_required() {
        assert!(Args::try_parse_from(["mysqltrace"]).is_err());
    }
}
