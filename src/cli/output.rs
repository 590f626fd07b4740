//! Output formatting for decoded connections.
//!
//! JSON output serializes the full transcript; the summary view prints one
//! line per client command with its outcome and latency.

use std::io::Write;

use chrono::{DateTime, SecondsFormat};
use clap::ValueEnum;

use mysqltrace_core::{summarize, CommandSummary, Connection};

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON Lines (one connection per line)
    Json,
    /// Indented JSON, one document per connection
    Pretty,
    /// One line per command with its response
    Summary,
}

/// Formats connections for output.
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    /// Create a new formatter with the specified format.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Format a connection and write it to the given writer.
    pub fn write<W: Write>(&self, connection: &Connection, writer: &mut W) -> std::io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_writer(&mut *writer, connection)?;
                writeln!(writer)
            }
            OutputFormat::Pretty => {
                serde_json::to_writer_pretty(&mut *writer, connection)?;
                writeln!(writer)
            }
            OutputFormat::Summary => self.write_summary(connection, writer),
        }
    }

    fn write_summary<W: Write>(&self, connection: &Connection, writer: &mut W) -> std::io::Result<()> {
        writeln!(
            writer,
            "== {} ({} events, {} decode errors)",
            connection.address,
            connection.items.len(),
            connection.decode_errors()
        )?;
        for command in summarize(connection) {
            writeln!(writer, "{}", summary_line(&command))?;
        }
        writeln!(writer)
    }
}

fn summary_line(command: &CommandSummary) -> String {
    let elapsed = command
        .elapsed()
        .map(|us| format!("{:.3}ms", us as f64 / 1000.0))
        .unwrap_or_else(|| "-".to_string());
    let detail = command
        .detail
        .as_deref()
        .map(|d| d.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();

    format!(
        "{}  {:>10}  {:<12} {}  -> {}",
        format_timestamp(command.started.or(command.finished)),
        elapsed,
        command.command,
        detail,
        command.outcome
    )
}

/// RFC 3339 with microseconds, or `-` when unknown.
fn format_timestamp(timestamp_us: Option<i64>) -> String {
    timestamp_us
        .and_then(DateTime::from_timestamp_micros)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Micros, true))
        .unwrap_or_else(|| "-".to_string())
}
