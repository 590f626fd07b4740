//! mysqltrace - Reconstruct MySQL conversations from packet captures.
//!
//! This library wires the capture reader, TCP reassembly and session
//! correlation from `mysqltrace-core` into a per-file pipeline and provides
//! the command-line front end.
//!
//! # Example
//!
//! ```no_run
//! use mysqltrace::trace::{trace_capture, TraceOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let trace = trace_capture("capture.pcap", TraceOptions::default()).await?;
//!     for connection in &trace.connections {
//!         println!("{}: {} events", connection.address, connection.items.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod trace;

pub use trace::{trace_capture, CaptureTrace, TraceOptions};
