//! mysqltrace CLI entry point.

use std::fs::File;
use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mysqltrace::cli::{Args, OutputFormatter};
use mysqltrace::trace_capture;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Set up logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| args.log_filter().into()),
        )
        .with_writer(io::stderr)
        .init();

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("Failed to create output file: {}", path.display())
        })?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let formatter = OutputFormatter::new(args.format);
    let options = args.trace_options();

    for path in &args.files {
        let trace = trace_capture(path, options.clone()).await?;
        for connection in &trace.connections {
            formatter
                .write(connection, &mut writer)
                .context("Failed to write output")?;
        }
        if trace.failed > 0 {
            info!(path = %path.display(), failed = trace.failed, "some connections were skipped");
        }
    }

    writer.flush().context("Failed to write output")?;
    Ok(())
}
