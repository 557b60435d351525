//! Console and log-file output
//!
//! Both sinks share one line format: `2026-01-31 14:05:09 [INFO] message`.
//! The console only ever shows INFO and above; the log file additionally
//! receives DEBUG output (git command output included) when verbose logging
//! is requested.

use anyhow::{Context, Result};
use chrono::Local;
use std::fmt;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::{Event, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt as tracing_fmt, prelude::*, EnvFilter};

/// Sortable timestamp, bracketed level, message
#[derive(Debug, Clone, Copy, Default)]
pub struct LogLine;

impl<S, N> FormatEvent<S, N> for LogLine
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(
            writer,
            "{} [{}] ",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            event.metadata().level()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Install the global subscriber writing to stdout and `log_file`
pub fn init_logging(log_file: &Path, verbose: bool) -> Result<()> {
    if let Some(parent) = log_file.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {:?}", parent))?;
        }
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Failed to open log file: {:?}", log_file))?;

    let file_level = if verbose { "debug" } else { "info" };
    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(file_level));

    let console = tracing_fmt::layer()
        .event_format(LogLine)
        .with_writer(std::io::stdout)
        .with_filter(LevelFilter::INFO);

    let persistent = tracing_fmt::layer()
        .event_format(LogLine)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .with_filter(file_filter);

    tracing_subscriber::registry()
        .with(console)
        .with(persistent)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}
