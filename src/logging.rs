use std::io::{self, Write};

use anyhow::{anyhow, Result};
use colored::*;
use indicatif::ProgressBar;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{self, Writer};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// Renders diagnostics with the same bracketed tags as the report. Debug
/// events also name the module they came from, e.g. `[?] whois: ...`.
pub struct TypoguardFormatter;

fn tag(level: Level) -> ColoredString {
    match level {
        Level::TRACE => "[ ]".dimmed(),
        Level::DEBUG => "[?]".blue(),
        Level::INFO => "[i]".cyan(),
        Level::WARN => "[*]".yellow().bold(),
        Level::ERROR => "[-]".red().bold(),
    }
}

// "typoguard::probe::whois" -> "whois"
fn origin(target: &str) -> &str {
    target.rsplit("::").next().unwrap_or(target)
}

impl<S, N> FormatEvent<S, N> for TypoguardFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> format::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();

        write!(writer, "{} ", tag(*meta.level()))?;
        if *meta.level() >= Level::DEBUG {
            write!(writer, "{}: ", origin(meta.target()).dimmed())?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Writes each log line to stderr between redraws of the run's progress bar.
#[derive(Clone)]
pub struct ProgressWriter {
    progress: ProgressBar,
}

impl ProgressWriter {
    pub fn new(progress: ProgressBar) -> Self {
        Self { progress }
    }
}

impl Write for ProgressWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.progress.suspend(|| io::stderr().write_all(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl<'a> MakeWriter<'a> for ProgressWriter {
    type Writer = ProgressWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn default_directive(debug: bool) -> &'static str {
    if debug {
        "typoguard=debug"
    } else {
        "typoguard=warn"
    }
}

/// Installs the global subscriber. `progress` is the bar the run will draw,
/// hidden until then.
pub fn init(debug: bool, progress: ProgressBar) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(default_directive(debug)))
        .with_writer(ProgressWriter::new(progress))
        .event_format(TypoguardFormatter)
        .try_init()
        .map_err(|err| anyhow!("failed to initialise logging: {err}"))
}
