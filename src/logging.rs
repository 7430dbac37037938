//! Leveled log output with a fixed line header
//!
//! The library itself only emits `tracing` events. Binaries that want the
//! traditional `<timestamp> <LEVEL> <file:line> : <message>` line layout can
//! install it with [`init`]:
//!
//! ```no_run
//! bgg_collection::logging::init("INFO");
//! tracing::info!("ready");
//! // 2024-06-01T12:00:00.123456789+00:00 INFO main.rs:2 : ready
//! ```

use chrono::{DateTime, Local, SecondsFormat, TimeZone};
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// Source location of a log event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Location<'a> {
    /// File name, without directories
    pub file: &'a str,
    /// Line number, if known
    pub line: Option<u32>,
}

/// Parse a level name; unknown names fall back to `INFO`
pub fn parse_level(name: &str) -> Level {
    match name.trim().to_ascii_uppercase().as_str() {
        "ERROR" => Level::ERROR,
        "WARN" | "WARNING" => Level::WARN,
        "DEBUG" => Level::DEBUG,
        "TRACE" => Level::TRACE,
        _ => Level::INFO,
    }
}

/// Build the header that precedes every log message
///
/// `show_line` adds the line number after the file name. A missing
/// location is rendered as `???`.
pub fn format_header<Tz>(
    timestamp: &DateTime<Tz>,
    level: Level,
    location: Option<Location<'_>>,
    show_line: bool,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let time = timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true);
    let place = match location {
        Some(Location {
            file,
            line: Some(line),
        }) if show_line => format!("{file}:{line}"),
        Some(Location { file, .. }) => file.to_string(),
        None => "???".to_string(),
    };
    format!("{time} {level} {place} : ")
}

/// Event formatter writing [`format_header`] followed by the event fields
#[derive(Clone, Copy, Debug)]
pub struct HeaderFormat {
    show_line: bool,
}

impl HeaderFormat {
    /// Formatter for a subscriber filtering at `threshold`
    ///
    /// Line numbers are shown at `INFO` and more verbose thresholds.
    pub fn new(threshold: Level) -> Self {
        Self {
            show_line: !matches!(threshold, Level::ERROR | Level::WARN),
        }
    }
}

impl<S, N> FormatEvent<S, N> for HeaderFormat
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
        let meta = event.metadata();
        let location = meta.file().map(|file| Location {
            file: short_file(file),
            line: meta.line(),
        });
        write!(
            writer,
            "{}",
            format_header(&Local::now(), *meta.level(), location, self.show_line)
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

fn short_file(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Install a global stdout subscriber filtering at `level`
///
/// Returns `false` if a global subscriber was already installed.
pub fn init(level: &str) -> bool {
    let level = parse_level(level);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .event_format(HeaderFormat::new(level))
        .with_writer(std::io::stdout)
        .try_init()
        .is_ok()
}
