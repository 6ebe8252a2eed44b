//! Logging setup shared by the `hexscan` binary and tests.
//!
//! The scanner crates log at the requested level; everything else (image
//! decoders, clap) is held at `warn`. Stderr lines look like
//! `[  1.234s  INFO localize] message`, tagged with the last path segment of
//! the record's target.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, fmt::format::FmtSpan, util::SubscriberInitExt, EnvFilter};

/// Target prefix shared by every crate of the workspace.
const OWN_TARGET: &str = "hexscan";

/// `-v` count to level: warnings only by default, then info, debug, trace.
pub fn level_for_verbosity(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// `EnvFilter` directives used when `RUST_LOG` is unset.
pub fn default_directives(level: LevelFilter) -> String {
    let own = level.to_string().to_lowercase();
    let rest = level.min(LevelFilter::Warn).to_string().to_lowercase();
    format!("{OWN_TARGET}={own},{rest}")
}

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

impl StderrLogger {
    fn max_for(&self, target: &str) -> LevelFilter {
        if target.starts_with(OWN_TARGET) {
            self.level
        } else {
            self.level.min(LevelFilter::Warn)
        }
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_for(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = record.target().rsplit("::").next().unwrap_or("");
        let tag = tag.strip_prefix("hexscan_").unwrap_or(tag);
        let mut err = std::io::stderr().lock();
        let _ = writeln!(
            err,
            "[{:7.3}s {:>5} {}] {}",
            self.started.elapsed().as_secs_f64(),
            record.level(),
            tag,
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger. Later calls keep the first level.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = LOGGER.get_or_init(|| StderrLogger {
        level,
        started: Instant::now(),
    });
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

/// Install a `tracing` fmt subscriber. `RUST_LOG` wins over `level`, which
/// otherwise goes through [`default_directives`]. Span close events carry
/// the time spent in instrumented stages.
#[cfg(feature = "tracing")]
pub fn init_tracing(level: LevelFilter, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}
