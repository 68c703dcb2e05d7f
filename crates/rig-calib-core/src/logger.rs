//! Stderr logger for calibration runs.
//!
//! Records from the `rig_calib*` crates pass at the configured level; every
//! other target (solver dependencies, host crates) is capped at `Warn`.
//! Lines read `[elapsed LEVEL target] message`.

use std::io::Write;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable read by [`init_from_env`].
pub const LOG_ENV: &str = "RIG_CALIB_LOG";

const OWN_TARGET: &str = "rig_calib";

struct RigLogger {
    level: LevelFilter,
    started: Instant,
}

impl RigLogger {
    fn passes(&self, target: &str, level: Level) -> bool {
        let limit = if target.starts_with(OWN_TARGET) {
            self.level
        } else {
            self.level.min(LevelFilter::Warn)
        };
        level <= limit
    }
}

impl Log for RigLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.passes(metadata.target(), metadata.level())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(
            self.started.elapsed().as_secs_f64(),
            record.level(),
            record.target(),
            &record.args().to_string(),
        );
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn format_line(elapsed: f64, level: Level, target: &str, message: &str) -> String {
    let target = target.strip_prefix("rig_calib_").unwrap_or(target);
    format!("[{elapsed:8.3}s {level:>5} {target}] {message}")
}

static LOGGER: OnceLock<RigLogger> = OnceLock::new();

/// Install the stderr logger at `level`.
///
/// Only the first call installs anything; later calls return `Ok(())`.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = LOGGER.get_or_init(|| RigLogger {
        level,
        started: Instant::now(),
    });
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

/// [`init_with_level`] with the level taken from `RIG_CALIB_LOG`
/// (`error` .. `trace`, `off`), falling back to `default`.
pub fn init_from_env(default: LevelFilter) -> Result<(), log::SetLoggerError> {
    let level = std::env::var(LOG_ENV)
        .ok()
        .and_then(|v| LevelFilter::from_str(v.trim()).ok())
        .unwrap_or(default);
    init_with_level(level)
}

/// Install a `tracing` subscriber. `RUST_LOG` wins; otherwise the
/// calibration crates log at `info` and everything else at `warn`.
/// Span close events carry per-submit and per-solve timings.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("warn,rig_calib=info,rig_calib_core=info,rig_calib_stereo=info")
    });
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logger(level: LevelFilter) -> RigLogger {
        RigLogger {
            level,
            started: Instant::now(),
        }
    }

    #[test]
    fn foreign_targets_are_capped_at_warn() {
        let l = logger(LevelFilter::Debug);
        assert!(l.passes("rig_calib::session::pipeline", Level::Debug));
        assert!(l.passes("rig_calib_stereo::solver", Level::Debug));
        assert!(!l.passes("rig_calib_stereo::solver", Level::Trace));
        assert!(!l.passes("levenberg_marquardt", Level::Info));
        assert!(l.passes("levenberg_marquardt", Level::Warn));

        let quiet = logger(LevelFilter::Error);
        assert!(!quiet.passes("some_host", Level::Warn));
        assert!(!quiet.passes("rig_calib", Level::Warn));
    }

    #[test]
    fn line_format_shortens_own_targets() {
        assert_eq!(
            format_line(1.5, Level::Info, "rig_calib_stereo::solver", "done"),
            "[   1.500s  INFO stereo::solver] done"
        );
        assert_eq!(
            format_line(0.0, Level::Warn, "host", "x"),
            "[   0.000s  WARN host] x"
        );
    }

    #[test]
    fn repeated_init_is_a_noop() {
        init_with_level(LevelFilter::Debug).expect("first init");
        init_from_env(LevelFilter::Trace).expect("second init is a no-op");
        log::debug!("logger installed");
    }
}
