//! Logging for the survey server
//!
//! The console shows what the operator asked for. A second sink writes every
//! event of the current run to `auralis-last-run.log`, which is what you want
//! when a participant reports a clip that would not play.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Name of the per-run log file inside the logs directory.
pub const LOG_FILE_NAME: &str = "auralis-last-run.log";

/// Install the global subscriber and return the path of the run log.
///
/// `RUST_LOG`, when set, replaces the console filter. The run log always
/// records everything down to TRACE for the auralis crates and DEBUG for the
/// HTTP stack, and is truncated at start-up.
///
/// # Errors
///
/// - `std::io::Error` - The logs directory or the run log cannot be created
pub fn init_tracing(console_level: Level, logs_dir: Option<&Path>) -> Result<PathBuf, std::io::Error> {
    let logs_dir = logs_dir.unwrap_or(Path::new("logs"));
    std::fs::create_dir_all(logs_dir)?;

    let run_log = logs_dir.join(LOG_FILE_NAME);
    let writer = File::create(&run_log)?;

    let console = fmt::layer()
        .with_target(false)
        .compact()
        .with_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(console_directives(console_level))),
        );

    let file = fmt::layer()
        .with_ansi(false)
        .with_writer(writer)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(EnvFilter::new("debug,auralis_core=trace,auralis_web=trace"));

    tracing_subscriber::registry().with(console).with(file).init();

    tracing::info!(
        "Logging at {} to console, full run log in {}",
        console_level,
        run_log.display()
    );
    Ok(run_log)
}

/// Console filter for `level`; per-request HTTP spans only appear at DEBUG
/// and below.
fn console_directives(level: Level) -> String {
    let http = if level >= Level::DEBUG { level } else { Level::WARN };
    format!("{level},tower_http={http},hyper=warn")
}

/// Console verbosity selectable with `--log-level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl CliLogLevel {
    const ALL: [CliLogLevel; 5] = [
        CliLogLevel::Error,
        CliLogLevel::Warn,
        CliLogLevel::Info,
        CliLogLevel::Debug,
        CliLogLevel::Trace,
    ];

    /// Matching `tracing` level.
    ///
    /// ```
    /// use auralis_core::tracing_setup::CliLogLevel;
    ///
    /// assert_eq!(CliLogLevel::Warn.as_tracing_level(), tracing::Level::WARN);
    /// ```
    pub fn as_tracing_level(self) -> Level {
        match self {
            CliLogLevel::Error => Level::ERROR,
            CliLogLevel::Warn => Level::WARN,
            CliLogLevel::Info => Level::INFO,
            CliLogLevel::Debug => Level::DEBUG,
            CliLogLevel::Trace => Level::TRACE,
        }
    }

    fn name(self) -> &'static str {
        match self {
            CliLogLevel::Error => "error",
            CliLogLevel::Warn => "warn",
            CliLogLevel::Info => "info",
            CliLogLevel::Debug => "debug",
            CliLogLevel::Trace => "trace",
        }
    }
}

impl std::str::FromStr for CliLogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Invalid log level: {s}"))
    }
}

impl std::fmt::Display for CliLogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
