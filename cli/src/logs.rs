//! Logging configuration
//!
//! Console output goes through a compact stdout layer; the full run is also
//! captured in a timestamped log file under the log directory.

use std::path::PathBuf;

use tracing::Level;
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::errors::DeployError;

/// Log level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_level(&self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    pub fn to_filter_string(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

impl serde::Serialize for LogLevel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_filter_string())
    }
}

impl<'de> serde::Deserialize<'de> for LogLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Logging options
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Log level
    pub log_level: LogLevel,

    /// Write logs to stdout
    pub stdout: bool,

    /// Log directory for file output
    pub log_dir: PathBuf,

    /// Write a per-run log file into `log_dir`
    pub log_file: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            stdout: true,
            log_dir: PathBuf::from("logs"),
            log_file: true,
        }
    }
}

/// Name of the per-run log file, e.g. `deploy-20260807-153000.log`
pub fn run_log_name(now: chrono::DateTime<chrono::Local>) -> String {
    format!("deploy-{}.log", now.format("%Y%m%d-%H%M%S"))
}

/// Initialize logging
///
/// Returns the worker guard for the file writer; it must be kept alive for
/// the duration of the process or buffered log lines are lost.
pub fn init_logging(
    options: LogOptions,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, DeployError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.log_level.to_filter_string()));

    let file_writer = if options.log_file {
        std::fs::create_dir_all(&options.log_dir)?;
        let file = std::fs::File::create(
            options.log_dir.join(run_log_name(chrono::Local::now())),
        )?;
        Some(tracing_appender::non_blocking(file))
    } else {
        None
    };

    let subscriber = tracing_subscriber::registry().with(filter);

    let stdout_layer = options
        .stdout
        .then(|| fmt::layer().with_target(false).compact());
    let file_layer = file_writer.as_ref().map(|(writer, _)| {
        fmt::layer()
            .with_writer(writer.clone())
            .with_ansi(false)
    });

    subscriber
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| DeployError::ConfigError(e.to_string()))?;

    Ok(file_writer.map(|(_, guard)| guard))
}
