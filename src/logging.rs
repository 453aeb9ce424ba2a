//! Logging capability used by the login flow.
//!
//! The flow only needs a sink with `info`/`warn`/`error` channels, expressed
//! as the [`Logger`] trait. Callers choose the implementation: the structured
//! [`FlowLogger`] with optional external callbacks, [`LogCrateLogger`] which
//! forwards to the `log` facade, or [`NoopLogger`].

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category attached to every record emitted by the login flow.
pub const LOGIN_CATEGORY: &str = "login";

/// Message sink consumed by the login flow.
pub trait Logger: Send + Sync {
    fn info(&self, message: &str);

    fn warn(&self, message: &str);

    fn error(&self, message: &str);

    /// Diagnostics that are not part of the user-visible narration.
    fn debug(&self, _message: &str) {}
}

impl<L: Logger + ?Sized> Logger for Arc<L> {
    fn info(&self, message: &str) {
        (**self).info(message);
    }

    fn warn(&self, message: &str) {
        (**self).warn(message);
    }

    fn error(&self, message: &str) {
        (**self).error(message);
    }

    fn debug(&self, message: &str) {
        (**self).debug(message);
    }
}

/// Logger that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn info(&self, _message: &str) {}

    fn warn(&self, _message: &str) {}

    fn error(&self, _message: &str) {}
}

/// Logger that forwards to the `log` facade under the `totp_login` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCrateLogger;

impl Logger for LogCrateLogger {
    fn info(&self, message: &str) {
        log::info!(target: "totp_login", "{message}");
    }

    fn warn(&self, message: &str) {
        log::warn!(target: "totp_login", "{message}");
    }

    fn error(&self, message: &str) {
        log::error!(target: "totp_login", "{message}");
    }

    fn debug(&self, message: &str) {
        log::debug!(target: "totp_login", "{message}");
    }
}

/// Verbosity level for [`FlowLogger`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Minimal,
    #[default]
    Medium,
    Detailed,
}

impl Verbosity {
    fn as_u8(self) -> u8 {
        match self {
            Verbosity::Minimal => 0,
            Verbosity::Medium => 2,
            Verbosity::Detailed => 3,
        }
    }
}

/// Log severity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

/// Convenience alias for external logging callbacks.
pub type LogCallback = Arc<dyn Fn(&LogRecord) + Send + Sync + 'static>;

/// Structured log entry shared with external callbacks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub level: LogLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl LogRecord {
    pub fn new(message: impl Into<String>, level: LogLevel, category: Option<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
            level,
            category,
        }
    }
}

/// Default console printer used when no external callback is configured.
pub fn default_log_handler(record: &LogRecord) {
    let timestamp = record
        .timestamp
        .to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    match &record.category {
        Some(category) => println!(
            "[{}] {:<5} [{}] {}",
            timestamp,
            record.level.label(),
            category,
            record.message
        ),
        None => println!(
            "[{}] {:<5} {}",
            timestamp,
            record.level.label(),
            record.message
        ),
    }
}

/// Structured logger with verbosity filtering and an optional external sink.
pub struct FlowLogger {
    verbose: Verbosity,
    category: Option<String>,
    external_logger: Option<LogCallback>,
    default_handler: LogCallback,
}

impl fmt::Debug for FlowLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowLogger")
            .field("verbosity", &self.verbose)
            .field("category", &self.category)
            .field("external_logger", &self.external_logger.is_some())
            .finish()
    }
}

impl Default for FlowLogger {
    fn default() -> Self {
        Self::new(Verbosity::default())
    }
}

impl FlowLogger {
    pub fn new(verbose: Verbosity) -> Self {
        Self {
            verbose,
            category: Some(LOGIN_CATEGORY.to_string()),
            external_logger: None,
            default_handler: Arc::new(default_log_handler),
        }
    }

    pub fn with_callback(verbose: Verbosity, callback: LogCallback) -> Self {
        let mut logger = Self::new(verbose);
        logger.external_logger = Some(callback);
        logger
    }

    pub fn set_verbose(&mut self, verbose: Verbosity) {
        self.verbose = verbose;
    }

    pub fn set_category(&mut self, category: Option<&str>) {
        self.category = category.map(str::to_string);
    }

    pub fn should_log(&self, level: LogLevel) -> bool {
        level == LogLevel::Error || level.as_u8() <= self.verbose.as_u8()
    }

    pub fn log(&self, message: &str, level: LogLevel) {
        if !self.should_log(level) {
            return;
        }

        let record = LogRecord::new(message, level, self.category.clone());

        if let Some(callback) = &self.external_logger {
            callback(&record);
        } else {
            (self.default_handler)(&record);
        }
    }
}

impl Logger for FlowLogger {
    fn info(&self, message: &str) {
        self.log(message, LogLevel::Info);
    }

    fn warn(&self, message: &str) {
        self.log(message, LogLevel::Warn);
    }

    fn error(&self, message: &str) {
        self.log(message, LogLevel::Error);
    }

    fn debug(&self, message: &str) {
        self.log(message, LogLevel::Debug);
    }
}
