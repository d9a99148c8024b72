use serde_json::Value;

use crate::fields::{Fields, LoggedError};

/// Severity of a record. Numeric values follow the common JSON logging
/// convention (`debug` 20, `info` 30, `error` 50).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Debug,
    Info,
    Error,
}

impl Level {
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Error => "ERROR",
        }
    }

    pub const fn as_number(self) -> u8 {
        match self {
            Level::Debug => 20,
            Level::Info => 30,
            Level::Error => 50,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "error" => Ok(Level::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// The structured logger that records are handed to.
///
/// Implementations own serialization, filtering and emission. Emission is
/// fire-and-forget: failures are the backend's business and never reach the
/// caller.
///
/// [`Logger`](crate::Logger) calls the `*_in` methods, which also carry the
/// logger's category. Their defaults drop it and fall back to the plain
/// methods, since the message text already names the category.
pub trait Backend: Send + Sync {
    /// Emit a non-error record.
    fn log(&self, level: Level, fields: &Fields, msg: &str);

    /// Emit an error record. The error's type tag, stack and extra
    /// properties are part of the record.
    fn error(&self, error: &LoggedError, msg: &str);

    fn info(&self, fields: &Fields, msg: &str) {
        self.log(Level::Info, fields, msg);
    }

    fn debug(&self, fields: &Fields, msg: &str) {
        self.log(Level::Debug, fields, msg);
    }

    fn log_in(&self, _category: &str, level: Level, fields: &Fields, msg: &str) {
        match level {
            Level::Debug => self.debug(fields, msg),
            Level::Info => self.info(fields, msg),
            Level::Error => self.log(level, fields, msg),
        }
    }

    fn error_in(&self, _category: &str, error: &LoggedError, msg: &str) {
        self.error(error, msg);
    }
}

/// Forwards records into `tracing`, for applications that already run a
/// subscriber. Fields are rendered as a single JSON-valued `fields` entry;
/// records coming from a [`Logger`](crate::Logger) also get a `category`
/// field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingBackend;

impl TracingBackend {
    fn emit(category: Option<&str>, level: Level, fields: &Fields, msg: &str) {
        let fields = Value::Object(fields.clone());
        match level {
            Level::Debug => {
                tracing::debug!(target: "lil_logger", category, fields = %fields, "{}", msg)
            }
            Level::Info => {
                tracing::info!(target: "lil_logger", category, fields = %fields, "{}", msg)
            }
            Level::Error => {
                tracing::error!(target: "lil_logger", category, fields = %fields, "{}", msg)
            }
        }
    }

    fn emit_error(category: Option<&str>, error: &LoggedError, msg: &str) {
        let extra = Value::Object(error.extra.clone());
        tracing::error!(
            target: "lil_logger",
            category,
            kind = %error.kind,
            stack = %error.stack,
            extra = %extra,
            "{}",
            msg
        );
    }
}

impl Backend for TracingBackend {
    fn log(&self, level: Level, fields: &Fields, msg: &str) {
        Self::emit(None, level, fields, msg);
    }

    fn error(&self, error: &LoggedError, msg: &str) {
        Self::emit_error(None, error, msg);
    }

    fn log_in(&self, category: &str, level: Level, fields: &Fields, msg: &str) {
        Self::emit(Some(category), level, fields, msg);
    }

    fn error_in(&self, category: &str, error: &LoggedError, msg: &str) {
        Self::emit_error(Some(category), error, msg);
    }
}
