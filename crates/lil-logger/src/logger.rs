use std::fmt;
use std::sync::Arc;

use crate::backend::{Backend, Level};
use crate::fields::{ErrorFields, LogFields};

/// A logger bound to one category.
///
/// Loggers hold no mutable state; every call formats a message and hands
/// it straight to the backend, so a single instance can be shared freely
/// between threads.
pub struct Logger {
    category: String,
    backend: Arc<dyn Backend>,
}

impl Logger {
    pub fn new(category: impl Into<String>, backend: Arc<dyn Backend>) -> Self {
        Self {
            category: category.into(),
            backend,
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Build `"<LEVEL> - <category> - <msg>"`.
    pub fn format_message(&self, level: Level, msg: &str) -> String {
        format!("{} - {} - {}", level.as_str(), self.category, msg)
    }

    /// ```rust,ignore
    /// log.info(LogFields::new("Activity done").arg1(json!({"user": "abc", "flag": true})).arg2(60));
    /// ```
    pub fn info(&self, fields: LogFields) {
        let msg = self.format_message(Level::Info, &fields.msg);
        self.backend
            .log_in(&self.category, Level::Info, &fields.to_fields(), &msg);
    }

    pub fn debug(&self, fields: LogFields) {
        let msg = self.format_message(Level::Debug, &fields.msg);
        self.backend
            .log_in(&self.category, Level::Debug, &fields.to_fields(), &msg);
    }

    /// Log an error.
    ///
    /// Each auxiliary value present in `fields` is attached to the error as
    /// an extra property (`arg1`..`arg4`) before it is handed to the backend.
    /// The caller's error is modified in place and keeps those properties
    /// after the call.
    ///
    /// # Panics
    ///
    /// Panics if `fields.error` is `None`. Logging an error without one is a
    /// programming mistake at the call site.
    pub fn error(&self, fields: ErrorFields<'_>) {
        let ErrorFields {
            error,
            msg,
            arg1,
            arg2,
            arg3,
            arg4,
        } = fields;

        let Some(error) = error else {
            panic!(
                "Logger::error called without an error value (category {:?})",
                self.category
            );
        };

        let args = [("arg1", arg1), ("arg2", arg2), ("arg3", arg3), ("arg4", arg4)];
        for (key, value) in args {
            if let Some(value) = value {
                error.extra.insert(key.to_string(), value);
            }
        }

        let msg = self.format_message(Level::Error, msg.as_deref().unwrap_or(""));
        self.backend.error_in(&self.category, error, &msg);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}
