use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use colored::{ColoredString, Colorize};
use serde_json::Value;

use crate::backend::{Backend, Level, LogFormat};
use crate::config::EnvConfig;
use crate::fields::{Fields, LoggedError};

/// Writes records to a console stream and optionally to a file.
///
/// The console gets the configured [`LogFormat`]; the file, when present,
/// always gets JSON lines.
pub struct StreamBackend {
    format: LogFormat,
    min_level: Level,
    timestamp: bool,
    pid: u32,
    hostname: String,
    console: Mutex<Box<dyn Write + Send>>,
    file_writer: Option<Mutex<File>>,
}

impl StreamBackend {
    /// A backend writing to stderr.
    pub fn new(format: LogFormat) -> Self {
        Self::with_writer(format, io::stderr())
    }

    pub fn with_writer(format: LogFormat, writer: impl Write + Send + 'static) -> Self {
        Self {
            format,
            min_level: Level::Info,
            timestamp: true,
            pid: std::process::id(),
            hostname: sysinfo::System::host_name().unwrap_or_else(|| "unknown".to_string()),
            console: Mutex::new(Box::new(writer)),
            file_writer: None,
        }
    }

    /// Build the backend described by the environment configuration.
    pub fn from_config(config: &EnvConfig) -> io::Result<Self> {
        let backend = Self::new(config.format())
            .with_level(config.level)
            .with_timestamp(config.timestamp);
        match &config.file {
            Some(path) => backend.with_file(path),
            None => Ok(backend),
        }
    }

    /// Like [`from_config`](Self::from_config), but a log file that cannot
    /// be opened only costs the file copy; console output still works.
    pub fn from_config_or_console(config: &EnvConfig) -> Self {
        Self::from_config(config).unwrap_or_else(|e| {
            tracing::warn!(
                error = %e,
                file = ?config.file,
                "Could not open log file, logging to console only"
            );
            Self::new(config.format())
                .with_level(config.level)
                .with_timestamp(config.timestamp)
        })
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_timestamp(mut self, timestamp: bool) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Append a JSON copy of every emitted record to `log_path`. Missing
    /// parent directories are created.
    pub fn with_file(mut self, log_path: &Path) -> io::Result<Self> {
        match log_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir)?,
            _ => {}
        }
        let file = File::options().create(true).append(true).open(log_path)?;
        self.file_writer = Some(Mutex::new(file));
        Ok(self)
    }

    pub fn enabled(&self, level: Level) -> bool {
        level >= self.min_level
    }

    fn emit(&self, level: Level, msg: &str, fields: &Fields, error: Option<&LoggedError>) {
        if !self.enabled(level) {
            return;
        }

        let record = self.json_record(level, msg, fields, error);

        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let _ = writeln!(file, "{}", record);
            }
        }

        let line = match self.format {
            LogFormat::Json => record.to_string(),
            LogFormat::Pretty => self.pretty(level, msg, fields, error),
        };
        if let Ok(mut console) = self.console.lock() {
            let _ = writeln!(console, "{}", line);
            let _ = console.flush();
        }
    }

    fn json_record(
        &self,
        level: Level,
        msg: &str,
        fields: &Fields,
        error: Option<&LoggedError>,
    ) -> Value {
        let mut record = Fields::new();

        if let Some(error) = error {
            if let Ok(Value::Object(map)) = serde_json::to_value(error) {
                record.extend(map);
            }
        }
        record.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));

        record.insert("level".to_string(), Value::from(level.as_number()));
        if self.timestamp {
            record.insert(
                "time".to_string(),
                Value::from(chrono::Utc::now().timestamp_millis()),
            );
        }
        record.insert("msg".to_string(), Value::from(msg));
        record.insert("pid".to_string(), Value::from(self.pid));
        record.insert("hostname".to_string(), Value::from(self.hostname.clone()));
        record.insert("v".to_string(), Value::from(1));

        Value::Object(record)
    }

    fn pretty(&self, level: Level, msg: &str, fields: &Fields, error: Option<&LoggedError>) -> String {
        let mut out = String::new();

        if self.timestamp {
            let timestamp = chrono::Utc::now().format("%H:%M:%S%.3f");
            out.push_str(&format!("[{}] ", timestamp));
        }
        out.push_str(&format!(
            "{} ({} on {}): {}",
            Self::styled_level(level),
            self.pid,
            self.hostname,
            msg.cyan()
        ));

        for (key, value) in fields {
            out.push_str(&format!("\n    {}: {}", key, Self::indent(&pretty_json(value))));
        }

        if let Some(error) = error {
            out.push_str(&format!("\n    {}: {}", "type", error.kind));
            out.push_str(&format!(
                "\n    {}: {}",
                "stack",
                Self::indent(error.stack.trim_end()).dimmed()
            ));
            for (key, value) in &error.extra {
                out.push_str(&format!("\n    {}: {}", key, Self::indent(&pretty_json(value))));
            }
        }

        out
    }

    fn styled_level(level: Level) -> ColoredString {
        match level {
            Level::Debug => level.as_str().blue(),
            Level::Info => level.as_str().green(),
            Level::Error => level.as_str().red().bold(),
        }
    }

    /// Indent continuation lines so multi-line values stay under their key
    fn indent(s: &str) -> String {
        s.replace('\n', "\n      ")
    }
}

impl Backend for StreamBackend {
    fn log(&self, level: Level, fields: &Fields, msg: &str) {
        self.emit(level, msg, fields, None);
    }

    fn error(&self, error: &LoggedError, msg: &str) {
        self.emit(Level::Error, msg, &Fields::new(), Some(error));
    }
}

fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
