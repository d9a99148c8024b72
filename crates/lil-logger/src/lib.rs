//! # lil-logger
//!
//! Per-file loggers over a structured logging backend.
//!
//! Every logger is keyed by a *category*: the caller's source file path
//! relative to the project's source root (`<cwd>/src` in development,
//! `<cwd>/dist/src` in production). Asking twice for the same category
//! returns the same instance.
//!
//! ## Key Types
//!
//! - [`Logger`] - `info`/`debug`/`error` for one category
//! - [`LoggerRegistry`] - Category to logger cache
//! - [`Backend`] - Where records go ([`StreamBackend`], [`TracingBackend`])
//! - [`LogFields`], [`ErrorFields`], [`LoggedError`] - Call arguments
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lil_logger::{logger, ErrorFields, LogFields, LoggedError};
//! use serde_json::json;
//!
//! lil_logger::set_dirs("src", "dist");
//! let log = logger!();
//!
//! log.info(LogFields::new("Activity done").arg1(json!({"user": "abc"})).arg2(60));
//!
//! let mut error = LoggedError::new("Unhandled Error");
//! error.set("statusCode", 400);
//! log.error(ErrorFields::new(&mut error).msg("testing error"));
//! ```
//!
//! ## Environment
//!
//! - `LIL_LOGGER_ENV` (or `APP_ENV`) - `production` selects production mode
//! - `LIL_LOGGER_TIMESTAMP` - Force timestamps on or off
//! - `LIL_LOGGER_LEVEL` - `debug`, `info` (default) or `error`
//! - `LIL_LOGGER_FILE` - Also append JSON lines to this file

mod backend;
pub mod category;
mod config;
mod fields;
mod logger;
mod registry;
mod stream;

pub use backend::{Backend, Level, LogFormat, TracingBackend};
pub use config::{ConfigError, DirConfig, EnvConfig, FileConfig, Mode, CONFIG_FILE_NAME};
pub use fields::{ErrorFields, Fields, LogFields, LoggedError};
pub use logger::Logger;
pub use registry::LoggerRegistry;
pub use stream::StreamBackend;

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static REGISTRY: OnceLock<LoggerRegistry> = OnceLock::new();

/// Install `registry` as the process-wide registry.
///
/// Returns the registry back if one was already installed or created by an
/// earlier lookup.
pub fn init(registry: LoggerRegistry) -> Result<(), LoggerRegistry> {
    REGISTRY.set(registry)
}

/// The process-wide registry, built from the environment on first use.
pub fn registry() -> &'static LoggerRegistry {
    REGISTRY.get_or_init(default_registry)
}

/// Logger for the source file at `file_path`.
pub fn get_logger(file_path: impl AsRef<Path>) -> Arc<Logger> {
    registry().get_logger(file_path)
}

/// Logger for a `file://` module URL.
pub fn get_logger_from_module_url(module_url: &str) -> Arc<Logger> {
    registry().get_logger_from_module_url(module_url)
}

/// Set the source and build-output directory names for loggers created
/// from now on. Intended to be called once at startup.
pub fn set_dirs(dev_dir: impl Into<String>, prod_dir: impl Into<String>) {
    registry().set_dirs(dev_dir, prod_dir);
}

/// Path of a calling source file; used by [`logger!`].
#[doc(hidden)]
pub fn source_file_path(manifest_dir: &str, file: &str) -> PathBuf {
    category::source_file_path(Path::new(manifest_dir), Path::new(file))
}

/// Logger for the source file this macro is expanded in.
#[macro_export]
macro_rules! logger {
    () => {
        $crate::get_logger($crate::source_file_path(
            env!("CARGO_MANIFEST_DIR"),
            file!(),
        ))
    };
}

fn default_registry() -> LoggerRegistry {
    let mut config = EnvConfig::from_env();
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    match FileConfig::load(&cwd) {
        Ok(Some(file_config)) => match file_config.apply(config.clone()) {
            Ok(applied) => config = applied,
            Err(e) => tracing::warn!(error = %e, "Ignoring logger config file"),
        },
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Ignoring logger config file"),
    }

    let backend = StreamBackend::from_config_or_console(&config);

    tracing::debug!(mode = ?config.mode, cwd = %cwd.display(), "Logger registry initialized");
    LoggerRegistry::new(config.mode, cwd, config.dirs, Arc::new(backend))
}

/// Print this crate's own diagnostics (logger creation, directory changes,
/// ignored settings) to stderr at `level` and above.
///
/// `RUST_LOG`, when set, replaces the `lil_logger=<level>` directive. Fails
/// if the process already has a global subscriber.
pub fn init_tracing(level: Level, format: LogFormat) -> Result<(), TryInitError> {
    let directive = format!("lil_logger={}", level.as_str().to_lowercase());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    let layer = fmt::layer().with_writer(std::io::stderr);

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(layer.json().flatten_event(true))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(layer.compact())
            .try_init(),
    }
}
