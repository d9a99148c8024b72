use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde_json::json;

use lil_logger::{
    init_tracing, logger, EnvConfig, ErrorFields, FileConfig, Level, LogFields, LogFormat,
    LoggedError, LoggerRegistry, Mode, StreamBackend,
};

#[derive(Parser, Debug)]
#[command(
    name = "lil-logger-demo",
    about = "Emit sample records through lil-logger",
    version
)]
struct Cli {
    /// Use the production layout and JSON output
    #[arg(long)]
    production: bool,

    /// Source directory name (overrides config)
    #[arg(long)]
    dev_dir: Option<String>,

    /// Build output directory name (overrides config)
    #[arg(long)]
    prod_dir: Option<String>,

    /// Console output format (default depends on mode)
    #[arg(long, value_enum)]
    format: Option<LogFormatChoice>,

    /// Minimum level to emit
    #[arg(long, value_enum)]
    level: Option<LevelChoice>,

    /// Also append JSON lines to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Directory holding lil-logger.toml (default: current directory)
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Print internal diagnostics (tracing) to stderr
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LevelChoice {
    Debug,
    Info,
    Error,
}

impl From<LevelChoice> for Level {
    fn from(choice: LevelChoice) -> Self {
        match choice {
            LevelChoice::Debug => Level::Debug,
            LevelChoice::Info => Level::Info,
            LevelChoice::Error => Level::Error,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.trace {
        init_tracing(Level::Debug, LogFormat::Pretty).context("Failed to install tracing")?;
    }

    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let config = build_config(&cli, &cwd)?;

    let format = cli.format.map(LogFormat::from).unwrap_or(config.format());
    let mut backend = StreamBackend::new(format)
        .with_level(config.level)
        .with_timestamp(config.timestamp);
    if let Some(path) = &config.file {
        backend = backend
            .with_file(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
    }

    let registry = LoggerRegistry::new(config.mode, cwd, config.dirs.clone(), Arc::new(backend));
    if lil_logger::init(registry).is_err() {
        anyhow::bail!("Logger registry was already initialized");
    }

    run_sample();
    Ok(())
}

fn build_config(cli: &Cli, cwd: &std::path::Path) -> Result<EnvConfig> {
    let mut config = EnvConfig::from_env();
    if cli.production {
        config = EnvConfig {
            mode: Mode::Production,
            timestamp: false,
            ..config
        };
    }

    let config_dir = cli.config_dir.as_deref().unwrap_or(cwd);
    if let Some(file_config) = FileConfig::load(config_dir)? {
        config = file_config.apply(config)?;
    }

    if let Some(dev_dir) = &cli.dev_dir {
        config.dirs.dev_dir = dev_dir.clone();
    }
    if let Some(prod_dir) = &cli.prod_dir {
        config.dirs.prod_dir = prod_dir.clone();
    }
    if let Some(level) = cli.level {
        config.level = level.into();
    }
    if let Some(path) = &cli.log_file {
        config.file = Some(path.clone());
    }

    Ok(config)
}

fn run_sample() {
    let log = logger!();

    log.info(
        LogFields::new("Activity done")
            .arg1(json!({ "user": "abc", "flag": true }))
            .arg2(60),
    );

    log.debug(
        LogFields::new("Activity done")
            .arg1(json!({ "user": "abc", "flag": true }))
            .arg2(60),
    );

    let mut error = LoggedError::new("Unhandled Error");
    error.set("statusCode", 400);

    log.error(
        ErrorFields::new(&mut error)
            .msg("testing error")
            .arg1(json!({ "email": "abc@xyz.com" })),
    );
}
