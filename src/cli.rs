//! Command-line surface for the `dagrun` binary.
//!
//! Deliberately thin per `SPEC_FULL.md` §2.1: point the binary at a config
//! file and optionally override the logging verbosity for this invocation.
//! Everything else (sample-config generation, elaborate subcommands) is out
//! of scope for the core this crate ships.

use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use tracing::level_filters::LevelFilter;

/// Wrapper around `LevelFilter` so clap can parse log levels from either
/// string names ("info", "debug", etc.) or numeric shorthands (0-5).
#[derive(Clone, Copy, Debug)]
pub struct LogLevelArg(LevelFilter);

impl LogLevelArg {
    /// The wrapped filter, for building an `EnvFilter`.
    pub fn filter(&self) -> LevelFilter {
        self.0
    }
}

impl FromStr for LogLevelArg {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("log level cannot be empty".into());
        }

        if let Ok(number) = trimmed.parse::<u8>() {
            let level = match number {
                0 => LevelFilter::OFF,
                1 => LevelFilter::ERROR,
                2 => LevelFilter::WARN,
                3 => LevelFilter::INFO,
                4 => LevelFilter::DEBUG,
                5 => LevelFilter::TRACE,
                _ => {
                    return Err(format!(
                        "unsupported log level number '{number}' (expected 0-5)"
                    ));
                }
            };
            return Ok(LogLevelArg(level));
        }

        let lowercase = trimmed.to_ascii_lowercase();
        let level = match lowercase.as_str() {
            "off" => Some(LevelFilter::OFF),
            "error" | "err" => Some(LevelFilter::ERROR),
            "warn" | "warning" => Some(LevelFilter::WARN),
            "info" | "information" => Some(LevelFilter::INFO),
            "debug" => Some(LevelFilter::DEBUG),
            "trace" => Some(LevelFilter::TRACE),
            _ => None,
        }
        .ok_or_else(|| format!("invalid log level '{trimmed}'"))?;

        Ok(LogLevelArg(level))
    }
}

/// Command-line interface for `dagrun`.
#[derive(Parser)]
#[command(name = "dagrun", version, author)]
#[command(about = "Runs a graph of dependent shell tasks to readiness", long_about = None)]
pub struct Cli {
    /// Path to the task configuration file.
    #[arg(short, long, default_value = "dagrun.toml")]
    pub config: PathBuf,

    /// Override the logging verbosity for this invocation only.
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<LogLevelArg>,
}

/// Parses command-line arguments and returns a `Cli` struct.
pub fn parse_args() -> Cli {
    Cli::parse()
}
