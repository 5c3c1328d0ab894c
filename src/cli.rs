// @module: Command line plumbing shared by mp4concat and srtconcat

use anyhow::{anyhow, Result};
use clap::ValueEnum;
use log::LevelFilter;
use std::path::{Path, PathBuf};

use crate::app_config::{Config, LogLevel};
use crate::file_utils::{InputOrder, InputSource};
use crate::logging;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

/// Build the input source from `--input` / `--input-dir` and pair it with `--output`.
///
/// Exactly one of the input flags must be given, together with an output path.
pub fn input_and_output(input: Option<Vec<String>>, input_dir: Option<PathBuf>, output: Option<PathBuf>) -> Result<(InputSource, PathBuf)> {
    let source = match (input, input_dir) {
        (Some(_), Some(_)) => {
            return Err(anyhow!("Only one of --input or --input-dir may be entered as an argument."));
        }
        (Some(files), None) if !files.is_empty() => InputSource::Files(files),
        (None, Some(dir)) => InputSource::Directory(dir),
        _ => return Err(anyhow!("--input and --output arguments required. Use -h to see all options.")),
    };

    let output = output.ok_or_else(|| anyhow!("--input and --output arguments required. Use -h to see all options."))?;

    Ok((source, output))
}

/// Pick the input order from the CLI flags and the configured default
pub fn input_order(nosort: bool, shuffle: bool, config: &Config) -> InputOrder {
    if shuffle {
        InputOrder::Shuffle
    } else if nosort || !config.natural_sort {
        InputOrder::AsGiven
    } else {
        InputOrder::Natural
    }
}

/// Load the configuration and apply the effective log level.
///
/// A level given on the command line wins over the one in the file.
pub fn load_config(config_path: Option<&Path>, log_level: Option<CliLogLevel>) -> Result<Config> {
    if let Some(level) = log_level {
        logging::set_level(LevelFilter::from(LogLevel::from(level)));
    }

    let mut config = Config::load_optional(config_path)?;
    if let Some(level) = log_level {
        config.log_level = level.into();
    }

    logging::set_level(config.log_level.into());
    Ok(config)
}
