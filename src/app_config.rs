use anyhow::{anyhow, Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::chapters::DEFAULT_END_CHAPTER_NAME;

/// Application configuration module
/// This module handles loading, defaulting and validating the settings shared by
/// the `mp4concat` and `srtconcat` tools.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Path to the MP4Box executable
    #[serde(default = "default_mp4box_path")]
    pub mp4box_path: String,

    /// Path to the ffmpeg executable
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    /// Sort inputs naturally unless told otherwise on the command line
    #[serde(default = "default_natural_sort")]
    pub natural_sort: bool,

    /// Title of the closing chapter
    #[serde(default = "default_end_chapter_name")]
    pub end_chapter_name: String,

    /// Timeout for `MP4Box -info` and chapter dumps
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Timeout for the long-running concat and chapter steps; none when unset
    #[serde(default)]
    pub tool_timeout_secs: Option<u64>,

    /// How long to wait for an output file after its tool reported success
    #[serde(default = "default_output_wait_secs")]
    pub output_wait_secs: u64,

    /// Extensions picked up from `--input-dir` for video concatenation
    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

// @returns: Bundled binary under ./bin when present, else the bare name for PATH lookup
fn bundled_or_path(name: &str) -> String {
    let file_name = if cfg!(windows) { format!("{}.exe", name) } else { name.to_string() };
    let bundled = PathBuf::from("bin").join(&file_name);
    if bundled.is_file() {
        bundled.to_string_lossy().to_string()
    } else {
        name.to_string()
    }
}

fn default_mp4box_path() -> String {
    bundled_or_path("MP4Box")
}

fn default_ffmpeg_path() -> String {
    bundled_or_path("ffmpeg")
}

fn default_natural_sort() -> bool {
    true
}

fn default_end_chapter_name() -> String {
    DEFAULT_END_CHAPTER_NAME.to_string()
}

fn default_probe_timeout_secs() -> u64 {
    60
}

fn default_output_wait_secs() -> u64 {
    5
}

fn default_video_extensions() -> Vec<String> {
    vec!["mp4".to_string(), "m4v".to_string(), "mov".to_string()]
}

impl Config {
    /// Load the configuration from `path`, which must exist
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(anyhow!("Config file not found: {}", path.display()));
        }

        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load from an optional path; without one the defaults are used
    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Config::default()),
        }
    }

    /// Validate settings after CLI overrides have been applied
    pub fn validate(&self) -> Result<()> {
        if self.mp4box_path.trim().is_empty() {
            return Err(anyhow!("mp4box_path must not be empty"));
        }
        if self.ffmpeg_path.trim().is_empty() {
            return Err(anyhow!("ffmpeg_path must not be empty"));
        }
        if self.end_chapter_name.trim().is_empty() {
            return Err(anyhow!("end_chapter_name must not be empty"));
        }
        if self.probe_timeout_secs == 0 {
            return Err(anyhow!("probe_timeout_secs must be greater than 0"));
        }
        if self.tool_timeout_secs == Some(0) {
            return Err(anyhow!("tool_timeout_secs must be greater than 0 when set"));
        }
        if self.video_extensions.is_empty() {
            return Err(anyhow!("video_extensions must list at least one extension"));
        }

        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_secs.map(Duration::from_secs)
    }

    pub fn output_wait(&self) -> Duration {
        Duration::from_secs(self.output_wait_secs)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            mp4box_path: default_mp4box_path(),
            ffmpeg_path: default_ffmpeg_path(),
            natural_sort: default_natural_sort(),
            end_chapter_name: default_end_chapter_name(),
            probe_timeout_secs: default_probe_timeout_secs(),
            tool_timeout_secs: None,
            output_wait_secs: default_output_wait_secs(),
            video_extensions: default_video_extensions(),
            log_level: LogLevel::default(),
        }
    }
}
