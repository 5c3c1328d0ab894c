use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use anyhow::{Result, Context};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::chapters::ChapterList;
use crate::errors::ToolError;
use crate::file_utils::FileManager;
use crate::media_tools::runner::{ensure_success, ToolInvocation, ToolRunner};

// @const: Movie duration line of `MP4Box -info`, e.g. "Computed Duration 00:23:06.040 - Indicated Duration 00:23:06.040"
static DURATION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Computed Duration (?P<hrs>[0-9]{2,}):(?P<min>[0-9]{2}):(?P<sec>[0-9]{2})\.(?P<msec>[0-9]{3})").unwrap()
});

/// Message MP4Box prints when a file has nothing to dump
const NO_CHAPTERS_MESSAGE: &str = "No chapters or chapters track found in file";

const TOOL_NAME: &str = "MP4Box";

/// Probed facts about one input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaInfo {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub duration_ms: u64,
}

impl MediaInfo {
    /// File name without extension, used as the chapter title
    pub fn chapter_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.to_string_lossy().to_string())
    }
}

/// Extract the movie duration in milliseconds from `MP4Box -info` output
pub fn parse_computed_duration(output: &str) -> Option<u64> {
    let caps = DURATION_REGEX.captures(output)?;
    let field = |name: &str| -> Option<u64> { caps.name(name)?.as_str().parse().ok() };

    let hours = field("hrs")?;
    let minutes = field("min")?;
    let seconds = field("sec")?;
    let millis = field("msec")?;

    Some(((hours * 60 + minutes) * 60 + seconds) * 1000 + millis)
}

/// Wrapper around the MP4Box command line
#[derive(Clone)]
pub struct Mp4Box {
    runner: Arc<dyn ToolRunner>,
    program: PathBuf,
    probe_timeout: Duration,
    tool_timeout: Option<Duration>,
}

impl Mp4Box {
    pub fn new(runner: Arc<dyn ToolRunner>, program: impl Into<PathBuf>, probe_timeout: Duration, tool_timeout: Option<Duration>) -> Self {
        Mp4Box {
            runner,
            program: program.into(),
            probe_timeout,
            tool_timeout,
        }
    }

    fn invocation(&self) -> ToolInvocation {
        ToolInvocation::new(TOOL_NAME, &self.program)
    }

    /// Probe a file's size and duration with `MP4Box -info -std`
    pub async fn probe<P: AsRef<Path>>(&self, file: P) -> Result<MediaInfo> {
        let file = file.as_ref();
        let size_bytes = FileManager::file_size(file)?;

        let invocation = self.invocation()
            .args(["-info", "-std"])
            .arg(file)
            .timeout(Some(self.probe_timeout));

        let output = self.runner.run(&invocation).await?;
        let output = ensure_success(&invocation, output)
            .with_context(|| format!("Invalid input file: {}", file.display()))?;

        let duration_ms = parse_computed_duration(&output.combined()).ok_or_else(|| ToolError::UnexpectedOutput {
            tool: TOOL_NAME.to_string(),
            file: file.to_path_buf(),
            message: "no \"Computed Duration\" line".to_string(),
        })?;

        debug!("{:?}: {} ms, {} bytes", file, duration_ms, size_bytes);

        Ok(MediaInfo {
            path: file.to_path_buf(),
            size_bytes,
            duration_ms,
        })
    }

    /// Add the chapters from an OGG chapter file to `video` in place
    pub async fn add_chapters(&self, video: &Path, chapter_file: &Path, tmp_dir: &Path) -> Result<()> {
        let invocation = self.invocation()
            .arg("-tmp")
            .arg(tmp_dir)
            .arg("-chap")
            .arg(chapter_file)
            .arg(video)
            .timeout(self.tool_timeout)
            .with_progress();

        let output = self.runner.run(&invocation).await?;
        ensure_success(&invocation, output)
            .with_context(|| format!("Failed to add chapters to {}", video.display()))?;
        Ok(())
    }

    /// Dump the chapter list of `video` through `out_file` and parse it
    pub async fn dump_chapters(&self, video: &Path, out_file: &Path) -> Result<ChapterList> {
        let invocation = self.invocation()
            .arg("-dump-chap-ogg")
            .arg(video)
            .arg("-out")
            .arg(out_file)
            .timeout(Some(self.probe_timeout));

        let output = self.runner.run(&invocation).await?;
        if output.combined().contains(NO_CHAPTERS_MESSAGE) {
            return Err(ToolError::NoChapters(video.to_path_buf()).into());
        }
        ensure_success(&invocation, output)
            .with_context(|| format!("{} failed to read chapter data from {}", TOOL_NAME, video.display()))?;

        if !out_file.is_file() {
            return Err(ToolError::OutputMissing(out_file.to_path_buf()).into());
        }

        let content = FileManager::read_to_string(out_file)?;
        let chapters = ChapterList::parse_ogg(&content)
            .with_context(|| format!("Failed to parse chapters of {}", video.display()))?;

        debug!("Read {} chapters from {:?}", chapters.len(), video);
        Ok(chapters)
    }
}
