use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use anyhow::{Result, Context};
use log::{debug, error};

use crate::errors::ToolError;
use crate::file_utils::FileManager;
use crate::media_tools::runner::{absolute_path, ToolInvocation, ToolRunner};

const TOOL_NAME: &str = "ffmpeg";

/// One line of an ffmpeg concat demuxer list.
///
/// Single quotes inside the path are closed, escaped and reopened (`'\''`).
pub fn concat_list_line(path: &Path) -> String {
    let escaped = path.to_string_lossy().replace('\'', r"'\''");
    format!("file '{}'", escaped)
}

/// Write the concat list for `files`.
///
/// The demuxer resolves relative entries against the list's own directory, so every
/// entry is made absolute first.
pub fn write_concat_list(files: &[PathBuf], list_path: &Path) -> Result<()> {
    let mut content = String::new();
    for file in files {
        content.push_str(&concat_list_line(&absolute_path(file)));
        content.push('\n');
    }
    FileManager::write_to_file(list_path, &content)
        .with_context(|| format!("Failed to write concat list: {}", list_path.display()))
}

/// Filter ffmpeg output to only show meaningful error lines, stripping the
/// version banner, build configuration, and stream metadata noise.
pub fn filter_ffmpeg_output(stderr: &str) -> String {
    let noise_prefixes = [
        "ffmpeg version",
        "built with",
        "configuration:",
        "lib",
        "Input #",
        "Metadata:",
        "Duration:",
        "Chapter",
        "Stream #",
        "title",
        "handler_name",
        "vendor_id",
        "encoder",
        "major_brand",
        "minor_version",
        "compatible_brands",
        "creation_time",
        "Output #",
        "Stream mapping:",
        "Press [q]",
    ];

    let meaningful: Vec<&str> = stderr
        .lines()
        .flat_map(|line| line.split('\r'))
        .filter(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                return false;
            }
            !noise_prefixes.iter().any(|p| trimmed.starts_with(p))
        })
        .collect();

    if meaningful.is_empty() {
        "unknown ffmpeg error (output was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}

/// Wrapper around the ffmpeg command line
#[derive(Clone)]
pub struct Ffmpeg {
    runner: Arc<dyn ToolRunner>,
    program: PathBuf,
    timeout: Option<Duration>,
}

impl Ffmpeg {
    pub fn new(runner: Arc<dyn ToolRunner>, program: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Ffmpeg {
            runner,
            program: program.into(),
            timeout,
        }
    }

    /// Stream-copy every file listed in `list_file` into `output`
    pub async fn concat(&self, list_file: &Path, output: &Path) -> Result<()> {
        let invocation = ToolInvocation::new(TOOL_NAME, &self.program)
            .args(["-hide_banner", "-f", "concat", "-safe", "0", "-i"])
            .arg(list_file)
            .args(["-c", "copy"])
            .arg(output)
            .arg("-y")
            .timeout(self.timeout)
            .with_progress();

        let result = self.runner.run(&invocation).await?;
        if !result.success() {
            let filtered = filter_ffmpeg_output(&result.stderr);
            error!("Error while executing {}", invocation.command_line());
            return Err(ToolError::Failed {
                tool: TOOL_NAME.to_string(),
                code: result.code.unwrap_or(-1),
                output: filtered,
            }
            .into());
        }

        debug!("ffmpeg concat finished for {:?}", output);
        Ok(())
    }
}
