use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;

use crate::errors::ToolError;

// @module: External process invocation

/// Longest progress line shown on the spinner
const MAX_PROGRESS_LINE: usize = 80;

/// Number of trailing output lines kept in failure reports
const FAILURE_TAIL_LINES: usize = 20;

/// A fully described call to an external tool
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    /// Short label used in logs and errors, e.g. "MP4Box"
    pub tool: String,

    /// Executable to run
    pub program: PathBuf,

    /// Arguments in order
    pub args: Vec<OsString>,

    /// Kill the process when it runs longer than this
    pub timeout: Option<Duration>,

    /// Show the latest output line on a spinner while running
    pub show_progress: bool,
}

impl ToolInvocation {
    pub fn new(tool: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        ToolInvocation {
            tool: tool.into(),
            program: program.into(),
            args: Vec::new(),
            timeout: None,
            show_progress: false,
        }
    }

    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_progress(mut self) -> Self {
        self.show_progress = true;
        self
    }

    /// Arguments as UTF-8 (lossy), mostly for logging and assertions
    pub fn args_lossy(&self) -> Vec<String> {
        self.args.iter().map(|a| a.to_string_lossy().to_string()).collect()
    }

    /// Printable command line
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.program.to_string_lossy().to_string()];
        parts.extend(self.args_lossy());
        parts.join(" ")
    }
}

/// What a finished tool produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` when terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Stdout followed by stderr
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Runs external executables.
///
/// Implementations return `Ok` for any process that ran to completion, whatever its exit
/// code; callers decide what a failure means. `Err` is reserved for processes that could
/// not be launched or timed out.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError>;
}

/// Turn a non-zero exit into `ToolError::Failed` carrying the tail of the output
pub fn ensure_success(invocation: &ToolInvocation, output: ToolOutput) -> Result<ToolOutput, ToolError> {
    if output.success() {
        return Ok(output);
    }
    Err(ToolError::Failed {
        tool: invocation.tool.clone(),
        code: output.code.unwrap_or(-1),
        output: tail_lines(&output.combined(), FAILURE_TAIL_LINES),
    })
}

// @returns: Last `count` non-empty lines
fn tail_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}

/// Real runner backed by `tokio::process`
#[derive(Debug, Default, Clone)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        ProcessRunner
    }

    fn spinner(label: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner} [{elapsed_precise}] {prefix}: {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.set_prefix(label.to_string());
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    }
}

// @reads: Whole stream, reporting each \r or \n terminated line to the spinner
fn spawn_reader<R>(reader: Option<R>, spinner: Option<ProgressBar>) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(reader) = reader else {
            return String::new();
        };
        let mut reader = BufReader::new(reader);
        let mut raw = Vec::new();
        let mut line = Vec::new();

        let report = |line: &[u8]| {
            if let Some(spinner) = &spinner {
                let text = String::from_utf8_lossy(line);
                let text = text.trim();
                if !text.is_empty() {
                    spinner.set_message(text.chars().take(MAX_PROGRESS_LINE).collect::<String>());
                }
            }
        };

        loop {
            let chunk = match reader.fill_buf().await {
                Ok(chunk) => chunk,
                Err(e) => {
                    debug!("Stopped reading tool output: {}", e);
                    break;
                }
            };
            if chunk.is_empty() {
                break;
            }
            let len = chunk.len();
            for &byte in chunk {
                raw.push(byte);
                if byte == b'\n' || byte == b'\r' {
                    report(&line);
                    line.clear();
                } else {
                    line.push(byte);
                }
            }
            reader.consume(len);
        }
        report(&line);

        String::from_utf8_lossy(&raw).into_owned()
    })
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        info!("{}", invocation.command_line());

        let launch_error = |e: std::io::Error| ToolError::LaunchFailed {
            tool: invocation.tool.clone(),
            program: invocation.program.clone(),
            message: e.to_string(),
        };

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(launch_error)?;

        let spinner = invocation.show_progress.then(|| Self::spinner(&invocation.tool));
        let stdout_task = spawn_reader(child.stdout.take(), spinner.clone());
        let stderr_task = spawn_reader(child.stderr.take(), spinner.clone());

        let waited = match invocation.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(waited) => waited,
                Err(_) => {
                    let _ = child.kill().await;
                    if let Some(spinner) = &spinner {
                        spinner.abandon_with_message("timed out");
                    }
                    return Err(ToolError::TimedOut {
                        tool: invocation.tool.clone(),
                        secs: limit.as_secs(),
                    });
                }
            },
            None => child.wait().await,
        };
        let status = waited.map_err(launch_error)?;

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        debug!("{} exited with {:?}", invocation.tool, status.code());

        Ok(ToolOutput {
            code: status.code(),
            stdout,
            stderr,
        })
    }
}

/// Resolve a path to an absolute one without requiring it to exist
pub fn absolute_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
