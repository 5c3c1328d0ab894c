use anyhow::{Result, Context};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use log::debug;
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use regex::Regex;
use walkdir::WalkDir;

use crate::errors::InputError;

// @module: File and directory utilities

// @const: Digit runs used for natural ordering
static DIGITS_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// One piece of a natural sort key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum KeyPart {
    /// Non-digit text, compared as-is
    Text(String),
    /// A run of digits, compared by value
    Number(u128),
}

/// Split a string into text and number parts so that "ep2" sorts before "ep10"
pub fn natural_key(value: &str) -> Vec<KeyPart> {
    let mut parts = Vec::new();
    let mut last = 0;

    // Keys always open with a text part, empty for a leading number, so "01" sorts before "intro"
    for m in DIGITS_REGEX.find_iter(value) {
        if m.start() > last || m.start() == 0 {
            parts.push(KeyPart::Text(value[last..m.start()].to_string()));
        }
        // Digit runs too long for u128 fall back to text comparison
        match m.as_str().parse::<u128>() {
            Ok(n) => parts.push(KeyPart::Number(n)),
            Err(_) => parts.push(KeyPart::Text(m.as_str().to_string())),
        }
        last = m.end();
    }

    if last < value.len() {
        parts.push(KeyPart::Text(value[last..].to_string()));
    }

    parts
}

/// Compare two strings in natural order
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_key(a).cmp(&natural_key(b))
}

/// Where the input files come from
#[derive(Debug, Clone)]
pub enum InputSource {
    /// Paths or glob patterns given on the command line
    Files(Vec<String>),
    /// Every matching file directly inside a directory
    Directory(PathBuf),
}

/// How the collected inputs are ordered before concatenation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputOrder {
    /// Natural sort on the full path
    #[default]
    Natural,
    /// Keep the order the files were given in
    AsGiven,
    /// Random order
    Shuffle,
}

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Size of a file in bytes
    pub fn file_size<P: AsRef<Path>>(path: P) -> Result<u64> {
        let metadata = fs::metadata(&path)
            .with_context(|| format!("Failed to read metadata: {:?}", path.as_ref()))?;
        Ok(metadata.len())
    }

    /// Delete a file, succeeding when it is already gone
    pub fn remove_if_exists<P: AsRef<Path>>(path: P) -> Result<bool> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path).with_context(|| format!("Failed to remove file: {:?}", path))?;
        Ok(true)
    }

    /// Poll until `path` is a regular file or `timeout` elapses
    pub async fn wait_for_file<P: AsRef<Path>>(path: P, timeout: Duration) -> bool {
        let path = path.as_ref();
        let poll = Duration::from_millis(100);
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if path.is_file() {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(poll).await;
        }
    }

    /// Check whether a path carries one of the given extensions (case-insensitive)
    pub fn has_extension<P: AsRef<Path>>(path: P, extensions: &[String]) -> bool {
        path.as_ref()
            .extension()
            .map(|ext| {
                let ext = ext.to_string_lossy();
                extensions.iter().any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(&ext))
            })
            .unwrap_or(false)
    }

    /// Resolve the input source to a list of files.
    ///
    /// Explicit paths must exist; items containing `*` or `?` in their file name are
    /// expanded against their directory. Directory listings are not recursive, only keep
    /// files with one of `extensions`, and skip `exclude` (usually the output file).
    pub fn collect_inputs(source: &InputSource, extensions: &[String], exclude: Option<&Path>) -> Result<Vec<PathBuf>> {
        let files = match source {
            InputSource::Files(items) => {
                let mut files = Vec::new();
                for item in items {
                    if is_glob_pattern(item) && !Path::new(item).exists() {
                        files.extend(expand_glob(item)?);
                    } else {
                        let path = PathBuf::from(item);
                        if !path.is_file() {
                            return Err(InputError::NotFound(path).into());
                        }
                        files.push(path);
                    }
                }
                files
            }
            InputSource::Directory(dir) => {
                if !dir.is_dir() {
                    return Err(InputError::DirectoryNotFound(dir.clone()).into());
                }
                let mut files = Vec::new();
                for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
                    let entry = entry.context("Failed to read directory entry")?;
                    let path = entry.path();
                    if path.is_file() && Self::has_extension(path, extensions) {
                        files.push(path.to_path_buf());
                    }
                }
                files
            }
        };

        let excluded = exclude.and_then(|p| fs::canonicalize(p).ok());
        let files = files
            .into_iter()
            .filter(|f| match &excluded {
                Some(ex) => fs::canonicalize(f).map(|c| &c != ex).unwrap_or(true),
                None => true,
            })
            .collect::<Vec<_>>();

        debug!("Collected {} input files", files.len());
        Ok(files)
    }

    /// Put the inputs in concatenation order
    pub fn order_inputs(mut files: Vec<PathBuf>, order: InputOrder) -> Vec<PathBuf> {
        match order {
            InputOrder::Natural => {
                files.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
            }
            InputOrder::AsGiven => {}
            InputOrder::Shuffle => {
                files.shuffle(&mut rand::rng());
            }
        }
        files
    }
}

// @checks: Wildcards in the file name component
fn is_glob_pattern(item: &str) -> bool {
    Path::new(item)
        .file_name()
        .map(|name| name.to_string_lossy().contains(['*', '?']))
        .unwrap_or(false)
}

// @converts: Shell-style file name pattern to an anchored regex
fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut re = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).with_context(|| format!("Invalid pattern: {}", pattern))
}

// @expands: Pattern in the last path component against its directory
fn expand_glob(item: &str) -> Result<Vec<PathBuf>> {
    let path = Path::new(item);
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name_pattern = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let matcher = glob_to_regex(&name_pattern)?;

    if !dir.is_dir() {
        return Err(InputError::DirectoryNotFound(dir).into());
    }

    let mut matches = Vec::new();
    for entry in WalkDir::new(&dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry.context("Failed to read directory entry")?;
        let file_name = entry.file_name().to_string_lossy();
        if entry.path().is_file() && matcher.is_match(&file_name) {
            let matched = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.join(entry.file_name()),
                _ => PathBuf::from(entry.file_name()),
            };
            matches.push(matched);
        }
    }

    if matches.is_empty() {
        return Err(InputError::NoMatch(item.to_string()).into());
    }

    // Expansion order is natural regardless of --nosort, like a shell glob
    matches.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
    Ok(matches)
}
