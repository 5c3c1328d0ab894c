use std::fs::File;
use std::fmt;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use regex::Regex;
use once_cell::sync::Lazy;
use anyhow::{Result, Context};
use log::{warn, debug};

use crate::errors::SubtitleError;
use crate::file_utils::FileManager;
use crate::timecode;

// @module: Subtitle parsing, shifting and merging

// @const: SRT timestamp regex
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2,}:\d{2}:\d{2}[,.]\d{3})\s*-->\s*(\d{2,}:\d{2}:\d{2}[,.]\d{3})").unwrap()
});

// @struct: Single subtitle entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    // @field: Sequence number
    pub seq_num: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Subtitle text
    pub text: String,
}

impl SubtitleEntry {
    /// Creates a new subtitle entry
    pub fn new(seq_num: usize, start_time_ms: u64, end_time_ms: u64, text: String) -> Self {
        SubtitleEntry {
            seq_num,
            start_time_ms,
            end_time_ms,
            text,
        }
    }

    // @creates: Validated subtitle entry
    // @validates: Time range and non-empty text
    pub fn new_validated(seq_num: usize, start_time_ms: u64, end_time_ms: u64, text: String) -> Result<Self> {
        // Zero-length cues are legal SRT, reversed ones are not
        if end_time_ms < start_time_ms {
            return Err(anyhow::anyhow!(
                "Invalid time range: end time {} < start time {}",
                end_time_ms, start_time_ms
            ));
        }

        let trimmed_text = text.trim();
        if trimmed_text.is_empty() {
            return Err(anyhow::anyhow!("Empty subtitle text for entry {}", seq_num));
        }

        Ok(SubtitleEntry {
            seq_num,
            start_time_ms,
            end_time_ms,
            text: trimmed_text.to_string(),
        })
    }

    /// Parse an SRT timestamp to milliseconds
    pub fn parse_timestamp(timestamp: &str) -> Result<u64, SubtitleError> {
        timecode::parse_timecode(timestamp)
    }

    /// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm)
    pub fn format_timestamp(ms: u64) -> String {
        timecode::format_srt_timestamp(ms)
    }

    /// Convert start time to formatted SRT timestamp
    pub fn format_start_time(&self) -> String {
        Self::format_timestamp(self.start_time_ms)
    }

    /// Convert end time to formatted SRT timestamp
    pub fn format_end_time(&self) -> String {
        Self::format_timestamp(self.end_time_ms)
    }

    /// Copy of this entry moved later by `offset_ms`
    pub fn shifted(&self, offset_ms: u64) -> Self {
        SubtitleEntry {
            seq_num: self.seq_num,
            start_time_ms: self.start_time_ms + offset_ms,
            end_time_ms: self.end_time_ms + offset_ms,
            text: self.text.clone(),
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_time_ms - self.start_time_ms
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.seq_num)?;
        writeln!(f, "{} --> {}", self.format_start_time(), self.format_end_time())?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Collection of subtitle entries with metadata
#[derive(Debug, Clone)]
pub struct SubtitleCollection {
    /// Source filename
    pub source_file: PathBuf,

    /// List of subtitle entries
    pub entries: Vec<SubtitleEntry>,
}

impl SubtitleCollection {
    /// Create a new, empty subtitle collection
    pub fn new(source_file: PathBuf) -> Self {
        SubtitleCollection {
            source_file,
            entries: Vec::new(),
        }
    }

    /// Load and parse an SRT file
    pub fn from_srt_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = FileManager::read_to_string(path)?;
        let entries = Self::parse_srt_string(&content)
            .with_context(|| format!("Failed to parse subtitle file: {}", path.display()))?;

        debug!("Parsed {} subtitle entries from {:?}", entries.len(), path);

        Ok(SubtitleCollection {
            source_file: path.to_path_buf(),
            entries,
        })
    }

    /// Write subtitles to an SRT file
    pub fn write_to_srt<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            FileManager::ensure_dir(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let file = File::create(path)
            .with_context(|| format!("Failed to create subtitle file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);

        for entry in &self.entries {
            write!(writer, "{}", entry)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Move every entry later by `offset_ms`
    pub fn shift(&mut self, offset_ms: u64) {
        if offset_ms == 0 {
            return;
        }
        for entry in self.entries.iter_mut() {
            *entry = entry.shifted(offset_ms);
        }
    }

    /// End time of the last entry, or 0 for an empty collection
    pub fn last_end_ms(&self) -> u64 {
        self.entries.last().map_or(0, |e| e.end_time_ms)
    }

    /// Append collections in order and renumber the result from 1
    pub fn merge<I>(output_file: PathBuf, collections: I) -> Self
    where
        I: IntoIterator<Item = SubtitleCollection>,
    {
        let mut merged = SubtitleCollection::new(output_file);
        for collection in collections {
            merged.entries.extend(collection.entries);
        }
        merged.renumber();
        merged
    }

    /// Renumber entries to 1..=n in their current order
    pub fn renumber(&mut self) {
        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.seq_num = i + 1;
        }
    }

    /// Parse SRT format string into subtitle entries
    pub fn parse_srt_string(content: &str) -> Result<Vec<SubtitleEntry>> {
        let mut entries = Vec::new();
        let content = content.trim_start_matches('\u{feff}');

        // State variables for parsing
        let mut current_seq_num: Option<usize> = None;
        let mut current_times: Option<(u64, u64)> = None;
        let mut current_text = String::new();

        // Helper function to add the current entry if complete
        let mut add_current_entry = |seq_num: usize, start_ms: u64, end_ms: u64, text: &str| {
            match SubtitleEntry::new_validated(seq_num, start_ms, end_ms, text.to_string()) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping invalid subtitle entry {}: {}", seq_num, e),
            }
        };

        for (line_idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();

            // A blank line closes the current entry
            if trimmed.is_empty() {
                if let (Some(seq_num), Some((start_ms, end_ms))) = (current_seq_num, current_times) {
                    add_current_entry(seq_num, start_ms, end_ms, &current_text);
                    current_seq_num = None;
                    current_times = None;
                    current_text.clear();
                }
                continue;
            }

            // Sequence number starts a new entry
            if current_seq_num.is_none() {
                match trimmed.parse::<usize>() {
                    Ok(num) => current_seq_num = Some(num),
                    Err(_) => warn!("Unexpected text at line {} before sequence number: {}", line_idx + 1, trimmed),
                }
                continue;
            }

            if current_times.is_none() {
                match TIMESTAMP_REGEX.captures(trimmed).map(|caps| Self::parse_time_range(&caps)) {
                    Some(Ok(times)) => current_times = Some(times),
                    Some(Err(e)) => {
                        warn!("Skipping subtitle entry at line {}: {}", line_idx + 1, e);
                        current_seq_num = None;
                    }
                    None => {
                        warn!("Invalid timestamp line {}: {}", line_idx + 1, trimmed);
                        current_seq_num = None;
                    }
                }
                continue;
            }

            if !current_text.is_empty() {
                current_text.push('\n');
            }
            current_text.push_str(trimmed);
        }

        // Add the last entry if there is one
        if let (Some(seq_num), Some((start_ms, end_ms))) = (current_seq_num, current_times) {
            add_current_entry(seq_num, start_ms, end_ms, &current_text);
        }

        if entries.is_empty() {
            return Err(SubtitleError::NoEntries("SRT content".to_string()).into());
        }

        Ok(entries)
    }

    // @returns: (start, end) of a matched `start --> end` line
    fn parse_time_range(caps: &regex::Captures) -> Result<(u64, u64), SubtitleError> {
        let start = timecode::parse_timecode(&caps[1])?;
        let end = timecode::parse_timecode(&caps[2])?;
        Ok((start, end))
    }
}

impl fmt::Display for SubtitleCollection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Subtitle Collection")?;
        writeln!(f, "Source: {:?}", self.source_file)?;
        writeln!(f, "Entries: {}", self.entries.len())?;
        Ok(())
    }
}
