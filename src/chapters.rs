use std::fmt;
use std::path::Path;
use anyhow::{Result, Context};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::ChapterError;
use crate::file_utils::FileManager;
use crate::timecode;

// @module: Chapter list construction and OGG chapter text handling

// @const: Chapter start line, e.g. CHAPTER01=00:23:06.040
static CHAPTER_TIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^CHAPTER(\d+)=(.+)$").unwrap()
});

// @const: Chapter name line, e.g. CHAPTER01NAME=Episode 1
static CHAPTER_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^CHAPTER(\d+)NAME=(.*)$").unwrap()
});

/// Default name of the closing chapter placed at the very end of the output
pub const DEFAULT_END_CHAPTER_NAME: &str = "End";

/// A named offset into the concatenated video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    /// Chapter title
    pub name: String,

    /// Offset from the start of the video in milliseconds
    pub start_ms: u64,
}

impl Chapter {
    pub fn new(name: impl Into<String>, start_ms: u64) -> Self {
        Chapter {
            name: name.into(),
            start_ms,
        }
    }

    /// Start offset formatted as HH:MM:SS.mmm
    pub fn timecode(&self) -> String {
        timecode::format_chapter_timecode(self.start_ms)
    }
}

/// Ordered list of chapters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterList {
    pub chapters: Vec<Chapter>,
}

impl ChapterList {
    pub fn new(chapters: Vec<Chapter>) -> Self {
        ChapterList { chapters }
    }

    /// Build one chapter per segment plus a closing chapter.
    ///
    /// Each segment's chapter starts at the summed duration of every segment before it,
    /// and the closing chapter starts at the total running time. The result therefore
    /// always holds `segments.len() + 1` chapters.
    pub fn from_durations<I, S>(segments: I, end_name: &str) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let mut chapters = Vec::new();
        let mut cumulative_ms: u64 = 0;

        for (name, duration_ms) in segments {
            chapters.push(Chapter::new(name, cumulative_ms));
            cumulative_ms += duration_ms;
        }

        chapters.push(Chapter::new(end_name, cumulative_ms));

        ChapterList { chapters }
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    /// Start of the last chapter, which for a built list is the total running time
    pub fn total_duration_ms(&self) -> u64 {
        self.chapters.last().map_or(0, |c| c.start_ms)
    }

    /// Chapter start offsets in order
    pub fn start_offsets(&self) -> Vec<u64> {
        self.chapters.iter().map(|c| c.start_ms).collect()
    }

    /// Render the list in the OGG chapter syntax understood by MP4Box
    pub fn to_ogg_string(&self) -> String {
        let mut out = String::new();
        for (idx, chapter) in self.chapters.iter().enumerate() {
            let n = idx + 1;
            out.push_str(&format!("CHAPTER{}={}\n", n, chapter.timecode()));
            out.push_str(&format!("CHAPTER{}NAME=\"{}\"\n", n, chapter.name));
        }
        out
    }

    /// Write the OGG chapter file consumed by `MP4Box -chap`
    pub fn write_ogg_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        FileManager::write_to_file(path, &self.to_ogg_string())
            .with_context(|| format!("Failed to write chapter file: {}", path.display()))?;
        debug!("Wrote {} chapters to {:?}", self.len(), path);
        Ok(())
    }

    /// Parse OGG chapter text as printed by `MP4Box -dump-chap-ogg`.
    ///
    /// Chapters keep the order in which their start lines appear. Name lines are matched
    /// to starts by chapter number; a chapter without a name line gets an empty name.
    pub fn parse_ogg(content: &str) -> Result<Self, ChapterError> {
        let mut numbered: Vec<(String, Chapter)> = Vec::new();

        for (idx, raw_line) in content.lines().enumerate() {
            let line = raw_line.trim().trim_start_matches('\u{feff}');
            if line.is_empty() {
                continue;
            }

            if let Some(caps) = CHAPTER_NAME_REGEX.captures(line) {
                let number = caps[1].to_string();
                let name = strip_quotes(&caps[2]);
                match numbered.iter_mut().find(|(n, _)| *n == number) {
                    Some((_, chapter)) => chapter.name = name,
                    None => warn!("Chapter name without start time on line {}: {}", idx + 1, line),
                }
                continue;
            }

            if let Some(caps) = CHAPTER_TIME_REGEX.captures(line) {
                let value = caps[2].trim();
                let start_ms = timecode::parse_timecode(value).map_err(|_| ChapterError::InvalidTimecode {
                    line: idx + 1,
                    value: value.to_string(),
                })?;
                numbered.push((caps[1].to_string(), Chapter::new(String::new(), start_ms)));
                continue;
            }

            debug!("Ignoring chapter line {}: {}", idx + 1, line);
        }

        if numbered.is_empty() {
            return Err(ChapterError::Empty);
        }

        Ok(ChapterList {
            chapters: numbered.into_iter().map(|(_, chapter)| chapter).collect(),
        })
    }
}

// @strips: One pair of surrounding double quotes
fn strip_quotes(value: &str) -> String {
    let value = value.trim();
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
        .to_string()
}

impl fmt::Display for ChapterList {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for chapter in &self.chapters {
            writeln!(f, "{}  {}", chapter.timecode(), chapter.name)?;
        }
        Ok(())
    }
}
