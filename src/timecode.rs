// @module: Millisecond timecode helpers shared by chapters and subtitles

use crate::errors::SubtitleError;

const MS_PER_HOUR: u64 = 3_600_000;
const MS_PER_MINUTE: u64 = 60_000;
const MS_PER_SECOND: u64 = 1_000;

// @splits: Milliseconds into (hours, minutes, seconds, millis)
fn split_ms(ms: u64) -> (u64, u64, u64, u64) {
    (
        ms / MS_PER_HOUR,
        (ms % MS_PER_HOUR) / MS_PER_MINUTE,
        (ms % MS_PER_MINUTE) / MS_PER_SECOND,
        ms % MS_PER_SECOND,
    )
}

/// Format milliseconds as a chapter timecode (HH:MM:SS.mmm).
///
/// Hours keep counting past 24, so a 25 hour compilation formats as `25:00:00.000`.
pub fn format_chapter_timecode(ms: u64) -> String {
    let (hours, minutes, seconds, millis) = split_ms(ms);
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}

/// Format milliseconds as an SRT timestamp (HH:MM:SS,mmm)
pub fn format_srt_timestamp(ms: u64) -> String {
    let (hours, minutes, seconds, millis) = split_ms(ms);
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

/// Parse `HH:MM:SS.mmm` or `HH:MM:SS,mmm` into milliseconds
pub fn parse_timecode(timecode: &str) -> Result<u64, SubtitleError> {
    let invalid = || SubtitleError::InvalidTimestamp(timecode.to_string());
    let parts: Vec<&str> = timecode.trim().split(&[':', ',', '.'][..]).collect();

    if parts.len() != 4 || parts.iter().any(|p| p.is_empty()) {
        return Err(invalid());
    }

    let hours: u64 = parts[0].parse().map_err(|_| invalid())?;
    let minutes: u64 = parts[1].parse().map_err(|_| invalid())?;
    let seconds: u64 = parts[2].parse().map_err(|_| invalid())?;
    let millis: u64 = parts[3].parse().map_err(|_| invalid())?;

    if minutes >= 60 || seconds >= 60 || millis >= 1000 {
        return Err(invalid());
    }

    hours
        .checked_mul(MS_PER_HOUR)
        .and_then(|ms| ms.checked_add(minutes * MS_PER_MINUTE + seconds * MS_PER_SECOND + millis))
        .ok_or_else(invalid)
}
