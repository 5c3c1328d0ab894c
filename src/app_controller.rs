use anyhow::{Result, Context};
use indicatif::{HumanBytes, HumanDuration};
use log::{info, warn, debug};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use crate::app_config::Config;
use crate::chapters::ChapterList;
use crate::errors::{SubtitleError, ToolError};
use crate::file_utils::{FileManager, InputOrder, InputSource};
use crate::media_tools::{ffmpeg, Ffmpeg, MediaInfo, Mp4Box, ProcessRunner, ToolRunner};
use crate::subtitle_processor::SubtitleCollection;
use crate::timecode;

// @module: Application controller for video and subtitle concatenation

/// Inputs for joining MP4 files
#[derive(Debug, Clone)]
pub struct VideoConcatRequest {
    pub inputs: InputSource,
    pub output: PathBuf,
    pub overwrite: bool,
    pub order: InputOrder,
}

/// Where each subtitle file's time offset comes from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Alignment {
    /// Each file starts where the previous file's last cue ended
    #[default]
    Sequential,
    /// Offsets are the chapter starts of an already concatenated MP4
    Chapters(PathBuf),
    /// Offsets are cumulative durations of the source videos, in the given order
    Probe(Vec<PathBuf>),
}

/// Inputs for joining SRT files
#[derive(Debug, Clone)]
pub struct SubtitleConcatRequest {
    pub inputs: InputSource,
    pub output: PathBuf,
    pub overwrite: bool,
    pub order: InputOrder,
    pub alignment: Alignment,
}

/// Result of a concatenation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConcatOutcome<T> {
    /// Output written
    Completed(T),
    /// Output already exists and overwriting was not requested
    OutputExists(PathBuf),
    /// Nothing matched the input selection
    NoInputs,
}

/// Summary of a finished video concatenation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoConcatReport {
    pub output: PathBuf,
    pub inputs: Vec<MediaInfo>,
    pub chapters: ChapterList,
    pub total_input_bytes: u64,
    pub output_bytes: u64,
}

/// Summary of a finished subtitle concatenation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleConcatReport {
    pub output: PathBuf,
    pub files: Vec<PathBuf>,
    /// Offset applied to each file, in file order
    pub offsets_ms: Vec<u64>,
    pub entries: usize,
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Runs MP4Box and ffmpeg
    runner: Arc<dyn ToolRunner>,
}

impl Controller {
    // @method: Create a new controller that runs real processes
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self::with_runner(config, Arc::new(ProcessRunner::new())))
    }

    /// Create a controller with a custom tool runner
    pub fn with_runner(config: Config, runner: Arc<dyn ToolRunner>) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn mp4box(&self) -> Mp4Box {
        Mp4Box::new(
            self.runner.clone(),
            &self.config.mp4box_path,
            self.config.probe_timeout(),
            self.config.tool_timeout(),
        )
    }

    fn ffmpeg(&self) -> Ffmpeg {
        Ffmpeg::new(self.runner.clone(), &self.config.ffmpeg_path, self.config.tool_timeout())
    }

    // @returns: Scratch directory next to the output so MP4Box rewrites stay on one filesystem
    fn scratch_dir(output: &Path) -> Result<TempDir> {
        let parent = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        FileManager::ensure_dir(&parent)?;
        tempfile::Builder::new()
            .prefix(".mp4concat-")
            .tempdir_in(&parent)
            .with_context(|| format!("Failed to create temporary directory in {}", parent.display()))
    }

    /// Join MP4 files with ffmpeg and add one chapter per input with MP4Box
    pub async fn concat_videos(&self, request: VideoConcatRequest) -> Result<ConcatOutcome<VideoConcatReport>> {
        let start_time = std::time::Instant::now();
        let output = request.output.clone();

        if output.exists() && !request.overwrite {
            warn!("Output file {:?} already exists. Use --overwrite to overwrite.", output);
            return Ok(ConcatOutcome::OutputExists(output));
        }

        let files = FileManager::collect_inputs(&request.inputs, &self.config.video_extensions, Some(output.as_path()))?;
        let files = FileManager::order_inputs(files, request.order);

        if files.is_empty() {
            warn!("No mp4 video files found. Exiting.");
            return Ok(ConcatOutcome::NoInputs);
        }

        // Probe everything before touching the output
        let mp4box = self.mp4box();
        let mut infos = Vec::with_capacity(files.len());
        for file in &files {
            info!("File: {}", file.display());
            infos.push(mp4box.probe(file).await?);
        }
        info!("Found {} files", infos.len());

        let chapters = ChapterList::from_durations(
            infos.iter().map(|i| (i.chapter_name(), i.duration_ms)),
            &self.config.end_chapter_name,
        );
        let total_input_bytes: u64 = infos.iter().map(|i| i.size_bytes).sum();

        info!(
            "{} chapters, {} running time, {} total size",
            chapters.len(),
            timecode::format_chapter_timecode(chapters.total_duration_ms()),
            HumanBytes(total_input_bytes)
        );
        info!("Output: {}", output.display());

        if FileManager::remove_if_exists(&output)? {
            debug!("Removed existing output {:?}", output);
        }

        let scratch = Self::scratch_dir(&output)?;

        info!("Combining the video files (ffmpeg)");
        let list_file = scratch.path().join("filenames.txt");
        ffmpeg::write_concat_list(&files, &list_file)?;
        self.ffmpeg().concat(&list_file, &output).await?;

        if !FileManager::wait_for_file(&output, self.config.output_wait()).await {
            return Err(ToolError::OutputMissing(output).into());
        }

        info!("Adding chapters to combined video file (mp4box)");
        let chapter_file = scratch.path().join("chapters.txt");
        chapters.write_ogg_file(&chapter_file)?;
        mp4box.add_chapters(&output, &chapter_file, scratch.path()).await?;

        let output_bytes = FileManager::file_size(&output)?;
        info!("Final size of video file is: {}", HumanBytes(output_bytes));
        info!("Finished in {}", HumanDuration(start_time.elapsed()));

        Ok(ConcatOutcome::Completed(VideoConcatReport {
            output,
            inputs: infos,
            chapters,
            total_input_bytes,
            output_bytes,
        }))
    }

    /// Join SRT files, shifting each file by its alignment offset
    pub async fn concat_subtitles(&self, request: SubtitleConcatRequest) -> Result<ConcatOutcome<SubtitleConcatReport>> {
        let output = request.output.clone();

        if output.exists() && !request.overwrite {
            warn!("Output file {:?} already exists. Use --overwrite to overwrite.", output);
            return Ok(ConcatOutcome::OutputExists(output));
        }

        let files = FileManager::collect_inputs(&request.inputs, &["srt".to_string()], Some(output.as_path()))?;
        let files = FileManager::order_inputs(files, request.order);

        if files.is_empty() {
            warn!("No srt files found. Exiting.");
            return Ok(ConcatOutcome::NoInputs);
        }

        info!("srt files:");
        for file in &files {
            info!(" - {}", file.display());
        }

        let fixed_offsets = self.alignment_offsets(&request.alignment, files.len()).await?;

        let mut collections = Vec::with_capacity(files.len());
        let mut offsets_ms = Vec::with_capacity(files.len());
        let mut running_end_ms: u64 = 0;

        for (idx, file) in files.iter().enumerate() {
            let mut collection = SubtitleCollection::from_srt_file(file)?;
            let offset_ms = match &fixed_offsets {
                Some(offsets) => offsets[idx],
                None => running_end_ms,
            };

            debug!("Shifting {:?} by {}", file, timecode::format_srt_timestamp(offset_ms));
            collection.shift(offset_ms);
            running_end_ms = collection.last_end_ms();

            offsets_ms.push(offset_ms);
            collections.push(collection);
        }

        let merged = SubtitleCollection::merge(output.clone(), collections);
        info!("Writing merged subtitles to {}", output.display());
        merged.write_to_srt(&output)?;

        Ok(ConcatOutcome::Completed(SubtitleConcatReport {
            output,
            files,
            offsets_ms,
            entries: merged.entries.len(),
        }))
    }

    /// Offsets fixed up front by the alignment mode; `None` for sequential alignment
    pub async fn alignment_offsets(&self, alignment: &Alignment, file_count: usize) -> Result<Option<Vec<u64>>> {
        let offsets = match alignment {
            Alignment::Sequential => return Ok(None),
            Alignment::Chapters(mp4) => {
                if !mp4.is_file() {
                    return Err(anyhow::anyhow!("MP4 file does not exist: {:?}", mp4));
                }
                let scratch = tempfile::Builder::new()
                    .prefix("srtconcat-")
                    .tempdir()
                    .context("Failed to create temporary directory")?;
                let dump_file = scratch.path().join("chapters.txt");
                let chapters = self.mp4box().dump_chapters(mp4, &dump_file).await?;
                info!("Read {} chapters from {}", chapters.len(), mp4.display());
                chapters.start_offsets()
            }
            Alignment::Probe(videos) => {
                let mp4box = self.mp4box();
                let mut offsets = Vec::with_capacity(videos.len());
                let mut cumulative_ms: u64 = 0;
                for video in videos {
                    offsets.push(cumulative_ms);
                    cumulative_ms += mp4box.probe(video).await?.duration_ms;
                }
                offsets
            }
        };

        if offsets.len() < file_count {
            return Err(SubtitleError::NotEnoughOffsets {
                available: offsets.len(),
                required: file_count,
            }
            .into());
        }

        Ok(Some(offsets))
    }
}
