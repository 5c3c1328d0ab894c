/*!
 * Wrappers around the external media executables.
 *
 * - `runner`: the `ToolRunner` seam and the tokio-backed `ProcessRunner`
 * - `mp4box`: probing, chapter muxing and chapter dumps through MP4Box
 * - `ffmpeg`: concat list generation and stream-copy concatenation
 */

pub mod ffmpeg;
pub mod mp4box;
pub mod runner;

pub use ffmpeg::Ffmpeg;
pub use mp4box::{MediaInfo, Mp4Box};
pub use runner::{ProcessRunner, ToolInvocation, ToolOutput, ToolRunner};
