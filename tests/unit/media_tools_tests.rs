/*!
 * Tests for the MP4Box and ffmpeg wrappers
 */

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;
use mp4concat::errors::ToolError;
use mp4concat::media_tools::mp4box::parse_computed_duration;
use mp4concat::media_tools::runner::ensure_success;
use mp4concat::media_tools::{ffmpeg, Ffmpeg, Mp4Box, ProcessRunner, ToolInvocation, ToolOutput, ToolRunner};
use crate::common;
use crate::common::mock_tools::MockToolRunner;

fn mp4box(runner: Arc<MockToolRunner>) -> Mp4Box {
    Mp4Box::new(runner, "bin/MP4Box", Duration::from_secs(5), None)
}

/// Test that the movie-level duration is read from MP4Box -info output
#[test]
fn test_parse_computed_duration_withInfoOutput_shouldReturnMilliseconds() {
    let output = "* Movie Info *\n\tTimescale 1000 - 2 tracks\n\tComputed Duration 00:23:06.040 - Indicated Duration 00:23:06.040\n";
    assert_eq!(parse_computed_duration(output), Some(1_386_040));
    assert_eq!(parse_computed_duration("no duration here"), None);
}

/// Test the probe command line and its result
#[tokio::test]
async fn test_probe_withKnownFile_shouldUseInfoStdArguments() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let video = common::create_fake_video(temp_dir.path(), "ep1.mp4", 128)?;
    let runner = Arc::new(MockToolRunner::new().with_duration("ep1.mp4", "00:01:30.500"));

    let info = mp4box(runner.clone()).probe(&video).await?;

    assert_eq!(info.duration_ms, 90_500);
    assert_eq!(info.size_bytes, 128);
    assert_eq!(info.chapter_name(), "ep1");

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].program, Path::new("bin/MP4Box"));
    assert_eq!(calls[0].args_lossy(), vec!["-info".to_string(), "-std".to_string(), video.to_string_lossy().to_string()]);
    Ok(())
}

/// Test that an unreadable input surfaces the tool failure
#[tokio::test]
async fn test_probe_withFailingTool_shouldReturnToolError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let video = common::create_fake_video(temp_dir.path(), "broken.mp4", 8)?;
    let runner = Arc::new(MockToolRunner::new());

    let err = mp4box(runner).probe(&video).await.unwrap_err();

    assert!(format!("{:#}", err).contains("Invalid input file"));
    assert!(matches!(err.downcast_ref::<ToolError>(), Some(ToolError::Failed { code: 1, .. })));
    Ok(())
}

/// Test the chapter muxing command line
#[tokio::test]
async fn test_add_chapters_shouldPassTmpChapAndVideo() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let chapter_file = common::create_test_file(temp_dir.path(), "chapters.txt", "CHAPTER1=00:00:00.000\n")?;
    let runner = Arc::new(MockToolRunner::new());

    mp4box(runner.clone())
        .add_chapters(Path::new("out.mp4"), &chapter_file, temp_dir.path())
        .await?;

    let calls = runner.calls_to("MP4Box");
    assert_eq!(calls[0].args_lossy(), vec![
        "-tmp".to_string(),
        temp_dir.path().to_string_lossy().to_string(),
        "-chap".to_string(),
        chapter_file.to_string_lossy().to_string(),
        "out.mp4".to_string(),
    ]);
    assert!(calls[0].show_progress);
    Ok(())
}

/// Test reading chapters back from a video
#[tokio::test]
async fn test_dump_chapters_withChapters_shouldParseDump() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let video = common::create_fake_video(temp_dir.path(), "joined.mp4", 8)?;
    let out_file = temp_dir.path().join("dump.txt");
    let runner = Arc::new(MockToolRunner::new().with_chapter_dump(
        "CHAPTER01=00:00:00.000\nCHAPTER01NAME=ep1\nCHAPTER02=00:00:14.000\nCHAPTER02NAME=End\n",
    ));

    let chapters = mp4box(runner.clone()).dump_chapters(&video, &out_file).await?;

    assert_eq!(chapters.start_offsets(), vec![0, 14_000]);
    let args = runner.calls()[0].args_lossy();
    assert_eq!(args[0], "-dump-chap-ogg");
    assert_eq!(args[2], "-out");
    Ok(())
}

/// Test that a video without chapters is reported as such
#[tokio::test]
async fn test_dump_chapters_withoutChapters_shouldReturnNoChapters() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let video = common::create_fake_video(temp_dir.path(), "plain.mp4", 8)?;
    let runner = Arc::new(MockToolRunner::new());

    let err = mp4box(runner).dump_chapters(&video, &temp_dir.path().join("dump.txt")).await.unwrap_err();

    assert!(matches!(err.downcast_ref::<ToolError>(), Some(ToolError::NoChapters(_))));
    Ok(())
}

/// Test the concat list written for the demuxer
#[test]
fn test_write_concat_list_shouldUseAbsoluteQuotedEntries() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let a = common::create_fake_video(temp_dir.path(), "a.mp4", 1)?;
    let b = common::create_fake_video(temp_dir.path(), "b'c.mp4", 1)?;
    let list = temp_dir.path().join("list").join("filenames.txt");

    ffmpeg::write_concat_list(&[a.clone(), b.clone()], &list)?;

    let content = std::fs::read_to_string(&list)?;
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("file '/") || lines[0].contains(":\\"));
    assert!(lines[0].ends_with("a.mp4'"));
    assert!(lines[1].ends_with(r"b'\''c.mp4'"));
    Ok(())
}

/// Test the ffmpeg concat command line
#[tokio::test]
async fn test_concat_shouldStreamCopyWithConcatDemuxer() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let list = common::create_test_file(temp_dir.path(), "filenames.txt", "file '/a.mp4'\n")?;
    let output = temp_dir.path().join("out.mp4");
    let runner = Arc::new(MockToolRunner::new());

    Ffmpeg::new(runner.clone(), "ffmpeg", None).concat(&list, &output).await?;

    let args = runner.calls_to("ffmpeg")[0].args_lossy();
    let list_arg = list.to_string_lossy().to_string();
    let output_arg = output.to_string_lossy().to_string();
    let expected: Vec<&str> = vec![
        "-hide_banner", "-f", "concat", "-safe", "0", "-i",
        list_arg.as_str(), "-c", "copy", output_arg.as_str(), "-y",
    ];
    assert_eq!(args, expected);
    assert!(output.exists());
    Ok(())
}

/// Test that an ffmpeg failure carries the exit code and filtered output
#[tokio::test]
async fn test_concat_withFailingFfmpeg_shouldFilterBanner() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let list = common::create_test_file(temp_dir.path(), "filenames.txt", "")?;
    let runner = Arc::new(MockToolRunner::new().with_ffmpeg_exit_code(1));

    let err = Ffmpeg::new(runner, "ffmpeg", None)
        .concat(&list, &temp_dir.path().join("out.mp4"))
        .await
        .unwrap_err();

    match err.downcast_ref::<ToolError>() {
        Some(ToolError::Failed { code, output, .. }) => {
            assert_eq!(*code, 1);
            assert!(output.contains("Impossible to open"));
            assert!(!output.contains("ffmpeg version"));
        }
        other => panic!("expected ToolError::Failed, got {:?}", other),
    }
    Ok(())
}

/// Test ensure_success on both exit paths
#[test]
fn test_ensure_success_withNonZeroExit_shouldKeepOutputTail() {
    let invocation = ToolInvocation::new("MP4Box", "MP4Box").arg("-info");
    let ok = ToolOutput { code: Some(0), stdout: "fine".to_string(), stderr: String::new() };
    assert!(ensure_success(&invocation, ok).is_ok());

    let failed = ToolOutput { code: None, stdout: "line one".to_string(), stderr: "line two".to_string() };
    match ensure_success(&invocation, failed) {
        Err(ToolError::Failed { tool, code, output }) => {
            assert_eq!(tool, "MP4Box");
            assert_eq!(code, -1);
            assert_eq!(output, "line one\nline two");
        }
        other => panic!("expected ToolError::Failed, got {:?}", other),
    }
}

/// Test the printable command line
#[test]
fn test_command_line_shouldJoinProgramAndArgs() {
    let invocation = ToolInvocation::new("ffmpeg", "/usr/bin/ffmpeg").args(["-f", "concat"]).arg("-y");
    assert_eq!(invocation.command_line(), "/usr/bin/ffmpeg -f concat -y");
}

/// Test that a program that cannot be started is a launch failure
#[cfg(unix)]
#[tokio::test]
async fn test_process_runner_withMissingProgram_shouldReturnLaunchFailed() {
    let invocation = ToolInvocation::new("MP4Box", "/nonexistent/bin/MP4Box-not-installed").arg("-version");

    let result = ProcessRunner::new().run(&invocation).await;

    match result {
        Err(ToolError::LaunchFailed { tool, program, .. }) => {
            assert_eq!(tool, "MP4Box");
            assert_eq!(program, Path::new("/nonexistent/bin/MP4Box-not-installed"));
        }
        other => panic!("expected ToolError::LaunchFailed, got {:?}", other),
    }
}

/// Test that the exit code and both output streams are captured
#[cfg(unix)]
#[tokio::test]
async fn test_process_runner_withNonZeroExit_shouldCaptureCodeAndStreams() -> Result<()> {
    let invocation = ToolInvocation::new("sh", "sh").args(["-c", "echo out; echo err >&2; exit 3"]);

    let output = ProcessRunner::new().run(&invocation).await?;

    assert_eq!(output.code, Some(3));
    assert!(!output.success());
    assert_eq!(output.stdout.trim(), "out");
    assert_eq!(output.stderr.trim(), "err");
    assert!(matches!(ensure_success(&invocation, output), Err(ToolError::Failed { code: 3, .. })));
    Ok(())
}

/// Test that streamed progress output is still captured in full
#[cfg(unix)]
#[tokio::test]
async fn test_process_runner_withProgress_shouldKeepCarriageReturnOutput() -> Result<()> {
    let invocation = ToolInvocation::new("sh", "sh")
        .args(["-c", "printf 'step 1\\rstep 2\\rdone\\n'"])
        .with_progress();

    let output = ProcessRunner::new().run(&invocation).await?;

    assert!(output.success());
    assert_eq!(output.stdout, "step 1\rstep 2\rdone\n");
    Ok(())
}

/// Test that a tool running past its timeout is killed and reported
#[cfg(unix)]
#[tokio::test]
async fn test_process_runner_withTimeout_shouldKillAndReturnTimedOut() {
    let invocation = ToolInvocation::new("sleep", "sleep")
        .arg("5")
        .timeout(Some(Duration::from_millis(200)));
    let started = std::time::Instant::now();

    let result = ProcessRunner::new().run(&invocation).await;

    assert!(matches!(result, Err(ToolError::TimedOut { ref tool, secs: 0 }) if tool == "sleep"));
    assert!(started.elapsed() < Duration::from_secs(4));
}
