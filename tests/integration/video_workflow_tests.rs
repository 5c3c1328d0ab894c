/*!
 * End-to-end tests for joining videos with the mock tool runner
 */

use std::path::Path;
use std::sync::Arc;
use anyhow::Result;
use mp4concat::app_controller::{ConcatOutcome, Controller, VideoConcatRequest};
use mp4concat::errors::ToolError;
use mp4concat::file_utils::{InputOrder, InputSource};
use crate::common;
use crate::common::mock_tools::MockToolRunner;

fn request(dir: &Path, output: &Path, overwrite: bool) -> VideoConcatRequest {
    VideoConcatRequest {
        inputs: InputSource::Directory(dir.to_path_buf()),
        output: output.to_path_buf(),
        overwrite,
        order: InputOrder::Natural,
    }
}

fn three_episode_runner() -> MockToolRunner {
    MockToolRunner::new()
        .with_duration("ep1.mp4", "00:10:00.000")
        .with_duration("ep2.mp4", "00:20:30.250")
        .with_duration("ep10.mp4", "00:05:00.000")
}

/// Test the full join: probe, concat list, chapters
#[tokio::test]
async fn test_concat_videos_withDirectory_shouldJoinAndAddChapters() -> Result<()> {
    common::init_test_logging();
    let temp_dir = common::create_temp_dir()?;
    let input_dir = temp_dir.path().join("in");
    std::fs::create_dir(&input_dir)?;
    common::create_fake_video(&input_dir, "ep10.mp4", 100)?;
    common::create_fake_video(&input_dir, "ep1.mp4", 200)?;
    common::create_fake_video(&input_dir, "ep2.mp4", 300)?;
    common::create_test_file(&input_dir, "cover.jpg", "not a video")?;
    let output = temp_dir.path().join("out").join("season.mp4");

    let runner = Arc::new(three_episode_runner());
    let controller = Controller::with_runner(common::test_config(), runner.clone());

    let report = match controller.concat_videos(request(&input_dir, &output, false)).await? {
        ConcatOutcome::Completed(report) => report,
        other => panic!("expected a completed join, got {:?}", other),
    };

    let names: Vec<String> = report.inputs.iter().map(|i| i.chapter_name()).collect();
    assert_eq!(names, vec!["ep1", "ep2", "ep10"]);
    assert_eq!(report.total_input_bytes, 600);
    assert_eq!(report.output_bytes, 64);
    assert_eq!(report.chapters.start_offsets(), vec![0, 600_000, 1_830_250, 2_130_250]);

    let lists = runner.concat_lists();
    assert_eq!(lists.len(), 1);
    let list_lines: Vec<&str> = lists[0].lines().collect();
    assert_eq!(list_lines.len(), 3);
    assert!(list_lines[0].starts_with("file '") && list_lines[0].ends_with("ep1.mp4'"));
    assert!(list_lines[2].ends_with("ep10.mp4'"));

    let chapter_files = runner.chapter_files();
    assert_eq!(chapter_files.len(), 1);
    assert!(chapter_files[0].starts_with("CHAPTER1=00:00:00.000\nCHAPTER1NAME=\"ep1\"\n"));
    assert!(chapter_files[0].contains("CHAPTER3=00:30:30.250"));
    assert!(chapter_files[0].contains("CHAPTER4NAME=\"End\""));

    // probes first, then ffmpeg, then MP4Box chapter muxing
    let tools: Vec<String> = runner.calls().iter().map(|c| c.tool.clone()).collect();
    assert_eq!(tools, vec!["MP4Box", "MP4Box", "MP4Box", "ffmpeg", "MP4Box"]);
    Ok(())
}

/// Test that an existing output is left alone without --overwrite
#[tokio::test]
async fn test_concat_videos_withExistingOutput_shouldNotOverwrite() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input_dir = temp_dir.path().join("in");
    std::fs::create_dir(&input_dir)?;
    common::create_fake_video(&input_dir, "ep1.mp4", 10)?;
    let output = common::create_fake_video(temp_dir.path(), "joined.mp4", 5)?;

    let runner = Arc::new(three_episode_runner());
    let controller = Controller::with_runner(common::test_config(), runner.clone());

    let outcome = controller.concat_videos(request(&input_dir, &output, false)).await?;

    assert_eq!(outcome, ConcatOutcome::OutputExists(output.clone()));
    assert!(runner.calls().is_empty());
    assert_eq!(std::fs::metadata(&output)?.len(), 5);
    Ok(())
}

/// Test that --overwrite replaces an existing output
#[tokio::test]
async fn test_concat_videos_withOverwrite_shouldReplaceOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input_dir = temp_dir.path().join("in");
    std::fs::create_dir(&input_dir)?;
    common::create_fake_video(&input_dir, "ep1.mp4", 10)?;
    let output = common::create_fake_video(temp_dir.path(), "joined.mp4", 5)?;

    let runner = Arc::new(three_episode_runner());
    let controller = Controller::with_runner(common::test_config(), runner);

    let outcome = controller.concat_videos(request(&input_dir, &output, true)).await?;

    assert!(matches!(outcome, ConcatOutcome::Completed(_)));
    assert_eq!(std::fs::metadata(&output)?.len(), 64);
    Ok(())
}

/// Test that an output inside the input directory is not joined into itself
#[tokio::test]
async fn test_concat_videos_withOutputInInputDir_shouldExcludeOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_fake_video(temp_dir.path(), "ep1.mp4", 10)?;
    let output = common::create_fake_video(temp_dir.path(), "joined.mp4", 5)?;

    let runner = Arc::new(three_episode_runner());
    let controller = Controller::with_runner(common::test_config(), runner.clone());

    let outcome = controller.concat_videos(request(temp_dir.path(), &output, true)).await?;

    match outcome {
        ConcatOutcome::Completed(report) => assert_eq!(report.inputs.len(), 1),
        other => panic!("expected a completed join, got {:?}", other),
    }
    assert_eq!(runner.calls_to("MP4Box")[0].args_lossy()[2], temp_dir.path().join("ep1.mp4").to_string_lossy());
    Ok(())
}

/// Test that an empty directory ends without running any tool
#[tokio::test]
async fn test_concat_videos_withNoInputs_shouldReturnNoInputs() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let runner = Arc::new(MockToolRunner::new());
    let controller = Controller::with_runner(common::test_config(), runner.clone());

    let outcome = controller
        .concat_videos(request(temp_dir.path(), &temp_dir.path().join("out.mp4"), false))
        .await?;

    assert_eq!(outcome, ConcatOutcome::NoInputs);
    assert!(runner.calls().is_empty());
    Ok(())
}

/// Test that a failing probe stops the run before ffmpeg
#[tokio::test]
async fn test_concat_videos_withUnreadableInput_shouldFailBeforeJoining() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_fake_video(temp_dir.path(), "ep1.mp4", 10)?;
    common::create_fake_video(temp_dir.path(), "corrupt.mp4", 10)?;
    let output = temp_dir.path().join("out").join("joined.mp4");

    let runner = Arc::new(MockToolRunner::new().with_duration("ep1.mp4", "00:00:10.000"));
    let controller = Controller::with_runner(common::test_config(), runner.clone());

    let err = controller.concat_videos(request(temp_dir.path(), &output, false)).await.unwrap_err();

    assert!(format!("{:#}", err).contains("corrupt.mp4"));
    assert!(runner.calls_to("ffmpeg").is_empty());
    assert!(!output.exists());
    Ok(())
}

/// Test that an ffmpeg failure is reported and chapters are not added
#[tokio::test]
async fn test_concat_videos_withFailingFfmpeg_shouldReturnToolError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_fake_video(temp_dir.path(), "ep1.mp4", 10)?;
    let output = temp_dir.path().join("out").join("joined.mp4");

    let runner = Arc::new(three_episode_runner().with_ffmpeg_exit_code(1));
    let controller = Controller::with_runner(common::test_config(), runner.clone());

    let err = controller.concat_videos(request(temp_dir.path(), &output, false)).await.unwrap_err();

    assert!(matches!(err.downcast_ref::<ToolError>(), Some(ToolError::Failed { code: 1, .. })));
    assert!(runner.chapter_files().is_empty());
    Ok(())
}

/// Test that a missing joined file is detected after the wait
#[tokio::test]
async fn test_concat_videos_withoutJoinedFile_shouldReturnOutputMissing() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_fake_video(temp_dir.path(), "ep1.mp4", 10)?;
    let output = temp_dir.path().join("out").join("joined.mp4");

    let runner = Arc::new(three_episode_runner().without_ffmpeg_output());
    let controller = Controller::with_runner(common::test_config(), runner.clone());

    let err = controller.concat_videos(request(temp_dir.path(), &output, false)).await.unwrap_err();

    assert!(matches!(err.downcast_ref::<ToolError>(), Some(ToolError::OutputMissing(_))));
    assert!(runner.chapter_files().is_empty());
    Ok(())
}
