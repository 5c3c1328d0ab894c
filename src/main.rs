// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use log::{info, LevelFilter};
use std::path::PathBuf;

use mp4concat::app_controller::{ConcatOutcome, Controller, VideoConcatRequest};
use mp4concat::cli::{self, CliLogLevel};
use mp4concat::logging::CustomLogger;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate shell completions for mp4concat
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// mp4concat - join MP4 files and mark each one with a chapter
#[derive(Parser, Debug)]
#[command(name = "mp4concat")]
#[command(version)]
#[command(about = "Concatenate MP4 files and add a chapter per input")]
#[command(long_about = "mp4concat joins MP4 files with ffmpeg (stream copy, no re-encode) and then \
adds one chapter per input file, named after the file, plus a closing \"End\" chapter using MP4Box.

EXAMPLES:
    mp4concat -i ep1.mp4 ep2.mp4 ep3.mp4 -o season.mp4
    mp4concat -i 'videos/*.mp4' -o season.mp4       # Expand the pattern without the shell
    mp4concat -d videos/ -o season.mp4 --overwrite
    mp4concat -i b.mp4 a.mp4 -o out.mp4 --nosort    # Keep the given order
    mp4concat completions bash > mp4concat.bash")]
#[command(args_conflicts_with_subcommands = true)]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// MP4 files (or file name patterns) to concatenate
    #[arg(short, long, num_args = 1.., value_name = "FILES")]
    input: Option<Vec<String>>,

    /// Directory holding the input files, as an alternative to --input
    #[arg(short = 'd', long, value_name = "DIR", conflicts_with = "input")]
    input_dir: Option<PathBuf>,

    /// Path of the concatenated output file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Path to the MP4Box executable
    #[arg(long, env = "MP4CONCAT_MP4BOX")]
    mp4box: Option<String>,

    /// Path to the ffmpeg executable
    #[arg(long, env = "MP4CONCAT_FFMPEG")]
    ffmpeg: Option<String>,

    /// Overwrite an existing output file
    #[arg(long)]
    overwrite: bool,

    /// Keep the inputs in the order given (no natural sorting)
    #[arg(long, conflicts_with = "shuffle")]
    nosort: bool,

    /// Concatenate the inputs in random order
    #[arg(long)]
    shuffle: bool,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "mp4concat", &mut std::io::stdout());
        return Ok(());
    }

    run(cli).await
}

async fn run(options: CommandLineOptions) -> Result<()> {
    let mut config = cli::load_config(options.config.as_deref(), options.log_level)?;

    if let Some(mp4box) = options.mp4box {
        config.mp4box_path = mp4box;
    }
    if let Some(ffmpeg) = options.ffmpeg {
        config.ffmpeg_path = ffmpeg;
    }

    let (inputs, output) = cli::input_and_output(options.input, options.input_dir, options.output)?;
    let order = cli::input_order(options.nosort, options.shuffle, &config);

    let controller = Controller::with_config(config)?;
    let outcome = controller
        .concat_videos(VideoConcatRequest {
            inputs,
            output,
            overwrite: options.overwrite,
            order,
        })
        .await?;

    if let ConcatOutcome::Completed(report) = outcome {
        info!("Success: {}", report.output.display());
    }

    Ok(())
}
