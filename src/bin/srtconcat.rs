#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use log::{info, LevelFilter};
use std::path::PathBuf;

use mp4concat::app_controller::{Alignment, ConcatOutcome, Controller, SubtitleConcatRequest};
use mp4concat::cli::{self, CliLogLevel};
use mp4concat::logging::CustomLogger;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate shell completions for srtconcat
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// srtconcat - join SRT files to match a concatenated video
#[derive(Parser, Debug)]
#[command(name = "srtconcat")]
#[command(version)]
#[command(about = "Concatenate SRT files, shifting timestamps to line up with a joined video")]
#[command(long_about = "srtconcat merges SRT files into one, shifting each file's cues by an offset.

By default each file starts where the previous file's last cue ends. With --mp4 the offsets
are the chapter starts of a video produced by mp4concat; with --videos they are the summed
durations of the source videos.

EXAMPLES:
    srtconcat -i ep1.srt ep2.srt -o season.srt
    srtconcat -d subs/ -o season.srt --mp4 season.mp4
    srtconcat -i 'subs/*.srt' -o season.srt --videos ep1.mp4 ep2.mp4")]
#[command(args_conflicts_with_subcommands = true)]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// SRT files (or file name patterns) to concatenate
    #[arg(short, long, num_args = 1.., value_name = "FILES")]
    input: Option<Vec<String>>,

    /// Directory holding the input files, as an alternative to --input
    #[arg(short = 'd', long, value_name = "DIR", conflicts_with = "input")]
    input_dir: Option<PathBuf>,

    /// Path of the concatenated output file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// MP4 file whose chapters mark where each input starts
    #[arg(short, long, value_name = "FILE")]
    mp4: Option<PathBuf>,

    /// Source videos, in order, whose durations give the offsets
    #[arg(long, num_args = 1.., value_name = "FILES", conflicts_with = "mp4")]
    videos: Option<Vec<PathBuf>>,

    /// Path to the MP4Box executable
    #[arg(long, env = "MP4CONCAT_MP4BOX")]
    mp4box: Option<String>,

    /// Overwrite an existing output file
    #[arg(long)]
    overwrite: bool,

    /// Keep the inputs in the order given (no natural sorting)
    #[arg(long)]
    nosort: bool,

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
        generate(shell, &mut cmd, "srtconcat", &mut std::io::stdout());
        return Ok(());
    }

    run(cli).await
}

async fn run(options: CommandLineOptions) -> Result<()> {
    let mut config = cli::load_config(options.config.as_deref(), options.log_level)?;

    if let Some(mp4box) = options.mp4box {
        config.mp4box_path = mp4box;
    }

    let (inputs, output) = cli::input_and_output(options.input, options.input_dir, options.output)?;
    let order = cli::input_order(options.nosort, false, &config);

    let alignment = match (options.mp4, options.videos) {
        (Some(mp4), _) => Alignment::Chapters(mp4),
        (None, Some(videos)) => Alignment::Probe(videos),
        (None, None) => Alignment::Sequential,
    };

    let controller = Controller::with_config(config)?;
    let outcome = controller
        .concat_subtitles(SubtitleConcatRequest {
            inputs,
            output,
            overwrite: options.overwrite,
            order,
            alignment,
        })
        .await?;

    if let ConcatOutcome::Completed(report) = outcome {
        info!("Success: {} ({} entries from {} files)", report.output.display(), report.entries, report.files.len());
    }

    Ok(())
}
