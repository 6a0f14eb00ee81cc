// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cutline command line.
//!
//! Inspects, builds and plays back track sequences saved as RON:
//! - `show` prints every track's blocks and the block active at given times
//! - `demo` builds a small edited sequence and saves it
//! - `play` steps a playhead through a sequence frame by frame
//!
//! Settings are read from `cutline.ron` in the working directory unless
//! `--settings` points elsewhere. `RUST_LOG` overrides the configured filter.

mod demo;
mod report;

use clap::{Parser, Subcommand};
use cutline_sequencer::{
    PersistError, PlaybackController, Rational, Sequence, SequencerError, SequencerSettings,
    SETTINGS_FILE,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cutline", version, about = "Inspect and play back track sequences")]
struct Cli {
    /// Settings file
    #[arg(long, global = true, default_value = SETTINGS_FILE)]
    settings: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print track layouts and resolve active blocks
    Show {
        /// Sequence file; the demo sequence is used when omitted
        sequence: Option<PathBuf>,
        /// Times to resolve, e.g. `3`, `2.5` or `1001/30000`
        #[arg(long = "at")]
        times: Vec<Rational>,
    },
    /// Build the demo sequence and save it
    Demo {
        /// Where to write the sequence
        output: PathBuf,
    },
    /// Step through a sequence frame by frame
    Play {
        /// Sequence file; the demo sequence is used when omitted
        sequence: Option<PathBuf>,
        /// Number of frames to evaluate
        #[arg(long, default_value_t = 10)]
        frames: u32,
    },
}

/// Error surfaced to the user
#[derive(Debug, thiserror::Error)]
enum AppError {
    /// Settings or sequence file problem
    #[error(transparent)]
    Persist(#[from] PersistError),

    /// Editing or evaluation failure
    #[error(transparent)]
    Sequencer(#[from] SequencerError),
}

fn main() {
    let cli = Cli::parse();

    // Settings decide the default log filter, so they load before logging starts
    let settings = SequencerSettings::load_or_default(&cli.settings);
    let default_filter = settings
        .as_ref()
        .map_or_else(|_| SequencerSettings::default().log_filter, |s| s.log_filter.clone());
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Cutline v{}", env!("CARGO_PKG_VERSION"));

    let result = settings
        .map_err(AppError::from)
        .and_then(|settings| run(cli.command, &settings));
    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

fn run(command: Command, settings: &SequencerSettings) -> Result<(), AppError> {
    match command {
        Command::Show { sequence, times } => {
            let mut sequence = open_sequence(sequence.as_deref(), settings)?;
            print!("{}", report::describe_sequence(&sequence)?);
            for time in times {
                print!("{}", report::describe_frames(&mut sequence, time)?);
            }
        }
        Command::Demo { output } => {
            let sequence = demo::build_demo(settings)?;
            sequence.save(&output)?;
            tracing::info!(path = %output.display(), "saved demo sequence");
        }
        Command::Play { sequence, frames } => {
            let mut sequence = open_sequence(sequence.as_deref(), settings)?;
            let mut playback = PlaybackController::with_settings(settings);
            let step = sequence.frame_to_time(1);
            playback.play();
            for _ in 0..frames {
                let frame = playback.current_frame(&sequence);
                let evaluated = playback.evaluate_all(&mut sequence)?;
                println!("frame {frame:>5}  {}", report::describe_track_frames(&sequence, &evaluated));
                playback.update(step, &sequence);
                if !playback.is_playing() {
                    break;
                }
            }
        }
    }
    Ok(())
}

fn open_sequence(path: Option<&Path>, settings: &SequencerSettings) -> Result<Sequence, AppError> {
    let Some(path) = path else {
        return Ok(demo::build_demo(settings)?);
    };
    let mut sequence = Sequence::load(path)?;
    // Caches are saved too, but a hand-edited file may disagree with its links
    let events = sequence.refresh_all()?;
    if !events.is_empty() {
        tracing::warn!(changes = events.len(), "saved block cache was out of date");
    }
    Ok(sequence)
}
