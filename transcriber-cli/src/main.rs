//! Command-line front end for the melody transcriber.
//!
//! Wires the default audio devices into the core session, renders the
//! result as a LilyPond score and runs benchmark comparisons against known
//! reference melodies.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;

use transcriber_core::config::{RuntimeConfig, SongMeta};
use transcriber_core::report;
use transcriber_core::session;
use transcriber_core::window::WindowFunction;

mod audio;
mod score;

#[derive(Parser, Debug)]
#[command(name = "transcriber", about = "Real-time melody transcription to LilyPond notation")]
struct Cli {
    /// Path to a JSON configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record a melody from the default input device and write the score.
    Live {
        /// Output path for the LilyPond file.
        #[arg(long, default_value = "notesheet.ly")]
        output: PathBuf,
        /// Record without the metronome click.
        #[arg(long)]
        no_metronome: bool,
    },
    /// Detect fixed-size note sets per frame instead of a single melody.
    Chords {
        /// Number of simultaneous notes to track.
        #[arg(long, default_value_t = 3)]
        bins: usize,
    },
    /// Record against a known reference melody and report accuracy.
    Benchmark {
        /// The reference melody in absolute LilyPond notation.
        melody: String,
        /// Label for the report row.
        #[arg(long, default_value = "session")]
        identifier: String,
        /// CSV file the result row is appended to.
        #[arg(long, default_value = "benchmark.csv")]
        report: PathBuf,
    },
    /// List the available windowing functions.
    Windows,
}

/// On-disk configuration: runtime parameters plus song metadata.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    runtime: RuntimeConfig,
    song: SongMeta,
}

fn load_config(path: Option<&Path>) -> Result<FileConfig> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: FileConfig = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let FileConfig { mut runtime, song } = load_config(cli.config.as_deref())?;
    runtime.validate()?;

    match cli.command {
        Command::Live {
            output,
            no_metronome,
        } => {
            let (_input_guard, source) = audio::open_input(&runtime)?;
            runtime.sample_rate = source_rate(&source, &runtime);
            let metronome = if no_metronome {
                None
            } else {
                match audio::open_metronome() {
                    Ok((guard, tick)) => Some((guard, tick)),
                    Err(err) => {
                        eprintln!("Metronome unavailable: {err}");
                        None
                    }
                }
            };
            let (_metronome_guard, tick) = match metronome {
                Some((guard, tick)) => (Some(guard), Some(tick)),
                None => (None, None),
            };
            let transcription = session::run_session(&runtime, Box::new(source), tick)?;
            println!("Melody: {}", transcription.expression);
            score::write_lilypond(&output, &transcription.expression, &song, &runtime)?;
        }
        Command::Chords { bins } => {
            let (_input_guard, source) = audio::open_input(&runtime)?;
            runtime.sample_rate = source_rate(&source, &runtime);
            let frames = session::run_chord_session(&runtime, Box::new(source), bins)?;
            for frame in frames {
                println!("{:8.0} ms  {}", frame.time_ms, frame.symbols.join(" "));
            }
        }
        Command::Benchmark {
            melody,
            identifier,
            report: report_path,
        } => {
            // Benchmarking records without the metronome so the click does
            // not bleed into the measurement.
            let (_input_guard, source) = audio::open_input(&runtime)?;
            runtime.sample_rate = source_rate(&source, &runtime);
            let transcription = session::run_session(&runtime, Box::new(source), None)?;
            println!("Melody: {}", transcription.expression);
            let result =
                report::compare_to_reference(&melody, &identifier, &transcription.events, &runtime)?;
            score::print_report(&result);
            score::append_csv_report(&report_path, &result, &runtime, &song)?;
        }
        Command::Windows => {
            for function in WindowFunction::all() {
                println!("{}", function.name());
            }
        }
    }
    Ok(())
}

/// The device may not support the configured rate exactly; the session must
/// use what the stream actually delivers.
fn source_rate(source: &audio::ChannelSource, runtime: &RuntimeConfig) -> u32 {
    use transcriber_core::session::PcmSource;
    let rate = source.rate();
    if rate != runtime.sample_rate {
        eprintln!(
            "[SESSION] device rate {rate} Hz differs from configured {} Hz",
            runtime.sample_rate
        );
    }
    rate
}
