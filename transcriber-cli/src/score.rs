//! # Score and Report Output
//!
//! Renders the transcription as a LilyPond file for the external notation
//! toolchain and appends benchmark results to a semicolon-separated CSV
//! report.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use transcriber_core::config::{RuntimeConfig, SongMeta};
use transcriber_core::report::BenchmarkReport;

const CSV_HEADER: &str = "Identifier; Melody; Tempo; Instrument; Windowing Function; Num Notes; Notes Correct Detected; Notes Incorrect Detected; Frequency Mean; Frequency Standard Deviation; Cent Mean; Cent Standard Deviation; Rhythm Mean; Rhythm Standard Deviation";

/// Assembles a complete LilyPond document around the melody expression.
pub fn lilypond_document(melody: &str, song: &SongMeta, config: &RuntimeConfig) -> String {
    format!(
        "\\version \"2.18.2\" \\header {{ title=\"{}\" subtitle=\"{}\" composer=\"{}\" }} \
         \\score {{ \\new Staff \\with {{ instrumentName = \"{}\" }} \
         {{ \\set Staff.midiInstrument = #\"{}\" \\absolute {{ \\clef {} \\key {} \\{} \
         \\time {}/{} \\tempo \"{}\" {} = {} {} }} }} \\layout {{}} \\midi {{}} }}",
        song.title,
        song.subtitle,
        song.composer,
        song.instrument,
        song.instrument,
        song.clef,
        song.key,
        song.scale_type,
        config.rhythm_numerator,
        config.rhythm_denominator,
        song.tempo_description,
        config.rhythm_denominator,
        config.beats_per_minute,
        melody,
    )
}

/// Writes the LilyPond document for the transcribed melody.
pub fn write_lilypond(
    path: &Path,
    melody: &str,
    song: &SongMeta,
    config: &RuntimeConfig,
) -> Result<()> {
    let document = lilypond_document(melody, song, config);
    fs::write(path, document)
        .with_context(|| format!("failed to write score to {}", path.display()))?;
    println!("LilyPond file written to {}", path.display());
    Ok(())
}

/// Appends one benchmark result row, writing the header first when the
/// report file is new or empty.
pub fn append_csv_report(
    path: &Path,
    report: &BenchmarkReport,
    config: &RuntimeConfig,
    song: &SongMeta,
) -> Result<()> {
    let needs_header = fs::metadata(path).map_or(true, |meta| meta.len() == 0);
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open report {}", path.display()))?;
    if needs_header {
        writeln!(file, "{CSV_HEADER}")?;
    }
    writeln!(
        file,
        "{}; {}; {}; {}; {}; {}; {}; {}; {:.6}; {:.6}; {:.6}; {:.6}; {:.6}; {:.6}",
        report.identifier,
        report.melody,
        config.beats_per_minute,
        song.instrument,
        config.window_function,
        report.reference_notes,
        report.correct_detections,
        report.incorrect_detections(),
        report.frequency.mean,
        report.frequency.std_deviation(),
        report.cents.mean,
        report.cents.std_deviation(),
        report.rhythm.mean,
        report.rhythm.std_deviation(),
    )?;
    Ok(())
}

/// Prints the benchmark summary to stdout.
pub fn print_report(report: &BenchmarkReport) {
    println!(
        "{}/{} notes correctly detected",
        report.correct_detections, report.reference_notes
    );
    println!(
        "Frequency error: mean {:.3} Hz, standard deviation {:.3} Hz",
        report.frequency.mean,
        report.frequency.std_deviation()
    );
    println!(
        "Cent error: mean {:.3}, standard deviation {:.3}",
        report.cents.mean,
        report.cents.std_deviation()
    );
    println!(
        "Rhythm error: mean {:.3} ms, standard deviation {:.3} ms",
        report.rhythm.mean,
        report.rhythm.std_deviation()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use transcriber_core::NoteEvent;
    use transcriber_core::report::compare_to_reference;

    fn unique_path(name: &str) -> std::path::PathBuf {
        env::temp_dir().join(format!("transcriber-{}-{name}", std::process::id()))
    }

    #[test]
    fn document_embeds_melody_and_metadata() {
        let document = lilypond_document(
            "a'4~ a'8",
            &SongMeta::default(),
            &RuntimeConfig::default(),
        );
        assert!(document.starts_with("\\version \"2.18.2\""));
        assert!(document.contains("title=\"Title\""));
        assert!(document.contains("\\time 4/4"));
        assert!(document.contains("\\tempo \"Allegro\" 4 = 90"));
        assert!(document.contains("a'4~ a'8"));
        assert!(document.ends_with("\\layout {} \\midi {} }"));
    }

    #[test]
    fn csv_header_is_written_exactly_once() {
        let path = unique_path("report.csv");
        let _ = std::fs::remove_file(&path);
        let config = RuntimeConfig::default();
        let events = [NoteEvent {
            frequency: 440.0,
            duration_ms: 60000.0 / 90.0,
            amplitude: -3.0,
        }];
        let report = compare_to_reference("a'4", "unit", &events, &config).unwrap();
        let song = SongMeta::default();
        append_csv_report(&path, &report, &config, &song).unwrap();
        append_csv_report(&path, &report, &config, &song).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with("unit; a'4; 90; trumpet; rectangle; 1; 1; 0;"));
        assert_eq!(lines[1], lines[2]);
    }
}
