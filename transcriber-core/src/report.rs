//! # Benchmark Report
//!
//! Compares a captured note-event sequence against a known reference melody
//! and summarizes detection quality. Matching is positional in time: each
//! reference note owns a time window of its own length, and every captured
//! event falling inside that window is checked against the reference pitch
//! with the configured cents gate.

use anyhow::{Result, bail};

use crate::NoteEvent;
use crate::config::RuntimeConfig;
use crate::transcribe;

/// Absolute error sum, mean of absolute errors and sample variance of one
/// error dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorStats {
    pub absolute: f64,
    pub mean: f64,
    pub variance: f64,
}

impl ErrorStats {
    fn from_samples(samples: &[f64]) -> Self {
        let n = samples.len();
        let absolute: f64 = samples.iter().map(|s| s.abs()).sum();
        let mean = absolute / n as f64;
        let variance = if n > 1 {
            samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };
        Self {
            absolute,
            mean,
            variance,
        }
    }

    pub fn std_deviation(&self) -> f64 {
        self.variance.sqrt()
    }
}

/// Detection-quality summary for one benchmarking session.
#[derive(Debug, Clone)]
pub struct BenchmarkReport {
    pub identifier: String,
    pub melody: String,
    pub reference_notes: usize,
    pub correct_detections: usize,
    pub frequency: ErrorStats,
    pub cents: ErrorStats,
    pub rhythm: ErrorStats,
}

impl BenchmarkReport {
    pub fn incorrect_detections(&self) -> usize {
        self.reference_notes - self.correct_detections
    }
}

/// Compares captured events against the reference melody.
///
/// The reference melody is parsed into expected `(frequency, duration)`
/// pairs; captured events are consumed in order, each attributed to the
/// reference note whose time window its start falls into. A reference note
/// counts as correctly detected when any event in its window lies within
/// the cents gate of its expected pitch. Undetected notes contribute their
/// full duration as rhythm error and their raw frequency distance as pitch
/// error.
pub fn compare_to_reference(
    melody: &str,
    identifier: &str,
    events: &[NoteEvent],
    config: &RuntimeConfig,
) -> Result<BenchmarkReport> {
    let reference = transcribe::parse_melody(
        melody,
        config.tuning_pitch,
        config.beats_per_minute,
        config.rhythm_denominator,
    )?;
    if reference.is_empty() {
        bail!("reference melody is empty");
    }

    let mut frequency_samples = Vec::with_capacity(reference.len());
    let mut cent_samples = Vec::with_capacity(reference.len());
    let mut rhythm_samples = Vec::with_capacity(reference.len());

    let mut time_stamp = 0.0;
    let mut time_threshold = 0.0;
    let mut recorded_pos = 0;
    let mut correct_detections = 0;

    for &(expected_frequency, expected_duration) in &reference {
        time_threshold += expected_duration;
        let mut detected = false;
        let mut frequency_difference = 0.0;
        let mut cent_difference = 0.0;
        // An undetected note contributes its whole duration as rhythm error.
        let mut time_difference = expected_duration;

        if recorded_pos < events.len() {
            frequency_difference = (events[recorded_pos].frequency - expected_frequency).abs();
            cent_difference = if expected_frequency > 0.0 {
                (1200.0 * (events[recorded_pos].frequency / expected_frequency).log2()).abs()
            } else {
                0.0
            };
        }
        while recorded_pos < events.len() && time_stamp < time_threshold {
            let event = &events[recorded_pos];
            let current_difference = if expected_frequency > 0.0 {
                (1200.0 * (event.frequency / expected_frequency).log2()).abs()
            } else {
                // Rests have no pitch to match against.
                f64::INFINITY
            };
            if current_difference < config.pitch_resolution_cents {
                detected = true;
                frequency_difference = event.frequency - expected_frequency;
                cent_difference = current_difference;
                time_difference = (time_difference - event.duration_ms).abs();
            }
            time_stamp += event.duration_ms;
            recorded_pos += 1;
        }
        if detected {
            correct_detections += 1;
        }
        frequency_samples.push(frequency_difference);
        cent_samples.push(cent_difference);
        rhythm_samples.push(time_difference);
    }

    Ok(BenchmarkReport {
        identifier: identifier.to_string(),
        melody: melody.to_string(),
        reference_notes: reference.len(),
        correct_detections,
        frequency: ErrorStats::from_samples(&frequency_samples),
        cents: ErrorStats::from_samples(&cent_samples),
        rhythm: ErrorStats::from_samples(&rhythm_samples),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RuntimeConfig {
        RuntimeConfig::default()
    }

    fn event(frequency: f64, duration_ms: f64) -> NoteEvent {
        NoteEvent {
            frequency,
            duration_ms,
            amplitude: -3.0,
        }
    }

    #[test]
    fn exact_detection_scores_every_note_correct() {
        let beat = 60000.0 / 90.0;
        let events = [event(440.0, beat), event(523.251, beat)];
        let report = compare_to_reference("a'4 c''4", "exact", &events, &config()).unwrap();
        assert_eq!(report.reference_notes, 2);
        assert_eq!(report.correct_detections, 2);
        assert_eq!(report.incorrect_detections(), 0);
        assert!(report.cents.mean < 1.0);
        assert!(report.rhythm.mean < 1.0);
    }

    #[test]
    fn missing_note_counts_as_incorrect() {
        let beat = 60000.0 / 90.0;
        let events = [event(440.0, beat)];
        let report = compare_to_reference("a'4 c''4", "missing", &events, &config()).unwrap();
        assert_eq!(report.correct_detections, 1);
        assert_eq!(report.incorrect_detections(), 1);
        // The undetected note contributes its whole duration as rhythm error.
        assert!(report.rhythm.absolute >= beat - 1.0);
    }

    #[test]
    fn off_pitch_detection_fails_the_cents_gate() {
        let beat = 60000.0 / 90.0;
        // A whole tone away from the reference pitch.
        let events = [event(493.88, beat)];
        let report = compare_to_reference("a'4", "detuned", &events, &config()).unwrap();
        assert_eq!(report.correct_detections, 0);
    }

    #[test]
    fn rests_never_match_a_pitch() {
        let beat = 60000.0 / 90.0;
        let events = [event(440.0, beat)];
        let report = compare_to_reference("r4", "rest", &events, &config()).unwrap();
        assert_eq!(report.correct_detections, 0);
    }

    #[test]
    fn empty_reference_melody_is_an_error() {
        assert!(compare_to_reference("", "empty", &[], &config()).is_err());
    }

    #[test]
    fn variance_uses_sample_counting() {
        let stats = ErrorStats::from_samples(&[1.0, 3.0]);
        assert!((stats.mean - 2.0).abs() < 1e-12);
        assert!((stats.variance - 2.0).abs() < 1e-12);
        assert!((stats.std_deviation() - 2f64.sqrt()).abs() < 1e-12);
    }
}
