//! # Runtime Configuration
//!
//! Session parameters are loaded once (typically from a JSON file by the
//! front end), validated, and then passed by reference into the capture and
//! processing stages. Nothing in this crate reads process-wide state.

use anyhow::{Result, bail};
use serde::Deserialize;

/// Immutable-for-the-session runtime parameters.
///
/// Field defaults match the reference configuration: a 4096-sample analysis
/// window advanced in 128-sample steps at 44.1 kHz, A4 = 440 Hz with a
/// 40-cent acceptance gate, 90 BPM in 4/4 with sixteenth-note resolution.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Number of samples per analysis window (the transform length).
    pub sample_size: usize,
    /// Number of new samples captured per analysis hop. Must not exceed
    /// `sample_size`; consecutive windows overlap by the difference.
    pub step_size: usize,
    /// Capture rate in Hz.
    pub sample_rate: u32,
    /// Reference pitch for A4, in Hz.
    pub tuning_pitch: f64,
    /// Half-width of the note acceptance window, in cents.
    pub pitch_resolution_cents: f64,
    /// Name of the windowing function applied before the transform.
    /// Unknown names fall back to the rectangular window.
    pub window_function: String,
    /// Tempo in beats per minute.
    pub beats_per_minute: u32,
    /// Beats per measure.
    pub rhythm_numerator: u32,
    /// The note value that carries one beat (2, 4 or 8).
    pub rhythm_denominator: u32,
    /// The smallest distinguishable note value (e.g. 16 for sixteenths).
    pub rhythm_resolution: u32,
    /// Lower bandpass cutoff in Hz.
    pub low_frequency: f64,
    /// Upper bandpass cutoff in Hz.
    pub high_frequency: f64,
    /// Recording duration in seconds.
    pub recording_time_secs: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            sample_size: 4096,
            step_size: 128,
            sample_rate: 44100,
            tuning_pitch: 440.0,
            pitch_resolution_cents: 40.0,
            window_function: "rectangle".to_string(),
            beats_per_minute: 90,
            rhythm_numerator: 4,
            rhythm_denominator: 4,
            rhythm_resolution: 16,
            low_frequency: 100.0,
            high_frequency: 10000.0,
            recording_time_secs: 15,
        }
    }
}

impl RuntimeConfig {
    /// Checks the parameters a session cannot run without.
    pub fn validate(&self) -> Result<()> {
        if self.sample_size == 0 || self.step_size == 0 {
            bail!("sample size and step size must be non-zero");
        }
        if self.step_size > self.sample_size {
            bail!(
                "step size {} exceeds sample size {}",
                self.step_size,
                self.sample_size
            );
        }
        if self.beats_per_minute == 0 {
            bail!("tempo must be positive");
        }
        if !matches!(self.rhythm_denominator, 2 | 4 | 8) {
            bail!(
                "unsupported rhythm denominator {} (expected 2, 4 or 8)",
                self.rhythm_denominator
            );
        }
        if self.rhythm_resolution < self.rhythm_denominator {
            bail!(
                "rhythm resolution {} is coarser than the denominator {}",
                self.rhythm_resolution,
                self.rhythm_denominator
            );
        }
        if self.low_frequency >= self.high_frequency {
            bail!("bandpass cutoffs are inverted");
        }
        Ok(())
    }

    /// Duration of one beat in milliseconds.
    pub fn beat_ms(&self) -> f64 {
        60_000.0 / self.beats_per_minute as f64
    }

    /// Duration of the smallest distinguishable note, in milliseconds.
    pub fn min_note_ms(&self) -> f64 {
        self.beat_ms() / (self.rhythm_resolution / self.rhythm_denominator) as f64
    }
}

/// Song metadata handed to the notation renderer alongside the melody.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SongMeta {
    pub title: String,
    pub subtitle: String,
    pub composer: String,
    pub instrument: String,
    pub clef: String,
    pub key: String,
    pub scale_type: String,
    pub tempo_description: String,
}

impl Default for SongMeta {
    fn default() -> Self {
        Self {
            title: "Title".to_string(),
            subtitle: "Subtitle".to_string(),
            composer: "Composer".to_string(),
            instrument: "trumpet".to_string(),
            clef: "treble".to_string(),
            key: "c".to_string(),
            scale_type: "major".to_string(),
            tempo_description: "Allegro".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        RuntimeConfig::default().validate().unwrap();
    }

    #[test]
    fn step_size_must_not_exceed_sample_size() {
        let cfg = RuntimeConfig {
            sample_size: 1024,
            step_size: 2048,
            ..RuntimeConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn minimum_note_length_for_reference_tempo() {
        // 90 BPM, sixteenth resolution in 4/4: 666.67 ms / 4.
        let cfg = RuntimeConfig::default();
        assert!((cfg.min_note_ms() - 166.666).abs() < 0.01);
    }

    #[test]
    fn odd_denominator_is_rejected() {
        let cfg = RuntimeConfig {
            rhythm_denominator: 3,
            ..RuntimeConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
