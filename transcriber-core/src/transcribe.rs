//! # Note Segmentation and Duration Quantization
//!
//! Turns the stream of per-frame pitch detections into discrete note events
//! and renders event durations as tie-aware LilyPond duration expressions
//! quantized against the configured tempo and rhythm resolution.

use anyhow::{Result, bail};

use crate::NoteEvent;
use crate::pitch;

fn beat_ms(beats_per_minute: u32) -> f64 {
    60.0 * 1000.0 / beats_per_minute as f64
}

/// Number of whole grid steps nearest to `duration_ms`; exactly halfway
/// snaps down.
fn grid_units(duration_ms: f64, resolution_time: f64) -> u64 {
    let position = duration_ms / resolution_time;
    let lower = position.floor();
    let units = if position - lower <= 0.5 { lower } else { lower + 1.0 };
    units.max(0.0) as u64
}

/// Snaps a raw duration to the nearest multiple of the resolution grid.
///
/// The grid step is the beat length divided by the number of resolution
/// units per beat. A duration exactly halfway between two grid points snaps
/// down.
pub fn nearest_note_duration(
    duration_ms: f64,
    resolution: u32,
    beats_per_minute: u32,
    rhythm_denominator: u32,
) -> f64 {
    let time_per_beat = beat_ms(beats_per_minute);
    let resolution_time = time_per_beat / (resolution / rhythm_denominator) as f64;
    grid_units(duration_ms, resolution_time) as f64 * resolution_time
}

/// Renders a note symbol plus raw duration as a LilyPond duration expression.
///
/// The duration is quantized, then expressed as whole base measures tied
/// together, followed by the largest eighth/sixteenth/thirty-second
/// fragments covering the remaining fraction of a beat. Anything below a
/// thirty-second (an eighth of a beat) is discarded. Rests repeat without
/// tie markers. An empty symbol produces an empty expression.
pub fn note_length_expression(
    musical_note: &str,
    duration_ms: f64,
    resolution: u32,
    beats_per_minute: u32,
    rhythm_denominator: u32,
) -> Result<String> {
    if musical_note.is_empty() {
        return Ok(String::new());
    }
    let base_literal = match rhythm_denominator {
        2 => "2",
        4 => "4",
        8 => "8",
        other => bail!("unsupported rhythm denominator: {other}"),
    };
    let time_per_beat = beat_ms(beats_per_minute);
    // Working in whole grid units keeps a duration that lands exactly on a
    // beat boundary from drifting across it through rounding.
    let units_per_beat = (resolution / rhythm_denominator).max(1) as u64;
    let resolution_time = time_per_beat / units_per_beat as f64;
    let units = grid_units(duration_ms, resolution_time);

    let base_measure = format!("{musical_note}{base_literal}");
    let eighth_measure = format!("{musical_note}8");
    let sixteenth_measure = format!("{musical_note}16");
    let thirty_second_measure = format!("{musical_note}32");
    let is_rest = musical_note == "r";

    let mut expression = String::new();
    let whole_beats = (units / units_per_beat) as usize;
    for i in 0..whole_beats {
        if i == 0 {
            expression.push_str(&base_measure);
        } else {
            if !is_rest {
                expression.push('~');
            }
            expression.push(' ');
            expression.push_str(&base_measure);
        }
    }

    let mut remainder = (units % units_per_beat) as f64 / units_per_beat as f64;
    let mut pending_separator = whole_beats > 0;
    while remainder >= 0.125 {
        if pending_separator {
            if !is_rest {
                expression.push('~');
            }
            expression.push(' ');
        }
        if remainder >= 0.5 {
            expression.push_str(&eighth_measure);
            remainder -= 0.5;
        } else if remainder >= 0.25 {
            expression.push_str(&sixteenth_measure);
            remainder -= 0.25;
        } else {
            expression.push_str(&thirty_second_measure);
            remainder -= 0.125;
        }
        pending_separator = true;
    }
    Ok(expression)
}

/// The wall-clock duration a single duration expression denotes.
///
/// The leading integer literal must name a permitted subdivision (1, 2, 4,
/// 8, 16 or 32); anything else is a configuration error. Each trailing dot
/// adds half of the previous increment. An empty or all-space expression is
/// zero.
pub fn expression_duration_ms(
    expression: &str,
    beats_per_minute: u32,
    rhythm_denominator: u32,
) -> Result<f64> {
    if expression.chars().all(|c| c == ' ') {
        return Ok(0.0);
    }
    let digits: String = expression.chars().take_while(|c| c.is_ascii_digit()).collect();
    let literal: u32 = digits.parse().unwrap_or(0);
    if ![1, 2, 4, 8, 16, 32].contains(&literal) {
        bail!("invalid note length literal in {expression:?}");
    }
    let time_per_beat = beat_ms(beats_per_minute);
    let amount_beats = rhythm_denominator as f64 / literal as f64;
    let mut length = amount_beats * time_per_beat;
    if let Some(dot_start) = expression.find('.') {
        let dots = expression[dot_start..].chars().take_while(|&c| c == '.').count();
        for i in 0..dots {
            length += (amount_beats * time_per_beat) / 2f64.powi(i as i32 + 1);
        }
    }
    Ok(length)
}

/// Parses a space-separated melody into `(frequency, duration)` pairs.
///
/// Each token splits at its first digit into a pitch symbol and a duration
/// expression. Trailing tie markers are dropped. Rests and unrecognized
/// symbols carry a zero frequency.
pub fn parse_melody(
    melody: &str,
    tuning_pitch: f64,
    beats_per_minute: u32,
    rhythm_denominator: u32,
) -> Result<Vec<(f64, f64)>> {
    let mut notes = Vec::new();
    for token in melody.split_whitespace() {
        let token = token.trim_end_matches('~');
        let split = token
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit())
            .map_or(token.len(), |(i, _)| i);
        let (symbol, length) = token.split_at(split);
        let frequency = pitch::frequency_for_note(symbol, tuning_pitch).unwrap_or(0.0);
        let duration = expression_duration_ms(length, beats_per_minute, rhythm_denominator)?;
        notes.push((frequency, duration));
    }
    Ok(notes)
}

enum SegmenterState {
    Idle,
    Holding {
        symbol: String,
        frequency: f64,
        amplitude: f64,
        since_ms: f64,
    },
}

/// Accumulates per-frame detections into note events.
///
/// A new note must differ from the held one and the held one must have
/// lasted longer than the minimum hold gate before an event is emitted;
/// shorter blips extend the held note instead. Frames without a detectable
/// pitch never interrupt a held note.
pub struct NoteSegmenter {
    min_hold_ms: f64,
    state: SegmenterState,
}

impl NoteSegmenter {
    pub fn new(min_hold_ms: f64) -> Self {
        Self {
            min_hold_ms,
            state: SegmenterState::Idle,
        }
    }

    /// Feeds one detection frame; returns the completed event when the held
    /// note is superseded.
    pub fn observe(
        &mut self,
        frequency: f64,
        symbol: Option<&str>,
        amplitude: f64,
        at_ms: f64,
    ) -> Option<NoteEvent> {
        let Some(detected) = symbol else {
            return None;
        };
        match &self.state {
            SegmenterState::Idle => {
                self.state = SegmenterState::Holding {
                    symbol: detected.to_string(),
                    frequency,
                    amplitude,
                    since_ms: at_ms,
                };
                None
            }
            SegmenterState::Holding {
                symbol: held,
                frequency: held_frequency,
                amplitude: held_amplitude,
                since_ms,
            } => {
                if detected == held.as_str() || at_ms - since_ms <= self.min_hold_ms {
                    return None;
                }
                let event = NoteEvent {
                    frequency: *held_frequency,
                    duration_ms: at_ms - since_ms,
                    amplitude: *held_amplitude,
                };
                self.state = SegmenterState::Holding {
                    symbol: detected.to_string(),
                    frequency,
                    amplitude,
                    since_ms: at_ms,
                };
                Some(event)
            }
        }
    }

    /// Flushes the note still held when the sample stream ends.
    pub fn finish(self, final_ms: f64) -> Option<NoteEvent> {
        match self.state {
            SegmenterState::Idle => None,
            SegmenterState::Holding {
                frequency,
                amplitude,
                since_ms,
                ..
            } => {
                let duration_ms = final_ms - since_ms;
                (duration_ms > 0.0).then_some(NoteEvent {
                    frequency,
                    duration_ms,
                    amplitude,
                })
            }
        }
    }
}
