//! # Pitch Naming
//!
//! Conversion between frequencies and absolute LilyPond pitch symbols.
//! `a'` is the tuning pitch (A4 by default); apostrophes raise and commas
//! lower the octave, with the octave boundary at `c`.

/// Detected pitches below this are treated as silence.
pub const LOWER_FREQUENCY_LIMIT: f64 = 100.0;
/// Detected pitches above this are treated as silence.
pub const UPPER_FREQUENCY_LIMIT: f64 = 5000.0;

/// Note names spanning one octave from the tuning pitch to the next `a`.
const OCTAVE_SPAN: [&str; 13] = [
    "a", "ais", "b", "c", "cis", "d", "dis", "e", "f", "fis", "g", "gis", "a",
];

/// The twelve pitch classes in ascending order from the tuning pitch.
const PITCH_CLASSES: [&str; 12] = [
    "a", "ais", "b", "c", "cis", "d", "dis", "e", "f", "fis", "g", "gis",
];

/// Names the equal-tempered note nearest to `frequency`, as an absolute
/// LilyPond symbol.
///
/// Candidate notes are walked semitone by semitone away from the tuning
/// pitch over five octaves in each direction; a candidate matches when the
/// distance in cents falls within `(-cents_resolution, cents_resolution]`.
/// Frequencies outside the audible detection range, or farther than every
/// candidate allows, yield `None`.
pub fn note_for_frequency(
    frequency: f64,
    tuning_pitch: f64,
    cents_resolution: f64,
) -> Option<String> {
    if frequency < LOWER_FREQUENCY_LIMIT || frequency > UPPER_FREQUENCY_LIMIT {
        return None;
    }
    let semitone = 2f64.powf(1.0 / 12.0);
    if frequency <= tuning_pitch {
        for octave in 0..5usize {
            for note in 0..12usize {
                let candidate = tuning_pitch * semitone.powi(-((octave * 12 + note) as i32));
                let cents = 1200.0 * (frequency / candidate).log2();
                if cents > -cents_resolution && cents <= cents_resolution {
                    // Walking downwards, the name array is read backwards
                    // starting from the closing `a`.
                    let mut symbol = OCTAVE_SPAN[OCTAVE_SPAN.len() - note - 1].to_string();
                    if octave == 0 {
                        if note <= 9 {
                            symbol.push('\'');
                        }
                    } else {
                        let commas = if note <= 9 { octave - 1 } else { octave };
                        symbol.push_str(&",".repeat(commas));
                    }
                    return Some(symbol);
                }
            }
        }
    } else {
        for octave in 0..5usize {
            for note in 0..12usize {
                let candidate = tuning_pitch * semitone.powi((octave * 12 + note) as i32);
                let cents = 1200.0 * (frequency / candidate).log2();
                if cents > -cents_resolution && cents <= cents_resolution {
                    let mut symbol = PITCH_CLASSES[note].to_string();
                    // The names a, ais and b sit below the c octave boundary
                    // and carry one apostrophe less.
                    let apostrophes = if note <= 2 { octave + 1 } else { octave + 2 };
                    symbol.push_str(&"'".repeat(apostrophes));
                    return Some(symbol);
                }
            }
        }
    }
    None
}

/// The frequency an absolute LilyPond pitch symbol denotes.
///
/// The pitch class is the last name in [`PITCH_CLASSES`] that occurs inside
/// the symbol, so `cis` wins over its substring `c`. The octave markers
/// trailing the name then scale the base frequency. Symbols containing
/// whitespace or no recognizable name yield `None`.
pub fn frequency_for_note(symbol: &str, tuning_pitch: f64) -> Option<f64> {
    if symbol.contains(' ') {
        return None;
    }
    let mut matched: Option<(usize, &str)> = None;
    for (i, name) in PITCH_CLASSES.iter().enumerate() {
        if symbol.contains(name) {
            matched = Some((i, name));
        }
    }
    let (index, name) = matched?;
    let semitone = 2f64.powf(1.0 / 12.0);
    let mut frequency = if index <= 2 {
        tuning_pitch * semitone.powi(index as i32)
    } else {
        tuning_pitch * semitone.powi(-((12 - index) as i32))
    };
    let tail = symbol.len() - name.len();
    if symbol.contains("''") {
        frequency *= 2f64.powi(tail as i32 - 1);
    } else if tail == 0 {
        // A bare name sits one octave below its apostrophed form.
        frequency /= 2.0;
    } else if symbol.contains(',') {
        frequency *= 2f64.powi(-(tail as i32 + 1));
    }
    Some(frequency)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuning_pitch_names_itself() {
        assert_eq!(note_for_frequency(440.0, 440.0, 15.0).as_deref(), Some("a'"));
    }

    #[test]
    fn octaves_below_the_tuning_pitch() {
        assert_eq!(note_for_frequency(220.0, 440.0, 15.0).as_deref(), Some("a"));
        assert_eq!(note_for_frequency(110.0, 440.0, 15.0).as_deref(), Some("a,"));
        // Middle C keeps its apostrophe even though it lies below a'.
        assert_eq!(
            note_for_frequency(261.626, 440.0, 15.0).as_deref(),
            Some("c'")
        );
        assert_eq!(
            note_for_frequency(130.813, 440.0, 15.0).as_deref(),
            Some("c")
        );
    }

    #[test]
    fn octaves_above_the_tuning_pitch() {
        assert_eq!(note_for_frequency(880.0, 440.0, 15.0).as_deref(), Some("a''"));
        assert_eq!(
            note_for_frequency(466.164, 440.0, 15.0).as_deref(),
            Some("ais'")
        );
        // C5 crosses the octave boundary and gains a second apostrophe.
        assert_eq!(
            note_for_frequency(523.251, 440.0, 15.0).as_deref(),
            Some("c''")
        );
    }

    #[test]
    fn out_of_range_frequencies_are_silence() {
        assert_eq!(note_for_frequency(50.0, 440.0, 15.0), None);
        assert_eq!(note_for_frequency(6000.0, 440.0, 15.0), None);
    }

    #[test]
    fn detuned_pitch_within_resolution_still_matches() {
        // 10 cents sharp of A4 stays inside a 15 cent window.
        let sharp = 440.0 * 2f64.powf(10.0 / 1200.0);
        assert_eq!(note_for_frequency(sharp, 440.0, 15.0).as_deref(), Some("a'"));
        // 20 cents sharp falls between candidates and matches nothing.
        let sharper = 440.0 * 2f64.powf(20.0 / 1200.0);
        assert_eq!(note_for_frequency(sharper, 440.0, 15.0), None);
    }

    #[test]
    fn symbol_frequencies_match_reference_pitches() {
        let a4 = frequency_for_note("a'", 440.0).unwrap();
        assert!((a4 - 440.0).abs() < 1e-9);
        let a3 = frequency_for_note("a", 440.0).unwrap();
        assert!((a3 - 220.0).abs() < 1e-9);
        let a5 = frequency_for_note("a''", 440.0).unwrap();
        assert!((a5 - 880.0).abs() < 1e-9);
        let a2 = frequency_for_note("a,", 440.0).unwrap();
        assert!((a2 - 110.0).abs() < 1e-9);
        let c4 = frequency_for_note("c'", 440.0).unwrap();
        assert!((c4 - 261.626).abs() < 0.01);
        let gis3 = frequency_for_note("gis", 440.0).unwrap();
        assert!((gis3 - 207.652).abs() < 0.01);
    }

    #[test]
    fn sharp_names_shadow_their_natural_substrings() {
        let cis4 = frequency_for_note("cis'", 440.0).unwrap();
        assert!((cis4 - 277.183).abs() < 0.01);
    }

    #[test]
    fn whitespace_is_not_a_pitch() {
        assert_eq!(frequency_for_note("a '", 440.0), None);
        assert_eq!(frequency_for_note("", 440.0), None);
    }

    #[test]
    fn naming_and_frequency_lookup_round_trip() {
        for symbol in ["a'", "a", "c'", "e''", "g,", "ais'"] {
            let freq = frequency_for_note(symbol, 440.0).unwrap();
            if !(LOWER_FREQUENCY_LIMIT..=UPPER_FREQUENCY_LIMIT).contains(&freq) {
                continue;
            }
            assert_eq!(
                note_for_frequency(freq, 440.0, 15.0).as_deref(),
                Some(symbol)
            );
        }
    }
}
