//! # Spectrum, Bandpass and Bin Selection
//!
//! Turns transform output into a per-bin log-amplitude array, limits it to
//! the audible band of interest, and selects the dominant bin (or the top-k
//! bins constrained to equal-tempered note frequencies for the chord
//! detector).

/// Per-bin log amplitude: `10 * log10(sqrt(re^2 + im^2))`.
///
/// A zero-magnitude bin yields `-inf`. That value is deliberately left in
/// place: every consumer compares amplitudes with strict `>` against finite
/// candidates, and the bandpass zeroes the silent band edges anyway.
pub fn log_amplitude_spectrum(real: &[f64], imag: &[f64]) -> Vec<f64> {
    real.iter()
        .zip(imag)
        .map(|(re, im)| 10.0 * (re * re + im * im).sqrt().log10())
        .collect()
}

/// Zeroes every bin whose center frequency lies below `low_hz` or at/above
/// `high_hz`, leaving the passband untouched.
pub fn bandpass(amps: &mut [f64], sample_rate: f64, low_hz: f64, high_hz: f64) {
    let n = amps.len();
    if n == 0 {
        return;
    }
    // Bin i covers center frequency i * rate / n; the low cutoff bin itself
    // still sits below low_hz, so it is zeroed inclusively.
    let min_bin = ((low_hz * n as f64 / sample_rate).floor() as usize).min(n - 1);
    let max_bin = ((high_hz * n as f64 / sample_rate).floor() as usize).min(n);
    for amp in &mut amps[..=min_bin] {
        *amp = 0.0;
    }
    for amp in &mut amps[max_bin..] {
        *amp = 0.0;
    }
}

/// Index of the loudest bin; ties resolve to the lowest index because the
/// comparison is strict.
pub fn peak_bin(amps: &[f64]) -> usize {
    let mut max_index = 0;
    let mut max_amp = f64::NEG_INFINITY;
    for (i, &amp) in amps.iter().enumerate() {
        if amp > max_amp {
            max_amp = amp;
            max_index = i;
        }
    }
    max_index
}

/// Greedy top-k bin selection constrained to the 72 equal-tempered pitch
/// candidates spanning six octaves around the tuning pitch.
///
/// Each candidate's theoretical bin is looked up in the amplitude array and
/// admitted by evicting the current minimum-amplitude member. Restricting
/// the search to note frequencies keeps window sidelobes from showing up as
/// separate notes.
pub fn note_peak_bins(
    amps: &[f64],
    num_bins: usize,
    sample_rate: f64,
    tuning_pitch: f64,
) -> Vec<usize> {
    let n = amps.len();
    let mut bins = vec![0usize; num_bins];
    if n == 0 || num_bins == 0 {
        return bins;
    }
    let semitone = 2f64.powf(1.0 / 12.0);
    for octave in 0..6 {
        for note in 0..12 {
            // tuning * 2^((note-9)/12) * 2^(octave-3)
            let base = tuning_pitch * semitone.powi(note - 9) * 2f64.powi(-3);
            let freq = base * 2f64.powi(octave);
            let candidate = ((freq * n as f64) / sample_rate).floor() as usize;
            if candidate >= n {
                continue;
            }
            let power = amps[candidate];
            let min_index = (0..num_bins)
                .min_by(|&a, &b| {
                    amps[bins[a]]
                        .partial_cmp(&amps[bins[b]])
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .unwrap_or(0);
            if amps[bins[min_index]] < power {
                bins[min_index] = candidate;
            }
        }
    }
    bins
}
