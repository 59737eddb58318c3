//! # Spectral Transform Engine
//!
//! In-place forward and inverse discrete Fourier transforms over split
//! real/imaginary `f64` slices. Power-of-two lengths go through an
//! iterative radix-2 algorithm with a bit-reversal permutation; any other
//! length is handled by Bluestein's algorithm, which embeds the sequence in
//! a power-of-two-length convolution against a chirp sequence.
//!
//! `transform` followed by `inverse_transform` reproduces the input up to
//! floating-point rounding for all lengths, including zero (a no-op).

/// Computes the forward DFT of `(real, imag)` in place.
///
/// # Panics
/// If the slices have different lengths.
pub fn transform(real: &mut [f64], imag: &mut [f64]) {
    assert_eq!(real.len(), imag.len(), "split slices must have equal length");
    let n = real.len();
    if n == 0 {
        return;
    }
    if n.is_power_of_two() {
        transform_radix2(real, imag);
    } else {
        transform_bluestein(real, imag);
    }
}

/// Computes the inverse DFT of `(real, imag)` in place, scaled by `1/N`.
///
/// Swapping the real and imaginary planes around a forward transform is the
/// conjugate-forward-conjugate composition.
pub fn inverse_transform(real: &mut [f64], imag: &mut [f64]) {
    let n = real.len();
    if n == 0 {
        return;
    }
    transform(imag, real);
    let scale = 1.0 / n as f64;
    for (re, im) in real.iter_mut().zip(imag.iter_mut()) {
        *re *= scale;
        *im *= scale;
    }
}

/// Radix-2 DIT transform. Length must be a power of two.
fn transform_radix2(real: &mut [f64], imag: &mut [f64]) {
    let n = real.len();
    if n <= 1 {
        return;
    }
    let levels = n.trailing_zeros();

    let mut cos_table = Vec::with_capacity(n / 2);
    let mut sin_table = Vec::with_capacity(n / 2);
    for i in 0..n / 2 {
        let angle = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
        cos_table.push(angle.cos());
        sin_table.push(angle.sin());
    }

    // Bit-reversed addressing permutation.
    for i in 0..n {
        let j = reverse_bits(i, levels);
        if j > i {
            real.swap(i, j);
            imag.swap(i, j);
        }
    }

    // Cooley-Tukey butterfly stages.
    let mut size = 2;
    loop {
        let half_size = size / 2;
        let table_step = n / size;
        for chunk in (0..n).step_by(size) {
            let mut k = 0;
            for j in chunk..chunk + half_size {
                let l = j + half_size;
                let tp_re = real[l] * cos_table[k] + imag[l] * sin_table[k];
                let tp_im = -real[l] * sin_table[k] + imag[l] * cos_table[k];
                real[l] = real[j] - tp_re;
                imag[l] = imag[j] - tp_im;
                real[j] += tp_re;
                imag[j] += tp_im;
                k += table_step;
            }
        }
        if size == n {
            break;
        }
        size *= 2;
    }
}

/// Bluestein chirp-z transform for arbitrary lengths.
fn transform_bluestein(real: &mut [f64], imag: &mut [f64]) {
    let n = real.len();
    // Convolution length: smallest power of two holding 2n + 1 points.
    let m = (2 * n + 1).next_power_of_two();

    // Chirp trigonometric tables; i*i mod 2n keeps the angle argument exact.
    let mut cos_table = Vec::with_capacity(n);
    let mut sin_table = Vec::with_capacity(n);
    for i in 0..n {
        let j = (i * i) % (2 * n);
        let angle = std::f64::consts::PI * j as f64 / n as f64;
        cos_table.push(angle.cos());
        sin_table.push(angle.sin());
    }

    // Premultiply the input by the conjugate chirp.
    let mut a_real = vec![0.0; m];
    let mut a_imag = vec![0.0; m];
    for i in 0..n {
        a_real[i] = real[i] * cos_table[i] + imag[i] * sin_table[i];
        a_imag[i] = -real[i] * sin_table[i] + imag[i] * cos_table[i];
    }

    // The chirp itself, wrapped symmetrically for the circular convolution.
    let mut b_real = vec![0.0; m];
    let mut b_imag = vec![0.0; m];
    b_real[0] = cos_table[0];
    b_imag[0] = sin_table[0];
    for i in 1..n {
        b_real[i] = cos_table[i];
        b_real[m - i] = cos_table[i];
        b_imag[i] = sin_table[i];
        b_imag[m - i] = sin_table[i];
    }

    let mut c_real = vec![0.0; m];
    let mut c_imag = vec![0.0; m];
    convolve_complex(&a_real, &a_imag, &b_real, &b_imag, &mut c_real, &mut c_imag);

    // Twiddle correction back to the requested length.
    for i in 0..n {
        real[i] = c_real[i] * cos_table[i] + c_imag[i] * sin_table[i];
        imag[i] = -c_real[i] * sin_table[i] + c_imag[i] * cos_table[i];
    }
}

/// Circular convolution of two complex sequences of equal length.
pub fn convolve_complex(
    x_real: &[f64],
    x_imag: &[f64],
    y_real: &[f64],
    y_imag: &[f64],
    out_real: &mut [f64],
    out_imag: &mut [f64],
) {
    let n = x_real.len();
    let mut xr = x_real.to_vec();
    let mut xi = x_imag.to_vec();
    let mut yr = y_real.to_vec();
    let mut yi = y_imag.to_vec();

    transform(&mut xr, &mut xi);
    transform(&mut yr, &mut yi);
    for i in 0..n {
        let temp = xr[i] * yr[i] - xi[i] * yi[i];
        xi[i] = xi[i] * yr[i] + xr[i] * yi[i];
        xr[i] = temp;
    }
    // Unscaled inverse; the 1/n normalization is folded in below.
    transform(&mut xi, &mut xr);
    for i in 0..n {
        out_real[i] = xr[i] / n as f64;
        out_imag[i] = xi[i] / n as f64;
    }
}

fn reverse_bits(mut x: usize, bits: u32) -> usize {
    let mut result = 0;
    for _ in 0..bits {
        result = (result << 1) | (x & 1);
        x >>= 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustfft::{FftPlanner, num_complex::Complex};

    /// Deterministic pseudo-random signal, good enough for exercising the
    /// transform without pulling in an RNG.
    fn test_signal(n: usize, seed: u64) -> (Vec<f64>, Vec<f64>) {
        let mut state = seed;
        let mut step = || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((state >> 33) as f64 / (1u64 << 31) as f64) - 1.0
        };
        let real = (0..n).map(|_| step()).collect();
        let imag = (0..n).map(|_| step()).collect();
        (real, imag)
    }

    fn assert_close(actual: &[f64], expected: &[f64], tolerance: f64) {
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < tolerance, "{a} != {e}");
        }
    }

    #[test]
    fn zero_length_is_a_degenerate_success() {
        let mut real: Vec<f64> = vec![];
        let mut imag: Vec<f64> = vec![];
        transform(&mut real, &mut imag);
        inverse_transform(&mut real, &mut imag);
    }

    #[test]
    fn impulse_transforms_to_all_ones() {
        let mut real = vec![0.0; 8];
        let mut imag = vec![0.0; 8];
        real[0] = 1.0;
        transform(&mut real, &mut imag);
        assert_close(&real, &[1.0; 8], 1e-12);
        assert_close(&imag, &[0.0; 8], 1e-12);
    }

    #[test]
    fn round_trip_power_of_two() {
        let (mut real, mut imag) = test_signal(1024, 7);
        let original_real = real.clone();
        let original_imag = imag.clone();
        transform(&mut real, &mut imag);
        inverse_transform(&mut real, &mut imag);
        assert_close(&real, &original_real, 1e-9);
        assert_close(&imag, &original_imag, 1e-9);
    }

    #[test]
    fn round_trip_arbitrary_length() {
        let (mut real, mut imag) = test_signal(1000, 11);
        let original_real = real.clone();
        let original_imag = imag.clone();
        transform(&mut real, &mut imag);
        inverse_transform(&mut real, &mut imag);
        assert_close(&real, &original_real, 1e-9);
        assert_close(&imag, &original_imag, 1e-9);
    }

    #[test]
    fn matches_rustfft_for_radix2_lengths() {
        let n = 64;
        let (mut real, mut imag) = test_signal(n, 3);
        let mut reference: Vec<Complex<f64>> = real
            .iter()
            .zip(&imag)
            .map(|(&re, &im)| Complex { re, im })
            .collect();

        transform(&mut real, &mut imag);
        FftPlanner::new().plan_fft_forward(n).process(&mut reference);

        for i in 0..n {
            assert!((real[i] - reference[i].re).abs() < 1e-9);
            assert!((imag[i] - reference[i].im).abs() < 1e-9);
        }
    }

    #[test]
    fn matches_rustfft_for_bluestein_lengths() {
        let n = 100;
        let (mut real, mut imag) = test_signal(n, 5);
        let mut reference: Vec<Complex<f64>> = real
            .iter()
            .zip(&imag)
            .map(|(&re, &im)| Complex { re, im })
            .collect();

        transform(&mut real, &mut imag);
        FftPlanner::new().plan_fft_forward(n).process(&mut reference);

        for i in 0..n {
            assert!((real[i] - reference[i].re).abs() < 1e-8);
            assert!((imag[i] - reference[i].im).abs() < 1e-8);
        }
    }

    #[test]
    fn pure_tone_peaks_in_its_bin() {
        let n = 256;
        let cycles = 13;
        let mut real: Vec<f64> = (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * cycles as f64 * i as f64 / n as f64).sin())
            .collect();
        let mut imag = vec![0.0; n];
        transform(&mut real, &mut imag);
        let magnitudes: Vec<f64> = real
            .iter()
            .zip(&imag)
            .map(|(re, im)| (re * re + im * im).sqrt())
            .collect();
        let peak = magnitudes[..n / 2]
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, cycles);
    }
}
