//! Shared spectral helpers: windows, framed power spectra, mel filterbank, DCT.

use ndarray::Array2;
use rustfft::{num_complex::Complex32, FftPlanner};

/// Periodic Hann window (for FFT/STFT).
/// w[i] = 0.5 * (1 - cos(2πi/N))
#[inline]
pub fn hann_window_periodic(n: usize) -> Vec<f32> {
    match n {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let two_pi = std::f32::consts::PI * 2.0;
            let n_f = n as f32;
            (0..n)
                .map(|i| 0.5 * (1.0 - (two_pi * i as f32 / n_f).cos()))
                .collect()
        }
    }
}

/// Number of hop-spaced analysis frames; a short signal still yields one
/// (zero-padded) frame.
#[inline]
pub fn frame_count(sig_len: usize, n_fft: usize, hop: usize) -> usize {
    if sig_len < n_fft {
        1
    } else {
        1 + (sig_len - n_fft) / hop
    }
}

/// Hann-windowed framed power spectrum, shape (n_frames, n_fft/2 + 1).
pub fn power_spectrum_frames(sig: &[f32], n_fft: usize, hop: usize) -> Array2<f32> {
    let n_frames = frame_count(sig.len(), n_fft, hop);
    let n_freq = n_fft / 2 + 1;
    let window = hann_window_periodic(n_fft);

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n_fft);

    let mut out = Array2::<f32>::zeros((n_frames, n_freq));
    let mut buf = vec![Complex32::new(0.0, 0.0); n_fft];
    for frame in 0..n_frames {
        let start = frame * hop;
        for (i, slot) in buf.iter_mut().enumerate() {
            let v = sig.get(start + i).copied().unwrap_or(0.0);
            *slot = Complex32::new(v * window[i], 0.0);
        }
        fft.process(&mut buf);
        for k in 0..n_freq {
            out[(frame, k)] = buf[k].norm_sqr();
        }
    }
    out
}

/// Convert frequency in Hz to the Slaney mel scale.
pub fn hz_to_mel(hz: f32) -> f32 {
    let f_sp = 200.0 / 3.0;
    let min_log_hz = 1000.0;
    let min_log_mel = min_log_hz / f_sp;
    let logstep = (6.4f32).ln() / 27.0;
    if hz < min_log_hz {
        hz / f_sp
    } else {
        min_log_mel + (hz / min_log_hz).ln() / logstep
    }
}

/// Inverse of `hz_to_mel`.
pub fn mel_to_hz(mel: f32) -> f32 {
    let f_sp = 200.0 / 3.0;
    let min_log_hz = 1000.0;
    let min_log_mel = min_log_hz / f_sp;
    let logstep = (6.4f32).ln() / 27.0;
    if mel < min_log_mel {
        mel * f_sp
    } else {
        min_log_hz * (logstep * (mel - min_log_mel)).exp()
    }
}

/// Triangular mel filterbank with Slaney area normalization,
/// shape (n_mels, n_fft/2 + 1).
pub fn mel_filterbank(sr: u32, n_fft: usize, n_mels: usize, fmin: f32, fmax: f32) -> Array2<f32> {
    let n_freq = n_fft / 2 + 1;
    let mut fb = Array2::<f32>::zeros((n_mels, n_freq));
    if n_mels == 0 {
        return fb;
    }

    let fmax = fmax.min(sr as f32 / 2.0);
    let mel_min = hz_to_mel(fmin.max(0.0));
    let mel_max = hz_to_mel(fmax);
    let mel_step = (mel_max - mel_min) / (n_mels + 1) as f32;
    let band_edges: Vec<f32> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_min + mel_step * i as f32))
        .collect();

    let bin_hz = sr as f32 / n_fft as f32;
    for m in 0..n_mels {
        let lower = band_edges[m];
        let center = band_edges[m + 1];
        let upper = band_edges[m + 2];
        let enorm = 2.0 / (upper - lower).max(1e-6);
        for k in 0..n_freq {
            let f = k as f32 * bin_hz;
            let rise = (f - lower) / (center - lower).max(1e-6);
            let fall = (upper - f) / (upper - center).max(1e-6);
            let w = rise.min(fall).max(0.0);
            fb[(m, k)] = w * enorm;
        }
    }
    fb
}

/// Power to decibels relative to `ref_value`, floored at 1e-10.
#[inline]
pub fn power_to_db(x: f32, ref_value: f32) -> f32 {
    let amin = 1e-10f32;
    let ref_db = 10.0 * ref_value.max(amin).log10();
    10.0 * x.max(amin).log10() - ref_db
}

/// Orthonormal DCT-II of `x`, truncated to `n_out` coefficients.
pub fn dct_type_ii(x: &[f32], n_out: usize) -> Vec<f32> {
    let n = x.len() as f32;
    if x.is_empty() || n_out == 0 {
        return Vec::new();
    }
    let mut out = vec![0.0f32; n_out];
    for (k, out_val) in out.iter_mut().enumerate() {
        let mut sum = 0.0f32;
        for (i, v) in x.iter().enumerate() {
            let angle = std::f32::consts::PI / n * (i as f32 + 0.5) * k as f32;
            sum += v * angle.cos();
        }
        let scale = if k == 0 {
            (1.0 / n).sqrt()
        } else {
            (2.0 / n).sqrt()
        };
        *out_val = sum * scale;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn hann_window_is_symmetric_enough() {
        let w = hann_window_periodic(64);
        assert_eq!(w.len(), 64);
        assert_abs_diff_eq!(w[0], 0.0, epsilon = 1e-7);
        assert_abs_diff_eq!(w[32], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn mel_round_trip() {
        for &hz in &[100.0f32, 440.0, 1000.0, 4000.0] {
            let back = mel_to_hz(hz_to_mel(hz));
            assert_abs_diff_eq!(back, hz, epsilon = hz * 1e-4);
        }
    }

    #[test]
    fn filterbank_shape_and_nonnegativity() {
        let fb = mel_filterbank(8192, 2048, 128, 0.0, 4096.0);
        assert_eq!(fb.shape(), &[128, 1025]);
        assert!(fb.iter().all(|&v| v >= 0.0));
        // Every filter has some support.
        for m in 0..128 {
            let row_sum: f32 = fb.row(m).iter().sum();
            assert!(row_sum > 0.0, "empty mel filter {m}");
        }
    }

    #[test]
    fn power_spectrum_peaks_at_tone_bin() {
        let sr = 8192u32;
        let n_fft = 1024;
        let f = 512.0f32;
        let sig: Vec<f32> = (0..4096)
            .map(|i| (2.0 * std::f32::consts::PI * f * i as f32 / sr as f32).sin())
            .collect();
        let spec = power_spectrum_frames(&sig, n_fft, 512);
        let expected_bin = (f / sr as f32 * n_fft as f32).round() as usize;
        let row = spec.row(0);
        let (max_bin, _) = row
            .iter()
            .enumerate()
            .fold((0, f32::MIN), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc });
        assert!((max_bin as isize - expected_bin as isize).abs() <= 1);
    }

    #[test]
    fn short_signal_gets_one_padded_frame() {
        let spec = power_spectrum_frames(&[0.5f32; 100], 1024, 512);
        assert_eq!(spec.shape(), &[1, 513]);
    }

    #[test]
    fn dct_first_coefficient_is_scaled_mean() {
        let x = vec![1.0f32, 2.0, 3.0, 4.0];
        let c = dct_type_ii(&x, 4);
        assert_abs_diff_eq!(c[0], 10.0 / 2.0, epsilon = 1e-5); // sum / sqrt(n)
    }
}
