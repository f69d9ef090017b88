//! First-order time scattering with frequency-domain wavelet kernels.
//!
//! Each band is a one-sided Gaussian bandpass ψ̂ sampled on the FFT grid
//! (an analytic Morlet-style filter). The input is zero-padded to the FFT
//! length, transformed once, multiplied per band, inverse-transformed, and
//! the modulus is averaged over the signal support — with T equal to the
//! full length the lowpass stage collapses to a global mean.

use indicatif::{ProgressBar, ProgressStyle};
use ndarray::Array2;
use rustfft::{num_complex::Complex32, FftPlanner};
use std::sync::Arc;
use tracing::info;

use crate::error::Error;
use crate::features::FeatureExtractor;
use crate::synth::AudioBatch;

/// One-sided wavelet filterbank on the FFT grid.
pub struct ScatteringBank {
    pub sig_len: usize,
    pub nfft: usize,
    pub q: usize,
    /// Filters as dense one-sided gains, highest center frequency first.
    filters: Vec<Vec<f32>>,
    fft: Arc<dyn rustfft::Fft<f32>>,
    ifft: Arc<dyn rustfft::Fft<f32>>,
}

impl ScatteringBank {
    /// Build a bank with Q wavelets per octave spanning J = log2(nfft) − 1
    /// octaves below the top center frequency (0.35 in normalized units).
    pub fn new(sig_len: usize, q: usize) -> Self {
        let nfft = sig_len.next_power_of_two().max(2);
        let j = (nfft as f64).log2() as usize - 1;
        let n_filters = j * q;

        let xi_max = 0.35f64;
        let rel_bw = (2f64.powf(1.0 / q as f64) - 1.0) * 0.5;

        let mut filters = Vec::with_capacity(n_filters);
        for m in 0..n_filters {
            let xi = xi_max * 2f64.powf(-(m as f64) / q as f64);
            let sigma = (xi * rel_bw).max(1e-4);
            let mut gains = vec![0.0f32; nfft];
            // Analytic: support only on the positive half.
            for (k, gain) in gains.iter_mut().enumerate().take(nfft / 2 + 1) {
                let freq = k as f64 / nfft as f64;
                let z = (freq - xi) / sigma;
                *gain = (-0.5 * z * z).exp() as f32;
            }
            filters.push(gains);
        }

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(nfft);
        let ifft = planner.plan_fft_inverse(nfft);

        Self {
            sig_len,
            nfft,
            q,
            filters,
            fft,
            ifft,
        }
    }

    pub fn n_filters(&self) -> usize {
        self.filters.len()
    }

    /// Spectrum of the zero-padded input.
    fn spectrum(&self, sig: &[f32]) -> Vec<Complex32> {
        let mut buf = vec![Complex32::new(0.0, 0.0); self.nfft];
        for (slot, &v) in buf.iter_mut().zip(sig.iter()) {
            *slot = Complex32::new(v, 0.0);
        }
        self.fft.process(&mut buf);
        buf
    }

    /// Modulus of one band over the original signal support.
    fn band_modulus(&self, spectrum: &[Complex32], band: usize) -> Vec<f32> {
        let gains = &self.filters[band];
        let mut buf: Vec<Complex32> = spectrum
            .iter()
            .zip(gains.iter())
            .map(|(&x, &g)| x * g)
            .collect();
        self.ifft.process(&mut buf);
        let inv_n = 1.0 / self.nfft as f32;
        buf[..self.sig_len].iter().map(|c| c.norm() * inv_n).collect()
    }

    /// Zeroth- plus first-order scattering means: [S0, S1_0, S1_1, ...].
    pub fn first_order_means(&self, sig: &[f32]) -> Vec<f32> {
        let inv_len = 1.0 / self.sig_len as f32;
        let s0: f32 = sig.iter().sum::<f32>() * inv_len;

        let spectrum = self.spectrum(sig);
        let mut out = Vec::with_capacity(1 + self.n_filters());
        out.push(s0);
        for band in 0..self.n_filters() {
            let u = self.band_modulus(&spectrum, band);
            out.push(u.iter().sum::<f32>() * inv_len);
        }
        out
    }

    /// Frame-averaged scalogram, shape (n_filters, n_frames).
    pub fn scalogram(&self, sig: &[f32], n_frames: usize) -> Array2<f32> {
        let n_frames = n_frames.max(1).min(self.sig_len);
        let frame_len = self.sig_len / n_frames;
        let spectrum = self.spectrum(sig);

        let mut out = Array2::<f32>::zeros((self.n_filters(), n_frames));
        for band in 0..self.n_filters() {
            let u = self.band_modulus(&spectrum, band);
            for frame in 0..n_frames {
                let start = frame * frame_len;
                let end = if frame + 1 == n_frames {
                    self.sig_len
                } else {
                    start + frame_len
                };
                let mean: f32 =
                    u[start..end].iter().sum::<f32>() / (end - start).max(1) as f32;
                out[(band, frame)] = mean;
            }
        }
        out
    }
}

/// Time-scattering family: Q = 1, global temporal averaging.
pub struct TimeScatteringExtractor;

impl TimeScatteringExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TimeScatteringExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor for TimeScatteringExtractor {
    fn name(&self) -> &'static str {
        "TS"
    }

    fn extract(&self, batch: &AudioBatch) -> Result<Array2<f32>, Error> {
        let bank = ScatteringBank::new(batch.sig_len(), 1);
        let n_sigs = batch.n_sigs();
        let dim = 1 + bank.n_filters();
        info!(n_sigs, dim, "extracting time scattering");

        let pb = extractor_progress("time scattering", n_sigs);
        let mut table = Array2::<f32>::zeros((n_sigs, dim));
        for i in 0..n_sigs {
            let sig = batch.signal(i);
            let row = bank.first_order_means(&sig);
            for (k, &v) in row.iter().enumerate() {
                table[(i, k)] = v;
            }
            pb.inc(1);
        }
        pb.finish_and_clear();
        Ok(table)
    }
}

pub(crate) fn extractor_progress(label: &str, n: usize) -> ProgressBar {
    let pb = ProgressBar::new(n as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(label.to_string());
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::{generate_audio, ParamGrid};

    fn tone(f: f32, sr: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * f * i as f32 / sr).sin())
            .collect()
    }

    #[test]
    fn bank_dimensions() {
        let bank = ScatteringBank::new(1024, 1);
        assert_eq!(bank.nfft, 1024);
        // J = 9 octaves, Q = 1.
        assert_eq!(bank.n_filters(), 9);

        let bank8 = ScatteringBank::new(1000, 8);
        assert_eq!(bank8.nfft, 1024);
        assert_eq!(bank8.n_filters(), 72);
    }

    #[test]
    fn tone_energy_lands_in_matching_band() {
        let sr = 1024.0;
        let n = 1024;
        let bank = ScatteringBank::new(n, 1);
        // Normalized frequency 0.175 = xi_max / 2 → second filter (m = 1).
        let s = bank.first_order_means(&tone(0.175 * sr, sr, n));
        let coeffs = &s[1..];
        let (argmax, _) = coeffs
            .iter()
            .enumerate()
            .fold((0, f32::MIN), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc });
        assert_eq!(argmax, 1);
    }

    #[test]
    fn scalogram_shape_and_frame_averaging() {
        let bank = ScatteringBank::new(1024, 2);
        let sig = tone(128.0, 1024.0, 1024);
        let gram = bank.scalogram(&sig, 16);
        assert_eq!(gram.shape(), &[bank.n_filters(), 16]);
        // Frame means of a steady tone stay close to the global mean.
        let s1 = bank.first_order_means(&sig);
        for band in 0..bank.n_filters() {
            let frame_mean: f32 = gram.row(band).iter().sum::<f32>() / 16.0;
            assert!((frame_mean - s1[band + 1]).abs() < 1e-4);
        }
    }

    #[test]
    fn table_shape_is_n_sigs_by_bank_dim() {
        let grid = ParamGrid::log_spaced(2, (128.0, 256.0), (4.0, 16.0), (0.5, 4.0));
        let batch = generate_audio(&grid, 2.0, 1.0, 1024);
        let table = TimeScatteringExtractor::new().extract(&batch).unwrap();
        let bank = ScatteringBank::new(1024, 1);
        assert_eq!(table.dim(), (8, 1 + bank.n_filters()));
        assert!(table.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn modulus_is_nonnegative() {
        let bank = ScatteringBank::new(512, 1);
        let sig = tone(100.0, 512.0, 512);
        let spec = bank.spectrum(&sig);
        for band in 0..bank.n_filters() {
            assert!(bank.band_modulus(&spec, band).iter().all(|&v| v >= 0.0));
        }
    }
}
