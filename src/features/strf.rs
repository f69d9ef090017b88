//! Spectro-temporal receptive field model: an ERB-spaced gammatone filterbank,
//! per-channel envelopes, and a modulation analysis over temporal rates and
//! spectral scales. The per-signal feature is the flattened rate × scale
//! response with a per-rate energy column appended, averaged over time by
//! construction.

use ndarray::Array2;
use rustfft::{num_complex::Complex32, FftPlanner};
use tracing::info;

use crate::error::Error;
use crate::features::scattering::extractor_progress;
use crate::features::FeatureExtractor;
use crate::synth::AudioBatch;

const N_CHANNELS: usize = 42;
const N_ENV_FRAMES: usize = 128;
/// Temporal modulation rates [Hz].
const RATES: [f32; 5] = [2.0, 4.0, 8.0, 16.0, 32.0];
/// Spectral modulation scales [cycles per channel].
const SCALES: [f32; 4] = [0.05, 0.1, 0.2, 0.4];

/// Convert Hz to ERB-rate (Cam units, Glasberg & Moore 1990).
pub fn hz_to_erb(f_hz: f32) -> f32 {
    21.4 * (1.0 + 4.37 * f_hz / 1000.0).log10()
}

/// Convert ERB-rate (Cam) back to Hz.
pub fn erb_to_hz(e_cam: f32) -> f32 {
    (10f32.powf(e_cam / 21.4) - 1.0) * 1000.0 / 4.37
}

/// ERB bandwidth in Hz (Glasberg & Moore 1990).
#[inline]
pub fn erb_bw_hz(f_hz: f32) -> f32 {
    24.7 * (4.37 * f_hz / 1000.0 + 1.0)
}

/// `n` center frequencies uniformly spaced on the ERB-rate axis.
pub fn erb_centers(f_min: f32, f_max: f32, n: usize) -> Vec<f32> {
    let e_min = hz_to_erb(f_min);
    let e_max = hz_to_erb(f_max);
    match n {
        0 => Vec::new(),
        1 => vec![f_min],
        _ => (0..n)
            .map(|i| {
                let t = i as f32 / (n - 1) as f32;
                erb_to_hz(e_min + t * (e_max - e_min))
            })
            .collect(),
    }
}

/// Direct Form I biquad (a0 = 1).
#[derive(Clone, Copy, Debug)]
struct Biquad {
    b0: f32,
    a1: f32,
    a2: f32,
    z1: f32,
    z2: f32,
}

impl Biquad {
    #[inline]
    fn process_sample(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.z1;
        self.z1 = -self.a1 * y + self.z2;
        self.z2 = -self.a2 * y;
        y
    }
}

/// Two identical all-pole biquads realizing a 4th-order gammatone channel.
/// Pole radius follows the Patterson/Slaney bandwidth; per-section gain is
/// chosen for unity response at the center frequency.
fn design_gammatone_biquads(fc: f32, fs: f32) -> (Biquad, Biquad) {
    let theta = 2.0 * std::f32::consts::PI * fc / fs;
    let b_hz = 1.019 * erb_bw_hz(fc);
    let r = (-2.0 * std::f32::consts::PI * b_hz / fs).exp();
    let a1 = -2.0 * r * theta.cos();
    let a2 = r * r;

    let ejm1 = Complex32::new(theta.cos(), -theta.sin());
    let ejm2 = Complex32::new((2.0 * theta).cos(), -(2.0 * theta).sin());
    let den = Complex32::new(1.0, 0.0) + ejm1 * a1 + ejm2 * a2;
    let b0 = den.norm();

    let section = Biquad {
        b0,
        a1,
        a2,
        z1: 0.0,
        z2: 0.0,
    };
    (section, section)
}

fn gammatone_channel(input: &[f32], fc: f32, fs: f32) -> Vec<f32> {
    let (mut s1, mut s2) = design_gammatone_biquads(fc, fs);
    input
        .iter()
        .map(|&x| s2.process_sample(s1.process_sample(x)))
        .collect()
}

/// Rectified channel output averaged into `n_frames` envelope frames.
fn envelope_frames(channel: &[f32], n_frames: usize) -> Vec<f32> {
    let n = channel.len();
    let n_frames = n_frames.max(1).min(n);
    let frame_len = n / n_frames;
    (0..n_frames)
        .map(|frame| {
            let start = frame * frame_len;
            let end = if frame + 1 == n_frames {
                n
            } else {
                start + frame_len
            };
            channel[start..end].iter().map(|v| v.abs()).sum::<f32>()
                / (end - start).max(1) as f32
        })
        .collect()
}

pub struct StrfExtractor {
    n_channels: usize,
    n_env_frames: usize,
}

impl StrfExtractor {
    pub fn new() -> Self {
        Self {
            n_channels: N_CHANNELS,
            n_env_frames: N_ENV_FRAMES,
        }
    }

    pub fn feature_dim() -> usize {
        RATES.len() * (SCALES.len() + 1)
    }

    /// Cochleagram (n_channels, n_env_frames) of one signal.
    fn cochleagram(&self, sig: &[f32], sr: u32) -> Array2<f32> {
        let fs = sr as f32;
        let f_max = 0.45 * fs;
        let f_min = (f_max / 64.0).max(25.0);
        let centers = erb_centers(f_min, f_max, self.n_channels);

        let mut out = Array2::<f32>::zeros((self.n_channels, self.n_env_frames));
        for (ch, &fc) in centers.iter().enumerate() {
            let y = gammatone_channel(sig, fc, fs);
            let env = envelope_frames(&y, self.n_env_frames);
            for (t, &v) in env.iter().enumerate() {
                out[(ch, t)] = v;
            }
        }
        out
    }

    /// Rate × scale modulation response plus a per-rate energy column,
    /// flattened row-major over (rate, scale .. energy).
    fn modulation_response(&self, cochleagram: &Array2<f32>, frame_rate: f32) -> Vec<f32> {
        let n_ch = cochleagram.nrows();
        let n_t = cochleagram.ncols();

        // Mean-removed 2-D spectrum of the cochleagram.
        let mut planner = FftPlanner::<f32>::new();
        let fft_t = planner.plan_fft_forward(n_t);
        let fft_ch = planner.plan_fft_forward(n_ch);

        let mut rows: Vec<Vec<Complex32>> = Vec::with_capacity(n_ch);
        for ch in 0..n_ch {
            let mean: f32 = cochleagram.row(ch).iter().sum::<f32>() / n_t as f32;
            let mut row: Vec<Complex32> = (0..n_t)
                .map(|t| Complex32::new(cochleagram[(ch, t)] - mean, 0.0))
                .collect();
            fft_t.process(&mut row);
            rows.push(row);
        }
        let mut power = vec![vec![0.0f32; n_t]; n_ch];
        let mut col = vec![Complex32::new(0.0, 0.0); n_ch];
        for t in 0..n_t {
            for (ch, slot) in col.iter_mut().enumerate() {
                *slot = rows[ch][t];
            }
            fft_ch.process(&mut col);
            for ch in 0..n_ch {
                power[ch][t] = col[ch].norm_sqr();
            }
        }

        let norm = 1.0 / (n_ch as f32 * n_t as f32);
        let mut out = Vec::with_capacity(Self::feature_dim());
        for &rate_hz in &RATES {
            // Rate in cycles per envelope frame.
            let alpha = (rate_hz / frame_rate).min(0.5);
            let s_alpha = (alpha * 0.5).max(1e-3);

            let mut rate_energy = 0.0f32;
            for scale_idx in 0..=SCALES.len() {
                let mut energy = 0.0f32;
                for (ch, row) in power.iter().enumerate() {
                    let ff = if ch <= n_ch / 2 {
                        ch as f32 / n_ch as f32
                    } else {
                        ch as f32 / n_ch as f32 - 1.0
                    };
                    for (t, &p) in row.iter().enumerate().take(n_t / 2 + 1) {
                        let ft = t as f32 / n_t as f32;
                        let zt = (ft - alpha) / s_alpha;
                        let wt = (-0.5 * zt * zt).exp();
                        if scale_idx < SCALES.len() {
                            let beta = SCALES[scale_idx];
                            let s_beta = (beta * 0.5).max(1e-3);
                            // Both spectral orientations folded together.
                            let zf_pos = (ff - beta) / s_beta;
                            let zf_neg = (ff + beta) / s_beta;
                            let wf = (-0.5 * zf_pos * zf_pos).exp()
                                + (-0.5 * zf_neg * zf_neg).exp();
                            energy += wt * wf * p;
                        } else {
                            energy += wt * p;
                        }
                    }
                }
                if scale_idx < SCALES.len() {
                    out.push(energy.sqrt() * norm);
                } else {
                    rate_energy = energy;
                }
            }
            out.push(rate_energy.sqrt() * norm);
        }
        out
    }
}

impl Default for StrfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor for StrfExtractor {
    fn name(&self) -> &'static str {
        "STRF"
    }

    fn extract(&self, batch: &AudioBatch) -> Result<Array2<f32>, Error> {
        let n_sigs = batch.n_sigs();
        let dim = Self::feature_dim();
        let frame_rate = self.n_env_frames as f32 / batch.duration as f32;
        info!(n_sigs, dim, "extracting STRF responses");

        let pb = extractor_progress("strf", n_sigs);
        let mut table = Array2::<f32>::zeros((n_sigs, dim));
        for i in 0..n_sigs {
            let sig = batch.signal(i);
            let gram = self.cochleagram(&sig, batch.sr);
            let row = self.modulation_response(&gram, frame_rate);
            for (k, &v) in row.iter().enumerate() {
                table[(i, k)] = v;
            }
            pb.inc(1);
        }
        pb.finish_and_clear();
        Ok(table)
    }
}
