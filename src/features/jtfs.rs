//! Joint time-frequency scattering: a Q = 8 scalogram followed by joint
//! modulation wavelets over (temporal rate × log-frequency scale), with an
//! up/down orientation pair per (rate, scale). The frequential axis is
//! zero-padded before its transform.

use ndarray::Array2;
use rustfft::{num_complex::Complex32, FftPlanner};
use tracing::info;

use crate::error::Error;
use crate::features::scattering::{extractor_progress, ScatteringBank};
use crate::features::FeatureExtractor;
use crate::synth::AudioBatch;

const Q_FR: usize = 8;
const N_TIME_FRAMES: usize = 64;
const N_RATES: usize = 4;
const N_SCALES: usize = 3;

pub struct JtfsExtractor {
    n_time_frames: usize,
}

impl JtfsExtractor {
    pub fn new() -> Self {
        Self {
            n_time_frames: N_TIME_FRAMES,
        }
    }

    pub fn feature_dim(sig_len: usize) -> usize {
        let bank = ScatteringBank::new(sig_len, Q_FR);
        1 + bank.n_filters() + 2 * N_RATES * N_SCALES
    }

    /// Joint coefficients of one scalogram: per (rate, scale, orientation)
    /// the band-weighted modulation energy of the 2-D spectrum.
    fn joint_coefficients(&self, gram: &Array2<f32>) -> Vec<f32> {
        let n_l1 = gram.nrows();
        let n_t = gram.ncols();
        // Pad the frequential axis by 2x before its transform.
        let n_fr = (2 * n_l1).next_power_of_two();

        // Remove the per-band mean so the joint stage sees modulation, not
        // the first-order energy profile.
        let mut centered = Array2::<f32>::zeros((n_fr, n_t));
        for b in 0..n_l1 {
            let mean: f32 = gram.row(b).iter().sum::<f32>() / n_t as f32;
            for t in 0..n_t {
                centered[(b, t)] = gram[(b, t)] - mean;
            }
        }

        let mut planner = FftPlanner::<f32>::new();
        let fft_t = planner.plan_fft_forward(n_t);
        let fft_fr = planner.plan_fft_forward(n_fr);

        // 2-D spectrum: FFT along time, then along the padded band axis.
        let mut rows: Vec<Vec<Complex32>> = Vec::with_capacity(n_fr);
        for b in 0..n_fr {
            let mut row: Vec<Complex32> = (0..n_t)
                .map(|t| Complex32::new(centered[(b, t)], 0.0))
                .collect();
            fft_t.process(&mut row);
            rows.push(row);
        }
        let mut power = vec![vec![0.0f32; n_t]; n_fr];
        let mut col = vec![Complex32::new(0.0, 0.0); n_fr];
        for t in 0..n_t {
            for (b, slot) in col.iter_mut().enumerate() {
                *slot = rows[b][t];
            }
            fft_fr.process(&mut col);
            for b in 0..n_fr {
                power[b][t] = col[b].norm_sqr();
            }
        }

        // Dyadic band centers on each axis, in cycles per sample of that axis.
        let rel_bw = 0.5;
        let mut out = Vec::with_capacity(2 * N_RATES * N_SCALES);
        let norm = 1.0 / (n_fr as f32 * n_t as f32);
        for r in 0..N_RATES {
            let alpha = 0.25 * 0.5f32.powi(r as i32);
            let s_alpha = (alpha * rel_bw).max(1e-3);
            for s in 0..N_SCALES {
                let beta = 0.25 * 0.5f32.powi(s as i32);
                let s_beta = (beta * rel_bw).max(1e-3);
                // Orientation: spectral modulation rising (+) or falling (−)
                // with time, i.e. the two (rate, scale) sign quadrants.
                for sign in [1.0f32, -1.0] {
                    let mut energy = 0.0f32;
                    for (b, row) in power.iter().enumerate() {
                        let ff = signed_freq(b, n_fr);
                        let zf = (ff - sign * beta) / s_beta;
                        let wf = (-0.5 * zf * zf).exp();
                        if wf < 1e-6 {
                            continue;
                        }
                        // Positive temporal half only; the negative half is
                        // its conjugate mirror.
                        for (t, &p) in row.iter().enumerate().take(n_t / 2 + 1) {
                            let ft = t as f32 / n_t as f32;
                            let zt = (ft - alpha) / s_alpha;
                            let wt = (-0.5 * zt * zt).exp();
                            energy += wf * wt * p;
                        }
                    }
                    out.push(energy.sqrt() * norm);
                }
            }
        }
        out
    }
}

impl Default for JtfsExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn signed_freq(bin: usize, n: usize) -> f32 {
    if bin <= n / 2 {
        bin as f32 / n as f32
    } else {
        bin as f32 / n as f32 - 1.0
    }
}

impl FeatureExtractor for JtfsExtractor {
    fn name(&self) -> &'static str {
        "JTFS"
    }

    fn extract(&self, batch: &AudioBatch) -> Result<Array2<f32>, Error> {
        let bank = ScatteringBank::new(batch.sig_len(), Q_FR);
        let n_sigs = batch.n_sigs();
        let dim = 1 + bank.n_filters() + 2 * N_RATES * N_SCALES;
        info!(n_sigs, dim, q = Q_FR, "extracting joint time-frequency scattering");

        let pb = extractor_progress("jtfs", n_sigs);
        let mut table = Array2::<f32>::zeros((n_sigs, dim));
        for i in 0..n_sigs {
            let sig = batch.signal(i);
            let inv_len = 1.0 / sig.len() as f32;
            let s0: f32 = sig.iter().sum::<f32>() * inv_len;
            table[(i, 0)] = s0;

            let gram = bank.scalogram(&sig, self.n_time_frames);
            for b in 0..bank.n_filters() {
                let s1: f32 = gram.row(b).iter().sum::<f32>() / gram.ncols() as f32;
                table[(i, 1 + b)] = s1;
            }
            let joint = self.joint_coefficients(&gram);
            for (k, &v) in joint.iter().enumerate() {
                table[(i, 1 + bank.n_filters() + k)] = v;
            }
            pb.inc(1);
        }
        pb.finish_and_clear();
        Ok(table)
    }
}
