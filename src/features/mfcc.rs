//! Mean mel-cepstral coefficients per signal.

use ndarray::Array2;
use tracing::info;

use crate::error::Error;
use crate::features::dsp::{dct_type_ii, mel_filterbank, power_spectrum_frames, power_to_db};
use crate::features::FeatureExtractor;
use crate::synth::AudioBatch;

#[derive(Debug, Clone)]
pub struct MfccExtractor {
    pub n_fft: usize,
    pub hop: usize,
    pub n_mels: usize,
    pub n_mfcc: usize,
}

impl Default for MfccExtractor {
    fn default() -> Self {
        Self {
            n_fft: 2048,
            hop: 512,
            n_mels: 128,
            n_mfcc: 20,
        }
    }
}

impl MfccExtractor {
    /// Log-mel spectrogram (n_frames, n_mels) of one signal, floored 80 dB
    /// below the spectrogram-wide peak (librosa-style `top_db`).
    fn log_mel_frames(&self, sig: &[f32], sr: u32) -> Array2<f32> {
        let spec = power_spectrum_frames(sig, self.n_fft, self.hop);
        let fb = mel_filterbank(sr, self.n_fft, self.n_mels, 0.0, sr as f32 / 2.0);
        let n_frames = spec.nrows();

        let mut log_mel = Array2::<f32>::zeros((n_frames, self.n_mels));
        let mut max_db = f32::NEG_INFINITY;
        for t in 0..n_frames {
            for m in 0..self.n_mels {
                let mut acc = 0.0f32;
                for k in 0..spec.ncols() {
                    acc += fb[(m, k)] * spec[(t, k)];
                }
                let db = power_to_db(acc, 1.0);
                log_mel[(t, m)] = db;
                if db > max_db {
                    max_db = db;
                }
            }
        }
        let floor = max_db - 80.0;
        log_mel.mapv_inplace(|v| v.max(floor));
        log_mel
    }

    /// Per-frame MFCC matrix (n_frames, n_mfcc) for a single signal.
    fn frames(&self, sig: &[f32], sr: u32) -> Array2<f32> {
        let log_mel = self.log_mel_frames(sig, sr);
        let n_frames = log_mel.nrows();

        let mut out = Array2::<f32>::zeros((n_frames, self.n_mfcc));
        let mut row_buf = vec![0.0f32; self.n_mels];
        for t in 0..n_frames {
            for (m, slot) in row_buf.iter_mut().enumerate() {
                *slot = log_mel[(t, m)];
            }
            let coeffs = dct_type_ii(&row_buf, self.n_mfcc);
            for (k, &c) in coeffs.iter().enumerate() {
                out[(t, k)] = c;
            }
        }
        out
    }
}

impl FeatureExtractor for MfccExtractor {
    fn name(&self) -> &'static str {
        "MFCC"
    }

    fn extract(&self, batch: &AudioBatch) -> Result<Array2<f32>, Error> {
        let n_sigs = batch.n_sigs();
        info!(n_sigs, n_mfcc = self.n_mfcc, "extracting MFCCs");

        let mut table = Array2::<f32>::zeros((n_sigs, self.n_mfcc));
        for i in 0..n_sigs {
            let sig = batch.signal(i);
            let frames = self.frames(&sig, batch.sr);
            let n_frames = frames.nrows() as f32;
            for k in 0..self.n_mfcc {
                let mean: f32 = frames.column(k).iter().sum::<f32>() / n_frames;
                table[(i, k)] = mean;
            }
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::{generate_audio, ParamGrid};
    use approx::assert_abs_diff_eq;

    fn tiny_batch() -> AudioBatch {
        let grid = ParamGrid::log_spaced(2, (256.0, 448.0), (4.0, 16.0), (0.5, 4.0));
        generate_audio(&grid, 2.0, 1.0, 1024)
    }

    #[test]
    fn table_shape_is_n_sigs_by_n_mfcc() {
        let batch = tiny_batch();
        let table = MfccExtractor::default().extract(&batch).unwrap();
        assert_eq!(table.shape(), &[8, 20]);
        assert!(table.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn distinct_parameters_give_distinct_rows() {
        let batch = tiny_batch();
        let table = MfccExtractor::default().extract(&batch).unwrap();
        let a = table.row(0);
        let b = table.row(7);
        let dist: f32 = a
            .iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt();
        assert!(dist > 1e-3, "rows for opposite grid corners too similar");
    }

    #[test]
    fn dynamic_range_floor_is_global() {
        // Loud tone followed by silence: the silent frames must floor against
        // the spectrogram-wide peak, not their own frame maximum.
        let n = 4096;
        let mut sig = vec![0.0f32; n];
        for (i, v) in sig.iter_mut().take(n / 2).enumerate() {
            *v = (2.0 * std::f32::consts::PI * 200.0 * i as f32 / 1024.0).sin();
        }
        let log_mel = MfccExtractor::default().log_mel_frames(&sig, 1024);
        let max = log_mel.iter().cloned().fold(f32::MIN, f32::max);
        let min = log_mel.iter().cloned().fold(f32::MAX, f32::min);
        assert_abs_diff_eq!(min, max - 80.0, epsilon = 1e-3);
        assert!(log_mel.iter().all(|&v| v >= max - 80.0 - 1e-3));
    }

    #[test]
    fn extraction_is_deterministic() {
        let batch = tiny_batch();
        let ext = MfccExtractor::default();
        let a = ext.extract(&batch).unwrap();
        let b = ext.extract(&batch).unwrap();
        assert_eq!(a, b);
    }
}
