//! Pretrained audio embedding: a log-mel frontend feeding a small ReLU MLP
//! whose weights are loaded from a binary file. Signals are embedded in
//! batches of 32 frames-of-signals to bound peak memory. Without a weights
//! file the extractor reports itself unavailable and the run skips it.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::config::SweepConfig;
use crate::error::Error;
use crate::features::dsp::{mel_filterbank, power_spectrum_frames, power_to_db};
use crate::features::scattering::extractor_progress;
use crate::features::FeatureExtractor;
use crate::synth::AudioBatch;

/// Log-mel frontend constants (fixed by the pretrained weights).
const EMB_N_FFT: usize = 512;
const EMB_HOP: usize = 160;
const EMB_N_MELS: usize = 64;
/// Signals per forward batch.
const BATCH: usize = 32;

const MAGIC: &[u8; 4] = b"CMEB";
const VERSION: u32 = 1;

/// Two-layer MLP applied per mel frame.
pub struct EmbeddingModel {
    pub in_dim: usize,
    pub hidden_dim: usize,
    pub out_dim: usize,
    /// (hidden_dim, in_dim), row-major.
    w1: Vec<f32>,
    b1: Vec<f32>,
    /// (out_dim, hidden_dim), row-major.
    w2: Vec<f32>,
    b2: Vec<f32>,
}

impl EmbeddingModel {
    /// Load weights from a `CMEB` file. Header: magic, version, in_dim,
    /// hidden_dim, out_dim (u32 LE each), then f32 LE payload
    /// W1, b1, W2, b2 in row-major order.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let bad = |reason: &str| Error::BadModelFile {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        let mut file = fs::File::open(path)?;
        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)
            .map_err(|_| bad("file too short for header"))?;
        if &magic != MAGIC {
            return Err(bad("bad magic, expected CMEB"));
        }

        let read_u32 = |f: &mut fs::File| -> Result<u32, Error> {
            let mut buf = [0u8; 4];
            f.read_exact(&mut buf)
                .map_err(|_| bad("file too short for header"))?;
            Ok(u32::from_le_bytes(buf))
        };
        let version = read_u32(&mut file)?;
        if version != VERSION {
            return Err(bad("unsupported version"));
        }
        let in_dim = read_u32(&mut file)? as usize;
        let hidden_dim = read_u32(&mut file)? as usize;
        let out_dim = read_u32(&mut file)? as usize;
        if in_dim != EMB_N_MELS {
            return Err(bad("input dimension does not match the mel frontend"));
        }
        if hidden_dim == 0 || out_dim == 0 {
            return Err(bad("zero-sized layer"));
        }

        let n_params = hidden_dim * in_dim + hidden_dim + out_dim * hidden_dim + out_dim;
        let mut payload = Vec::new();
        file.read_to_end(&mut payload)?;
        if payload.len() != n_params * 4 {
            return Err(bad("payload length does not match the header dimensions"));
        }
        let mut floats = payload
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]));
        let mut take = |n: usize| -> Vec<f32> { floats.by_ref().take(n).collect() };

        let w1 = take(hidden_dim * in_dim);
        let b1 = take(hidden_dim);
        let w2 = take(out_dim * hidden_dim);
        let b2 = take(out_dim);
        if w1.iter().chain(&b1).chain(&w2).chain(&b2).any(|v| !v.is_finite()) {
            return Err(bad("non-finite weight"));
        }

        Ok(Self {
            in_dim,
            hidden_dim,
            out_dim,
            w1,
            b1,
            w2,
            b2,
        })
    }

    /// Write the model back out in the `CMEB` format.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let mut file = fs::File::create(path)?;
        file.write_all(MAGIC)?;
        for v in [
            VERSION,
            self.in_dim as u32,
            self.hidden_dim as u32,
            self.out_dim as u32,
        ] {
            file.write_all(&v.to_le_bytes())?;
        }
        for v in self
            .w1
            .iter()
            .chain(&self.b1)
            .chain(&self.w2)
            .chain(&self.b2)
        {
            file.write_all(&v.to_le_bytes())?;
        }
        Ok(())
    }

    /// Deterministic pseudo-random weights, for tests and smoke runs.
    pub fn seeded(hidden_dim: usize, out_dim: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut next = move || rng.random_range(-0.1f32..0.1);
        let in_dim = EMB_N_MELS;
        Self {
            in_dim,
            hidden_dim,
            out_dim,
            w1: (0..hidden_dim * in_dim).map(|_| next()).collect(),
            b1: (0..hidden_dim).map(|_| next()).collect(),
            w2: (0..out_dim * hidden_dim).map(|_| next()).collect(),
            b2: (0..out_dim).map(|_| next()).collect(),
        }
    }

    /// Forward pass for one mel frame.
    fn forward(&self, mel: &[f32], out: &mut [f32]) {
        let mut hidden = vec![0.0f32; self.hidden_dim];
        for (h, slot) in hidden.iter_mut().enumerate() {
            let row = &self.w1[h * self.in_dim..(h + 1) * self.in_dim];
            let mut acc = self.b1[h];
            for (w, x) in row.iter().zip(mel) {
                acc += w * x;
            }
            *slot = acc.max(0.0);
        }
        for (o, slot) in out.iter_mut().enumerate() {
            let row = &self.w2[o * self.hidden_dim..(o + 1) * self.hidden_dim];
            let mut acc = self.b2[o];
            for (w, h) in row.iter().zip(&hidden) {
                acc += w * h;
            }
            *slot = acc;
        }
    }
}

pub struct EmbeddingExtractor {
    model: Option<EmbeddingModel>,
}

impl EmbeddingExtractor {
    pub fn from_config(cfg: &SweepConfig) -> Self {
        let model = match &cfg.embedding_model {
            Some(path) => match EmbeddingModel::load(path) {
                Ok(m) => {
                    info!(
                        path = %path.display(),
                        out_dim = m.out_dim,
                        "loaded embedding weights"
                    );
                    Some(m)
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "embedding weights rejected");
                    None
                }
            },
            None => None,
        };
        Self { model }
    }

    pub fn with_model(model: EmbeddingModel) -> Self {
        Self { model: Some(model) }
    }

    /// Log-mel frames (n_frames, 64) for one signal.
    fn log_mel(&self, sig: &[f32], sr: u32) -> Array2<f32> {
        let spec = power_spectrum_frames(sig, EMB_N_FFT, EMB_HOP);
        let fb = mel_filterbank(sr, EMB_N_FFT, EMB_N_MELS, 0.0, sr as f32 / 2.0);
        let mel = spec.dot(&fb.t());
        let peak = mel.iter().cloned().fold(f32::MIN, f32::max).max(1e-10);
        mel.mapv(|v| power_to_db(v, peak))
    }
}

impl FeatureExtractor for EmbeddingExtractor {
    fn name(&self) -> &'static str {
        "EMBED"
    }

    fn available(&self) -> bool {
        self.model.is_some()
    }

    fn extract(&self, batch: &AudioBatch) -> Result<Array2<f32>, Error> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| Error::ExtractorUnavailable("EMBED".to_string()))?;

        let n_sigs = batch.n_sigs();
        info!(n_sigs, out_dim = model.out_dim, "embedding signals");
        let pb = extractor_progress("embed", n_sigs);

        let mut table = Array2::<f32>::zeros((n_sigs, model.out_dim));
        let mut frame_out = vec![0.0f32; model.out_dim];
        for chunk_start in (0..n_sigs).step_by(BATCH) {
            let chunk_end = (chunk_start + BATCH).min(n_sigs);
            for i in chunk_start..chunk_end {
                let sig = batch.signal(i);
                let mel = self.log_mel(&sig, batch.sr);
                let n_frames = mel.nrows().max(1);
                let mut acc = vec![0.0f32; model.out_dim];
                let mut frame_buf = vec![0.0f32; model.in_dim];
                for frame in mel.rows() {
                    for (dst, src) in frame_buf.iter_mut().zip(frame.iter()) {
                        *dst = *src;
                    }
                    model.forward(&frame_buf, &mut frame_out);
                    for (a, v) in acc.iter_mut().zip(&frame_out) {
                        *a += v;
                    }
                }
                for (k, a) in acc.iter().enumerate() {
                    table[(i, k)] = a / n_frames as f32;
                }
                pb.inc(1);
            }
        }
        pb.finish_and_clear();
        Ok(table)
    }
}
