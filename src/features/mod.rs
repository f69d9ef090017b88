//! Feature extractors: one capability ("waveform batch in, feature table out"),
//! one implementation per family, selected through a name-keyed registry.

pub mod dsp;
pub mod embedding;
pub mod jtfs;
pub mod mfcc;
pub mod scattering;
pub mod strf;

use ndarray::Array2;

use crate::config::SweepConfig;
use crate::error::Error;
use crate::synth::AudioBatch;

pub use embedding::{EmbeddingExtractor, EmbeddingModel};
pub use jtfs::JtfsExtractor;
pub use mfcc::MfccExtractor;
pub use scattering::TimeScatteringExtractor;
pub use strf::StrfExtractor;

/// A feature family: maps a waveform batch to an (n_sigs, dim) table.
///
/// Row i of the output always corresponds to row i of the input batch.
/// `available()` is consulted before every invocation; families backed by
/// optional external models report false instead of failing mid-run.
pub trait FeatureExtractor {
    fn name(&self) -> &'static str;

    fn available(&self) -> bool {
        true
    }

    fn extract(&self, batch: &AudioBatch) -> Result<Array2<f32>, Error>;
}

/// Build the selected extractors in canonical order (mfcc, ts, jtfs, embed, strf).
pub fn registry(cfg: &SweepConfig) -> Result<Vec<Box<dyn FeatureExtractor>>, Error> {
    const ORDER: [&str; 5] = ["mfcc", "ts", "jtfs", "embed", "strf"];

    for requested in &cfg.features {
        if !ORDER.contains(&requested.as_str()) {
            return Err(Error::UnknownFamily(requested.clone()));
        }
    }

    let mut out: Vec<Box<dyn FeatureExtractor>> = Vec::new();
    for key in ORDER {
        if !cfg.features.iter().any(|f| f == key) {
            continue;
        }
        match key {
            "mfcc" => out.push(Box::new(MfccExtractor::default())),
            "ts" => out.push(Box::new(TimeScatteringExtractor::new())),
            "jtfs" => out.push(Box::new(JtfsExtractor::new())),
            "embed" => out.push(Box::new(EmbeddingExtractor::from_config(cfg))),
            "strf" => out.push(Box::new(StrfExtractor::new())),
            _ => unreachable!(),
        }
    }
    Ok(out)
}
