use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// Full description of one parameter sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "SweepConfig::default_n_steps")]
    pub n_steps: usize,
    #[serde(default = "SweepConfig::default_f0_min")]
    pub f0_min: f64,
    #[serde(default = "SweepConfig::default_f0_max")]
    pub f0_max: f64,
    #[serde(default = "SweepConfig::default_fm_min")]
    pub fm_min: f64,
    #[serde(default = "SweepConfig::default_fm_max")]
    pub fm_max: f64,
    #[serde(default = "SweepConfig::default_gamma_min")]
    pub gamma_min: f64,
    #[serde(default = "SweepConfig::default_gamma_max")]
    pub gamma_max: f64,
    #[serde(default = "SweepConfig::default_bw")]
    pub bw: f64,
    #[serde(default = "SweepConfig::default_duration")]
    pub duration: f64,
    #[serde(default = "SweepConfig::default_sr")]
    pub sr: u32,
    #[serde(default = "SweepConfig::default_n_neighbors")]
    pub n_neighbors: usize,
    #[serde(default = "SweepConfig::default_out_dir")]
    pub out_dir: PathBuf,
    #[serde(default = "SweepConfig::default_features")]
    pub features: Vec<String>,
    #[serde(default)]
    pub embedding_model: Option<PathBuf>,
    #[serde(default = "SweepConfig::default_seed")]
    pub seed: u64,
}

impl SweepConfig {
    fn default_n_steps() -> usize {
        16
    }
    fn default_f0_min() -> f64 {
        512.0
    }
    fn default_f0_max() -> f64 {
        1024.0
    }
    fn default_fm_min() -> f64 {
        4.0
    }
    fn default_fm_max() -> f64 {
        16.0
    }
    fn default_gamma_min() -> f64 {
        0.5
    }
    fn default_gamma_max() -> f64 {
        4.0
    }
    fn default_bw() -> f64 {
        2.0
    }
    fn default_duration() -> f64 {
        4.0
    }
    fn default_sr() -> u32 {
        8192
    }
    fn default_n_neighbors() -> usize {
        40
    }
    fn default_out_dir() -> PathBuf {
        PathBuf::from("img")
    }
    fn default_features() -> Vec<String> {
        ["mfcc", "ts", "jtfs", "embed", "strf"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }
    fn default_seed() -> u64 {
        0xC0FFEE
    }

    /// Load from TOML. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|source| Error::BadConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Samples per generated signal.
    pub fn sig_len(&self) -> usize {
        (self.duration * self.sr as f64).round() as usize
    }

    /// Total number of grid points (flat sample count).
    pub fn n_sigs(&self) -> usize {
        self.n_steps * self.n_steps * self.n_steps
    }

    pub fn validate(&self) -> Result<(), Error> {
        let check_range = |name: &str, lo: f64, hi: f64| {
            if !(lo > 0.0 && lo.is_finite() && hi.is_finite() && hi >= lo) {
                return Err(Error::InvalidParameter(format!(
                    "{name} range [{lo}, {hi}] must be positive and ordered"
                )));
            }
            Ok(())
        };
        check_range("f0", self.f0_min, self.f0_max)?;
        check_range("fm", self.fm_min, self.fm_max)?;
        check_range("gamma", self.gamma_min, self.gamma_max)?;

        if self.n_steps == 0 {
            return Err(Error::InvalidParameter("n_steps must be >= 1".into()));
        }
        if !(self.duration > 0.0 && self.duration.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "duration {} must be positive",
                self.duration
            )));
        }
        if self.sr == 0 {
            return Err(Error::InvalidParameter("sr must be positive".into()));
        }
        if self.f0_max >= self.sr as f64 / 2.0 {
            return Err(Error::InvalidParameter(format!(
                "f0_max {} exceeds the Nyquist frequency {}",
                self.f0_max,
                self.sr as f64 / 2.0
            )));
        }
        if self.bw <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "bw {} must be positive",
                self.bw
            )));
        }
        if self.n_neighbors == 0 {
            return Err(Error::InvalidParameter("n_neighbors must be >= 1".into()));
        }
        if self.features.is_empty() {
            return Err(Error::InvalidParameter(
                "at least one feature family must be selected".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            n_steps: Self::default_n_steps(),
            f0_min: Self::default_f0_min(),
            f0_max: Self::default_f0_max(),
            fm_min: Self::default_fm_min(),
            fm_max: Self::default_fm_max(),
            gamma_min: Self::default_gamma_min(),
            gamma_max: Self::default_gamma_max(),
            bw: Self::default_bw(),
            duration: Self::default_duration(),
            sr: Self::default_sr(),
            n_neighbors: Self::default_n_neighbors(),
            out_dir: Self::default_out_dir(),
            features: Self::default_features(),
            embedding_model: None,
            seed: Self::default_seed(),
        }
    }
}
