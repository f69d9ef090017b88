use std::path::PathBuf;

use clap::Parser;

use crate::config::SweepConfig;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// Grid points per parameter (total samples = n_steps^3)
    #[arg(long)]
    pub n_steps: Option<usize>,

    /// Carrier frequency minimum [Hz]
    #[arg(long)]
    pub f0_min: Option<f64>,

    /// Carrier frequency maximum [Hz]
    #[arg(long)]
    pub f0_max: Option<f64>,

    /// Modulation frequency minimum [Hz]
    #[arg(long)]
    pub fm_min: Option<f64>,

    /// Modulation frequency maximum [Hz]
    #[arg(long)]
    pub fm_max: Option<f64>,

    /// Chirp rate minimum [octaves/s]
    #[arg(long)]
    pub gamma_min: Option<f64>,

    /// Chirp rate maximum [octaves/s]
    #[arg(long)]
    pub gamma_max: Option<f64>,

    /// Window bandwidth factor
    #[arg(long)]
    pub bw: Option<f64>,

    /// Signal duration [s]
    #[arg(long)]
    pub duration: Option<f64>,

    /// Sample rate [Hz]
    #[arg(long)]
    pub sr: Option<u32>,

    /// Isomap neighbor count
    #[arg(long)]
    pub n_neighbors: Option<usize>,

    /// Output directory for figures and the run report
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Comma-separated feature families (mfcc,ts,jtfs,embed,strf)
    #[arg(long, value_delimiter = ',')]
    pub features: Option<Vec<String>>,

    /// Pretrained embedding weights file (the embed family is skipped without one)
    #[arg(long)]
    pub embedding_model: Option<PathBuf>,

    /// Seed for plot jitter
    #[arg(long)]
    pub seed: Option<u64>,

    /// Path to config TOML
    #[arg(long, default_value = "chirpmap.toml")]
    pub config: PathBuf,
}

impl Args {
    /// Layer CLI flags over config-file values.
    pub fn apply(&self, mut cfg: SweepConfig) -> SweepConfig {
        macro_rules! override_field {
            ($field:ident) => {
                if let Some(v) = &self.$field {
                    cfg.$field = v.clone();
                }
            };
        }
        override_field!(n_steps);
        override_field!(f0_min);
        override_field!(f0_max);
        override_field!(fm_min);
        override_field!(fm_max);
        override_field!(gamma_min);
        override_field!(gamma_max);
        override_field!(bw);
        override_field!(duration);
        override_field!(sr);
        override_field!(n_neighbors);
        override_field!(out_dir);
        override_field!(features);
        override_field!(seed);
        if let Some(path) = &self.embedding_model {
            cfg.embedding_model = Some(path.clone());
        }
        cfg
    }
}
