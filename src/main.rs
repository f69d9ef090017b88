use std::error::Error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use chirpmap::cli::Args;
use chirpmap::config::SweepConfig;
use chirpmap::pipeline;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let cfg = args.apply(SweepConfig::load(&args.config)?);
    cfg.validate()?;

    let report = pipeline::run(&cfg)?;
    for fam in &report.families {
        tracing::info!(
            family = %fam.family,
            dim = fam.dim,
            f0 = fam.median_abs_log2.first().copied().unwrap_or(f64::NAN),
            fm = fam.median_abs_log2.get(1).copied().unwrap_or(f64::NAN),
            gamma = fam.median_abs_log2.get(2).copied().unwrap_or(f64::NAN),
            "median |log2 ratio|"
        );
    }
    Ok(())
}
