//! End-to-end sweep: synthesize the chirp grid, run every selected feature
//! family, embed each feature table with Isomap, compute the neighbor
//! parameter-recovery ratios, and render the figures plus a JSON report.

use std::error::Error as StdError;
use std::fs;

use ndarray::Array2;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::SweepConfig;
use crate::error::Error;
use crate::features::registry;
use crate::manifold::{recovery_ratios, Isomap};
use crate::plot::{plot_isomap, plot_knn_regression};
use crate::synth::{generate_audio, ParamGrid};

#[derive(Debug, Serialize)]
pub struct FamilyReport {
    pub family: String,
    /// Feature dimensionality before the Isomap embedding.
    pub dim: usize,
    /// Median |log2 ratio| per parameter (f0, fm, gamma); 0 is perfect
    /// neighborhood recovery.
    pub median_abs_log2: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub n_sigs: usize,
    pub sig_len: usize,
    pub n_neighbors: usize,
    pub skipped: Vec<String>,
    pub families: Vec<FamilyReport>,
}

fn median_abs_log2(ratios: &Array2<f64>, param: usize) -> f64 {
    let mut vals: Vec<f64> = ratios
        .column(param)
        .iter()
        .filter(|v| v.is_finite() && **v > 0.0)
        .map(|v| v.log2().abs())
        .collect();
    if vals.is_empty() {
        return f64::NAN;
    }
    vals.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = vals.len() / 2;
    if vals.len() % 2 == 1 {
        vals[mid]
    } else {
        0.5 * (vals[mid - 1] + vals[mid])
    }
}

/// Run the full sweep described by `cfg`. Figures land under `cfg.out_dir`
/// (one `<family>/isomap.png` each plus a shared `knn.png`), the summary in
/// `out_dir/report.json`.
pub fn run(cfg: &SweepConfig) -> Result<RunReport, Box<dyn StdError>> {
    cfg.validate()?;
    let n_sigs = cfg.n_sigs();
    if cfg.n_neighbors >= n_sigs {
        // Caught before any synthesis so a bad sweep fails in milliseconds.
        return Err(Error::TooManyNeighbors {
            n_neighbors: cfg.n_neighbors,
            n_samples: n_sigs,
        }
        .into());
    }

    let grid = ParamGrid::log_spaced(
        cfg.n_steps,
        (cfg.f0_min, cfg.f0_max),
        (cfg.fm_min, cfg.fm_max),
        (cfg.gamma_min, cfg.gamma_max),
    );
    let param_map = grid.param_map();
    info!(n_sigs, sig_len = cfg.sig_len(), "synthesizing chirp grid");
    let batch = generate_audio(&grid, cfg.bw, cfg.duration, cfg.sr);

    fs::create_dir_all(&cfg.out_dir)?;
    let extractors = registry(cfg)?;

    let mut skipped = Vec::new();
    let mut families = Vec::new();
    let mut ratio_tables = Vec::new();
    for ext in &extractors {
        let name = ext.name();
        if !ext.available() {
            warn!(family = name, "extractor unavailable, skipping");
            skipped.push(name.to_string());
            continue;
        }

        let table = ext.extract(&batch)?;
        if table.nrows() != n_sigs {
            return Err(Error::ShapeMismatch {
                family: name.to_string(),
                expected: n_sigs,
                got: table.nrows(),
            }
            .into());
        }
        let dim = table.ncols();
        info!(family = name, dim, "feature table ready");

        let (coords, neighbors) = Isomap::new(cfg.n_neighbors, 3).fit_with_neighbors(&table)?;
        let family_dir = cfg.out_dir.join(name.to_lowercase());
        fs::create_dir_all(&family_dir)?;
        plot_isomap(&family_dir.join("isomap.png"), name, &coords, &param_map)?;

        let ratios = recovery_ratios(&param_map, &neighbors);
        let median_abs_log2 = (0..param_map.nrows())
            .map(|p| median_abs_log2(&ratios, p))
            .collect();
        families.push(FamilyReport {
            family: name.to_string(),
            dim,
            median_abs_log2,
        });
        ratio_tables.push((name.to_string(), ratios));
    }

    plot_knn_regression(&cfg.out_dir.join("knn.png"), &ratio_tables, cfg.seed)?;

    let report = RunReport {
        n_sigs,
        sig_len: cfg.sig_len(),
        n_neighbors: cfg.n_neighbors,
        skipped,
        families,
    };
    let json = serde_json::to_string_pretty(&report)?;
    fs::write(cfg.out_dir.join("report.json"), json)?;
    info!(out_dir = %cfg.out_dir.display(), "sweep complete");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_handles_even_and_odd_counts() {
        let mut r = Array2::<f64>::zeros((3, 1));
        r[(0, 0)] = 1.0;
        r[(1, 0)] = 2.0;
        r[(2, 0)] = 4.0;
        assert!((median_abs_log2(&r, 0) - 1.0).abs() < 1e-12);

        let mut r = Array2::<f64>::zeros((2, 1));
        r[(0, 0)] = 2.0;
        r[(1, 0)] = 4.0;
        assert!((median_abs_log2(&r, 0) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn neighbor_budget_checked_before_synthesis() {
        let cfg = SweepConfig {
            n_steps: 2,
            n_neighbors: 8,
            ..SweepConfig::default()
        };
        let err = run(&cfg).unwrap_err();
        assert!(err.to_string().contains("n_neighbors"));
    }
}
