//! Log-spaced parameter grid and its flat sample indexing.

use ndarray::Array2;

/// Generate `num` log-spaced values between `start` and `stop` (inclusive).
pub fn logspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let log_start = start.ln();
            let log_stop = stop.ln();
            (0..num)
                .map(|i| {
                    let t = i as f64 / (num - 1) as f64;
                    (log_start + t * (log_stop - log_start)).exp()
                })
                .collect()
        }
    }
}

/// The full (f0, fm, gamma) sweep grid.
///
/// Flat sample order is row-major over (i_f0, i_fm, i_gamma); every downstream
/// table (audio batch, feature tables, embeddings, ratios) shares this order.
#[derive(Debug, Clone)]
pub struct ParamGrid {
    pub f0s: Vec<f64>,
    pub fms: Vec<f64>,
    pub gammas: Vec<f64>,
}

impl ParamGrid {
    pub fn new(f0s: Vec<f64>, fms: Vec<f64>, gammas: Vec<f64>) -> Self {
        Self { f0s, fms, gammas }
    }

    pub fn log_spaced(
        n_steps: usize,
        f0: (f64, f64),
        fm: (f64, f64),
        gamma: (f64, f64),
    ) -> Self {
        Self {
            f0s: logspace(f0.0, f0.1, n_steps),
            fms: logspace(fm.0, fm.1, n_steps),
            gammas: logspace(gamma.0, gamma.1, n_steps),
        }
    }

    /// Total number of grid points.
    pub fn n_sigs(&self) -> usize {
        self.f0s.len() * self.fms.len() * self.gammas.len()
    }

    /// Map a flat sample index back to its (i_f0, i_fm, i_gamma) triple.
    pub fn unflatten(&self, flat: usize) -> (usize, usize, usize) {
        let n_gamma = self.gammas.len();
        let n_fm = self.fms.len();
        let k = flat % n_gamma;
        let j = (flat / n_gamma) % n_fm;
        let i = flat / (n_gamma * n_fm);
        (i, j, k)
    }

    /// Ground-truth parameter triple for a flat sample index.
    pub fn params_at(&self, flat: usize) -> (f64, f64, f64) {
        let (i, j, k) = self.unflatten(flat);
        (self.f0s[i], self.fms[j], self.gammas[k])
    }

    /// Parameter map: row p, column i holds parameter p of flat sample i.
    /// Rows are (f0, fm, gamma).
    pub fn param_map(&self) -> Array2<f64> {
        let n = self.n_sigs();
        let mut cmap = Array2::<f64>::zeros((3, n));
        for flat in 0..n {
            let (f0, fm, gamma) = self.params_at(flat);
            cmap[(0, flat)] = f0;
            cmap[(1, flat)] = fm;
            cmap[(2, flat)] = gamma;
        }
        cmap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logspace_endpoints_and_geometric_spacing() {
        let v = logspace(512.0, 1024.0, 16);
        assert_eq!(v.len(), 16);
        assert!((v[0] - 512.0).abs() < 1e-9);
        assert!((v[15] - 1024.0).abs() < 1e-9);
        let ratios: Vec<f64> = v.windows(2).map(|w| w[1] / w[0]).collect();
        let target = ratios[0];
        assert!(ratios.iter().all(|&r| (r / target - 1.0).abs() < 1e-12));
    }

    #[test]
    fn logspace_degenerate_lengths() {
        assert!(logspace(1.0, 2.0, 0).is_empty());
        assert_eq!(logspace(3.0, 9.0, 1), vec![3.0]);
    }

    #[test]
    fn flat_index_roundtrip() {
        let grid = ParamGrid::log_spaced(3, (512.0, 1024.0), (4.0, 16.0), (0.5, 4.0));
        assert_eq!(grid.n_sigs(), 27);
        for flat in 0..grid.n_sigs() {
            let (i, j, k) = grid.unflatten(flat);
            assert_eq!(flat, (i * 3 + j) * 3 + k);
        }
    }

    #[test]
    fn param_map_matches_params_at() {
        let grid = ParamGrid::log_spaced(2, (512.0, 1024.0), (4.0, 16.0), (0.5, 4.0));
        let cmap = grid.param_map();
        assert_eq!(cmap.shape(), &[3, 8]);
        for flat in 0..8 {
            let (f0, fm, gamma) = grid.params_at(flat);
            assert_eq!(cmap[(0, flat)], f0);
            assert_eq!(cmap[(1, flat)], fm);
            assert_eq!(cmap[(2, flat)], gamma);
        }
        // Last flat index carries the maxima of all three parameters.
        assert_eq!(cmap[(0, 7)], 1024.0);
        assert_eq!(cmap[(1, 7)], 16.0);
        assert_eq!(cmap[(2, 7)], 4.0);
    }
}
