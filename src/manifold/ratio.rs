//! Parameter recovery ratio: for each signal and each generator parameter,
//! the geometric mean of that parameter over the signal's feature-space
//! neighbors divided by the signal's own value. A ratio of 1 means the
//! neighborhood agrees with the signal; the log2 of the ratio is what the
//! regression plots show.

use ndarray::Array2;

/// `param_map` is (n_params, n_sigs) of strictly positive parameter values in
/// flat grid order; `neighbors[i]` lists the feature-space neighbors of
/// signal i. Returns an (n_sigs, n_params) ratio table.
pub fn recovery_ratios(param_map: &Array2<f64>, neighbors: &[Vec<usize>]) -> Array2<f64> {
    let n_params = param_map.nrows();
    let n_sigs = param_map.ncols();
    debug_assert_eq!(neighbors.len(), n_sigs);

    let mut ratios = Array2::<f64>::zeros((n_sigs, n_params));
    for (i, nbrs) in neighbors.iter().enumerate() {
        for p in 0..n_params {
            let mean_log = nbrs
                .iter()
                .map(|&j| param_map[(p, j)].ln())
                .sum::<f64>()
                / nbrs.len().max(1) as f64;
            ratios[(i, p)] = mean_log.exp() / param_map[(p, i)];
        }
    }
    ratios
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn agreeing_neighborhood_gives_unit_ratio() {
        let mut pm = Array2::<f64>::zeros((2, 3));
        for j in 0..3 {
            pm[(0, j)] = 512.0;
            pm[(1, j)] = 4.0;
        }
        let neighbors = vec![vec![1, 2], vec![0, 2], vec![0, 1]];
        let r = recovery_ratios(&pm, &neighbors);
        for v in r.iter() {
            assert_abs_diff_eq!(*v, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn geometric_mean_over_neighbors() {
        // Neighbors at 2x and 8x the own value: geometric mean is 4x.
        let mut pm = Array2::<f64>::zeros((1, 3));
        pm[(0, 0)] = 1.0;
        pm[(0, 1)] = 2.0;
        pm[(0, 2)] = 8.0;
        let neighbors = vec![vec![1, 2], vec![0], vec![0]];
        let r = recovery_ratios(&pm, &neighbors);
        assert_abs_diff_eq!(r[(0, 0)], 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(r[(1, 0)], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(r[(2, 0)], 0.125, epsilon = 1e-12);
    }
}
