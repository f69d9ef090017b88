//! Isomap: k-nearest-neighbor graph, all-pairs geodesic distances by repeated
//! Dijkstra, then classical multidimensional scaling of the squared geodesic
//! matrix.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use nalgebra::DMatrix;
use ndarray::Array2;
use tracing::{debug, info};

use crate::error::Error;

/// Euclidean distance between two feature rows.
#[inline]
fn row_distance(data: &Array2<f32>, a: usize, b: usize) -> f64 {
    data.row(a)
        .iter()
        .zip(data.row(b).iter())
        .map(|(&x, &y)| {
            let d = (x - y) as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Indices of the `k` nearest rows of `data` to each row, self excluded,
/// ordered by increasing distance. Ties break on the lower index.
pub fn neighbor_indices(data: &Array2<f32>, k: usize) -> Result<Vec<Vec<usize>>, Error> {
    let n = data.nrows();
    if k >= n {
        return Err(Error::TooManyNeighbors {
            n_neighbors: k,
            n_samples: n,
        });
    }
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let mut dists: Vec<(f64, usize)> = (0..n)
            .filter(|&j| j != i)
            .map(|j| (row_distance(data, i, j), j))
            .collect();
        dists.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal).then(a.1.cmp(&b.1)));
        out.push(dists[..k].iter().map(|&(_, j)| j).collect());
    }
    Ok(out)
}

/// Dijkstra frontier entry; ordered so the BinaryHeap pops the smallest
/// tentative distance first.
struct State {
    dist: f64,
    node: usize,
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.dist == other.dist && self.node == other.node
    }
}
impl Eq for State {}
impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .dist
            .partial_cmp(&self.dist)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.node.cmp(&self.node))
    }
}

fn dijkstra(adj: &[Vec<(usize, f64)>], source: usize, dist: &mut [f64]) {
    dist.fill(f64::INFINITY);
    dist[source] = 0.0;
    let mut heap = BinaryHeap::new();
    heap.push(State {
        dist: 0.0,
        node: source,
    });
    while let Some(State { dist: d, node }) = heap.pop() {
        if d > dist[node] {
            continue;
        }
        for &(next, w) in &adj[node] {
            let nd = d + w;
            if nd < dist[next] {
                dist[next] = nd;
                heap.push(State {
                    dist: nd,
                    node: next,
                });
            }
        }
    }
}

pub struct Isomap {
    pub n_neighbors: usize,
    pub n_components: usize,
}

impl Isomap {
    pub fn new(n_neighbors: usize, n_components: usize) -> Self {
        Self {
            n_neighbors,
            n_components,
        }
    }

    /// Embed the rows of `data` into `n_components` dimensions.
    ///
    /// Fails before any graph work when `n_neighbors >= n_samples`, and during
    /// fitting when the symmetrized neighbor graph is not connected.
    pub fn fit(&self, data: &Array2<f32>) -> Result<Array2<f64>, Error> {
        let (coords, _) = self.fit_with_neighbors(data)?;
        Ok(coords)
    }

    /// Like [`fit`](Self::fit) but also returns the kNN table the graph was
    /// built from, so callers that need both do one distance pass.
    pub fn fit_with_neighbors(
        &self,
        data: &Array2<f32>,
    ) -> Result<(Array2<f64>, Vec<Vec<usize>>), Error> {
        let n = data.nrows();
        if self.n_neighbors >= n {
            return Err(Error::TooManyNeighbors {
                n_neighbors: self.n_neighbors,
                n_samples: n,
            });
        }
        info!(
            n_samples = n,
            n_neighbors = self.n_neighbors,
            n_components = self.n_components,
            "fitting isomap"
        );

        // Symmetrized kNN graph: an edge exists when either endpoint lists
        // the other as a neighbor.
        let neighbors = neighbor_indices(data, self.n_neighbors)?;
        let mut adj: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        for (i, nbrs) in neighbors.iter().enumerate() {
            for &j in nbrs {
                let w = row_distance(data, i, j);
                if !adj[i].iter().any(|&(t, _)| t == j) {
                    adj[i].push((j, w));
                }
                if !adj[j].iter().any(|&(t, _)| t == i) {
                    adj[j].push((i, w));
                }
            }
        }

        // All-pairs geodesics.
        let mut geodesics = Array2::<f64>::zeros((n, n));
        let mut dist = vec![0.0f64; n];
        for src in 0..n {
            dijkstra(&adj, src, &mut dist);
            let reachable = dist.iter().filter(|d| d.is_finite()).count();
            if reachable < n {
                return Err(Error::DisconnectedGraph {
                    reachable,
                    n_samples: n,
                });
            }
            for (j, &d) in dist.iter().enumerate() {
                geodesics[(src, j)] = d;
            }
        }
        debug!("geodesic matrix complete");

        Ok((self.classical_mds(&geodesics), neighbors))
    }

    /// Classical MDS: double-center the squared distance matrix and take the
    /// leading eigenpairs. Eigenvector signs are fixed so the largest-magnitude
    /// component of each axis is positive.
    fn classical_mds(&self, geodesics: &Array2<f64>) -> Array2<f64> {
        let n = geodesics.nrows();
        let mut b = DMatrix::<f64>::zeros(n, n);
        for i in 0..n {
            for j in 0..n {
                let d = geodesics[(i, j)];
                b[(i, j)] = d * d;
            }
        }
        // B = -1/2 J D^2 J with J = I - 1/n 11^T.
        let row_means: Vec<f64> = (0..n).map(|i| b.row(i).sum() / n as f64).collect();
        let grand = row_means.iter().sum::<f64>() / n as f64;
        for i in 0..n {
            for j in 0..n {
                b[(i, j)] = -0.5 * (b[(i, j)] - row_means[i] - row_means[j] + grand);
            }
        }

        let eig = nalgebra::SymmetricEigen::new(b);
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &c| {
            eig.eigenvalues[c]
                .partial_cmp(&eig.eigenvalues[a])
                .unwrap_or(Ordering::Equal)
        });

        let k = self.n_components.min(n);
        let mut coords = Array2::<f64>::zeros((n, self.n_components));
        for (axis, &idx) in order.iter().take(k).enumerate() {
            let scale = eig.eigenvalues[idx].max(0.0).sqrt();
            let col = eig.eigenvectors.column(idx);
            let mut sign = 1.0;
            let mut best = 0.0;
            for &v in col.iter() {
                if v.abs() > best {
                    best = v.abs();
                    sign = if v < 0.0 { -1.0 } else { 1.0 };
                }
            }
            for i in 0..n {
                coords[(i, axis)] = sign * scale * col[i];
            }
        }
        coords
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Points on a noiseless 1-D line embedded in 3-D.
    fn line_data(n: usize) -> Array2<f32> {
        let mut data = Array2::<f32>::zeros((n, 3));
        for i in 0..n {
            let t = i as f32;
            data[(i, 0)] = t;
            data[(i, 1)] = 2.0 * t;
            data[(i, 2)] = -t;
        }
        data
    }

    #[test]
    fn neighbors_exclude_self_and_sort_by_distance() {
        let data = line_data(6);
        let nbrs = neighbor_indices(&data, 2).unwrap();
        assert_eq!(nbrs[0], vec![1, 2]);
        assert_eq!(nbrs[3], vec![2, 4]);
    }

    #[test]
    fn too_many_neighbors_fails_before_fit() {
        let data = line_data(5);
        let err = Isomap::new(5, 3).fit(&data).unwrap_err();
        assert!(matches!(
            err,
            Error::TooManyNeighbors {
                n_neighbors: 5,
                n_samples: 5
            }
        ));
    }

    #[test]
    fn disconnected_graph_is_reported() {
        // Two tight clusters far apart; k = 1 cannot bridge them.
        let mut data = Array2::<f32>::zeros((4, 1));
        data[(0, 0)] = 0.0;
        data[(1, 0)] = 0.1;
        data[(2, 0)] = 100.0;
        data[(3, 0)] = 100.1;
        let err = Isomap::new(1, 2).fit(&data).unwrap_err();
        assert!(matches!(err, Error::DisconnectedGraph { .. }));
    }

    #[test]
    fn line_embeds_with_preserved_spacing() {
        let n = 12;
        let data = line_data(n);
        let coords = Isomap::new(3, 3).fit(&data).unwrap();
        assert_eq!(coords.dim(), (n, 3));
        // Consecutive points stay equidistant along the first axis.
        let gaps: Vec<f64> = (0..n - 1)
            .map(|i| (coords[(i + 1, 0)] - coords[(i, 0)]).abs())
            .collect();
        for g in &gaps {
            assert_abs_diff_eq!(*g, gaps[0], epsilon = 1e-5);
        }
        // Second and third axes carry no variance for a straight line.
        for i in 0..n {
            assert!(coords[(i, 1)].abs() < 1e-4);
        }
    }

    #[test]
    fn fit_returns_the_same_neighbor_table_it_embedded_with() {
        let data = line_data(9);
        let (coords, nbrs) = Isomap::new(2, 3).fit_with_neighbors(&data).unwrap();
        assert_eq!(coords.nrows(), 9);
        assert_eq!(nbrs, neighbor_indices(&data, 2).unwrap());
    }

    #[test]
    fn fit_is_deterministic() {
        let data = line_data(10);
        let a = Isomap::new(3, 3).fit(&data).unwrap();
        let b = Isomap::new(3, 3).fit(&data).unwrap();
        assert_eq!(a, b);
    }
}
