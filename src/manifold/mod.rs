//! Manifold learning: brute-force k-nearest neighbors, Isomap embedding via
//! geodesic distances and classical MDS, and the neighbor-based parameter
//! recovery ratio.

mod isomap;
mod ratio;

pub use isomap::{neighbor_indices, Isomap};
pub use ratio::recovery_ratios;
