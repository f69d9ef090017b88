//! chirpmap — how well do audio representations disentangle chirp parameters?
//!
//! Synthesizes frequency-modulated exponential chirps on a log-spaced
//! (carrier, modulator, chirp-rate) grid, extracts several feature families,
//! embeds each feature space into 3-D with Isomap, and measures how well
//! embedding-graph neighbors recover the ground-truth synthesis parameters.

pub mod cli;
pub mod config;
pub mod error;
pub mod features;
pub mod manifold;
pub mod pipeline;
pub mod plot;
pub mod synth;

pub use error::Error;
