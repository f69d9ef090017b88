use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid sweep parameter: {0}")]
    InvalidParameter(String),

    #[error("feature table shape mismatch for {family}: expected {expected} rows, got {got}")]
    ShapeMismatch {
        family: String,
        expected: usize,
        got: usize,
    },

    #[error("unknown feature family `{0}`")]
    UnknownFamily(String),

    #[error("extractor `{0}` is not available")]
    ExtractorUnavailable(String),

    #[error(
        "n_neighbors ({n_neighbors}) must be smaller than the number of samples ({n_samples})"
    )]
    TooManyNeighbors {
        n_neighbors: usize,
        n_samples: usize,
    },

    #[error(
        "neighbor graph is disconnected: only {reachable} of {n_samples} samples reachable; \
         increase n_neighbors"
    )]
    DisconnectedGraph { reachable: usize, n_samples: usize },

    #[error("embedding model file {path}: {reason}")]
    BadModelFile { path: PathBuf, reason: String },

    #[error("config file {path}: {source}")]
    BadConfig {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
