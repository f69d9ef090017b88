pub mod chirp;
pub mod grid;

pub use chirp::{generate_audio, generate_chirp, AudioBatch};
pub use grid::{logspace, ParamGrid};
