use thiserror::Error;

/// Top-level CLI failure: the one case spec.md §6.2 says changes the exit
/// code. Per-chunk and per-model failures are logged and do not surface
/// here (spec.md §7 recovers at the coarsest unit of independent work).
#[derive(Error, Debug)]
pub enum CliError {
    #[error("failed to read input file {path}")]
    ReadInput {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open root chunk")]
    RootChunk(#[from] ucfb_chunk::ChunkError),

    #[error(transparent)]
    Explode(#[from] ucfb_explode::ExplodeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;
