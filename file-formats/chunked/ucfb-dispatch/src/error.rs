use thiserror::Error;
use ucfb_chunk::Tag;

/// Error raised by an individual chunk handler. Handlers return this rather
/// than panicking; the dispatcher still wraps handler calls in
/// `catch_unwind` in case a handler (or a library it calls) panics anyway,
/// since the recovery policy is "isolate at the coarsest unit of
/// independent work" regardless of how the handler fails (spec.md §7).
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error(transparent)]
    Chunk(#[from] ucfb_chunk::ChunkError),

    #[error("{0}")]
    Domain(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One failed chunk, recorded by the dispatcher instead of aborting its
/// siblings.
#[derive(Debug, Clone)]
pub struct DispatchFailure {
    pub tag: Tag,
    pub size: usize,
    pub message: String,
}

pub type Result<T> = std::result::Result<T, HandlerError>;
