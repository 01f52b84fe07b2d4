use thiserror::Error;

/// Error types for reading and writing ucfb chunks
#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("chunk too short: need at least 8 bytes for a header, found {0}")]
    HeaderTooShort(usize),

    #[error("chunk declares size {declared} but only {available} bytes are available")]
    Truncated { declared: u32, available: usize },

    #[error("read past end of chunk: tried to read {requested} bytes at offset {offset} of a {size}-byte payload")]
    EndOfChunk {
        offset: usize,
        requested: usize,
        size: usize,
    },

    #[error("expected chunk tag {expected}, found {found}")]
    TagMismatch { expected: String, found: String },

    #[error("string is missing a NUL terminator within the chunk")]
    MissingNulTerminator,

    #[error("chunk payload exceeds the maximum encodable size (2^31 - 1 bytes)")]
    TooLarge,
}

pub type Result<T> = std::result::Result<T, ChunkError>;
