use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExplodeError {
    #[error(transparent)]
    Chunk(#[from] ucfb_chunk::ChunkError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("directory entry name {0:?} is not of the form `<index>_<tag>[_<size>]`")]
    BadEntryName(String),

    #[error("directory entry index {0:?} is not a valid number")]
    BadEntryIndex(String),

    #[error("tag component {0:?} is neither 4 ASCII characters nor a hex escape")]
    BadTagComponent(String),

    #[error("{path} is neither a chunk file nor a chunk directory")]
    NotAChunkEntry { path: String },
}

pub type Result<T> = std::result::Result<T, ExplodeError>;
