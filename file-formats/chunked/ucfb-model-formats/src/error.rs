use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelFormatError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("scene has no segments to write")]
    EmptyScene,

    #[error("unable to find root node in model scene")]
    MissingRootNode,

    #[error("model scene has {0} orphaned node(s)")]
    OrphanedNodes(usize),
}

pub type Result<T> = std::result::Result<T, ModelFormatError>;
