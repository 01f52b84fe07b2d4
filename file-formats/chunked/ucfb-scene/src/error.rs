use thiserror::Error;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("model {0:?} has a primitive referencing unknown material index {1}")]
    UnknownMaterial(String, usize),

    #[error("cannot convert topology from {from:?} to {to:?} with {index_count} indices (not a multiple of the source's stride)")]
    BadIndexCount {
        from: crate::topology::Topology,
        to: crate::topology::Topology,
        index_count: usize,
    },

    #[error("bone {0:?} references a parent bone that was never integrated")]
    DanglingBoneParent(String),

    #[error("no model named {0:?} has been integrated")]
    UnknownModel(String),
}

pub type Result<T> = std::result::Result<T, SceneError>;
