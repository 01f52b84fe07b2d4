use thiserror::Error;

#[derive(Error, Debug)]
pub enum VertexError {
    #[error("vertex buffer declares flags 0x{flags:08x} with unrecognized bits 0x{unknown:08x}")]
    UnknownVbufFlags { flags: u32, unknown: u32 },

    #[error("vertex buffer is {available} bytes but decoding {count} vertices at stride {stride} needs {needed}")]
    Truncated {
        available: usize,
        count: usize,
        stride: usize,
        needed: usize,
    },

    #[error("bone index {0} has no corresponding entry in the bone remap table")]
    UnmappedBoneIndex(u8),
}

pub type Result<T> = std::result::Result<T, VertexError>;
