//! Per-platform vertex buffer decompression (spec.md §4.I).

mod decoder;
mod error;
mod flags;

pub use decoder::{decode_vbuf, select_best, RawVbuf, VertexDecoder};
pub use error::{Result, VertexError};
pub use flags::VbufFlags;
