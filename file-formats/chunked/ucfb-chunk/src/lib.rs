//! Zero-copy, bounds-checked reader and deferred-size writer for the ucfb
//! tagged-chunk container format (spec.md §3.1, §4.A, §4.B).
//!
//! This is the most reused primitive in the workspace: every byte of every
//! input file passes through a [`ChunkReader`], and every byte of every
//! emitted container passes through a [`ChunkWriter`].

mod error;
mod primitive;
mod reader;
mod tag;
mod writer;

pub use error::{ChunkError, Result};
pub use primitive::ChunkPrimitive;
pub use reader::ChunkReader;
pub use tag::Tag;
pub use writer::{ChildWriter, ChunkWriter};
