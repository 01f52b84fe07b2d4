use ucfb_chunk::ChunkReader;
use ucfb_dispatch::{DispatchEnv, HandlerError, Result};

use crate::collaborators::HandlerContext;

/// Fallback handler for any `(tag, platform, version)` with no registered
/// handler: re-wraps the chunk's own `tag+size+payload` in a fresh `ucfb`
/// header and dumps it under `munged/`, so nothing is silently lost
/// (spec.md §4.C precedence step 5, grounded on `handle_unknown.cpp`).
pub fn handle_unknown(chunk: ChunkReader<'_>, env: DispatchEnv<'_, HandlerContext<'_>>) -> Result<()> {
    let tag = chunk.tag();
    let payload = chunk.payload_bytes();
    let inner_size = payload.len() as u32;

    let mut buf = Vec::with_capacity(16 + payload.len());
    buf.extend_from_slice(b"ucfb");
    buf.extend_from_slice(&(inner_size + 8).to_le_bytes());
    buf.extend_from_slice(&tag.as_bytes());
    buf.extend_from_slice(&inner_size.to_le_bytes());
    buf.extend_from_slice(payload);

    let path = format!("munged/{}.munged", tag.display_name());
    env.ctx
        .saver
        .save(&path, &buf)
        .map_err(HandlerError::from)?;

    tracing::debug!(%tag, size = payload.len(), "dumped unrecognized chunk");
    Ok(())
}

/// `gmod`/`plnp` — registered upstream with no handler at all: no file
/// written, no error raised. Kept distinct from [`handle_unknown`] so these
/// two tags don't produce a spurious `unknown/*.chunk` dump.
pub fn handle_ignored(chunk: ChunkReader<'_>, _env: DispatchEnv<'_, HandlerContext<'_>>) -> Result<()> {
    tracing::trace!(tag = %chunk.tag(), "ignored chunk, no output by design");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{FileSaver, NullCollaborators};
    use std::sync::Mutex;
    use ucfb_chunk::{tag, ChunkWriter};
    use ucfb_scene::ModelsBuilder;

    struct RecordingSaver {
        saved: Mutex<Vec<(String, usize)>>,
    }

    impl FileSaver for RecordingSaver {
        fn save(&self, relative_path: &str, bytes: &[u8]) -> std::io::Result<()> {
            self.saved
                .lock()
                .unwrap()
                .push((relative_path.to_string(), bytes.len()));
            Ok(())
        }
    }

    #[test]
    fn dumps_the_chunk_rewrapped_in_a_fresh_ucfb_header() {
        let mut writer = ChunkWriter::new();
        writer.write_bytes(b"XXXX", false).unwrap();
        writer.write::<u32>(3, false).unwrap();
        writer.write_bytes(b"abc", true).unwrap();
        let bytes = writer.into_bytes();
        let chunk = ChunkReader::open(&bytes).unwrap();
        assert_eq!(chunk.tag(), tag!("XXXX"));

        let models = ModelsBuilder::new();
        let saver = RecordingSaver {
            saved: Mutex::new(Vec::new()),
        };
        let collaborators = NullCollaborators;
        let ctx = HandlerContext {
            models: &models,
            saver: &saver,
            image_codec: &collaborators,
            lua_decompiler: &collaborators,
            terrain_unpacker: &collaborators,
            hash_names: &collaborators,
        };

        let dummy_dispatcher = ucfb_dispatch::Dispatcher::<HandlerContext<'_>>::builder(handle_unknown).build();
        let env = DispatchEnv {
            platform: ucfb_dispatch::Platform::Pc,
            version: ucfb_dispatch::GameVersion::SwbfIi,
            ctx: &ctx,
            dispatcher: &dummy_dispatcher,
        };

        handle_unknown(chunk, env).unwrap();
        let saved = saver.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].0, "munged/XXXX.munged");
        // "ucfb" + u32(3+8) + "XXXX" + u32(3) + "abc" = 4 + 4 + 4 + 4 + 3
        assert_eq!(saved[0].1, 19);
    }
}
