use ucfb_chunk::{tag, ChunkReader, Tag};
use ucfb_dispatch::{DispatchEnv, HandlerError, Result};

use crate::collaborators::HandlerContext;

const NAME: Tag = tag!("NAME");
const BODY: Tag = tag!("BODY");

/// Dumps a `Locl` chunk's raw bytes alongside its decoded key/value table,
/// grounded on `handle_localization.cpp` (which does both unconditionally,
/// one raw and one decoded). `BODY` holds `(hash:u32, section_size:u16,
/// utf16 text)` records back to back, terminated by a zero hash; Rust's
/// own UTF-16 decoding replaces the original's hand-rolled surrogate-pair
/// encoder.
pub fn handle_localization(mut localization: ChunkReader<'_>, env: DispatchEnv<'_, HandlerContext<'_>>) -> Result<()> {
    let raw_tag = localization.tag();
    let raw_payload = localization.payload_bytes();
    let mut raw = Vec::with_capacity(8 + raw_payload.len());
    raw.extend_from_slice(&raw_tag.as_bytes());
    raw.extend_from_slice(&(raw_payload.len() as u32).to_le_bytes());
    raw.extend_from_slice(raw_payload);

    let mut name_reader = localization.read_child_strict(NAME, false)?;
    let name = String::from_utf8_lossy(name_reader.read_string(false)?).into_owned();

    env.ctx
        .saver
        .save(&format!("localization/{name}.loc"), &raw)
        .map_err(HandlerError::from)?;

    let mut body = localization.read_child_strict(BODY, false)?;
    let mut buffer = String::new();
    let mut entry_count = 0usize;

    loop {
        if !body.has_more() {
            break;
        }
        let hash: u32 = body.read_trivial(false)?;
        if hash == 0 {
            break;
        }
        let section_size: u16 = body.read_trivial(false)?;
        let code_unit_count = (section_size as usize - 6) / 2;
        let units = body.read_array::<u16>(code_unit_count, false)?;
        let text = String::from_utf16_lossy(&units);
        let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");

        let key = env
            .ctx
            .hash_names
            .resolve(hash)
            .unwrap_or_else(|| format!("0x{hash:08x}"));
        buffer.push_str(&key);
        buffer.push_str("=\"");
        buffer.push_str(&escaped);
        buffer.push_str("\"\n");
        entry_count += 1;
    }

    env.ctx
        .saver
        .save(&format!("localization/{name}.txt"), buffer.as_bytes())
        .map_err(HandlerError::from)?;

    tracing::debug!(%name, entry_count, "emitted localization table");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{FileSaver, NullCollaborators};
    use std::sync::Mutex;
    use ucfb_chunk::ChunkWriter;
    use ucfb_dispatch::{Dispatcher, GameVersion, Platform};
    use ucfb_scene::ModelsBuilder;

    struct RecordingSaver {
        saved: Mutex<Vec<(String, String)>>,
    }
    impl FileSaver for RecordingSaver {
        fn save(&self, relative_path: &str, bytes: &[u8]) -> std::io::Result<()> {
            self.saved.lock().unwrap().push((
                relative_path.to_string(),
                String::from_utf8_lossy(bytes).into_owned(),
            ));
            Ok(())
        }
    }

    fn build_localization() -> Vec<u8> {
        let mut writer = ChunkWriter::new();
        {
            let mut locl = writer.open_child(tag!("Locl"), false).unwrap();
            {
                let mut name = locl.open_child(NAME, false).unwrap();
                name.write_bytes(b"english\0", false).unwrap();
            }
            {
                let mut body = locl.open_child(BODY, false).unwrap();
                let text: Vec<u16> = "Hello".encode_utf16().collect();
                body.write(0xdeadbeefu32, false).unwrap();
                body.write((6 + text.len() * 2) as u16, false).unwrap();
                for unit in &text {
                    body.write(*unit, false).unwrap();
                }
                body.write(0u32, false).unwrap();
            }
        }
        writer.into_bytes()
    }

    #[test]
    fn localization_table_decodes_utf16_text() {
        let bytes = build_localization();
        let locl = ChunkReader::open(&bytes).unwrap();

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
        let dispatcher = Dispatcher::<HandlerContext<'_>>::builder(handle_localization).build();
        let env = DispatchEnv {
            platform: Platform::Pc,
            version: GameVersion::SwbfIi,
            ctx: &ctx,
            dispatcher: &dispatcher,
        };

        handle_localization(locl, env).unwrap();
        let saved = saver.saved.lock().unwrap();
        let text = saved.iter().find(|(path, _)| path.ends_with(".txt")).unwrap();
        assert!(text.1.contains("=\"Hello\""));
    }
}
