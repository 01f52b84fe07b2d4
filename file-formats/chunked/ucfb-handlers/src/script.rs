use ucfb_chunk::{tag, ChunkReader, Tag};
use ucfb_dispatch::{DispatchEnv, HandlerError, Result};

use crate::collaborators::HandlerContext;

const NAME: Tag = tag!("NAME");
const BODY: Tag = tag!("BODY");

const LUA_MAGIC: &[u8; 4] = b"\x1BLua";
const LUA4_VERSION: u8 = 0x40;

/// Dumps a `scr_` chunk's raw bytes and, when its body is Lua 4 bytecode,
/// attempts decompilation through [`crate::collaborators::LuaDecompiler`].
/// Grounded on `handle_script.cpp`'s `handle_script`/`handle_script_body`/
/// `handle_lua_script`; the bytecode interpreter itself
/// (`handle_lua4_function`/`process_code`) is out of scope.
pub fn handle_script(mut script: ChunkReader<'_>, env: DispatchEnv<'_, HandlerContext<'_>>) -> Result<()> {
    let raw_tag = script.tag();
    let raw_payload = script.payload_bytes();
    let mut raw = Vec::with_capacity(8 + raw_payload.len());
    raw.extend_from_slice(&raw_tag.as_bytes());
    raw.extend_from_slice(&(raw_payload.len() as u32).to_le_bytes());
    raw.extend_from_slice(raw_payload);

    let mut name_reader = script.read_child_strict(NAME, false)?;
    let name = String::from_utf8_lossy(name_reader.read_string(false)?).into_owned();

    env.ctx
        .saver
        .save(&format!("scripts/{name}.script"), &raw)
        .map_err(HandlerError::from)?;

    let mut decompiled = false;
    while script.has_more() {
        let child = script.read_child(false)?;
        if child.tag() == BODY {
            let body = child.payload_bytes();
            if body.len() >= 5 && &body[0..4] == LUA_MAGIC && body[4] == LUA4_VERSION {
                if let Some(source) = env.ctx.lua_decompiler.decompile(&body[5..]) {
                    env.ctx
                        .saver
                        .save(&format!("scripts/{name}.lua"), source.as_bytes())
                        .map_err(HandlerError::from)?;
                    decompiled = true;
                }
            }
        }
    }

    tracing::debug!(%name, decompiled, "dumped script chunk");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{FileSaver, HashNameDictionary, ImageCodec, LuaDecompiler, TerrainPixelUnpacker};
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

    struct StubDecompiler;
    impl ImageCodec for StubDecompiler {
        fn decode(&self, _format_tag: &str, _width: u32, _height: u32, _body: &[u8]) -> Option<Vec<u8>> {
            None
        }
    }
    impl LuaDecompiler for StubDecompiler {
        fn decompile(&self, _bytecode: &[u8]) -> Option<String> {
            Some("print(\"hi\")".to_string())
        }
    }
    impl TerrainPixelUnpacker for StubDecompiler {
        fn unpack_heightmap(&self, _raw: &[u8], _width: u32, _height: u32) -> Option<Vec<f32>> {
            None
        }
    }
    impl HashNameDictionary for StubDecompiler {
        fn resolve(&self, _hash: u32) -> Option<String> {
            None
        }
    }

    fn build_lua4_script() -> Vec<u8> {
        let mut writer = ChunkWriter::new();
        {
            let mut scr = writer.open_child(tag!("scr_"), false).unwrap();
            {
                let mut name = scr.open_child(NAME, false).unwrap();
                name.write_bytes(b"ai_behavior\0", false).unwrap();
            }
            {
                let mut body = scr.open_child(BODY, false).unwrap();
                body.write_bytes(LUA_MAGIC, false).unwrap();
                body.write(LUA4_VERSION, false).unwrap();
                body.write_bytes(b"\x00\x00\x00\x00", false).unwrap();
            }
        }
        writer.into_bytes()
    }

    #[test]
    fn lua4_body_is_decompiled_through_the_collaborator() {
        let bytes = build_lua4_script();
        let scr = ChunkReader::open(&bytes).unwrap();

        let models = ModelsBuilder::new();
        let saver = RecordingSaver {
            saved: Mutex::new(Vec::new()),
        };
        let decompiler = StubDecompiler;
        let ctx = HandlerContext {
            models: &models,
            saver: &saver,
            image_codec: &decompiler,
            lua_decompiler: &decompiler,
            terrain_unpacker: &decompiler,
            hash_names: &decompiler,
        };
        let dispatcher = Dispatcher::<HandlerContext<'_>>::builder(handle_script).build();
        let env = DispatchEnv {
            platform: Platform::Pc,
            version: GameVersion::SwbfIi,
            ctx: &ctx,
            dispatcher: &dispatcher,
        };

        handle_script(scr, env).unwrap();
        let saved = saver.saved.lock().unwrap();
        let lua = saved.iter().find(|(path, _)| path.ends_with(".lua")).unwrap();
        assert_eq!(lua.1, "print(\"hi\")");
    }
}
