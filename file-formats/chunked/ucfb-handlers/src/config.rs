use ucfb_chunk::{tag, ChunkReader, Tag};
use ucfb_dispatch::{DispatchEnv, HandlerError, Result};

use crate::collaborators::HandlerContext;

const NAME: Tag = tag!("NAME");
const DATA: Tag = tag!("DATA");
const SCOP: Tag = tag!("SCOP");

macro_rules! config_handler {
    ($fn_name:ident, $dir:literal, $ext:literal) => {
        pub fn $fn_name(chunk: ChunkReader<'_>, env: DispatchEnv<'_, HandlerContext<'_>>) -> Result<()> {
            handle_config(chunk, env, $dir, $ext)
        }
    };
}

config_handler!(handle_effects_config, "effects", ".fx");
config_handler!(handle_sky_config, "world", ".sky");
config_handler!(handle_prop_config, "world", ".prp");
config_handler!(handle_boundary_config, "world", ".bnd");
config_handler!(handle_light_config, "world", ".light");
config_handler!(handle_portal_config, "world", ".pvs");
config_handler!(handle_path_config, "world", ".pth");
config_handler!(handle_combo_config, "combos", ".combo");
config_handler!(handle_sanm_config, "config", ".sanm");
config_handler!(handle_hud_config, "config", ".hud");
config_handler!(handle_load_config, "config", ".cfg");

/// Emits a recursive key/value config file (`.fx`/`.sky`/`.cfg`/...),
/// grounded on `handle_config.cpp`'s `read_root_scope`/`read_scope`/
/// `read_data`. `DATA` chunks are one of four shapes (string list, hybrid
/// string+float, float list, bare tag), told apart by `element_count`/
/// payload-size heuristics exactly as upstream does. The original also
/// special-cases a `strings_are_hashed` per-call-site flag for a "hashed
/// value" fifth shape; none of the call sites here need it so it's left
/// out.
fn handle_config(
    mut config: ChunkReader<'_>,
    env: DispatchEnv<'_, HandlerContext<'_>>,
    dir: &str,
    ext: &str,
) -> Result<()> {
    let mut name_reader = config.read_child_strict(NAME, false)?;
    let name_hash: u32 = name_reader.read_trivial(false)?;
    let name = env
        .ctx
        .hash_names
        .resolve(name_hash)
        .unwrap_or_else(|| format!("0x{name_hash:08x}"));

    let buffer = read_root_scope(&mut config, env);
    if !buffer.is_empty() {
        env.ctx
            .saver
            .save(&format!("{dir}/{name}{ext}"), buffer.as_bytes())
            .map_err(HandlerError::from)?;
    }

    tracing::debug!(%name, dir, ext, "emitted config scope");
    Ok(())
}

fn remove_last_semicolon(buffer: &mut String) {
    if buffer.ends_with(";\n") {
        buffer.truncate(buffer.len() - 2);
        buffer.push('\n');
    }
}

fn read_root_scope(config: &mut ChunkReader<'_>, env: DispatchEnv<'_, HandlerContext<'_>>) -> String {
    let mut buffer = String::new();
    while config.has_more() {
        let Ok(mut child) = config.read_child(false) else {
            break;
        };
        if child.tag() == DATA {
            buffer.push_str(&read_data(&mut child, env, 0));
        } else if child.tag() == SCOP {
            remove_last_semicolon(&mut buffer);
            buffer.push_str(&read_scope(&mut child, env, 1));
        }
    }
    buffer
}

fn read_scope(scope: &mut ChunkReader<'_>, env: DispatchEnv<'_, HandlerContext<'_>>, indent: usize) -> String {
    let mut buffer = String::new();
    buffer.push_str(&"\t".repeat(indent - 1));
    buffer.push_str("{\n");

    while scope.has_more() {
        let Ok(mut child) = scope.read_child(false) else {
            break;
        };
        if child.tag() == DATA {
            buffer.push_str(&read_data(&mut child, env, indent));
        } else if child.tag() == SCOP {
            remove_last_semicolon(&mut buffer);
            buffer.push_str(&read_scope(&mut child, env, indent + 1));
        }
    }

    buffer.push_str(&"\t".repeat(indent - 1));
    buffer.push_str("}\n\n");
    buffer
}

fn lookup(env: DispatchEnv<'_, HandlerContext<'_>>, hash: u32) -> String {
    env.ctx
        .hash_names
        .resolve(hash)
        .unwrap_or_else(|| format!("0x{hash:08x}"))
}

fn cast_number(value: f32) -> String {
    let fraction = value - value.trunc();
    if fraction.abs() < 0.00001 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn read_data(data: &mut ChunkReader<'_>, env: DispatchEnv<'_, HandlerContext<'_>>, indent: usize) -> String {
    let payload = data.payload_bytes();
    let hash = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
    let element_count = if payload.len() > 4 { payload[4] } else { 0 };

    let is_string_data = payload.len() > 9 && {
        let str_sizes_size = u32::from_le_bytes([payload[5], payload[6], payload[7], payload[8]]);
        str_sizes_size / 4 == element_count as u32
            && (9 + str_sizes_size as usize) <= payload.len()
            && element_count > 0
    };

    if is_string_data {
        return read_string_data(data, env, indent, hash, element_count);
    }

    let is_hybrid_data = element_count == 2 && payload.len() != (element_count as usize * 4 + 9);
    if is_hybrid_data {
        return read_hybrid_data(data, env, indent, hash);
    }

    let is_float_data = element_count > 0 && payload.len() == (element_count as usize * 4 + 9);
    if is_float_data {
        return read_float_data(data, env, indent, hash, element_count);
    }

    let mut line = String::new();
    line.push_str(&"\t".repeat(indent));
    line.push_str(&lookup(env, hash));
    line.push_str("();\n");
    line
}

fn read_string_data(data: &mut ChunkReader<'_>, env: DispatchEnv<'_, HandlerContext<'_>>, indent: usize, hash: u32, element_count: u8) -> String {
    let _hash: u32 = data.read_trivial(false).unwrap_or(0);
    let _element_count: u8 = data.read_trivial(false).unwrap_or(0);
    let str_sizes_size: u32 = data.read_trivial(false).unwrap_or(0);
    let _str_sizes = data
        .read_array::<u32>((str_sizes_size / 4) as usize, false)
        .unwrap_or_default();

    let mut line = String::new();
    line.push_str(&"\t".repeat(indent));
    line.push_str(&lookup(env, hash));
    line.push('(');

    let mut values = Vec::with_capacity(element_count as usize);
    while data.has_more() {
        if let Ok(raw) = data.read_string(false) {
            values.push(String::from_utf8_lossy(raw).into_owned());
        } else {
            break;
        }
    }
    let rendered: Vec<String> = values.iter().map(|v| format!("\"{v}\"")).collect();
    line.push_str(&rendered.join(", "));
    line.push_str(");\n");
    line
}

fn read_hybrid_data(data: &mut ChunkReader<'_>, env: DispatchEnv<'_, HandlerContext<'_>>, indent: usize, hash: u32) -> String {
    let _hash: u32 = data.read_trivial(false).unwrap_or(0);
    let _element_count: u8 = data.read_trivial(false).unwrap_or(0);
    let _string_index: u32 = data.read_trivial(false).unwrap_or(0);
    let value: f32 = data.read_trivial(false).unwrap_or(0.0);
    let _string_size: u32 = data.read_trivial(false).unwrap_or(0);
    let name = data.read_string(false).map(|raw| String::from_utf8_lossy(raw).into_owned()).unwrap_or_default();

    let mut line = String::new();
    line.push_str(&"\t".repeat(indent));
    line.push_str(&lookup(env, hash));
    line.push_str(&format!("(\"{name}\", {});\n", cast_number(value)));
    line
}

fn read_float_data(data: &mut ChunkReader<'_>, env: DispatchEnv<'_, HandlerContext<'_>>, indent: usize, hash: u32, element_count: u8) -> String {
    let _hash: u32 = data.read_trivial(false).unwrap_or(0);
    let _element_count: u8 = data.read_trivial(false).unwrap_or(0);

    let mut values = Vec::with_capacity(element_count as usize);
    for _ in 0..element_count {
        let v: f32 = data.read_trivial(false).unwrap_or(0.0);
        values.push(cast_number(v));
    }

    let mut line = String::new();
    line.push_str(&"\t".repeat(indent));
    line.push_str(&lookup(env, hash));
    line.push('(');
    line.push_str(&values.join(", "));
    line.push_str(");\n");
    line
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

    fn build_float_config() -> Vec<u8> {
        let mut writer = ChunkWriter::new();
        {
            let mut fx = writer.open_child(tag!("fx__"), false).unwrap();
            {
                let mut name = fx.open_child(NAME, false).unwrap();
                name.write(0xabcdu32, false).unwrap();
            }
            {
                let mut data = fx.open_child(DATA, false).unwrap();
                data.write(0x1111u32, false).unwrap(); // key hash
                data.write(2u8, false).unwrap(); // element_count
                data.write(1.0f32, false).unwrap();
                data.write(2.0f32, false).unwrap();
            }
        }
        writer.into_bytes()
    }

    #[test]
    fn float_data_renders_a_function_call_line() {
        let bytes = build_float_config();
        let fx = ChunkReader::open(&bytes).unwrap();

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
        let dispatcher = Dispatcher::<HandlerContext<'_>>::builder(handle_effects_config).build();
        let env = DispatchEnv {
            platform: Platform::Pc,
            version: GameVersion::SwbfIi,
            ctx: &ctx,
            dispatcher: &dispatcher,
        };

        handle_effects_config(fx, env).unwrap();
        let saved = saver.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].1.contains("(1, 2);"));
    }
}
