use ucfb_chunk::{tag, ChunkReader, Tag};
use ucfb_dispatch::{DispatchEnv, HandlerError, Result};

use crate::collaborators::HandlerContext;

const NAME: Tag = tag!("NAME");
const INFO: Tag = tag!("INFO");
const FMT_: Tag = tag!("FMT_");
const FACE: Tag = tag!("FACE");
const LVL_: Tag = tag!("LVL_");
const BODY: Tag = tag!("BODY");

const DXT1: u32 = 0x31545844;
const DXT3: u32 = 0x33545844;
const DXT5: u32 = 0x35545844;

/// Reconstructs a standalone `.dds` file from a `tex_` chunk's first format
/// and mipmap level, grounded on `handle_texture.cpp`'s `read_texture` /
/// `create_dds_header`. Building the DDS container is plain data layout
/// (in scope); decoding the pixels themselves is not, so every platform
/// variant (`tex_`, `tex_ps2`, `tex_xbox`) funnels through this one
/// reconstruction and only the block-compressed fourCC table differs from
/// the original's full D3DFMT switch.
pub fn handle_texture(mut texture: ChunkReader<'_>, env: DispatchEnv<'_, HandlerContext<'_>>) -> Result<()> {
    let mut name_reader = texture.read_child_strict(NAME, false)?;
    let name = String::from_utf8_lossy(name_reader.read_string(true)?).into_owned();

    texture.read_child_strict(INFO, false)?;

    let mut format = texture.read_child_strict(FMT_, false)?;
    let mut format_info = format.read_child_strict(INFO, false)?;
    let dx_format: u32 = format_info.read_trivial(true)?;
    let width: u16 = format_info.read_trivial(true)?;
    let height: u16 = format_info.read_trivial(true)?;
    let _unknown: u16 = format_info.read_trivial(true)?;
    let _mipmap_count: u16 = format_info.read_trivial(true)?;
    let _unknown1: u32 = format_info.read_trivial(true)?;

    let mut face = format.read_child_strict(FACE, false)?;
    let mut mipmap_level = face.read_child_strict(LVL_, false)?;
    mipmap_level.read_child_strict(INFO, false)?;
    let body = mipmap_level.read_child_strict(BODY, false)?;
    let pixels = body.payload_bytes();

    let dds = build_dds(dx_format, width as u32, height as u32, pixels);
    let path = format!("textures/{name}.dds");
    env.ctx.saver.save(&path, &dds).map_err(HandlerError::from)?;

    tracing::debug!(%name, dx_format, width, height, "saved texture as dds");
    Ok(())
}

/// Builds a DDS file: `"DDS "` magic, the 124-byte `DDS_HEADER`, then the
/// raw pixel body unchanged. Block-compressed formats get the matching
/// fourCC; anything else is assumed to be 32-bit BGRA (the common case for
/// the uncompressed formats this tool actually emits).
fn build_dds(dx_format: u32, width: u32, height: u32, pixels: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 124 + pixels.len());
    out.extend_from_slice(b"DDS ");

    let mut header = [0u8; 124];
    header[0..4].copy_from_slice(&124u32.to_le_bytes());
    header[4..8].copy_from_slice(&0x0002_100Fu32.to_le_bytes()); // CAPS|HEIGHT|WIDTH|PIXELFORMAT|LINEARSIZE
    header[8..12].copy_from_slice(&height.to_le_bytes());
    header[12..16].copy_from_slice(&width.to_le_bytes());
    header[16..20].copy_from_slice(&(pixels.len() as u32).to_le_bytes());

    let pixel_format_offset = 76;
    header[pixel_format_offset..pixel_format_offset + 4].copy_from_slice(&32u32.to_le_bytes());

    let is_compressed = matches!(dx_format, DXT1 | DXT3 | DXT5);
    if is_compressed {
        header[pixel_format_offset + 4..pixel_format_offset + 8]
            .copy_from_slice(&0x4u32.to_le_bytes()); // DDPF_FOURCC
        header[pixel_format_offset + 8..pixel_format_offset + 12]
            .copy_from_slice(&dx_format.to_le_bytes());
    } else {
        header[pixel_format_offset + 4..pixel_format_offset + 8]
            .copy_from_slice(&0x41u32.to_le_bytes()); // DDPF_ALPHAPIXELS | DDPF_RGB
        header[pixel_format_offset + 12..pixel_format_offset + 16]
            .copy_from_slice(&32u32.to_le_bytes()); // RGB bit count
        header[pixel_format_offset + 16..pixel_format_offset + 20]
            .copy_from_slice(&0x00FF_0000u32.to_le_bytes()); // R mask (BGRA byte order)
        header[pixel_format_offset + 20..pixel_format_offset + 24]
            .copy_from_slice(&0x0000_FF00u32.to_le_bytes()); // G mask
        header[pixel_format_offset + 24..pixel_format_offset + 28]
            .copy_from_slice(&0x0000_00FFu32.to_le_bytes()); // B mask
        header[pixel_format_offset + 28..pixel_format_offset + 32]
            .copy_from_slice(&0xFF00_0000u32.to_le_bytes()); // A mask
    }

    header[104..108].copy_from_slice(&0x1000u32.to_le_bytes()); // DDSCAPS_TEXTURE

    out.extend_from_slice(&header);
    out.extend_from_slice(pixels);
    out
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

    fn build_texture_chunk() -> Vec<u8> {
        let mut writer = ChunkWriter::new();
        {
            let mut tex = writer.open_child(tag!("tex_"), false).unwrap();
            {
                let mut name = tex.open_child(NAME, false).unwrap();
                name.write_bytes(b"rock_diffuse\0", true).unwrap();
            }
            tex.open_child(INFO, false).unwrap();
            {
                let mut fmt = tex.open_child(FMT_, false).unwrap();
                {
                    let mut info = fmt.open_child(INFO, false).unwrap();
                    info.write(DXT1, true).unwrap();
                    info.write(64u16, true).unwrap();
                    info.write(64u16, true).unwrap();
                    info.write(0u16, true).unwrap();
                    info.write(1u16, true).unwrap();
                    info.write(0u32, true).unwrap();
                }
                {
                    let mut face = fmt.open_child(FACE, false).unwrap();
                    {
                        let mut lvl = face.open_child(LVL_, false).unwrap();
                        lvl.open_child(INFO, false).unwrap();
                        {
                            let mut body = lvl.open_child(BODY, false).unwrap();
                            body.write_bytes(&[0xAAu8; 8], true).unwrap();
                        }
                    }
                }
            }
        }
        writer.into_bytes()
    }

    #[test]
    fn texture_is_reconstructed_as_a_dds_file() {
        let bytes = build_texture_chunk();
        let texture = ChunkReader::open(&bytes).unwrap();

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
        let dispatcher = Dispatcher::<HandlerContext<'_>>::builder(handle_texture).build();
        let env = DispatchEnv {
            platform: Platform::Pc,
            version: GameVersion::SwbfIi,
            ctx: &ctx,
            dispatcher: &dispatcher,
        };

        handle_texture(texture, env).unwrap();
        let saved = saver.saved.lock().unwrap();
        assert_eq!(saved[0].0, "textures/rock_diffuse.dds");
        assert_eq!(saved[0].1, 4 + 124 + 8);
    }
}
