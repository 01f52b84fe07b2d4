use glam::Vec3;
use ucfb_chunk::{tag, ChunkReader, Tag};
use ucfb_dispatch::{DispatchEnv, Result};
use ucfb_scene::{ClothPatch, ModelFragment};

use crate::collaborators::HandlerContext;

const INFO: Tag = tag!("INFO");
const NAME: Tag = tag!("NAME");
const PRNT: Tag = tag!("PRNT");
const XFRM: Tag = tag!("XFRM");
const DATA: Tag = tag!("DATA");
const COLL: Tag = tag!("COLL");

/// Parses one `clth` chunk into a [`ClothPatch`] and integrates it under
/// its model name. Grounded on `handle_cloth.cpp`; the constraint graph
/// (stretch/bend/cross) and collision primitives it also carries have no
/// counterpart in [`ClothPatch`] and are read past, not stored.
pub fn handle_cloth(mut cloth: ChunkReader<'_>, env: DispatchEnv<'_, HandlerContext<'_>>) -> Result<()> {
    let mut info = cloth.read_child_strict(INFO, false)?;
    let model_name = String::from_utf8_lossy(info.read_string(false)?).into_owned();

    let mut name_reader = cloth.read_child_strict(NAME, false)?;
    let name = String::from_utf8_lossy(name_reader.read_string(false)?).into_owned();

    let mut prnt_reader = cloth.read_child_strict(PRNT, false)?;
    let parent = String::from_utf8_lossy(prnt_reader.read_string(false)?).into_owned();

    // mat3x4 transform: not surfaced by `ClothPatch`, only consumed.
    let mut xfrm_reader = cloth.read_child_strict(XFRM, false)?;
    xfrm_reader.consume(48, false)?;

    let mut data = cloth.read_child_strict(DATA, false)?;
    let _texture_name = data.read_string(false)?;

    let vertex_count: u32 = data.read_trivial(false)?;
    let positions_raw = data.read_array::<[f32; 3]>(vertex_count as usize, false)?;
    let positions: Vec<Vec3> = positions_raw.into_iter().map(Vec3::from_array).collect();

    // texcoords: read past, `ClothPatch` has no slot for them.
    let _texcoords = data.read_array::<[f32; 2]>(vertex_count as usize, false)?;

    let fixed_point_count: u32 = data.read_trivial(false)?;
    let fixed_points: Vec<u16> = (0..fixed_point_count as u16).collect();

    let fixed_weight_count: u32 = data.read_trivial(false)?;
    for _ in 0..fixed_weight_count {
        data.read_string(false)?;
    }

    let index_count: u32 = data.read_trivial(false)?;
    let raw_indices = data.read_array::<u32>(index_count as usize * 3, false)?;
    let indices: Vec<u16> = raw_indices.into_iter().map(|i| i as u16).collect();

    for _ in 0..3 {
        let constraint_count: u32 = data.read_trivial(false)?;
        data.read_array::<u32>(constraint_count as usize * 2, false)?;
    }

    if let Some(mut collision) = cloth.read_child_opt(COLL, false)? {
        let prim_count: u32 = collision.read_trivial(false)?;
        for _ in 0..prim_count {
            collision.read_string(false)?;
            collision.consume(64, false)?;
        }
    }

    tracing::debug!(model = %model_name, patch = %name, vertex_count, "integrated cloth patch");

    env.ctx.models.integrate(
        &model_name,
        ModelFragment {
            cloth: vec![ClothPatch {
                name,
                parent_bone: if parent.is_empty() { None } else { Some(parent) },
                positions,
                fixed_points,
                indices,
            }],
            ..Default::default()
        },
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{FileSaver, NullCollaborators};
    use ucfb_chunk::ChunkWriter;
    use ucfb_dispatch::{Dispatcher, GameVersion, Platform};
    use ucfb_scene::ModelsBuilder;

    struct NoopSaver;
    impl FileSaver for NoopSaver {
        fn save(&self, _relative_path: &str, _bytes: &[u8]) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn build_minimal_cloth() -> Vec<u8> {
        let mut writer = ChunkWriter::new();
        {
            let mut clth = writer.open_child(tag!("clth"), false).unwrap();
            {
                let mut info = clth.open_child(INFO, false).unwrap();
                info.write_bytes(b"flag_pole\0", false).unwrap();
            }
            {
                let mut name = clth.open_child(NAME, false).unwrap();
                name.write_bytes(b"flag\0", false).unwrap();
            }
            {
                let mut prnt = clth.open_child(PRNT, false).unwrap();
                prnt.write_bytes(b"\0", false).unwrap();
            }
            {
                let mut xfrm = clth.open_child(XFRM, false).unwrap();
                xfrm.write_bytes(&[0u8; 48], false).unwrap();
            }
            {
                let mut data = clth.open_child(DATA, false).unwrap();
                data.write_bytes(b"flag_cloth\0", false).unwrap();
                data.write(1u32, false).unwrap(); // vertex_count
                for v in [1.0f32, 2.0, 3.0] {
                    data.write(v, false).unwrap();
                }
                data.write(0.0f32, false).unwrap(); // texcoord.x
                data.write(0.0f32, false).unwrap(); // texcoord.y
                data.write(0u32, false).unwrap(); // fixed_point_count
                data.write(0u32, false).unwrap(); // fixed_weight_count
                data.write(0u32, false).unwrap(); // index_count
                data.write(0u32, false).unwrap(); // stretch_constraint_count
                data.write(0u32, false).unwrap(); // bend_constraint_count
                data.write(0u32, false).unwrap(); // cross_constraint_count
            }
        }
        writer.into_bytes()
    }

    #[test]
    fn minimal_cloth_patch_carries_its_one_vertex() {
        let bytes = build_minimal_cloth();
        let clth = ChunkReader::open(&bytes).unwrap();

        let models = ModelsBuilder::new();
        let saver = NoopSaver;
        let collaborators = NullCollaborators;
        let ctx = HandlerContext {
            models: &models,
            saver: &saver,
            image_codec: &collaborators,
            lua_decompiler: &collaborators,
            terrain_unpacker: &collaborators,
            hash_names: &collaborators,
        };
        let dispatcher = Dispatcher::<HandlerContext<'_>>::builder(handle_cloth).build();
        let env = DispatchEnv {
            platform: Platform::Pc,
            version: GameVersion::SwbfIi,
            ctx: &ctx,
            dispatcher: &dispatcher,
        };

        handle_cloth(clth, env).unwrap();
        let scene = models.scene_for("flag_pole").unwrap();
        assert_eq!(scene.cloth.len(), 1);
        assert_eq!(scene.cloth[0].positions, vec![Vec3::new(1.0, 2.0, 3.0)]);
    }
}
