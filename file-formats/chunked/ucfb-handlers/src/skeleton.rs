use glam::{Mat3, Mat4, Quat, Vec3};
use ucfb_chunk::{tag, ChunkReader, Tag};
use ucfb_dispatch::{DispatchEnv, Result};
use ucfb_scene::{Bone, ModelFragment};

use crate::collaborators::HandlerContext;

const INFO: Tag = tag!("INFO");
const NAME: Tag = tag!("NAME");
const PRNT: Tag = tag!("PRNT");
const XFRM: Tag = tag!("XFRM");

/// Parses one `skl2` chunk's bone list and integrates it into the named
/// model, grounded on `handle_skeleton.cpp`: `INFO` carries the model name
/// and bone count, then `NAME`/`PRNT`/`XFRM` each carry one entry per bone
/// in lockstep.
pub fn handle_skeleton(
    mut skeleton: ChunkReader<'_>,
    env: DispatchEnv<'_, HandlerContext<'_>>,
) -> Result<()> {
    let mut info = skeleton.read_child_strict(INFO, false)?;
    let model_name = String::from_utf8_lossy(info.read_string(false)?).into_owned();
    let bone_count: u16 = info.read_trivial(false)?;
    let bone_count = bone_count as usize;

    let mut name_reader = skeleton.read_child_strict(NAME, false)?;
    let names = read_unaligned_strings(&mut name_reader, bone_count)?;

    let mut prnt_reader = skeleton.read_child_strict(PRNT, false)?;
    let parents = read_unaligned_strings(&mut prnt_reader, bone_count)?;

    let mut xfrm_reader = skeleton.read_child_strict(XFRM, false)?;
    let transforms = read_xframes(&mut xfrm_reader, bone_count)?;

    let bones = names
        .into_iter()
        .zip(parents)
        .zip(transforms)
        .map(|((name, parent), transform)| Bone {
            name,
            parent: if parent.is_empty() { None } else { Some(parent) },
            transform,
        })
        .collect();

    tracing::debug!(model = %model_name, bone_count, "integrated skeleton fragment");

    env.ctx.models.integrate(
        &model_name,
        ModelFragment {
            bones,
            ..Default::default()
        },
    );

    Ok(())
}

fn read_unaligned_strings(reader: &mut ChunkReader<'_>, count: usize) -> Result<Vec<String>> {
    let mut names = Vec::with_capacity(count);
    for _ in 0..count {
        let raw = reader.read_string(false)?;
        names.push(String::from_utf8_lossy(raw).into_owned());
    }
    Ok(names)
}

/// One `Xframe` is a 3x3 rotation matrix (9 floats, column-major) followed
/// by a position (3 floats) — 48 bytes, matching
/// `static_assert(sizeof(Xframe) == 48)` upstream.
fn read_xframes(reader: &mut ChunkReader<'_>, count: usize) -> Result<Vec<Mat4>> {
    let floats = reader.read_array::<f32>(count * 12, false)?;
    let mut transforms = Vec::with_capacity(count);

    for chunk in floats.chunks_exact(12) {
        let rotation_matrix = Mat3::from_cols(
            Vec3::new(chunk[0], chunk[1], chunk[2]),
            Vec3::new(chunk[3], chunk[4], chunk[5]),
            Vec3::new(chunk[6], chunk[7], chunk[8]),
        );
        let position = Vec3::new(chunk[9], chunk[10], chunk[11]);
        let rotation = Quat::from_mat3(&rotation_matrix);
        transforms.push(Mat4::from_rotation_translation(rotation, position));
    }

    Ok(transforms)
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

    fn build_one_bone_skeleton() -> Vec<u8> {
        let mut writer = ChunkWriter::new();
        {
            let mut skl2 = writer.open_child(tag!("skl2"), false).unwrap();
            {
                let mut info = skl2.open_child(INFO, false).unwrap();
                info.write_bytes(b"tank\0", false).unwrap();
                info.write(1u16, false).unwrap();
            }
            {
                let mut name = skl2.open_child(NAME, false).unwrap();
                name.write_bytes(b"turret\0", false).unwrap();
            }
            {
                let mut prnt = skl2.open_child(PRNT, false).unwrap();
                prnt.write_bytes(b"\0", false).unwrap();
            }
            {
                let mut xfrm = skl2.open_child(XFRM, false).unwrap();
                for v in [1.0f32, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 5.0, 6.0, 7.0] {
                    xfrm.write(v, false).unwrap();
                }
            }
        }
        writer.into_bytes()
    }

    #[test]
    fn single_bone_skeleton_parses_name_and_position() {
        let bytes = build_one_bone_skeleton();
        let skl2 = ChunkReader::open(&bytes).unwrap();

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
        let dispatcher = Dispatcher::<HandlerContext<'_>>::builder(handle_skeleton).build();
        let env = DispatchEnv {
            platform: Platform::Pc,
            version: GameVersion::SwbfIi,
            ctx: &ctx,
            dispatcher: &dispatcher,
        };

        handle_skeleton(skl2, env).unwrap();
        let scene = models.scene_for("tank").unwrap();
        assert_eq!(scene.nodes[0].name, "turret");
        assert_eq!(
            scene.nodes[0].transform.transform_point3(Vec3::ZERO),
            Vec3::new(5.0, 6.0, 7.0)
        );
    }
}
