use glam::Vec3;
use ucfb_chunk::{tag, ChunkReader, Tag};
use ucfb_dispatch::{DispatchEnv, GameVersion, HandlerError, Platform, Result};
use ucfb_scene::{Lod, Material, ModelFragment, Part, RenderType, Segment, Topology, VertexBlock};
use ucfb_vertex::RawVbuf;

use crate::collaborators::HandlerContext;

const NAME: Tag = tag!("NAME");
const INFO: Tag = tag!("INFO");
const SEGM: Tag = tag!("segm");
const MTRL: Tag = tag!("MTRL");
const MNAM: Tag = tag!("MNAM");
const TNAM: Tag = tag!("TNAM");
const IBUF: Tag = tag!("IBUF");
const VBUF: Tag = tag!("VBUF");
const STRP: Tag = tag!("STRP");
const BMAP: Tag = tag!("BMAP");

/// Parses one `modl` chunk into a [`ModelFragment`] and integrates it under
/// its model name. Grounded on `handle_model.cpp`'s `handle_model_impl`,
/// shared across the pc/xbox/ps2 variants there; here the platform
/// difference lives in `read_segment_info` and in `ucfb_vertex`'s
/// per-platform decoding rather than in three separate functions.
pub fn handle_model(mut model: ChunkReader<'_>, env: DispatchEnv<'_, HandlerContext<'_>>) -> Result<()> {
    let mut name = String::new();
    let mut lod = Lod::Zero;
    let mut parts = Vec::new();
    let mut materials = Vec::new();
    let mut vertex_box = (Vec3::ZERO, Vec3::ZERO);

    while model.has_more() {
        let mut child = model.read_child(false)?;
        if child.tag() == NAME {
            let raw = child.read_string(true)?;
            let raw = String::from_utf8_lossy(raw);
            let (stripped, parsed_lod) = Lod::parse_suffix(&raw);
            name = stripped.to_string();
            lod = parsed_lod;
        } else if child.tag() == INFO {
            vertex_box = read_model_info(child)?;
        } else if child.tag() == SEGM {
            let material_index = materials.len();
            let (segment, material) = read_segment(
                child,
                material_index,
                lod,
                env.platform,
                env.version,
                vertex_box,
            )?;
            materials.push(material.clone());
            parts.push(Part {
                name: material.name,
                lod,
                segments: vec![segment],
            });
        }
    }

    if name.is_empty() {
        return Err(HandlerError::Domain("modl chunk has no NAME child".into()));
    }

    tracing::debug!(model = %name, parts = parts.len(), "integrated model fragment");

    env.ctx.models.integrate(
        &name,
        ModelFragment {
            parts,
            materials,
            ..Default::default()
        },
    );

    Ok(())
}

/// Reads a model-level `INFO` chunk's `Model_info` layout: a version-sized
/// run of leading ints (4 i32s for swbfii-sized 72-byte chunks, 3 for the
/// 68-byte swbf1 shape), then `vertex_box: [vec3; 2]` (min, max), then a
/// `visibility_box` and trailing unknown/face-count fields this workspace
/// has no use for. Grounded on `handle_model.cpp`'s `read_model_info`; the
/// returned box feeds position range-mapping in [`decode_segment_vertices`]
/// (spec.md §4.I).
fn read_model_info(mut info: ChunkReader<'_>) -> Result<(Vec3, Vec3)> {
    let leading_ints = if info.payload_bytes().len() >= 72 { 4 } else { 3 };
    info.consume(leading_ints * 4, true)?;

    let vertex_min = info.read_trivial::<[f32; 3]>(false)?;
    let vertex_max = info.read_trivial::<[f32; 3]>(false)?;

    Ok((Vec3::from_array(vertex_min), Vec3::from_array(vertex_max)))
}

fn read_segment(
    mut segment: ChunkReader<'_>,
    material_index: usize,
    lod: Lod,
    platform: Platform,
    version: GameVersion,
    vertex_box: (Vec3, Vec3),
) -> Result<(Segment, Material)> {
    let _ = lod;
    let mut topology = Topology::TriangleList;
    let mut index_count = 0usize;
    let mut material = Material::default_grey();
    let mut indices = Vec::new();
    let mut bone_map = Vec::new();
    let mut vbufs: Vec<ChunkReader<'_>> = Vec::new();

    while segment.has_more() {
        let mut child = segment.read_child(false)?;
        if child.tag() == INFO {
            let (topo, _vertex_count, icount) = read_segment_info(child, platform)?;
            topology = topo;
            index_count = icount;
        } else if child.tag() == MTRL {
            let raw_flags: u32 = child.read_trivial(true)?;
            material.rendertype = RenderType::from_raw(raw_flags, version);
        } else if child.tag() == MNAM {
            let raw = child.read_string(true)?;
            material.name = String::from_utf8_lossy(raw).into_owned();
        } else if child.tag() == TNAM {
            let index: u32 = child.read_trivial(true)?;
            let raw = child.read_string(true)?;
            let tex_name = String::from_utf8_lossy(raw).into_owned();
            if (index as usize) < material.textures.len() {
                material.textures[index as usize] = Some(tex_name);
            }
        } else if child.tag() == IBUF {
            let count: u32 = child.read_trivial(true)?;
            indices = child.read_array::<u16>(count as usize, true)?;
        } else if child.tag() == STRP {
            indices = child.read_array::<u16>(index_count, true)?;
        } else if child.tag() == VBUF {
            vbufs.push(child);
        } else if child.tag() == BMAP {
            let count: u32 = child.read_trivial(true)?;
            bone_map = child.read_array::<u8>(count as usize, true)?;
        }
    }

    let vertices = decode_segment_vertices(&mut vbufs, platform, vertex_box)?;

    Ok((
        Segment {
            material_index,
            topology,
            vertices,
            indices,
            bone_map,
        },
        material,
    ))
}

/// Segment header fields, split per platform the way `read_segment_info_pc`,
/// `read_segment_info_xbox` and `read_segment_info_ps2` are in the original.
fn read_segment_info(mut info: ChunkReader<'_>, platform: Platform) -> Result<(Topology, usize, usize)> {
    match platform {
        Platform::Ps2 => {
            let vertex_count: u32 = info.read_trivial(true)?;
            let index_count: u32 = info.read_trivial(true)?;
            Ok((
                Topology::TriangleStripPs2,
                vertex_count as usize,
                index_count as usize,
            ))
        }
        Platform::Pc => {
            let raw_topology: i32 = info.read_trivial(true)?;
            let vertex_count: u32 = info.read_trivial(true)?;
            let primitive_count: u32 = info.read_trivial(true)?;
            let topology = match raw_topology {
                5 => Topology::TriangleStrip,
                6 => Topology::TriangleFan,
                _ => Topology::TriangleList,
            };
            Ok((topology, vertex_count as usize, primitive_count as usize))
        }
        Platform::Xbox => {
            let raw_topology: i32 = info.read_trivial(true)?;
            let vertex_count: u32 = info.read_trivial(true)?;
            let primitive_count: u32 = info.read_trivial(true)?;
            let topology = match raw_topology {
                6 => Topology::TriangleStrip,
                7 => Topology::TriangleFan,
                _ => Topology::TriangleList,
            };
            Ok((topology, vertex_count as usize, primitive_count as usize))
        }
    }
}

/// `VBUF`'s own 12-byte header (count, stride, flags) precedes the packed
/// vertex data `VertexDecoder` understands (matches `vbuf_reader.cpp`'s
/// `Vbuf_info`, `static_assert(sizeof(Vbuf_info) == 12)`). A segment can
/// carry several `VBUF`s — alternate compression levels of the same
/// geometry — so every candidate's header is read here and the choice of
/// which one to actually decode is left to `ucfb_vertex::decode_vbuf`
/// (spec.md §4.I).
fn decode_segment_vertices(
    vbufs: &mut [ChunkReader<'_>],
    platform: Platform,
    vertex_box: (Vec3, Vec3),
) -> Result<VertexBlock> {
    let mut candidates = Vec::with_capacity(vbufs.len());
    for vbuf in vbufs.iter_mut() {
        let count: u32 = vbuf.read_trivial(false)?;
        let _stride: u32 = vbuf.read_trivial(false)?;
        let flags: u32 = vbuf.read_trivial(false)?;
        let body = vbuf.payload_bytes();
        let header_len = vbuf.head();
        candidates.push(RawVbuf {
            count,
            flags,
            body: &body[header_len..],
        });
    }

    // position components are fixed-point in [i16::MIN, i16::MAX]; map them
    // linearly into [vertex_box.0, vertex_box.1] the way `range_convert`
    // does in `handle_model.cpp`. A model with no (or a degenerate) INFO
    // box falls back to the identity range.
    let (vertex_min, vertex_max) = vertex_box;
    let (position_scale, position_offset) = if vertex_max != vertex_min {
        ((vertex_max - vertex_min) * 0.5, (vertex_max + vertex_min) * 0.5)
    } else {
        (Vec3::ONE, Vec3::ZERO)
    };

    ucfb_vertex::decode_vbuf(&candidates, platform, position_scale, position_offset)
        .map_err(|err| HandlerError::Domain(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{FileSaver, NullCollaborators};
    use ucfb_chunk::ChunkWriter;
    use ucfb_dispatch::Dispatcher;
    use ucfb_scene::ModelsBuilder;

    struct NoopSaver;
    impl FileSaver for NoopSaver {
        fn save(&self, _relative_path: &str, _bytes: &[u8]) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn build_minimal_model() -> Vec<u8> {
        let mut writer = ChunkWriter::new();
        {
            let mut modl = writer.open_child(tag!("modl"), false).unwrap();
            let mut name = modl.open_child(NAME, true).unwrap();
            name.write_bytes(b"test_part\0", false).unwrap();
        }
        writer.into_bytes()
    }

    #[test]
    fn model_with_no_segments_integrates_just_its_name() {
        let bytes = build_minimal_model();
        let modl = ChunkReader::open(&bytes).unwrap();
        assert_eq!(modl.tag(), tag!("modl"));

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
        let dispatcher = Dispatcher::<HandlerContext<'_>>::builder(handle_model).build();
        let env = DispatchEnv {
            platform: Platform::Pc,
            version: GameVersion::SwbfIi,
            ctx: &ctx,
            dispatcher: &dispatcher,
        };

        handle_model(modl, env).unwrap();
        assert_eq!(models.model_names(), vec!["test_part".to_string()]);
    }

    fn build_model_with_one_segment(raw_rendertype: u32) -> Vec<u8> {
        let mut writer = ChunkWriter::new();
        {
            let mut modl = writer.open_child(tag!("modl"), false).unwrap();
            {
                let mut name = modl.open_child(NAME, false).unwrap();
                name.write_bytes(b"crate\0", false).unwrap();
            }
            {
                // swbfii-sized (72-byte) model INFO: 4 leading ints, vertex_box,
                // visibility_box, one unknown int, face_count.
                let mut info = modl.open_child(INFO, false).unwrap();
                for _ in 0..4 {
                    info.write(0i32, true).unwrap();
                }
                for v in [-2.0f32, -2.0, -2.0, 2.0, 2.0, 2.0] {
                    info.write(v, true).unwrap();
                }
                for _ in 0..6 {
                    info.write(0.0f32, true).unwrap();
                }
                info.write(0i32, true).unwrap();
                info.write(0u32, true).unwrap();
            }
            {
                let mut segm = modl.open_child(SEGM, true).unwrap();
                {
                    let mut info = segm.open_child(INFO, false).unwrap();
                    info.write(4i32, true).unwrap(); // triangle_list
                    info.write(1u32, true).unwrap(); // vertex_count
                    info.write(0u32, true).unwrap(); // primitive_count
                }
                {
                    let mut mtrl = segm.open_child(MTRL, false).unwrap();
                    mtrl.write(raw_rendertype, true).unwrap();
                }
                {
                    let mut vbuf = segm.open_child(VBUF, true).unwrap();
                    vbuf.write(1u32, true).unwrap(); // count
                    vbuf.write(8u32, true).unwrap(); // stride
                    vbuf.write(
                        (ucfb_vertex::VbufFlags::POSITION | ucfb_vertex::VbufFlags::POSITION_COMPRESSED)
                            .bits(),
                        true,
                    )
                    .unwrap();
                    // raw i16 body bytes must stay contiguous (the decoder slices
                    // them by fixed byte offset, not via aligned reads).
                    vbuf.write(32767i16, false).unwrap();
                    vbuf.write(0i16, false).unwrap();
                    vbuf.write(-32767i16, false).unwrap();
                    vbuf.write(0i16, false).unwrap(); // unused w
                }
            }
        }
        writer.into_bytes()
    }

    #[test]
    fn rendertype_and_position_range_depend_on_version_and_model_info() {
        let bytes = build_model_with_one_segment(1);

        for (version, expect_transparent) in
            [(GameVersion::SwbfIi, false), (GameVersion::Swbf, true)]
        {
            let modl = ChunkReader::open(&bytes).unwrap();
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
            let dispatcher = Dispatcher::<HandlerContext<'_>>::builder(handle_model).build();
            let env = DispatchEnv {
                platform: Platform::Pc,
                version,
                ctx: &ctx,
                dispatcher: &dispatcher,
            };

            handle_model(modl, env).unwrap();

            let model = models.model_for("crate").unwrap();
            if expect_transparent {
                assert_eq!(model.materials[0].rendertype, RenderType::Transparent);
            } else {
                assert_eq!(model.materials[0].rendertype, RenderType::Glow);
            }

            let scene = models.scene_for("crate").unwrap();
            let segment = &scene.segments[0];
            assert!((segment.vertices.positions[0].x - 2.0).abs() < 1e-2);
            assert!((segment.vertices.positions[0].z + 2.0).abs() < 1e-2);
        }
    }
}
