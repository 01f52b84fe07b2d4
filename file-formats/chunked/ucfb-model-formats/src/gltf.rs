use gltf_json as json;
use json::validation::Checked::Valid;
use json::validation::USize64;

use ucfb_scene::Scene;

use crate::error::{ModelFormatError, Result};

const GLB_MAGIC: u32 = 0x4654_6C67; // "glTF"
const GLB_VERSION: u32 = 2;
const JSON_CHUNK_MAGIC: u32 = 0x4E4F_534A; // "JSON"
const BIN_CHUNK_MAGIC: u32 = 0x004E_4942; // "BIN\0"

/// Writes a binary glTF 2.0 (`.glb`) for a scene: one buffer holding every
/// segment's interleaved-free position/normal/texcoord/index streams back
/// to back, one mesh per segment, one node per scene node with its
/// hierarchy preserved. Skinning data is not emitted (spec.md Non-goals).
pub struct GltfFormatWriter;

impl GltfFormatWriter {
    pub fn write(scene: &Scene) -> Result<Vec<u8>> {
        if scene.segments.is_empty() {
            return Err(ModelFormatError::EmptyScene);
        }

        let mut root = json::Root::default();
        let mut bin = Vec::new();

        root.asset = json::Asset {
            version: "2.0".to_string(),
            generator: Some("unmunge-rs".to_string()),
            ..Default::default()
        };

        let buffer_view = |root: &mut json::Root, bin: &mut Vec<u8>, bytes: &[u8], target: Option<json::buffer::Target>| {
            let byte_offset = bin.len();
            bin.extend_from_slice(bytes);
            while bin.len() % 4 != 0 {
                bin.push(0);
            }
            let view_index = root.buffer_views.len() as u32;
            root.buffer_views.push(json::buffer::View {
                buffer: json::Index::new(0),
                byte_length: USize64::from(bytes.len()),
                byte_offset: Some(USize64::from(byte_offset)),
                byte_stride: None,
                target: target.map(Valid),
                name: None,
                extensions: None,
                extras: Default::default(),
            });
            json::Index::<json::buffer::View>::new(view_index)
        };

        let mut mesh_indices = Vec::with_capacity(scene.segments.len());

        for segment in &scene.segments {
            let mut attributes = std::collections::BTreeMap::new();

            let position_bytes: Vec<u8> = segment
                .vertices
                .positions
                .iter()
                .flat_map(|p| [p.x, p.y, p.z])
                .flat_map(|c| c.to_le_bytes())
                .collect();
            let position_view = buffer_view(
                &mut root,
                &mut bin,
                &position_bytes,
                Some(json::buffer::Target::ArrayBuffer),
            );

            let (min, max) = positions_bounds(&segment.vertices.positions);
            let position_accessor = root.accessors.len() as u32;
            root.accessors.push(json::Accessor {
                buffer_view: Some(position_view),
                byte_offset: Some(USize64::from(0usize)),
                component_type: Valid(json::accessor::GenericComponentType(
                    json::accessor::ComponentType::F32,
                )),
                count: USize64::from(segment.vertices.positions.len()),
                type_: Valid(json::accessor::Type::Vec3),
                min: Some(serde_json::json!(min)),
                max: Some(serde_json::json!(max)),
                normalized: false,
                sparse: None,
                name: None,
                extensions: None,
                extras: Default::default(),
            });
            attributes.insert(
                Valid(json::mesh::Semantic::Positions),
                json::Index::new(position_accessor),
            );

            if !segment.vertices.normals.is_empty() {
                let normal_bytes: Vec<u8> = segment
                    .vertices
                    .normals
                    .iter()
                    .flat_map(|n| [n.x, n.y, n.z])
                    .flat_map(|c| c.to_le_bytes())
                    .collect();
                let normal_view = buffer_view(
                    &mut root,
                    &mut bin,
                    &normal_bytes,
                    Some(json::buffer::Target::ArrayBuffer),
                );
                let normal_accessor = root.accessors.len() as u32;
                root.accessors.push(json::Accessor {
                    buffer_view: Some(normal_view),
                    byte_offset: Some(USize64::from(0usize)),
                    component_type: Valid(json::accessor::GenericComponentType(
                        json::accessor::ComponentType::F32,
                    )),
                    count: USize64::from(segment.vertices.normals.len()),
                    type_: Valid(json::accessor::Type::Vec3),
                    min: None,
                    max: None,
                    normalized: false,
                    sparse: None,
                    name: None,
                    extensions: None,
                    extras: Default::default(),
                });
                attributes.insert(
                    Valid(json::mesh::Semantic::Normals),
                    json::Index::new(normal_accessor),
                );
            }

            if !segment.vertices.texcoords.is_empty() {
                let uv_bytes: Vec<u8> = segment
                    .vertices
                    .texcoords
                    .iter()
                    .flat_map(|uv| uv.iter().flat_map(|c| c.to_le_bytes()).collect::<Vec<_>>())
                    .collect();
                let uv_view = buffer_view(&mut root, &mut bin, &uv_bytes, Some(json::buffer::Target::ArrayBuffer));
                let uv_accessor = root.accessors.len() as u32;
                root.accessors.push(json::Accessor {
                    buffer_view: Some(uv_view),
                    byte_offset: Some(USize64::from(0usize)),
                    component_type: Valid(json::accessor::GenericComponentType(
                        json::accessor::ComponentType::F32,
                    )),
                    count: USize64::from(segment.vertices.texcoords.len()),
                    type_: Valid(json::accessor::Type::Vec2),
                    min: None,
                    max: None,
                    normalized: false,
                    sparse: None,
                    name: None,
                    extensions: None,
                    extras: Default::default(),
                });
                attributes.insert(
                    Valid(json::mesh::Semantic::TexCoords(0)),
                    json::Index::new(uv_accessor),
                );
            }

            let triangle_list = segment.triangle_list();
            let index_bytes: Vec<u8> = triangle_list
                .iter()
                .flat_map(|i| (*i as u32).to_le_bytes())
                .collect();
            let index_view = buffer_view(
                &mut root,
                &mut bin,
                &index_bytes,
                Some(json::buffer::Target::ElementArrayBuffer),
            );
            let index_accessor = root.accessors.len() as u32;
            root.accessors.push(json::Accessor {
                buffer_view: Some(index_view),
                byte_offset: Some(USize64::from(0usize)),
                component_type: Valid(json::accessor::GenericComponentType(
                    json::accessor::ComponentType::U32,
                )),
                count: USize64::from(triangle_list.len()),
                type_: Valid(json::accessor::Type::Scalar),
                min: None,
                max: None,
                normalized: false,
                sparse: None,
                name: None,
                extensions: None,
                extras: Default::default(),
            });

            let mesh_index = root.meshes.len() as u32;
            root.meshes.push(json::Mesh {
                name: None,
                primitives: vec![json::mesh::Primitive {
                    attributes,
                    indices: Some(json::Index::new(index_accessor)),
                    material: None,
                    mode: Valid(json::mesh::Mode::Triangles),
                    targets: None,
                    extensions: None,
                    extras: Default::default(),
                }],
                weights: None,
                extensions: None,
                extras: Default::default(),
            });
            mesh_indices.push(json::Index::<json::Mesh>::new(mesh_index));
        }

        let mut children: Vec<Vec<u32>> = vec![Vec::new(); scene.nodes.len()];
        for (i, node) in scene.nodes.iter().enumerate() {
            if let Some(parent) = node.parent {
                children[parent].push(i as u32);
            }
        }

        let mut node_indices = Vec::with_capacity(scene.nodes.len());
        for (i, node) in scene.nodes.iter().enumerate() {
            let (scale, rotation, translation) = node.transform.to_scale_rotation_translation();
            let node_children = &children[i];

            root.nodes.push(json::Node {
                camera: None,
                children: if node_children.is_empty() {
                    None
                } else {
                    Some(
                        node_children
                            .iter()
                            .map(|&c| json::Index::new(c))
                            .collect(),
                    )
                },
                extensions: None,
                extras: Default::default(),
                matrix: None,
                mesh: node.segment.map(|idx| mesh_indices[idx]),
                name: Some(node.name.clone()),
                rotation: Some(json::scene::UnitQuaternion([
                    rotation.x, rotation.y, rotation.z, rotation.w,
                ])),
                scale: Some([scale.x, scale.y, scale.z]),
                translation: Some([translation.x, translation.y, translation.z]),
                skin: None,
                weights: None,
            });
            node_indices.push(i as u32);
        }

        let root_nodes: Vec<json::Index<json::Node>> = scene
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(i, _)| json::Index::new(i as u32))
            .collect();

        root.scenes.push(json::Scene {
            extensions: None,
            extras: Default::default(),
            name: None,
            nodes: root_nodes,
        });
        root.scene = Some(json::Index::new(0));

        root.buffers.push(json::Buffer {
            byte_length: USize64::from(bin.len()),
            name: None,
            uri: None,
            extensions: None,
            extras: Default::default(),
        });

        let json_string = serde_json::to_string(&root)?;

        Ok(write_glb(json_string.as_bytes(), &bin))
    }
}

fn positions_bounds(positions: &[glam::Vec3]) -> ([f32; 3], [f32; 3]) {
    let mut min = [f32::INFINITY; 3];
    let mut max = [f32::NEG_INFINITY; 3];
    for p in positions {
        for (i, c) in [p.x, p.y, p.z].into_iter().enumerate() {
            min[i] = min[i].min(c);
            max[i] = max[i].max(c);
        }
    }
    if positions.is_empty() {
        return ([0.0; 3], [0.0; 3]);
    }
    (min, max)
}

fn write_glb(json_bytes: &[u8], bin_bytes: &[u8]) -> Vec<u8> {
    let mut json_chunk = json_bytes.to_vec();
    while json_chunk.len() % 4 != 0 {
        json_chunk.push(b' ');
    }

    let mut bin_chunk = bin_bytes.to_vec();
    while bin_chunk.len() % 4 != 0 {
        bin_chunk.push(0);
    }

    let total_len = 12 + 8 + json_chunk.len() + 8 + bin_chunk.len();

    let mut out = Vec::with_capacity(total_len);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&(total_len as u32).to_le_bytes());

    out.extend_from_slice(&(json_chunk.len() as u32).to_le_bytes());
    out.extend_from_slice(&JSON_CHUNK_MAGIC.to_le_bytes());
    out.extend_from_slice(&json_chunk);

    out.extend_from_slice(&(bin_chunk.len() as u32).to_le_bytes());
    out.extend_from_slice(&BIN_CHUNK_MAGIC.to_le_bytes());
    out.extend_from_slice(&bin_chunk);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use ucfb_scene::{Lod, ModelFragment, ModelsBuilder, Part, Segment, Topology, VertexBlock};

    fn sample_scene() -> Scene {
        let builder = ModelsBuilder::new();
        builder.integrate(
            "crate",
            ModelFragment {
                parts: vec![Part {
                    name: "body".to_string(),
                    lod: Lod::Zero,
                    segments: vec![Segment {
                        material_index: 0,
                        topology: Topology::TriangleList,
                        vertices: VertexBlock {
                            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
                            normals: Vec::new(),
                            texcoords: Vec::new(),
                            bone_weights: Vec::new(),
                            ..Default::default()
                        },
                        indices: vec![0, 1, 2],
                        bone_map: Vec::new(),
                    }],
                }],
                ..Default::default()
            },
        );
        builder.scene_for("crate").unwrap()
    }

    #[test]
    fn writes_a_well_formed_glb_header() {
        let bytes = GltfFormatWriter::write(&sample_scene()).unwrap();
        assert_eq!(&bytes[0..4], b"glTF");
        let version = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        assert_eq!(version, 2);
        let total_len = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
        assert_eq!(total_len as usize, bytes.len());
    }

    #[test]
    fn empty_scene_is_rejected() {
        let scene = Scene {
            materials: Vec::new(),
            nodes: Vec::new(),
            segments: Vec::new(),
            collision_meshes: Vec::new(),
            cloth: Vec::new(),
            collision_primitives: Vec::new(),
            aabb_min: Vec3::ZERO,
            aabb_max: Vec3::ZERO,
        };
        assert!(matches!(
            GltfFormatWriter::write(&scene),
            Err(ModelFormatError::EmptyScene)
        ));
    }
}
