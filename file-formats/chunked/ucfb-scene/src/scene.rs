use glam::{Mat3, Mat4, Vec3};

use crate::types::{
    ClothPatch, CollisionMesh, CollisionPrimitive, CollisionPrimitiveShape, Lod, Material, Model,
    Part, Segment,
};

/// What kind of payload a [`Node`] carries, matching the original scene
/// graph's `Node_type` (`model_scene.hpp`) one-for-one except for the
/// naming of `collision` as `CollisionMesh`, to match spec.md's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Null,
    Geometry,
    Cloth,
    CollisionMesh,
    CollisionPrimitive,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub parent: Option<usize>,
    pub transform: Mat4,
    pub kind: NodeKind,
    pub lod: Lod,
    /// Local-space (pre-world-transform) bounding box of this node's own
    /// geometry; `(Vec3::ZERO, Vec3::ZERO)` for nodes that carry none.
    pub aabb: (Vec3, Vec3),
    /// Index into [`Scene::segments`], for [`NodeKind::Geometry`] and
    /// [`NodeKind::CollisionPrimitive`] nodes (the latter via a procedural
    /// visualization mesh).
    pub segment: Option<usize>,
    /// Index into [`Scene::collision_meshes`], for [`NodeKind::CollisionMesh`].
    pub collision_mesh: Option<usize>,
    /// Index into [`Scene::cloth`], for [`NodeKind::Cloth`].
    pub cloth: Option<usize>,
    /// Index into [`Scene::collision_primitives`], for
    /// [`NodeKind::CollisionPrimitive`] (the shape/flags the node's
    /// visualization segment was generated from).
    pub collision_primitive: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Scene {
    pub materials: Vec<Material>,
    pub nodes: Vec<Node>,
    pub segments: Vec<Segment>,
    pub collision_meshes: Vec<CollisionMesh>,
    pub cloth: Vec<ClothPatch>,
    pub collision_primitives: Vec<CollisionPrimitive>,
    pub aabb_min: Vec3,
    pub aabb_max: Vec3,
}

/// Builds a renderable [`Scene`] out of one integrated [`Model`], matching
/// the upstream model builder's node ordering: default material first,
/// then a root bone (or a synthetic `null` root if the model is rigid),
/// then one bone node per bone, then one node per mesh part, then one node
/// per collision mesh (parented to the root), then one node per collision
/// primitive, then one node per cloth patch — finally reversing pretransforms
/// and recomputing every node's and the scene's bounding box
/// (`model_builder.cpp`'s post-pass, `model_scene.cpp`).
pub fn create_scene(model: &Model) -> Scene {
    let mut materials = vec![Material::default_grey()];
    for material in &model.materials {
        insert_scene_material(&mut materials, material.clone());
    }

    let mut nodes = Vec::new();

    if model.bones.is_empty() {
        nodes.push(null_node("null", None));
    } else {
        for bone in &model.bones {
            let parent = bone
                .parent
                .as_deref()
                .and_then(|parent_name| nodes.iter().position(|n: &Node| n.name == parent_name));
            nodes.push(Node {
                transform: bone.transform,
                ..null_node(&bone.name, parent)
            });
        }
    }
    let root = 0usize;

    let mut segments = Vec::new();
    let mut anonymous_part_counter = 0usize;

    for part in &model.parts {
        let base_name = if part.name.is_empty() {
            let name = format!("mesh_part{anonymous_part_counter}");
            anonymous_part_counter += 1;
            name
        } else {
            part.name.clone()
        };
        let name = format!("{base_name}{}", part.lod.suffix());

        for segment in &part.segments {
            let segment_index = segments.len();
            segments.push(segment.clone());
            nodes.push(Node {
                name: name.clone(),
                parent: Some(root),
                transform: Mat4::IDENTITY,
                kind: NodeKind::Geometry,
                lod: part.lod,
                aabb: (Vec3::ZERO, Vec3::ZERO),
                segment: Some(segment_index),
                collision_mesh: None,
                cloth: None,
                collision_primitive: None,
            });
        }
    }

    let mut collision_meshes = Vec::new();
    for (n, mesh) in model.collision_meshes.iter().enumerate() {
        let mesh_index = collision_meshes.len();
        collision_meshes.push(mesh.clone());
        nodes.push(Node {
            name: format!("collision_-{}-mesh{n}", mesh.flags.as_letters()),
            parent: Some(root),
            transform: Mat4::IDENTITY,
            kind: NodeKind::CollisionMesh,
            lod: Lod::Zero,
            aabb: (Vec3::ZERO, Vec3::ZERO),
            segment: None,
            collision_mesh: Some(mesh_index),
            cloth: None,
            collision_primitive: None,
        });
    }

    let mut collision_primitives = Vec::new();
    for primitive in &model.collision_primitives {
        let (positions, indices) = visualization_geometry(primitive.shape);
        let segment_index = segments.len();
        segments.push(Segment {
            material_index: 0,
            topology: crate::topology::Topology::TriangleList,
            vertices: crate::types::VertexBlock {
                positions,
                ..Default::default()
            },
            indices,
            bone_map: Vec::new(),
        });
        let primitive_index = collision_primitives.len();
        collision_primitives.push(primitive.clone());

        let parent = primitive
            .parent_bone
            .as_deref()
            .and_then(|parent_name| nodes.iter().position(|n| n.name == parent_name));
        nodes.push(Node {
            name: primitive.name.clone(),
            parent,
            transform: primitive.transform,
            kind: NodeKind::CollisionPrimitive,
            lod: Lod::Zero,
            aabb: (Vec3::ZERO, Vec3::ZERO),
            segment: Some(segment_index),
            collision_mesh: None,
            cloth: None,
            collision_primitive: Some(primitive_index),
        });
    }

    let mut cloth = Vec::new();
    for patch in &model.cloth {
        let cloth_index = cloth.len();
        cloth.push(patch.clone());
        let parent = patch
            .parent_bone
            .as_deref()
            .and_then(|parent_name| nodes.iter().position(|n| n.name == parent_name));
        nodes.push(Node {
            name: patch.name.clone(),
            parent,
            transform: Mat4::IDENTITY,
            kind: NodeKind::Cloth,
            lod: Lod::Zero,
            aabb: (Vec3::ZERO, Vec3::ZERO),
            segment: None,
            collision_mesh: None,
            cloth: Some(cloth_index),
            collision_primitive: None,
        });
    }

    let mut scene = Scene {
        materials,
        nodes,
        segments,
        collision_meshes,
        cloth,
        collision_primitives,
        aabb_min: Vec3::ZERO,
        aabb_max: Vec3::ZERO,
    };

    reverse_pretransforms(&mut scene);
    recreate_aabbs(&mut scene);
    scene
}

fn null_node(name: &str, parent: Option<usize>) -> Node {
    Node {
        name: name.to_string(),
        parent,
        transform: Mat4::IDENTITY,
        kind: NodeKind::Null,
        lod: Lod::Zero,
        aabb: (Vec3::ZERO, Vec3::ZERO),
        segment: None,
        collision_mesh: None,
        cloth: None,
        collision_primitive: None,
    }
}

/// Composes a node's parent chain into a single local-to-world matrix,
/// grounded on `model_scene.cpp`'s `build_node_matrix`.
fn node_world_matrix(nodes: &[Node], index: usize) -> Mat4 {
    let mut matrix = nodes[index].transform;
    let mut current = index;
    while let Some(parent) = nodes[current].parent {
        matrix = nodes[parent].transform * matrix;
        current = parent;
    }
    matrix
}

/// Undoes the world-space baking of geometry flagged `pretransformed`,
/// walking each such node's parent chain and applying the inverse
/// transform to positions (inverse matrix) and normals/tangents/bitangents
/// (inverse of the 3x3 rotation part), per `model_scene.cpp`'s
/// `reverse_pretransforms`.
pub fn reverse_pretransforms(scene: &mut Scene) {
    for i in 0..scene.nodes.len() {
        if scene.nodes[i].kind != NodeKind::Geometry {
            continue;
        }
        let Some(seg_idx) = scene.nodes[i].segment else {
            continue;
        };
        if !scene.segments[seg_idx].vertices.pretransformed {
            continue;
        }

        let matrix = node_world_matrix(&scene.nodes, i);
        let inv_matrix = matrix.inverse();
        let inv_rot = Mat3::from_mat4(matrix).inverse();

        let vertices = &mut scene.segments[seg_idx].vertices;
        for p in &mut vertices.positions {
            *p = inv_matrix.transform_point3(*p);
        }
        for n in &mut vertices.normals {
            *n = inv_rot * *n;
        }
        for t in &mut vertices.tangents {
            *t = inv_rot * *t;
        }
        for b in &mut vertices.bitangents {
            *b = inv_rot * *b;
        }
        vertices.pretransformed = false;
    }
}

/// Recomputes every geometry/cloth node's local bounding box and the
/// scene's world-space bounding box from scratch, per `model_scene.cpp`'s
/// `recreate_aabbs`.
pub fn recreate_aabbs(scene: &mut Scene) {
    let mut global_min = Vec3::splat(f32::INFINITY);
    let mut global_max = Vec3::splat(f32::NEG_INFINITY);

    for i in 0..scene.nodes.len() {
        let positions: Option<Vec<Vec3>> = match scene.nodes[i].kind {
            NodeKind::Geometry | NodeKind::CollisionPrimitive => scene.nodes[i]
                .segment
                .map(|s| scene.segments[s].vertices.positions.clone()),
            NodeKind::Cloth => scene.nodes[i]
                .cloth
                .map(|c| scene.cloth[c].positions.clone()),
            _ => None,
        };
        let Some(positions) = positions else { continue };

        let (local_min, local_max) = aabb_of(&positions);
        scene.nodes[i].aabb = (local_min, local_max);

        let world = node_world_matrix(&scene.nodes, i);
        for &p in &positions {
            let wp = world.transform_point3(p);
            global_min = global_min.min(wp);
            global_max = global_max.max(wp);
        }
    }

    if global_min.is_finite() {
        scene.aabb_min = global_min;
        scene.aabb_max = global_max;
    } else {
        scene.aabb_min = Vec3::ZERO;
        scene.aabb_max = Vec3::ZERO;
    }
}

/// Pushes `candidate` unless an equal material already exists, returning
/// its index either way. Keeps re-exploded scenes from duplicating a
/// material every time two parts happen to share one.
fn insert_scene_material(materials: &mut Vec<Material>, candidate: Material) -> usize {
    if let Some(index) = materials.iter().position(|m| *m == candidate) {
        return index;
    }
    materials.push(candidate);
    materials.len() - 1
}

fn aabb_of(positions: &[Vec3]) -> (Vec3, Vec3) {
    let mut min = Vec3::splat(f32::INFINITY);
    let mut max = Vec3::splat(f32::NEG_INFINITY);

    for &p in positions {
        min = min.min(p);
        max = max.max(p);
    }

    if !min.is_finite() {
        return (Vec3::ZERO, Vec3::ZERO);
    }
    (min, max)
}

/// Low-poly mesh used to visualize a collision primitive in exported
/// scenes, since the primitive itself carries no render geometry.
fn visualization_geometry(shape: CollisionPrimitiveShape) -> (Vec<Vec3>, Vec<u16>) {
    match shape {
        CollisionPrimitiveShape::Cube { half_extents } => cube_geometry(half_extents),
        CollisionPrimitiveShape::Sphere { radius } => sphere_geometry(radius, 8, 4),
        CollisionPrimitiveShape::Cylinder { radius, height } => {
            cylinder_geometry(radius, height, 12)
        }
    }
}

fn cube_geometry(half: Vec3) -> (Vec<Vec3>, Vec<u16>) {
    let positions = vec![
        Vec3::new(-half.x, -half.y, -half.z),
        Vec3::new(half.x, -half.y, -half.z),
        Vec3::new(half.x, half.y, -half.z),
        Vec3::new(-half.x, half.y, -half.z),
        Vec3::new(-half.x, -half.y, half.z),
        Vec3::new(half.x, -half.y, half.z),
        Vec3::new(half.x, half.y, half.z),
        Vec3::new(-half.x, half.y, half.z),
    ];
    let indices: Vec<u16> = vec![
        0, 1, 2, 0, 2, 3, // back
        4, 6, 5, 4, 7, 6, // front
        0, 4, 5, 0, 5, 1, // bottom
        3, 2, 6, 3, 6, 7, // top
        0, 3, 7, 0, 7, 4, // left
        1, 5, 6, 1, 6, 2, // right
    ];
    (positions, indices)
}

fn cylinder_geometry(radius: f32, height: f32, segments: u32) -> (Vec<Vec3>, Vec<u16>) {
    let mut positions = Vec::new();
    let half_height = height * 0.5;

    for ring in [-half_height, half_height] {
        for i in 0..segments {
            let angle = (i as f32 / segments as f32) * std::f32::consts::TAU;
            positions.push(Vec3::new(angle.cos() * radius, ring, angle.sin() * radius));
        }
    }

    let mut indices = Vec::new();
    for i in 0..segments {
        let next = (i + 1) % segments;
        let (a, b) = (i as u16, next as u16);
        let (c, d) = (segments as u16 + i as u16, segments as u16 + next as u16);
        indices.extend_from_slice(&[a, b, d, a, d, c]);
    }

    (positions, indices)
}

fn sphere_geometry(radius: f32, longitude_segments: u32, latitude_segments: u32) -> (Vec<Vec3>, Vec<u16>) {
    let mut positions = Vec::new();
    for lat in 0..=latitude_segments {
        let theta = std::f32::consts::PI * lat as f32 / latitude_segments as f32;
        for lon in 0..longitude_segments {
            let phi = std::f32::consts::TAU * lon as f32 / longitude_segments as f32;
            positions.push(Vec3::new(
                radius * theta.sin() * phi.cos(),
                radius * theta.cos(),
                radius * theta.sin() * phi.sin(),
            ));
        }
    }

    let mut indices = Vec::new();
    for lat in 0..latitude_segments {
        for lon in 0..longitude_segments {
            let next_lon = (lon + 1) % longitude_segments;
            let a = lat * longitude_segments + lon;
            let b = lat * longitude_segments + next_lon;
            let c = (lat + 1) * longitude_segments + lon;
            let d = (lat + 1) * longitude_segments + next_lon;
            indices.extend_from_slice(&[a as u16, c as u16, b as u16, b as u16, c as u16, d as u16]);
        }
    }

    (positions, indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::Topology;
    use crate::types::VertexBlock;

    fn dummy_segment(material_index: usize) -> Segment {
        Segment {
            material_index,
            topology: Topology::TriangleList,
            vertices: VertexBlock {
                positions: vec![Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 2.0, 3.0)],
                ..Default::default()
            },
            indices: vec![0, 1, 0],
            bone_map: Vec::new(),
        }
    }

    #[test]
    fn default_material_is_always_index_zero() {
        let model = Model::default();
        let scene = create_scene(&model);
        assert_eq!(scene.materials.len(), 1);
        assert_eq!(scene.materials[0].name, "default");
    }

    #[test]
    fn rigid_model_gets_a_synthetic_null_root() {
        let mut model = Model::default();
        model.parts.push(Part {
            name: String::new(),
            lod: Lod::Zero,
            segments: vec![dummy_segment(0)],
        });
        let scene = create_scene(&model);

        assert_eq!(scene.nodes[0].name, "null");
        assert_eq!(scene.nodes[0].kind, NodeKind::Null);
        assert_eq!(scene.nodes[1].name, "mesh_part0");
        assert_eq!(scene.nodes[1].kind, NodeKind::Geometry);
    }

    #[test]
    fn lod_suffix_is_appended_to_named_parts() {
        let mut model = Model::default();
        model.parts.push(Part {
            name: "fuselage".to_string(),
            lod: Lod::One,
            segments: vec![dummy_segment(0)],
        });
        let scene = create_scene(&model);
        assert!(scene.nodes.iter().any(|n| n.name == "fuselage_lod1"));
    }

    #[test]
    fn aabb_covers_every_segment_vertex() {
        let mut model = Model::default();
        model.parts.push(Part {
            name: "part".to_string(),
            lod: Lod::Zero,
            segments: vec![dummy_segment(0)],
        });
        let scene = create_scene(&model);
        assert_eq!(scene.aabb_min, Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(scene.aabb_max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn duplicate_materials_are_deduplicated_by_equality() {
        let mut model = Model::default();
        let material = Material::default_grey();
        model.materials.push(material.clone());
        model.materials.push(material);
        let scene = create_scene(&model);
        // default + one deduplicated copy, not three
        assert_eq!(scene.materials.len(), 1);
    }

    #[test]
    fn collision_mesh_becomes_a_node_parented_to_root() {
        let mut model = Model::default();
        model.collision_meshes.push(CollisionMesh {
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            strips: vec![vec![0, 1, 2]],
            flags: crate::types::CollisionFlags::all(),
        });
        let scene = create_scene(&model);

        let node = scene
            .nodes
            .iter()
            .find(|n| n.kind == NodeKind::CollisionMesh)
            .unwrap();
        assert_eq!(node.parent, Some(0));
        assert!(node.name.starts_with("collision_-"));
        let mesh = &scene.collision_meshes[node.collision_mesh.unwrap()];
        assert_eq!(mesh.positions.len(), 3);
        assert_eq!(mesh.triangle_list(), vec![0, 1, 2]);
    }

    #[test]
    fn cloth_patches_become_graph_nodes() {
        let mut model = Model::default();
        model.cloth.push(ClothPatch {
            name: "cape".to_string(),
            parent_bone: None,
            positions: vec![Vec3::ZERO],
            fixed_points: Vec::new(),
            indices: Vec::new(),
        });
        let scene = create_scene(&model);
        let node = scene.nodes.iter().find(|n| n.name == "cape").unwrap();
        assert_eq!(node.kind, NodeKind::Cloth);
        assert!(scene.cloth[node.cloth.unwrap()].positions.len() == 1);
    }
}
