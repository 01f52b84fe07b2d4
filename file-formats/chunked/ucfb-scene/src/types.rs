use glam::{Mat4, Vec3};
use ucfb_dispatch::GameVersion;

use crate::topology::Topology;

/// Level of detail a model part was authored at.
///
/// `Three` round-trips through a `_lod3` filename suffix onto [`Lod::Two`]
/// rather than a dedicated variant: the original munge pipeline collapses
/// the two (see `lod_suffix` in the upstream model builder), which reads as
/// a typo that shipped content has long since depended on. We preserve the
/// quirk rather than "fix" it, since correcting it would silently rename
/// every `_lod3` part already extracted from shipped assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lod {
    Zero,
    One,
    Two,
    LowRes,
}

impl Lod {
    pub fn suffix(self) -> &'static str {
        match self {
            Lod::Zero => "",
            Lod::One => "_lod1",
            Lod::Two => "_lod2",
            Lod::LowRes => "_lowres",
        }
    }

    /// Parses a model part name's LOD suffix, folding `_lod3` onto
    /// [`Lod::Two`] to match the asymmetry in [`Lod::suffix`].
    pub fn parse_suffix(name: &str) -> (&str, Lod) {
        for (suffix, lod) in [
            ("_lowres", Lod::LowRes),
            ("_lod1", Lod::One),
            ("_lod2", Lod::Two),
            ("_lod3", Lod::Two),
        ] {
            if let Some(stripped) = name.strip_suffix(suffix) {
                return (stripped, lod);
            }
        }
        (name, Lod::Zero)
    }
}

/// Fixed-function render mode a material was authored with. The raw u32 a
/// material chunk carries means different things depending on which game
/// version wrote it, so this is always produced through
/// [`RenderType::from_raw`] rather than a bare cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderType {
    Normal,
    Glow,
    Transparent,
    Doublesided,
    Hardedged,
    PerPixel,
    Unknown(u32),
}

impl RenderType {
    pub fn from_raw(raw: u32, version: GameVersion) -> Self {
        match (version, raw) {
            (GameVersion::SwbfIi, 0) => RenderType::Normal,
            (GameVersion::SwbfIi, 1) => RenderType::Glow,
            (GameVersion::SwbfIi, 2) => RenderType::Transparent,
            (GameVersion::SwbfIi, 3) => RenderType::Doublesided,
            (GameVersion::SwbfIi, 4) => RenderType::Hardedged,
            (GameVersion::SwbfIi, 5) => RenderType::PerPixel,
            // swbf (2004) shipped a narrower, differently ordered table.
            (GameVersion::Swbf, 0) => RenderType::Normal,
            (GameVersion::Swbf, 1) => RenderType::Transparent,
            (GameVersion::Swbf, 2) => RenderType::Doublesided,
            (GameVersion::Swbf, 3) => RenderType::Hardedged,
            (_, other) => RenderType::Unknown(other),
        }
    }
}

/// Material collision/physics flags, surfaced as the single-letter string
/// the original tool emits (`s`/`v`/`b`/`t`/`o`/`f`, one letter per set
/// flag) for diagnostic dumps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollisionFlags {
    pub soldier: bool,
    pub vehicle: bool,
    pub building: bool,
    pub terrain: bool,
    pub ordnance: bool,
    pub flyer: bool,
}

impl CollisionFlags {
    /// Every collision category set, the default a collision mesh or
    /// primitive carries when its optional `MASK` chunk is absent.
    pub fn all() -> Self {
        CollisionFlags {
            soldier: true,
            vehicle: true,
            building: true,
            terrain: true,
            ordnance: true,
            flyer: true,
        }
    }

    /// Decodes the single-byte bitmask `MASK` chunks carry, one bit per
    /// category in the same order as [`CollisionFlags::as_letters`].
    pub fn from_mask(mask: u8) -> Self {
        CollisionFlags {
            soldier: mask & 0x01 != 0,
            vehicle: mask & 0x02 != 0,
            building: mask & 0x04 != 0,
            terrain: mask & 0x08 != 0,
            ordnance: mask & 0x10 != 0,
            flyer: mask & 0x20 != 0,
        }
    }

    pub fn as_letters(self) -> String {
        let mut s = String::new();
        if self.soldier {
            s.push('s');
        }
        if self.vehicle {
            s.push('v');
        }
        if self.building {
            s.push('b');
        }
        if self.terrain {
            s.push('t');
        }
        if self.ordnance {
            s.push('o');
        }
        if self.flyer {
            s.push('f');
        }
        s
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub rendertype: RenderType,
    pub collision_flags: CollisionFlags,
    /// Up to four texture names, diffuse first; unused slots are `None`.
    pub textures: [Option<String>; 4],
}

impl Material {
    /// The material every scene starts with at index 0 (grey, untextured),
    /// matching the default material the upstream builder always pushes
    /// first so primitives with no material reference something valid.
    pub fn default_grey() -> Self {
        Material {
            name: "default".to_string(),
            rendertype: RenderType::Normal,
            collision_flags: CollisionFlags::default(),
            textures: [None, None, None, None],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VertexBlock {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec3>,
    pub bitangents: Vec<Vec3>,
    pub texcoords: Vec<[f32; 2]>,
    pub colors: Vec<[u8; 4]>,
    /// Per-vertex bone weights, parallel to `positions`; empty for
    /// unskinned geometry.
    pub bone_weights: Vec<Vec<(u8, f32)>>,
    /// Set when positions/normals/tangents/bitangents are still baked into
    /// their node's world transform and still need [`reverse_pretransforms`]
    /// run over them (spec.md §4.F, grounded on `model_scene.cpp`).
    ///
    /// [`reverse_pretransforms`]: crate::scene::reverse_pretransforms
    pub pretransformed: bool,
    pub static_lighting: bool,
    pub softskinned: bool,
}

impl VertexBlock {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Segment {
    pub material_index: usize,
    pub topology: Topology,
    pub vertices: VertexBlock,
    pub indices: Vec<u16>,
    /// Local vertex-bone-index -> skeleton bone-index table from this
    /// segment's `BMAP` chunk; empty for rigid (unskinned) segments.
    pub bone_map: Vec<u8>,
}

impl Segment {
    /// Indices normalized to a plain triangle list, as every output format
    /// wants (spec.md §4.F).
    pub fn triangle_list(&self) -> Vec<u16> {
        crate::topology::to_triangle_list(self.topology, &self.indices)
    }
}

#[derive(Debug, Clone)]
pub struct Part {
    pub name: String,
    pub lod: Lod,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,
    pub parent: Option<String>,
    /// Bone-space transform relative to its parent.
    pub transform: Mat4,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CollisionPrimitiveShape {
    Sphere { radius: f32 },
    Cylinder { radius: f32, height: f32 },
    Cube { half_extents: Vec3 },
}

#[derive(Debug, Clone)]
pub struct CollisionPrimitive {
    pub name: String,
    pub parent_bone: Option<String>,
    pub transform: Mat4,
    pub shape: CollisionPrimitiveShape,
    pub flags: CollisionFlags,
}

/// A `coll` chunk's actual collision geometry: real vertex positions plus
/// one triangle strip per `TREE` leaf, grounded on `handle_collision.cpp`'s
/// `msh::Collsion_mesh` (`positions`, `strips`, `flags`, no stored parent —
/// every collision mesh is parented directly to the scene root when its
/// node is created). Kept distinct from [`CollisionPrimitive`], which comes
/// from a separate `prim` chunk and describes a procedural sphere/cylinder/
/// cube shape rather than authored mesh data.
#[derive(Debug, Clone, Default)]
pub struct CollisionMesh {
    pub positions: Vec<Vec3>,
    /// One strip of `TREE`/`LEAF` indices per leaf node, unflattened.
    pub strips: Vec<Vec<u16>>,
    pub flags: CollisionFlags,
}

impl CollisionMesh {
    /// Every leaf strip flattened and concatenated into a single triangle
    /// list, the shape every output format wants (spec.md §4.F).
    pub fn triangle_list(&self) -> Vec<u16> {
        let mut out = Vec::new();
        for strip in &self.strips {
            out.extend(crate::topology::to_triangle_list(Topology::TriangleStrip, strip));
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct ClothPatch {
    pub name: String,
    pub parent_bone: Option<String>,
    pub positions: Vec<Vec3>,
    pub fixed_points: Vec<u16>,
    pub indices: Vec<u16>,
}

/// One model's fragments as they trickle in from independent chunk
/// handlers. `ModelsBuilder::integrate` merges a fragment of this shape
/// into the model accumulating under its name; a fragment may set only the
/// fields it actually carries, leaving the rest at their `Default`.
#[derive(Debug, Clone, Default)]
pub struct ModelFragment {
    pub bones: Vec<Bone>,
    pub parts: Vec<Part>,
    pub materials: Vec<Material>,
    pub collision_meshes: Vec<CollisionMesh>,
    pub collision_primitives: Vec<CollisionPrimitive>,
    pub cloth: Vec<ClothPatch>,
}

#[derive(Debug, Clone, Default)]
pub struct Model {
    pub name: String,
    pub bones: Vec<Bone>,
    pub parts: Vec<Part>,
    pub materials: Vec<Material>,
    pub collision_meshes: Vec<CollisionMesh>,
    pub collision_primitives: Vec<CollisionPrimitive>,
    pub cloth: Vec<ClothPatch>,
}

impl Model {
    pub fn integrate(&mut self, fragment: ModelFragment) {
        self.bones.extend(fragment.bones);
        self.parts.extend(fragment.parts);
        self.materials.extend(fragment.materials);
        self.collision_meshes.extend(fragment.collision_meshes);
        self.collision_primitives.extend(fragment.collision_primitives);
        self.cloth.extend(fragment.cloth);
    }
}
