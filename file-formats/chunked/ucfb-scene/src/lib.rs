//! Thread-safe model fragment integration and the scene/topology data
//! model that sits between chunk handlers and the output format writers
//! (spec.md §3.2, §3.3, §4.E, §4.F).

mod builder;
mod error;
mod scene;
mod topology;
mod types;

pub use builder::ModelsBuilder;
pub use error::{Result, SceneError};
pub use scene::{create_scene, reverse_pretransforms, recreate_aabbs, Node, NodeKind, Scene};
pub use topology::{to_triangle_list, to_triangle_strip_ps2, Topology};
pub use types::{
    Bone, ClothPatch, CollisionFlags, CollisionMesh, CollisionPrimitive, CollisionPrimitiveShape,
    Lod, Material, Model, ModelFragment, Part, RenderType, Segment, VertexBlock,
};
