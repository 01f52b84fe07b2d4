use glam::Vec3;
use ucfb_chunk::{tag, ChunkReader, Tag};
use ucfb_dispatch::{DispatchEnv, Result};
use ucfb_scene::{CollisionFlags, CollisionMesh, ModelFragment};

use crate::collaborators::HandlerContext;

const NAME: Tag = tag!("NAME");
const MASK: Tag = tag!("MASK");
const NODE: Tag = tag!("NODE");
const INFO: Tag = tag!("INFO");
const POSI: Tag = tag!("POSI");
const TREE: Tag = tag!("TREE");
const LEAF: Tag = tag!("LEAF");

/// Parses a `coll` chunk's collision mesh — real vertex positions plus one
/// triangle strip per `TREE` leaf — and integrates it as a [`CollisionMesh`]
/// fragment, grounded on `handle_collision.cpp`: `NAME`, optional `MASK`,
/// `NODE`, `INFO`, `POSI`, `TREE` of `LEAF` strips, in that order. The mesh
/// carries no parent of its own; it's parented to the scene root when its
/// `collision_mesh` node is created (spec.md §4.F).
pub fn handle_collision(
    mut collision: ChunkReader<'_>,
    env: DispatchEnv<'_, HandlerContext<'_>>,
) -> Result<()> {
    let mut name_reader = collision.read_child_strict(NAME, false)?;
    let name = String::from_utf8_lossy(name_reader.read_string(true)?).into_owned();

    let mut flags = CollisionFlags::all();
    if let Some(mut mask) = collision.read_child_opt(MASK, false)? {
        let raw: u8 = mask.read_trivial(true)?;
        flags = CollisionFlags::from_mask(raw);
    }

    collision.read_child_strict(NODE, false)?;

    let mut info = collision.read_child_strict(INFO, false)?;
    let vertex_count: u32 = info.read_trivial(true)?;
    let _node_count: u32 = info.read_trivial(true)?;
    let leaf_count: u32 = info.read_trivial(true)?;
    let _unknown: u32 = info.read_trivial(true)?;
    let _bbox = info.read_array::<f32>(6, true)?;

    let mut posi = collision.read_child_strict(POSI, false)?;
    let positions = posi
        .read_array::<[f32; 3]>(vertex_count as usize, true)?
        .into_iter()
        .map(Vec3::from_array)
        .collect::<Vec<_>>();

    let mut tree = collision.read_child_strict(TREE, false)?;
    let mut strips = Vec::with_capacity(leaf_count as usize);
    while tree.has_more() {
        let mut child = tree.read_child(false)?;
        if child.tag() == LEAF {
            strips.push(read_leaf_indices(&mut child)?);
        }
    }

    tracing::debug!(
        model = %name,
        vertex_count,
        leaf_count,
        strip_count = strips.len(),
        "integrated collision mesh"
    );

    env.ctx.models.integrate(
        &name,
        ModelFragment {
            collision_meshes: vec![CollisionMesh {
                positions,
                strips,
                flags,
            }],
            ..Default::default()
        },
    );

    Ok(())
}

/// Reads one leaf strip's index-count header: a single unaligned byte, 6
/// reserved bytes, then the index array, grounded on `handle_collision.cpp`'s
/// `read_tree_leaf`.
pub fn read_leaf_indices(leaf: &mut ChunkReader<'_>) -> Result<Vec<u16>> {
    let index_count: u8 = leaf.read_trivial(false)?;
    leaf.consume(6, false)?;
    leaf.read_array::<u16>(index_count as usize, false)
}
