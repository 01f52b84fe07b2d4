use glam::{Mat3, Mat4, Quat, Vec3};
use ucfb_chunk::{tag, ChunkReader, Tag};
use ucfb_dispatch::{DispatchEnv, Result};
use ucfb_scene::{CollisionFlags, CollisionPrimitive, CollisionPrimitiveShape, ModelFragment, NodeKind};

use crate::collaborators::HandlerContext;

const NAME: Tag = tag!("NAME");
const MASK: Tag = tag!("MASK");
const PRNT: Tag = tag!("PRNT");
const XFRM: Tag = tag!("XFRM");
const DATA: Tag = tag!("DATA");

const SPHERE: u32 = 0;
const CYLINDER: u32 = 3;
const CUBE: u32 = 4;

/// Parses a `prim` chunk's standalone collision primitives (unattached to
/// any bone), grounded on `handle_primitives.cpp`'s `read_primitive` loop.
/// The original walks a flat byte range by hand because these primitives
/// aren't individually wrapped in a parent tag; here each one is just a
/// fixed `NAME, [MASK], PRNT, XFRM, DATA` run of sibling chunks read
/// straight off the iterator.
pub fn handle_primitives(
    mut prim: ChunkReader<'_>,
    env: DispatchEnv<'_, HandlerContext<'_>>,
) -> Result<()> {
    let model_name = String::from_utf8_lossy(prim.read_string(true)?).into_owned();

    let mut primitives = Vec::new();
    while prim.has_more() {
        let mut name_reader = prim.read_child_strict(NAME, false)?;
        let name = String::from_utf8_lossy(name_reader.read_string(true)?).into_owned();

        let mut flags = CollisionFlags::all();
        if let Some(mut mask) = prim.read_child_opt(MASK, false)? {
            let raw: u8 = mask.read_trivial(true)?;
            flags = CollisionFlags::from_mask(raw);
        }

        let mut parent_reader = prim.read_child_strict(PRNT, false)?;
        let parent = String::from_utf8_lossy(parent_reader.read_string(true)?).into_owned();

        let mut xfrm_reader = prim.read_child_strict(XFRM, false)?;
        let rows = xfrm_reader.read_array::<[f32; 3]>(3, true)?;
        let position_raw = xfrm_reader.read_array::<f32>(3, true)?;
        let rotation_matrix = Mat3::from_cols(
            Vec3::from_array(rows[0]),
            Vec3::from_array(rows[1]),
            Vec3::from_array(rows[2]),
        );
        let rotation = Quat::from_mat3(&rotation_matrix);
        let position = Vec3::from_array(position_raw.try_into().unwrap());

        let mut data_reader = prim.read_child_strict(DATA, false)?;
        let primitive_type: u32 = data_reader.read_trivial(true)?;
        let size = data_reader.read_array::<f32>(3, true)?;

        let shape = match primitive_type {
            SPHERE => CollisionPrimitiveShape::Sphere { radius: size[0] },
            CYLINDER => CollisionPrimitiveShape::Cylinder {
                radius: size[0],
                height: size[1],
            },
            _ => CollisionPrimitiveShape::Cube {
                half_extents: Vec3::from_array(size.try_into().unwrap()),
            },
        };

        primitives.push(CollisionPrimitive {
            name,
            parent_bone: if parent.is_empty() { None } else { Some(parent) },
            transform: Mat4::from_rotation_translation(rotation, position),
            shape,
            flags,
        });
    }

    tracing::debug!(model = %model_name, count = primitives.len(), "integrated standalone collision primitives");

    env.ctx.models.integrate(
        &model_name,
        ModelFragment {
            collision_primitives: primitives,
            ..Default::default()
        },
    );

    Ok(())
}
