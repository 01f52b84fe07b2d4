use std::fmt::Write as _;

use glam::{Mat3, Quat, Vec3};
use ucfb_chunk::{tag, ChunkReader, Tag};
use ucfb_dispatch::{DispatchEnv, HandlerError, Result};

use crate::collaborators::HandlerContext;

const NAME: Tag = tag!("NAME");
const TNAM: Tag = tag!("TNAM");
const SNAM: Tag = tag!("SNAM");
const REGN: Tag = tag!("regn");
const INST: Tag = tag!("inst");
const TYPE: Tag = tag!("TYPE");
const XFRM: Tag = tag!("XFRM");
const SIZE: Tag = tag!("SIZE");
const PROP: Tag = tag!("PROP");
const INFO: Tag = tag!("INFO");

struct Transform {
    rotation: Quat,
    position: Vec3,
}

/// Emits region (`.rgn`) and object-layout (`.wld`) text for one world
/// chunk, grounded on `handle_world.cpp`'s `read_region`/`read_instance`
/// and the world header boilerplate it always writes. Barriers, hints and
/// animation tracks are a named world sub-feature upstream but have no
/// counterpart requested here, so only regions and object instances are
/// emitted.
pub fn handle_world(mut world: ChunkReader<'_>, env: DispatchEnv<'_, HandlerContext<'_>>) -> Result<()> {
    let mut name_reader = world.read_child_strict(NAME, false)?;
    let name = String::from_utf8_lossy(name_reader.read_string(true)?).into_owned();

    let mut terrain_name = String::new();
    if let Some(mut reader) = world.read_child_opt(TNAM, false)? {
        terrain_name = String::from_utf8_lossy(reader.read_string(true)?).into_owned();
    }
    let mut sky_name = String::new();
    if let Some(mut reader) = world.read_child_opt(SNAM, false)? {
        sky_name = String::from_utf8_lossy(reader.read_string(true)?).into_owned();
    }

    let mut regions_text = String::new();
    let mut instances_text = String::new();
    let mut region_count = 0u32;

    while world.has_more() {
        let child = world.read_child(false)?;
        if child.tag() == REGN {
            region_count += 1;
            write_region(child, env, &mut regions_text)?;
        } else if child.tag() == INST {
            write_instance(child, env, &mut instances_text)?;
        }
    }

    let mut rgn_buffer = String::new();
    let _ = writeln!(rgn_buffer, "Version(1);");
    let _ = writeln!(rgn_buffer, "RegionCount({region_count});\n");
    rgn_buffer.push_str(&regions_text);
    env.ctx
        .saver
        .save(&format!("world/{name}.rgn"), rgn_buffer.as_bytes())
        .map_err(HandlerError::from)?;

    let mut wld_buffer = String::new();
    if !terrain_name.is_empty() {
        let _ = writeln!(wld_buffer, "TerrainName(\"{terrain_name}.ter\");");
    }
    if !sky_name.is_empty() {
        let _ = writeln!(wld_buffer, "SkyName(\"{sky_name}.sky\");");
    }
    let _ = writeln!(wld_buffer, "LightName(\"{name}.lgt\");\n");
    wld_buffer.push_str(&instances_text);

    let extension = if terrain_name.is_empty() || sky_name.is_empty() {
        "lyr"
    } else {
        "wld"
    };
    env.ctx
        .saver
        .save(&format!("world/{name}.{extension}"), wld_buffer.as_bytes())
        .map_err(HandlerError::from)?;

    tracing::debug!(world = %name, region_count, "emitted world layout text");
    Ok(())
}

fn read_transform(mut reader: ChunkReader<'_>) -> Result<Transform> {
    let rows = reader.read_array::<[f32; 3]>(3, true)?;
    let position_raw = reader.read_array::<f32>(3, true)?;
    let rotation_matrix = Mat3::from_cols(
        Vec3::from_array(rows[0]),
        Vec3::from_array(rows[1]),
        Vec3::from_array(rows[2]),
    );
    Ok(Transform {
        rotation: Quat::from_mat3(&rotation_matrix),
        position: Vec3::new(position_raw[0], position_raw[1], -position_raw[2]),
    })
}

fn write_properties(
    mut reader: ChunkReader<'_>,
    env: DispatchEnv<'_, HandlerContext<'_>>,
    out: &mut String,
) -> Result<()> {
    while reader.has_more() {
        let mut prop = reader.read_child_strict(PROP, false)?;
        let hash: u32 = prop.read_trivial(true)?;
        let value = String::from_utf8_lossy(prop.read_string(true)?).into_owned();
        let key = env
            .ctx
            .hash_names
            .resolve(hash)
            .unwrap_or_else(|| format!("0x{hash:08x}"));
        let _ = writeln!(out, "\t{key}({value});");
    }
    Ok(())
}

fn write_region(
    regn: ChunkReader<'_>,
    env: DispatchEnv<'_, HandlerContext<'_>>,
    out: &mut String,
) -> Result<()> {
    let mut regn = regn;
    let mut info = regn.read_child_strict(INFO, false)?;
    let mut type_reader = info.read_child_strict(TYPE, false)?;
    let region_type = String::from_utf8_lossy(type_reader.read_string(true)?).into_owned();
    let mut name_reader = info.read_child_strict(NAME, false)?;
    let name = String::from_utf8_lossy(name_reader.read_string(true)?).into_owned();
    let xfrm = info.read_child_strict(XFRM, false)?;
    let transform = read_transform(xfrm)?;
    let mut size_reader = info.read_child_strict(SIZE, false)?;
    let size = size_reader.read_array::<f32>(3, true)?;

    let _ = writeln!(out, "Region(\"{name}\", {})", region_type_code(&region_type));
    out.push_str("{\n");
    let _ = writeln!(
        out,
        "\tPosition({}, {}, {});",
        transform.position.x, transform.position.y, transform.position.z
    );
    let _ = writeln!(
        out,
        "\tRotation({}, {}, {}, {});",
        transform.rotation.w, transform.rotation.x, transform.rotation.y, transform.rotation.z
    );
    let _ = writeln!(out, "\tSize({}, {}, {});", size[0], size[1], size[2]);
    write_properties(regn, env, out)?;
    out.push_str("}\n\n");
    Ok(())
}

fn write_instance(
    inst: ChunkReader<'_>,
    env: DispatchEnv<'_, HandlerContext<'_>>,
    out: &mut String,
) -> Result<()> {
    let mut inst = inst;
    let mut info = inst.read_child_strict(INFO, false)?;
    let mut type_reader = info.read_child_strict(TYPE, false)?;
    let object_type = String::from_utf8_lossy(type_reader.read_string(true)?).into_owned();
    let mut name_reader = info.read_child_strict(NAME, false)?;
    let name = String::from_utf8_lossy(name_reader.read_string(true)?).into_owned();
    let xfrm = info.read_child_strict(XFRM, false)?;
    let transform = read_transform(xfrm)?;

    let _ = writeln!(out, "Object(\"{name}\", \"{object_type}\", 1)");
    out.push_str("{\n");
    let _ = writeln!(
        out,
        "\tChildRotation({}, {}, {}, {});",
        transform.rotation.w, transform.rotation.x, transform.rotation.y, transform.rotation.z
    );
    let _ = writeln!(
        out,
        "\tChildPosition({}, {}, {});",
        transform.position.x, transform.position.y, transform.position.z
    );
    write_properties(inst, env, out)?;
    out.push_str("}\n\n");
    Ok(())
}

fn region_type_code(region_type: &str) -> char {
    match region_type {
        "box" => '0',
        "sphere" => '1',
        "cylinder" => '2',
        _ => '0',
    }
}
