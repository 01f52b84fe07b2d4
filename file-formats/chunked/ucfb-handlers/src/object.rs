use ucfb_chunk::{tag, ChunkReader, Tag};
use ucfb_dispatch::{DispatchEnv, HandlerError, Result};

use crate::collaborators::HandlerContext;

const BASE: Tag = tag!("BASE");
const TYPE: Tag = tag!("TYPE");
const PROP: Tag = tag!("PROP");

const GEOMETRY_NAME_HASH: u32 = 0x47c86b4a;

/// Known base-entity class names; any other `BASE` value names an ODF the
/// object inherits from, not a built-in class. Verbatim from
/// `handle_object.cpp`'s `class_labels` table.
const CLASS_LABELS: &[&str] = &[
    "animatedbuilding",
    "animatedprop",
    "armedbuilding",
    "armedbuildingdynamic",
    "beacon",
    "beam",
    "binoculars",
    "bolt",
    "building",
    "bullet",
    "cannon",
    "catapult",
    "cloudcluster",
    "commandarmedanimatedbuilding",
    "commandhover",
    "commandpost",
    "commandwalker",
    "destruct",
    "destructablebuilding",
    "detonator",
    "disguise",
    "dispenser",
    "droid",
    "dusteffect",
    "emitterordnance",
    "explosion",
    "fatray",
    "flyer",
    "godray",
    "grapplinghook",
    "grapplinghookweapon",
    "grasspatch",
    "grenade",
    "haywire",
    "hologram",
    "hover",
    "launcher",
    "leafpatch",
    "Light",
    "melee",
    "mine",
    "missile",
    "powerupitem",
    "prop",
    "remote",
    "repair",
    "rumbleeffect",
    "shell",
    "shield",
    "soldier",
    "SoundAmbienceStatic",
    "SoundAmbienceStreaming",
    "sticky",
    "towcable",
    "towcableweapon",
    "trap",
    "vehiclepad",
    "vehiclespawn",
    "walker",
    "walkerdroid",
    "water",
    "weapon",
];

/// `entc` — entity class definitions.
pub fn handle_entity_class(chunk: ChunkReader<'_>, env: DispatchEnv<'_, HandlerContext<'_>>) -> Result<()> {
    handle_object(chunk, env, "GameObjectClass")
}

/// `expc` — expression/effect class definitions.
pub fn handle_expression_class(chunk: ChunkReader<'_>, env: DispatchEnv<'_, HandlerContext<'_>>) -> Result<()> {
    handle_object(chunk, env, "ExplosionClass")
}

/// `ordc` — ordnance class definitions.
pub fn handle_ordnance_class(chunk: ChunkReader<'_>, env: DispatchEnv<'_, HandlerContext<'_>>) -> Result<()> {
    handle_object(chunk, env, "OrdnanceClass")
}

/// `wpnc` — weapon class definitions.
pub fn handle_weapon_class(chunk: ChunkReader<'_>, env: DispatchEnv<'_, HandlerContext<'_>>) -> Result<()> {
    handle_object(chunk, env, "WeaponClass")
}

/// Emits one ODF-style `.odf` file for a class-definition chunk, grounded
/// on `handle_object.cpp`. Shared by all four class-definition tags, which
/// only differ in the bracketed section label they write.
fn handle_object(mut object: ChunkReader<'_>, env: DispatchEnv<'_, HandlerContext<'_>>, type_label: &str) -> Result<()> {
    let mut base_reader = object.read_child_strict(BASE, false)?;
    let class_name = String::from_utf8_lossy(base_reader.read_string(false)?).into_owned();

    let mut type_reader = object.read_child_strict(TYPE, false)?;
    let odf_name = String::from_utf8_lossy(type_reader.read_string(false)?).into_owned();

    let mut properties = Vec::new();
    while object.has_more() {
        let mut prop = object.read_child_strict(PROP, false)?;
        let hash: u32 = prop.read_trivial(false)?;
        let value = String::from_utf8_lossy(prop.read_string(false)?).into_owned();
        properties.push((hash, value));
    }

    let geometry_name = properties
        .iter()
        .find(|(hash, _)| *hash == GEOMETRY_NAME_HASH)
        .map(|(_, value)| format!("{value}.msh"));

    let mut buffer = String::new();
    buffer.push_str(&format!("[{type_label}]\n\n"));

    let class_key = if CLASS_LABELS.contains(&class_name.as_str()) {
        "ClassLabel"
    } else {
        "ClassParent"
    };
    buffer.push_str(&format!("{class_key} = \"{class_name}\"\n"));

    if let Some(geometry_name) = &geometry_name {
        buffer.push_str(&format!("GeometryName = \"{geometry_name}\"\n"));
    }
    buffer.push('\n');

    buffer.push_str("[Properties]\n\n");
    for (hash, value) in &properties {
        let key = env
            .ctx
            .hash_names
            .resolve(*hash)
            .unwrap_or_else(|| format!("0x{hash:08x}"));
        buffer.push_str(&format!("{key} = \"{value}\"\n"));
    }

    env.ctx
        .saver
        .save(&format!("odf/{odf_name}.odf"), buffer.as_bytes())
        .map_err(HandlerError::from)?;

    tracing::debug!(%odf_name, properties = properties.len(), "emitted odf class definition");
    Ok(())
}
