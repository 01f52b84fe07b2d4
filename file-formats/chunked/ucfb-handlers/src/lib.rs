//! Per-tag chunk handlers and the default `(tag, platform, version)` wiring
//! between them, grounded on `chunk_processor.cpp`'s dispatch table.

pub mod cloth;
pub mod collaborators;
pub mod collision;
pub mod config;
pub mod container;
pub mod localization;
pub mod model;
pub mod object;
pub mod planning;
pub mod primitives;
pub mod script;
pub mod skeleton;
pub mod terrain;
pub mod texture;
pub mod unknown;
pub mod world;

pub use cloth::handle_cloth;
pub use collision::handle_collision;
pub use config::{
    handle_boundary_config, handle_combo_config, handle_effects_config, handle_hud_config,
    handle_light_config, handle_load_config, handle_path_config, handle_portal_config,
    handle_prop_config, handle_sanm_config, handle_sky_config,
};
pub use container::{handle_lvl_child, handle_ucfb};
pub use localization::handle_localization;
pub use model::handle_model;
pub use object::{
    handle_entity_class, handle_expression_class, handle_ordnance_class, handle_weapon_class,
};
pub use planning::{handle_planning, handle_planning_swbf1};
pub use primitives::handle_primitives;
pub use script::handle_script;
pub use skeleton::handle_skeleton;
pub use terrain::handle_terrain;
pub use texture::handle_texture;
pub use unknown::{handle_ignored, handle_unknown};
pub use world::handle_world;

use ucfb_chunk::tag;
use ucfb_dispatch::{Dispatcher, GameVersion, Platform};

use crate::collaborators::HandlerContext;

/// Builds the `(tag, platform, version) -> handler` registry every real
/// caller starts from, grounded on `chunk_processor.cpp`'s
/// `chunk_processors` table. `scr_`/`clth` aren't wired into that table
/// upstream (they're reached by walking into a model or container chunk
/// rather than through the top-level dispatch map), but they're registered
/// here the same way so the same dispatcher can route to them directly in
/// tests and tools that don't replicate that nesting.
pub fn register_default_handlers<'a>() -> Dispatcher<HandlerContext<'a>> {
    Dispatcher::builder(handle_unknown)
        .register(tag!("ucfb"), Platform::Pc, GameVersion::SwbfIi, handle_ucfb)
        .register(tag!("lvl_"), Platform::Pc, GameVersion::SwbfIi, handle_lvl_child)
        .register(tag!("entc"), Platform::Pc, GameVersion::SwbfIi, handle_entity_class)
        .register(tag!("expc"), Platform::Pc, GameVersion::SwbfIi, handle_expression_class)
        .register(tag!("ordc"), Platform::Pc, GameVersion::SwbfIi, handle_ordnance_class)
        .register(tag!("wpnc"), Platform::Pc, GameVersion::SwbfIi, handle_weapon_class)
        .register(tag!("fx__"), Platform::Pc, GameVersion::SwbfIi, handle_effects_config)
        .register(tag!("sky_"), Platform::Pc, GameVersion::SwbfIi, handle_sky_config)
        .register(tag!("prp_"), Platform::Pc, GameVersion::SwbfIi, handle_prop_config)
        .register(tag!("bnd_"), Platform::Pc, GameVersion::SwbfIi, handle_boundary_config)
        .register(tag!("lght"), Platform::Pc, GameVersion::SwbfIi, handle_light_config)
        .register(tag!("port"), Platform::Pc, GameVersion::SwbfIi, handle_portal_config)
        .register(tag!("path"), Platform::Pc, GameVersion::SwbfIi, handle_path_config)
        .register(tag!("comb"), Platform::Pc, GameVersion::SwbfIi, handle_combo_config)
        .register(tag!("sanm"), Platform::Pc, GameVersion::SwbfIi, handle_sanm_config)
        .register(tag!("hud_"), Platform::Pc, GameVersion::SwbfIi, handle_hud_config)
        .register(tag!("load"), Platform::Pc, GameVersion::SwbfIi, handle_load_config)
        .register(tag!("tex_"), Platform::Pc, GameVersion::SwbfIi, handle_texture)
        .register(tag!("wrld"), Platform::Pc, GameVersion::SwbfIi, handle_world)
        .register(tag!("plan"), Platform::Pc, GameVersion::SwbfIi, handle_planning)
        .register(tag!("plan"), Platform::Pc, GameVersion::Swbf, handle_planning_swbf1)
        .register(tag!("tern"), Platform::Pc, GameVersion::SwbfIi, handle_terrain)
        .register(tag!("skel"), Platform::Pc, GameVersion::SwbfIi, handle_skeleton)
        .register(tag!("modl"), Platform::Pc, GameVersion::SwbfIi, handle_model)
        .register(tag!("coll"), Platform::Pc, GameVersion::SwbfIi, handle_collision)
        .register(tag!("prim"), Platform::Pc, GameVersion::SwbfIi, handle_primitives)
        .register(tag!("Locl"), Platform::Pc, GameVersion::SwbfIi, handle_localization)
        .register(tag!("clth"), Platform::Pc, GameVersion::SwbfIi, handle_cloth)
        .register(tag!("scr_"), Platform::Pc, GameVersion::SwbfIi, handle_script)
        .register(tag!("gmod"), Platform::Pc, GameVersion::SwbfIi, handle_ignored)
        .register(tag!("plnp"), Platform::Pc, GameVersion::SwbfIi, handle_ignored)
        .build()
}
