use glam::{Mat4, Vec3};
use ucfb_chunk::{tag, ChildWriter, ChunkWriter, Tag};
use ucfb_scene::{
    ClothPatch, CollisionPrimitive, CollisionPrimitiveShape, Node, NodeKind, RenderType, Scene,
    VertexBlock,
};

use crate::error::{ModelFormatError, Result};

/// Writes the legacy chunked mesh container this workspace's tooling reads
/// natively: `HEDR > MSH2 > { SINF, MATL, MODL* }` followed by an empty
/// `CL1L`, grounded on `model_msh_save.cpp`'s `save_scene`. Every `MODL`
/// carries the full tag tree that saver writes: `MTYP`/`MNDX`/`NAME`/`PRNT`/
/// `FLGS`/`TRAN`, then a `GEOM` (mesh or cloth geometry) or `SWCI`
/// (collision primitive), never both.
///
/// Nodes are re-sorted into the parent-before-children order the original
/// tool requires before anything is written, and every segment's bone map
/// is patched to the resorted node indices (`sort_nodes`/`patch_bone_maps`).
pub struct MeshFormatWriter;

impl MeshFormatWriter {
    /// Returns the container bytes plus the `.msh.option` sidecar text the
    /// original tool always writes alongside it (`save_option_file`).
    pub fn write(scene: &Scene, name: &str) -> Result<(Vec<u8>, String)> {
        if scene.segments.is_empty() {
            return Err(ModelFormatError::EmptyScene);
        }

        let patched = resort_and_patch(scene)?;

        let mut writer = ChunkWriter::new();
        {
            let mut hedr = writer.open_child(tag!("HEDR"), false)?;
            {
                let mut msh2 = hedr.open_child(tag!("MSH2"), false)?;
                write_sinf(&mut msh2, name, &patched)?;
                write_matl(&mut msh2, &patched)?;

                for (index, node) in patched.nodes.iter().enumerate() {
                    let parent_name = node.parent.map(|p| patched.nodes[p].name.as_str());
                    write_modl(&mut msh2, &patched, node, index as u32, parent_name)?;
                }
            }
            hedr.open_child(tag!("CL1L"), false)?;
        }

        Ok((writer.into_bytes(), build_option_file(&patched)))
    }
}

/// Reorders `scene.nodes` so the sole parentless node comes first, followed
/// by its descendants in pre-order (`sort_nodes`), then remaps every
/// segment's bone map from old to new node indices (`patch_bone_maps`).
fn resort_and_patch(scene: &Scene) -> Result<Scene> {
    let (order, old_to_new) = sort_nodes(&scene.nodes)?;

    let mut nodes: Vec<Node> = order.iter().map(|&i| scene.nodes[i].clone()).collect();
    for node in &mut nodes {
        node.parent = node.parent.map(|p| old_to_new[p]);
    }

    let mut segments = scene.segments.clone();
    for segment in &mut segments {
        for bone in &mut segment.bone_map {
            *bone = old_to_new[*bone as usize] as u8;
        }
    }

    Ok(Scene {
        nodes,
        segments,
        ..scene.clone()
    })
}

/// Finds the sole parentless node and walks its descendants in pre-order,
/// by index rather than by the name lookup table `sort_nodes` builds in the
/// original (our nodes carry stable indices already, so a name round-trip
/// isn't needed). Returns the new-order list of old indices and the
/// old-index -> new-index map `patch_bone_maps` needs.
fn sort_nodes(nodes: &[Node]) -> Result<(Vec<usize>, Vec<usize>)> {
    let Some(root) = nodes.iter().position(|n| n.parent.is_none()) else {
        return Err(ModelFormatError::MissingRootNode);
    };

    let mut order = Vec::with_capacity(nodes.len());
    let mut visited = vec![false; nodes.len()];
    visit_pre_order(nodes, root, &mut visited, &mut order);

    let orphaned = visited.iter().filter(|&&v| !v).count();
    if orphaned > 0 {
        return Err(ModelFormatError::OrphanedNodes(orphaned));
    }

    let mut old_to_new = vec![0usize; nodes.len()];
    for (new_index, &old_index) in order.iter().enumerate() {
        old_to_new[old_index] = new_index;
    }

    Ok((order, old_to_new))
}

fn visit_pre_order(nodes: &[Node], index: usize, visited: &mut [bool], order: &mut Vec<usize>) {
    order.push(index);
    visited[index] = true;
    for (child_index, node) in nodes.iter().enumerate() {
        if node.parent == Some(index) {
            visit_pre_order(nodes, child_index, visited, order);
        }
    }
}

fn model_type(node: &Node, scene: &Scene) -> u32 {
    const NULL: u32 = 0;
    const SKIN: u32 = 1;
    const CLOTH: u32 = 2;
    const BONE: u32 = 3;
    const FIXED: u32 = 4;

    match node.kind {
        NodeKind::Null => {
            if node.name.starts_with("bone") {
                BONE
            } else {
                NULL
            }
        }
        NodeKind::Geometry => {
            let segment = &scene.segments[node.segment.expect("geometry node has a segment")];
            if segment.bone_map.is_empty() {
                FIXED
            } else {
                SKIN
            }
        }
        NodeKind::Cloth => CLOTH,
        NodeKind::CollisionMesh | NodeKind::CollisionPrimitive => FIXED,
    }
}

fn is_hidden(node: &Node) -> bool {
    match node.kind {
        NodeKind::Null | NodeKind::CollisionMesh | NodeKind::CollisionPrimitive => true,
        NodeKind::Geometry | NodeKind::Cloth => node.lod != ucfb_scene::Lod::Zero,
    }
}

fn write_bbox(parent: &mut ChildWriter<'_>, min: Vec3, max: Vec3) -> Result<()> {
    let mut bbox = parent.open_child(tag!("BBOX"), false)?;
    bbox.write::<f32>(0.0, false)?;
    bbox.write::<f32>(0.0, false)?;
    bbox.write::<f32>(0.0, false)?;
    bbox.write::<f32>(1.0, false)?;

    let center = (max + min) * 0.5;
    let halfsize = (max - min) * 0.5;
    bbox.write::<f32>(center.x, false)?;
    bbox.write::<f32>(center.y, false)?;
    bbox.write::<f32>(center.z, false)?;
    bbox.write::<f32>(halfsize.x, false)?;
    bbox.write::<f32>(halfsize.y, false)?;
    bbox.write::<f32>(halfsize.z, false)?;
    bbox.write::<f32>(halfsize.length(), true)?;
    Ok(())
}

fn write_sinf(msh2: &mut ChildWriter<'_>, name: &str, scene: &Scene) -> Result<()> {
    let mut sinf = msh2.open_child(tag!("SINF"), false)?;
    {
        let mut nm = sinf.open_child(tag!("NAME"), false)?;
        nm.write_string(name, true)?;
    }
    {
        let mut fram = sinf.open_child(tag!("FRAM"), false)?;
        fram.write::<i32>(0, false)?;
        fram.write::<i32>(1, false)?;
        fram.write::<f32>(29.97003, true)?;
    }
    write_bbox(&mut sinf, scene.aabb_min, scene.aabb_max)?;
    Ok(())
}

/// Maps our render modes onto the original `Render_flags` bitmask (`normal`
/// carries no bit; the ordinal `rendertype`/`params` fields next to it in
/// `ATRB` were never captured on the read side, so they're always written
/// zero).
fn render_flags_bitmask(rendertype: RenderType) -> u8 {
    match rendertype {
        RenderType::Normal => 0,
        RenderType::Glow => 0b10,
        RenderType::Transparent => 0b100,
        RenderType::Doublesided => 0b1000,
        RenderType::Hardedged => 0b1_0000,
        RenderType::PerPixel => 0b10_0000,
        RenderType::Unknown(_) => 0,
    }
}

fn write_matd(matl: &mut ChildWriter<'_>, material: &ucfb_scene::Material) -> Result<()> {
    let mut matd = matl.open_child(tag!("MATD"), false)?;
    {
        let mut name = matd.open_child(tag!("NAME"), false)?;
        name.write_string(&material.name, true)?;
    }
    {
        // diffuse_colour, specular_colour and specular_exponent aren't
        // captured on the read side, so `Material`'s own defaults
        // (white, white, 50.0) go out here; the unused third vec4 mirrors
        // the original's layout.
        let mut data = matd.open_child(tag!("DATA"), false)?;
        for v in [1.0f32, 1.0, 1.0, 1.0] {
            data.write::<f32>(v, false)?;
        }
        for v in [1.0f32, 1.0, 1.0, 1.0] {
            data.write::<f32>(v, false)?;
        }
        data.write::<f32>(0.0, false)?;
        data.write::<f32>(0.0, false)?;
        data.write::<f32>(0.0, false)?;
        data.write::<f32>(1.0, false)?;
        data.write::<f32>(50.0, true)?;
    }
    {
        let mut atrb = matd.open_child(tag!("ATRB"), false)?;
        atrb.write::<u32>(render_flags_bitmask(material.rendertype) as u32, false)?;
        atrb.write::<u32>(0, false)?;
        atrb.write::<i8>(0, false)?;
        atrb.write::<i8>(0, true)?;
    }

    const TEXTURE_TAGS: [Tag; 4] = [tag!("TX0D"), tag!("TX1D"), tag!("TX2D"), tag!("TX3D")];
    for (slot, texture_tag) in material.textures.iter().zip(TEXTURE_TAGS) {
        if let Some(texture_name) = slot {
            let mut txd = matd.open_child(texture_tag, false)?;
            txd.write_string(&format!("{texture_name}.tga"), true)?;
        }
    }
    Ok(())
}

fn write_matl(msh2: &mut ChildWriter<'_>, scene: &Scene) -> Result<()> {
    let mut matl = msh2.open_child(tag!("MATL"), false)?;
    matl.write::<u32>(scene.materials.len() as u32, true)?;
    for material in &scene.materials {
        write_matd(&mut matl, material)?;
    }
    Ok(())
}

/// Decomposes a node's transform into scale/rotation/translation, the way
/// `write_tran` does for the `mat4x3` the original scene graph carries.
fn write_tran(modl: &mut ChildWriter<'_>, transform: Mat4) -> Result<()> {
    let (scale, rotation, translation) = transform.to_scale_rotation_translation();
    let mut tran = modl.open_child(tag!("TRAN"), false)?;
    tran.write::<f32>(scale.x, false)?;
    tran.write::<f32>(scale.y, false)?;
    tran.write::<f32>(scale.z, false)?;
    tran.write::<f32>(rotation.x, false)?;
    tran.write::<f32>(rotation.y, false)?;
    tran.write::<f32>(rotation.z, false)?;
    tran.write::<f32>(rotation.w, false)?;
    tran.write::<f32>(translation.x, false)?;
    tran.write::<f32>(translation.y, false)?;
    tran.write::<f32>(translation.z, true)?;
    Ok(())
}

/// Writes one (bone, weight) pair per vertex, padded out to the fixed
/// 3-real-plus-1-zero layout `write_wght` always emits: vertices with fewer
/// than three recorded weights get zero bone/weight in the remaining slots
/// rather than the original's "no weights at all" fallback, since our
/// decoder always keeps whatever weights it found per vertex.
fn write_wght(segm: &mut ChildWriter<'_>, vertices: &VertexBlock) -> Result<()> {
    let mut wght = segm.open_child(tag!("WGHT"), false)?;
    wght.write::<u32>(vertices.bone_weights.len() as u32, true)?;

    for weights in &vertices.bone_weights {
        let mut slots = [(0u8, 0.0f32); 3];
        for (slot, pair) in slots.iter_mut().zip(weights.iter()) {
            *slot = *pair;
        }
        for (bone, weight) in slots {
            wght.write::<u32>(bone as u32, false)?;
            wght.write::<f32>(weight, false)?;
        }
        wght.write::<u32>(0, false)?;
        wght.write::<f32>(0.0, true)?;
    }
    Ok(())
}

/// Packs each colour the way `write_clrl` does: swap to BGRA before
/// `packUnorm4x8` so the bytes land the way `read_color`
/// (`ucfb-vertex/src/decoder.rs`) expects to find them on the way back in.
fn write_clrl(segm: &mut ChildWriter<'_>, colors: &[[u8; 4]]) -> Result<()> {
    let mut clrl = segm.open_child(tag!("CLRL"), false)?;
    clrl.write::<u32>(colors.len() as u32, true)?;
    for (i, c) in colors.iter().enumerate() {
        let packed = u32::from_le_bytes([c[2], c[1], c[0], c[3]]);
        let aligned = i + 1 == colors.len();
        clrl.write::<u32>(packed, aligned)?;
    }
    Ok(())
}

fn write_ndxl_ndxt(segm: &mut ChildWriter<'_>, indices: &[u16]) -> Result<()> {
    let tri_count = (indices.len() / 3) as u32;
    {
        let mut ndxl = segm.open_child(tag!("NDXL"), false)?;
        ndxl.write::<u32>(tri_count, true)?;
        for tri in indices.chunks_exact(3) {
            ndxl.write::<u16>(3, false)?;
            ndxl.write::<u16>(tri[0], false)?;
            ndxl.write::<u16>(tri[1], false)?;
            ndxl.write::<u16>(tri[2], true)?;
        }
    }
    {
        let mut ndxt = segm.open_child(tag!("NDXT"), false)?;
        ndxt.write::<u32>(tri_count, true)?;
        for (i, index) in indices.iter().enumerate() {
            let aligned = i + 1 == indices.len();
            ndxt.write::<u16>(*index, aligned)?;
        }
    }
    Ok(())
}

fn write_strp(segm: &mut ChildWriter<'_>, indices: &[u16]) -> Result<()> {
    let strip = ucfb_scene::to_triangle_strip_ps2(indices);
    let mut strp = segm.open_child(tag!("STRP"), false)?;
    strp.write::<u32>(strip.len() as u32, true)?;
    for (i, index) in strip.iter().enumerate() {
        let aligned = i + 1 == strip.len();
        strp.write::<u16>(*index, aligned)?;
    }
    Ok(())
}

/// Common `SEGM` body shared by real mesh segments and collision mesh
/// visualizations: `MATI`, `POSL`, `WGHT` (if skinned), `NRML`, `CLRL` (if
/// vertex colours), `UV0L`, then `NDXL`+`NDXT` and `STRP` both, since the
/// original always writes both the triangle-list and strip forms.
fn write_segm_core(
    geom: &mut ChildWriter<'_>,
    material_index: u32,
    vertices: &VertexBlock,
    indices: &[u16],
) -> Result<()> {
    let mut segm = geom.open_child(tag!("SEGM"), false)?;
    {
        let mut mati = segm.open_child(tag!("MATI"), false)?;
        mati.write::<u32>(material_index, true)?;
    }

    let vertex_count = vertices.len() as u32;

    if !vertices.positions.is_empty() {
        let mut posl = segm.open_child(tag!("POSL"), false)?;
        posl.write::<u32>(vertex_count, true)?;
        for p in &vertices.positions {
            posl.write::<f32>(p.x, false)?;
            posl.write::<f32>(p.y, false)?;
            posl.write::<f32>(p.z, true)?;
        }
    }

    if !vertices.bone_weights.is_empty() {
        write_wght(&mut segm, vertices)?;
    }

    if !vertices.normals.is_empty() {
        let mut nrml = segm.open_child(tag!("NRML"), false)?;
        nrml.write::<u32>(vertex_count, true)?;
        for n in &vertices.normals {
            nrml.write::<f32>(n.x, false)?;
            nrml.write::<f32>(n.y, false)?;
            nrml.write::<f32>(n.z, true)?;
        }
    }

    if !vertices.colors.is_empty() {
        write_clrl(&mut segm, &vertices.colors)?;
    }

    if !vertices.texcoords.is_empty() {
        let mut uv0l = segm.open_child(tag!("UV0L"), false)?;
        uv0l.write::<u32>(vertex_count, true)?;
        for [u, v] in &vertices.texcoords {
            uv0l.write::<f32>(*u, false)?;
            uv0l.write::<f32>(*v, true)?;
        }
    }

    write_ndxl_ndxt(&mut segm, indices)?;
    write_strp(&mut segm, indices)?;
    Ok(())
}

fn write_envl(geom: &mut ChildWriter<'_>, bone_map: &[u8]) -> Result<()> {
    let mut envl = geom.open_child(tag!("ENVL"), false)?;
    envl.write::<u32>(bone_map.len() as u32, true)?;
    for (i, &bone) in bone_map.iter().enumerate() {
        let aligned = i + 1 == bone_map.len();
        envl.write::<u32>(bone as u32, aligned)?;
    }
    Ok(())
}

fn write_clth(geom: &mut ChildWriter<'_>, patch: &ClothPatch) -> Result<()> {
    let mut clth = geom.open_child(tag!("CLTH"), false)?;
    {
        let mut ctex = clth.open_child(tag!("CTEX"), false)?;
        ctex.write_string("", true)?;
    }

    let vertex_count = patch.positions.len() as u32;

    {
        let mut cpos = clth.open_child(tag!("CPOS"), false)?;
        cpos.write::<u32>(vertex_count, true)?;
        for p in &patch.positions {
            cpos.write::<f32>(p.x, false)?;
            cpos.write::<f32>(p.y, false)?;
            cpos.write::<f32>(p.z, true)?;
        }
    }
    {
        // no per-vertex cloth texcoords are captured on the read side
        let mut cuv0 = clth.open_child(tag!("CUV0"), false)?;
        cuv0.write::<u32>(vertex_count, true)?;
        for _ in &patch.positions {
            cuv0.write::<f32>(0.0, false)?;
            cuv0.write::<f32>(0.0, true)?;
        }
    }
    {
        let mut fidx = clth.open_child(tag!("FIDX"), false)?;
        fidx.write::<u32>(patch.fixed_points.len() as u32, true)?;
        for (i, p) in patch.fixed_points.iter().enumerate() {
            let aligned = i + 1 == patch.fixed_points.len();
            fidx.write::<u16>(*p, aligned)?;
        }
    }
    {
        let mut fwgt = clth.open_child(tag!("FWGT"), false)?;
        fwgt.write::<u32>(0, true)?;
    }
    {
        let mut cmsh = clth.open_child(tag!("CMSH"), false)?;
        cmsh.write::<u32>(patch.indices.len() as u32, true)?;
        for (i, index) in patch.indices.iter().enumerate() {
            let aligned = i + 1 == patch.indices.len();
            cmsh.write::<u16>(*index, aligned)?;
        }
    }
    for constraint_tag in [tag!("SPRS"), tag!("CPRS"), tag!("BPRS")] {
        let mut constraints = clth.open_child(constraint_tag, false)?;
        constraints.write::<u32>(0, true)?;
    }
    {
        let mut coll = clth.open_child(tag!("COLL"), false)?;
        coll.write::<u32>(0, true)?;
    }
    Ok(())
}

fn write_geom(modl: &mut ChildWriter<'_>, node: &Node, scene: &Scene) -> Result<()> {
    let mut geom = modl.open_child(tag!("GEOM"), false)?;
    write_bbox(&mut geom, node.aabb.0, node.aabb.1)?;

    match node.kind {
        NodeKind::Geometry => {
            let segment = &scene.segments[node.segment.expect("geometry node has a segment")];
            write_segm_core(
                &mut geom,
                segment.material_index as u32,
                &segment.vertices,
                &segment.triangle_list(),
            )?;
            if !segment.bone_map.is_empty() {
                write_envl(&mut geom, &segment.bone_map)?;
            }
        }
        NodeKind::CollisionMesh => {
            let mesh = &scene.collision_meshes[node
                .collision_mesh
                .expect("collision mesh node has a collision_mesh index")];
            let vertices = VertexBlock {
                positions: mesh.positions.clone(),
                ..Default::default()
            };
            write_segm_core(&mut geom, 0, &vertices, &mesh.triangle_list())?;
        }
        NodeKind::Cloth => {
            let patch = &scene.cloth[node.cloth.expect("cloth node has a cloth index")];
            write_clth(&mut geom, patch)?;
        }
        NodeKind::Null | NodeKind::CollisionPrimitive => {}
    }
    Ok(())
}

/// Maps a collision primitive's shape onto `SWCI`'s `(type, size)` pair,
/// using `model_types.hpp`'s `Collision_primitive_type` ordinals
/// (sphere=0, cylinder=2, cube=4). The cylinder's `size` layout isn't
/// pinned down by anything we read back, so radius/height/radius is used.
fn write_swci(modl: &mut ChildWriter<'_>, primitive: &CollisionPrimitive) -> Result<()> {
    let mut swci = modl.open_child(tag!("SWCI"), false)?;
    let (kind, size) = match primitive.shape {
        CollisionPrimitiveShape::Sphere { radius } => (0u32, Vec3::splat(radius)),
        CollisionPrimitiveShape::Cylinder { radius, height } => {
            (2u32, Vec3::new(radius, height, radius))
        }
        CollisionPrimitiveShape::Cube { half_extents } => (4u32, half_extents),
    };
    swci.write::<u32>(kind, false)?;
    swci.write::<f32>(size.x, false)?;
    swci.write::<f32>(size.y, false)?;
    swci.write::<f32>(size.z, true)?;
    Ok(())
}

fn write_modl(
    msh2: &mut ChildWriter<'_>,
    scene: &Scene,
    node: &Node,
    index: u32,
    parent_name: Option<&str>,
) -> Result<()> {
    let mut modl = msh2.open_child(tag!("MODL"), false)?;

    {
        let mut mtyp = modl.open_child(tag!("MTYP"), false)?;
        mtyp.write::<u32>(model_type(node, scene), true)?;
    }
    {
        let mut mndx = modl.open_child(tag!("MNDX"), false)?;
        mndx.write::<u32>(index, true)?;
    }
    {
        let mut name = modl.open_child(tag!("NAME"), false)?;
        name.write_string(&node.name, true)?;
    }
    if let Some(parent_name) = parent_name {
        let mut prnt = modl.open_child(tag!("PRNT"), false)?;
        prnt.write_string(parent_name, true)?;
    }
    if is_hidden(node) {
        let mut flgs = modl.open_child(tag!("FLGS"), false)?;
        flgs.write::<u32>(1, true)?;
    }

    write_tran(&mut modl, node.transform)?;

    if matches!(
        node.kind,
        NodeKind::Geometry | NodeKind::CollisionMesh | NodeKind::Cloth
    ) {
        write_geom(&mut modl, node, scene)?;
    }
    if node.kind == NodeKind::CollisionPrimitive {
        let primitive = &scene.collision_primitives[node
            .collision_primitive
            .expect("collision primitive node has a collision_primitive index")];
        write_swci(&mut modl, primitive)?;
    }

    Ok(())
}

/// Builds the `.msh.option` sidecar text `save_option_file` always writes
/// alongside the container. `-vertexlighting`/`-softskin` are derived from
/// per-segment flags rather than a scene-wide toggle (our model has no such
/// field); attached lights and `-keepmaterial` are dropped entirely since
/// nothing on the read side ever captures that data.
fn build_option_file(scene: &Scene) -> String {
    let mut out = String::new();

    if scene.segments.iter().any(|s| s.vertices.static_lighting) {
        out.push_str("-vertexlighting\n");
    }
    if scene.segments.iter().any(|s| s.vertices.softskinned) {
        out.push_str("-softskin\n");
    }

    let keep_names: Vec<&str> = scene
        .nodes
        .iter()
        .filter(|n| {
            n.kind == NodeKind::Null
                && n.parent.is_some()
                && !n.name.starts_with("bone")
                && !n.name.starts_with("hp")
        })
        .map(|n| n.name.as_str())
        .collect();
    if !keep_names.is_empty() {
        out.push_str("-keep ");
        for name in &keep_names {
            out.push_str(name);
            out.push(' ');
        }
        out.push('\n');
    }

    if scene.collision_meshes.is_empty() && scene.collision_primitives.is_empty() {
        out.push_str("-nocollision\n");
    }

    out
}
