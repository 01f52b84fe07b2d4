use std::fmt::Write as _;
use std::sync::atomic::{AtomicU32, Ordering};

use ucfb_chunk::{tag, ChunkReader, Tag};
use ucfb_dispatch::{DispatchEnv, HandlerError, Result};

use crate::collaborators::HandlerContext;

const INFO: Tag = tag!("INFO");
const NODE: Tag = tag!("NODE");
const ARCS: Tag = tag!("ARCS");

static PLAN_COUNT: AtomicU32 = AtomicU32::new(0);

struct Hub {
    name: String,
    x: f32,
    y: f32,
    z: f32,
    radius: f32,
}

struct Connection {
    start: usize,
    end: usize,
    filter_flags: u32,
    one_way: bool,
    jump: bool,
    jet_jump: bool,
}

/// Emits AI pathing (`.pln`) text from a `plan` chunk's hub/arc graph,
/// grounded on `handle_planning.cpp`. Hub weight-info blocks are
/// variable-length per hub (sized from each hub's own `weight_counts`) and
/// carry no routing information the output format surfaces, so they are
/// skipped over rather than decoded.
pub fn handle_planning(mut plan: ChunkReader<'_>, env: DispatchEnv<'_, HandlerContext<'_>>) -> Result<()> {
    let mut info = plan.read_child_strict(INFO, false)?;
    let hub_count: u16 = info.read_trivial(false)?;
    let arc_count: u16 = info.read_trivial(false)?;

    let mut hubs = Vec::new();
    let mut connections = Vec::new();

    while plan.has_more() {
        let mut child = plan.read_child(false)?;
        if child.tag() == NODE {
            hubs = read_hubs(&mut child, hub_count as usize, hub_count as u32)?;
        } else if child.tag() == ARCS {
            connections = read_connections(&mut child, arc_count as usize)?;
        }
    }

    let buffer = write_planning(&hubs, &connections);
    let index = PLAN_COUNT.fetch_add(1, Ordering::Relaxed);
    let path = format!("world/ai_paths_{index}.pln");
    env.ctx.saver.save(&path, buffer.as_bytes()).map_err(HandlerError::from)?;

    tracing::debug!(hubs = hubs.len(), connections = connections.len(), "emitted planning graph");
    Ok(())
}

fn read_name16(reader: &mut ChunkReader<'_>) -> Result<String> {
    let raw = reader.read_array::<u8>(16, false)?;
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
}

fn read_hubs(node: &mut ChunkReader<'_>, hub_count: usize, total_hub_count: u32) -> Result<Vec<Hub>> {
    let mut hubs = Vec::with_capacity(hub_count);
    for _ in 0..hub_count {
        let name = read_name16(node)?;
        let x: f32 = node.read_trivial(false)?;
        let y: f32 = node.read_trivial(false)?;
        let z: f32 = node.read_trivial(false)?;
        let radius: f32 = node.read_trivial(false)?;
        node.consume(8, false)?;
        let weight_counts = node.read_array::<u8>(5, false)?;
        let weight_total: u32 = weight_counts.iter().map(|&c| c as u32).sum();
        node.consume(weight_total as usize * total_hub_count as usize, false)?;

        hubs.push(Hub {
            name,
            x,
            y,
            z: -z,
            radius,
        });
    }
    Ok(hubs)
}

fn read_connections(arcs: &mut ChunkReader<'_>, arc_count: usize) -> Result<Vec<Connection>> {
    const ONE_WAY: u32 = 1;
    const JUMP: u32 = 2;
    const JET_JUMP: u32 = 4;

    let mut connections = Vec::with_capacity(arc_count);
    for _ in 0..arc_count {
        let _name = read_name16(arcs)?;
        let start: u8 = arcs.read_trivial(false)?;
        let end: u8 = arcs.read_trivial(false)?;
        let filter_flags: u32 = arcs.read_trivial(false)?;
        let type_flags: u32 = arcs.read_trivial(false)?;
        connections.push(Connection {
            start: start as usize,
            end: end as usize,
            filter_flags,
            one_way: type_flags & ONE_WAY != 0,
            jump: type_flags & JUMP != 0,
            jet_jump: type_flags & JET_JUMP != 0,
        });
    }
    Ok(connections)
}

/// The swbf (2004) `Plan` layout: `NODE` entries are fixed 40-byte structs
/// followed by a per-node branch-info trailer sized from `branch_count`
/// rather than each hub's own weight table, and `ARCS` entries carry no
/// one-way/jump flags. Grounded on `handle_planning_swbf1.cpp`.
pub fn handle_planning_swbf1(
    mut plan: ChunkReader<'_>,
    env: DispatchEnv<'_, HandlerContext<'_>>,
) -> Result<()> {
    let mut info = plan.read_child_strict(INFO, false)?;
    let hub_count: u16 = info.read_trivial(false)?;
    let arc_count: u16 = info.read_trivial(false)?;
    let branch_count: u16 = info.read_trivial(false)?;

    let mut node = plan.read_child_strict(NODE, false)?;
    let mut hubs = Vec::with_capacity(hub_count as usize);
    while node.has_more() {
        let name = read_name16(&mut node)?;
        let x: f32 = node.read_trivial(false)?;
        let y: f32 = node.read_trivial(false)?;
        let z: f32 = node.read_trivial(false)?;
        let radius: f32 = node.read_trivial(false)?;
        node.consume(8, false)?;
        node.consume(branch_count as usize * hub_count as usize * 4, false)?;
        hubs.push(Hub {
            name,
            x,
            y,
            z: -z,
            radius,
        });
    }

    let mut arcs = plan.read_child_strict(ARCS, false)?;
    let mut connections = Vec::with_capacity(arc_count as usize);
    for _ in 0..arc_count {
        let _name = read_name16(&mut arcs)?;
        let start: u8 = arcs.read_trivial(false)?;
        let end: u8 = arcs.read_trivial(false)?;
        let filter_flags: u32 = arcs.read_trivial(false)?;
        connections.push(Connection {
            start: start as usize,
            end: end as usize,
            filter_flags,
            one_way: false,
            jump: false,
            jet_jump: false,
        });
    }

    let buffer = write_planning(&hubs, &connections);
    let index = PLAN_COUNT.fetch_add(1, Ordering::Relaxed);
    let path = format!("world/ai_paths_{index}.pln");
    env.ctx.saver.save(&path, buffer.as_bytes()).map_err(HandlerError::from)?;

    tracing::debug!(hubs = hubs.len(), connections = connections.len(), "emitted swbf1 planning graph");
    Ok(())
}

fn write_planning(hubs: &[Hub], connections: &[Connection]) -> String {
    for connection in connections {
        if connection.start >= hubs.len() || connection.end >= hubs.len() {
            return "// Failed reading planning info //".to_string();
        }
    }

    let mut buffer = String::new();
    for hub in hubs {
        let _ = writeln!(buffer, "Hub(\"{}\")", hub.name);
        buffer.push_str("{\n");
        let _ = writeln!(buffer, "\tPos({}, {}, {});", hub.x, hub.y, hub.z);
        let _ = writeln!(buffer, "\tRadius({});", hub.radius);
        buffer.push_str("}\n\n");
    }

    for connection in connections {
        let start_name = &hubs[connection.start].name;
        let end_name = &hubs[connection.end].name;
        buffer.push_str("Connection()\n{\n");
        let _ = writeln!(buffer, "\tStart(\"{start_name}\");");
        let _ = writeln!(buffer, "\tEnd(\"{end_name}\");");
        let _ = writeln!(buffer, "\tFlags({});", connection.filter_flags);
        if connection.one_way {
            buffer.push_str("\tOneWay();\n");
        }
        if connection.jump {
            buffer.push_str("\tJump();\n");
        }
        if connection.jet_jump {
            buffer.push_str("\tJetJump();\n");
        }
        buffer.push_str("}\n\n");
    }

    buffer
}
