/// Primitive topology a geometry's index buffer was encoded with. Every
/// format this workspace writes (the legacy mesh container and glTF) wants
/// a plain triangle list, so every other topology is normalized on its way
/// out via [`to_triangle_list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    TriangleList,
    /// PC-style strip: winding alternates every triangle, degenerate
    /// (repeated-index) triangles are dropped rather than emitted.
    TriangleStrip,
    /// PS2 hardware strip: winding is already correct per triangle (the
    /// console's vertex engine bakes the flip into the strip itself), so no
    /// alternation is applied on expansion.
    TriangleStripPs2,
    TriangleFan,
}

/// Expands any supported topology into a flat triangle list, dropping
/// degenerate triangles (repeated vertex indices) along the way.
pub fn to_triangle_list(topology: Topology, indices: &[u16]) -> Vec<u16> {
    match topology {
        Topology::TriangleList => indices.to_vec(),
        Topology::TriangleStrip => triangle_strip_to_list(indices, true),
        Topology::TriangleStripPs2 => triangle_strip_ps2_to_list(indices),
        Topology::TriangleFan => triangle_fan_to_list(indices),
    }
}

fn triangle_strip_to_list(indices: &[u16], alternate_winding: bool) -> Vec<u16> {
    let mut out = Vec::new();
    if indices.len() < 3 {
        return out;
    }

    for w in 0..indices.len() - 2 {
        let (a, b, c) = (indices[w], indices[w + 1], indices[w + 2]);
        if a == b || b == c || a == c {
            continue;
        }
        if alternate_winding && w % 2 == 1 {
            out.extend_from_slice(&[a, c, b]);
        } else {
            out.extend_from_slice(&[a, b, c]);
        }
    }
    out
}

fn triangle_strip_ps2_to_list(indices: &[u16]) -> Vec<u16> {
    triangle_strip_to_list(indices, false)
}

/// Encodes a flat triangle list (as produced by [`to_triangle_list`]) back
/// into a PS2-style strip, the direction `model_msh_save.cpp`'s `write_strp`
/// needs when a segment's indices didn't already come in as a strip.
///
/// Each triangle after the first is bridged onto the strip with two
/// duplicated indices, which [`triangle_strip_ps2_to_list`] always reads
/// back as degenerate windows and skips, so the round trip reproduces the
/// exact input triangles (order and winding) rather than an equivalent but
/// different strip.
pub fn to_triangle_strip_ps2(indices: &[u16]) -> Vec<u16> {
    let mut out = Vec::new();
    for triangle in indices.chunks_exact(3) {
        let (a, b, c) = (triangle[0], triangle[1], triangle[2]);
        if out.is_empty() {
            out.extend_from_slice(&[a, b, c]);
        } else {
            let prev_last = *out.last().unwrap();
            out.extend_from_slice(&[prev_last, a, a, b, c]);
        }
    }
    out
}

fn triangle_fan_to_list(indices: &[u16]) -> Vec<u16> {
    let mut out = Vec::new();
    if indices.len() < 3 {
        return out;
    }

    let hub = indices[0];
    for w in 1..indices.len() - 1 {
        let (b, c) = (indices[w], indices[w + 1]);
        if hub == b || b == c || hub == c {
            continue;
        }
        out.extend_from_slice(&[hub, b, c]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_list_passes_through_unchanged() {
        let indices = [0u16, 1, 2, 2, 1, 3];
        assert_eq!(to_triangle_list(Topology::TriangleList, &indices), indices);
    }

    #[test]
    fn pc_strip_alternates_winding() {
        let indices = [0u16, 1, 2, 3];
        let list = to_triangle_list(Topology::TriangleStrip, &indices);
        assert_eq!(list, vec![0, 1, 2, /* flipped */ 1, 3, 2]);
    }

    #[test]
    fn ps2_strip_does_not_alternate_winding() {
        let indices = [0u16, 1, 2, 3];
        let list = to_triangle_list(Topology::TriangleStripPs2, &indices);
        assert_eq!(list, vec![0, 1, 2, 1, 2, 3]);
    }

    #[test]
    fn strip_conversion_drops_degenerate_triangles() {
        let indices = [0u16, 1, 1, 2, 3];
        let list = to_triangle_list(Topology::TriangleStrip, &indices);
        // triangle (0,1,1) and (1,1,2) are degenerate and dropped
        assert_eq!(list.len() % 3, 0);
        assert!(list.len() <= 3);
    }

    #[test]
    fn fan_expands_around_the_hub_vertex() {
        let indices = [0u16, 1, 2, 3, 4];
        let list = to_triangle_list(Topology::TriangleFan, &indices);
        assert_eq!(list, vec![0, 1, 2, 0, 2, 3, 0, 3, 4]);
    }

    #[test]
    fn strip_ps2_round_trips_through_triangle_list() {
        let triangles = [0u16, 1, 2, 2, 3, 4, 4, 5, 6, 7, 8, 9];
        let strip = to_triangle_strip_ps2(&triangles);
        let recovered = to_triangle_list(Topology::TriangleStripPs2, &strip);
        assert_eq!(recovered, triangles);
    }

    #[test]
    fn strip_ps2_of_single_triangle_is_unbridged() {
        let triangles = [5u16, 6, 7];
        assert_eq!(to_triangle_strip_ps2(&triangles), vec![5, 6, 7]);
    }

    #[test]
    fn every_conversion_yields_a_whole_number_of_triangles() {
        for topology in [
            Topology::TriangleList,
            Topology::TriangleStrip,
            Topology::TriangleStripPs2,
            Topology::TriangleFan,
        ] {
            let indices: Vec<u16> = (0..9).collect();
            let list = to_triangle_list(topology, &indices);
            assert_eq!(list.len() % 3, 0);
        }
    }
}
