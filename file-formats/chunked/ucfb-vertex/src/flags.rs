use ucfb_dispatch::Platform;

bitflags::bitflags! {
    /// Which fields a vertex buffer interleaves, and how they're packed.
    /// Bit layout and ordering matches the `VBUF` attribute word the munge
    /// pipeline writes ahead of the raw vertex bytes (`vbuf_reader.cpp`'s
    /// `Vbuf_flags`); the gaps between bits are real — they're bits the
    /// original engine reserved for other runtime-only flags this tool
    /// never sees set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct VbufFlags: u32 {
        const POSITION = 0x0000_0002;
        const BONE_INDICES = 0x0000_0004;
        const BONE_WEIGHTS = 0x0000_0008;
        const NORMAL = 0x0000_0020;
        const TANGENTS = 0x0000_0040;
        const COLOR = 0x0000_0080;
        const STATIC_LIGHTING = 0x0000_0100;
        const TEXCOORDS = 0x0000_0200;
        const SHADOW_DATA = 0x0000_0800;
        const POSITION_COMPRESSED = 0x0000_1000;
        const BONE_INFO_COMPRESSED = 0x0000_2000;
        const NORMAL_COMPRESSED = 0x0000_4000;
        const TEXCOORD_COMPRESSED = 0x0000_8000;
    }
}

/// Bits covered by no field above; a buffer declaring any of these is
/// rejected with `UnknownVbufFlags` rather than silently misparsed.
pub const KNOWN_FLAGS_MASK: u32 = VbufFlags::POSITION.bits()
    | VbufFlags::BONE_INDICES.bits()
    | VbufFlags::BONE_WEIGHTS.bits()
    | VbufFlags::NORMAL.bits()
    | VbufFlags::TANGENTS.bits()
    | VbufFlags::COLOR.bits()
    | VbufFlags::STATIC_LIGHTING.bits()
    | VbufFlags::TEXCOORDS.bits()
    | VbufFlags::SHADOW_DATA.bits()
    | VbufFlags::POSITION_COMPRESSED.bits()
    | VbufFlags::BONE_INFO_COMPRESSED.bits()
    | VbufFlags::NORMAL_COMPRESSED.bits()
    | VbufFlags::TEXCOORD_COMPRESSED.bits();

/// Any of the four per-attribute compression bits.
pub const COMPRESSED_MASK: u32 = VbufFlags::POSITION_COMPRESSED.bits()
    | VbufFlags::BONE_INFO_COMPRESSED.bits()
    | VbufFlags::NORMAL_COMPRESSED.bits()
    | VbufFlags::TEXCOORD_COMPRESSED.bits();

impl VbufFlags {
    /// Per-vertex byte width. Unlike the PS2 divisor split, the *shape* of
    /// the compressed encodings genuinely differs between PC and Xbox
    /// (`read_vertex_pc`/`read_vertex_xbox`), so this is platform-dependent,
    /// not just a scale factor.
    pub fn stride(self, platform: Platform) -> usize {
        let mut stride = 0;

        if self.contains(Self::POSITION) {
            stride += if self.contains(Self::POSITION_COMPRESSED) {
                match platform {
                    Platform::Xbox => 6, // i16 * 3
                    Platform::Pc | Platform::Ps2 => 8, // i16 * 4, w ignored
                }
            } else {
                12 // f32 * 3
            };
        }

        if self.contains(Self::BONE_WEIGHTS) {
            stride += if self.contains(Self::BONE_INFO_COMPRESSED) {
                match platform {
                    Platform::Xbox => 2, // unorm8 * 2
                    Platform::Pc | Platform::Ps2 => 4, // unorm8 * 4, two unused
                }
            } else {
                8 // f32 * 2
            };
        }

        if self.contains(Self::BONE_INDICES) {
            stride += match platform {
                Platform::Xbox if self.contains(Self::BONE_WEIGHTS) => 3, // u8 * 3
                Platform::Xbox => 1,                                      // single u8, broadcast
                Platform::Pc | Platform::Ps2 => 4, // u32 packing 3 indices, top byte unused
            };
        }

        if self.contains(Self::NORMAL) {
            stride += if self.contains(Self::NORMAL_COMPRESSED) { 4 } else { 12 };
        }

        if self.contains(Self::TANGENTS) {
            // tangent + bitangent together, same per-component encoding as NORMAL
            stride += if self.contains(Self::NORMAL_COMPRESSED) { 8 } else { 24 };
        }

        if self.contains(Self::COLOR) {
            stride += 4;
        }

        if self.contains(Self::STATIC_LIGHTING) {
            stride += 4;
        }

        if self.contains(Self::TEXCOORDS) {
            stride += if self.contains(Self::TEXCOORD_COMPRESSED) { 4 } else { 8 };
        }

        stride
    }
}
