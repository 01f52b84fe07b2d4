use byteorder::{ByteOrder, LittleEndian};
use glam::Vec3;
use ucfb_dispatch::Platform;
use ucfb_scene::VertexBlock;

use crate::error::{Result, VertexError};
use crate::flags::{VbufFlags, COMPRESSED_MASK, KNOWN_FLAGS_MASK};

/// One `VBUF` child's header plus its raw vertex bytes (the 12-byte
/// count/stride/flags header already consumed), as seen under a `segm`
/// chunk. A segment can carry several of these — alternate compression
/// levels of the same geometry — and [`select_best`] picks which one
/// actually gets decoded (spec.md §4.I, grounded on `vbuf_reader.cpp`'s
/// `select_best_vbuf`).
#[derive(Debug, Clone, Copy)]
pub struct RawVbuf<'a> {
    pub count: u32,
    pub flags: u32,
    pub body: &'a [u8],
}

/// Prefers the most-attributed buffer carrying no compression flags;
/// failing that, the most-attributed compressed buffer; failing that, the
/// last buffer in declaration order.
pub fn select_best<'a, 'b>(buffers: &'b [RawVbuf<'a>]) -> Option<&'b RawVbuf<'a>> {
    let most_attributed = |set: &[&'b RawVbuf<'a>]| -> Option<&'b RawVbuf<'a>> {
        set.iter().copied().max_by_key(|b| b.flags.count_ones())
    };

    let uncompressed: Vec<_> = buffers.iter().filter(|b| b.flags & COMPRESSED_MASK == 0).collect();
    if let Some(best) = most_attributed(&uncompressed) {
        return Some(best);
    }

    let compressed: Vec<_> = buffers.iter().filter(|b| b.flags & COMPRESSED_MASK != 0).collect();
    if let Some(best) = most_attributed(&compressed) {
        return Some(best);
    }

    buffers.last()
}

/// Selects the best of a segment's candidate `VBUF`s and decodes it,
/// returning an empty block when there are none (this tool degrades rather
/// than aborting the whole model the way `read_vbuf`'s caller does).
pub fn decode_vbuf(
    candidates: &[RawVbuf<'_>],
    platform: Platform,
    position_scale: Vec3,
    position_offset: Vec3,
) -> Result<VertexBlock> {
    let Some(chosen) = select_best(candidates) else {
        return Ok(VertexBlock::default());
    };

    let decoder = VertexDecoder::new(chosen.flags, platform, position_scale, position_offset)?;
    decoder.decode(chosen.count as usize, chosen.body)
}

/// Decompresses one platform's packed vertex buffer format into the
/// platform-neutral [`VertexBlock`] every output format writer consumes
/// (spec.md §4.I). Position and texcoord components are fixed-point and
/// are range-mapped through a per-model scale/offset the geometry chunk
/// supplies alongside the buffer.
pub struct VertexDecoder {
    flags: VbufFlags,
    platform: Platform,
    position_scale: Vec3,
    position_offset: Vec3,
}

impl VertexDecoder {
    pub fn new(
        raw_flags: u32,
        platform: Platform,
        position_scale: Vec3,
        position_offset: Vec3,
    ) -> Result<Self> {
        if raw_flags & !KNOWN_FLAGS_MASK != 0 {
            return Err(VertexError::UnknownVbufFlags {
                flags: raw_flags,
                unknown: raw_flags & !KNOWN_FLAGS_MASK,
            });
        }
        let flags = VbufFlags::from_bits_truncate(raw_flags);

        Ok(Self {
            flags,
            platform,
            position_scale,
            position_offset,
        })
    }

    /// Fixed-point divisor for i16-encoded, uncompressed position
    /// components. PS2's vector unit uses a coarser fixed-point convention
    /// than the PC/Xbox pipeline.
    fn position_divisor(&self) -> f32 {
        match self.platform {
            Platform::Ps2 => 4095.0,
            Platform::Pc | Platform::Xbox => 32767.0,
        }
    }

    /// A vertex carries a bone index with no matching weight when it's
    /// still baked into its node's transform rather than skinned — the
    /// `pretransformed` case scenes must reverse (spec.md §4.F).
    fn is_pretransformed(&self) -> bool {
        self.flags.contains(VbufFlags::BONE_INDICES) && !self.flags.contains(VbufFlags::BONE_WEIGHTS)
    }

    pub fn decode(&self, count: usize, bytes: &[u8]) -> Result<VertexBlock> {
        let stride = self.flags.stride(self.platform);
        let needed = stride * count;
        if bytes.len() < needed {
            return Err(VertexError::Truncated {
                available: bytes.len(),
                count,
                stride,
                needed,
            });
        }

        let mut positions = Vec::with_capacity(count);
        let mut normals = Vec::with_capacity(count);
        let mut tangents = Vec::with_capacity(count);
        let mut bitangents = Vec::with_capacity(count);
        let mut texcoords = Vec::with_capacity(count);
        let mut colors = Vec::with_capacity(count);
        let mut bone_weights = Vec::with_capacity(count);

        let position_divisor = self.position_divisor();

        for i in 0..count {
            let vertex = &bytes[i * stride..(i + 1) * stride];
            let mut cursor = 0usize;

            if self.flags.contains(VbufFlags::POSITION) {
                if self.flags.contains(VbufFlags::POSITION_COMPRESSED) {
                    let x = LittleEndian::read_i16(&vertex[cursor..]) as f32;
                    let y = LittleEndian::read_i16(&vertex[cursor + 2..]) as f32;
                    let z = LittleEndian::read_i16(&vertex[cursor + 4..]) as f32;
                    cursor += if self.platform == Platform::Xbox { 6 } else { 8 };
                    positions.push(
                        Vec3::new(x, y, z) / position_divisor * self.position_scale
                            + self.position_offset,
                    );
                } else {
                    let x = LittleEndian::read_f32(&vertex[cursor..]);
                    let y = LittleEndian::read_f32(&vertex[cursor + 4..]);
                    let z = LittleEndian::read_f32(&vertex[cursor + 8..]);
                    cursor += 12;
                    positions.push(Vec3::new(x, y, z));
                }
            }

            let weights = if self.flags.contains(VbufFlags::BONE_WEIGHTS) {
                let w = if self.flags.contains(VbufFlags::BONE_INFO_COMPRESSED) {
                    match self.platform {
                        Platform::Xbox => {
                            let x = vertex[cursor] as f32 / 255.0;
                            let y = vertex[cursor + 1] as f32 / 255.0;
                            cursor += 2;
                            [x, y, 1.0 - x - y]
                        }
                        Platform::Pc | Platform::Ps2 => {
                            // packed unorm8x4, then a (_, y, x, _) component reorder —
                            // the same reorder the compressed normal uses.
                            let x = vertex[cursor + 2] as f32 / 255.0;
                            let y = vertex[cursor + 1] as f32 / 255.0;
                            cursor += 4;
                            [x, y, 1.0 - x - y]
                        }
                    }
                } else {
                    let x = LittleEndian::read_f32(&vertex[cursor..]);
                    let y = LittleEndian::read_f32(&vertex[cursor + 4..]);
                    cursor += 8;
                    [x, y, 1.0 - x - y]
                };
                Some(w)
            } else {
                None
            };

            let indices = if self.flags.contains(VbufFlags::BONE_INDICES) {
                let idx = match self.platform {
                    Platform::Xbox if self.flags.contains(VbufFlags::BONE_WEIGHTS) => {
                        let idx = [vertex[cursor], vertex[cursor + 1], vertex[cursor + 2]];
                        cursor += 3;
                        idx
                    }
                    Platform::Xbox => {
                        let idx = [vertex[cursor]; 3];
                        cursor += 1;
                        idx
                    }
                    Platform::Pc | Platform::Ps2 => {
                        // packed into a u32; only the low three bytes are meaningful,
                        // the top byte is unused padding.
                        let idx = [vertex[cursor], vertex[cursor + 1], vertex[cursor + 2]];
                        cursor += 4;
                        idx
                    }
                };
                Some(idx)
            } else {
                None
            };

            if self.flags.contains(VbufFlags::NORMAL) {
                normals.push(self.read_normal(vertex, &mut cursor));
            }

            if self.flags.contains(VbufFlags::TANGENTS) {
                // bitangent then tangent, matching `read_vertex_pc`/`read_vertex_xbox`.
                bitangents.push(self.read_normal(vertex, &mut cursor));
                tangents.push(self.read_normal(vertex, &mut cursor));
            }

            if self.flags.contains(VbufFlags::COLOR) {
                colors.push(read_color(&vertex[cursor..cursor + 4]));
                cursor += 4;
            }

            if self.flags.contains(VbufFlags::STATIC_LIGHTING) {
                // overwrites COLOR the same way the original does when both are set
                let color = read_color(&vertex[cursor..cursor + 4]);
                if colors.len() == i + 1 {
                    *colors.last_mut().unwrap() = color;
                } else {
                    colors.push(color);
                }
                cursor += 4;
            }

            if self.flags.contains(VbufFlags::TEXCOORDS) {
                if self.flags.contains(VbufFlags::TEXCOORD_COMPRESSED) {
                    let u = LittleEndian::read_i16(&vertex[cursor..]) as f32 / 2048.0;
                    let v = LittleEndian::read_i16(&vertex[cursor + 2..]) as f32 / 2048.0;
                    cursor += 4;
                    texcoords.push([u, v]);
                } else {
                    let u = LittleEndian::read_f32(&vertex[cursor..]);
                    let v = LittleEndian::read_f32(&vertex[cursor + 4..]);
                    cursor += 8;
                    texcoords.push([u, v]);
                }
            }

            let _ = cursor;

            match (indices, weights) {
                (Some(idx), Some(w)) => {
                    let pairs = idx
                        .into_iter()
                        .zip(w)
                        .filter(|(_, weight)| *weight > 0.0)
                        .collect();
                    bone_weights.push(pairs);
                }
                (Some(idx), None) => {
                    bone_weights.push(idx.into_iter().map(|i| (i, 1.0)).collect());
                }
                _ => bone_weights.push(Vec::new()),
            }
        }

        Ok(VertexBlock {
            positions,
            normals,
            tangents,
            bitangents,
            texcoords,
            colors,
            bone_weights,
            pretransformed: self.is_pretransformed(),
            static_lighting: self.flags.contains(VbufFlags::STATIC_LIGHTING),
            softskinned: self.flags.contains(VbufFlags::BONE_WEIGHTS),
        })
    }

    /// Reads one packed normal/tangent/bitangent component, 4 bytes
    /// compressed or 12 uncompressed, advancing `cursor`.
    fn read_normal(&self, vertex: &[u8], cursor: &mut usize) -> Vec3 {
        if self.flags.contains(VbufFlags::NORMAL_COMPRESSED) {
            let packed = LittleEndian::read_u32(&vertex[*cursor..]);
            *cursor += 4;
            match self.platform {
                Platform::Xbox => unpack_normal_xbox(packed),
                Platform::Pc | Platform::Ps2 => unpack_normal_pc(packed),
            }
        } else {
            let x = LittleEndian::read_f32(&vertex[*cursor..]);
            let y = LittleEndian::read_f32(&vertex[*cursor + 4..]);
            let z = LittleEndian::read_f32(&vertex[*cursor + 8..]);
            *cursor += 12;
            Vec3::new(x, y, z)
        }
    }
}

fn read_color(bytes: &[u8]) -> [u8; 4] {
    // unpackUnorm4x8 then .bgra: reorders (byte0, byte1, byte2, byte3) into
    // (byte2, byte1, byte0, byte3).
    [bytes[2], bytes[1], bytes[0], bytes[3]]
}

/// PC's compressed normal: `unorm8x4` mapped to `[-1, 1]`, then a component
/// reorder (`.zyx`) — the packed byte order is `(_, z, y, x)`, not
/// `(x, y, z, _)`.
fn unpack_normal_pc(packed: u32) -> Vec3 {
    let bytes = packed.to_le_bytes();
    let unorm_to_signed = |b: u8| (b as f32 / 255.0) * 2.0 - 1.0;
    Vec3::new(
        unorm_to_signed(bytes[2]),
        unorm_to_signed(bytes[1]),
        unorm_to_signed(bytes[0]),
    )
}

/// Xbox's compressed normal: signed 11/11/10 bits packed into 32, each
/// sign-extended from its own field width before being scaled down.
fn unpack_normal_xbox(packed: u32) -> Vec3 {
    let x_unsigned = packed & 0x7ff;
    let y_unsigned = (packed >> 11) & 0x7ff;
    let z_unsigned = (packed >> 22) & 0x3ff;

    let x_signed = sign_extend(x_unsigned, 11);
    let y_signed = sign_extend(y_unsigned, 11);
    let z_signed = sign_extend(z_unsigned, 10);

    Vec3::new(
        x_signed as f32 / 1023.0,
        y_signed as f32 / 1023.0,
        z_signed as f32 / 511.0,
    )
}

fn sign_extend(value: u32, bits: u32) -> i32 {
    let sign_bit = 1u32 << (bits - 1);
    if value & sign_bit != 0 {
        (value | !((sign_bit << 1) - 1)) as i32
    } else {
        value as i32
    }
}
