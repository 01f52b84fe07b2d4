/// Fixed-width little-endian scalar readable/writable as a chunk field.
///
/// Mirrors the `WowHeaderR`/`WowHeaderW` pair from `wow-data`, cut down to
/// the plain little-endian POD case this format needs (ucfb never uses the
/// offset-addressed array layout M2 does).
pub trait ChunkPrimitive: Sized + Copy {
    const SIZE: usize;

    fn from_le_bytes(bytes: &[u8]) -> Self;
    fn to_le_bytes_vec(&self) -> Vec<u8>;
}

macro_rules! impl_chunk_primitive {
    ($ty:ty, $size:expr) => {
        impl ChunkPrimitive for $ty {
            const SIZE: usize = $size;

            fn from_le_bytes(bytes: &[u8]) -> Self {
                let mut buf = [0u8; $size];
                buf.copy_from_slice(&bytes[..$size]);
                <$ty>::from_le_bytes(buf)
            }

            fn to_le_bytes_vec(&self) -> Vec<u8> {
                <$ty>::to_le_bytes(*self).to_vec()
            }
        }
    };
}

impl_chunk_primitive!(u8, 1);
impl_chunk_primitive!(i8, 1);
impl_chunk_primitive!(u16, 2);
impl_chunk_primitive!(i16, 2);
impl_chunk_primitive!(u32, 4);
impl_chunk_primitive!(i32, 4);
impl_chunk_primitive!(u64, 8);
impl_chunk_primitive!(i64, 8);
impl_chunk_primitive!(f32, 4);
impl_chunk_primitive!(f64, 8);

impl ChunkPrimitive for [f32; 3] {
    const SIZE: usize = 12;

    fn from_le_bytes(bytes: &[u8]) -> Self {
        [
            f32::from_le_bytes(bytes, 0),
            f32::from_le_bytes(bytes, 4),
            f32::from_le_bytes(bytes, 8),
        ]
    }

    fn to_le_bytes_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(12);
        for component in self {
            out.extend_from_slice(&component.to_le_bytes());
        }
        out
    }
}

// `f32::from_le_bytes` above needs an offset-aware helper since `ChunkPrimitive::from_le_bytes`
// for `[f32; 3]` re-slices manually.
trait FromLeBytesAt: Sized {
    fn from_le_bytes(bytes: &[u8], offset: usize) -> Self;
}

impl FromLeBytesAt for f32 {
    fn from_le_bytes(bytes: &[u8], offset: usize) -> Self {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&bytes[offset..offset + 4]);
        f32::from_le_bytes(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u32_round_trips() {
        let bytes = [0x05, 0x20, 0x00, 0x00];
        assert_eq!(u32::from_le_bytes(&bytes), 0x0000_2005);
        assert_eq!(0x0000_2005u32.to_le_bytes_vec(), bytes.to_vec());
    }

    #[test]
    fn vec3_round_trips() {
        let v = [1.0f32, 2.0, 3.0];
        let bytes = v.to_le_bytes_vec();
        assert_eq!(<[f32; 3]>::from_le_bytes(&bytes), v);
    }
}
