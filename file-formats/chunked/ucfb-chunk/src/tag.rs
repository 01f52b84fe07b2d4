use std::fmt;

/// A 4-byte chunk tag, the little-endian packing of four ASCII bytes.
///
/// Unlike some IFF-family formats, ucfb tags are stored in file order with no
/// byte reversal: the bytes of `"ucfb"` appear on disk exactly as `['u', 'c',
/// 'f', 'b']`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    pub const fn from_ascii(s: &[u8; 4]) -> Self {
        Self(*s)
    }

    pub fn as_bytes(&self) -> [u8; 4] {
        self.0
    }

    /// `true` iff every byte is in `[0-9A-Za-z_]`, used by explode/assemble
    /// to decide whether a tag is safe to use as a filename component.
    pub fn is_filename_safe(&self) -> bool {
        self.0
            .iter()
            .all(|&b| b.is_ascii_alphanumeric() || b == b'_')
    }

    /// Renders the tag as ASCII text if safe, otherwise as a hex-escaped
    /// `aa-bb-cc-dd` form (little-endian byte order), per spec.md §6.3.
    pub fn display_name(&self) -> String {
        if self.is_filename_safe() {
            String::from_utf8_lossy(&self.0).into_owned()
        } else {
            self.0
                .iter()
                .map(|b| format!("{b:02x}"))
                .collect::<Vec<_>>()
                .join("-")
        }
    }

    /// Parses the hex-escaped `aa-bb-cc-dd` form back into a tag.
    pub fn parse_hex_escape(s: &str) -> Option<Self> {
        let mut bytes = [0u8; 4];
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() != 4 {
            return None;
        }
        for (i, part) in parts.iter().enumerate() {
            bytes[i] = u8::from_str_radix(part, 16).ok()?;
        }
        Some(Self(bytes))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl From<[u8; 4]> for Tag {
    fn from(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }
}

#[macro_export]
macro_rules! tag {
    ($s:literal) => {{
        const BYTES: &[u8] = $s.as_bytes();
        $crate::Tag([BYTES[0], BYTES[1], BYTES[2], BYTES[3]])
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_safe_tags_render_as_ascii() {
        let tag = tag!("ucfb");
        assert!(tag.is_filename_safe());
        assert_eq!(tag.display_name(), "ucfb");
    }

    #[test]
    fn unsafe_tags_render_as_hex_escape() {
        let tag = Tag([0xaa, 0xbb, 0xcc, 0xdd]);
        assert!(!tag.is_filename_safe());
        assert_eq!(tag.display_name(), "aa-bb-cc-dd");
        assert_eq!(Tag::parse_hex_escape("aa-bb-cc-dd"), Some(tag));
    }
}
