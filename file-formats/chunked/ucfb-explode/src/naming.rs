use ucfb_chunk::Tag;

use crate::error::{ExplodeError, Result};

/// Builds the on-disk name for chunk `index` (`<index>_<tag>_<size>`),
/// hex-escaping the tag when it isn't filename-safe (spec.md §4.D).
pub fn entry_name(index: usize, tag: Tag, size: usize) -> String {
    format!("{index}_{}_{size}", tag.display_name())
}

/// Splits a `<index>_<tag>[_<size>]` entry name back into its index and
/// tag. The tag component has a fixed width (4 ASCII bytes, or an 11-byte
/// `xx-xx-xx-xx` hex escape) so it is located positionally rather than by
/// splitting on `_`, since a literal tag byte (e.g. `lvl_`) may itself be an
/// underscore.
pub fn decompose_name(name: &str) -> Result<(usize, Tag)> {
    let (index_str, rest) = name
        .split_once('_')
        .ok_or_else(|| ExplodeError::BadEntryName(name.to_string()))?;

    let index = index_str
        .parse::<usize>()
        .map_err(|_| ExplodeError::BadEntryIndex(index_str.to_string()))?;

    let tag = parse_tag_prefix(rest).ok_or_else(|| ExplodeError::BadTagComponent(rest.to_string()))?;

    Ok((index, tag))
}

fn parse_tag_prefix(rest: &str) -> Option<Tag> {
    if rest.len() >= 11 {
        if let Some(tag) = Tag::parse_hex_escape(&rest[..11]) {
            return Some(tag);
        }
    }
    if rest.len() >= 4 && rest.is_char_boundary(4) {
        let candidate = &rest.as_bytes()[..4];
        if candidate.is_ascii() {
            return Some(Tag([candidate[0], candidate[1], candidate[2], candidate[3]]));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use ucfb_chunk::tag;

    #[test]
    fn round_trips_an_ascii_tag() {
        let name = entry_name(3, tag!("MODL"), 128);
        assert_eq!(name, "3_MODL_128");
        let (index, t) = decompose_name(&name).unwrap();
        assert_eq!(index, 3);
        assert_eq!(t, tag!("MODL"));
    }

    #[test]
    fn round_trips_a_tag_with_a_literal_underscore() {
        let name = entry_name(0, tag!("lvl_"), 64);
        assert_eq!(name, "0_lvl__64");
        let (index, t) = decompose_name(&name).unwrap();
        assert_eq!(index, 0);
        assert_eq!(t, tag!("lvl_"));
    }

    #[test]
    fn round_trips_a_hex_escaped_tag() {
        let t = Tag([0xaa, 0xbb, 0xcc, 0xdd]);
        let name = entry_name(7, t, 4);
        assert_eq!(name, "7_aa-bb-cc-dd_4");
        let (index, parsed) = decompose_name(&name).unwrap();
        assert_eq!(index, 7);
        assert_eq!(parsed, t);
    }

    #[test]
    fn rejects_a_name_with_no_underscore() {
        assert!(decompose_name("nounderscore").is_err());
    }
}
