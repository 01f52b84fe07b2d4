use std::fs;
use std::path::Path;

use rayon::prelude::*;
use ucfb_chunk::{ChunkReader, Tag};

use crate::error::Result;
use crate::naming::entry_name;

const CHUNK_FILE_EXT: &str = "chunk";

/// Explodes a whole ucfb file into `out_dir`: one subdirectory per container
/// chunk, one `.chunk` file (raw tag + size + payload) per leaf chunk
/// (spec.md §4.D).
pub fn explode_root(bytes: &[u8], out_dir: &Path) -> Result<()> {
    let root = ChunkReader::open(bytes)?;
    explode_chunk(0, root, out_dir)
}

fn explode_chunk(index: usize, chunk: ChunkReader<'_>, parent_dir: &Path) -> Result<()> {
    let tag = chunk.tag();
    let size = chunk.size();
    let payload = chunk.payload_bytes();

    fs::create_dir_all(parent_dir)?;

    if let Some(children) = read_children_if_container(tag, payload) {
        let dir_path = parent_dir.join(entry_name(index, tag, size));
        fs::create_dir_all(&dir_path)?;

        children
            .into_par_iter()
            .enumerate()
            .try_for_each(|(child_index, child)| explode_chunk(child_index, child, &dir_path))?;
    } else {
        let file_path = parent_dir.join(format!("{}.{CHUNK_FILE_EXT}", entry_name(index, tag, size)));
        write_raw_chunk(&file_path, tag, payload)?;
    }

    Ok(())
}

/// A chunk "looks like a container" if its own tag is filename-safe AND its
/// payload can be read end to end as a sequence of 4-byte-aligned
/// `(tag, size, data)` children with no trailing garbage (spec.md §4.D).
/// Anything else (including an empty payload or a non-alnum tag whose bytes
/// happen to parse as valid children) is treated as opaque leaf data and
/// dumped raw, matching the fallback in `explode_chunk.cpp`.
fn read_children_if_container(tag: Tag, payload: &[u8]) -> Option<Vec<ChunkReader<'_>>> {
    if payload.is_empty() || !tag.is_filename_safe() {
        return None;
    }

    let mut children = Vec::new();
    let mut head = 0usize;

    while head < payload.len() {
        if head + 8 > payload.len() {
            return None;
        }

        let tag = Tag([
            payload[head],
            payload[head + 1],
            payload[head + 2],
            payload[head + 3],
        ]);
        let size = u32::from_le_bytes([
            payload[head + 4],
            payload[head + 5],
            payload[head + 6],
            payload[head + 7],
        ]) as usize;

        let data_start = head + 8;
        let data_end = data_start + size;
        if data_end > payload.len() {
            return None;
        }

        children.push(ChunkReader::open(&payload[head..data_end]).ok()?);

        let mut next = data_end;
        let misalignment = next % 4;
        if misalignment != 0 {
            next += 4 - misalignment;
        }
        head = next;
    }

    if head == payload.len() {
        Some(children)
    } else {
        None
    }
}

fn write_raw_chunk(path: &Path, tag: Tag, payload: &[u8]) -> Result<()> {
    let mut buf = Vec::with_capacity(8 + payload.len());
    buf.extend_from_slice(&tag.as_bytes());
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(payload);
    fs::write(path, buf)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ucfb_chunk::{tag, ChunkWriter};

    fn sample_container() -> Vec<u8> {
        let mut writer = ChunkWriter::new();
        {
            let mut root = writer.open_child(tag!("ucfb"), false).unwrap();
            {
                let mut child = root.open_child(tag!("CHLD"), false).unwrap();
                child.write::<u32>(7, true).unwrap();
            }
            {
                let mut child = root.open_child(tag!("CHL2"), false).unwrap();
                child.write_string("leaf", true).unwrap();
            }
        }
        writer.into_bytes()
    }

    #[test]
    fn explodes_a_container_into_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = sample_container();
        explode_root(&bytes, dir.path()).unwrap();

        let root_payload_size = bytes.len() - 8;
        let root_dir = dir.path().join(format!("0_ucfb_{root_payload_size}"));
        assert!(root_dir.is_dir(), "expected root container directory to exist");

        let mut entries: Vec<_> = fs::read_dir(&root_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        entries.sort();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn leaf_payloads_are_dumped_raw_with_their_header() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = ChunkWriter::new();
        let root_size;
        {
            let mut root = writer.open_child(tag!("ucfb"), false).unwrap();
            {
                let mut leaf = root.open_child(tag!("LEAF"), false).unwrap();
                leaf.write::<u32>(99, true).unwrap();
            }
            root_size = 12; // header(8) + u32 payload(4), already 4-byte aligned
        }
        let bytes = writer.into_bytes();

        explode_root(&bytes, dir.path()).unwrap();

        let root_dir = dir.path().join(format!("0_ucfb_{root_size}"));
        let entries: Vec<_> = fs::read_dir(&root_dir).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let leaf_path = entries[0].as_ref().unwrap().path();
        assert_eq!(leaf_path.extension().unwrap(), "chunk");
        assert_eq!(
            leaf_path.file_name().unwrap().to_string_lossy(),
            "0_LEAF_4.chunk"
        );

        let raw = fs::read(&leaf_path).unwrap();
        assert_eq!(&raw[..4], b"LEAF");
        assert_eq!(u32::from_le_bytes(raw[4..8].try_into().unwrap()), 4);
        assert_eq!(u32::from_le_bytes(raw[8..12].try_into().unwrap()), 99);
    }

    #[test]
    fn a_non_filename_safe_tag_is_dumped_raw_even_if_its_payload_parses_as_children() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = ChunkWriter::new();
        {
            let mut root = writer.open_child(tag!("ucfb"), false).unwrap();
            {
                // payload looks exactly like one valid (tag, size, data) child,
                // but the outer tag itself isn't filename-safe.
                let mut weird = root.open_child(Tag([0xff, 0x00, b'!', b'Z']), false).unwrap();
                {
                    let mut inner = weird.open_child(tag!("CHLD"), false).unwrap();
                    inner.write::<u32>(1, true).unwrap();
                }
            }
        }
        let bytes = writer.into_bytes();

        explode_root(&bytes, dir.path()).unwrap();

        let root_dir = dir.path().join(format!("0_ucfb_{}", bytes.len() - 8));
        let entries: Vec<_> = fs::read_dir(&root_dir).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let entry_path = entries[0].as_ref().unwrap().path();
        assert!(
            entry_path.is_file(),
            "non-filename-safe tag should be dumped as a raw .chunk file, not exploded"
        );
        assert_eq!(entry_path.extension().unwrap(), "chunk");
    }
}
