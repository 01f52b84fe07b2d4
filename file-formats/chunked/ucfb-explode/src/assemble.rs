use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use ucfb_chunk::Tag;

use crate::error::{ExplodeError, Result};
use crate::naming::decompose_name;

struct DirEntry {
    index: usize,
    tag: Tag,
    path: PathBuf,
}

/// Reassembles a directory tree produced by [`crate::explode_root`] back
/// into the original ucfb bytes (spec.md §4.D). The inverse of explode:
/// directories become container chunks, `.chunk` files are already the raw
/// `tag + size + payload` bytes explode wrote.
pub fn assemble_root(dir: &Path) -> Result<Vec<u8>> {
    let entries = read_dir_entries(dir)?;
    let root = entries
        .first()
        .ok_or_else(|| ExplodeError::NotAChunkEntry {
            path: dir.display().to_string(),
        })?;
    assemble_entry(root)
}

fn assemble_entry(entry: &DirEntry) -> Result<Vec<u8>> {
    if entry.path.is_dir() {
        let payload = assemble_children(&entry.path)?;
        Ok(build_chunk(entry.tag, &payload))
    } else if entry.path.is_file() {
        Ok(fs::read(&entry.path)?)
    } else {
        Err(ExplodeError::NotAChunkEntry {
            path: entry.path.display().to_string(),
        })
    }
}

fn assemble_children(dir: &Path) -> Result<Vec<u8>> {
    let entries = read_dir_entries(dir)?;
    let parts = entries
        .par_iter()
        .map(assemble_entry)
        .collect::<Result<Vec<Vec<u8>>>>()?;

    let mut out = Vec::new();
    for part in parts {
        out.extend_from_slice(&part);
        let misalignment = out.len() % 4;
        if misalignment != 0 {
            out.resize(out.len() + (4 - misalignment), 0);
        }
    }
    Ok(out)
}

fn build_chunk(tag: Tag, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8 + payload.len());
    buf.extend_from_slice(&tag.as_bytes());
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Lists `dir`'s entries and decomposes each name back into its original
/// index and tag, sorted stably by index (directory iteration order is not
/// guaranteed to match the original sibling order).
fn read_dir_entries(dir: &Path) -> Result<Vec<DirEntry>> {
    let raw_entries = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;

    let mut entries = raw_entries
        .into_par_iter()
        .map(|raw| {
            let path = raw.path();
            let name = raw.file_name().to_string_lossy().into_owned();
            let stem = name.strip_suffix(".chunk").unwrap_or(&name);
            decompose_name(stem).map(|(index, tag)| DirEntry { index, tag, path })
        })
        .collect::<Result<Vec<DirEntry>>>()?;

    entries.sort_by_key(|e| e.index);
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explode::explode_root;
    use ucfb_chunk::{tag, ChunkWriter};

    fn sample_tree() -> Vec<u8> {
        let mut writer = ChunkWriter::new();
        {
            let mut root = writer.open_child(tag!("ucfb"), false).unwrap();
            {
                let mut child = root.open_child(tag!("CHLD"), false).unwrap();
                child.write::<u32>(7, true).unwrap();
            }
            {
                let mut nested = root.open_child(tag!("NEST"), false).unwrap();
                {
                    let mut inner = nested.open_child(tag!("INNR"), false).unwrap();
                    inner.write_string("hello", true).unwrap();
                }
            }
        }
        writer.into_bytes()
    }

    #[test]
    fn explode_then_assemble_round_trips_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let original = sample_tree();

        explode_root(&original, dir.path()).unwrap();
        let reassembled = assemble_root(dir.path()).unwrap();

        assert_eq!(original, reassembled);
    }
}
