use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use ucfb_handlers::collaborators::FileSaver;

/// Filesystem-backed [`FileSaver`]: concurrent `save`, idempotent directory
/// creation via a read/write-lock-guarded set of already-created parents
/// (spec.md §5).
pub struct FilesystemFileSaver {
    root: PathBuf,
    created_dirs: RwLock<HashSet<PathBuf>>,
}

impl FilesystemFileSaver {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            created_dirs: RwLock::new(HashSet::new()),
        }
    }

    fn ensure_parent_dir(&self, parent: &Path) -> std::io::Result<()> {
        if self.created_dirs.read().unwrap().contains(parent) {
            return Ok(());
        }
        std::fs::create_dir_all(parent)?;
        self.created_dirs
            .write()
            .unwrap()
            .insert(parent.to_path_buf());
        Ok(())
    }
}

impl FileSaver for FilesystemFileSaver {
    fn save(&self, relative_path: &str, bytes: &[u8]) -> std::io::Result<()> {
        let path = self.root.join(relative_path);
        if let Some(parent) = path.parent() {
            self.ensure_parent_dir(parent)?;
        }
        std::fs::write(path, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_creates_nested_directories_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let saver = FilesystemFileSaver::new(dir.path().to_path_buf());
        saver.save("world/region.rgn", b"hello").unwrap();
        assert_eq!(
            std::fs::read(dir.path().join("world/region.rgn")).unwrap(),
            b"hello"
        );
    }

    #[test]
    fn repeated_saves_into_the_same_directory_do_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let saver = FilesystemFileSaver::new(dir.path().to_path_buf());
        saver.save("odf/a.odf", b"a").unwrap();
        saver.save("odf/b.odf", b"b").unwrap();
        assert!(dir.path().join("odf/a.odf").exists());
        assert!(dir.path().join("odf/b.odf").exists());
    }
}
