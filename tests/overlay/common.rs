use std::path::PathBuf;
use std::sync::Arc;

use remapfs::overlay::TranslationFs;
use tempfile::TempDir;

/// Backing tree, store file, and backup directory under one tempdir, with
/// a live facade on top.
pub struct Fixture {
    pub tempdir: TempDir,
    pub fs: Arc<TranslationFs>,
}

impl Fixture {
    pub fn new() -> Self {
        let tempdir = TempDir::new().expect("create temp dir");
        let root = tempdir.path().join("root");
        let backups = tempdir.path().join("backups");
        std::fs::create_dir(&root).expect("create backing root");
        std::fs::create_dir(&backups).expect("create backup dir");
        let fs = TranslationFs::new(root, tempdir.path().join("table.db"), backups)
            .expect("open overlay");
        Self { tempdir, fs: Arc::new(fs) }
    }

    pub fn store_path(&self) -> PathBuf {
        self.tempdir.path().join("table.db")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.tempdir.path().join("backups")
    }

    pub fn backing(&self, rel: &str) -> PathBuf {
        self.tempdir.path().join("root").join(rel)
    }

    pub fn write_file(&self, rel: &str, data: &[u8]) {
        let path = self.backing(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(path, data).expect("write fixture file");
    }

    pub fn create_dir(&self, rel: &str) {
        std::fs::create_dir_all(self.backing(rel)).expect("create fixture dir");
    }

    /// Tear the facade down, joining its workers.
    pub async fn shutdown(self) {
        self.fs.destroy().await;
    }
}
