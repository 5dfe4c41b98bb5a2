use std::path::{Path, PathBuf};

/// Flat-file store backend. Every write replaces the whole document in place;
/// there is no atomic rename and no locking, so concurrent writers can lose
/// updates or corrupt a file.
pub trait StorageManager: Send + Sync {
    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()>;
    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>>;
    fn exists(&self, ident: &str) -> bool;
}

#[derive(Debug, Clone)]
pub struct BackendLocal {
    pub base_dir: PathBuf,
}

impl BackendLocal {
    pub fn new(base_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_dir)?;
        Ok(BackendLocal { base_dir })
    }

    fn path_for(&self, ident: &str) -> PathBuf {
        self.base_dir.join(ident)
    }
}

impl StorageManager for BackendLocal {
    fn exists(&self, ident: &str) -> bool {
        std::fs::metadata(self.path_for(ident)).is_ok()
    }

    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.path_for(ident))
    }

    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()> {
        std::fs::write(self.path_for(ident), data)
    }
}
