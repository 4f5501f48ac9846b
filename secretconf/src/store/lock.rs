//! Advisory lock around the read-modify-write cycle. The lock lives on a
//! `<store>.lock` sidecar because the store file itself is replaced by rename,
//! which would orphan a lock held on the old inode.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

/// Held lock; released when dropped.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
}

impl StoreLock {
    pub fn exclusive(store_path: &Path) -> io::Result<Self> {
        let (file, path) = open_sidecar(store_path)?;
        FileExt::lock_exclusive(&file)?;
        debug!(lock = %path.display(), "acquired exclusive store lock");
        Ok(Self { file })
    }

    pub fn shared(store_path: &Path) -> io::Result<Self> {
        let (file, path) = open_sidecar(store_path)?;
        FileExt::lock_shared(&file)?;
        debug!(lock = %path.display(), "acquired shared store lock");
        Ok(Self { file })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

pub fn sidecar_path(store_path: &Path) -> PathBuf {
    let mut name = store_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    store_path.with_file_name(name)
}

fn open_sidecar(store_path: &Path) -> io::Result<(File, PathBuf)> {
    let path = sidecar_path(store_path);
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)?;
    Ok((file, path))
}
