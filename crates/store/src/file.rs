//! JSON file store.
//!
//! Several `lexchat` processes may share one state file, so nothing is
//! cached: reads go to disk, and every batch takes an exclusive lock on a
//! sibling `.lock` file, re-reads the file, applies the ops, and replaces the
//! file through a temp file + rename. A batch is either fully on disk or not
//! at all, and never drops another process's writes.

use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use lexchat_core::{apply_ops, Entries, Error, KeyValueStore, Result, StoreErrorCode, StoreOp};

pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
    /// Serializes writers within this process
    writer: Mutex<()>,
}

impl FileStore {
    /// Opens the store, creating the parent directory if needed. A missing
    /// file is an empty store; an unreadable one is an error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                Error::store(
                    StoreErrorCode::Unavailable,
                    format!("Cannot create {}: {}", parent.display(), e),
                )
            })?;
        }

        let store = Self {
            lock_path: path.with_extension("json.lock"),
            path,
            writer: Mutex::new(()),
        };

        let entries = store.read_entries()?;
        debug!(path = %store.path.display(), entries = entries.len(), "Opened state file");

        Ok(store)
    }

    fn read_entries(&self) -> Result<Entries> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(Entries::new()),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                Error::store(
                    StoreErrorCode::Corrupt,
                    format!("Invalid state file {}: {}", self.path.display(), e),
                )
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(Error::store(
                StoreErrorCode::Unavailable,
                format!("Cannot read {}: {}", self.path.display(), e),
            )),
        }
    }

    /// Blocks until this handle is the only writer across processes. The
    /// lock is released when the returned file is dropped.
    fn lock(&self) -> Result<File> {
        let unavailable = |e: std::io::Error| {
            Error::store(
                StoreErrorCode::Unavailable,
                format!("Cannot lock {}: {}", self.lock_path.display(), e),
            )
        };

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(unavailable)?;
        file.lock_exclusive().map_err(unavailable)?;
        Ok(file)
    }

    fn write_file(&self, entries: &Entries) -> Result<()> {
        let json = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");

        let write = || -> std::io::Result<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(&json)?;
            file.sync_all()?;
            fs::rename(&tmp, &self.path)
        };

        write().map_err(|e| {
            let _ = fs::remove_file(&tmp);
            Error::store(
                StoreErrorCode::Unavailable,
                format!("Cannot write {}: {}", self.path.display(), e),
            )
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_entries()?.remove(key))
    }

    fn apply(&self, ops: Vec<StoreOp>) -> Result<()> {
        let mut ops = Some(ops);
        self.update(&mut |_| ops.take().unwrap_or_default())
    }

    fn update(&self, build: &mut dyn FnMut(&Entries) -> Vec<StoreOp>) -> Result<()> {
        let _writer = self.writer.lock();
        let _lock = self.lock()?;

        let current = self.read_entries()?;
        let mut next = current.clone();
        apply_ops(&mut next, build(&current));

        if next == current {
            return Ok(());
        }
        self.write_file(&next)
    }
}
