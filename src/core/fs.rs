//! File-system capability used by the workflow engine.
//!
//! The engine only needs four operations, so it takes them through a small
//! trait. `OsFileSystem` is the real implementation; `MemoryFileSystem` is an
//! in-memory double with fault injection for tests.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

/// Minimal file-system operations.
pub trait FileSystem: Send + Sync {
    /// Whether a file or directory exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Read an entire file.
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Create or truncate a file with the given contents.
    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Create a directory and all missing parents.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Replace a file so readers see either the old or the new contents.
    ///
    /// Defaults to a plain write for implementations that are atomic anyway.
    fn replace_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        self.write_file(path, contents)
    }
}

/// The host file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl OsFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for OsFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        std::fs::write(path, contents)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn replace_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let dir = parent_dir(path).unwrap_or_else(|| Path::new("."));

        // Same directory as the target so the rename never crosses devices.
        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(contents)?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|err| err.error)?;
        Ok(())
    }
}

/// Parent directory of a path, `None` for bare file names.
pub fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|parent| !parent.as_os_str().is_empty())
}

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
    unreadable: BTreeSet<PathBuf>,
    read_only: Vec<PathBuf>,
    writes: usize,
}

impl MemoryState {
    fn add_ancestors(&mut self, path: &Path) {
        let mut current = parent_dir(path);
        while let Some(dir) = current {
            if !self.dirs.insert(dir.to_path_buf()) {
                break;
            }
            current = parent_dir(dir);
        }
    }

    fn check_writable(&self, path: &Path) -> io::Result<()> {
        if self.read_only.iter().any(|prefix| path.starts_with(prefix)) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("read-only location: {}", path.display()),
            ));
        }
        Ok(())
    }
}

/// In-memory file system.
///
/// Writes require the parent directory to exist, matching the host
/// behaviour, so callers have to create directories explicitly.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    state: Mutex<MemoryState>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file, creating its ancestors.
    pub fn with_file(self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Self {
        self.insert_file(path, contents);
        self
    }

    /// Seed a file without counting it as a write.
    pub fn insert_file(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) {
        let path = path.as_ref();
        let mut state = self.state.lock();
        state.add_ancestors(path);
        state.files.insert(path.to_path_buf(), contents.as_ref().to_vec());
    }

    /// Remove a file if present.
    pub fn remove_file(&self, path: impl AsRef<Path>) -> bool {
        self.state.lock().files.remove(path.as_ref()).is_some()
    }

    /// Make reads of `path` fail with permission denied.
    pub fn deny_reads(&self, path: impl AsRef<Path>) {
        self.state.lock().unreadable.insert(path.as_ref().to_path_buf());
    }

    /// Make every write under `prefix` fail with permission denied.
    pub fn deny_writes(&self, prefix: impl AsRef<Path>) {
        self.state.lock().read_only.push(prefix.as_ref().to_path_buf());
    }

    /// File contents as UTF-8, if present.
    pub fn read_to_string(&self, path: impl AsRef<Path>) -> Option<String> {
        self.state
            .lock()
            .files
            .get(path.as_ref())
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Number of successful file writes.
    pub fn write_count(&self) -> usize {
        self.state.lock().writes
    }

    /// All file paths, sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        self.state.lock().files.keys().cloned().collect()
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: &Path) -> bool {
        let state = self.state.lock();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        let state = self.state.lock();
        if state.unreadable.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("permission denied: {}", path.display()),
            ));
        }
        state.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no such file: {}", path.display()))
        })
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock();
        state.check_writable(path)?;

        if let Some(parent) = parent_dir(path) {
            if !state.dirs.contains(parent) {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("parent directory missing: {}", parent.display()),
                ));
            }
        }
        if state.dirs.contains(path) {
            return Err(io::Error::other(format!("is a directory: {}", path.display())));
        }

        state.files.insert(path.to_path_buf(), contents.to_vec());
        state.writes += 1;
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut state = self.state.lock();
        if state.dirs.contains(path) {
            return Ok(());
        }
        state.check_writable(path)?;
        if state.files.contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("file exists: {}", path.display()),
            ));
        }
        state.dirs.insert(path.to_path_buf());
        state.add_ancestors(path);
        Ok(())
    }
}
