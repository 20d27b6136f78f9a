use path_clean::clean;
use std::{
    collections::{BTreeMap, BTreeSet},
    fs, io,
    path::{Path, PathBuf},
};

/// The filesystem operations the resolver and loader depend on.
pub trait FileSystem: Send + Sync {
    fn is_file(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Canonical form of `path`, used as the deduplication key for assets.
    fn canonicalize(&self, path: &Path) -> PathBuf {
        clean(path)
    }
}

/// Filesystem backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn canonicalize(&self, path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| clean(path))
    }
}

/// In-memory filesystem. Directories exist implicitly for every ancestor of a file.
#[derive(Debug, Default, Clone)]
pub struct MemoryFileSystem {
    files: BTreeMap<PathBuf, String>,
    /// Files that exist but fail every read with `PermissionDenied`.
    unreadable: BTreeSet<PathBuf>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl AsRef<Path>, contents: impl Into<String>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, contents: impl Into<String>) {
        self.files.insert(clean(path.as_ref()), contents.into());
    }

    /// Add a file that exists but cannot be read.
    pub fn with_unreadable(mut self, path: impl AsRef<Path>) -> Self {
        let path = clean(path.as_ref());
        self.files.insert(path.clone(), String::new());
        self.unreadable.insert(path);
        self
    }
}

impl FileSystem for MemoryFileSystem {
    fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(&clean(path))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let dir = clean(path);
        self.files.keys().any(|f| f != &dir && f.starts_with(&dir))
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let path = &clean(path);
        if self.unreadable.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is not readable", path.display()),
            ));
        }
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_fs_implies_directories() {
        let fs = MemoryFileSystem::new().with_file("/app/src/lib/index.js", "");
        assert!(fs.is_dir(Path::new("/app/src")));
        assert!(fs.is_dir(Path::new("/app/src/lib")));
        assert!(!fs.is_dir(Path::new("/app/src/lib/index.js")));
        assert!(fs.is_file(Path::new("/app/src/lib/index.js")));
    }

    #[test]
    fn test_memory_fs_cleans_paths() {
        let fs = MemoryFileSystem::new().with_file("/app/./src/../a.js", "x");
        assert!(fs.is_file(Path::new("/app/a.js")));
        assert_eq!(fs.read_to_string(Path::new("/app/src/../a.js")).unwrap(), "x");
    }

    #[test]
    fn test_memory_fs_unreadable_file_exists() {
        let fs = MemoryFileSystem::new().with_unreadable("/app/locked.js");
        assert!(fs.is_file(Path::new("/app/locked.js")));
        let err = fs.read_to_string(Path::new("/app/locked.js")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_memory_fs_missing_file_is_not_found() {
        let fs = MemoryFileSystem::new();
        let err = fs.read_to_string(Path::new("/nope.js")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_os_fs_canonicalize_falls_back_for_missing_paths() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("a").join("..").join("missing.js");
        let canonical = OsFileSystem.canonicalize(&missing);
        assert_eq!(canonical, temp_dir.path().join("missing.js"));
    }

    #[test]
    fn test_os_fs_reads_files() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.js");
        fs::write(&file, "export const a = 1;").unwrap();
        assert!(OsFileSystem.is_file(&file));
        assert!(OsFileSystem.is_dir(temp_dir.path()));
        assert_eq!(OsFileSystem.read_to_string(&file).unwrap(), "export const a = 1;");
    }
}
