use dashmap::DashMap;
use log::trace;
use path_clean::clean;
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    constants::{DEFAULT_EXTENSIONS, INDEX_STEM},
    error::UnresolvedModule,
    fs::FileSystem,
};

/// Outcome of resolving one specifier from one directory.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The specifier joined onto the importing directory and cleaned.
    pub candidate: PathBuf,
    pub resolved: Result<PathBuf, UnresolvedModule>,
}

impl Resolution {
    /// Deduplication key: the resolved file, or the candidate when nothing resolved.
    pub fn key(&self) -> &Path {
        match &self.resolved {
            Ok(path) => path,
            Err(_) => &self.candidate,
        }
    }
}

/// Maps logical references to concrete module files.
pub struct Resolver {
    fs: Arc<dyn FileSystem>,
    extensions: Vec<String>,
    cache: DashMap<(PathBuf, String), Resolution>,
}

impl Resolver {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self::with_extensions(fs, DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect())
    }

    pub fn with_extensions(fs: Arc<dyn FileSystem>, extensions: Vec<String>) -> Self {
        let extensions =
            extensions.into_iter().map(|e| e.trim_start_matches('.').to_string()).collect();
        Self { fs, extensions, cache: DashMap::new() }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Resolve `reference` as given: directories become `index.<ext>`, and
    /// references without a recognized extension get each extension appended.
    pub fn resolve(&self, reference: &Path) -> Result<PathBuf, UnresolvedModule> {
        trace!("Resolving: {}", reference.display());
        let mut tried = Vec::new();

        if self.fs.is_dir(reference) {
            for ext in &self.extensions {
                let candidate = reference.join(format!("{}.{}", INDEX_STEM, ext));
                if self.fs.is_file(&candidate) {
                    return Ok(self.found(candidate));
                }
                tried.push(candidate);
            }
        } else if self.has_recognized_extension(reference) {
            if self.fs.is_file(reference) {
                return Ok(self.found(reference.to_path_buf()));
            }
            tried.push(reference.to_path_buf());
        } else {
            for ext in &self.extensions {
                let candidate = with_appended_extension(reference, ext);
                if self.fs.is_file(&candidate) {
                    return Ok(self.found(candidate));
                }
                tried.push(candidate);
            }
        }

        trace!("Failed to resolve {}", reference.display());
        Err(UnresolvedModule { reference: reference.to_path_buf(), tried })
    }

    /// Resolve `specifier` as written in a module living in `from_dir`.
    ///
    /// Only relative and absolute specifiers designate files; package
    /// specifiers never resolve.
    pub fn resolve_from(&self, from_dir: &Path, specifier: &str) -> Resolution {
        let key = (from_dir.to_path_buf(), specifier.to_string());
        if let Some(v) = self.cache.get(&key) {
            trace!("Cache hit for resolve: '{}' from {}", specifier, from_dir.display());
            return v.clone();
        }

        let resolution = if is_path_specifier(specifier) {
            let candidate = clean(from_dir.join(specifier));
            let resolved = self.resolve(&candidate);
            Resolution { candidate, resolved }
        } else {
            trace!("Not a relative import, leaving unresolved: '{}'", specifier);
            let candidate = PathBuf::from(specifier);
            Resolution {
                resolved: Err(UnresolvedModule { reference: candidate.clone(), tried: vec![] }),
                candidate,
            }
        };

        self.cache.insert(key, resolution.clone());
        resolution
    }

    fn has_recognized_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|known| known == ext))
    }

    fn found(&self, path: PathBuf) -> PathBuf {
        let canonical = self.fs.canonicalize(&path);
        trace!("Resolved to {}", canonical.display());
        canonical
    }
}

fn with_appended_extension(path: &Path, ext: &str) -> PathBuf {
    let mut s = OsString::from(path.as_os_str());
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

fn is_path_specifier(specifier: &str) -> bool {
    specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/')
        || specifier == "."
        || specifier == ".."
}
