use log::{debug, trace, warn};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    analyzer::ModuleAnalyzer,
    error::{BundleError, BundleResult},
    fs::FileSystem,
    resolver::{Resolution, Resolver},
    types::{Asset, AssetId, Mode},
};

/// Produces [`Asset`]s from module references.
///
/// Failures on the entry are always returned. Failures on dependencies are
/// turned into placeholder assets in [`Mode::Lenient`] and returned in
/// [`Mode::Strict`].
pub struct AssetLoader {
    fs: Arc<dyn FileSystem>,
    resolver: Resolver,
    analyzer: Arc<dyn ModuleAnalyzer>,
    mode: Mode,
}

impl AssetLoader {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        resolver: Resolver,
        analyzer: Arc<dyn ModuleAnalyzer>,
        mode: Mode,
    ) -> Self {
        Self { fs, resolver, analyzer, mode }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Load `reference`, resolved against `from_dir` when it is a dependency
    /// or as given when it is the entry (`from_dir` is `None`).
    pub fn load(&self, reference: &str, from_dir: Option<&Path>, id: AssetId) -> BundleResult<Asset> {
        match from_dir {
            None => self.load_entry(Path::new(reference), id),
            Some(dir) => {
                let resolution = self.resolver.resolve_from(dir, reference);
                self.load_dependency(reference, dir, &resolution, id)
            }
        }
    }

    pub fn load_entry(&self, reference: &Path, id: AssetId) -> BundleResult<Asset> {
        debug!("Loading entry: {}", reference.display());
        let path = self.resolver.resolve(reference).map_err(BundleError::EntryNotFound)?;
        let source = self
            .fs
            .read_to_string(&path)
            .map_err(|source| BundleError::Io { path: path.clone(), source })?;
        self.analyze(path, &source, id)
    }

    /// Load a dependency whose resolution the caller already computed.
    pub fn load_dependency(
        &self,
        specifier: &str,
        importer_dir: &Path,
        resolution: &Resolution,
        id: AssetId,
    ) -> BundleResult<Asset> {
        let path = match &resolution.resolved {
            Ok(path) => path.clone(),
            Err(e) => {
                if self.mode == Mode::Strict {
                    return Err(BundleError::UnresolvedDependency {
                        specifier: specifier.to_string(),
                        importer: importer_dir.to_path_buf(),
                        source: e.clone(),
                    });
                }
                warn!(
                    "Could not resolve '{}' from {}: {}; using an empty module",
                    specifier,
                    importer_dir.display(),
                    e
                );
                return Ok(Asset::placeholder(id, resolution.candidate.clone(), e.to_string()));
            }
        };

        trace!("Reading dependency: {}", path.display());
        match self.fs.read_to_string(&path) {
            Ok(source) => self.analyze(path, &source, id),
            Err(source) if self.mode == Mode::Strict => {
                Err(BundleError::DependencyUnreadable { path, source })
            }
            Err(e) => {
                warn!("Failed to read {}: {}; using an empty module", path.display(), e);
                let reason = format!("failed to read: {}", e);
                Ok(Asset::placeholder(id, path, reason))
            }
        }
    }

    fn analyze(&self, path: PathBuf, source: &str, id: AssetId) -> BundleResult<Asset> {
        match self.analyzer.analyze(&path, source) {
            Ok(analysis) => {
                debug!(
                    "Loaded asset {} ({} specifiers): {}",
                    id,
                    analysis.specifiers.len(),
                    path.display()
                );
                Ok(Asset::new(id, path, analysis.specifiers, analysis.body))
            }
            Err(source) if self.mode == Mode::Strict => {
                Err(BundleError::AnalysisFailed { path, source })
            }
            Err(e) => {
                warn!("Failed to analyze {}: {}; using an empty module", path.display(), e);
                Ok(Asset::placeholder(id, path, e.message))
            }
        }
    }
}
