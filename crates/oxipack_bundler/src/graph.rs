use log::{debug, info, trace};
use rayon::prelude::*;
use serde::Serialize;
use std::{
    collections::{HashMap, VecDeque},
    path::{Path, PathBuf},
};

use oxipack_core::{Asset, AssetId, AssetLoader, BundleResult, Resolution};

/// Every asset discovered by one build, indexed by id.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct Graph {
    assets: Vec<Asset>,
}

impl Graph {
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn get(&self, id: AssetId) -> Option<&Asset> {
        self.assets.get(id)
    }

    /// The entry asset. Always id 0.
    pub fn entry(&self) -> &Asset {
        &self.assets[0]
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &Asset> {
        self.assets.iter().filter(|a| a.is_placeholder())
    }
}

/// One build session: owns the id counter and the path → id dedup map.
///
/// Assets are discovered breadth-first. An id is handed out, and the path
/// recorded, the moment a path is first seen, so a cycle back to an asset
/// that is still queued is a map hit rather than a second load.
pub struct GraphBuilder {
    loader: AssetLoader,
    parallel: bool,
    next_id: AssetId,
    seen: HashMap<PathBuf, AssetId>,
}

impl GraphBuilder {
    pub fn new(loader: AssetLoader) -> Self {
        Self { loader, parallel: false, next_id: 0, seen: HashMap::new() }
    }

    /// Load each breadth-first layer concurrently. Ids are still handed out
    /// in discovery order, so the graph is identical to a sequential build.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn build(mut self, entry: &Path) -> BundleResult<Graph> {
        info!("Building module graph from {}", entry.display());
        let id = self.assign_id();
        let entry = self.loader.load_entry(entry, id)?;
        self.seen.insert(entry.resolved_path.clone(), entry.id);

        let assets =
            if self.parallel { self.traverse_layers(entry)? } else { self.traverse(entry)? };

        debug_assert!(assets.iter().enumerate().all(|(i, a)| a.id == i));
        info!("Module graph complete: {} assets", assets.len());
        Ok(Graph { assets })
    }

    fn traverse(&mut self, entry: Asset) -> BundleResult<Vec<Asset>> {
        let mut assets = Vec::new();
        let mut queue = VecDeque::from([entry]);

        while let Some(mut asset) = queue.pop_front() {
            trace!("Visiting asset {}: {}", asset.id, asset.resolved_path.display());
            let dir = parent_dir(&asset.resolved_path);

            for specifier in &asset.specifiers {
                let resolution = self.loader.resolver().resolve_from(&dir, specifier);
                let id = match self.seen.get(resolution.key()) {
                    Some(&id) => {
                        trace!("Reusing asset {} for '{}'", id, specifier);
                        id
                    }
                    None => {
                        let id = self.discover(&resolution);
                        let child = self.loader.load_dependency(specifier, &dir, &resolution, id)?;
                        queue.push_back(child);
                        id
                    }
                };
                asset.mapping.insert(specifier.clone(), id);
            }

            assets.push(asset);
        }

        Ok(assets)
    }

    fn traverse_layers(&mut self, entry: Asset) -> BundleResult<Vec<Asset>> {
        let mut assets = Vec::new();
        let mut layer = vec![entry];

        while !layer.is_empty() {
            let mut pending: Vec<(String, PathBuf, Resolution, AssetId)> = Vec::new();

            for asset in layer.iter_mut() {
                let dir = parent_dir(&asset.resolved_path);
                for specifier in &asset.specifiers {
                    let resolution = self.loader.resolver().resolve_from(&dir, specifier);
                    let id = match self.seen.get(resolution.key()) {
                        Some(&id) => id,
                        None => {
                            let id = self.discover(&resolution);
                            pending.push((specifier.clone(), dir.clone(), resolution, id));
                            id
                        }
                    };
                    asset.mapping.insert(specifier.clone(), id);
                }
            }
            assets.append(&mut layer);

            debug!("Loading {} modules in parallel", pending.len());
            let loader = &self.loader;
            layer = pending
                .par_iter()
                .map(|(specifier, dir, resolution, id)| {
                    loader.load_dependency(specifier, dir, resolution, *id)
                })
                .collect::<BundleResult<Vec<_>>>()?;
        }

        Ok(assets)
    }

    fn discover(&mut self, resolution: &Resolution) -> AssetId {
        let id = self.assign_id();
        self.seen.insert(resolution.key().to_path_buf(), id);
        trace!("Discovered asset {}: {}", id, resolution.key().display());
        id
    }

    fn assign_id(&mut self) -> AssetId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}
