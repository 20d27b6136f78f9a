use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::{path::Path, sync::Arc};

use oxipack_core::{
    AssetLoader, BundleResult, FileSystem, ModuleAnalyzer, OsFileSystem, OxcAnalyzer, Resolver,
};

use crate::{
    config::Config,
    emitter::emit,
    graph::{Graph, GraphBuilder},
};

#[derive(Debug, Clone)]
pub struct BundleOutput {
    pub code: String,
    pub graph: Graph,
}

impl BundleOutput {
    pub fn graph_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.graph)
    }
}

/// Bundle `entry` with the default settings and return the script.
pub fn build_bundle(entry: &Path) -> BundleResult<String> {
    let graph = build_graph(&Config::new(entry))?;
    Ok(emit(&graph))
}

/// Build the module graph described by `cfg` from the real filesystem.
pub fn build_graph(cfg: &Config) -> BundleResult<Graph> {
    build_graph_with(cfg, Arc::new(OsFileSystem), Arc::new(OxcAnalyzer))
}

/// Build the module graph described by `cfg` over any filesystem and analyzer.
pub fn build_graph_with(
    cfg: &Config,
    fs: Arc<dyn FileSystem>,
    analyzer: Arc<dyn ModuleAnalyzer>,
) -> BundleResult<Graph> {
    debug!("Config: entry={:?}, mode={:?}, extensions={:?}", cfg.entry, cfg.mode(), cfg.extensions);
    let resolver = Resolver::with_extensions(fs.clone(), cfg.extensions.clone());
    let loader = AssetLoader::new(fs, resolver, analyzer, cfg.mode());
    GraphBuilder::new(loader).parallel(cfg.parallel).build(&cfg.entry)
}

pub fn run_bundle(cfg: &Config) -> Result<BundleOutput> {
    info!("Starting bundle of {}", cfg.entry.display());

    let graph = build_graph(cfg)
        .with_context(|| format!("Failed to bundle {}", cfg.entry.display()))?;

    let placeholders = graph.placeholders().count();
    if placeholders > 0 {
        warn!("{} modules could not be loaded and are bundled as empty modules", placeholders);
    }

    let code = emit(&graph);
    info!("Bundle complete: {} modules, {} bytes", graph.len(), code.len());
    Ok(BundleOutput { code, graph })
}
