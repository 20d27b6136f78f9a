//! Core building blocks for oxipack.
//!
//! This crate provides everything needed to turn one JavaScript module into
//! a bundle-ready asset:
//! - A filesystem abstraction with an OS and an in-memory implementation
//! - Resolving relative module references (extension inference, index files)
//! - Analyzing modules with oxc: import specifiers plus a lowered body
//! - Loading assets with a lenient or strict failure policy

mod analyzer;
mod constants;
mod error;
mod fs;
mod loader;
mod parser;
mod resolver;
mod types;

// Re-export public API
pub use analyzer::{Analysis, ModuleAnalyzer, js_string};
pub use constants::{DEFAULT_EXTENSIONS, INDEX_STEM};
pub use error::{AnalysisError, BundleError, BundleResult, UnresolvedModule};
pub use fs::{FileSystem, MemoryFileSystem, OsFileSystem};
pub use loader::AssetLoader;
pub use parser::OxcAnalyzer;
pub use resolver::{Resolution, Resolver};
pub use types::{Asset, AssetId, Mode};
