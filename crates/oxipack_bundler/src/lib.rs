//! Single-file bundling for JavaScript module trees.
//!
//! Starting from an entry module, this crate discovers every module reachable
//! through relative imports, gives each a stable id (the entry is 0), and
//! emits one script that carries its own `require` runtime.
//!
//! # Examples
//!
//! ## Basic Usage
//!
//! ```no_run
//! use oxipack_bundler::{Config, run_bundle};
//! use std::io::{BufWriter, Write};
//!
//! # fn main() -> anyhow::Result<()> {
//! let cfg = Config::new("src/index.js");
//! let output = run_bundle(&cfg)?;
//!
//! // Use buffered output for better performance
//! let mut stdout = BufWriter::new(std::io::stdout());
//! stdout.write_all(output.code.as_bytes())?;
//! stdout.flush()?;
//! # Ok(())
//! # }
//! ```

mod bundler;
mod config;
mod emitter;
mod graph;
mod reporter;

// Re-export public API
pub use bundler::{BundleOutput, build_bundle, build_graph, build_graph_with, run_bundle};
pub use config::Config;
pub use emitter::emit;
pub use graph::{Graph, GraphBuilder};
pub use reporter::print_summary;
