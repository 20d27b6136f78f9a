use clap::Parser;
use std::path::PathBuf;

use oxipack_core::Mode;

#[derive(Debug, Clone, Parser)]
#[command(name = "bundle")]
#[command(about = "Bundle a JavaScript entry module and its relative imports into one script")]
pub struct Config {
    /// Entry module: a file, a path without extension, or a directory with an index file
    pub entry: PathBuf,

    /// Write the bundle to this file instead of stdout
    #[arg(long, short)]
    pub out: Option<PathBuf>,

    /// Fail the build when any dependency cannot be resolved, read or parsed
    #[arg(long)]
    pub strict: bool,

    /// Read and parse each breadth-first layer of modules on the rayon thread pool
    #[arg(long)]
    pub parallel: bool,

    /// Extensions to try for references without one, in priority order
    #[arg(long, value_delimiter = ',', default_values = ["js", "jsx", "mjs", "cjs"])]
    pub extensions: Vec<String>,

    /// Also write the module graph as JSON to this file
    #[arg(long)]
    pub graph: Option<PathBuf>,
}

impl Config {
    /// Defaults for bundling `entry`: lenient, sequential, default extensions.
    pub fn new(entry: impl Into<PathBuf>) -> Self {
        Self {
            entry: entry.into(),
            out: None,
            strict: false,
            parallel: false,
            extensions: oxipack_core::DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            graph: None,
        }
    }

    pub fn mode(&self) -> Mode {
        if self.strict { Mode::Strict } else { Mode::Lenient }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_extensions_match_core() {
        let cfg = Config::try_parse_from(["bundle", "src/index.js"]).unwrap();
        assert_eq!(cfg.extensions, oxipack_core::DEFAULT_EXTENSIONS);
        assert_eq!(cfg.extensions, Config::new("src/index.js").extensions);
    }

    #[test]
    fn test_parse_flags() {
        let cfg = Config::try_parse_from([
            "bundle",
            "src",
            "--out",
            "dist/bundle.js",
            "--strict",
            "--parallel",
            "--extensions",
            "js,es6",
        ])
        .unwrap();
        assert_eq!(cfg.entry, PathBuf::from("src"));
        assert_eq!(cfg.out, Some(PathBuf::from("dist/bundle.js")));
        assert_eq!(cfg.mode(), Mode::Strict);
        assert!(cfg.parallel);
        assert_eq!(cfg.extensions, vec!["js", "es6"]);
    }

    #[test]
    fn test_lenient_by_default() {
        assert_eq!(Config::new("a.js").mode(), Mode::Lenient);
    }
}
