use std::{io, path::PathBuf};

use thiserror::Error;

/// A reference that designates no file, with every candidate that was probed.
#[derive(Debug, Clone, Error)]
#[error("cannot resolve '{}' (tried {})", .reference.display(), tried_list(.tried))]
pub struct UnresolvedModule {
    pub reference: PathBuf,
    pub tried: Vec<PathBuf>,
}

fn tried_list(tried: &[PathBuf]) -> String {
    if tried.is_empty() {
        return "nothing".to_string();
    }
    tried.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
}

/// The analyzer could not produce specifiers and a body for a module.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AnalysisError {
    pub message: String,
}

impl AnalysisError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Build failures surfaced to the caller.
///
/// In lenient mode only the entry-level variants (`EntryNotFound`, `Io`)
/// escape a build; the dependency-level variants are returned only in
/// strict mode.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("entry point not found: {}", .0.reference.display())]
    EntryNotFound(#[source] UnresolvedModule),

    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("'{specifier}' imported from {} does not resolve", .importer.display())]
    UnresolvedDependency {
        specifier: String,
        importer: PathBuf,
        #[source]
        source: UnresolvedModule,
    },

    #[error("failed to read dependency {}", .path.display())]
    DependencyUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to analyze {}", .path.display())]
    AnalysisFailed {
        path: PathBuf,
        #[source]
        source: AnalysisError,
    },
}

pub type BundleResult<T> = std::result::Result<T, BundleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_lists_candidates() {
        let err = UnresolvedModule {
            reference: PathBuf::from("/src/missing"),
            tried: vec![PathBuf::from("/src/missing.js"), PathBuf::from("/src/missing.jsx")],
        };
        assert_eq!(
            err.to_string(),
            "cannot resolve '/src/missing' (tried /src/missing.js, /src/missing.jsx)"
        );
    }

    #[test]
    fn test_entry_not_found_keeps_source() {
        let err = BundleError::EntryNotFound(UnresolvedModule {
            reference: PathBuf::from("main"),
            tried: vec![],
        });
        assert_eq!(err.to_string(), "entry point not found: main");
        assert!(std::error::Error::source(&err).is_some());
    }
}
