use std::path::Path;

use crate::error::AnalysisError;

/// What the analyzer extracts from one module's source text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Analysis {
    /// Import specifiers in first-occurrence order, without duplicates.
    pub specifiers: Vec<String>,
    /// Function-scoped body using `require`, `module` and `exports`.
    pub body: String,
}

/// Turns module source text into import specifiers and an executable body.
///
/// The graph builder never looks at syntax; everything it knows about a
/// module comes through this trait, so tests can script analyses directly.
pub trait ModuleAnalyzer: Send + Sync {
    fn analyze(&self, path: &Path, source: &str) -> Result<Analysis, AnalysisError>;
}

/// Quote `s` as a JavaScript string literal.
pub fn js_string(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}
