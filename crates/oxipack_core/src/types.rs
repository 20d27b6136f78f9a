use serde::Serialize;
use std::{collections::BTreeMap, path::PathBuf};

/// Position of an asset in the graph; the entry is always 0.
pub type AssetId = usize;

/// One compiled module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Asset {
    pub id: AssetId,
    pub resolved_path: PathBuf,
    pub specifiers: Vec<String>,
    #[serde(skip)]
    pub body: String,
    /// Specifier as written → id of the asset it resolves to.
    pub mapping: BTreeMap<String, AssetId>,
    /// Why this asset is an empty placeholder, if it is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl Asset {
    pub fn new(id: AssetId, resolved_path: PathBuf, specifiers: Vec<String>, body: String) -> Self {
        Self { id, resolved_path, specifiers, body, mapping: BTreeMap::new(), failure: None }
    }

    /// An asset with no dependencies and no code, standing in for a module
    /// that could not be resolved, read or analyzed.
    pub fn placeholder(id: AssetId, resolved_path: PathBuf, reason: impl Into<String>) -> Self {
        Self {
            id,
            resolved_path,
            specifiers: Vec::new(),
            body: String::new(),
            mapping: BTreeMap::new(),
            failure: Some(reason.into()),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.failure.is_some()
    }
}

/// How dependency-level failures are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Replace broken dependencies with placeholder assets and keep building.
    #[default]
    Lenient,
    /// Fail the build on the first broken dependency.
    Strict,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_is_empty() {
        let asset = Asset::placeholder(3, PathBuf::from("/src/missing"), "not found");
        assert_eq!(asset.id, 3);
        assert!(asset.is_placeholder());
        assert!(asset.specifiers.is_empty());
        assert!(asset.body.is_empty());
        assert!(asset.mapping.is_empty());
    }

    #[test]
    fn test_serialize_skips_body() {
        let mut asset = Asset::new(0, PathBuf::from("/src/a.js"), vec!["./b".into()], "code".into());
        asset.mapping.insert("./b".into(), 1);
        let json = serde_json::to_value(&asset).unwrap();
        assert_eq!(json["id"], 0);
        assert_eq!(json["mapping"]["./b"], 1);
        assert!(json.get("body").is_none());
        assert!(json.get("failure").is_none());
    }
}
