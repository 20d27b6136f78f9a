//! Constants for file extensions and resolution strategies.
//!
//! Extension handling lives here so the resolver, the analyzer and the CLI
//! agree on what counts as a module file.
//!
//! ## Module System Extensions
//!
//! - `.js` and `.jsx`: parsed as ES modules (JSX enabled for `.jsx`)
//! - `.mjs`: ES module
//! - `.cjs`: CommonJS, parsed with the script goal

/// Extensions probed when a reference has no recognized extension (in priority order)
pub const DEFAULT_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs"];

/// File stem substituted when a reference names a directory
pub const INDEX_STEM: &str = "index";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_is_probed_first() {
        // Directory references must land on index.js before any other index file
        assert_eq!(DEFAULT_EXTENSIONS.first(), Some(&"js"));
    }

    #[test]
    fn test_default_extensions_are_unique() {
        for (i, ext) in DEFAULT_EXTENSIONS.iter().enumerate() {
            assert!(
                !DEFAULT_EXTENSIONS[i + 1..].contains(ext),
                "DEFAULT_EXTENSIONS lists '{}' twice",
                ext
            );
        }
    }

    #[test]
    fn test_extensions_have_no_leading_dot() {
        for ext in DEFAULT_EXTENSIONS {
            assert!(!ext.starts_with('.'));
        }
    }
}
