use log::{debug, warn};

use oxipack_core::{Asset, js_string};

use crate::graph::Graph;

const RUNTIME_HEAD: &str = r#"(function (modules) {
  var cache = {};

  function require(id) {
    if (Object.prototype.hasOwnProperty.call(cache, id)) {
      return cache[id].exports;
    }

    var fn = modules[id][0];
    var mapping = modules[id][1];

    function localRequire(name) {
      if (!Object.prototype.hasOwnProperty.call(mapping, name)) {
        throw new Error("Cannot find module '" + name + "'");
      }
      return require(mapping[name]);
    }

    var module = { exports: {} };
    cache[id] = module;
    try {
      fn(localRequire, module, module.exports);
    } catch (e) {
      delete cache[id];
      throw e;
    }
    return module.exports;
  }

  return require(0);
})({
"#;

const RUNTIME_TAIL: &str = "});\n";

/// Serialize `graph` into one self-contained script.
///
/// The output depends on nothing but the graph: rows are written in id
/// order and mappings in key order.
pub fn emit(graph: &Graph) -> String {
    debug!("Emitting bundle with {} modules", graph.len());
    let mut out = String::from(RUNTIME_HEAD);
    for asset in graph.assets() {
        out.push_str(&module_row(asset));
    }
    out.push_str(RUNTIME_TAIL);
    out
}

fn module_row(asset: &Asset) -> String {
    let mapping = asset
        .mapping
        .iter()
        .map(|(specifier, id)| format!("{}: {}", js_string(specifier), id))
        .collect::<Vec<_>>()
        .join(", ");

    // placeholders keep their empty body, so requiring one yields `{}`
    let label = match &asset.failure {
        Some(reason) => {
            warn!("Emitting {} as an empty module: {}", asset.resolved_path.display(), reason);
            format!("{} (empty: {})", asset.resolved_path.display(), reason)
        }
        None => asset.resolved_path.display().to_string(),
    };

    // the body sits on its own lines so a trailing line comment cannot swallow the closing brace
    format!(
        "// {}: {}\n{}: [function (require, module, exports) {{\n{}\n}}, {{{}}}],\n",
        asset.id,
        single_line(&label),
        asset.id,
        asset.body,
        mapping
    )
}

/// Replace every JavaScript line terminator so `text` stays inside a `//` comment.
fn single_line(text: &str) -> String {
    text.replace(['\n', '\r', '\u{2028}', '\u{2029}'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxipack_core::{AssetLoader, FileSystem, MemoryFileSystem, Mode, OxcAnalyzer, Resolver};
    use std::{path::Path, sync::Arc};

    use crate::graph::GraphBuilder;

    fn graph(fs: MemoryFileSystem, entry: &str) -> Graph {
        let fs: Arc<dyn FileSystem> = Arc::new(fs);
        let loader =
            AssetLoader::new(fs.clone(), Resolver::new(fs), Arc::new(OxcAnalyzer), Mode::Lenient);
        GraphBuilder::new(loader).build(Path::new(entry)).unwrap()
    }

    fn two_modules() -> MemoryFileSystem {
        MemoryFileSystem::new()
            .with_file("/app/a.js", "import { x } from './b';\nconsole.log(x + 1);\n")
            .with_file("/app/b.js", "export const x = 1;\n")
    }

    #[test]
    fn test_emit_contains_rows_in_id_order() {
        let code = emit(&graph(two_modules(), "/app/a.js"));
        let first = code.find("0: [function (require, module, exports) {").unwrap();
        let second = code.find("1: [function (require, module, exports) {").unwrap();
        assert!(first < second);
        assert!(code.contains("// 0: /app/a.js"));
        assert!(code.contains("// 1: /app/b.js"));
        assert!(code.contains(r#"}, {"./b": 1}],"#));
        assert!(code.contains("}, {}],"));
    }

    #[test]
    fn test_emit_starts_at_entry() {
        let code = emit(&graph(two_modules(), "/app/a.js"));
        assert!(code.starts_with("(function (modules) {"));
        assert!(code.contains("return require(0);"));
        assert!(code.ends_with("});\n"));
    }

    #[test]
    fn test_emit_caches_module_records() {
        let code = emit(&graph(two_modules(), "/app/a.js"));
        assert!(code.contains("cache[id] = module;"));
        assert!(code.contains("return cache[id].exports;"));
    }

    #[test]
    fn test_emit_placeholder_is_empty_module() {
        let fs = MemoryFileSystem::new().with_file("/app/a.js", "import './missing';\n");
        let code = emit(&graph(fs, "/app/a.js"));
        assert!(code.contains("// 1: /app/missing (empty: cannot resolve"));
        assert!(code.contains("1: [function (require, module, exports) {\n\n}, {}],"));
        assert!(!code.contains("throw new Error(\"Cannot load module"));
    }

    #[test]
    fn test_label_has_no_line_terminators() {
        assert_eq!(single_line("a\nb\rc\u{2028}d\u{2029}e"), "a b c d e");

        let fs = MemoryFileSystem::new()
            .with_file("/app/a.js", "import './odd\u{2028}name';\n")
            .with_file("/app/odd\u{2028}name.js", "");
        let code = emit(&graph(fs, "/app/a.js"));
        assert!(code.contains("// 1: /app/odd name.js\n"));
        let comments: Vec<&str> = code.lines().filter(|l| l.starts_with("// ")).collect();
        assert!(comments.iter().all(|l| !l.contains('\u{2028}')));
    }

    #[test]
    fn test_emit_is_deterministic() {
        let first = emit(&graph(two_modules(), "/app/a.js"));
        let second = emit(&graph(two_modules(), "/app/a.js"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_body_ending_in_line_comment() {
        let fs = MemoryFileSystem::new().with_file("/app/a.js", "var a = 1; // trailing");
        let code = emit(&graph(fs, "/app/a.js"));
        assert!(code.contains("var a = 1; // trailing\n}, {}],"));
    }

    #[test]
    fn test_mapping_keys_are_quoted() {
        let fs = MemoryFileSystem::new()
            .with_file("/app/a.js", "import { y } from \"./it's\";\nimport { x } from './b';\n")
            .with_file("/app/it's.js", "export const y = 1;")
            .with_file("/app/b.js", "export const x = 1;");
        let code = emit(&graph(fs, "/app/a.js"));
        assert!(code.contains(r#"{"./b": 2, "./it's": 1}"#));
    }
}
