//! Executes emitted bundles with `node` and compares what they print.
//!
//! Each test returns early when `node` is not on `PATH`.

use oxipack_bundler::{Config, build_bundle, run_bundle};
use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};
use tempfile::TempDir;

fn create_test_file(dir: &Path, path: &str, content: &str) -> PathBuf {
    let file_path = dir.join(path);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(&file_path, content).expect("Failed to write test file");
    file_path
}

fn node_available() -> bool {
    let found = Command::new("node").arg("--version").output().is_ok_and(|o| o.status.success());
    if !found {
        eprintln!("node not found on PATH, skipping");
    }
    found
}

fn run_node(dir: &Path, code: &str) -> Output {
    let bundle = dir.join("out").join("bundle.cjs");
    fs::create_dir_all(bundle.parent().unwrap()).unwrap();
    fs::write(&bundle, code).unwrap();
    Command::new("node").arg(&bundle).output().expect("Failed to run node")
}

fn stdout_of(dir: &Path, entry: &Path) -> String {
    let code = build_bundle(entry).unwrap();
    let output = run_node(dir, &code);
    assert!(
        output.status.success(),
        "bundle failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

#[test]
fn test_named_import_evaluates() {
    if !node_available() {
        return;
    }
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let entry = create_test_file(root, "a.js", "import { x } from './b';\nconsole.log(x + 1);\n");
    create_test_file(root, "b.js", "export const x = 1;\n");

    assert_eq!(stdout_of(root, &entry), "2");
}

#[test]
fn test_shared_module_runs_once() {
    if !node_available() {
        return;
    }
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let entry = create_test_file(
        root,
        "index.js",
        "import { one } from './a';\nimport { two } from './b';\nconsole.log(globalThis.loads, one, two);\n",
    );
    create_test_file(root, "a.js", "import { n } from './counter';\nexport const one = n;\n");
    create_test_file(root, "b.js", "import { n } from './counter';\nexport const two = n + 1;\n");
    create_test_file(
        root,
        "counter.js",
        "globalThis.loads = (globalThis.loads || 0) + 1;\nexport const n = 1;\n",
    );

    assert_eq!(stdout_of(root, &entry), "1 1 2");
}

#[test]
fn test_cyclic_imports_run() {
    if !node_available() {
        return;
    }
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let entry = create_test_file(
        root,
        "a.js",
        "import { b } from './b';\nexport function a() { return 'a'; }\nconsole.log(b());\n",
    );
    create_test_file(
        root,
        "b.js",
        "import { a } from './a';\nexport function b() { return 'b' + a(); }\n",
    );

    assert_eq!(stdout_of(root, &entry), "ba");
}

#[test]
fn test_default_and_star_exports() {
    if !node_available() {
        return;
    }
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let entry = create_test_file(
        root,
        "src/index.js",
        "import name, { add } from './lib';\nimport * as lib from './lib';\nconsole.log(name, add(1, 2), typeof lib.add);\n",
    );
    create_test_file(root, "src/lib/index.js", "export * from './math';\nexport default 'lib';\n");
    create_test_file(root, "src/lib/math.js", "export const add = (a, b) => a + b;\n");

    assert_eq!(stdout_of(root, &entry), "lib 3 function");
}

#[test]
fn test_commonjs_dependency() {
    if !node_available() {
        return;
    }
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let entry = create_test_file(
        root,
        "main.js",
        "import greet from './greet.cjs';\nconst { shout } = require('./shout');\nconsole.log(shout(greet('x')));\n",
    );
    create_test_file(root, "greet.cjs", "module.exports = function (n) { return 'hi ' + n; };\n");
    create_test_file(root, "shout.js", "exports.shout = (s) => s.toUpperCase();\n");

    assert_eq!(stdout_of(root, &entry), "HI X");
}

#[test]
fn test_imported_bindings_are_live() {
    if !node_available() {
        return;
    }
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let entry = create_test_file(
        root,
        "a.js",
        "import { count, inc } from './b';\nimport * as b from './b';\ninc();\ninc();\nconsole.log(count, b.count);\n",
    );
    create_test_file(root, "b.js", "export let count = 0;\nexport function inc() { count++; }\n");

    assert_eq!(stdout_of(root, &entry), "2 2");
}

#[test]
fn test_missing_dependency_throws_only_when_used() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let entry = create_test_file(
        root,
        "a.js",
        "import { f } from './missing';\n\
         export const g = () => f();\n\
         console.log('entry ran');\n\
         try { g(); } catch (e) { console.log('g threw'); }\n",
    );

    // the build itself succeeds
    let output = run_bundle(&Config::new(&entry)).unwrap();
    assert_eq!(output.graph.len(), 2);
    assert!(output.graph.get(1).unwrap().is_placeholder());

    if !node_available() {
        return;
    }
    let result = run_node(root, &output.code);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));
    assert_eq!(String::from_utf8_lossy(&result.stdout).trim(), "entry ran\ng threw");
}
