//! Module-to-file resolution for import redirection (used by C4's export
//! table construction and C5/C6's import-binding redirection).
//!
//! TS/JS imports are relative-path specifiers resolved against the
//! importing file's directory; Python imports are dotted module paths
//! resolved by converting dots to path segments and trying both a plain
//! module file and a package `__init__`. Rust needs neither of these — a
//! `use` import's `source_module` already holds the target's qualified
//! name (see [`crate::parsing::rust_profile`]'s `qualify_free_name`),
//! resolved directly against the registry's qualified-name index instead
//! of a file path.

use crate::types::FilePath;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

const TS_JS_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];

/// Resolve a TS/JS import specifier to a file known to the registry. Only
/// relative specifiers (`./x`, `../x`) are resolvable here; bare package
/// specifiers (`react`, `lodash/fp`) name a dependency outside the indexed
/// project and are always external.
pub fn resolve_ts_js_module(
    importing_file: &str,
    specifier: &str,
    known_files: &HashSet<FilePath>,
) -> Option<FilePath> {
    if !(specifier.starts_with("./") || specifier.starts_with("../")) {
        return None;
    }
    let base = Path::new(importing_file)
        .parent()
        .unwrap_or_else(|| Path::new(""));
    let joined = normalize(&base.join(specifier));

    for ext in TS_JS_EXTENSIONS {
        let candidate = format!("{}.{ext}", joined.display());
        if let Some(found) = find_exact(&candidate, known_files) {
            return Some(found);
        }
    }
    for ext in TS_JS_EXTENSIONS {
        let candidate = joined.join(format!("index.{ext}"));
        if let Some(found) = find_exact(&candidate.to_string_lossy(), known_files) {
            return Some(found);
        }
    }
    find_exact(&joined.to_string_lossy(), known_files)
}

/// Resolve a Python dotted module path (`from pkg.sub import x` names
/// module `pkg.sub`) to a file known to the registry: a plain module file
/// first, then a package `__init__`.
pub fn resolve_python_module(module: &str, known_files: &HashSet<FilePath>) -> Option<FilePath> {
    if module.is_empty() {
        return None;
    }
    let as_path = module.replace('.', "/");
    find_suffix(&format!("{as_path}.py"), known_files)
        .or_else(|| find_suffix(&format!("{as_path}/__init__.py"), known_files))
}

/// Lexically collapse `.`/`..` components without touching the filesystem
/// (the paths here are workspace-relative strings, not real paths to stat).
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn find_exact(candidate: &str, known_files: &HashSet<FilePath>) -> Option<FilePath> {
    known_files.iter().find(|f| f.as_ref() == candidate).cloned()
}

/// Known file paths are workspace-relative but a dotted Python module name
/// rarely names the true source root, so this matches by path suffix
/// rather than requiring an exact match.
fn find_suffix(suffix: &str, known_files: &HashSet<FilePath>) -> Option<FilePath> {
    known_files
        .iter()
        .find(|f| f.as_ref() == suffix || f.as_ref().ends_with(&format!("/{suffix}")))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::file_path;

    fn set(paths: &[&str]) -> HashSet<FilePath> {
        paths.iter().map(|p| file_path(*p)).collect()
    }

    #[test]
    fn resolves_relative_ts_import_with_extension_candidates() {
        let known = set(&["src/a.ts", "src/b.ts"]);
        let resolved = resolve_ts_js_module("src/b.ts", "./a", &known);
        assert_eq!(resolved.as_deref(), Some("src/a.ts"));
    }

    #[test]
    fn resolves_relative_import_up_a_directory() {
        let known = set(&["a.ts", "sub/b.ts"]);
        let resolved = resolve_ts_js_module("sub/b.ts", "../a", &known);
        assert_eq!(resolved.as_deref(), Some("a.ts"));
    }

    #[test]
    fn bare_specifiers_are_never_resolved() {
        let known = set(&["node_modules/react/index.js"]);
        assert_eq!(resolve_ts_js_module("src/a.ts", "react", &known), None);
    }

    #[test]
    fn resolves_python_submodule_over_package_init() {
        let known = set(&["pkg/__init__.py", "pkg/sub.py"]);
        assert_eq!(
            resolve_python_module("pkg.sub", &known).as_deref(),
            Some("pkg/sub.py")
        );
    }

    #[test]
    fn resolves_python_package_via_init() {
        let known = set(&["pkg/__init__.py", "pkg/sub/__init__.py"]);
        assert_eq!(
            resolve_python_module("pkg.sub", &known).as_deref(),
            Some("pkg/sub/__init__.py")
        );
    }
}
