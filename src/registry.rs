//! Project registry (C4): the process-wide store of [`FileIndex`]es plus
//! the cross-file lookup tables C5/C6/C7 query against — an exports table
//! per file (with wildcard re-exports transitively unioned in), a
//! class-by-qualified-name table, a constructor-to-class map, and a
//! project-wide qualified-name index used both generally and as the Rust
//! `use`-free fast path described in [`crate::parsing::rust_profile`].

use crate::file_index::FileIndex;
use crate::module_path;
use crate::parsing::Language;
use crate::symbol::{Definition, DefinitionKind};
use crate::types::{FilePath, SymbolId};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;

/// Single-writer/multi-reader store (§5). Mutation takes `&self` via an
/// interior lock so an `Arc<ProjectRegistry>` can be shared by the engine
/// without an outer lock of its own.
#[derive(Default)]
pub struct ProjectRegistry {
    files: RwLock<HashMap<FilePath, Arc<FileIndex>>>,
}

impl ProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// §4.4 `upsert_file`: replace (or insert) one file's index.
    pub fn upsert_file(&self, index: FileIndex) {
        let path = index.file_path.clone();
        crate::debug_event!(
            "registry",
            "upsert_file",
            "{} ({} defs, {} refs)",
            path,
            index.defs.len(),
            index.refs.len()
        );
        self.files.write().insert(path, Arc::new(index));
    }

    /// §4.4 `remove_file`.
    pub fn remove_file(&self, path: &str) -> bool {
        self.files.write().remove(path).is_some()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.read().contains_key(path)
    }

    /// Direct single-file lookup (§6 `get_index_single_file`), bypassing
    /// snapshot construction since it needs none of the cross-file tables.
    pub fn file(&self, path: &str) -> Option<Arc<FileIndex>> {
        self.files.read().get(path).cloned()
    }

    pub fn file_count(&self) -> usize {
        self.files.read().len()
    }

    pub fn file_fingerprint(&self, path: &str) -> Option<u64> {
        self.files.read().get(path).map(|f| f.source_fingerprint)
    }

    /// An immutable point-in-time view for resolution and call-graph work
    /// (§4.4 "all snapshots are immutable views"). Building one clones only
    /// `Arc` handles to existing `FileIndex`es, not the indices themselves.
    pub fn snapshot(&self) -> ProjectSnapshot {
        let files = self.files.read().clone();
        ProjectSnapshot::build(files)
    }

    pub fn clear(&self) {
        self.files.write().clear();
    }
}

/// A consistent read-only view of every indexed file plus the derived
/// cross-file tables §3/§4.4 describe. Constructed once per query burst so
/// C5/C6/C7 never observe a registry mutation mid-resolution.
pub struct ProjectSnapshot {
    files: HashMap<FilePath, Arc<FileIndex>>,
    known_files: HashSet<FilePath>,
    exports_by_file: HashMap<FilePath, HashMap<Box<str>, SymbolId>>,
    /// Class/interface/enum qualified name -> definitions sharing it. More
    /// than one entry only happens under TS declaration merging (§9 (b)).
    class_by_qualified_name: HashMap<Box<str>, Vec<SymbolId>>,
    /// Class/interface/enum bare name -> definitions sharing it, used for
    /// superclass-name and type-hint-name lookups, which are never
    /// qualified (§4.6).
    class_by_bare_name: HashMap<Box<str>, Vec<SymbolId>>,
    /// Every definition's qualified name -> definitions sharing it,
    /// project-wide. The Rust `use`-free fast path (`m::g()` with no
    /// import binding for `m`) looks callees up here directly.
    qualified_name_index: HashMap<Box<str>, Vec<SymbolId>>,
    constructor_to_class: HashMap<SymbolId, SymbolId>,
}

impl ProjectSnapshot {
    fn build(files: HashMap<FilePath, Arc<FileIndex>>) -> Self {
        let known_files: HashSet<FilePath> = files.keys().cloned().collect();

        let mut class_by_qualified_name: HashMap<Box<str>, Vec<SymbolId>> = HashMap::new();
        let mut class_by_bare_name: HashMap<Box<str>, Vec<SymbolId>> = HashMap::new();
        let mut qualified_name_index: HashMap<Box<str>, Vec<SymbolId>> = HashMap::new();
        let mut constructor_to_class: HashMap<SymbolId, SymbolId> = HashMap::new();

        for index in files.values() {
            for def in &index.defs {
                qualified_name_index
                    .entry(def.id.qualified_name().into())
                    .or_default()
                    .push(def.id.clone());

                if matches!(
                    def.kind,
                    DefinitionKind::Class | DefinitionKind::Interface | DefinitionKind::Enum
                ) {
                    class_by_qualified_name
                        .entry(def.id.qualified_name().into())
                        .or_default()
                        .push(def.id.clone());
                    class_by_bare_name
                        .entry(def.name.clone())
                        .or_default()
                        .push(def.id.clone());
                }

                if def.kind == DefinitionKind::Constructor {
                    if let Some(owner) = &def.data.owner_class {
                        constructor_to_class.insert(def.id.clone(), owner.clone());
                    }
                }
            }
        }

        let mut exports_by_file = HashMap::new();
        for path in files.keys() {
            let mut visited = HashSet::new();
            let table = resolve_exports(path, &files, &known_files, &mut visited);
            exports_by_file.insert(path.clone(), table);
        }

        Self {
            files,
            known_files,
            exports_by_file,
            class_by_qualified_name,
            class_by_bare_name,
            qualified_name_index,
            constructor_to_class,
        }
    }

    pub fn files(&self) -> impl Iterator<Item = (&FilePath, &Arc<FileIndex>)> {
        self.files.iter()
    }

    pub fn file(&self, path: &str) -> Option<&Arc<FileIndex>> {
        self.files.get(path)
    }

    pub fn exports_of(&self, path: &str) -> Option<&HashMap<Box<str>, SymbolId>> {
        self.exports_by_file.get(path)
    }

    pub fn class_by_qualified_name(&self, qualified_name: &str) -> &[SymbolId] {
        self.class_by_qualified_name
            .get(qualified_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn class_by_bare_name(&self, name: &str) -> &[SymbolId] {
        self.class_by_bare_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn qualified_name(&self, qualified_name: &str) -> &[SymbolId] {
        self.qualified_name_index
            .get(qualified_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn constructor_to_class(&self) -> &HashMap<SymbolId, SymbolId> {
        &self.constructor_to_class
    }

    pub fn definition(&self, id: &SymbolId) -> Option<&Definition> {
        self.files.get(id.file_path())?.definition(id)
    }

    /// Resolve an import/re-export module string to the file it points at.
    /// Only meaningful for TS/JS/Python; Rust imports are resolved directly
    /// against [`Self::resolve_rust_qualified_path`] instead, since a Rust
    /// `source_module` already names a qualified item, not a file.
    pub fn resolve_import_file(&self, from_path: &str, module: &str, language: Language) -> Option<FilePath> {
        match language {
            Language::TypeScript | Language::JavaScript => {
                module_path::resolve_ts_js_module(from_path, module, &self.known_files)
            }
            Language::Python => module_path::resolve_python_module(module, &self.known_files),
            Language::Rust => None,
        }
    }

    /// Rust `use`-free qualified-path fast path (§9, `qualify_free_name`):
    /// an import's `source_module`, or a bare `m::g` call with no import at
    /// all, already holds the callee's qualified path modulo a leading
    /// `crate::`/`self::`/`super::`; strip that and look the remainder up
    /// directly.
    pub fn resolve_rust_qualified_path(&self, path: &str) -> &[SymbolId] {
        let stripped = path
            .strip_prefix("crate::")
            .or_else(|| path.strip_prefix("self::"))
            .or_else(|| path.strip_prefix("super::"))
            .unwrap_or(path);
        self.qualified_name(stripped)
    }
}

/// Builds one file's exported-name -> `SymbolId` table, transitively
/// unioning in wildcard re-exports (`export * from './other'`) with a
/// per-root-call `visited` guard so re-export cycles terminate (§14
/// "Wildcard re-export cycle guard").
fn resolve_exports(
    path: &FilePath,
    files: &HashMap<FilePath, Arc<FileIndex>>,
    known_files: &HashSet<FilePath>,
    visited: &mut HashSet<FilePath>,
) -> HashMap<Box<str>, SymbolId> {
    let mut table = HashMap::new();
    if !visited.insert(path.clone()) {
        return table;
    }
    let Some(index) = files.get(path) else {
        return table;
    };

    for export in &index.exports {
        if export.is_reexport() {
            let Some(source_module) = &export.source_module else {
                continue;
            };
            let Some(target_path) = resolve_export_source(index.language, path, source_module, known_files) else {
                warn!(
                    "registry: unresolved re-export source '{}' from '{}'",
                    source_module, path
                );
                continue;
            };
            if export.exported_name.as_ref() == "*" {
                let nested = resolve_exports(&target_path, files, known_files, visited);
                table.extend(nested);
            } else {
                let nested = resolve_exports(&target_path, files, known_files, visited);
                if let Some(symbol) = nested.get(export.exported_name.as_ref()) {
                    table.insert(export.exported_name.clone(), symbol.clone());
                } else if let Some(local) = files
                    .get(&target_path)
                    .and_then(|i| i.export(&export.exported_name))
                    .and_then(|e| e.local_symbol_id.clone())
                {
                    table.insert(export.exported_name.clone(), local);
                }
            }
        } else if let Some(symbol) = &export.local_symbol_id {
            table.insert(export.exported_name.clone(), symbol.clone());
        }
    }
    table
}

fn resolve_export_source(
    language: Language,
    from_path: &FilePath,
    module: &str,
    known_files: &HashSet<FilePath>,
) -> Option<FilePath> {
    match language {
        Language::TypeScript | Language::JavaScript => {
            module_path::resolve_ts_js_module(from_path, module, known_files)
        }
        Language::Python => module_path::resolve_python_module(module, known_files),
        Language::Rust => None,
    }
}
