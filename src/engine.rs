//! Engine facade (C8, §6): the single public entry point the rest of the
//! world talks to. Wires the project registry (C4), single-file indexer
//! (C3), resolver (C5/C6), and call-graph assembler (C7) behind the
//! `initialize`/`update_file`/`remove_file`/`get_*` surface §6 specifies,
//! and implements the incremental coordinator: a dirty set of changed
//! files gates whether the next `get_call_graph`/`get_stats` call rebuilds
//! its cached snapshot or returns the one already built.
//!
//! The coordinator rebuilds the *whole* snapshot and call graph on any
//! dirty file rather than re-resolving only the reverse-index slice §4.8
//! sketches as an option — see DESIGN.md's open-question note on this;
//! resolution over a snapshot is cheap next to parsing, so the simpler
//! all-or-nothing rebuild still satisfies "the next call-graph request
//! after a mutation reflects all applied mutations" without a second
//! index to keep consistent.

use crate::config::Settings;
use crate::error::{IndexError, IndexResult};
use crate::file_index::FileIndex;
use crate::imports::Import;
use crate::indexing::SingleFileIndexer;
use crate::parsing::{node_location, profile_for, Language};
use crate::reference::Reference;
use crate::registry::{ProjectRegistry, ProjectSnapshot};
use crate::resolver::{self, ResolutionOutcome};
use crate::scope::ScopeTree;
use crate::symbol::Definition;
use crate::types::{file_path, FilePath, Location, SymbolId};
use crate::{callgraph::CallGraph, logging};
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// §6 `get_stats()`, extended non-breaking per §14 with `partial_file_count`
/// and `unresolved_reference_count`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    pub file_count: usize,
    pub definition_count: usize,
    pub reference_count: usize,
    pub partial_file_count: usize,
    pub unresolved_reference_count: usize,
}

/// §6 `get_source_with_context`'s return shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceContext {
    pub source: String,
    pub docstring: Option<Box<str>>,
    pub decorators: Option<Vec<Box<str>>>,
}

struct QueryCache {
    snapshot: Arc<ProjectSnapshot>,
    call_graph: Arc<CallGraph>,
}

/// The project object consumers hold (§1 "an opaque, incrementally
/// updatable project object"). Cheap to clone — every field is an `Arc`
/// or a lock around shared state — so a hosting service can share one
/// `Engine` across threads without wrapping it itself.
pub struct Engine {
    settings: Settings,
    registry: Arc<ProjectRegistry>,
    indexer: SingleFileIndexer,
    /// Raw source text per file, keyed the same way the registry keys
    /// `FileIndex`es. Kept here rather than inside `FileIndex` itself,
    /// since `get_source_code`/`get_source_with_context` are the only
    /// consumers and a `FileIndex` otherwise never needs its own bytes
    /// back once it's been turned into defs/refs/scopes.
    sources: RwLock<HashMap<FilePath, Arc<str>>>,
    /// §4.8 dirty set: files whose index changed since the cache below was
    /// last built.
    dirty: Mutex<HashSet<FilePath>>,
    cache: RwLock<Option<QueryCache>>,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let indexer = SingleFileIndexer::new(settings.indexing.max_file_size_bytes);
        Self {
            settings,
            registry: Arc::new(ProjectRegistry::new()),
            indexer,
            sources: RwLock::new(HashMap::new()),
            dirty: Mutex::new(HashSet::new()),
            cache: RwLock::new(None),
        }
    }

    /// Initialize logging from this engine's own settings. Optional and
    /// idempotent (§10) — never called implicitly by the rest of this type.
    pub fn init_logging(&self) {
        logging::init_with_config(&self.settings.logging);
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// §6 `initialize(root_path, excluded_folders)`. Walks `root`
    /// respecting `.gitignore` plus the configured and caller-supplied
    /// exclusions, reads and indexes every file whose extension names a
    /// supported language, and populates the registry. Per-file indexing
    /// is parallelized across `settings.indexing.parallel_threads` workers
    /// (§5: "may parallelize per-file indexing across files ... must join
    /// before snapshotting") — this call joins the pool before returning,
    /// so the registry is fully populated and the incremental coordinator
    /// sees a single dirty-everything transition rather than a flood of
    /// one-file invalidations.
    pub fn initialize(&self, root: impl AsRef<Path>, excluded_folders: &[String]) -> IndexResult<()> {
        let root = root.as_ref();
        info!("engine: initialize starting at {}", root.display());

        let mut excludes: HashSet<String> = self
            .settings
            .indexing
            .default_excluded_folders
            .iter()
            .cloned()
            .collect();
        excludes.extend(excluded_folders.iter().cloned());

        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(false)
            .require_git(false);

        let mut override_builder = OverrideBuilder::new(root);
        for folder in &excludes {
            if let Err(err) = override_builder.add(&format!("!**/{folder}/**")) {
                warn!("engine: invalid exclusion pattern '{folder}': {err}");
            }
        }
        if let Ok(overrides) = override_builder.build() {
            builder.overrides(overrides);
        }

        let paths: Vec<PathBuf> = builder
            .build()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
            .map(|entry| entry.into_path())
            .filter(|path| Language::from_path(path).is_some())
            .collect();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.indexing.parallel_threads.max(1))
            .build()
            .map_err(|err| IndexError::ConfigError { reason: err.to_string() })?;

        let indexer = &self.indexer;
        let indexed: Vec<(FilePath, String, FileIndex)> = pool.install(|| {
            paths
                .par_iter()
                .filter_map(|path| {
                    let language = Language::from_path(path)?;
                    match std::fs::read_to_string(path) {
                        Ok(source) => {
                            let key = path_key(root, path);
                            let index = indexer.index(key.as_ref(), language, &source);
                            debug!(
                                "engine: indexed {} ({} defs, {} refs, partial={})",
                                key,
                                index.defs.len(),
                                index.refs.len(),
                                index.partial
                            );
                            Some((key, source, index))
                        }
                        Err(err) => {
                            warn!("engine: failed to read '{}': {err}", path.display());
                            None
                        }
                    }
                })
                .collect()
        });

        let file_count = indexed.len();
        {
            let mut sources = self.sources.write();
            for (path, source, index) in indexed {
                sources.insert(path.clone(), Arc::from(source));
                self.registry.upsert_file(index);
            }
        }
        self.invalidate_all();

        info!("engine: initialize finished, {file_count} files indexed");
        Ok(())
    }

    /// §6 `update_file`. §7's `UnknownLanguage` policy applies: an
    /// unsupported extension is silently ignored rather than rejected.
    pub fn update_file(&self, path: impl AsRef<str>, source: &str) {
        let path_str = path.as_ref();
        let Some(language) = Language::from_path(Path::new(path_str)) else {
            warn!("engine: update_file ignoring unsupported extension for '{path_str}'");
            return;
        };
        let fp = file_path(path_str);
        let index = self.indexer.index(path_str, language, source);
        self.sources.write().insert(fp.clone(), Arc::from(source));
        self.registry.upsert_file(index);
        self.mark_dirty(fp);
    }

    /// §6 `remove_file`: drops the index and the cached source, then
    /// marks the file dirty so the next snapshot reflects its absence.
    pub fn remove_file(&self, path: &str) {
        self.registry.remove_file(path);
        self.sources.write().remove(path);
        self.mark_dirty(file_path(path));
    }

    pub fn get_index_single_file(&self, path: &str) -> Option<Arc<FileIndex>> {
        self.registry.file(path)
    }

    /// §6 `get_call_graph`. Immutable once returned, per §4.8.
    pub fn get_call_graph(&self) -> Arc<CallGraph> {
        self.ensure_fresh().call_graph
    }

    pub fn get_definition(&self, id: &SymbolId) -> Option<Definition> {
        self.registry.file(id.file_path())?.definition(id).cloned()
    }

    /// §6 `get_source_code`: the exact source text spanning the
    /// definition's enclosing range (falling back to its bare location for
    /// kinds with no enclosing range, e.g. variables and parameters).
    pub fn get_source_code(&self, def: &Definition, file_path_override: Option<&str>) -> Option<String> {
        let path = file_path_override.unwrap_or_else(|| def.id.file_path());
        let source = self.source_text(path)?;
        let range = def.enclosing_range.as_ref().unwrap_or(&def.location);
        Some(extract_lines(&source, range, 0, 0))
    }

    /// §6 `get_source_with_context`: the same span padded with
    /// `context_lines` on either side, plus the definition's docstring (via
    /// the owning language profile, §4.1) and any decorator lines
    /// immediately preceding it.
    pub fn get_source_with_context(
        &self,
        def: &Definition,
        file_path_override: Option<&str>,
        context_lines: usize,
    ) -> Option<SourceContext> {
        let path = file_path_override.unwrap_or_else(|| def.id.file_path());
        let source = self.source_text(path)?;
        let range = def.enclosing_range.clone().unwrap_or_else(|| def.location.clone());
        let snippet = extract_lines(&source, &range, context_lines, context_lines);

        let language = self.registry.file(path).map(|f| f.language);
        let docstring = language.and_then(|lang| {
            let profile = profile_for(lang);
            let tree = profile.parse(&source)?;
            let fp = file_path(path);
            let node = find_node_by_location(tree.root_node(), &fp, &range)?;
            profile.docstring(node, &source)
        });
        let decorators = extract_decorators(&source, range.start_line);

        Some(SourceContext {
            source: snippet,
            docstring,
            decorators: if decorators.is_empty() { None } else { Some(decorators) },
        })
    }

    /// §6 `get_stats`, extended per §14.
    pub fn get_stats(&self) -> Stats {
        let cache = self.ensure_fresh();
        let mut stats = Stats::default();
        for (_, file) in cache.snapshot.files() {
            stats.file_count += 1;
            stats.definition_count += file.defs.len();
            stats.reference_count += file.refs.len();
            if file.partial {
                stats.partial_file_count += 1;
            }
            for reference in &file.refs {
                let outcome = resolver::resolve_reference(reference, file, &cache.snapshot);
                if !outcome.is_resolved() {
                    stats.unresolved_reference_count += 1;
                }
            }
        }
        stats
    }

    pub fn clear(&self) {
        self.registry.clear();
        self.sources.write().clear();
        self.dirty.lock().clear();
        *self.cache.write() = None;
    }

    /// The registry sub-APIs (§6): definitions/exports/references/
    /// resolutions/imports/scopes, each scoped to the snapshot behind this
    /// view so a caller issuing several lookups sees one consistent state.
    pub fn project(&self) -> ProjectView {
        ProjectView {
            snapshot: self.ensure_fresh().snapshot,
        }
    }

    fn mark_dirty(&self, path: FilePath) {
        self.dirty.lock().insert(path);
    }

    fn invalidate_all(&self) {
        self.dirty.lock().clear();
        *self.cache.write() = None;
    }

    /// Rebuild the cached snapshot/call-graph pair if any file is dirty (or
    /// none has been built yet), otherwise hand back the one already held.
    fn ensure_fresh(&self) -> QueryCacheHandle {
        {
            let dirty = self.dirty.lock();
            let cache = self.cache.read();
            if dirty.is_empty() {
                if let Some(c) = cache.as_ref() {
                    return QueryCacheHandle {
                        snapshot: c.snapshot.clone(),
                        call_graph: c.call_graph.clone(),
                    };
                }
            }
        }

        let mut dirty = self.dirty.lock();
        let mut cache = self.cache.write();
        if dirty.is_empty() {
            if let Some(c) = cache.as_ref() {
                return QueryCacheHandle {
                    snapshot: c.snapshot.clone(),
                    call_graph: c.call_graph.clone(),
                };
            }
        }

        let snapshot = Arc::new(self.registry.snapshot());
        let call_graph = Arc::new(CallGraph::build(&snapshot));
        debug!("engine: rebuilt snapshot and call graph ({} dirty files)", dirty.len());
        dirty.clear();
        *cache = Some(QueryCache {
            snapshot: snapshot.clone(),
            call_graph: call_graph.clone(),
        });
        QueryCacheHandle { snapshot, call_graph }
    }

    fn source_text(&self, path: &str) -> Option<Arc<str>> {
        if let Some(source) = self.sources.read().get(path) {
            return Some(source.clone());
        }
        let source: Arc<str> = Arc::from(std::fs::read_to_string(path).ok()?);
        self.sources.write().insert(file_path(path), source.clone());
        Some(source)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain data twin of [`QueryCache`] returned by [`Engine::ensure_fresh`] so
/// callers get owned `Arc` handles without holding the engine's lock.
struct QueryCacheHandle {
    snapshot: Arc<ProjectSnapshot>,
    call_graph: Arc<CallGraph>,
}

/// A consistent, point-in-time view over the project-wide lookup tables
/// (§6 "Registry sub-APIs").
pub struct ProjectView {
    snapshot: Arc<ProjectSnapshot>,
}

impl ProjectView {
    pub fn definitions(&self, path: &str) -> &[Definition] {
        self.snapshot.file(path).map(|f| f.defs.as_slice()).unwrap_or(&[])
    }

    pub fn definition(&self, id: &SymbolId) -> Option<&Definition> {
        self.snapshot.definition(id)
    }

    pub fn exports(&self, path: &str) -> Option<&HashMap<Box<str>, SymbolId>> {
        self.snapshot.exports_of(path)
    }

    pub fn references(&self, path: &str) -> &[Reference] {
        self.snapshot.file(path).map(|f| f.refs.as_slice()).unwrap_or(&[])
    }

    pub fn imports(&self, path: &str) -> &[Import] {
        self.snapshot.file(path).map(|f| f.imports.as_slice()).unwrap_or(&[])
    }

    pub fn scopes(&self, path: &str) -> Option<&ScopeTree> {
        self.snapshot.file(path).map(|f| &f.scopes)
    }

    /// Every reference in `path` resolved against this view's snapshot
    /// (§4.5), in declaration order.
    pub fn resolutions(&self, path: &str) -> Vec<ResolutionOutcome> {
        let Some(file) = self.snapshot.file(path) else {
            return Vec::new();
        };
        file.refs
            .iter()
            .map(|reference| resolver::resolve_reference(reference, file, &self.snapshot))
            .collect()
    }
}

/// The key a file is registered under: its path relative to the
/// initialization root, forward-slash separated, matching the form
/// [`crate::module_path`]'s relative-specifier resolution expects.
fn path_key(root: &Path, path: &Path) -> FilePath {
    let rel = path.strip_prefix(root).unwrap_or(path);
    file_path(rel.to_string_lossy().replace('\\', "/"))
}

/// Slice `source` to the lines spanning `range`, padded with up to
/// `before`/`after` lines of surrounding context (clamped to the file).
fn extract_lines(source: &str, range: &Location, before: usize, after: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let total = lines.len() as u32;
    if total == 0 {
        return String::new();
    }
    let start = range.start_line.saturating_sub(1).saturating_sub(before as u32);
    let end = (range.end_line + after as u32).min(total);
    let start = start.min(end) as usize;
    lines[start..end as usize].join("\n")
}

/// Decorator lines (`@foo`, `@foo.bar(...)`) immediately preceding
/// `start_line`, in source order. Stops at the first non-decorator line.
fn extract_decorators(source: &str, start_line: u32) -> Vec<Box<str>> {
    let lines: Vec<&str> = source.lines().collect();
    let mut out = Vec::new();
    let mut idx = start_line.saturating_sub(1);
    while idx > 0 {
        idx -= 1;
        let Some(line) = lines.get(idx as usize) else { break };
        let trimmed = line.trim();
        if trimmed.starts_with('@') {
            out.push(Box::<str>::from(trimmed));
        } else {
            break;
        }
    }
    out.reverse();
    out
}

/// Re-locate the tree-sitter node a [`Definition`]'s `enclosing_range` was
/// captured from, by walking the freshly re-parsed tree for an exact
/// location match. Used only by `get_source_with_context`'s docstring
/// lookup, which needs the real node `LanguageProfile::docstring` expects
/// rather than a location.
fn find_node_by_location<'t>(node: tree_sitter::Node<'t>, path: &FilePath, target: &Location) -> Option<tree_sitter::Node<'t>> {
    if node.is_named() {
        let loc = node_location(path, node);
        if loc.start_line == target.start_line
            && loc.start_col == target.start_col
            && loc.end_line == target.end_line
            && loc.end_col == target.end_col
        {
            return Some(node);
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = find_node_by_location(child, path, target) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn update_file_then_get_index_single_file_round_trips() {
        let engine = Engine::new();
        engine.update_file("a.rs", "fn add(a: i32, b: i32) -> i32 { a + b }");
        let index = engine.get_index_single_file("a.rs").expect("indexed");
        assert!(index.defs.iter().any(|d| d.name.as_ref() == "add"));
    }

    #[test]
    fn update_file_is_idempotent_at_the_snapshot_level_p3() {
        let engine = Engine::new();
        let src = "def f():\n    return 1\n";
        engine.update_file("a.py", src);
        let first = engine.get_stats();
        engine.update_file("a.py", src);
        let second = engine.get_stats();
        assert_eq!(first.definition_count, second.definition_count);
        assert_eq!(first.reference_count, second.reference_count);
    }

    #[test]
    fn remove_then_update_matches_fresh_update_p4() {
        let engine = Engine::new();
        engine.update_file("a.py", "def f():\n    return 1\n");
        engine.update_file("b.py", "def g():\n    return 2\n");
        engine.remove_file("a.py");
        engine.update_file("a.py", "def f():\n    return 1\n");
        let mixed = engine.get_stats();

        let fresh = Engine::new();
        fresh.update_file("a.py", "def f():\n    return 1\n");
        fresh.update_file("b.py", "def g():\n    return 2\n");
        let baseline = fresh.get_stats();

        assert_eq!(mixed.definition_count, baseline.definition_count);
        assert_eq!(mixed.file_count, baseline.file_count);
    }

    #[test]
    fn call_graph_is_cached_until_a_file_goes_dirty() {
        let engine = Engine::new();
        engine.update_file("a.rs", "fn main() { helper(); }\nfn helper() {}\n");
        let first = engine.get_call_graph();
        let second = engine.get_call_graph();
        assert!(Arc::ptr_eq(&first, &second));

        engine.update_file("b.rs", "fn other() {}\n");
        let third = engine.get_call_graph();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn get_source_code_extracts_the_enclosing_range() {
        let engine = Engine::new();
        let src = "fn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n";
        engine.update_file("a.rs", src);
        let index = engine.get_index_single_file("a.rs").unwrap();
        let def = index.defs.iter().find(|d| d.name.as_ref() == "add").unwrap();
        let code = engine.get_source_code(def, None).expect("source available");
        assert!(code.starts_with("fn add"));
        assert!(code.ends_with('}'));
    }

    #[test]
    fn initialize_walks_a_directory_and_indexes_supported_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("main.rs"), "fn main() {}\n").unwrap();
        fs::write(dir.path().join("util.py"), "def helper():\n    pass\n").unwrap();
        fs::write(dir.path().join("README.md"), "# not indexed\n").unwrap();

        let engine = Engine::new();
        engine.initialize(dir.path(), &[]).expect("initialize succeeds");
        let stats = engine.get_stats();
        assert_eq!(stats.file_count, 2);
    }

    #[test]
    fn get_stats_counts_unresolved_references() {
        let engine = Engine::new();
        engine.update_file("a.py", "def f():\n    missing_name()\n");
        let stats = engine.get_stats();
        assert!(stats.unresolved_reference_count >= 1);
    }
}
