//! The per-file semantic record (C3) and the builder that assembles it.

use crate::exports::Export;
use crate::imports::Import;
use crate::parsing::Language;
use crate::reference::{Reference, UnresolvedCategory};
use crate::scope::{Scope, ScopeId, ScopeKind, ScopeTree};
use crate::symbol::Definition;
use crate::types::{FilePath, Location, RefIndex, SymbolId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use xxhash_rust::xxh3::xxh3_64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    ParseError,
    PartialParse,
    UnresolvedReference(UnresolvedCategory),
    FileSizeExceeded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub location: Option<Location>,
    pub message: Box<str>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<Box<str>>) -> Self {
        Self {
            kind,
            location: None,
            message: message.into(),
        }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

/// A class's member name -> symbol map, preserving declaration order
/// (§3 "ordered map of member name -> property/method SymbolId").
pub type MemberIndex = IndexMap<Box<str>, SymbolId>;

/// The immutable per-file semantic record produced by [`crate::indexing::SingleFileIndexer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileIndex {
    pub file_path: FilePath,
    pub language: Language,
    /// xxh3 content hash, used to make `update_file` idempotent (P3) without
    /// re-indexing byte-identical source.
    pub source_fingerprint: u64,
    pub scopes: ScopeTree,
    pub defs: Vec<Definition>,
    pub refs: Vec<Reference>,
    pub imports: Vec<Import>,
    pub exports: Vec<Export>,
    pub member_index: HashMap<SymbolId, MemberIndex>,
    /// §4.3 failure model: true if parsing recovered from a syntax error or
    /// the file exceeded the size limit (§6).
    pub partial: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl FileIndex {
    pub fn fingerprint(source: &str) -> u64 {
        xxh3_64(source.as_bytes())
    }

    pub fn definition(&self, id: &SymbolId) -> Option<&Definition> {
        self.defs.iter().find(|d| &d.id == id)
    }

    pub fn reference(&self, index: RefIndex) -> Option<&Reference> {
        self.refs.get(index.0 as usize)
    }

    pub fn export(&self, name: &str) -> Option<&Export> {
        self.exports.iter().find(|e| e.exported_name.as_ref() == name)
    }

    pub fn unresolved_reference_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d.kind, DiagnosticKind::UnresolvedReference(_)))
            .count()
    }
}

/// Accumulates events emitted by capture handlers during a single indexing
/// pass (§4.3 step 2), then folds them into an immutable [`FileIndex`].
pub struct FileIndexBuilder {
    file_path: FilePath,
    language: Language,
    source_fingerprint: u64,
    scopes: ScopeTree,
    defs: Vec<Definition>,
    refs: Vec<Reference>,
    imports: Vec<Import>,
    exports: Vec<Export>,
    partial: bool,
    diagnostics: Vec<Diagnostic>,
    current_scope: ScopeId,
    /// Stack of the class `Definition`s currently being walked into, innermost
    /// last. Nested `impl`/class bodies push onto this so a method/property
    /// handler can attach `owner_class` without re-deriving it from the tree.
    class_stack: Vec<SymbolId>,
    /// Type name -> `SymbolId` seen so far in this file. Lets a later `impl`
    /// block (Rust) re-attribute its methods to the struct/enum it already
    /// saw declared, without re-parsing anything.
    type_defs: HashMap<Box<str>, SymbolId>,
    /// Stack of inline `mod` names currently open (Rust only), innermost
    /// last. Qualifies free functions/types declared inside a module with
    /// `outer::inner::name` the same way `class_stack` qualifies methods.
    namespace_stack: Vec<Box<str>>,
}

impl FileIndexBuilder {
    pub fn new(file_path: FilePath, language: Language, source: &str, root_range: Location) -> Self {
        let mut scopes = ScopeTree::new();
        let root = scopes.open_scope(ScopeKind::Module, None, root_range);
        Self {
            file_path,
            language,
            source_fingerprint: FileIndex::fingerprint(source),
            scopes,
            defs: Vec::new(),
            refs: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            partial: false,
            diagnostics: Vec::new(),
            current_scope: root,
            class_stack: Vec::new(),
            type_defs: HashMap::new(),
            namespace_stack: Vec::new(),
        }
    }

    pub fn file_path(&self) -> &FilePath {
        &self.file_path
    }

    pub fn root_scope(&self) -> ScopeId {
        self.scopes.root()
    }

    pub fn current_scope(&self) -> ScopeId {
        self.current_scope
    }

    pub fn set_current_scope(&mut self, scope: ScopeId) {
        self.current_scope = scope;
    }

    pub fn open_scope(&mut self, kind: ScopeKind, parent: ScopeId, range: Location) -> ScopeId {
        self.scopes.open_scope(kind, Some(parent), range)
    }

    pub fn scopes_mut(&mut self) -> &mut ScopeTree {
        &mut self.scopes
    }

    pub fn scopes(&self) -> &ScopeTree {
        &self.scopes
    }

    /// Emit a definition, attaching it to its declared scope.
    pub fn push_definition(&mut self, def: Definition) -> SymbolId {
        let id = def.id.clone();
        self.scopes.attach_def(def.scope_id, id.clone());
        self.defs.push(def);
        id
    }

    /// Emit a reference, attaching it to its declared scope and returning
    /// the index the caller can use for diagnostics or a `CallReference`.
    pub fn push_reference(&mut self, reference: Reference) -> RefIndex {
        let idx = RefIndex(self.refs.len() as u32);
        self.scopes.attach_ref(reference.scope_id, idx);
        self.refs.push(reference);
        idx
    }

    /// Pushes the import and, per §3's invariant ("every import binding
    /// produces an `import_binding` definition in the module scope"), a
    /// companion `import_binding` [`Definition`] for each of its bindings.
    /// Centralized here rather than in each language profile so the
    /// invariant can't be forgotten by a future capture handler.
    pub fn push_import(&mut self, import: Import) {
        let root = self.scopes.root();
        for binding in &import.bindings {
            let def = binding.to_definition(
                self.file_path.clone(),
                &import.source_module,
                import.kind,
                import.location.clone(),
                root,
            );
            self.push_definition(def);
        }
        self.imports.push(import);
    }

    pub fn push_export(&mut self, export: Export) {
        self.exports.push(export);
    }

    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn mark_partial(&mut self) {
        self.partial = true;
    }

    /// The class a method/property definition discovered right now belongs
    /// to, if the walker is currently inside one.
    pub fn current_class(&self) -> Option<SymbolId> {
        self.class_stack.last().cloned()
    }

    pub fn push_class(&mut self, id: SymbolId) {
        self.class_stack.push(id);
    }

    pub fn class_stack_len(&self) -> usize {
        self.class_stack.len()
    }

    pub fn truncate_class_stack(&mut self, len: usize) {
        self.class_stack.truncate(len);
    }

    pub fn register_type(&mut self, name: impl Into<Box<str>>, id: SymbolId) {
        self.type_defs.insert(name.into(), id);
    }

    pub fn lookup_type(&self, name: &str) -> Option<SymbolId> {
        self.type_defs.get(name).cloned()
    }

    /// The joined `outer::inner` prefix of inline `mod` blocks currently
    /// open, or `None` at module top level.
    pub fn namespace_prefix(&self) -> Option<String> {
        if self.namespace_stack.is_empty() {
            None
        } else {
            Some(self.namespace_stack.join("::"))
        }
    }

    pub fn push_namespace(&mut self, name: impl Into<Box<str>>) {
        self.namespace_stack.push(name.into());
    }

    pub fn namespace_stack_len(&self) -> usize {
        self.namespace_stack.len()
    }

    pub fn truncate_namespace_stack(&mut self, len: usize) {
        self.namespace_stack.truncate(len);
    }

    /// Fold accumulated events into the immutable [`FileIndex`], deduping
    /// references at identical locations (§4.3 step 3) and computing each
    /// class's `member_index` from its methods/properties.
    pub fn finish(self) -> FileIndex {
        let mut refs = self.refs;
        let mut seen = std::collections::HashSet::new();
        refs.retain(|r| {
            let key = (
                r.location.start_line,
                r.location.start_col,
                r.location.end_line,
                r.location.end_col,
                r.name.clone(),
            );
            seen.insert(key)
        });

        let member_index = build_member_index(&self.defs);

        FileIndex {
            file_path: self.file_path,
            language: self.language,
            source_fingerprint: self.source_fingerprint,
            scopes: self.scopes,
            defs: self.defs,
            refs,
            imports: self.imports,
            exports: self.exports,
            member_index,
            partial: self.partial,
            diagnostics: self.diagnostics,
        }
    }
}

fn build_member_index(defs: &[Definition]) -> HashMap<SymbolId, MemberIndex> {
    use crate::symbol::DefinitionKind;

    let mut index: HashMap<SymbolId, MemberIndex> = HashMap::new();
    for def in defs {
        if !matches!(def.kind, DefinitionKind::Method | DefinitionKind::Property) {
            continue;
        }
        let Some(owner) = &def.data.owner_class else {
            continue;
        };
        index
            .entry(owner.clone())
            .or_default()
            .insert(def.name.clone(), def.id.clone());
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceKind;
    use crate::symbol::DefinitionKind;
    use crate::types::file_path;

    fn loc(sl: u32, sc: u32, el: u32, ec: u32) -> Location {
        Location::new(file_path("a.py"), sl, sc, el, ec)
    }

    #[test]
    fn builder_dedupes_references_at_identical_locations() {
        let mut b = FileIndexBuilder::new(file_path("a.py"), Language::Python, "x", loc(1, 0, 10, 0));
        let root = b.root_scope();
        b.push_reference(Reference::new(loc(2, 0, 2, 3), "foo", root, ReferenceKind::Read));
        b.push_reference(Reference::new(loc(2, 0, 2, 3), "foo", root, ReferenceKind::Read));
        let index = b.finish();
        assert_eq!(index.refs.len(), 1);
    }

    #[test]
    fn builder_computes_member_index_in_declaration_order() {
        let mut b = FileIndexBuilder::new(file_path("a.py"), Language::Python, "x", loc(1, 0, 10, 0));
        let root = b.root_scope();
        let class_def = Definition::new(
            file_path("a.py"),
            "Db",
            "Db",
            DefinitionKind::Class,
            loc(1, 0, 5, 0),
            root,
        )
        .with_enclosing_range(loc(1, 0, 5, 0));
        let class_id = b.push_definition(class_def);

        let method_b = Definition::new(
            file_path("a.py"),
            "Db#query_b",
            "query_b",
            DefinitionKind::Method,
            loc(3, 4, 3, 20),
            root,
        )
        .with_enclosing_range(loc(3, 4, 3, 20))
        .with_owner_class(class_id.clone());
        b.push_definition(method_b);

        let method_a = Definition::new(
            file_path("a.py"),
            "Db#query_a",
            "query_a",
            DefinitionKind::Method,
            loc(4, 4, 4, 20),
            root,
        )
        .with_enclosing_range(loc(4, 4, 4, 20))
        .with_owner_class(class_id.clone());
        b.push_definition(method_a);

        let index = b.finish();
        let members = index.member_index.get(&class_id).unwrap();
        let names: Vec<&str> = members.keys().map(|k| k.as_ref()).collect();
        assert_eq!(names, vec!["query_b", "query_a"]);
    }

    #[test]
    fn fingerprint_is_stable_for_identical_source() {
        assert_eq!(FileIndex::fingerprint("abc"), FileIndex::fingerprint("abc"));
        assert_ne!(FileIndex::fingerprint("abc"), FileIndex::fingerprint("abd"));
    }
}
