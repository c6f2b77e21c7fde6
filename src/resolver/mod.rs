//! Reference resolver (C5, §4.5).
//!
//! Resolves a bare-identifier [`Reference`] by walking its scope chain
//! outward, honoring hoisting (§4.2) and import redirection. References
//! carrying a [`ReceiverChain`] (`a.b.c()`) are delegated whole to
//! [`receiver::resolve_receiver`] (C6), since a receiver's head is itself
//! resolved through this module's scope walk before C6 takes over the
//! member-access part.

pub mod receiver;

use crate::file_index::FileIndex;
use crate::reference::{Reference, UnresolvedCategory};
use crate::registry::ProjectSnapshot;
use crate::scope::Scope;
use crate::symbol::{Definition, DefinitionKind};
use crate::types::{Location, ScopeId, SymbolId};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// §4.5's rank order, declared best to worst. `Ord` is derived from
/// declaration order, so sorting a candidate list ascending puts the best
/// match first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResolutionRank {
    Local,
    Parameter,
    EnclosingClosure,
    Module,
    NamedImport,
    NamespaceMember,
    WildcardReexport,
}

/// What a reference resolved to: either a concrete definition, or a
/// namespace handle whose further member access is resolved by walking a
/// foreign file's exports / a Rust qualified-path prefix (§4.6 "namespace
/// member access") rather than a `member_index` lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionTarget {
    Symbol(SymbolId),
    Namespace(NamespaceHandle),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceHandle {
    /// TS/JS `import * as ns from './other'`, Python `import pkg[.sub]`.
    File(crate::types::FilePath),
    /// Rust `use crate::m;` / inline `mod m` qualified-path prefix, already
    /// stripped of any leading `crate::`/`self::`/`super::`.
    RustPath(Box<str>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub target: ResolutionTarget,
    pub rank: ResolutionRank,
}

impl Resolution {
    pub fn symbol(&self) -> Option<&SymbolId> {
        match &self.target {
            ResolutionTarget::Symbol(id) => Some(id),
            ResolutionTarget::Namespace(_) => None,
        }
    }
}

/// The result of resolving one reference: zero or more candidates plus,
/// when empty, the category a caller should record as a diagnostic (§7
/// `UnresolvedReference`).
#[derive(Debug, Clone, Default)]
pub struct ResolutionOutcome {
    pub resolutions: Vec<Resolution>,
    pub category: Option<UnresolvedCategory>,
}

impl ResolutionOutcome {
    pub fn resolved(target: ResolutionTarget, rank: ResolutionRank) -> Self {
        Self {
            resolutions: vec![Resolution { target, rank }],
            category: None,
        }
    }

    pub fn ambiguous(ids: Vec<SymbolId>) -> Self {
        Self {
            resolutions: ids
                .into_iter()
                .map(|id| Resolution {
                    target: ResolutionTarget::Symbol(id),
                    rank: ResolutionRank::NamedImport,
                })
                .collect(),
            category: Some(UnresolvedCategory::Ambiguous),
        }
    }

    pub fn unresolved(category: UnresolvedCategory) -> Self {
        Self {
            resolutions: Vec::new(),
            category: Some(category),
        }
    }

    pub fn is_resolved(&self) -> bool {
        !self.resolutions.is_empty()
    }
}

/// Entry point: resolve one reference against its own file and the
/// project-wide snapshot.
pub fn resolve_reference(reference: &Reference, file: &FileIndex, snapshot: &ProjectSnapshot) -> ResolutionOutcome {
    trace!(name = %reference.name, file = %file.file_path.as_ref(), "resolving reference");
    if let Some(chain) = &reference.receiver_chain {
        return receiver::resolve_receiver(reference, chain, file, snapshot);
    }
    resolve_name(&reference.name, reference.scope_id, &reference.location, file, snapshot)
}

/// Resolve a bare name starting at `scope_id`, used both for plain
/// references and for the head of a receiver chain (§4.6 step 1(b)).
pub(crate) fn resolve_name(
    name: &str,
    scope_id: ScopeId,
    at: &Location,
    file: &FileIndex,
    snapshot: &ProjectSnapshot,
) -> ResolutionOutcome {
    let chain = file.scopes.walk_to_root(scope_id);
    let module_scope = file.scopes.root();

    for (depth, &sid) in chain.iter().enumerate() {
        let scope = file.scopes.get(sid);
        let is_module_scope = sid == module_scope;

        let mut hits: Vec<&Definition> = scope
            .defs
            .iter()
            .filter_map(|id| file.definition(id))
            .filter(|d| d.name.as_ref() == name)
            .filter(|d| Scope::hoists(d.kind) || is_visible_by_position(d, at))
            .collect();
        hits.sort_by_key(|d| (d.location.start_line, d.location.start_col));

        let Some(def) = hits.first() else {
            continue;
        };

        if def.kind == DefinitionKind::ImportBinding {
            return resolve_import_binding(def, file, snapshot);
        }

        let rank = rank_for(depth, def.kind, is_module_scope);
        return ResolutionOutcome::resolved(ResolutionTarget::Symbol(def.id.clone()), rank);
    }

    let category = if file.imports.iter().any(|i| i.kind == crate::imports::ImportKind::WildcardReexport) {
        UnresolvedCategory::External
    } else {
        UnresolvedCategory::Unbound
    };
    trace!(name, ?category, "name did not resolve in any enclosing scope");
    ResolutionOutcome::unresolved(category)
}

fn is_visible_by_position(def: &Definition, at: &Location) -> bool {
    (at.start_line, at.start_col) >= (def.location.start_line, def.location.start_col)
}

fn rank_for(depth: usize, kind: DefinitionKind, is_module_scope: bool) -> ResolutionRank {
    if is_module_scope {
        return ResolutionRank::Module;
    }
    if depth == 0 {
        match kind {
            DefinitionKind::Parameter => ResolutionRank::Parameter,
            _ => ResolutionRank::Local,
        }
    } else {
        ResolutionRank::EnclosingClosure
    }
}

/// Redirect resolution through an `import_binding` definition (§4.5 step
/// 2). Namespace bindings are returned as-is — they don't resolve further
/// here, C6 walks the remainder of a receiver chain against them instead.
fn resolve_import_binding(def: &Definition, file: &FileIndex, snapshot: &ProjectSnapshot) -> ResolutionOutcome {
    if def.data.is_namespace {
        let Some(module) = &def.data.source_module else {
            return ResolutionOutcome::unresolved(UnresolvedCategory::Unbound);
        };
        let handle = match file.language {
            crate::parsing::Language::Rust => NamespaceHandle::RustPath(strip_rust_prefix(module).into()),
            _ => match snapshot.resolve_import_file(file.file_path.as_ref(), module, file.language) {
                Some(path) => NamespaceHandle::File(path),
                None => return ResolutionOutcome::unresolved(UnresolvedCategory::External),
            },
        };
        return ResolutionOutcome::resolved(ResolutionTarget::Namespace(handle), ResolutionRank::NamespaceMember);
    }

    let Some(module) = &def.data.source_module else {
        return ResolutionOutcome::resolved(ResolutionTarget::Symbol(def.id.clone()), ResolutionRank::NamedImport);
    };

    if file.language == crate::parsing::Language::Rust {
        let matches = snapshot.resolve_rust_qualified_path(module);
        return match matches.len() {
            0 => ResolutionOutcome::unresolved(UnresolvedCategory::Unbound),
            1 => ResolutionOutcome::resolved(ResolutionTarget::Symbol(matches[0].clone()), ResolutionRank::NamedImport),
            _ => ResolutionOutcome::ambiguous(matches.to_vec()),
        };
    }

    let foreign_name = def.data.imported_name.as_deref().unwrap_or(def.name.as_ref());
    let Some(target_file) = snapshot.resolve_import_file(file.file_path.as_ref(), module, file.language) else {
        return ResolutionOutcome::unresolved(UnresolvedCategory::External);
    };
    let Some(exports) = snapshot.exports_of(target_file.as_ref()) else {
        return ResolutionOutcome::unresolved(UnresolvedCategory::External);
    };
    match exports.get(foreign_name) {
        Some(symbol) => ResolutionOutcome::resolved(ResolutionTarget::Symbol(symbol.clone()), ResolutionRank::NamedImport),
        None => {
            // Python `from pkg import sub`: `sub` may itself name a
            // submodule file rather than an export of `pkg`'s `__init__`
            // (§4.1/§8 scenario 4). Re-classify the binding as a namespace
            // handle onto that submodule when it resolves.
            if file.language == crate::parsing::Language::Python {
                let dotted = format!("{module}.{foreign_name}");
                if let Some(submodule) = snapshot.resolve_import_file(file.file_path.as_ref(), &dotted, file.language) {
                    return ResolutionOutcome::resolved(
                        ResolutionTarget::Namespace(NamespaceHandle::File(submodule)),
                        ResolutionRank::NamespaceMember,
                    );
                }
            }
            ResolutionOutcome::unresolved(UnresolvedCategory::Unbound)
        }
    }
}

fn strip_rust_prefix(path: &str) -> &str {
    path.strip_prefix("crate::")
        .or_else(|| path.strip_prefix("self::"))
        .or_else(|| path.strip_prefix("super::"))
        .unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_index::FileIndexBuilder;
    use crate::parsing::Language;
    use crate::reference::ReferenceKind;
    use crate::registry::ProjectRegistry;
    use crate::symbol::Definition;
    use crate::types::file_path;

    fn loc(path: &str, sl: u32, sc: u32, el: u32, ec: u32) -> Location {
        Location::new(file_path(path), sl, sc, el, ec)
    }

    #[test]
    fn local_variable_shadows_module_scope_function() {
        let mut b = FileIndexBuilder::new(file_path("a.py"), Language::Python, "x", loc("a.py", 1, 0, 20, 0));
        let root = b.root_scope();
        let module_fn = Definition::new(file_path("a.py"), "helper", "helper", DefinitionKind::Function, loc("a.py", 1, 0, 1, 5), root)
            .with_enclosing_range(loc("a.py", 1, 0, 1, 5));
        b.push_definition(module_fn);

        let func_scope = b.open_scope(crate::scope::ScopeKind::Function, root, loc("a.py", 5, 0, 10, 0));
        b.set_current_scope(func_scope);
        let local = Definition::new(file_path("a.py"), "helper", "helper", DefinitionKind::Variable, loc("a.py", 6, 4, 6, 10), func_scope);
        let local_id = b.push_definition(local);

        let r = Reference::new(loc("a.py", 7, 4, 7, 10), "helper", func_scope, ReferenceKind::Read);
        let idx = b.push_reference(r);
        let file = b.finish();
        let registry = ProjectRegistry::new();
        let snapshot = registry.snapshot();

        let reference = file.reference(idx).unwrap();
        let outcome = resolve_reference(reference, &file, &snapshot);
        assert_eq!(outcome.resolutions.len(), 1);
        assert_eq!(outcome.resolutions[0].symbol(), Some(&local_id));
        assert_eq!(outcome.resolutions[0].rank, ResolutionRank::Local);
    }

    #[test]
    fn unbound_reference_with_no_wildcard_import_is_unbound() {
        let mut b = FileIndexBuilder::new(file_path("a.py"), Language::Python, "x", loc("a.py", 1, 0, 20, 0));
        let root = b.root_scope();
        let r = Reference::new(loc("a.py", 2, 0, 2, 7), "missing", root, ReferenceKind::Read);
        let idx = b.push_reference(r);
        let file = b.finish();
        let registry = ProjectRegistry::new();
        let snapshot = registry.snapshot();
        let reference = file.reference(idx).unwrap();
        let outcome = resolve_reference(reference, &file, &snapshot);
        assert!(!outcome.is_resolved());
        assert_eq!(outcome.category, Some(UnresolvedCategory::Unbound));
    }
}
