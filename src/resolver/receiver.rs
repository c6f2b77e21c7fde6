//! Receiver/method resolver (C6, §4.6).
//!
//! Resolves a `ReceiverChain` in three steps: pin the head to a base type
//! (a class, or a namespace handle), walk any middle attribute steps
//! through each class's `member_index` using declared/inferred type hints,
//! then invoke the final name — walking the single-inheritance chain
//! (§9 open question (c): no trait/interface dispatch) when the immediate
//! class doesn't own it.

use crate::file_index::FileIndex;
use crate::reference::{ReceiverChain, ReceiverHead, Reference, UnresolvedCategory};
use crate::registry::ProjectSnapshot;
use crate::resolver::{NamespaceHandle, Resolution, ResolutionOutcome, ResolutionRank, ResolutionTarget};
use crate::symbol::{Definition, DefinitionKind};
use crate::types::{FilePath, Location, SymbolId};
use std::collections::HashSet;
use tracing::trace;

enum ChainBase {
    Class(SymbolId),
    Namespace(NamespaceHandle),
    Unresolved(UnresolvedCategory),
}

pub fn resolve_receiver(
    reference: &Reference,
    chain: &ReceiverChain,
    file: &FileIndex,
    snapshot: &ProjectSnapshot,
) -> ResolutionOutcome {
    let Some(method) = chain.method_name() else {
        return ResolutionOutcome::unresolved(UnresolvedCategory::Unbound);
    };
    trace!(head = ?chain.head, method, "resolving receiver chain");

    match resolve_chain_head(reference, chain, file, snapshot) {
        ChainBase::Class(mut current_class) => {
            for step in chain.middle_steps() {
                match member(snapshot, &current_class, step) {
                    Some(member_def) if member_def.kind == DefinitionKind::Property => {
                        match member_def
                            .data
                            .type_hint_name
                            .as_deref()
                            .and_then(|hint| snapshot.class_by_bare_name(hint).first())
                        {
                            Some(next) => current_class = next.clone(),
                            None => return ResolutionOutcome::unresolved(UnresolvedCategory::External),
                        }
                    }
                    _ => return ResolutionOutcome::unresolved(UnresolvedCategory::External),
                }
            }
            invoke_method(&current_class, method, snapshot)
        }
        ChainBase::Namespace(NamespaceHandle::File(path)) => {
            resolve_namespace_file_member(&path, chain.middle_steps(), method, snapshot)
        }
        ChainBase::Namespace(NamespaceHandle::RustPath(prefix)) => {
            rust_qualified_lookup(&prefix, chain.middle_steps(), method, snapshot)
        }
        ChainBase::Unresolved(category) => ResolutionOutcome::unresolved(category),
    }
}

fn resolve_chain_head(
    reference: &Reference,
    chain: &ReceiverChain,
    file: &FileIndex,
    snapshot: &ProjectSnapshot,
) -> ChainBase {
    match chain.head {
        ReceiverHead::SelfKeyword | ReceiverHead::This | ReceiverHead::Cls => {
            match owner_of_enclosing_method(file, &reference.location) {
                Some(owner) => ChainBase::Class(owner),
                None => ChainBase::Unresolved(UnresolvedCategory::Unbound),
            }
        }
        ReceiverHead::Super => match owner_of_enclosing_method(file, &reference.location) {
            Some(owner) => match superclass_of(&owner, snapshot) {
                Some(parent) => ChainBase::Class(parent),
                None => ChainBase::Unresolved(UnresolvedCategory::External),
            },
            None => ChainBase::Unresolved(UnresolvedCategory::Unbound),
        },
        ReceiverHead::Crate => {
            let prefix_len = chain.segments.len().saturating_sub(1);
            let prefix: Box<str> = chain.segments[..prefix_len].join("::").into();
            ChainBase::Namespace(NamespaceHandle::RustPath(prefix))
        }
        ReceiverHead::Identifier => {
            let head_name = chain.segments.first().map(|s| s.as_ref()).unwrap_or("");
            let outcome = super::resolve_name(head_name, reference.scope_id, &reference.location, file, snapshot);
            let category = outcome.category;
            match outcome.resolutions.into_iter().next() {
                Some(Resolution {
                    target: ResolutionTarget::Namespace(handle),
                    ..
                }) => ChainBase::Namespace(handle),
                Some(Resolution {
                    target: ResolutionTarget::Symbol(id),
                    ..
                }) => classify_symbol_head(&id, snapshot),
                None if file.language == crate::parsing::Language::Rust => {
                    // No import binding at all for the head: fall back to
                    // treating the whole chain as a same-crate qualified
                    // path (§9, `qualify_free_name`).
                    let prefix_len = chain.segments.len().saturating_sub(1);
                    let prefix: Box<str> = chain.segments[..prefix_len].join("::").into();
                    ChainBase::Namespace(NamespaceHandle::RustPath(prefix))
                }
                None => ChainBase::Unresolved(category.unwrap_or(UnresolvedCategory::Unbound)),
            }
        }
    }
}

fn classify_symbol_head(id: &SymbolId, snapshot: &ProjectSnapshot) -> ChainBase {
    let Some(def) = snapshot.definition(id) else {
        return ChainBase::Unresolved(UnresolvedCategory::External);
    };
    match def.kind {
        DefinitionKind::Class | DefinitionKind::Interface | DefinitionKind::Enum => ChainBase::Class(id.clone()),
        _ => match def
            .data
            .type_hint_name
            .as_deref()
            .and_then(|hint| snapshot.class_by_bare_name(hint).first())
        {
            Some(class_id) => ChainBase::Class(class_id.clone()),
            // §8 scenario 5: a `self`-attribute with no type hint at all
            // breaks the chain as external, never as a guess.
            None => ChainBase::Unresolved(UnresolvedCategory::External),
        },
    }
}

fn owner_of_enclosing_method(file: &FileIndex, at: &Location) -> Option<SymbolId> {
    file.defs
        .iter()
        .filter(|d| d.kind.is_callable())
        .filter(|d| {
            d.enclosing_range
                .as_ref()
                .is_some_and(|r| r.contains_point(at.start_line, at.start_col))
        })
        .min_by_key(|d| {
            let r = d.enclosing_range.as_ref().expect("filtered above");
            r.end_line.saturating_sub(r.start_line)
        })
        .and_then(|d| d.data.owner_class.clone())
}

fn superclass_of(class_id: &SymbolId, snapshot: &ProjectSnapshot) -> Option<SymbolId> {
    let def = snapshot.definition(class_id)?;
    let name = def.data.superclass_name.as_deref()?;
    snapshot.class_by_bare_name(name).first().cloned()
}

fn member<'a>(snapshot: &'a ProjectSnapshot, class_id: &SymbolId, name: &str) -> Option<&'a Definition> {
    let file = snapshot.file(class_id.file_path())?;
    let member_id = file.member_index.get(class_id)?.get(name)?;
    file.definition(member_id)
}

/// Invoke `method` on `class_id`, walking the single-inheritance chain
/// (§4.6 step 3) with a cycle guard. A class owning more than one
/// same-named method (overloaded `impl` blocks) is ambiguous, tie-broken
/// by file path then location per §4.6 "Tie-breaks".
fn invoke_method(class_id: &SymbolId, method: &str, snapshot: &ProjectSnapshot) -> ResolutionOutcome {
    let mut current = class_id.clone();
    let mut visited = HashSet::new();
    loop {
        if !visited.insert(current.clone()) {
            return ResolutionOutcome::unresolved(UnresolvedCategory::External);
        }
        if let Some(file) = snapshot.file(current.file_path()) {
            let mut candidates: Vec<SymbolId> = file
                .defs
                .iter()
                .filter(|d| {
                    matches!(d.kind, DefinitionKind::Method | DefinitionKind::Constructor)
                        && d.name.as_ref() == method
                        && d.data.owner_class.as_ref() == Some(&current)
                })
                .map(|d| d.id.clone())
                .collect();
            match candidates.len() {
                0 => {}
                1 => {
                    return ResolutionOutcome::resolved(
                        ResolutionTarget::Symbol(candidates.remove(0)),
                        ResolutionRank::NamespaceMember,
                    )
                }
                _ => {
                    candidates.sort_by(|a, b| a.as_str().cmp(b.as_str()));
                    return ResolutionOutcome::ambiguous(candidates);
                }
            }
        }
        match superclass_of(&current, snapshot) {
            Some(parent) => current = parent,
            None => return ResolutionOutcome::unresolved(UnresolvedCategory::Unbound),
        }
    }
}

fn resolve_namespace_file_member(
    path: &FilePath,
    middle_steps: &[Box<str>],
    method: &str,
    snapshot: &ProjectSnapshot,
) -> ResolutionOutcome {
    if !middle_steps.is_empty() {
        return ResolutionOutcome::unresolved(UnresolvedCategory::External);
    }
    match snapshot.exports_of(path.as_ref()).and_then(|exports| exports.get(method)) {
        Some(symbol) => ResolutionOutcome::resolved(ResolutionTarget::Symbol(symbol.clone()), ResolutionRank::NamespaceMember),
        None => ResolutionOutcome::unresolved(UnresolvedCategory::Unbound),
    }
}

fn rust_qualified_lookup(
    prefix: &str,
    middle_steps: &[Box<str>],
    method: &str,
    snapshot: &ProjectSnapshot,
) -> ResolutionOutcome {
    let mut parts: Vec<&str> = Vec::new();
    if !prefix.is_empty() {
        parts.push(prefix);
    }
    for step in middle_steps {
        parts.push(step);
    }
    parts.push(method);
    let joined = parts.join("::");
    let matches = snapshot.resolve_rust_qualified_path(&joined);
    match matches.len() {
        0 => ResolutionOutcome::unresolved(UnresolvedCategory::Unbound),
        1 => ResolutionOutcome::resolved(ResolutionTarget::Symbol(matches[0].clone()), ResolutionRank::NamespaceMember),
        _ => ResolutionOutcome::ambiguous(matches.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_index::FileIndexBuilder;
    use crate::parsing::Language;
    use crate::reference::ReferenceKind;
    use crate::registry::ProjectRegistry;
    use crate::scope::ScopeKind;
    use crate::types::file_path;

    fn loc(path: &str, sl: u32, sc: u32, el: u32, ec: u32) -> Location {
        Location::new(file_path(path), sl, sc, el, ec)
    }

    #[test]
    fn self_attribute_without_type_hint_is_external() {
        let mut b = FileIndexBuilder::new(file_path("a.py"), Language::Python, "x", loc("a.py", 1, 0, 20, 0));
        let root = b.root_scope();
        let class_def = Definition::new(file_path("a.py"), "Db", "Db", DefinitionKind::Class, loc("a.py", 1, 0, 10, 0), root)
            .with_enclosing_range(loc("a.py", 1, 0, 10, 0));
        let class_id = b.push_definition(class_def);

        let method_scope = b.open_scope(ScopeKind::Method, root, loc("a.py", 2, 0, 5, 0));
        let method = Definition::new(file_path("a.py"), "Db#run", "run", DefinitionKind::Method, loc("a.py", 2, 0, 5, 0), root)
            .with_enclosing_range(loc("a.py", 2, 0, 5, 0))
            .with_owner_class(class_id.clone());
        b.push_definition(method);

        let chain = ReceiverChain::new(ReceiverHead::SelfKeyword, vec!["self".into(), "conn".into(), "execute".into()]);
        let r = Reference::new(loc("a.py", 3, 4, 3, 11), "execute", method_scope, ReferenceKind::Call).with_receiver_chain(chain);
        let idx = b.push_reference(r);
        let file = b.finish();
        let registry = ProjectRegistry::new();
        registry.upsert_file(file.clone());
        let snapshot = registry.snapshot();

        let reference = file.reference(idx).unwrap();
        let outcome = resolve_receiver(reference, reference.receiver_chain.as_ref().unwrap(), &file, &snapshot);
        assert!(!outcome.is_resolved());
        assert_eq!(outcome.category, Some(UnresolvedCategory::External));
    }

    #[test]
    fn super_call_walks_to_parent_class_method() {
        let registry = ProjectRegistry::new();

        let mut b = FileIndexBuilder::new(file_path("a.py"), Language::Python, "x", loc("a.py", 1, 0, 30, 0));
        let root = b.root_scope();

        let base = Definition::new(file_path("a.py"), "Base", "Base", DefinitionKind::Class, loc("a.py", 1, 0, 5, 0), root)
            .with_enclosing_range(loc("a.py", 1, 0, 5, 0));
        let base_id = b.push_definition(base);
        let base_method = Definition::new(file_path("a.py"), "Base#run", "run", DefinitionKind::Method, loc("a.py", 2, 4, 3, 0), root)
            .with_enclosing_range(loc("a.py", 2, 4, 3, 0))
            .with_owner_class(base_id.clone());
        b.push_definition(base_method);

        let child = Definition::new(file_path("a.py"), "Child", "Child", DefinitionKind::Class, loc("a.py", 10, 0, 20, 0), root)
            .with_enclosing_range(loc("a.py", 10, 0, 20, 0))
            .with_superclass("Base");
        let child_id = b.push_definition(child);
        let child_method_scope = b.open_scope(ScopeKind::Method, root, loc("a.py", 11, 4, 15, 0));
        let child_method = Definition::new(file_path("a.py"), "Child#run", "run", DefinitionKind::Method, loc("a.py", 11, 4, 15, 0), root)
            .with_enclosing_range(loc("a.py", 11, 4, 15, 0))
            .with_owner_class(child_id.clone());
        b.push_definition(child_method);

        let chain = ReceiverChain::new(ReceiverHead::Super, vec!["super".into(), "run".into()]);
        let r = Reference::new(loc("a.py", 12, 8, 12, 11), "run", child_method_scope, ReferenceKind::Call).with_receiver_chain(chain);
        let idx = b.push_reference(r);
        let file = b.finish();
        registry.upsert_file(file.clone());
        let snapshot = registry.snapshot();

        let reference = file.reference(idx).unwrap();
        let outcome = resolve_receiver(reference, reference.receiver_chain.as_ref().unwrap(), &file, &snapshot);
        assert!(outcome.is_resolved());
        assert_eq!(outcome.resolutions[0].symbol(), Some(&base_id));
    }
}
