//! The per-file scope tree (C2).
//!
//! A [`ScopeTree`] is a forest rooted at a single module scope. Scopes
//! nest strictly — a child's `enclosing_range` is always inside its
//! parent's — and every definition/reference in a [`crate::file_index::FileIndex`]
//! belongs to exactly one scope, found by walking down the tree from the
//! root until no child contains the target location.

use crate::types::{Location, RefIndex, ScopeId, SymbolId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeKind {
    Module,
    Function,
    Method,
    Class,
    Block,
    Comprehension,
    For,
    Catch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub parent_id: Option<ScopeId>,
    pub enclosing_range: Location,
    pub defs: Vec<SymbolId>,
    pub refs: Vec<RefIndex>,
    pub children: Vec<ScopeId>,
}

impl Scope {
    /// Hoisting policy (§4.2): function and class declarations are visible
    /// anywhere in their scope; everything else is only visible from its
    /// declaration onward. The resolver consults this to decide whether a
    /// textually-later definition is still a valid hit for an earlier
    /// reference.
    pub fn hoists(kind: crate::symbol::DefinitionKind) -> bool {
        matches!(
            kind,
            crate::symbol::DefinitionKind::Function
                | crate::symbol::DefinitionKind::Class
                | crate::symbol::DefinitionKind::Method
                | crate::symbol::DefinitionKind::Constructor
        )
    }
}

/// Forest of scopes for one file. Scope 0 is always the module (root) scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    pub fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    /// Open a new scope whose parent is `parent`. Returns the new scope's id.
    pub fn open_scope(
        &mut self,
        kind: ScopeKind,
        parent: Option<ScopeId>,
        enclosing_range: Location,
    ) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            id,
            kind,
            parent_id: parent,
            enclosing_range,
            defs: Vec::new(),
            refs: Vec::new(),
            children: Vec::new(),
        });
        if let Some(parent_id) = parent {
            self.scopes[parent_id.0 as usize].children.push(id);
        }
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0 as usize]
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.iter()
    }

    pub fn attach_def(&mut self, scope: ScopeId, symbol: SymbolId) {
        self.scopes[scope.0 as usize].defs.push(symbol);
    }

    pub fn attach_ref(&mut self, scope: ScopeId, r: RefIndex) {
        self.scopes[scope.0 as usize].refs.push(r);
    }

    /// Walk from `start` outward to the module scope, yielding each scope
    /// in order (innermost first). This is the backbone of C5's scope walk.
    pub fn walk_to_root(&self, start: ScopeId) -> Vec<ScopeId> {
        let mut chain = Vec::new();
        let mut cur = Some(start);
        while let Some(id) = cur {
            chain.push(id);
            cur = self.scopes[id.0 as usize].parent_id;
        }
        chain
    }

    /// Find the innermost scope whose `enclosing_range` strictly contains
    /// `(line, col)`, starting the search at `from` and descending through
    /// children. Used by the scope builder to attach each definition/
    /// reference to the innermost currently-open scope.
    pub fn innermost_containing(&self, from: ScopeId, line: u32, col: u32) -> ScopeId {
        let mut current = from;
        loop {
            let scope = &self.scopes[current.0 as usize];
            let mut descended = false;
            for &child in &scope.children {
                if self.scopes[child.0 as usize]
                    .enclosing_range
                    .contains_point(line, col)
                {
                    current = child;
                    descended = true;
                    break;
                }
            }
            if !descended {
                return current;
            }
        }
    }

    /// The nearest ancestor (inclusive) scope of kind [`ScopeKind::Class`],
    /// used to resolve `self`/`this`/`cls` receiver heads (§4.6 step 1).
    pub fn enclosing_class(&self, start: ScopeId) -> Option<ScopeId> {
        self.walk_to_root(start)
            .into_iter()
            .find(|&id| self.scopes[id.0 as usize].kind == ScopeKind::Class)
    }

    /// The nearest ancestor (inclusive) scope of kind function/method,
    /// used by the resolver's shadowing rule (§4.5 step 1).
    pub fn enclosing_callable(&self, start: ScopeId) -> Option<ScopeId> {
        self.walk_to_root(start).into_iter().find(|&id| {
            matches!(
                self.scopes[id.0 as usize].kind,
                ScopeKind::Function | ScopeKind::Method
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::file_path;

    fn range(sl: u32, el: u32) -> Location {
        Location::new(file_path("a.ts"), sl, 0, el, 0)
    }

    #[test]
    fn nested_scopes_resolve_innermost_first() {
        let mut tree = ScopeTree::new();
        let root = tree.open_scope(ScopeKind::Module, None, range(0, 100));
        let func = tree.open_scope(ScopeKind::Function, Some(root), range(10, 50));
        let block = tree.open_scope(ScopeKind::Block, Some(func), range(20, 30));

        assert_eq!(tree.innermost_containing(root, 25, 0), block);
        assert_eq!(tree.innermost_containing(root, 15, 0), func);
        assert_eq!(tree.innermost_containing(root, 5, 0), root);
    }

    #[test]
    fn walk_to_root_orders_innermost_first() {
        let mut tree = ScopeTree::new();
        let root = tree.open_scope(ScopeKind::Module, None, range(0, 100));
        let func = tree.open_scope(ScopeKind::Function, Some(root), range(10, 50));
        let chain = tree.walk_to_root(func);
        assert_eq!(chain, vec![func, root]);
    }

    #[test]
    fn enclosing_class_skips_intermediate_function_scopes() {
        let mut tree = ScopeTree::new();
        let root = tree.open_scope(ScopeKind::Module, None, range(0, 100));
        let class = tree.open_scope(ScopeKind::Class, Some(root), range(5, 90));
        let method = tree.open_scope(ScopeKind::Method, Some(class), range(10, 20));
        let block = tree.open_scope(ScopeKind::Block, Some(method), range(12, 18));

        assert_eq!(tree.enclosing_class(block), Some(class));
        assert_eq!(tree.enclosing_callable(block), Some(method));
    }
}
