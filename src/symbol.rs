//! Definitions: the nodes of the semantic index (§3 "Definition").
//!
//! A [`Definition`] carries the fields every kind shares plus a
//! [`DefinitionData`] payload for the handful of kinds that need more
//! (methods/properties record their owner class, import bindings record
//! where they came from). This mirrors the teacher's `Symbol` +
//! kind-discriminated extra data, generalized to the variant-specific
//! fields §3 asks for instead of collapsing everything into one flat
//! struct.

use crate::types::{FilePath, Location, ScopeId, SymbolId, Visibility};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DefinitionKind {
    Function,
    Method,
    Constructor,
    Class,
    Interface,
    TypeAlias,
    Enum,
    Variable,
    Parameter,
    Property,
    NamespaceAlias,
    ImportBinding,
    TypeParameter,
}

impl DefinitionKind {
    /// Callables per the glossary: function, method, or constructor.
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            DefinitionKind::Function | DefinitionKind::Method | DefinitionKind::Constructor
        )
    }

    /// Kinds that §3's invariants require to carry a non-empty `enclosing_range`.
    pub fn requires_enclosing_range(&self) -> bool {
        matches!(
            self,
            DefinitionKind::Function
                | DefinitionKind::Method
                | DefinitionKind::Constructor
                | DefinitionKind::Class
        )
    }
}

/// Variant-specific payload. Most kinds carry none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DefinitionData {
    /// Methods and properties: the class that owns them.
    pub owner_class: Option<SymbolId>,
    /// Import bindings: the module string the binding came from.
    pub source_module: Option<Box<str>>,
    /// Import bindings: the foreign name being imported, if different from
    /// the local name (e.g. `import { Foo as Bar }`).
    pub imported_name: Option<Box<str>>,
    /// Import bindings: true for `import * as ns from '...'` / Python
    /// `import pkg.sub` style namespace handles.
    pub is_namespace: bool,
    /// Variables/properties: the bare class name a constructor-call RHS or
    /// declared type annotation hints at (§4.6 "Constructor type
    /// inference"). Kept as a name rather than a resolved `SymbolId` since
    /// the hinted class may live in a file not yet indexed when this
    /// definition is built; C6 resolves it against the project registry
    /// at query time.
    pub type_hint_name: Option<Box<str>>,
    /// Classes: the bare name of the single base class this one extends
    /// (`class X extends Y` / `class X(Y):`), used by C6 step 3's
    /// inheritance-chain walk. `None` for Rust, which has no class
    /// inheritance in this sense (§9 open question (c)).
    pub superclass_name: Option<Box<str>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    pub id: SymbolId,
    pub name: Box<str>,
    pub kind: DefinitionKind,
    pub location: Location,
    /// Set only for function/method/constructor/class kinds (§3 invariant).
    pub enclosing_range: Option<Location>,
    pub scope_id: ScopeId,
    pub visibility: Visibility,
    pub is_exported: bool,
    pub is_static: bool,
    pub data: DefinitionData,
}

impl Definition {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        file_path: FilePath,
        qualified_name: &str,
        name: impl Into<Box<str>>,
        kind: DefinitionKind,
        location: Location,
        scope_id: ScopeId,
    ) -> Self {
        let id = SymbolId::new(
            &file_path,
            qualified_name,
            location.start_line,
            location.start_col,
        );
        Self {
            id,
            name: name.into(),
            kind,
            location,
            enclosing_range: None,
            scope_id,
            visibility: Visibility::Public,
            is_exported: false,
            is_static: false,
            data: DefinitionData::default(),
        }
    }

    pub fn with_enclosing_range(mut self, range: Location) -> Self {
        self.enclosing_range = Some(range);
        self
    }

    pub fn with_visibility(mut self, v: Visibility) -> Self {
        self.visibility = v;
        self
    }

    pub fn exported(mut self) -> Self {
        self.is_exported = true;
        self
    }

    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn with_owner_class(mut self, owner: SymbolId) -> Self {
        self.data.owner_class = Some(owner);
        self
    }

    pub fn with_type_hint(mut self, hint: impl Into<Box<str>>) -> Self {
        self.data.type_hint_name = Some(hint.into());
        self
    }

    pub fn with_superclass(mut self, name: impl Into<Box<str>>) -> Self {
        self.data.superclass_name = Some(name.into());
        self
    }

    pub fn with_data(mut self, data: DefinitionData) -> Self {
        self.data = data;
        self
    }
}
