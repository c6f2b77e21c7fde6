//! Imports (§3 "Import").

use crate::symbol::{Definition, DefinitionData, DefinitionKind};
use crate::types::{FilePath, Location, ScopeId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImportKind {
    Named,
    Namespace,
    Default,
    SideEffect,
    WildcardReexport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportBindingSpec {
    /// Name as it appears in the source module, if different from the
    /// local binding (named imports without a rename have `None`).
    pub imported_name: Option<Box<str>>,
    pub local_name: Box<str>,
    pub is_type_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    pub source_module: Box<str>,
    pub kind: ImportKind,
    pub bindings: Vec<ImportBindingSpec>,
    /// The import statement's own location, used to synthesize the
    /// `import_binding` definition §3 requires in the module scope for
    /// every binding (all bindings on one statement share this location;
    /// distinct bindings still get distinct `SymbolId`s via their
    /// qualified name).
    pub location: Location,
}

impl Import {
    pub fn new(source_module: impl Into<Box<str>>, kind: ImportKind, location: Location) -> Self {
        Self {
            source_module: source_module.into(),
            kind,
            bindings: Vec::new(),
            location,
        }
    }

    pub fn with_binding(mut self, binding: ImportBindingSpec) -> Self {
        self.bindings.push(binding);
        self
    }
}

impl ImportBindingSpec {
    pub fn named(local_name: impl Into<Box<str>>) -> Self {
        Self {
            imported_name: None,
            local_name: local_name.into(),
            is_type_only: false,
        }
    }

    pub fn renamed(imported_name: impl Into<Box<str>>, local_name: impl Into<Box<str>>) -> Self {
        Self {
            imported_name: Some(imported_name.into()),
            local_name: local_name.into(),
            is_type_only: false,
        }
    }

    pub fn type_only(mut self) -> Self {
        self.is_type_only = true;
        self
    }

    /// The name to search a foreign module's export table for.
    pub fn foreign_name(&self) -> &str {
        self.imported_name.as_deref().unwrap_or(&self.local_name)
    }

    /// The `import_binding` definition §3 requires every binding to produce
    /// in its module's root scope, carrying enough of the import's own data
    /// (source module, foreign name, namespace-ness) for C5/C6 to redirect
    /// resolution through the project registry without re-reading the
    /// owning `Import`.
    pub fn to_definition(
        &self,
        file_path: FilePath,
        module: &str,
        kind: ImportKind,
        location: Location,
        scope: ScopeId,
    ) -> Definition {
        let data = DefinitionData {
            source_module: Some(module.into()),
            imported_name: self.imported_name.clone(),
            is_namespace: matches!(kind, ImportKind::Namespace),
            ..DefinitionData::default()
        };
        Definition::new(
            file_path,
            &self.local_name,
            self.local_name.clone(),
            DefinitionKind::ImportBinding,
            location,
            scope,
        )
        .with_data(data)
    }
}
