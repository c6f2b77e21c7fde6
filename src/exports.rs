//! Exports (§3 "Export").

use crate::types::SymbolId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Export {
    pub exported_name: Box<str>,
    /// Set for a direct export of a local definition; `None` for a
    /// re-export whose target is resolved through `source_module` instead.
    pub local_symbol_id: Option<SymbolId>,
    /// Set for `export { x } from './other'` and `export * from './other'`.
    pub source_module: Option<Box<str>>,
}

impl Export {
    pub fn local(exported_name: impl Into<Box<str>>, symbol: SymbolId) -> Self {
        Self {
            exported_name: exported_name.into(),
            local_symbol_id: Some(symbol),
            source_module: None,
        }
    }

    pub fn reexport(exported_name: impl Into<Box<str>>, source_module: impl Into<Box<str>>) -> Self {
        Self {
            exported_name: exported_name.into(),
            local_symbol_id: None,
            source_module: Some(source_module.into()),
        }
    }

    pub fn is_reexport(&self) -> bool {
        self.source_module.is_some()
    }
}
