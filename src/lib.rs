//! `coderef`: a multi-language static code intelligence engine.
//!
//! Given a project root containing TypeScript/JavaScript, Python, and Rust
//! source, [`Engine`] builds a per-file semantic index (definitions,
//! references, imports, exports, scopes), a project-wide resolution
//! registry binding references to definitions across files, and a call
//! graph from which entry points can be enumerated. See `SPEC_FULL.md` for
//! the full component breakdown (C1-C8).

pub mod callgraph;
pub mod config;
pub mod engine;
pub mod error;
pub mod exports;
pub mod file_index;
pub mod imports;
pub mod indexing;
pub mod logging;
pub mod module_path;
pub mod parsing;
pub mod reference;
pub mod registry;
pub mod resolver;
pub mod scope;
pub mod symbol;
pub mod types;

pub use callgraph::{CallGraph, CallGraphNode, CallReference};
pub use config::Settings;
pub use engine::{Engine, ProjectView, SourceContext, Stats};
pub use error::{IndexError, IndexResult};
pub use file_index::{Diagnostic, DiagnosticKind, FileIndex};
pub use parsing::Language;
pub use reference::{Reference, ReferenceKind, UnresolvedCategory};
pub use registry::{ProjectRegistry, ProjectSnapshot};
pub use resolver::{ResolutionOutcome, ResolutionRank};
pub use symbol::{Definition, DefinitionKind};
pub use types::{FilePath, Location, ScopeId, SymbolId, Visibility};
