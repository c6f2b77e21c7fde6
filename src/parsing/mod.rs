//! Language profiles (C1): the only place grammar-specific knowledge lives.
//!
//! The rest of the engine is polymorphic over [`LanguageProfile`] — no
//! sibling module ever matches on a tree-sitter node kind string itself.
//! Each profile bundles a grammar binding, a fixed set of named
//! tree-sitter queries whose captures follow the schema in
//! [`capture::CaptureSchema`], a dispatch table from capture name to
//! handler, a receiver-chain flattener, and doc/signature/test-file
//! helpers.

pub mod capture;
mod python;
mod rust_profile;
mod typescript;

pub use capture::CaptureSchema;

use crate::file_index::FileIndexBuilder;
use crate::reference::ReceiverChain;
use crate::types::{FilePath, Location};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tree_sitter::{Node, Query};

/// Supported languages (§6 "Supported languages").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    TypeScript,
    JavaScript,
    Python,
    Rust,
}

impl Language {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "ts" | "tsx" => Some(Language::TypeScript),
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            "py" | "pyi" => Some(Language::Python),
            "rs" => Some(Language::Rust),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(|e| e.to_str()).and_then(Self::from_extension)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::TypeScript => "TypeScript",
            Language::JavaScript => "JavaScript",
            Language::Python => "Python",
            Language::Rust => "Rust",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single named tree-sitter query plus its compiled form.
pub struct CompiledQuery {
    pub name: &'static str,
    pub query: Query,
}

/// The per-language C1 contract. The indexer (C3) drives this: it runs
/// every `queries()` entry over the parsed tree and, for every capture the
/// query produces, calls [`LanguageProfile::handle_capture`] with the
/// capture's schema-classified name so the handler can emit the right
/// definition/reference/import/export event.
pub trait LanguageProfile: Send + Sync {
    fn language(&self) -> Language;

    /// Parse source into a tree-sitter tree. Never panics on malformed
    /// input — tree-sitter's error-recovery produces a partial tree that
    /// the caller indexes best-effort (§4.3's failure model).
    fn parse(&self, source: &str) -> Option<tree_sitter::Tree>;

    /// The fixed, named query set for this language (§4.1).
    fn queries(&self) -> &[CompiledQuery];

    /// Dispatch a single capture to its handler. `capture_name` is one of
    /// the schema categories in [`capture::CaptureSchema`]. Implementors
    /// emit events into `builder` (definitions, references, imports,
    /// exports) and return nothing — failures are recorded as diagnostics
    /// on the builder, never propagated as `Result`.
    fn handle_capture(
        &self,
        capture_name: &str,
        node: Node,
        source: &str,
        builder: &mut FileIndexBuilder,
    );

    /// Flatten a receiver expression (`a.b.c`, `a::b::c`, ...) into an
    /// ordered identifier chain with a classified head (§4.1, §4.6).
    fn receiver_chain(&self, node: Node, source: &str) -> Option<ReceiverChain>;

    /// Extract the literal signature text of a definition node.
    fn signature_text(&self, def_node: Node, source: &str) -> Option<Box<str>>;

    /// Extract the leading documentation comment/docstring of a definition.
    fn docstring(&self, def_node: Node, source: &str) -> Option<Box<str>>;

    /// Heuristic test-file detection (collaborator concern; the core only
    /// exposes it so consumers can filter without re-implementing it).
    fn is_test_file(&self, path: &Path) -> bool;
}

/// Build a [`Location`] from a tree-sitter node's byte span, converting its
/// 0-based row to the 1-based line numbering the rest of the engine uses.
pub fn node_location(file_path: &FilePath, node: Node) -> Location {
    let start = node.start_position();
    let end = node.end_position();
    Location::new(
        file_path.clone(),
        start.row as u32 + 1,
        start.column as u32,
        end.row as u32 + 1,
        end.column as u32,
    )
}

/// The literal UTF-8 text a node spans.
pub fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// Construct the profile for `language`. Profiles are stateless and
/// cheap to construct (queries are compiled once behind `once_cell`
/// statics inside each profile module), so the factory returns a fresh
/// boxed trait object per call rather than caching instances itself.
pub fn profile_for(language: Language) -> Box<dyn LanguageProfile> {
    match language {
        Language::TypeScript | Language::JavaScript => {
            Box::new(typescript::TypeScriptProfile::new(language))
        }
        Language::Python => Box::new(python::PythonProfile::new()),
        Language::Rust => Box::new(rust_profile::RustProfile::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_detection_covers_every_supported_extension() {
        for (ext, lang) in [
            ("ts", Language::TypeScript),
            ("tsx", Language::TypeScript),
            ("js", Language::JavaScript),
            ("jsx", Language::JavaScript),
            ("mjs", Language::JavaScript),
            ("cjs", Language::JavaScript),
            ("py", Language::Python),
            ("pyi", Language::Python),
            ("rs", Language::Rust),
        ] {
            assert_eq!(Language::from_extension(ext), Some(lang));
        }
        assert_eq!(Language::from_extension("md"), None);
    }

    #[test]
    fn from_path_reads_the_extension() {
        assert_eq!(
            Language::from_path(Path::new("src/main.rs")),
            Some(Language::Rust)
        );
        assert_eq!(Language::from_path(Path::new("README")), None);
    }
}
