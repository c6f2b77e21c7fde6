//! Core location and identifier types shared by every other module.
//!
//! These are the primitives the rest of the engine is built on: a
//! [`Location`] pins a span of source text to a file, a [`SymbolId`] names a
//! definition uniquely across the whole project, and [`ScopeId`]/[`RefIndex`]
//! are cheap arena indices local to a single [`crate::file_index::FileIndex`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// An interned, cheaply-cloned file path string.
///
/// Every [`Location`] and [`SymbolId`] embeds one of these, so sharing the
/// backing allocation across a file's hundreds of symbols matters.
pub type FilePath = Arc<str>;

pub fn file_path(s: impl AsRef<str>) -> FilePath {
    Arc::from(s.as_ref())
}

/// A span of source text: 1-based lines, 0-based columns, end-exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file_path: FilePath,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Location {
    pub fn new(
        file_path: FilePath,
        start_line: u32,
        start_col: u32,
        end_line: u32,
        end_col: u32,
    ) -> Self {
        Self {
            file_path,
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// True if `point` falls within this range (end-exclusive on columns,
    /// inclusive on the end line itself so a single-line range of zero
    /// width never contains anything).
    pub fn contains_point(&self, line: u32, col: u32) -> bool {
        if line < self.start_line || line > self.end_line {
            return false;
        }
        if line == self.start_line && col < self.start_col {
            return false;
        }
        if line == self.end_line && col >= self.end_col {
            return false;
        }
        true
    }

    /// True if `self` is strictly inside `other` (used to check P1: every
    /// reference location is strictly inside its scope's enclosing range).
    pub fn strictly_inside(&self, other: &Location) -> bool {
        if self.file_path != other.file_path {
            return false;
        }
        let starts_after = (self.start_line, self.start_col) >= (other.start_line, other.start_col);
        let ends_before = (self.end_line, self.end_col) <= (other.end_line, other.end_col);
        starts_after && ends_before
    }
}

/// Stable, collision-free identifier of a definition.
///
/// Format: `<file_path>#<qualified_name>@<start_line>:<start_col>`. Two
/// definitions in the same file never share an id even if they share a
/// name (the location disambiguates them); different files defining the
/// same qualified name get distinct ids (resolution picks among them).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolId(Arc<str>);

impl SymbolId {
    pub fn new(file_path: &str, qualified_name: &str, start_line: u32, start_col: u32) -> Self {
        Self(Arc::from(format!(
            "{file_path}#{qualified_name}@{start_line}:{start_col}"
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The file path component, re-derived by splitting on the first `#`.
    pub fn file_path(&self) -> &str {
        self.0.split('#').next().unwrap_or(&self.0)
    }

    /// The qualified name component (between `#` and the last `@`).
    pub fn qualified_name(&self) -> &str {
        let after_hash = self.0.split_once('#').map(|(_, rest)| rest).unwrap_or(&self.0);
        after_hash.rsplit_once('@').map(|(name, _)| name).unwrap_or(after_hash)
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Arena index of a [`crate::scope::Scope`] within one file's scope tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

/// Index of a [`crate::reference::Reference`] within one file's `refs` vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RefIndex(pub u32);

/// Declared or inferred visibility of a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Private,
    /// `pub(crate)` in Rust, package-private in other languages.
    Internal,
    Protected,
}
