//! Error types for the code intelligence engine.
//!
//! Structured `thiserror` variants matching §7's taxonomy. Per §7's
//! propagation policy, these only ever surface at `initialize`/
//! `update_file`/`remove_file` — every read-side query method is
//! infallible and returns `Option`/empty collections instead.

use crate::types::SymbolId;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {language} file '{path}': {reason}")]
    ParseError {
        path: PathBuf,
        language: String,
        reason: String,
    },

    #[error("Unsupported file extension '{extension}' for file '{path}'")]
    UnsupportedLanguage { path: PathBuf, extension: String },

    #[error("File '{path}' is not present in the registry")]
    FileNotFound { path: PathBuf },

    #[error("Symbol '{id}' was not found in the registry")]
    SymbolNotFound { id: SymbolId },

    #[error("Invalid configuration: {reason}")]
    ConfigError { reason: String },
}

impl IndexError {
    /// Short, user-facing recovery hints, in the spirit of a production
    /// engine surfacing actionable next steps rather than a bare message.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::FileRead { .. } => vec![
                "Check that the file exists and you have read permissions",
            ],
            Self::UnsupportedLanguage { .. } => vec![
                "Only .ts/.tsx/.js/.jsx/.mjs/.cjs, .py, and .rs are indexed",
            ],
            Self::FileNotFound { .. } => vec!["Call update_file(path, ...) before querying it"],
            _ => vec![],
        }
    }
}

pub type IndexResult<T> = Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_language_has_a_hint() {
        let err = IndexError::UnsupportedLanguage {
            path: PathBuf::from("a.md"),
            extension: "md".into(),
        };
        assert!(!err.recovery_suggestions().is_empty());
    }
}
