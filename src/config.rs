//! Layered configuration: defaults -> `coderef.toml` -> `CODEREF_` env vars.
//!
//! # Environment variables
//!
//! Prefixed with `CODEREF_`, double underscores separate nested levels:
//! - `CODEREF_INDEXING__PARALLEL_THREADS=8` sets `indexing.parallel_threads`
//! - `CODEREF_LOGGING__DEFAULT=debug` sets `logging.default`

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexingConfig {
    /// Folder names skipped entirely during `initialize`'s directory walk,
    /// in addition to whatever `excluded_folders` the caller passes.
    #[serde(default = "default_excluded_folders")]
    pub default_excluded_folders: Vec<String>,

    /// Upper bound on the per-file indexing worker pool used while
    /// `initialize` parallelizes across files (§5: "may parallelize
    /// per-file indexing across files ... must join before snapshotting").
    #[serde(default = "default_parallel_threads")]
    pub parallel_threads: usize,

    /// §6 file size limit: files larger than this are indexed `partial`.
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: usize,

    #[serde(default = "default_true")]
    pub include_tests: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub default: String,
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_excluded_folders() -> Vec<String> {
    vec![
        "target".into(),
        "node_modules".into(),
        ".git".into(),
        "dist".into(),
        "build".into(),
        "__pycache__".into(),
        ".venv".into(),
    ]
}

fn default_parallel_threads() -> usize {
    num_cpus::get()
}

fn default_max_file_size() -> usize {
    32 * 1024
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            indexing: IndexingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            default_excluded_folders: default_excluded_folders(),
            parallel_threads: default_parallel_threads(),
            max_file_size_bytes: default_max_file_size(),
            include_tests: default_true(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load defaults, then `./coderef.toml` if present, then `CODEREF_`-prefixed
    /// environment variable overrides.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file("coderef.toml"))
            .merge(Env::prefixed("CODEREF_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
    }

    pub fn load_from(path: &PathBuf) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("CODEREF_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
    }
}
