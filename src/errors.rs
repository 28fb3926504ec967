//! Custom error types for the threatgraph analysis engine.
//!
//! Separates structural model errors (raised while building or walking the
//! graph), configuration errors (broken rule catalogs, bad tracking entries)
//! and plain I/O or decoding failures.

use std::path::PathBuf;

/// The main error type for threatgraph operations.
#[derive(Debug, thiserror::Error)]
pub enum ThreatGraphError {
    /// I/O error (file read/write, permissions, etc.)
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    /// Regex compilation error
    #[error("Invalid regex pattern '{pattern}': {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Structural model error (dangling reference, cycle, duplicate ID)
    #[error("Model error in {context}: {message}")]
    Model { context: String, message: String },

    /// Configuration error detected before analysis starts
    #[error("Configuration error in {context}: {message}")]
    Config { context: String, message: String },

    /// A textual value that does not name any known variant
    #[error("Unknown {kind} value '{value}'")]
    UnknownValue { kind: &'static str, value: String },

    /// Two loaded rules share one category ID
    #[error("Duplicate risk category ID '{0}'")]
    DuplicateCategory(String),

    /// Risk-tracking patterns that matched no generated risk
    #[error("Risk tracking entries match no generated risk: {}", .0.join(", "))]
    OrphanedTracking(Vec<String>),

    /// A single rule failed while generating risks
    #[error("Rule '{rule}' failed: {message}")]
    Rule { rule: String, message: String },

    /// Thread pool initialization error
    #[error("Failed to initialize thread pool: {0}")]
    ThreadPool(String),

    /// Tokio task join error
    #[error("Async task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Result type alias using ThreatGraphError
pub type ThreatGraphResult<T> = Result<T, ThreatGraphError>;

impl ThreatGraphError {
    /// Create an I/O error with path context
    pub fn io(source: std::io::Error, path: impl Into<Option<PathBuf>>) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a regex error with pattern context
    pub fn regex(source: regex::Error, pattern: impl Into<String>) -> Self {
        Self::Regex {
            pattern: pattern.into(),
            source,
        }
    }

    /// Create a structural model error
    pub fn model(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Model {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a rule failure
    pub fn rule(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rule {
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// True for errors that must stop a run before any rule executes
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::DuplicateCategory(_)
                | Self::UnknownValue { .. }
                | Self::OrphanedTracking(_)
        )
    }
}

/// Convert from raw I/O errors (without path context)
impl From<std::io::Error> for ThreatGraphError {
    fn from(source: std::io::Error) -> Self {
        Self::Io { path: None, source }
    }
}
