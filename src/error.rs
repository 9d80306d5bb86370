//! Crate-level error types for aldoc diagnostics.

use std::path::PathBuf;

/// Environment failures only. Source text that does not parse, or
/// documentation that is malformed, never produces an error: the model
/// builder and findings engine absorb those and carry on.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A requested source file does not exist on disk.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The config file parsed but holds a value outside its allowed range.
    #[error("invalid config: {reason}")]
    InvalidConfig {
        /// Which value was rejected and why.
        reason: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON serialization of command output failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped serialization error.
        #[from]
        serde_json::Error,
    ),

    /// The requested line holds no object or procedure declaration.
    #[error("no declaration at {}:{line}", file.display())]
    NoDeclaration {
        /// File that was searched.
        file: PathBuf,
        /// One-based line number.
        line: usize,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// The file watcher could not be set up.
    #[error("watch: {reason}")]
    Watch {
        /// Description of the watcher failure.
        reason: String,
    },

    /// No `app.json` or `.aldoc.toml` above the start directory.
    #[error("no workspace found above {}", start.display())]
    WorkspaceNotFound {
        /// Directory the search started from.
        start: PathBuf,
    },
}


