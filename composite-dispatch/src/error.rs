//! Error types for dispatch table generation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a generation run.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("cannot read module {module}: {source}")]
    ModuleRead {
        module: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("`{program}` failed on module {module} ({status}): {stderr}")]
    SymbolTool {
        module: PathBuf,
        program: String,
        status: String,
        stderr: String,
    },

    #[error("module {module} defines more than one symbol for `{key}`: {}", .candidates.join(", "))]
    AmbiguousSymbol {
        module: String,
        key: String,
        candidates: Vec<String>,
    },

    #[error("module {module} cannot be named `{ident}` in C: {reason}")]
    ModuleName {
        module: PathBuf,
        ident: String,
        reason: String,
    },

    #[error("no modules given")]
    NoModules,

    #[error("invalid configuration {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed artifact: {0}")]
    Artifact(String),
}

/// Result type for dispatch table generation.
pub type DispatchResult<T> = Result<T, DispatchError>;
