//! Fatal configuration errors

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("missing required argument: --file (index file to be used as source)")]
    MissingEntry,

    #[error("config not found: {} ({reason})", path.display())]
    ConfigNotFound { path: PathBuf, reason: String },

    #[error("invalid config file {}: {reason}", path.display())]
    InvalidConfig { path: PathBuf, reason: String },

    #[error("manifest not found: {} ({reason})", path.display())]
    ManifestNotFound { path: PathBuf, reason: String },

    #[error("invalid path redirect `{0}`, expected PREFIX=DIR")]
    InvalidRedirect(String),
}
