//! Configuration handling for Serverpack
//!
//! Loads the optional `server.config.json` file whose keys act as defaults
//! for the command-line flags.

mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::resolver::ResolveError;

pub use schema::*;

/// Config file looked up when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "server.config.json";

/// A loaded (or absent) config file
#[derive(Debug, Clone)]
pub struct Config {
    /// Parsed contents, empty when no file was located
    pub file: FileConfig,

    /// Path of the file that was read
    pub source: Option<PathBuf>,

    /// Directory relative paths resolve against: the config file's
    /// directory when one was located, the working directory otherwise
    pub root: PathBuf,
}

impl Config {
    /// Configuration used when no file was located
    pub fn empty(cwd: &Path) -> Self {
        Self {
            file: FileConfig::default(),
            source: None,
            root: cwd.to_path_buf(),
        }
    }

    /// Load a config file.
    ///
    /// When `explicit` is false a missing or unparsable file degrades to an
    /// empty configuration. An explicitly requested file must exist and
    /// parse.
    pub fn load(cwd: &Path, path: &Path, explicit: bool) -> Result<Self, ResolveError> {
        let canonical_path = cwd.join(path);

        let content = match fs::read_to_string(&canonical_path) {
            Ok(content) => content,
            Err(e) if explicit => {
                return Err(ResolveError::ConfigNotFound {
                    path: canonical_path,
                    reason: e.to_string(),
                })
            }
            Err(e) => {
                debug!("No config file at {} ({})", canonical_path.display(), e);
                return Ok(Self::empty(cwd));
            }
        };

        let file: FileConfig = match serde_json::from_str(&content) {
            Ok(file) => file,
            Err(e) if explicit => {
                return Err(ResolveError::InvalidConfig {
                    path: canonical_path,
                    reason: e.to_string(),
                })
            }
            Err(e) => {
                warn!("Ignoring unparsable {}: {}", canonical_path.display(), e);
                return Ok(Self::empty(cwd));
            }
        };

        // Set root directory to the directory containing the config file
        let root = canonical_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| cwd.to_path_buf());

        debug!("Loaded config from {}", canonical_path.display());

        Ok(Self {
            file,
            source: Some(canonical_path),
            root,
        })
    }

    /// Whether a config file was actually read
    pub fn is_located(&self) -> bool {
        self.source.is_some()
    }

    /// Resolve a path from the config or command line against [`Config::root`]
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }
}
