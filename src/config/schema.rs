//! Configuration schema definitions

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bundler::Format;

/// Contents of a `server.config.json` file.
///
/// Every key mirrors a command-line flag and acts as that flag's default.
/// Unknown keys are ignored so one file can be shared with other tools.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    /// Entry file, relative to the config file
    #[serde(default)]
    pub file: Option<String>,

    /// Output file
    #[serde(default, alias = "out")]
    pub dist: Option<String>,

    /// Environment file, relative to the config file
    #[serde(default)]
    pub env_file: Option<String>,

    #[serde(default)]
    pub watch: Option<bool>,

    #[serde(default)]
    pub production: Option<bool>,

    /// Output module format
    #[serde(default)]
    pub format: Option<Format>,

    /// Modules excluded from the bundle
    #[serde(default)]
    pub external: Option<Vec<String>>,

    /// Mark every manifest dependency as external
    #[serde(default)]
    pub external_dependencies: Option<bool>,

    /// Path to the dependency manifest
    #[serde(default)]
    pub package_json: Option<String>,

    /// Also define `process.env.*` entries
    #[serde(default)]
    pub bundle_env_vars: Option<bool>,

    /// Module aliases
    #[serde(default)]
    pub references: Vec<Reference>,

    /// Import prefix redirection rules, prefix to directory
    #[serde(default)]
    pub paths: BTreeMap<String, String>,

    /// Only apply `paths` outside production builds
    #[serde(default)]
    pub paths_dev_only: Option<bool>,
}

/// A `{ module, path }` alias entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Logical module name as written in import statements
    pub module: String,

    /// File the module name points at
    pub path: String,

    /// Accepted for compatibility, the alias table does not use it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<bool>,
}
