//! Bundler collaborator
//!
//! The resolver produces a [`BuildRequest`]; a [`Bundler`] turns it into an
//! output file. The production implementation drives the `esbuild`
//! executable, see [`EsbuildBundler`].

mod esbuild;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resolver::{DefineMap, RedirectRules};

pub use esbuild::EsbuildBundler;

/// Logical module name to file path
pub type AliasTable = BTreeMap<String, PathBuf>;

/// Output module format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Esm,
    Cjs,
    Iife,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Esm => "esm",
            Format::Cjs => "cjs",
            Format::Iife => "iife",
        })
    }
}

/// Target platform. Bundles are always built for Node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Node,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Node => f.write_str("node"),
        }
    }
}

/// Plugins attached to a build
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum PluginDescriptor {
    /// CommonJS interop: gives ESM bundles a working `require`
    CommonJs,

    /// Restart the bundled application after every build (watch mode)
    Serve,

    /// Import prefix redirection
    Redirect { rules: RedirectRules },
}

/// Everything the bundler needs for one build
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildRequest {
    pub entry_point: PathBuf,
    pub outfile: PathBuf,
    pub platform: Platform,
    pub format: Format,
    pub bundle: bool,
    pub define: DefineMap,
    pub alias: AliasTable,
    pub external: BTreeSet<String>,
    pub plugins: Vec<PluginDescriptor>,
}

impl BuildRequest {
    /// Redirection rules, if the redirect plugin is attached
    pub fn redirect_rules(&self) -> Option<&RedirectRules> {
        self.plugins.iter().find_map(|plugin| match plugin {
            PluginDescriptor::Redirect { rules } => Some(rules),
            _ => None,
        })
    }

    pub fn has_plugin(&self, plugin: &PluginDescriptor) -> bool {
        self.plugins.contains(plugin)
    }
}

/// Per-build switches chosen by the dispatch mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Minify identifiers, syntax and whitespace
    pub minify: bool,

    /// Drop every comment, legal ones included
    pub strip_legal_comments: bool,
}

impl BuildOptions {
    pub fn production() -> Self {
        Self {
            minify: true,
            strip_legal_comments: true,
        }
    }

    pub fn development() -> Self {
        Self::default()
    }
}

/// Information about a generated bundle
#[derive(Debug, Clone)]
pub struct BundleInfo {
    /// Output file path
    pub output_path: PathBuf,

    /// Bundle size in bytes
    pub size: u64,

    /// Wall time spent in the bundler
    pub duration: Duration,
}

/// Failures reported by a bundler
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("bundler executable not found: {binary} (install it with `npm i -g esbuild` or pass --esbuild)")]
    BinaryNotFound { binary: String },

    #[error("{bundler} exited with {status}\n{stderr}")]
    Failed {
        bundler: String,
        status: String,
        stderr: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A bundler the resolved request can be dispatched to
#[async_trait]
pub trait Bundler: Send + Sync {
    /// Bundler name for logging
    fn name(&self) -> &str;

    /// Run one build
    async fn build(
        &self,
        request: &BuildRequest,
        options: &BuildOptions,
    ) -> Result<BundleInfo, BundleError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_display_matches_cli_values() {
        for format in Format::value_variants() {
            let shown = format.to_string();
            let parsed = Format::from_str(&shown, false).unwrap();
            assert_eq!(&parsed, format);
        }
    }

    #[test]
    fn test_plugin_descriptor_serialization() {
        let json = serde_json::to_value(PluginDescriptor::CommonJs).unwrap();
        assert_eq!(json, serde_json::json!({ "name": "common-js" }));

        let json = serde_json::to_value(PluginDescriptor::Serve).unwrap();
        assert_eq!(json, serde_json::json!({ "name": "serve" }));
    }
}
