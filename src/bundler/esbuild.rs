//! `esbuild` invocation
//!
//! Translates a [`BuildRequest`] into an esbuild command line and runs it as a
//! child process. Build errors are reported with esbuild's own stderr.

use std::io::ErrorKind;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{AliasTable, BuildOptions, BuildRequest, BundleError, BundleInfo, Bundler, Format, PluginDescriptor};

/// Gives ESM output a global `require` for CommonJS dependencies that call it.
/// Binds no top-level `require`, so bundled code may declare its own.
const REQUIRE_SHIM: &str = "import { createRequire as __serverpackCreateRequire } from 'module'; \
     globalThis.require ??= __serverpackCreateRequire(import.meta.url);";

/// Bundler backed by the `esbuild` executable
#[derive(Debug, Clone)]
pub struct EsbuildBundler {
    binary: String,
}

impl EsbuildBundler {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Build the esbuild argument list.
    ///
    /// `redirects` holds aliases discovered by the redirect plugin; explicit
    /// aliases from the request take precedence over them.
    pub fn command_args(
        &self,
        request: &BuildRequest,
        options: &BuildOptions,
        redirects: &AliasTable,
    ) -> Vec<String> {
        let mut args = vec![request.entry_point.display().to_string()];

        if request.bundle {
            args.push("--bundle".to_string());
        }
        args.push(format!("--outfile={}", request.outfile.display()));
        args.push(format!("--platform={}", request.platform));
        args.push(format!("--format={}", request.format));

        for (name, value) in request.define.iter() {
            args.push(format!("--define:{}={}", name, value));
        }

        let mut aliases = redirects.clone();
        aliases.extend(request.alias.iter().map(|(k, v)| (k.clone(), v.clone())));
        for (module, path) in &aliases {
            args.push(format!("--alias:{}={}", module, path.display()));
        }

        for name in &request.external {
            args.push(format!("--external:{}", name));
        }

        if request.format == Format::Esm && request.has_plugin(&PluginDescriptor::CommonJs) {
            args.push(format!("--banner:js={}", REQUIRE_SHIM));
        }

        if options.minify {
            args.push("--minify".to_string());
        }
        if options.strip_legal_comments {
            args.push("--legal-comments=none".to_string());
        }

        args
    }
}

#[async_trait]
impl Bundler for EsbuildBundler {
    fn name(&self) -> &str {
        "esbuild"
    }

    async fn build(
        &self,
        request: &BuildRequest,
        options: &BuildOptions,
    ) -> Result<BundleInfo, BundleError> {
        let start = Instant::now();

        let redirects = match request.redirect_rules() {
            Some(rules) => rules.collect_aliases(&request.entry_point),
            None => AliasTable::new(),
        };
        let args = self.command_args(request, options, &redirects);
        debug!("Running {} {}", self.binary, args.join(" "));

        let output = Command::new(&self.binary)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => BundleError::BinaryNotFound {
                    binary: self.binary.clone(),
                },
                _ => BundleError::Io(e),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(BundleError::Failed {
                bundler: self.name().to_string(),
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }
        debug!("esbuild: {}", stderr.trim());

        let size = tokio::fs::metadata(&request.outfile).await?.len();

        Ok(BundleInfo {
            output_path: request.outfile.clone(),
            size,
            duration: start.elapsed(),
        })
    }
}
