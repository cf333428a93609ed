//! Build arguments shared by every dispatch mode

use std::path::PathBuf;

use clap::Args;

use crate::bundler::Format;

/// Options that can also be given as defaults in the config file.
///
/// Every value is optional so the resolver can tell an explicit flag apart
/// from a config default. Boolean flags accept `--flag` or `--flag=false`.
#[derive(Args, Debug, Clone, Default)]
pub struct CliArguments {
    /// JSON config file whose keys act as defaults [default: server.config.json]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// .env file from which environment variables will be imported [default: .env]
    #[arg(long = "envFile", visible_alias = "env-file", value_name = "PATH")]
    pub env_file: Option<String>,

    /// Index file to be used as source
    #[arg(short = 'f', long, value_name = "PATH")]
    pub file: Option<String>,

    /// The compiled file name [default: dist/index.js]
    #[arg(short = 'd', long, short_alias = 'o', alias = "out", value_name = "PATH")]
    pub dist: Option<String>,

    /// Recompile and restart the app when code changes
    #[arg(short = 'w', long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub watch: Option<bool>,

    /// Minify, strip all comments (legal ones included) and don't run the app
    #[arg(short = 'p', long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub production: Option<bool>,

    /// The module format for the out file [default: esm]
    #[arg(long, value_enum)]
    pub format: Option<Format>,

    /// Mark a file or package as external; the import is preserved and
    /// evaluated at run time
    #[arg(short = 'e', long, alias = "ext", value_name = "MODULE", num_args = 1..)]
    pub external: Vec<String>,

    /// Mark every package.json dependency as external
    #[arg(
        long = "externalDependencies",
        visible_alias = "external-dependencies",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub external_dependencies: Option<bool>,

    /// Manifest used by --externalDependencies [default: ./package.json]
    #[arg(long = "packageJson", visible_alias = "package-json", value_name = "PATH")]
    pub package_json: Option<String>,

    /// Also bundle variables as process.env.*; import.meta.env.* is always bundled
    #[arg(
        long = "bundleEnvVars",
        visible_alias = "bundle-env-vars",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub bundle_env_vars: Option<bool>,

    /// Redirect imports starting with PREFIX to files under DIR
    #[arg(long, value_name = "PREFIX=DIR")]
    pub paths: Vec<String>,

    /// Skip --paths redirects in production builds
    #[arg(
        long = "pathsDevOnly",
        visible_alias = "paths-dev-only",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub paths_dev_only: Option<bool>,
}
