//! Build configuration resolution
//!
//! Turns command-line arguments and the optional config file into a single
//! [`BuildRequest`] plus the [`Dispatch`] mode that decides how the bundler
//! is driven.

pub mod env;
mod error;
mod imports;
pub mod manifest;
mod redirect;

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::bundler::{AliasTable, BuildOptions, BuildRequest, Format, Platform, PluginDescriptor};
use crate::cli::CliArguments;
use crate::config::{Config, FileConfig, DEFAULT_CONFIG_FILE};
use crate::utils::normalize_path;

pub use env::DefineMap;
pub use error::ResolveError;
pub use manifest::{Manifest, DEFAULT_MANIFEST};
pub use redirect::{probe, Redirect, RedirectRule, RedirectRules, Strategy};

/// Env file read when neither flag nor config names one
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Output file when neither flag nor config names one
pub const DEFAULT_DIST: &str = "dist/index.js";

/// How the resolved request is handed to the bundler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Minified one-shot build
    Production,
    /// Rebuild on change and keep the app running
    Watch,
    /// Plain one-shot build
    Development,
}

impl Dispatch {
    /// Production wins over watch
    pub fn from_flags(production: bool, watch: bool) -> Self {
        match (production, watch) {
            (true, _) => Dispatch::Production,
            (false, true) => Dispatch::Watch,
            (false, false) => Dispatch::Development,
        }
    }

    pub fn build_options(self) -> BuildOptions {
        match self {
            Dispatch::Production => BuildOptions::production(),
            Dispatch::Watch | Dispatch::Development => BuildOptions::development(),
        }
    }
}

/// Result of resolution
#[derive(Debug, Clone)]
pub struct Resolved {
    pub request: BuildRequest,
    pub dispatch: Dispatch,
}

/// Command-line values with config-file defaults merged underneath
#[derive(Debug)]
struct Settings {
    file: Option<String>,
    dist: String,
    env_file: String,
    watch: bool,
    production: bool,
    format: Format,
    external: Vec<String>,
    external_dependencies: bool,
    package_json: Option<String>,
    bundle_env_vars: bool,
    paths_dev_only: bool,
}

impl Settings {
    fn merge(args: &CliArguments, file: &FileConfig) -> Self {
        let flag = |cli: Option<bool>, config: Option<bool>| cli.or(config).unwrap_or(false);

        let external = if args.external.is_empty() {
            file.external.clone().unwrap_or_default()
        } else {
            args.external.clone()
        };

        Self {
            file: args.file.clone().or_else(|| file.file.clone()),
            dist: args
                .dist
                .clone()
                .or_else(|| file.dist.clone())
                .unwrap_or_else(|| DEFAULT_DIST.to_string()),
            env_file: args
                .env_file
                .clone()
                .or_else(|| file.env_file.clone())
                .unwrap_or_else(|| DEFAULT_ENV_FILE.to_string()),
            watch: flag(args.watch, file.watch),
            production: flag(args.production, file.production),
            format: args.format.or(file.format).unwrap_or_default(),
            external,
            external_dependencies: flag(args.external_dependencies, file.external_dependencies),
            package_json: args.package_json.clone().or_else(|| file.package_json.clone()),
            bundle_env_vars: flag(args.bundle_env_vars, file.bundle_env_vars),
            paths_dev_only: flag(args.paths_dev_only, file.paths_dev_only),
        }
    }
}

/// Resolves arguments against the file system rooted at a working directory
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    cwd: PathBuf,
}

impl ConfigResolver {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    /// Resolve `args` into a build request
    pub fn resolve(&self, args: &CliArguments) -> Result<Resolved, ResolveError> {
        let config = match &args.config {
            Some(path) => Config::load(&self.cwd, path, true)?,
            None => Config::load(&self.cwd, Path::new(DEFAULT_CONFIG_FILE), false)?,
        };

        let settings = Settings::merge(args, &config.file);
        let file = settings.file.as_deref().ok_or(ResolveError::MissingEntry)?;
        debug!("Resolved settings: {:?}", settings);

        // Entry and env file follow the config file, the output stays put
        let entry_point = config.resolve_path(file);
        let env_file = config.resolve_path(&settings.env_file);
        let outfile = self.cwd.join(&settings.dist);

        let entries = env::load(&env_file);
        let define = env::define_map(&entries, settings.production, settings.bundle_env_vars);
        if !entries.is_empty() {
            info!("Loaded {} variable(s) from {}", entries.len(), env_file.display());
        }

        let manifest = if settings.external_dependencies {
            let default = self.cwd.join(DEFAULT_MANIFEST);
            let (path, explicit) = match &settings.package_json {
                // Naming the default path explicitly is still the default
                Some(path) => {
                    let path = self.cwd.join(path);
                    let explicit = normalize_path(&path) != normalize_path(&default);
                    (path, explicit)
                }
                None => (default, false),
            };
            Some(Manifest::load(&path, explicit)?)
        } else {
            None
        };
        let external = manifest::externals(&settings.external, manifest.as_ref());

        let alias = alias_table(&config);
        let rules = self.redirect_rules(args, &config)?;
        let dispatch = Dispatch::from_flags(settings.production, settings.watch);

        let mut plugins = vec![PluginDescriptor::CommonJs];
        if dispatch == Dispatch::Watch {
            plugins.push(PluginDescriptor::Serve);
        }
        if !rules.is_empty() {
            if settings.paths_dev_only && settings.production {
                debug!("Skipping path redirects for production build");
            } else {
                plugins.push(PluginDescriptor::Redirect { rules });
            }
        }

        let request = BuildRequest {
            entry_point,
            outfile,
            platform: Platform::Node,
            format: settings.format,
            bundle: true,
            define,
            alias,
            external,
            plugins,
        };

        Ok(Resolved { request, dispatch })
    }

    /// Command-line rules replace the config's `paths` table
    fn redirect_rules(&self, args: &CliArguments, config: &Config) -> Result<RedirectRules, ResolveError> {
        let rules: Vec<RedirectRule> = if args.paths.is_empty() {
            config
                .file
                .paths
                .iter()
                .map(|(prefix, dir)| RedirectRule::new(prefix.as_str(), config.resolve_path(dir)))
                .collect()
        } else {
            args.paths
                .iter()
                .map(|spec| RedirectRule::parse(spec, &self.cwd))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(RedirectRules::new(rules))
    }
}

/// Alias table from the config's `references`, later entries win
fn alias_table(config: &Config) -> AliasTable {
    config
        .file
        .references
        .iter()
        .map(|reference| (reference.module.clone(), config.resolve_path(&reference.path)))
        .collect()
}
