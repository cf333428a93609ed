//! Command-line interface for Serverpack
//!
//! A single command: resolve the build configuration, then dispatch it as a
//! production build, a development build, or a watch session.

mod args;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::bundler::{BuildRequest, Bundler, EsbuildBundler};
use crate::resolver::{ConfigResolver, Dispatch, Resolved};
use crate::utils::{format_duration, format_size, relative_path};
use crate::watch::WatchContext;

pub use args::CliArguments;

/// Serverpack - bundle Node server applications with esbuild
#[derive(Parser, Debug)]
#[command(name = "serverpack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub args: CliArguments,

    /// esbuild executable
    #[arg(long, env = "ESBUILD_BINARY", default_value = "esbuild")]
    pub esbuild: String,

    /// Node executable used to run the app in watch mode
    #[arg(long, env = "NODE_BINARY", default_value = "node")]
    pub node: String,

    /// Print the resolved build request as JSON and exit
    #[arg(long = "dryRun", visible_alias = "dry-run")]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<()> {
        let cwd = std::env::current_dir().context("Failed to read working directory")?;
        let Resolved { request, dispatch } = ConfigResolver::new(&cwd).resolve(&self.args)?;

        if self.dry_run {
            println!("{}", serde_json::to_string_pretty(&request)?);
            return Ok(());
        }

        print_banner();

        let bundler = Arc::new(EsbuildBundler::new(self.esbuild.as_str()));
        info!("Dispatching {:?} build of {}", dispatch, request.entry_point.display());

        match dispatch {
            Dispatch::Watch => WatchContext::new(bundler, request, &self.node).watch().await,
            Dispatch::Production | Dispatch::Development => {
                build_once(bundler.as_ref(), &request, dispatch, &cwd).await
            }
        }
    }
}

/// One-shot build with a spinner and a size summary
async fn build_once(
    bundler: &dyn Bundler,
    request: &BuildRequest,
    dispatch: Dispatch,
    cwd: &std::path::Path,
) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.blue} {msg}")?);
    spinner.set_message(format!(
        "Bundling {}{}",
        relative_path(cwd, &request.entry_point),
        if dispatch == Dispatch::Production { " for production" } else { "" }
    ));
    spinner.enable_steady_tick(Duration::from_millis(80));

    let result = bundler.build(request, &dispatch.build_options()).await;
    spinner.finish_and_clear();
    let bundle = result?;

    eprintln!(
        "{} Built {} {} in {}\n",
        "✓".green().bold(),
        relative_path(cwd, &bundle.output_path).cyan(),
        format_size(bundle.size).dimmed(),
        format_duration(bundle.duration)
    );

    Ok(())
}

/// Print the Serverpack banner
fn print_banner() {
    eprintln!(
        "\n{} {} {}\n",
        "⚡".cyan(),
        "Serverpack".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::Format;

    #[test]
    fn test_parse_aliases_and_flags() {
        let cli = Cli::try_parse_from([
            "serverpack",
            "-f",
            "src/index.ts",
            "-o",
            "build/app.js",
            "-w",
            "--format",
            "cjs",
            "-e",
            "pg",
            "--ext",
            "sharp",
            "--envFile",
            ".env.local",
            "--bundle-env-vars",
        ])
        .unwrap();

        assert_eq!(cli.args.file.as_deref(), Some("src/index.ts"));
        assert_eq!(cli.args.dist.as_deref(), Some("build/app.js"));
        assert_eq!(cli.args.watch, Some(true));
        assert_eq!(cli.args.production, None);
        assert_eq!(cli.args.format, Some(Format::Cjs));
        assert_eq!(cli.args.external, vec!["pg".to_string(), "sharp".to_string()]);
        assert_eq!(cli.args.env_file.as_deref(), Some(".env.local"));
        assert_eq!(cli.args.bundle_env_vars, Some(true));
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_explicit_false_flag() {
        let cli = Cli::try_parse_from(["serverpack", "--file=a.ts", "--watch=false", "--production"]).unwrap();

        assert_eq!(cli.args.watch, Some(false));
        assert_eq!(cli.args.production, Some(true));
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["serverpack", "-f", "a.ts", "--format", "umd"]).is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
