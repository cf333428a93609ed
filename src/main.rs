//! Serverpack - bundle Node server applications with esbuild
//!
//! Resolves CLI flags, an optional `server.config.json` and a `.env` file
//! into a single esbuild invocation.
//!
//! # Features
//! - `.env` variables compiled in as `import.meta.env.*` / `process.env.*`
//! - Module aliases and import prefix redirection
//! - Automatic externalization of `package.json` dependencies
//! - Watch mode that rebuilds and restarts the app on change

use anyhow::Result;
use clap::Parser;
use serverpack_lib::Cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging/tracing system
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("serverpack=debug,serverpack_lib=debug"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("serverpack=info,serverpack_lib=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    cli.execute().await
}
