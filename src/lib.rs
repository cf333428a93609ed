//! Serverpack library
//!
//! Build configuration resolution and esbuild dispatch for Serverpack.

pub mod bundler;
pub mod cli;
pub mod config;
pub mod resolver;
pub mod utils;
pub mod watch;

pub use bundler::{BuildRequest, Bundler, EsbuildBundler};
pub use cli::{Cli, CliArguments};
pub use config::Config;
pub use resolver::{ConfigResolver, Dispatch, ResolveError};
