//! Watch mode
//!
//! Provides the persistent half of the bundler contract:
//! - Debounced file watching of every source root
//! - Rebuild through any [`Bundler`]
//! - Restarting the bundled app after each successful build

mod serve;

use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::bundler::{BuildOptions, BuildRequest, Bundler, PluginDescriptor};
use crate::utils::{format_duration, format_size, normalize_path};

pub use serve::AppRunner;

const WATCHED_EXTENSIONS: [&str; 9] = ["js", "mjs", "cjs", "jsx", "ts", "mts", "cts", "tsx", "json"];

/// Directories a build reads from: the entry's directory, the directory of
/// every alias target and every redirect directory. Roots nested inside
/// another root are folded into it.
pub fn watch_roots(request: &BuildRequest) -> Vec<PathBuf> {
    let parent_dir = |path: &Path| {
        path.parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    };

    let mut candidates = vec![parent_dir(request.entry_point.as_path())];
    candidates.extend(request.alias.values().map(|path| parent_dir(path.as_path())));
    if let Some(rules) = request.redirect_rules() {
        candidates.extend(rules.iter().map(|rule| rule.dir.clone()));
    }

    let mut candidates: Vec<PathBuf> = candidates.iter().map(|p| normalize_path(p)).collect();
    // Ancestors sort before their descendants
    candidates.sort();
    candidates.dedup();

    let mut roots: Vec<PathBuf> = Vec::new();
    for candidate in candidates {
        if !roots.iter().any(|root| candidate.starts_with(root)) {
            roots.push(candidate);
        }
    }

    roots
}

/// Filter for file system events
#[derive(Debug, Clone)]
pub struct ChangeFilter {
    /// Watched directories
    roots: Vec<PathBuf>,
    /// The bundle itself
    outfile: PathBuf,
    /// Output directory, when it is not an ancestor of a watched root
    out_dir: Option<PathBuf>,
}

impl ChangeFilter {
    pub fn new(roots: Vec<PathBuf>, outfile: &Path) -> Self {
        let outfile = normalize_path(outfile);
        let out_dir = outfile
            .parent()
            .filter(|dir| !roots.iter().any(|root| root.starts_with(dir)))
            .map(Path::to_path_buf);

        Self {
            roots,
            outfile,
            out_dir,
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Whether a change to `path` should trigger a rebuild
    pub fn is_relevant(&self, path: &Path) -> bool {
        if path == self.outfile {
            return false;
        }
        if let Some(out_dir) = &self.out_dir {
            if path.starts_with(out_dir) {
                return false;
            }
        }

        let relative = self
            .roots
            .iter()
            .find_map(|root| path.strip_prefix(root).ok())
            .unwrap_or(path);
        let hidden_or_vendored = relative.components().any(|component| match component {
            Component::Normal(name) => {
                let name = name.to_string_lossy();
                name == "node_modules" || name.starts_with('.')
            }
            _ => false,
        });
        if hidden_or_vendored {
            return false;
        }

        path.extension()
            .and_then(|e| e.to_str())
            .map_or(false, |ext| WATCHED_EXTENSIONS.contains(&ext))
    }
}

/// A build request that rebuilds whenever its sources change
pub struct WatchContext {
    bundler: Arc<dyn Bundler>,
    request: BuildRequest,
    filter: ChangeFilter,
    runner: Option<AppRunner>,
}

impl WatchContext {
    /// Create a watch context. The app runner is only attached when the
    /// request carries the serve plugin.
    pub fn new(bundler: Arc<dyn Bundler>, request: BuildRequest, node: &str) -> Self {
        let filter = ChangeFilter::new(watch_roots(&request), &request.outfile);
        let runner = request
            .has_plugin(&PluginDescriptor::Serve)
            .then(|| AppRunner::new(node, request.outfile.clone()));

        Self {
            bundler,
            request,
            filter,
            runner,
        }
    }

    /// Build once, then rebuild on every relevant change until Ctrl+C
    pub async fn watch(self) -> Result<()> {
        self.watch_until(tokio::signal::ctrl_c()).await
    }

    /// Build once, then rebuild on every relevant change until `shutdown`
    /// completes.
    ///
    /// `shutdown` is created once and polled across iterations, so a signal
    /// delivered while a rebuild is running is still seen afterwards.
    pub async fn watch_until<F: Future>(mut self, shutdown: F) -> Result<()> {
        tokio::pin!(shutdown);

        let (tx, mut rx) = mpsc::unbounded_channel();

        // Use a debouncer to avoid too many events
        let mut debouncer = new_debouncer(Duration::from_millis(100), move |result: DebounceEventResult| {
            let _ = tx.send(result);
        })?;
        for root in self.filter.roots() {
            if root.is_dir() {
                debouncer.watcher().watch(root, RecursiveMode::Recursive)?;
            } else {
                warn!("Not watching missing directory {}", root.display());
            }
        }

        eprintln!(
            "{} Watching {}... press {} to stop\n",
            "→".blue(),
            self.request.entry_point.display().to_string().cyan(),
            "Ctrl+C".yellow()
        );

        tokio::select! {
            _ = &mut shutdown => {
                debug!("Interrupted before the first build");
                return Ok(());
            }
            _ = self.rebuild() => {}
        }

        loop {
            tokio::select! {
                Some(result) = rx.recv() => match result {
                    Ok(events) => {
                        let mut changed = 0;
                        for event in events.iter().filter(|e| self.filter.is_relevant(&e.path)) {
                            eprintln!(
                                "  {} File changed: {}",
                                "↻".yellow(),
                                event.path.display().to_string().dimmed()
                            );
                            changed += 1;
                        }
                        if changed > 0 {
                            self.rebuild().await;
                        }
                    }
                    Err(e) => {
                        error!("Watch error: {:?}", e);
                    }
                },
                _ = &mut shutdown => {
                    debug!("Interrupted, leaving watch mode");
                    break;
                }
            }
        }

        if let Some(runner) = self.runner.as_mut() {
            runner.stop().await;
        }

        Ok(())
    }

    /// Run one build; on success restart the app. Failures keep the previous
    /// app instance running.
    async fn rebuild(&mut self) -> bool {
        match self
            .bundler
            .build(&self.request, &BuildOptions::development())
            .await
        {
            Ok(bundle) => {
                eprintln!(
                    "  {} Built {} {} in {}",
                    "✓".green(),
                    bundle.output_path.display().to_string().cyan(),
                    format_size(bundle.size).dimmed(),
                    format_duration(bundle.duration)
                );

                if let Some(runner) = self.runner.as_mut() {
                    if let Err(e) = runner.restart().await {
                        error!("Failed to start app: {}", e);
                    }
                }
                true
            }
            Err(e) => {
                eprintln!("  {} Build failed", "✗".red());
                error!("{}", e);
                false
            }
        }
    }
}
