//! Serve companion: keeps the bundled application running

use std::io;
use std::path::PathBuf;

use tokio::process::{Child, Command};
use tracing::{debug, info};

/// Runs `node <outfile>` and restarts it after every successful build
#[derive(Debug)]
pub struct AppRunner {
    node: String,
    script: PathBuf,
    child: Option<Child>,
}

impl AppRunner {
    pub fn new(node: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            node: node.into(),
            script: script.into(),
            child: None,
        }
    }

    /// Stop the running instance, if any, and start a fresh one
    pub async fn restart(&mut self) -> io::Result<()> {
        self.stop().await;

        let child = Command::new(&self.node)
            .arg(&self.script)
            .kill_on_drop(true)
            .spawn()?;

        info!(
            "Started {} {} (pid {})",
            self.node,
            self.script.display(),
            child.id().unwrap_or_default()
        );
        self.child = Some(child);

        Ok(())
    }

    pub async fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                // Already exited on its own
                debug!("Failed to kill app: {}", e);
            }
        }
    }

    /// Whether the last started instance is still alive
    #[cfg(all(test, unix))]
    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }
}
