//! `gh` CLI-backed source-control client.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{ProviderError, ProviderResult, SourceControlClient};

/// Source-control client that drives the GitHub CLI.
pub struct GhCliClient {
    program: String,
}

impl GhCliClient {
    pub fn new() -> Self {
        Self {
            program: "gh".to_string(),
        }
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run `gh` and report whether it exited cleanly. A nonzero exit is a
    /// negative answer, not a transport failure; only a failure to spawn
    /// the binary at all is surfaced as an error.
    async fn probe(&self, operation: &'static str, args: &[&str]) -> ProviderResult<bool> {
        debug!(operation, program = %self.program, "invoking github cli");
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                ProviderError::call_failed(
                    operation,
                    format!("failed to spawn {}: {e}", self.program),
                )
            })?;

        if !output.status.success() {
            let detail = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!(operation, detail, "github cli probe negative");
        }
        Ok(output.status.success())
    }
}

impl Default for GhCliClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceControlClient for GhCliClient {
    async fn session_authenticated(&self) -> ProviderResult<bool> {
        self.probe("gh auth status", &["auth", "status"]).await
    }

    async fn repository_visible(&self, repo: &str) -> ProviderResult<bool> {
        self.probe("gh repo view", &["repo", "view", repo]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spawn_failure_is_call_failed() {
        let client = GhCliClient::with_program("definitely-not-a-real-binary-xyz");
        let err = client.session_authenticated().await.unwrap_err();
        assert!(matches!(err, ProviderError::CallFailed { .. }));
    }
}
