use thiserror::Error;

use crate::provider::ProviderError;

/// Errors produced by one federation setup run.
///
/// `Validation` is recoverable by correcting the input and re-invoking.
/// `ProviderCall` covers failed early-pipeline checks. `FatalProvider` marks
/// a failure deep in the provisioning chain, after mutations have already
/// happened; there is no rollback, and a re-run's existence checks are what
/// make the next attempt idempotent. The caller decides how to react - the
/// core never terminates the process.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("provider call failed during {stage}: {source}")]
    ProviderCall {
        stage: &'static str,
        source: ProviderError,
    },

    #[error("fatal provider failure during {stage}: {detail}")]
    FatalProvider { stage: &'static str, detail: String },

    #[error("application name '{name}' matches {count} registrations; refusing to guess")]
    AmbiguousApplication { name: String, count: usize },
}

impl SetupError {
    pub(crate) fn provider(stage: &'static str, source: ProviderError) -> Self {
        Self::ProviderCall { stage, source }
    }

    pub(crate) fn fatal(stage: &'static str, detail: impl Into<String>) -> Self {
        Self::FatalProvider {
            stage,
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SetupError>;
