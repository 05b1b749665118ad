//! Exit codes following sysexits.h conventions.
//!
//! These codes give scripts and CI systems a way to tell bad input apart
//! from provider-side failures without parsing error text.

#![allow(dead_code)] // Constants may be used in future or for documentation

use fedlink_core::SetupError;

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Invalid input (validation failure, bad arguments).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Ambiguous provider state the tool refuses to guess about.
/// Maps to EX_DATAERR from sysexits.h.
pub const AMBIGUOUS_STATE: i32 = 65;

/// A provider call failed (transport, authorization, service down).
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const PROVIDER_ERROR: i32 = 69;

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let code = match err.downcast_ref::<SetupError>() {
            Some(SetupError::Validation(_)) => USAGE_ERROR,
            Some(SetupError::AmbiguousApplication { .. }) => AMBIGUOUS_STATE,
            Some(SetupError::ProviderCall { .. }) | Some(SetupError::FatalProvider { .. }) => {
                PROVIDER_ERROR
            }
            None => GENERAL_ERROR,
        };

        Self {
            code,
            message: Some(format!("{err:#}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_usage_error() {
        let err = anyhow::Error::new(SetupError::Validation("bad input".into()));
        assert_eq!(ExitCode::from_anyhow(&err).code, USAGE_ERROR);
    }

    #[test]
    fn test_fatal_provider_maps_to_provider_error() {
        let err = anyhow::Error::new(SetupError::FatalProvider {
            stage: "role assignment",
            detail: "forbidden".into(),
        });
        assert_eq!(ExitCode::from_anyhow(&err).code, PROVIDER_ERROR);
    }

    #[test]
    fn test_unclassified_maps_to_general_error() {
        let err = anyhow::anyhow!("something else");
        assert_eq!(ExitCode::from_anyhow(&err).code, GENERAL_ERROR);
    }
}
