//! Capability interfaces for the external collaborators.
//!
//! The orchestrator never talks to Azure or GitHub directly; it is written
//! against these two traits. Shipped implementations:
//!
//! - [`AzCliProvider`] / [`GhCliClient`] - shell out to the `az` and `gh`
//!   CLIs, the same wire surface the reference tooling uses.
//! - [`MockProvider`] / [`MockSourceControl`] - in-memory doubles with call
//!   recording, used by tests and by `--mock` dry runs.
//!
//! "Not found" is an empty list result, never an error; [`ProviderError`]
//! is reserved for calls that failed outright or returned something the
//! client could not interpret.

mod azure;
mod github;
mod mock;

pub use azure::AzCliProvider;
pub use github::GhCliClient;
pub use mock::{MockProvider, MockSourceControl};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A failed or uninterpretable external call.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The call itself errored (transport, authorization, nonzero exit).
    /// `detail` carries the provider's raw output verbatim.
    #[error("{operation}: {detail}")]
    CallFailed { operation: &'static str, detail: String },

    /// The call succeeded but the response was not in the expected shape.
    #[error("unexpected response from {operation}: {detail}")]
    MalformedResponse { operation: &'static str, detail: String },
}

impl ProviderError {
    pub fn call_failed(operation: &'static str, detail: impl Into<String>) -> Self {
        Self::CallFailed {
            operation,
            detail: detail.into(),
        }
    }

    pub fn malformed(operation: &'static str, detail: impl Into<String>) -> Self {
        Self::MalformedResponse {
            operation,
            detail: detail.into(),
        }
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// An application registration as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    /// Client id (`appId`), used for service-principal binding.
    pub app_id: String,
    /// Directory object id, required for federated-credential calls.
    pub object_id: String,
}

/// One federated identity credential on an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedCredential {
    pub name: String,
    pub issuer: String,
    pub subject: String,
    pub description: String,
    pub audiences: Vec<String>,
}

/// A role grant scoped to a subscription + resource-group path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    pub role: String,
    pub subscription_id: String,
    pub scope: String,
    pub principal_object_id: String,
    pub principal_type: String,
}

/// Identity-provider capability surface.
///
/// Implementations must be thread-safe (`Send + Sync`). Every call is a
/// single attempt; retry policy belongs to the orchestrator.
#[async_trait]
pub trait CloudIdentityProvider: Send + Sync {
    /// Live existence probe for a subscription id.
    async fn subscription_exists(&self, subscription_id: &str) -> ProviderResult<bool>;

    /// Applications whose display name matches exactly. Empty means none.
    async fn list_applications(&self, display_name: &str)
        -> ProviderResult<Vec<ApplicationRecord>>;

    /// Register a new application under the given display name.
    async fn create_application(&self, display_name: &str) -> ProviderResult<ApplicationRecord>;

    /// Object ids of service principals bound to the given application id.
    async fn list_service_principals(&self, app_id: &str) -> ProviderResult<Vec<String>>;

    /// Bind a service principal to the application; returns its object id.
    async fn create_service_principal(&self, app_id: &str) -> ProviderResult<String>;

    /// Whether the principal already holds an assignment at the scope.
    async fn role_assignment_exists(
        &self,
        scope: &str,
        principal_object_id: &str,
    ) -> ProviderResult<bool>;

    /// Grant a role to a principal at the given scope.
    async fn create_role_assignment(&self, assignment: &RoleAssignment) -> ProviderResult<()>;

    /// Tenant context of the authenticated session.
    async fn tenant_id(&self) -> ProviderResult<String>;

    /// Federated credentials currently on the application.
    async fn list_federated_credentials(
        &self,
        app_object_id: &str,
    ) -> ProviderResult<Vec<FederatedCredential>>;

    /// Add one federated credential to the application.
    async fn create_federated_credential(
        &self,
        app_object_id: &str,
        credential: &FederatedCredential,
    ) -> ProviderResult<()>;
}

/// Source-control host capability surface.
#[async_trait]
pub trait SourceControlClient: Send + Sync {
    /// Whether the current session is authenticated at all.
    async fn session_authenticated(&self) -> ProviderResult<bool>;

    /// Whether `repo` (`owner/name`) is visible to the current session.
    async fn repository_visible(&self, repo: &str) -> ProviderResult<bool>;
}
