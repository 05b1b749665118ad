//! Fedlink Core - GitHub Actions to Azure OIDC federation setup.
//!
//! This crate wires a workload-identity trust relationship between one
//! GitHub repository and an Azure subscription, so workflows can
//! authenticate through OIDC token exchange instead of stored secrets. One
//! run provisions exactly one application registration, one service
//! principal, one contributor role assignment scoped to a resource group,
//! and three federated credentials covering pull requests and the `main`
//! and `master` branches.
//!
//! All external effects go through two capability traits,
//! [`CloudIdentityProvider`] and [`SourceControlClient`]; the shipped
//! implementations drive the `az` and `gh` CLIs, and recording mocks are
//! included for tests and dry runs.
//!
//! # Example
//!
//! ```no_run
//! use fedlink_core::{run_setup, AzCliProvider, GhCliClient, SetupRequest};
//!
//! # async fn example() -> fedlink_core::Result<()> {
//! let provider = AzCliProvider::new();
//! let source_control = GhCliClient::new();
//!
//! let request = SetupRequest {
//!     app_name: "ci-app".into(),
//!     subscription_id: "00000000-0000-0000-0000-000000000000".into(),
//!     resource_group: "my-rg".into(),
//!     repo: "my-org/my-repo".into(),
//! };
//!
//! let report = run_setup(&provider, &source_control, &request).await?;
//! println!("tenant: {}, client id: {}", report.tenant_id, report.application_id);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod provider;
pub mod request;
pub mod setup;

// Re-export main types for convenience
pub use error::{Result, SetupError};
pub use provider::{
    ApplicationRecord, AzCliProvider, CloudIdentityProvider, FederatedCredential, GhCliClient,
    MockProvider, MockSourceControl, ProviderError, RoleAssignment, SourceControlClient,
};
pub use request::{FederationStatus, SetupReport, SetupRequest};
pub use setup::{expected_credentials, run_setup, GITHUB_OIDC_ISSUER, TOKEN_EXCHANGE_AUDIENCE};
