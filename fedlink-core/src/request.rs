//! Input and output values for one setup run.

use serde::{Deserialize, Serialize};

/// Everything one federation setup run needs, immutable once validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupRequest {
    /// Display name for the application registration.
    pub app_name: String,
    /// Azure subscription the contributor role is scoped to.
    pub subscription_id: String,
    /// Resource group the contributor role is scoped to.
    pub resource_group: String,
    /// GitHub repository in `owner/name` form.
    pub repo: String,
}

impl SetupRequest {
    /// Role-assignment scope path for this request.
    pub fn role_scope(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}",
            self.subscription_id, self.resource_group
        )
    }
}

/// Outcome of the federated-credential stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FederationStatus {
    /// Every expected credential already existed; nothing was created.
    AlreadyConfigured,
    /// Credentials were created and the provider confirmed them visible.
    Confirmed,
    /// Credentials were created but the confirmation poll was exhausted
    /// before the provider listed them all. The creates were accepted, so
    /// the run still counts as successful, but the caller should re-check.
    Unconfirmed,
}

impl std::fmt::Display for FederationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyConfigured => write!(f, "already configured"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Unconfirmed => write!(f, "created but unconfirmed"),
        }
    }
}

/// Identifiers accumulated by a successful run.
///
/// Assembled from the per-stage results; every field is populated before
/// the report exists, so a caller can never observe a half-initialized run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupReport {
    pub application_id: String,
    pub application_object_id: String,
    pub tenant_id: String,
    pub service_principal_object_id: String,
    /// False when the resolver found an existing registration to reuse.
    pub application_created: bool,
    /// False when the resolver found an existing service principal.
    pub service_principal_created: bool,
    /// False when the contributor assignment was already in place.
    pub role_assignment_created: bool,
    pub federation: FederationStatus,
}
