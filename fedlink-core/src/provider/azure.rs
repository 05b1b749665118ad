//! `az` CLI-backed identity provider client.
//!
//! Every call shells out to the Azure CLI and parses its JSON output, which
//! keeps authentication entirely in the user's existing `az login` session.
//! Calls are blocking from the orchestrator's point of view: one subprocess
//! at a time, awaited to completion, no caller-specified timeout.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use super::{
    ApplicationRecord, CloudIdentityProvider, FederatedCredential, ProviderError, ProviderResult,
    RoleAssignment,
};

/// Microsoft Graph endpoint for federated identity credentials.
const GRAPH_FIC_URI: &str = "https://graph.microsoft.com/beta/applications";

/// Identity provider client that drives the `az` CLI.
pub struct AzCliProvider {
    program: String,
}

impl AzCliProvider {
    pub fn new() -> Self {
        Self {
            program: "az".to_string(),
        }
    }

    /// Use a different binary name (for wrappers such as `azure-cli`).
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, operation: &'static str, args: &[&str]) -> ProviderResult<Vec<u8>> {
        debug!(operation, program = %self.program, "invoking azure cli");
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
            let mut detail = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if detail.is_empty() {
                detail = String::from_utf8_lossy(&output.stdout).trim().to_string();
            }
            return Err(ProviderError::call_failed(operation, detail));
        }

        Ok(output.stdout)
    }

    fn parse<T: DeserializeOwned>(operation: &'static str, raw: &[u8]) -> ProviderResult<T> {
        serde_json::from_slice(raw).map_err(|e| ProviderError::malformed(operation, e.to_string()))
    }

    fn require_id(
        operation: &'static str,
        field: &str,
        value: String,
    ) -> ProviderResult<String> {
        if value.is_empty() {
            return Err(ProviderError::malformed(
                operation,
                format!("provider returned an empty {field}"),
            ));
        }
        Ok(value)
    }

    fn fic_uri(app_object_id: &str) -> String {
        format!("{GRAPH_FIC_URI}/{app_object_id}/federatedIdentityCredentials")
    }
}

impl Default for AzCliProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct RawApplication {
    #[serde(rename = "appId")]
    app_id: String,
    #[serde(rename = "id")]
    object_id: String,
}

#[derive(Debug, Deserialize)]
struct RawServicePrincipal {
    id: String,
}

impl TryFrom<RawApplication> for ApplicationRecord {
    type Error = ProviderError;

    fn try_from(raw: RawApplication) -> ProviderResult<Self> {
        Ok(Self {
            app_id: AzCliProvider::require_id("application record", "appId", raw.app_id)?,
            object_id: AzCliProvider::require_id("application record", "id", raw.object_id)?,
        })
    }
}

#[async_trait]
impl CloudIdentityProvider for AzCliProvider {
    async fn subscription_exists(&self, subscription_id: &str) -> ProviderResult<bool> {
        // A nonzero exit here means the subscription is not resolvable in
        // the current session, which is a negative probe result rather
        // than a transport failure worth surfacing.
        let raw = match self
            .run(
                "az account show",
                &[
                    "account",
                    "show",
                    "-s",
                    subscription_id,
                    "--query",
                    "id",
                    "--output",
                    "json",
                ],
            )
            .await
        {
            Ok(raw) => raw,
            Err(ProviderError::CallFailed { detail, .. }) => {
                debug!(subscription_id, detail, "subscription probe negative");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        let resolved: String = Self::parse("az account show", &raw)?;
        Ok(!resolved.is_empty())
    }

    async fn list_applications(
        &self,
        display_name: &str,
    ) -> ProviderResult<Vec<ApplicationRecord>> {
        let filter = format!("displayName eq '{display_name}'");
        let raw = self
            .run(
                "az ad app list",
                &[
                    "ad",
                    "app",
                    "list",
                    "--only-show-errors",
                    "--filter",
                    &filter,
                    "--query",
                    "[].{appId:appId, id:id}",
                    "--output",
                    "json",
                ],
            )
            .await?;

        let records: Vec<RawApplication> = Self::parse("az ad app list", &raw)?;
        records.into_iter().map(ApplicationRecord::try_from).collect()
    }

    async fn create_application(&self, display_name: &str) -> ProviderResult<ApplicationRecord> {
        let raw = self
            .run(
                "az ad app create",
                &[
                    "ad",
                    "app",
                    "create",
                    "--only-show-errors",
                    "--display-name",
                    display_name,
                ],
            )
            .await?;

        let record: RawApplication = Self::parse("az ad app create", &raw)?;
        record.try_into()
    }

    async fn list_service_principals(&self, app_id: &str) -> ProviderResult<Vec<String>> {
        let filter = format!("appId eq '{app_id}'");
        let raw = self
            .run(
                "az ad sp list",
                &[
                    "ad",
                    "sp",
                    "list",
                    "--only-show-errors",
                    "--filter",
                    &filter,
                    "--query",
                    "[].id",
                    "--output",
                    "json",
                ],
            )
            .await?;

        Self::parse("az ad sp list", &raw)
    }

    async fn create_service_principal(&self, app_id: &str) -> ProviderResult<String> {
        let raw = self
            .run(
                "az ad sp create",
                &["ad", "sp", "create", "--id", app_id, "--only-show-errors"],
            )
            .await?;

        let sp: RawServicePrincipal = Self::parse("az ad sp create", &raw)?;
        Self::require_id("az ad sp create", "id", sp.id)
    }

    async fn role_assignment_exists(
        &self,
        scope: &str,
        principal_object_id: &str,
    ) -> ProviderResult<bool> {
        let raw = self
            .run(
                "az role assignment list",
                &[
                    "role",
                    "assignment",
                    "list",
                    "--assignee",
                    principal_object_id,
                    "--scope",
                    scope,
                    "--query",
                    "[].id",
                    "--only-show-errors",
                    "--output",
                    "json",
                ],
            )
            .await?;

        let ids: Vec<String> = Self::parse("az role assignment list", &raw)?;
        Ok(!ids.is_empty())
    }

    async fn create_role_assignment(&self, assignment: &RoleAssignment) -> ProviderResult<()> {
        self.run(
            "az role assignment create",
            &[
                "role",
                "assignment",
                "create",
                "--role",
                &assignment.role,
                "--subscription",
                &assignment.subscription_id,
                "--assignee-object-id",
                &assignment.principal_object_id,
                "--assignee-principal-type",
                &assignment.principal_type,
                "--scope",
                &assignment.scope,
                "--only-show-errors",
            ],
        )
        .await?;

        Ok(())
    }

    async fn tenant_id(&self) -> ProviderResult<String> {
        let raw = self
            .run(
                "az account show tenantId",
                &[
                    "account",
                    "show",
                    "--query",
                    "tenantId",
                    "--only-show-errors",
                    "--output",
                    "json",
                ],
            )
            .await?;

        let tenant: String = Self::parse("az account show tenantId", &raw)?;
        Self::require_id("az account show tenantId", "tenantId", tenant)
    }

    async fn list_federated_credentials(
        &self,
        app_object_id: &str,
    ) -> ProviderResult<Vec<FederatedCredential>> {
        let uri = Self::fic_uri(app_object_id);
        let raw = self
            .run(
                "az rest GET federatedIdentityCredentials",
                &[
                    "rest",
                    "--method",
                    "GET",
                    "--uri",
                    &uri,
                    "--query",
                    "value",
                    "--output",
                    "json",
                ],
            )
            .await?;

        Self::parse("az rest GET federatedIdentityCredentials", &raw)
    }

    async fn create_federated_credential(
        &self,
        app_object_id: &str,
        credential: &FederatedCredential,
    ) -> ProviderResult<()> {
        let uri = Self::fic_uri(app_object_id);
        let body = serde_json::to_string(credential).map_err(|e| {
            ProviderError::malformed("az rest POST federatedIdentityCredentials", e.to_string())
        })?;

        self.run(
            "az rest POST federatedIdentityCredentials",
            &["rest", "--method", "POST", "--uri", &uri, "--body", &body],
        )
        .await?;

        Ok(())
    }
}
