//! The federation setup orchestrator.
//!
//! One run is a strictly sequential pipeline: validate, resolve what
//! already exists, create what is missing, then configure and confirm the
//! federated credentials. Each stage returns an immutable result value that
//! is passed forward; there is no shared mutable state, no concurrency and
//! no way back once a stage has succeeded. Retries are confined to the
//! federated-credential confirmation poll.

mod federation;
mod provision;
mod resolve;
mod validate;

pub use federation::{expected_credentials, GITHUB_OIDC_ISSUER, TOKEN_EXCHANGE_AUDIENCE};

use tracing::{debug, info};

use crate::error::Result;
use crate::provider::{CloudIdentityProvider, SourceControlClient};
use crate::request::{SetupRequest, SetupReport};

/// Run the whole federation setup flow for one request.
///
/// Re-running with the same request is safe: every stage checks for the
/// resource it would create and reuses what it finds, so a completed run
/// repeated verbatim issues only reads. On a fatal mid-pipeline failure the
/// provider keeps whatever was already created (there is no rollback) and
/// the next run picks up from there.
pub async fn run_setup(
    provider: &dyn CloudIdentityProvider,
    source_control: &dyn SourceControlClient,
    request: &SetupRequest,
) -> Result<SetupReport> {
    info!(app_name = %request.app_name, repo = %request.repo, "starting federation setup");

    validate::validate(provider, source_control, request).await?;

    let (application, application_created) =
        match resolve::resolve_application(provider, &request.app_name).await? {
            Some(record) => {
                info!(app_id = %record.app_id, "reusing existing application registration");
                (record, false)
            }
            None => (
                provision::create_application(provider, &request.app_name).await?,
                true,
            ),
        };

    let (service_principal_object_id, service_principal_created) =
        match resolve::resolve_service_principal(provider, &application.app_id).await? {
            Some(object_id) => {
                info!(object_id, "reusing existing service principal");
                (object_id, false)
            }
            None => (
                provision::create_service_principal(provider, &application.app_id).await?,
                true,
            ),
        };

    // Tenant id and object id are independent of each other; the reference
    // order is tenant first.
    let tenant_id = provision::fetch_tenant_id(provider).await?;
    let application_object_id =
        provision::application_object_id(provider, &request.app_name).await?;

    let role_assignment_created =
        provision::ensure_contributor_role(provider, request, &service_principal_object_id)
            .await?;

    let federation =
        federation::ensure_federated_credentials(provider, &application_object_id, &request.repo)
            .await?;

    debug!(?federation, "federation setup finished");
    Ok(SetupReport {
        application_id: application.app_id,
        application_object_id,
        tenant_id,
        service_principal_object_id,
        application_created,
        service_principal_created,
        role_assignment_created,
        federation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SetupError;
    use crate::provider::{MockProvider, MockSourceControl, RoleAssignment};
    use crate::request::FederationStatus;

    fn request() -> SetupRequest {
        SetupRequest {
            app_name: "ci-app".into(),
            subscription_id: "sub-123".into(),
            resource_group: "rg-1".into(),
            repo: "org/repo".into(),
        }
    }

    /// Provider where a previous run already provisioned everything.
    fn fully_provisioned() -> MockProvider {
        let record = crate::provider::ApplicationRecord {
            app_id: "app-1".into(),
            object_id: "obj-1".into(),
        };
        let mut provider = MockProvider::new()
            .with_existing_application("ci-app", record)
            .with_existing_service_principal("app-1", "sp-obj-1")
            .with_existing_role_assignment(RoleAssignment {
                role: "contributor".into(),
                subscription_id: "sub-123".into(),
                scope: "/subscriptions/sub-123/resourceGroups/rg-1".into(),
                principal_object_id: "sp-obj-1".into(),
                principal_type: "ServicePrincipal".into(),
            });
        for credential in expected_credentials("org/repo") {
            provider = provider.with_existing_credential("obj-1", credential);
        }
        provider
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_provision_creates_everything() {
        let provider = MockProvider::new().with_known_subscriptions(["sub-123"]);
        let sc = MockSourceControl::new();

        let report = run_setup(&provider, &sc, &request()).await.unwrap();

        assert!(report.application_created);
        assert!(report.service_principal_created);
        assert!(report.role_assignment_created);
        assert_eq!(report.federation, FederationStatus::Confirmed);
        assert_eq!(report.tenant_id, "mock-tenant");
        assert!(!report.application_id.is_empty());
        assert!(!report.application_object_id.is_empty());
        assert!(!report.service_principal_object_id.is_empty());

        let assignments = provider.role_assignments();
        assert_eq!(assignments.len(), 1);
        assert_eq!(
            assignments[0].scope,
            "/subscriptions/sub-123/resourceGroups/rg-1"
        );

        let subjects: Vec<String> = provider
            .created_credentials(&report.application_object_id)
            .into_iter()
            .map(|c| c.subject)
            .collect();
        assert_eq!(
            subjects,
            vec![
                "repo:org/repo:pull_request",
                "repo:org/repo:ref:refs/heads/main",
                "repo:org/repo:ref:refs/heads/master",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_run_issues_no_mutations() {
        let provider = MockProvider::new().with_known_subscriptions(["sub-123"]);
        let sc = MockSourceControl::new();

        run_setup(&provider, &sc, &request()).await.unwrap();
        let mutations_after_first = provider.mutation_log().len();

        let report = run_setup(&provider, &sc, &request()).await.unwrap();
        assert_eq!(provider.mutation_log().len(), mutations_after_first);
        assert!(!report.application_created);
        assert!(!report.service_principal_created);
        assert!(!report.role_assignment_created);
        assert_eq!(report.federation, FederationStatus::AlreadyConfigured);
    }

    #[tokio::test]
    async fn test_preprovisioned_tenant_issues_only_reads() {
        let provider = fully_provisioned();
        let sc = MockSourceControl::new();

        let report = run_setup(&provider, &sc, &request()).await.unwrap();

        assert!(provider.mutation_log().is_empty());
        assert_eq!(report.application_id, "app-1");
        assert_eq!(report.application_object_id, "obj-1");
        assert_eq!(report.service_principal_object_id, "sp-obj-1");
        assert_eq!(report.federation, FederationStatus::AlreadyConfigured);
    }

    #[tokio::test]
    async fn test_bad_subscription_stops_before_any_application_call() {
        let provider = MockProvider::new().with_known_subscriptions(["sub-123"]);
        let sc = MockSourceControl::new();
        let mut req = request();
        req.subscription_id = "sub-999".into();

        let err = run_setup(&provider, &sc, &req).await.unwrap_err();
        assert!(matches!(err, SetupError::Validation(_)));
        assert!(provider.mutation_log().is_empty());
        assert!(provider
            .call_log()
            .iter()
            .all(|call| !call.starts_with("list_applications")
                && !call.starts_with("create_application")));
    }

    #[tokio::test]
    async fn test_empty_resource_group_issues_no_mutation() {
        let provider = MockProvider::new();
        let sc = MockSourceControl::new();
        let mut req = request();
        req.resource_group.clear();

        let err = run_setup(&provider, &sc, &req).await.unwrap_err();
        assert!(matches!(err, SetupError::Validation(_)));
        assert!(provider.mutation_log().is_empty());
    }

    #[tokio::test]
    async fn test_service_principal_failure_is_returned_not_process_fatal() {
        let provider = MockProvider::new().failing_service_principal_creation("denied");
        let sc = MockSourceControl::new();

        let err = run_setup(&provider, &sc, &request()).await.unwrap_err();
        assert!(matches!(
            err,
            SetupError::FatalProvider {
                stage: "service-principal creation",
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rerun_after_partial_failure_reuses_the_application() {
        // Service-principal creation keeps failing, so the first run aborts
        // after the application was registered.
        let provider = MockProvider::new().failing_service_principal_creation("denied");
        let sc = MockSourceControl::new();
        run_setup(&provider, &sc, &request()).await.unwrap_err();
        run_setup(&provider, &sc, &request()).await.unwrap_err();

        // Only the first run registered an application; the second resolved
        // and reused it.
        let app_creates = provider
            .mutation_log()
            .iter()
            .filter(|call| call.starts_with("create_application"))
            .count();
        assert_eq!(app_creates, 1);
        assert_eq!(provider.list_applications("ci-app").await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ambiguous_application_is_refused() {
        let record = |n: u32| crate::provider::ApplicationRecord {
            app_id: format!("app-{n}"),
            object_id: format!("obj-{n}"),
        };
        let provider = MockProvider::new()
            .with_existing_application("ci-app", record(1))
            .with_existing_application("ci-app", record(2))
            .with_existing_service_principal("app-1", "sp-obj-1");
        let sc = MockSourceControl::new();

        let err = run_setup(&provider, &sc, &request()).await.unwrap_err();
        assert!(matches!(
            err,
            SetupError::AmbiguousApplication { count: 2, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconfirmed_federation_still_succeeds() {
        let provider = MockProvider::new().with_credential_visibility_delay(50);
        let sc = MockSourceControl::new();

        let report = run_setup(&provider, &sc, &request()).await.unwrap();
        assert_eq!(report.federation, FederationStatus::Unconfirmed);
    }
}
