//! Creation calls against the identity provider.
//!
//! Failures past application registration are [`SetupError::FatalProvider`]:
//! by that point mutations have happened and there is no rollback, so the
//! error carries the provider's raw output for the operator and the re-run
//! path relies on the resolver's existence checks.

use tracing::{debug, info, warn};

use crate::error::{Result, SetupError};
use crate::provider::{ApplicationRecord, CloudIdentityProvider, RoleAssignment};
use crate::request::SetupRequest;

/// Role granted to the service principal.
const CONTRIBUTOR_ROLE: &str = "contributor";

/// Principal type passed with the role assignment.
const PRINCIPAL_TYPE: &str = "ServicePrincipal";

/// Register a new application under the given display name.
pub async fn create_application(
    provider: &dyn CloudIdentityProvider,
    display_name: &str,
) -> Result<ApplicationRecord> {
    debug!(display_name, "creating application registration");
    let record = provider
        .create_application(display_name)
        .await
        .map_err(|e| SetupError::provider("application registration", e))?;
    info!(app_id = %record.app_id, "application registration created");
    Ok(record)
}

/// Bind a service principal to the application.
pub async fn create_service_principal(
    provider: &dyn CloudIdentityProvider,
    app_id: &str,
) -> Result<String> {
    debug!(app_id, "creating service principal");
    let object_id = provider
        .create_service_principal(app_id)
        .await
        .map_err(|e| SetupError::fatal("service-principal creation", e.to_string()))?;
    info!(object_id, "service principal created");
    Ok(object_id)
}

/// Fetch the tenant context of the authenticated session.
pub async fn fetch_tenant_id(provider: &dyn CloudIdentityProvider) -> Result<String> {
    let tenant_id = provider
        .tenant_id()
        .await
        .map_err(|e| SetupError::fatal("tenant lookup", e.to_string()))?;
    debug!(tenant_id, "resolved tenant");
    Ok(tenant_id)
}

/// Resolve the directory object id for an application by display name.
///
/// Zero matches at this point means the registration vanished mid-run.
/// More than one match is refused outright: guessing which object to attach
/// federated credentials to would wire up trust for the wrong application.
pub async fn application_object_id(
    provider: &dyn CloudIdentityProvider,
    display_name: &str,
) -> Result<String> {
    let mut matches = provider
        .list_applications(display_name)
        .await
        .map_err(|e| SetupError::fatal("application object-id lookup", e.to_string()))?;

    match matches.len() {
        0 => Err(SetupError::fatal(
            "application object-id lookup",
            format!("no registration found for display name '{display_name}'"),
        )),
        1 => Ok(matches.remove(0).object_id),
        count => Err(SetupError::AmbiguousApplication {
            name: display_name.to_string(),
            count,
        }),
    }
}

/// Grant the contributor role at the request's resource-group scope,
/// skipping the create when an assignment is already in place.
///
/// Returns whether a new assignment was created.
pub async fn ensure_contributor_role(
    provider: &dyn CloudIdentityProvider,
    request: &SetupRequest,
    sp_object_id: &str,
) -> Result<bool> {
    let scope = request.role_scope();

    let exists = provider
        .role_assignment_exists(&scope, sp_object_id)
        .await
        .map_err(|e| SetupError::fatal("role-assignment check", e.to_string()))?;
    if exists {
        debug!(scope, "contributor role already assigned");
        return Ok(false);
    }

    let assignment = RoleAssignment {
        role: CONTRIBUTOR_ROLE.to_string(),
        subscription_id: request.subscription_id.clone(),
        scope: scope.clone(),
        principal_object_id: sp_object_id.to_string(),
        principal_type: PRINCIPAL_TYPE.to_string(),
    };

    provider
        .create_role_assignment(&assignment)
        .await
        .map_err(|e| {
            warn!(scope, "role assignment failed");
            SetupError::fatal("role assignment", e.to_string())
        })?;

    info!(scope, "contributor role assigned");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockProvider;

    fn request() -> SetupRequest {
        SetupRequest {
            app_name: "ci-app".into(),
            subscription_id: "sub-123".into(),
            resource_group: "rg-1".into(),
            repo: "org/repo".into(),
        }
    }

    #[tokio::test]
    async fn test_service_principal_failure_is_fatal() {
        let provider = MockProvider::new().failing_service_principal_creation("denied");
        let err = create_service_principal(&provider, "app-1").await.unwrap_err();
        match err {
            SetupError::FatalProvider { stage, detail } => {
                assert_eq!(stage, "service-principal creation");
                assert!(detail.contains("denied"));
            }
            other => panic!("expected fatal error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_role_assignment_shape() {
        let provider = MockProvider::new();
        let created = ensure_contributor_role(&provider, &request(), "sp-obj-1")
            .await
            .unwrap();
        assert!(created);

        let assignments = provider.role_assignments();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].role, "contributor");
        assert_eq!(assignments[0].principal_type, "ServicePrincipal");
        assert_eq!(
            assignments[0].scope,
            "/subscriptions/sub-123/resourceGroups/rg-1"
        );
    }

    #[tokio::test]
    async fn test_existing_role_assignment_is_not_recreated() {
        let provider = MockProvider::new();
        ensure_contributor_role(&provider, &request(), "sp-obj-1")
            .await
            .unwrap();
        let created = ensure_contributor_role(&provider, &request(), "sp-obj-1")
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(provider.role_assignments().len(), 1);
    }

    #[tokio::test]
    async fn test_role_assignment_failure_is_fatal() {
        let provider = MockProvider::new().failing_role_assignment("forbidden");
        let err = ensure_contributor_role(&provider, &request(), "sp-obj-1")
            .await
            .unwrap_err();
        assert!(matches!(err, SetupError::FatalProvider { stage: "role assignment", .. }));
    }

    #[tokio::test]
    async fn test_object_id_lookup_requires_exactly_one_match() {
        let record = |n: u32| ApplicationRecord {
            app_id: format!("app-{n}"),
            object_id: format!("obj-{n}"),
        };

        let none = MockProvider::new();
        assert!(matches!(
            application_object_id(&none, "ci-app").await.unwrap_err(),
            SetupError::FatalProvider { .. }
        ));

        let one = MockProvider::new().with_existing_application("ci-app", record(1));
        assert_eq!(application_object_id(&one, "ci-app").await.unwrap(), "obj-1");

        let two = MockProvider::new()
            .with_existing_application("ci-app", record(1))
            .with_existing_application("ci-app", record(2));
        assert!(matches!(
            application_object_id(&two, "ci-app").await.unwrap_err(),
            SetupError::AmbiguousApplication { count: 2, .. }
        ));
    }
}
