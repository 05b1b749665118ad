//! Config validation, the only stage allowed to run before any mutation.

use tracing::debug;

use crate::error::{Result, SetupError};
use crate::provider::{CloudIdentityProvider, SourceControlClient};
use crate::request::SetupRequest;

/// Check that the request is well-formed and its targets reachable.
///
/// Fails fast on the first violation, in a fixed order: subscription id
/// (syntax plus a live existence probe), application display name, resource
/// group name, source-control session, target repository visibility. Only
/// read-only probes are issued; a failure here guarantees no partial
/// provisioning happened.
pub async fn validate(
    provider: &dyn CloudIdentityProvider,
    source_control: &dyn SourceControlClient,
    request: &SetupRequest,
) -> Result<()> {
    debug!("validating setup request");

    if request.subscription_id.is_empty()
        || !provider
            .subscription_exists(&request.subscription_id)
            .await
            .map_err(|e| SetupError::provider("subscription probe", e))?
    {
        return Err(SetupError::Validation(format!(
            "subscription id '{}' is not valid",
            request.subscription_id
        )));
    }

    if request.app_name.is_empty() {
        return Err(SetupError::Validation(
            "application display name must not be empty".into(),
        ));
    }

    if request.resource_group.is_empty() {
        return Err(SetupError::Validation(
            "resource group name must not be empty".into(),
        ));
    }

    if !source_control
        .session_authenticated()
        .await
        .map_err(|e| SetupError::provider("source-control session check", e))?
    {
        return Err(SetupError::Validation(
            "source-control session is not authenticated".into(),
        ));
    }

    if !source_control
        .repository_visible(&request.repo)
        .await
        .map_err(|e| SetupError::provider("repository probe", e))?
    {
        return Err(SetupError::Validation(format!(
            "repository '{}' is not visible to the current session",
            request.repo
        )));
    }

    debug!("setup request validated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MockProvider, MockSourceControl};

    fn request() -> SetupRequest {
        SetupRequest {
            app_name: "ci-app".into(),
            subscription_id: "sub-123".into(),
            resource_group: "rg-1".into(),
            repo: "org/repo".into(),
        }
    }

    #[tokio::test]
    async fn test_accepts_valid_request() {
        let provider = MockProvider::new().with_known_subscriptions(["sub-123"]);
        let sc = MockSourceControl::new();
        validate(&provider, &sc, &request()).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_empty_subscription() {
        let provider = MockProvider::new();
        let sc = MockSourceControl::new();
        let mut req = request();
        req.subscription_id.clear();
        let err = validate(&provider, &sc, &req).await.unwrap_err();
        assert!(matches!(err, SetupError::Validation(_)));
    }

    #[tokio::test]
    async fn test_rejects_unknown_subscription() {
        let provider = MockProvider::new().with_known_subscriptions(["sub-123"]);
        let sc = MockSourceControl::new();
        let mut req = request();
        req.subscription_id = "sub-999".into();
        let err = validate(&provider, &sc, &req).await.unwrap_err();
        assert!(matches!(err, SetupError::Validation(_)));
    }

    #[tokio::test]
    async fn test_rejects_empty_app_name() {
        let provider = MockProvider::new();
        let sc = MockSourceControl::new();
        let mut req = request();
        req.app_name.clear();
        let err = validate(&provider, &sc, &req).await.unwrap_err();
        assert!(matches!(err, SetupError::Validation(_)));
    }

    #[tokio::test]
    async fn test_rejects_empty_resource_group() {
        let provider = MockProvider::new();
        let sc = MockSourceControl::new();
        let mut req = request();
        req.resource_group.clear();
        let err = validate(&provider, &sc, &req).await.unwrap_err();
        assert!(matches!(err, SetupError::Validation(_)));
    }

    #[tokio::test]
    async fn test_rejects_unauthenticated_session() {
        let provider = MockProvider::new();
        let sc = MockSourceControl::unauthenticated();
        let err = validate(&provider, &sc, &request()).await.unwrap_err();
        assert!(matches!(err, SetupError::Validation(_)));
    }

    #[tokio::test]
    async fn test_rejects_invisible_repository() {
        let provider = MockProvider::new();
        let sc = MockSourceControl::new().with_visible_repos(["org/other"]);
        let err = validate(&provider, &sc, &request()).await.unwrap_err();
        assert!(matches!(err, SetupError::Validation(_)));
    }
}
