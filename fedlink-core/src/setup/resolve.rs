//! Identity resolution: what already exists before anything is created.

use tracing::{debug, warn};

use crate::error::{Result, SetupError};
use crate::provider::{ApplicationRecord, CloudIdentityProvider};

/// Find an application registration by exact display name.
///
/// One or more matches means the registration exists and the first match is
/// reused; the exists-check deliberately does not disambiguate beyond a
/// warning. Transport errors propagate instead of being folded into a
/// "does not exist" answer.
pub async fn resolve_application(
    provider: &dyn CloudIdentityProvider,
    display_name: &str,
) -> Result<Option<ApplicationRecord>> {
    let matches = provider
        .list_applications(display_name)
        .await
        .map_err(|e| SetupError::provider("application lookup", e))?;

    if matches.len() > 1 {
        warn!(
            display_name,
            count = matches.len(),
            "multiple registrations share this display name; reusing the first"
        );
    }

    match matches.into_iter().next() {
        Some(record) => {
            debug!(app_id = %record.app_id, "application registration exists");
            Ok(Some(record))
        }
        None => {
            debug!(display_name, "no application registration found");
            Ok(None)
        }
    }
}

/// Find a service principal bound to the given application id.
///
/// Existence check and object-id capture are one call; a second lookup
/// would be redundant.
pub async fn resolve_service_principal(
    provider: &dyn CloudIdentityProvider,
    app_id: &str,
) -> Result<Option<String>> {
    let object_ids = provider
        .list_service_principals(app_id)
        .await
        .map_err(|e| SetupError::provider("service-principal lookup", e))?;

    match object_ids.into_iter().next() {
        Some(object_id) => {
            debug!(app_id, object_id, "service principal exists");
            Ok(Some(object_id))
        }
        None => {
            debug!(app_id, "no service principal found");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockProvider;

    #[tokio::test]
    async fn test_resolves_existing_application() {
        let record = ApplicationRecord {
            app_id: "app-1".into(),
            object_id: "obj-1".into(),
        };
        let provider = MockProvider::new().with_existing_application("ci-app", record.clone());
        let resolved = resolve_application(&provider, "ci-app").await.unwrap();
        assert_eq!(resolved, Some(record));
    }

    #[tokio::test]
    async fn test_missing_application_resolves_to_none() {
        let provider = MockProvider::new();
        assert_eq!(resolve_application(&provider, "ci-app").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_multiple_matches_reuse_the_first() {
        let first = ApplicationRecord {
            app_id: "app-1".into(),
            object_id: "obj-1".into(),
        };
        let second = ApplicationRecord {
            app_id: "app-2".into(),
            object_id: "obj-2".into(),
        };
        let provider = MockProvider::new()
            .with_existing_application("ci-app", first.clone())
            .with_existing_application("ci-app", second);
        let resolved = resolve_application(&provider, "ci-app").await.unwrap();
        assert_eq!(resolved, Some(first));
    }

    #[tokio::test]
    async fn test_resolves_service_principal_and_captures_object_id() {
        let provider = MockProvider::new().with_existing_service_principal("app-1", "sp-obj-1");
        let resolved = resolve_service_principal(&provider, "app-1").await.unwrap();
        assert_eq!(resolved, Some("sp-obj-1".to_string()));
    }

    #[tokio::test]
    async fn test_missing_service_principal_resolves_to_none() {
        let provider = MockProvider::new();
        assert_eq!(
            resolve_service_principal(&provider, "app-1").await.unwrap(),
            None
        );
    }
}
