//! Federated-credential management: the trust records that let GitHub
//! Actions tokens be exchanged for provider access tokens.
//!
//! Three fixed subjects per run (pull requests, `main`, `master`). The
//! idempotence check is precise: only the expected credential names that
//! are actually missing get created, so an unrelated credential on the same
//! application never suppresses creation.
//!
//! Newly created credentials are not immediately visible to reads, so the
//! manager sleeps once for a fixed settle interval and then re-lists up to
//! a bounded number of times with no further delay. Exhausting the bound is
//! not a failure; it is reported as [`FederationStatus::Unconfirmed`].

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::error::{Result, SetupError};
use crate::provider::{CloudIdentityProvider, FederatedCredential};
use crate::request::FederationStatus;

/// OIDC issuer for GitHub Actions workflow tokens.
pub const GITHUB_OIDC_ISSUER: &str = "https://token.actions.githubusercontent.com";

/// Audience accepted by the provider's token exchange.
pub const TOKEN_EXCHANGE_AUDIENCE: &str = "api://AzureADTokenExchange";

/// One settle wait before the first confirmation poll.
const SETTLE_DELAY: Duration = Duration::from_secs(10);

/// Confirmation polls after the settle wait, issued back to back.
const CONFIRM_POLL_LIMIT: u32 = 10;

/// The three trust subjects configured for every repository.
pub fn expected_credentials(repo: &str) -> [FederatedCredential; 3] {
    let credential = |name: &str, subject: String, description: &str| FederatedCredential {
        name: name.to_string(),
        issuer: GITHUB_OIDC_ISSUER.to_string(),
        subject,
        description: description.to_string(),
        audiences: vec![TOKEN_EXCHANGE_AUDIENCE.to_string()],
    };

    [
        credential("prfic", format!("repo:{repo}:pull_request"), "pr"),
        credential("mainfic", format!("repo:{repo}:ref:refs/heads/main"), "main"),
        credential(
            "masterfic",
            format!("repo:{repo}:ref:refs/heads/master"),
            "master",
        ),
    ]
}

/// Create whichever of the expected credentials are missing, then wait for
/// the provider to confirm they are visible.
pub async fn ensure_federated_credentials(
    provider: &dyn CloudIdentityProvider,
    app_object_id: &str,
    repo: &str,
) -> Result<FederationStatus> {
    let expected = expected_credentials(repo);

    let existing = provider
        .list_federated_credentials(app_object_id)
        .await
        .map_err(|e| SetupError::provider("federated-credential listing", e))?;
    let existing_names: HashSet<&str> = existing.iter().map(|c| c.name.as_str()).collect();

    let missing: Vec<&FederatedCredential> = expected
        .iter()
        .filter(|c| !existing_names.contains(c.name.as_str()))
        .collect();

    if missing.is_empty() {
        info!("federated credentials already configured");
        return Ok(FederationStatus::AlreadyConfigured);
    }

    // Best-effort fan-out: a failure on one credential never prevents the
    // remaining creates from being attempted. The provider's list is the
    // source of truth and is re-checked below.
    let mut failures = Vec::new();
    for credential in &missing {
        debug!(name = %credential.name, subject = %credential.subject, "creating federated credential");
        if let Err(e) = provider
            .create_federated_credential(app_object_id, credential)
            .await
        {
            error!(name = %credential.name, error = %e, "federated credential creation failed");
            failures.push(format!("{}: {e}", credential.name));
        }
    }

    if !failures.is_empty() {
        return Err(SetupError::fatal(
            "federated-credential creation",
            failures.join("; "),
        ));
    }

    debug!(
        settle_secs = SETTLE_DELAY.as_secs(),
        "waiting for credentials to propagate"
    );
    tokio::time::sleep(SETTLE_DELAY).await;

    for attempt in 0..CONFIRM_POLL_LIMIT {
        match provider.list_federated_credentials(app_object_id).await {
            Ok(listed) => {
                let names: HashSet<&str> = listed.iter().map(|c| c.name.as_str()).collect();
                if expected.iter().all(|c| names.contains(c.name.as_str())) {
                    info!("federated credentials confirmed");
                    return Ok(FederationStatus::Confirmed);
                }
                debug!(attempt, "credentials not yet visible, retrying");
            }
            Err(e) => {
                // Confirmation is best-effort; a flaky read does not undo
                // creates the provider already accepted.
                debug!(attempt, error = %e, "confirmation poll failed, retrying");
            }
        }
    }

    warn!(
        polls = CONFIRM_POLL_LIMIT,
        "federated credentials created but not yet confirmed by the provider"
    );
    Ok(FederationStatus::Unconfirmed)
}
