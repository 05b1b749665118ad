//! In-memory provider doubles with call recording.
//!
//! Used by the orchestrator tests and by `fedlink setup --mock` dry runs.
//! State mutations record a human-readable entry in the call log so tests
//! can assert exactly which mutating calls a run issued.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    ApplicationRecord, CloudIdentityProvider, FederatedCredential, ProviderError, ProviderResult,
    RoleAssignment, SourceControlClient,
};

#[derive(Default)]
struct MockState {
    applications: Vec<(String, ApplicationRecord)>,
    service_principals: Vec<(String, String)>,
    role_assignments: Vec<RoleAssignment>,
    credentials: Vec<(String, FederatedCredential)>,
    /// Created credentials not yet visible to list calls, with the number
    /// of list calls still to go before they appear.
    pending_credentials: Vec<(String, FederatedCredential, usize)>,
    next_id: u32,
}

enum SubscriptionPolicy {
    AcceptAll,
    Known(HashSet<String>),
}

/// Deterministic identity-provider double.
///
/// `new()` yields a blank tenant that accepts every subscription and where
/// every creation succeeds and is immediately visible. The builder methods
/// seed existing resources or inject failures.
pub struct MockProvider {
    state: Mutex<MockState>,
    subscription_policy: SubscriptionPolicy,
    tenant: String,
    sp_creation_error: Option<String>,
    role_assignment_error: Option<String>,
    failing_credential_names: HashSet<String>,
    credential_visibility_delay: usize,
    calls: Mutex<Vec<String>>,
    mutations: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            subscription_policy: SubscriptionPolicy::AcceptAll,
            tenant: "mock-tenant".to_string(),
            sp_creation_error: None,
            role_assignment_error: None,
            failing_credential_names: HashSet::new(),
            credential_visibility_delay: 0,
            calls: Mutex::new(Vec::new()),
            mutations: Mutex::new(Vec::new()),
        }
    }

    /// Only the given subscription ids pass the existence probe.
    pub fn with_known_subscriptions<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subscription_policy =
            SubscriptionPolicy::Known(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_existing_application(self, display_name: &str, record: ApplicationRecord) -> Self {
        self.state
            .lock()
            .unwrap()
            .applications
            .push((display_name.to_string(), record));
        self
    }

    pub fn with_existing_service_principal(self, app_id: &str, object_id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .service_principals
            .push((app_id.to_string(), object_id.to_string()));
        self
    }

    pub fn with_existing_credential(
        self,
        app_object_id: &str,
        credential: FederatedCredential,
    ) -> Self {
        self.state
            .lock()
            .unwrap()
            .credentials
            .push((app_object_id.to_string(), credential));
        self
    }

    pub fn with_existing_role_assignment(self, assignment: RoleAssignment) -> Self {
        self.state
            .lock()
            .unwrap()
            .role_assignments
            .push(assignment);
        self
    }

    /// Make `create_service_principal` fail with the given provider text.
    pub fn failing_service_principal_creation(mut self, detail: &str) -> Self {
        self.sp_creation_error = Some(detail.to_string());
        self
    }

    /// Make `create_role_assignment` fail with the given provider text.
    pub fn failing_role_assignment(mut self, detail: &str) -> Self {
        self.role_assignment_error = Some(detail.to_string());
        self
    }

    /// Make creation of the named credential fail.
    pub fn failing_credential_creation(mut self, name: &str) -> Self {
        self.failing_credential_names.insert(name.to_string());
        self
    }

    /// Created credentials become visible to list calls only after this
    /// many further list calls, simulating provider propagation lag.
    pub fn with_credential_visibility_delay(mut self, list_calls: usize) -> Self {
        self.credential_visibility_delay = list_calls;
        self
    }

    /// Every call issued so far, reads included, in order.
    pub fn call_log(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Every mutating call issued so far, in order.
    pub fn mutation_log(&self) -> Vec<String> {
        self.mutations.lock().unwrap().clone()
    }

    /// Role assignments issued so far.
    pub fn role_assignments(&self) -> Vec<RoleAssignment> {
        self.state.lock().unwrap().role_assignments.clone()
    }

    /// All credentials created on the given application, visible or not.
    pub fn created_credentials(&self, app_object_id: &str) -> Vec<FederatedCredential> {
        let state = self.state.lock().unwrap();
        let mut created: Vec<FederatedCredential> = state
            .credentials
            .iter()
            .filter(|(id, _)| id == app_object_id)
            .map(|(_, c)| c.clone())
            .collect();
        created.extend(
            state
                .pending_credentials
                .iter()
                .filter(|(id, _, _)| id == app_object_id)
                .map(|(_, c, _)| c.clone()),
        );
        created
    }

    fn record_call(&self, entry: impl Into<String>) {
        self.calls.lock().unwrap().push(entry.into());
    }

    fn record(&self, entry: String) {
        self.calls.lock().unwrap().push(entry.clone());
        self.mutations.lock().unwrap().push(entry);
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CloudIdentityProvider for MockProvider {
    async fn subscription_exists(&self, subscription_id: &str) -> ProviderResult<bool> {
        self.record_call(format!("subscription_exists({subscription_id})"));
        if subscription_id.is_empty() {
            return Ok(false);
        }
        Ok(match &self.subscription_policy {
            SubscriptionPolicy::AcceptAll => true,
            SubscriptionPolicy::Known(ids) => ids.contains(subscription_id),
        })
    }

    async fn list_applications(
        &self,
        display_name: &str,
    ) -> ProviderResult<Vec<ApplicationRecord>> {
        self.record_call(format!("list_applications({display_name})"));
        let state = self.state.lock().unwrap();
        Ok(state
            .applications
            .iter()
            .filter(|(name, _)| name == display_name)
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn create_application(&self, display_name: &str) -> ProviderResult<ApplicationRecord> {
        self.record(format!("create_application({display_name})"));
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let record = ApplicationRecord {
            app_id: format!("mock-app-{}", state.next_id),
            object_id: format!("mock-app-obj-{}", state.next_id),
        };
        state
            .applications
            .push((display_name.to_string(), record.clone()));
        Ok(record)
    }

    async fn list_service_principals(&self, app_id: &str) -> ProviderResult<Vec<String>> {
        self.record_call(format!("list_service_principals({app_id})"));
        let state = self.state.lock().unwrap();
        Ok(state
            .service_principals
            .iter()
            .filter(|(bound_app, _)| bound_app == app_id)
            .map(|(_, object_id)| object_id.clone())
            .collect())
    }

    async fn create_service_principal(&self, app_id: &str) -> ProviderResult<String> {
        self.record(format!("create_service_principal({app_id})"));
        if let Some(detail) = &self.sp_creation_error {
            return Err(ProviderError::call_failed("az ad sp create", detail.clone()));
        }
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let object_id = format!("mock-sp-{}", state.next_id);
        state
            .service_principals
            .push((app_id.to_string(), object_id.clone()));
        Ok(object_id)
    }

    async fn role_assignment_exists(
        &self,
        scope: &str,
        principal_object_id: &str,
    ) -> ProviderResult<bool> {
        self.record_call(format!("role_assignment_exists({scope})"));
        let state = self.state.lock().unwrap();
        Ok(state.role_assignments.iter().any(|assignment| {
            assignment.scope == scope && assignment.principal_object_id == principal_object_id
        }))
    }

    async fn create_role_assignment(&self, assignment: &RoleAssignment) -> ProviderResult<()> {
        self.record(format!("create_role_assignment({})", assignment.scope));
        if let Some(detail) = &self.role_assignment_error {
            return Err(ProviderError::call_failed(
                "az role assignment create",
                detail.clone(),
            ));
        }
        self.state
            .lock()
            .unwrap()
            .role_assignments
            .push(assignment.clone());
        Ok(())
    }

    async fn tenant_id(&self) -> ProviderResult<String> {
        self.record_call("tenant_id");
        Ok(self.tenant.clone())
    }

    async fn list_federated_credentials(
        &self,
        app_object_id: &str,
    ) -> ProviderResult<Vec<FederatedCredential>> {
        self.record_call(format!("list_federated_credentials({app_object_id})"));
        let mut state = self.state.lock().unwrap();

        // Age pending credentials by one list call; any that reach zero
        // become visible to this and all later calls.
        let mut matured = Vec::new();
        for entry in &mut state.pending_credentials {
            entry.2 -= 1;
            if entry.2 == 0 {
                matured.push((entry.0.clone(), entry.1.clone()));
            }
        }
        state.pending_credentials.retain(|(_, _, left)| *left > 0);
        state.credentials.extend(matured);

        Ok(state
            .credentials
            .iter()
            .filter(|(id, _)| id == app_object_id)
            .map(|(_, c)| c.clone())
            .collect())
    }

    async fn create_federated_credential(
        &self,
        app_object_id: &str,
        credential: &FederatedCredential,
    ) -> ProviderResult<()> {
        self.record(format!("create_federated_credential({})", credential.name));
        if self.failing_credential_names.contains(&credential.name) {
            return Err(ProviderError::call_failed(
                "az rest POST federatedIdentityCredentials",
                format!("simulated failure creating '{}'", credential.name),
            ));
        }
        let mut state = self.state.lock().unwrap();
        if self.credential_visibility_delay > 0 {
            state.pending_credentials.push((
                app_object_id.to_string(),
                credential.clone(),
                self.credential_visibility_delay,
            ));
        } else {
            state
                .credentials
                .push((app_object_id.to_string(), credential.clone()));
        }
        Ok(())
    }
}

/// Source-control double: authenticated by default, every repo visible
/// unless a visibility allowlist is set.
pub struct MockSourceControl {
    authenticated: bool,
    visible_repos: Option<HashSet<String>>,
}

impl MockSourceControl {
    pub fn new() -> Self {
        Self {
            authenticated: true,
            visible_repos: None,
        }
    }

    pub fn unauthenticated() -> Self {
        Self {
            authenticated: false,
            visible_repos: None,
        }
    }

    pub fn with_visible_repos<I, S>(mut self, repos: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.visible_repos = Some(repos.into_iter().map(Into::into).collect());
        self
    }
}

impl Default for MockSourceControl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceControlClient for MockSourceControl {
    async fn session_authenticated(&self) -> ProviderResult<bool> {
        Ok(self.authenticated)
    }

    async fn repository_visible(&self, repo: &str) -> ProviderResult<bool> {
        if !self.authenticated {
            return Ok(false);
        }
        Ok(match &self.visible_repos {
            None => true,
            Some(repos) => repos.contains(repo),
        })
    }
}
