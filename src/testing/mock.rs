//! In-memory platform for testing.
//!
//! `MockPlatform` implements `PlatformApi` over plain collections, records
//! every call and can be told to fail specific operations.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::api::PlatformApi;
use crate::capability::CapabilitySet;
use crate::error::{ApiError, Error};
use crate::migrator::MigrationResult;
use crate::progress::{NoticeLevel, Progress};
use crate::types::{CurrentUser, Environment, RepoRef, Repository, Variable, VariableScope};

/// Record of a method call.
#[derive(Debug, Clone)]
pub struct MockCall {
    /// Method name (e.g., "variables.create", "environments.get")
    pub method: String,
    /// Arguments passed to the method
    pub args: Vec<String>,
    /// Timestamp of the call
    pub timestamp: DateTime<Utc>,
}

impl MockCall {
    /// Create a new mock call record.
    pub fn new(method: &str, args: Vec<String>) -> Self {
        Self {
            method: method.to_string(),
            args,
            timestamp: Utc::now(),
        }
    }
}

/// Methods that mutate the platform.
const WRITE_METHODS: &[&str] = &[
    "variables.create",
    "variables.update",
    "environments.create",
];

fn not_found(what: &str) -> Error {
    Error::Api(ApiError::NotFound {
        message: format!("{what} not found"),
        request_id: None,
    })
}

struct MockPlatformState {
    user: CurrentUser,
    credentials_valid: bool,
    scopes: CapabilitySet,
    variables: HashMap<VariableScope, Vec<Variable>>,
    environments: HashMap<RepoRef, Vec<Environment>>,
    repositories: HashMap<RepoRef, Repository>,
    selected: HashMap<(String, String), Vec<Repository>>,
    failures: HashMap<(String, String), ApiError>,
    calls: Vec<MockCall>,
    next_id: u64,
}

impl MockPlatformState {
    fn record_call(&mut self, method: &str, args: Vec<String>) {
        self.calls.push(MockCall::new(method, args));
    }

    /// Record the call and return the injected failure for it, if any.
    fn enter(&mut self, method: &str, key: &str) -> Result<(), Error> {
        self.record_call(method, vec![key.to_string()]);
        let injected = self
            .failures
            .get(&(method.to_string(), key.to_string()))
            .or_else(|| self.failures.get(&(method.to_string(), "*".to_string())));
        match injected {
            Some(error) => Err(Error::Api(error.clone())),
            None => Ok(()),
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn has_environment(&self, repo: &RepoRef, name: &str) -> bool {
        self.environments
            .get(repo)
            .is_some_and(|envs| envs.iter().any(|e| e.name == name))
    }
}

/// In-memory `PlatformApi` implementation.
///
/// # Example
///
/// ```rust,ignore
/// use vars_migrator::testing::MockPlatform;
///
/// let target = MockPlatform::new("target-user");
/// target.add_variable(&VariableScope::organization("org"), Variable::new("A", "0"));
///
/// // ... run a migration against it ...
///
/// assert_eq!(target.call_count("variables.create"), 1);
/// ```
pub struct MockPlatform {
    state: Mutex<MockPlatformState>,
}

impl MockPlatform {
    /// Create an empty platform authenticating as `login`.
    ///
    /// Scopes start out unknown, so capability validation is skipped.
    pub fn new(login: &str) -> Self {
        Self {
            state: Mutex::new(MockPlatformState {
                user: CurrentUser {
                    login: login.to_string(),
                    name: None,
                    email: None,
                },
                credentials_valid: true,
                scopes: CapabilitySet::Unknown,
                variables: HashMap::new(),
                environments: HashMap::new(),
                repositories: HashMap::new(),
                selected: HashMap::new(),
                failures: HashMap::new(),
                calls: Vec::new(),
                next_id: 1000,
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockPlatformState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Report these scopes for the credential.
    pub fn set_scopes(&self, scopes: &[&str]) {
        self.state().scopes =
            CapabilitySet::Known(scopes.iter().map(ToString::to_string).collect());
    }

    /// Reject the credential with a 401.
    pub fn reject_credentials(&self) {
        self.state().credentials_valid = false;
    }

    /// Seed a variable.
    pub fn add_variable(&self, scope: &VariableScope, variable: Variable) {
        self.state()
            .variables
            .entry(scope.clone())
            .or_default()
            .push(variable);
    }

    /// Seed an environment.
    pub fn add_environment(&self, repo: &RepoRef, name: &str) -> Environment {
        let mut state = self.state();
        let environment = Environment {
            id: state.next_id(),
            name: name.to_string(),
            created_at: Some(Utc::now()),
        };
        state
            .environments
            .entry(repo.clone())
            .or_default()
            .push(environment.clone());
        environment
    }

    /// Seed a repository.
    pub fn add_repository(&self, repo: &RepoRef) -> Repository {
        let mut state = self.state();
        let repository = Repository {
            id: state.next_id(),
            name: repo.name.clone(),
            full_name: repo.to_string(),
            private: false,
        };
        state.repositories.insert(repo.clone(), repository.clone());
        repository
    }

    /// Seed the repositories an organization variable is shared with.
    pub fn set_selected_repositories(&self, org: &str, name: &str, repositories: Vec<Repository>) {
        self.state()
            .selected
            .insert((org.to_string(), name.to_string()), repositories);
    }

    /// Make `method` fail for `key` (a variable, environment or repository
    /// name; `"*"` matches any key).
    pub fn fail_on(&self, method: &str, key: &str, error: ApiError) {
        self.state()
            .failures
            .insert((method.to_string(), key.to_string()), error);
    }

    /// Variables currently stored in a scope, in insertion order.
    #[must_use]
    pub fn variables(&self, scope: &VariableScope) -> Vec<Variable> {
        self.state().variables.get(scope).cloned().unwrap_or_default()
    }

    /// One stored variable.
    #[must_use]
    pub fn variable(&self, scope: &VariableScope, name: &str) -> Option<Variable> {
        self.variables(scope).into_iter().find(|v| v.name == name)
    }

    /// Names of the environments of a repository, in creation order.
    #[must_use]
    pub fn environment_names(&self, repo: &RepoRef) -> Vec<String> {
        self.state()
            .environments
            .get(repo)
            .map(|envs| envs.iter().map(|e| e.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Check if a method was called.
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.call_count(method) > 0
    }

    /// Get the number of times a method was called.
    #[must_use]
    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| call.method == method)
            .count()
    }

    /// Number of mutating calls.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| WRITE_METHODS.contains(&call.method.as_str()))
            .count()
    }

    /// Get recorded calls, optionally filtered by method.
    #[must_use]
    pub fn get_calls(&self, method: Option<&str>) -> Vec<MockCall> {
        let state = self.state();
        match method {
            Some(m) => state.calls.iter().filter(|call| call.method == m).cloned().collect(),
            None => state.calls.clone(),
        }
    }

    /// Reset all recorded calls.
    pub fn reset(&self) {
        self.state().calls.clear();
    }
}

#[async_trait]
impl PlatformApi for MockPlatform {
    async fn authenticated_user(&self) -> Result<CurrentUser, Error> {
        let mut state = self.state();
        state.enter("users.current", "")?;
        if !state.credentials_valid {
            return Err(Error::Api(ApiError::Authentication {
                message: "Bad credentials".to_string(),
                request_id: None,
            }));
        }
        Ok(state.user.clone())
    }

    async fn capabilities(&self) -> Result<CapabilitySet, Error> {
        let mut state = self.state();
        state.enter("users.scopes", "")?;
        Ok(state.scopes.clone())
    }

    async fn wait_for_rate_limit(&self) {
        self.state().record_call("rate_limit.wait", Vec::new());
    }

    async fn list_variables(&self, scope: &VariableScope) -> Result<Vec<Variable>, Error> {
        let mut state = self.state();
        state.enter("variables.list", &scope.to_string())?;
        Ok(state.variables.get(scope).cloned().unwrap_or_default())
    }

    async fn get_variable(
        &self,
        scope: &VariableScope,
        name: &str,
    ) -> Result<Option<Variable>, Error> {
        let mut state = self.state();
        state.enter("variables.get", name)?;
        Ok(state
            .variables
            .get(scope)
            .and_then(|vars| vars.iter().find(|v| v.name == name))
            .cloned())
    }

    async fn create_variable(&self, scope: &VariableScope, variable: &Variable) -> Result<(), Error> {
        let mut state = self.state();
        state.enter("variables.create", &variable.name)?;

        if let VariableScope::Environment { repo, environment } = scope {
            if !state.has_environment(repo, environment) {
                return Err(not_found(&format!("environment '{environment}'")));
            }
        }

        let vars = state.variables.entry(scope.clone()).or_default();
        if vars.iter().any(|v| v.name == variable.name) {
            return Err(Error::Api(ApiError::Conflict {
                message: "Already exists".to_string(),
                request_id: None,
            }));
        }
        vars.push(variable.clone());
        Ok(())
    }

    async fn update_variable(&self, scope: &VariableScope, variable: &Variable) -> Result<(), Error> {
        let mut state = self.state();
        state.enter("variables.update", &variable.name)?;

        let existing = state
            .variables
            .get_mut(scope)
            .and_then(|vars| vars.iter_mut().find(|v| v.name == variable.name))
            .ok_or_else(|| not_found(&format!("variable '{}'", variable.name)))?;
        *existing = variable.clone();
        Ok(())
    }

    async fn list_environments(&self, repo: &RepoRef) -> Result<Vec<Environment>, Error> {
        let mut state = self.state();
        state.enter("environments.list", &repo.to_string())?;
        Ok(state.environments.get(repo).cloned().unwrap_or_default())
    }

    async fn get_environment(
        &self,
        repo: &RepoRef,
        name: &str,
    ) -> Result<Option<Environment>, Error> {
        let mut state = self.state();
        state.enter("environments.get", name)?;
        Ok(state
            .environments
            .get(repo)
            .and_then(|envs| envs.iter().find(|e| e.name == name))
            .cloned())
    }

    async fn create_environment(&self, repo: &RepoRef, name: &str) -> Result<Environment, Error> {
        let mut state = self.state();
        state.enter("environments.create", name)?;

        if let Some(existing) = state
            .environments
            .get(repo)
            .and_then(|envs| envs.iter().find(|e| e.name == name))
        {
            return Ok(existing.clone());
        }

        let environment = Environment {
            id: state.next_id(),
            name: name.to_string(),
            created_at: Some(Utc::now()),
        };
        state
            .environments
            .entry(repo.clone())
            .or_default()
            .push(environment.clone());
        Ok(environment)
    }

    async fn selected_repositories(
        &self,
        org: &str,
        name: &str,
    ) -> Result<Vec<Repository>, Error> {
        let mut state = self.state();
        state.enter("variables.selected_repositories", name)?;
        Ok(state
            .selected
            .get(&(org.to_string(), name.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn find_repository(&self, repo: &RepoRef) -> Result<Option<Repository>, Error> {
        let mut state = self.state();
        state.enter("repos.get", &repo.name)?;
        Ok(state.repositories.get(repo).cloned())
    }
}

/// Progress sink that keeps every notice for later assertions.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    notices: Mutex<Vec<(NoticeLevel, String)>>,
    summaries: Mutex<usize>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// All notices, in emission order.
    #[must_use]
    pub fn notices(&self) -> Vec<(NoticeLevel, String)> {
        self.notices.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Messages of one level.
    #[must_use]
    pub fn messages(&self, level: NoticeLevel) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    /// Whether a notice of `level` contains `needle`.
    #[must_use]
    pub fn contains(&self, level: NoticeLevel, needle: &str) -> bool {
        self.messages(level).iter().any(|m| m.contains(needle))
    }

    /// Number of summaries emitted.
    #[must_use]
    pub fn summary_count(&self) -> usize {
        *self.summaries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Progress for RecordingProgress {
    fn notify(&self, level: NoticeLevel, message: &str) {
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((level, message.to_string()));
    }

    fn summary(&self, _result: &MigrationResult) {
        *self.summaries.lock().unwrap_or_else(|e| e.into_inner()) += 1;
    }
}
