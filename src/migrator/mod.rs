//! Migration orchestrator.
//!
//! A run authenticates both sides, validates their capabilities, dispatches
//! once on the migration mode and reports a summary. Entities are processed
//! one at a time, in source listing order.

mod reconcile;
mod result;
mod visibility;

use std::sync::Arc;

use tracing::{debug, info};

use crate::api::PlatformApi;
use crate::capability::{self, CapabilitySet};
use crate::config::{MigrationConfig, MigrationMode};
use crate::error::{AuthFailure, Error};
use crate::progress::{Progress, TracingProgress};
use crate::types::{RepoRef, Side, VariableScope, Visibility};

pub use reconcile::Outcome;
pub use result::{EntityFailure, MigrationResult};

use reconcile::Reconciler;
use visibility::VisibilityResolver;

/// Runs one migration between a source and a target account.
pub struct Migrator {
    config: MigrationConfig,
    source: Arc<dyn PlatformApi>,
    target: Arc<dyn PlatformApi>,
    progress: Arc<dyn Progress>,
}

impl Migrator {
    /// Create a migrator reporting through `tracing`.
    pub fn new(
        config: MigrationConfig,
        source: Arc<dyn PlatformApi>,
        target: Arc<dyn PlatformApi>,
    ) -> Self {
        Self {
            config,
            source,
            target,
            progress: Arc::new(TracingProgress),
        }
    }

    /// Replace the progress sink.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn Progress>) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Run the migration.
    ///
    /// Per-entity failures are collected in the result; only pre-flight
    /// failures and failures to read the source listing abort the run.
    ///
    /// # Errors
    ///
    /// Returns `Error::Authentication` if either credential is rejected,
    /// `Error::MissingCapability` if either is under-scoped, or the error of
    /// a fatal source read.
    pub async fn run(&self) -> Result<MigrationResult, Error> {
        self.progress
            .info(&format!("Starting migration: {}", self.config.description()));
        if self.config.dry_run() {
            self.progress
                .warning("Running in DRY-RUN mode - no changes will be made");
        }

        self.authenticate().await?;
        self.validate_capabilities().await?;

        let mut result = MigrationResult::default();
        match self.config.mode() {
            MigrationMode::OrgToOrg {
                source_org,
                target_org,
                visibility_override,
            } => {
                self.migrate_org_to_org(source_org, target_org, *visibility_override, &mut result)
                    .await?;
            }
            MigrationMode::RepoToRepo {
                source,
                target,
                skip_environments,
            } => {
                self.migrate_repo_to_repo(source, target, *skip_environments, &mut result)
                    .await?;
            }
            MigrationMode::EnvToEnv {
                source,
                source_env,
                target,
                target_env,
            } => {
                self.migrate_env_to_env(source, source_env, target, target_env, &mut result)
                    .await?;
            }
        }

        self.progress.summary(&result);
        Ok(result)
    }

    /// Authenticate both sides, reporting every rejected credential at once.
    async fn authenticate(&self) -> Result<(), Error> {
        let mut failures = Vec::new();

        for (side, api) in self.sides() {
            match api.authenticated_user().await {
                Ok(user) => self
                    .progress
                    .success(&format!("Authenticated to {side} as: {}", user.login)),
                Err(e) => failures.push(AuthFailure {
                    side,
                    reason: e.to_string(),
                }),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Authentication(failures))
        }
    }

    async fn validate_capabilities(&self) -> Result<(), Error> {
        let requirement = self.config.requirement();

        for (side, api) in self.sides() {
            match capability::validate(api, requirement, side).await? {
                CapabilitySet::Unknown => self.progress.info(&format!(
                    "{side} token does not expose scopes; skipping scope validation"
                )),
                CapabilitySet::Known(_) => self.progress.success(&format!(
                    "{side} token has required scope '{}'",
                    requirement.scope()
                )),
            }
        }
        Ok(())
    }

    fn sides(&self) -> [(Side, &dyn PlatformApi); 2] {
        [
            (Side::Source, self.source.as_ref()),
            (Side::Target, self.target.as_ref()),
        ]
    }

    fn reconciler(&self) -> Reconciler<'_> {
        Reconciler::new(
            self.target.as_ref(),
            self.progress.as_ref(),
            self.config.dry_run(),
            self.config.force(),
        )
    }

    async fn migrate_org_to_org(
        &self,
        source_org: &str,
        target_org: &str,
        visibility_override: Option<Visibility>,
        result: &mut MigrationResult,
    ) -> Result<(), Error> {
        self.source.wait_for_rate_limit().await;

        self.progress.info(&format!(
            "Fetching variables from source organization: {source_org}"
        ));
        let variables = self
            .source
            .list_variables(&VariableScope::organization(source_org))
            .await?;
        self.progress.info(&format!(
            "Found {} variable(s) in source organization",
            variables.len()
        ));

        self.target.wait_for_rate_limit().await;

        let resolver = VisibilityResolver::new(
            self.source.as_ref(),
            self.target.as_ref(),
            self.progress.as_ref(),
            source_org,
            target_org,
            visibility_override,
        );
        let reconciler = self.reconciler().with_visibility(&resolver);
        let scope = VariableScope::organization(target_org);

        for variable in &variables {
            reconciler.apply(&scope, variable, result).await;
        }
        Ok(())
    }

    async fn migrate_repo_to_repo(
        &self,
        source: &RepoRef,
        target: &RepoRef,
        skip_environments: bool,
        result: &mut MigrationResult,
    ) -> Result<(), Error> {
        self.source.wait_for_rate_limit().await;

        self.progress
            .info(&format!("Fetching variables from source repository: {source}"));
        let variables = self
            .source
            .list_variables(&VariableScope::Repository(source.clone()))
            .await?;
        self.progress.info(&format!(
            "Found {} variable(s) in source repository",
            variables.len()
        ));

        self.target.wait_for_rate_limit().await;

        let reconciler = self.reconciler();
        let scope = VariableScope::Repository(target.clone());
        for variable in &variables {
            reconciler.apply(&scope, variable, result).await;
        }

        if skip_environments {
            debug!(source = %source, "Skipping environment migration");
            return Ok(());
        }

        self.migrate_environments(source, target, result).await;
        Ok(())
    }

    /// Provision every source environment in the target and migrate its variables.
    ///
    /// Environments are independent: a failure is recorded and the next one
    /// is still attempted.
    async fn migrate_environments(
        &self,
        source: &RepoRef,
        target: &RepoRef,
        result: &mut MigrationResult,
    ) {
        self.source.wait_for_rate_limit().await;

        let environments = match self.source.list_environments(source).await {
            Ok(environments) => environments,
            Err(e) => {
                self.progress
                    .error(&format!("Failed to list environments of {source}: {e}"));
                result.fail(format!("environments of {source}"), e);
                return;
            }
        };

        if environments.is_empty() {
            self.progress
                .info(&format!("No environments found in source repository {source}"));
            return;
        }
        self.progress.info(&format!(
            "Found {} environment(s) in source repository",
            environments.len()
        ));

        for environment in &environments {
            let name = &environment.name;
            info!(environment = %name, "Migrating environment");
            if let Err(e) = self
                .migrate_environment(source, name, target, name, result)
                .await
            {
                self.progress
                    .error(&format!("Failed to migrate environment '{name}': {e}"));
                result.fail(format!("environment '{name}'"), e);
            }
        }
    }

    /// Read the source environment, ensure the target environment exists,
    /// then reconcile each variable into it.
    async fn migrate_environment(
        &self,
        source: &RepoRef,
        source_env: &str,
        target: &RepoRef,
        target_env: &str,
        result: &mut MigrationResult,
    ) -> Result<(), Error> {
        self.source.wait_for_rate_limit().await;
        let variables = self
            .source
            .list_variables(&VariableScope::environment(source.clone(), source_env))
            .await?;
        self.progress.info(&format!(
            "Found {} variable(s) in environment '{source_env}'",
            variables.len()
        ));

        self.target.wait_for_rate_limit().await;
        let reconciler = self.reconciler();
        reconciler.ensure_environment(target, target_env).await?;

        let scope = VariableScope::environment(target.clone(), target_env);
        for variable in &variables {
            reconciler.apply(&scope, variable, result).await;
        }
        Ok(())
    }

    async fn migrate_env_to_env(
        &self,
        source: &RepoRef,
        source_env: &str,
        target: &RepoRef,
        target_env: &str,
        result: &mut MigrationResult,
    ) -> Result<(), Error> {
        self.progress.info(&format!(
            "Migrating environment '{source_env}' of {source} to '{target_env}' of {target}"
        ));
        self.migrate_environment(source, source_env, target, target_env, result)
            .await
    }
}
