//! Create / update / skip decision for one target entity.

use tracing::debug;

use crate::api::PlatformApi;
use crate::error::Error;
use crate::progress::Progress;
use crate::types::{RepoRef, Variable, VariableScope};

use super::visibility::VisibilityResolver;
use super::MigrationResult;

/// What reconciling one variable did (or would do in a dry run).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    Skipped,
}

/// How a variable is named in notices and failures.
pub(crate) fn entity_label(scope: &VariableScope, name: &str) -> String {
    match scope {
        VariableScope::Environment { environment, .. } => {
            format!("environment variable '{name}' ({environment})")
        }
        VariableScope::Organization(_) | VariableScope::Repository(_) => {
            format!("variable '{name}'")
        }
    }
}

/// Converges target entities towards source entities.
///
/// Every decision reads the target state immediately before writing.
pub(crate) struct Reconciler<'a> {
    target: &'a dyn PlatformApi,
    progress: &'a dyn Progress,
    visibility: Option<&'a VisibilityResolver<'a>>,
    dry_run: bool,
    force: bool,
}

impl<'a> Reconciler<'a> {
    pub(crate) fn new(
        target: &'a dyn PlatformApi,
        progress: &'a dyn Progress,
        dry_run: bool,
        force: bool,
    ) -> Self {
        Self {
            target,
            progress,
            visibility: None,
            dry_run,
            force,
        }
    }

    /// Resolve organization visibility for every variable that will be written.
    #[must_use]
    pub(crate) fn with_visibility(mut self, resolver: &'a VisibilityResolver<'a>) -> Self {
        self.visibility = Some(resolver);
        self
    }

    /// Reconcile one variable into `scope`.
    ///
    /// # Errors
    ///
    /// Returns the error of the target read or write.
    pub(crate) async fn reconcile(
        &self,
        scope: &VariableScope,
        variable: &Variable,
    ) -> Result<Outcome, Error> {
        let label = entity_label(scope, &variable.name);
        let exists = self
            .target
            .get_variable(scope, &variable.name)
            .await?
            .is_some();

        if exists && !self.force {
            self.progress.warning(&format!(
                "{} already exists in target (use --force to overwrite)",
                capitalize(&label)
            ));
            return Ok(Outcome::Skipped);
        }

        // Only variables that will be written pay for visibility resolution
        let resolved;
        let variable = match self.visibility {
            Some(resolver) => {
                resolved = resolver.resolve(variable.clone()).await;
                &resolved
            }
            None => variable,
        };

        if exists {
            if self.dry_run {
                self.progress.info(&format!("[DRY-RUN] Would update {label}"));
                return Ok(Outcome::Updated);
            }

            self.target.update_variable(scope, variable).await?;
            self.progress.success(&format!("Updated {label}"));
            return Ok(Outcome::Updated);
        }

        if self.dry_run {
            self.progress.info(&format!("[DRY-RUN] Would create {label}"));
            return Ok(Outcome::Created);
        }

        self.target.create_variable(scope, variable).await?;
        self.progress.success(&format!("Created {label}"));
        Ok(Outcome::Created)
    }

    /// Reconcile one variable and fold the outcome into `result`.
    ///
    /// Errors are recorded as per-entity failures and never propagate.
    pub(crate) async fn apply(
        &self,
        scope: &VariableScope,
        variable: &Variable,
        result: &mut MigrationResult,
    ) {
        match self.reconcile(scope, variable).await {
            Ok(Outcome::Created) => result.created += 1,
            Ok(Outcome::Updated) => result.updated += 1,
            Ok(Outcome::Skipped) => result.skipped += 1,
            Err(e) => {
                let label = entity_label(scope, &variable.name);
                self.progress.error(&format!("Failed to migrate {label}: {e}"));
                result.fail(label, e);
            }
        }
    }

    /// Make sure a target environment exists before its variables are written.
    ///
    /// In a dry run the environment is only looked up.
    ///
    /// # Errors
    ///
    /// Returns the error of the lookup or the creation.
    pub(crate) async fn ensure_environment(&self, repo: &RepoRef, name: &str) -> Result<(), Error> {
        if self.dry_run {
            match self.target.get_environment(repo, name).await? {
                Some(_) => debug!(repo = %repo, environment = name, "Environment exists in target"),
                None => self.progress.info(&format!(
                    "[DRY-RUN] Would create environment '{name}' in {repo}"
                )),
            }
            return Ok(());
        }

        let (environment, created) = self.target.ensure_environment(repo, name).await?;
        if created {
            self.progress
                .success(&format!("Created environment '{name}' in {repo}"));
        } else {
            debug!(repo = %repo, environment = name, id = environment.id, "Environment exists in target");
        }
        Ok(())
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_label() {
        let repo = RepoRef::new("o", "r");
        assert_eq!(
            entity_label(&VariableScope::Repository(repo.clone()), "A"),
            "variable 'A'"
        );
        assert_eq!(
            entity_label(&VariableScope::environment(repo, "prod"), "A"),
            "environment variable 'A' (prod)"
        );
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("variable 'A'"), "Variable 'A'");
        assert_eq!(capitalize(""), "");
    }
}
