//! Visibility resolution for organization variables.
//!
//! Repository ids are account-local, so a `selected` variable is re-bound to
//! the target organization by repository name.

use tracing::debug;

use crate::api::PlatformApi;
use crate::progress::Progress;
use crate::types::{RepoRef, Variable, Visibility};

pub(crate) struct VisibilityResolver<'a> {
    source: &'a dyn PlatformApi,
    target: &'a dyn PlatformApi,
    progress: &'a dyn Progress,
    source_org: &'a str,
    target_org: &'a str,
    visibility_override: Option<Visibility>,
}

impl<'a> VisibilityResolver<'a> {
    pub(crate) fn new(
        source: &'a dyn PlatformApi,
        target: &'a dyn PlatformApi,
        progress: &'a dyn Progress,
        source_org: &'a str,
        target_org: &'a str,
        visibility_override: Option<Visibility>,
    ) -> Self {
        Self {
            source,
            target,
            progress,
            source_org,
            target_org,
            visibility_override,
        }
    }

    /// Give a source variable the visibility it should have in the target.
    ///
    /// An override wins outright. `all` and `private` pass through, a missing
    /// visibility becomes `all`. `selected` keeps the repositories whose names
    /// exist in the target organization; unmatched names are dropped with a
    /// warning and no match at all still yields an explicit empty selection.
    pub(crate) async fn resolve(&self, variable: Variable) -> Variable {
        if let Some(visibility) = self.visibility_override {
            debug!(variable = %variable.name, visibility = %visibility, "Applying visibility override");
            return variable.with_visibility(visibility, Vec::new());
        }

        match variable.visibility {
            Some(Visibility::Selected) => {
                let ids = self.resolve_selected(&variable.name).await;
                variable.with_visibility(Visibility::Selected, ids)
            }
            Some(visibility) => variable.with_visibility(visibility, Vec::new()),
            None => variable.with_visibility(Visibility::All, Vec::new()),
        }
    }

    async fn resolve_selected(&self, name: &str) -> Vec<u64> {
        // A failed read degrades to an empty selection rather than failing the variable
        let repositories = match self.source.selected_repositories(self.source_org, name).await {
            Ok(repositories) => repositories,
            Err(e) => {
                self.progress.warning(&format!(
                    "Could not fetch selected repositories of variable '{name}': {e}; migrating with an empty selection"
                ));
                return Vec::new();
            }
        };

        let mut ids = Vec::with_capacity(repositories.len());
        for repository in &repositories {
            let candidate = RepoRef::new(self.target_org, &repository.name);
            match self.target.find_repository(&candidate).await {
                Ok(Some(found)) => {
                    debug!(variable = name, repository = %candidate, id = found.id, "Matched selected repository");
                    ids.push(found.id);
                }
                Ok(None) => self.progress.warning(&format!(
                    "Repository '{}' of variable '{name}' not found in target organization {}; dropping it",
                    repository.name, self.target_org
                )),
                Err(e) => self.progress.warning(&format!(
                    "Could not look up repository '{candidate}' for variable '{name}': {e}; dropping it"
                )),
            }
        }

        if ids.is_empty() && !repositories.is_empty() {
            self.progress.warning(&format!(
                "None of the selected repositories of variable '{name}' exist in {}; migrating with an empty selection",
                self.target_org
            ));
        }
        ids
    }
}
