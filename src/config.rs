//! Migration configuration.
//!
//! A `MigrationConfig` is built once, validated before any network call and
//! then passed by reference to every component.

use crate::capability::Requirement;
use crate::types::{RepoRef, Visibility};

/// Which scopes a run migrates between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationMode {
    /// Organization variables from one organization to another
    OrgToOrg {
        source_org: String,
        target_org: String,
        /// Replaces the visibility of every migrated variable
        visibility_override: Option<Visibility>,
    },
    /// Repository variables, then every environment and its variables
    RepoToRepo {
        source: RepoRef,
        target: RepoRef,
        skip_environments: bool,
    },
    /// Variables of one environment into another
    EnvToEnv {
        source: RepoRef,
        source_env: String,
        target: RepoRef,
        target_env: String,
    },
}

/// Validated, immutable configuration of one migration run.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    mode: MigrationMode,
    dry_run: bool,
    force: bool,
}

impl MigrationConfig {
    /// Validate and build a configuration.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a coordinate is empty, source and target
    /// are the same, or the visibility override is `selected`.
    pub fn new(mode: MigrationMode, dry_run: bool, force: bool) -> Result<Self, ConfigError> {
        validate(&mode)?;
        Ok(Self {
            mode,
            dry_run,
            force,
        })
    }

    #[must_use]
    pub fn mode(&self) -> &MigrationMode {
        &self.mode
    }

    /// Simulate writes instead of performing them.
    #[must_use]
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Overwrite variables that already exist in the target.
    #[must_use]
    pub fn force(&self) -> bool {
        self.force
    }

    /// The capability both credentials need for this mode.
    #[must_use]
    pub fn requirement(&self) -> Requirement {
        match self.mode {
            MigrationMode::OrgToOrg { .. } => Requirement::Organization,
            MigrationMode::RepoToRepo { .. } | MigrationMode::EnvToEnv { .. } => {
                Requirement::Repository
            }
        }
    }

    /// Human-readable description of the run.
    #[must_use]
    pub fn description(&self) -> String {
        match &self.mode {
            MigrationMode::OrgToOrg {
                source_org,
                target_org,
                ..
            } => format!("Organization {source_org} → {target_org}"),
            MigrationMode::RepoToRepo { source, target, .. } => {
                format!("Repository {source} → {target}")
            }
            MigrationMode::EnvToEnv {
                source,
                source_env,
                target,
                target_env,
            } => format!("Environment {source_env} → {target_env} (Repository: {source} → {target})"),
        }
    }
}

fn require(value: &str, field: &'static str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Missing(field));
    }
    Ok(())
}

fn require_repo(repo: &RepoRef, fields: [&'static str; 2]) -> Result<(), ConfigError> {
    require(&repo.owner, fields[0])?;
    require(&repo.name, fields[1])
}

const SOURCE_REPO: [&str; 2] = ["source owner", "source repository"];
const TARGET_REPO: [&str; 2] = ["target owner", "target repository"];

fn validate(mode: &MigrationMode) -> Result<(), ConfigError> {
    match mode {
        MigrationMode::OrgToOrg {
            source_org,
            target_org,
            visibility_override,
        } => {
            require(source_org, "source organization")?;
            require(target_org, "target organization")?;
            if source_org.eq_ignore_ascii_case(target_org) {
                return Err(ConfigError::SameSourceAndTarget("organizations"));
            }
            if *visibility_override == Some(Visibility::Selected) {
                return Err(ConfigError::InvalidVisibilityOverride);
            }
        }
        MigrationMode::RepoToRepo { source, target, .. } => {
            require_repo(source, SOURCE_REPO)?;
            require_repo(target, TARGET_REPO)?;
            if same_repo(source, target) {
                return Err(ConfigError::SameSourceAndTarget("repositories"));
            }
        }
        MigrationMode::EnvToEnv {
            source,
            source_env,
            target,
            target_env,
        } => {
            require_repo(source, SOURCE_REPO)?;
            require(source_env, "source environment")?;
            require_repo(target, TARGET_REPO)?;
            require(target_env, "target environment")?;
            if same_repo(source, target) && source_env == target_env {
                return Err(ConfigError::SameSourceAndTarget("environments"));
            }
        }
    }
    Ok(())
}

fn same_repo(a: &RepoRef, b: &RepoRef) -> bool {
    a.owner.eq_ignore_ascii_case(&b.owner) && a.name.eq_ignore_ascii_case(&b.name)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("source and target {0} cannot be the same")]
    SameSourceAndTarget(&'static str),
    #[error("visibility override must be 'all' or 'private'")]
    InvalidVisibilityOverride,
    #[error("{0}")]
    InvalidFlags(String),
}
