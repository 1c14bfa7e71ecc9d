//! Migrate GitHub Actions variables between organizations, repositories and
//! deployment environments.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vars_migrator::{GitHubClient, MigrationConfig, MigrationMode, Migrator};
//!
//! let mode = MigrationMode::OrgToOrg {
//!     source_org: "source-org".to_string(),
//!     target_org: "target-org".to_string(),
//!     visibility_override: None,
//! };
//! let config = MigrationConfig::new(mode, true, false)?;
//!
//! let source = Arc::new(GitHubClient::new("ghp_source", None, None, None)?);
//! let target = Arc::new(GitHubClient::new("ghp_target", None, None, None)?);
//!
//! let result = Migrator::new(config, source, target).run().await?;
//! println!("{} created, {} skipped", result.created, result.skipped);
//! ```

pub mod api;
pub mod capability;
pub mod client;
pub mod clients;
pub mod config;
pub mod credentials;
pub mod error;
pub mod migrator;
pub mod progress;
pub mod rate_limit;
pub mod testing;
pub mod transport;
pub mod types;

// Re-exports
pub use api::PlatformApi;
pub use capability::{CapabilitySet, Requirement};
pub use client::GitHubClient;
pub use clients::{EnvironmentsClient, ReposClient, UsersClient, VariablesClient};
pub use config::{ConfigError, MigrationConfig, MigrationMode};
pub use credentials::{api_base_url, Credential};
pub use error::{ApiError, AuthFailure, Error};
pub use migrator::{EntityFailure, MigrationResult, Migrator, Outcome};
pub use progress::{NoticeLevel, Progress, TracingProgress};
pub use rate_limit::RateLimitInfo;
pub use transport::{HttpTransport, RetryConfig};
pub use types::{
    CurrentUser, Environment, RepoRef, Repository, Side, Variable, VariableScope, Visibility,
};
