//! Deployment environment data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A deployment environment of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Platform-assigned identifier
    pub id: u64,
    /// Environment name, unique within its repository
    pub name: String,
    /// When the environment was created
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Page of environments as returned by the listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EnvironmentPage {
    #[serde(default)]
    pub environments: Vec<Environment>,
}
