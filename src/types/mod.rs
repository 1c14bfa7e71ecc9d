//! Data model types for the platform API.

pub mod accounts;
pub mod environments;
pub mod repos;
pub mod variables;

// Re-exports
pub use accounts::{CurrentUser, Side};
pub use environments::Environment;
pub use repos::{RepoRef, Repository};
pub use variables::{Variable, VariableScope, Visibility};
