//! Migration outcome accumulator.

use std::fmt;

use crate::error::Error;

/// A per-entity failure: which entity, and why.
#[derive(Debug)]
pub struct EntityFailure {
    /// Entity identity, e.g. `variable 'A'` or `environment 'prod'`
    pub entity: String,
    pub error: Error,
}

impl fmt::Display for EntityFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.entity, self.error)
    }
}

/// Counters and failures of one run.
///
/// Failures do not count towards `total()`.
#[derive(Debug, Default)]
pub struct MigrationResult {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failures: Vec<EntityFailure>,
}

impl MigrationResult {
    /// Entities that reached an outcome: created + updated + skipped.
    #[must_use]
    pub fn total(&self) -> usize {
        self.created + self.updated + self.skipped
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Record a per-entity failure.
    pub fn fail(&mut self, entity: impl Into<String>, error: Error) {
        self.failures.push(EntityFailure {
            entity: entity.into(),
            error,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_excludes_failures() {
        let mut result = MigrationResult {
            created: 2,
            updated: 1,
            skipped: 3,
            failures: Vec::new(),
        };
        result.fail("variable 'X'", Error::Http("timeout".to_string()));

        assert_eq!(result.total(), 6);
        assert!(result.has_failures());
        assert_eq!(result.failures[0].to_string(), "variable 'X': HTTP error: timeout");
    }

    #[test]
    fn test_empty_result() {
        let result = MigrationResult::default();
        assert_eq!(result.total(), 0);
        assert!(!result.has_failures());
    }
}
