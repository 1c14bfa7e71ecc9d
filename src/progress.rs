//! Operator-facing progress notifications.
//!
//! The migrator reports every state transition through a `Progress` sink and
//! stays agnostic to how it is rendered.

use std::fmt;

use tracing::{error, info, warn};

use crate::migrator::MigrationResult;

/// Severity of a progress notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// Sink for progress notices and the final summary.
pub trait Progress: Send + Sync {
    fn notify(&self, level: NoticeLevel, message: &str);

    fn summary(&self, result: &MigrationResult);

    fn info(&self, message: &str) {
        self.notify(NoticeLevel::Info, message);
    }

    fn success(&self, message: &str) {
        self.notify(NoticeLevel::Success, message);
    }

    fn warning(&self, message: &str) {
        self.notify(NoticeLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.notify(NoticeLevel::Error, message);
    }
}

/// Renders notices as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl Progress for TracingProgress {
    fn notify(&self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Info | NoticeLevel::Success => info!(outcome = %level, "{message}"),
            NoticeLevel::Warning => warn!(outcome = %level, "{message}"),
            NoticeLevel::Error => error!(outcome = %level, "{message}"),
        }
    }

    fn summary(&self, result: &MigrationResult) {
        info!(
            created = result.created,
            updated = result.updated,
            skipped = result.skipped,
            failed = result.failures.len(),
            total = result.total(),
            "Migration summary"
        );

        if result.has_failures() {
            error!(
                failed = result.failures.len(),
                "Encountered {} error(s) during migration",
                result.failures.len()
            );
            for (i, failure) in result.failures.iter().enumerate() {
                error!(entity = %failure.entity, "  {}. {failure}", i + 1);
            }
        }
    }
}
