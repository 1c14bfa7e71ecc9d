//! Testing utilities.
//!
//! Provides an in-memory platform and a recording progress sink for testing
//! migrations without network access.

mod mock;

pub use mock::{MockCall, MockPlatform, RecordingProgress};
