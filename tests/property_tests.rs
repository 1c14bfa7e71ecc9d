//! Property-based tests for the migrator.
//!
//! These tests validate correctness properties across generated inputs.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use proptest::prelude::*;

use vars_migrator::capability::{has_scope, SCOPE_HIERARCHY};
use vars_migrator::testing::{MockPlatform, RecordingProgress};
use vars_migrator::{
    api_base_url, MigrationConfig, MigrationMode, MigrationResult, Migrator, RateLimitInfo,
    Variable, VariableScope,
};

const SOURCE_ORG: &str = "source-org";
const TARGET_ORG: &str = "target-org";

/// Source variable names and, for each, whether the target already has it.
fn scenario() -> impl Strategy<Value = Vec<(String, bool)>> {
    prop::collection::btree_set("[A-Z][A-Z0-9_]{0,8}", 0..12).prop_flat_map(|names| {
        let len = names.len();
        prop::collection::vec(any::<bool>(), len).prop_map(move |present| {
            names.iter().cloned().zip(present).collect::<Vec<_>>()
        })
    })
}

struct Run {
    result: MigrationResult,
    target: Arc<MockPlatform>,
}

fn seeded(scenario: &[(String, bool)]) -> (Arc<MockPlatform>, Arc<MockPlatform>) {
    let source = Arc::new(MockPlatform::new("source-user"));
    let target = Arc::new(MockPlatform::new("target-user"));
    for (name, in_target) in scenario {
        source.add_variable(&VariableScope::organization(SOURCE_ORG), Variable::new(name, "new"));
        if *in_target {
            target.add_variable(&VariableScope::organization(TARGET_ORG), Variable::new(name, "old"));
        }
    }
    (source, target)
}

fn migrate(
    source: Arc<MockPlatform>,
    target: Arc<MockPlatform>,
    dry_run: bool,
    force: bool,
) -> Run {
    let mode = MigrationMode::OrgToOrg {
        source_org: SOURCE_ORG.to_string(),
        target_org: TARGET_ORG.to_string(),
        visibility_override: None,
    };
    let config = MigrationConfig::new(mode, dry_run, force).expect("valid config");
    let migrator = Migrator::new(config, source, target.clone())
        .with_progress(Arc::new(RecordingProgress::new()));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");
    let result = runtime.block_on(migrator.run()).expect("migration should run");
    Run { result, target }
}

fn present_count(scenario: &[(String, bool)]) -> usize {
    scenario.iter().filter(|(_, present)| *present).count()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A dry run reports the same counters as a real run and writes nothing.
    #[test]
    fn test_dry_run_purity(scenario in scenario(), force in any::<bool>()) {
        let (source, target) = seeded(&scenario);
        let dry = migrate(source, target, true, force);

        let (source, target) = seeded(&scenario);
        let real = migrate(source, target, false, force);

        prop_assert_eq!(dry.result.created, real.result.created);
        prop_assert_eq!(dry.result.updated, real.result.updated);
        prop_assert_eq!(dry.result.skipped, real.result.skipped);
        prop_assert_eq!(dry.target.write_count(), 0);
    }

    /// Existing target variables are skipped without force and updated with it, never both.
    #[test]
    fn test_force_semantics(scenario in scenario(), force in any::<bool>()) {
        let present = present_count(&scenario);
        let (source, target) = seeded(&scenario);
        let run = migrate(source, target, false, force);

        prop_assert_eq!(run.result.created, scenario.len() - present);
        if force {
            prop_assert_eq!(run.result.updated, present);
            prop_assert_eq!(run.result.skipped, 0);
        } else {
            prop_assert_eq!(run.result.updated, 0);
            prop_assert_eq!(run.result.skipped, present);
        }
        prop_assert_eq!(run.result.total(), scenario.len());
    }

    /// A second run without force only skips.
    #[test]
    fn test_idempotence(scenario in scenario()) {
        let (source, target) = seeded(&scenario);
        migrate(source.clone(), target.clone(), false, false);
        let second = migrate(source, target, false, false);

        prop_assert_eq!(second.result.created, 0);
        prop_assert_eq!(second.result.updated, 0);
        prop_assert_eq!(second.result.skipped, scenario.len());
    }

    /// A parent scope satisfies each child, a child never satisfies its parent.
    #[test]
    fn test_capability_hierarchy(
        entry in 0..SCOPE_HIERARCHY.len(),
        extra in prop::collection::vec("[a-z]{3,10}", 0..4),
    ) {
        let (parent, children) = SCOPE_HIERARCHY[entry];
        let parents: BTreeSet<_> = SCOPE_HIERARCHY.iter().map(|(p, _)| *p).collect();
        let extra: Vec<String> = extra.into_iter().filter(|s| !parents.contains(s.as_str())).collect();

        for child in children {
            let mut granted = extra.clone();
            granted.push(parent.to_string());
            prop_assert!(has_scope(&granted, child));

            let mut granted = extra.clone();
            granted.push((*child).to_string());
            prop_assert!(!has_scope(&granted, parent));
        }
    }

    /// The throttle only sleeps at or below the threshold and before the reset.
    #[test]
    fn test_throttle_delay(remaining in 0u64..100, reset_offset in -3600i64..3600) {
        let now = Utc.timestamp_opt(1_700_000_000, 0).single().expect("valid timestamp");
        let info = RateLimitInfo {
            limit: 5000,
            remaining,
            reset_at: now + ChronoDuration::seconds(reset_offset),
        };
        let buffer = Duration::from_secs(5);

        match info.throttle_delay(10, buffer, now) {
            Some(wait) => {
                prop_assert!(remaining <= 10);
                prop_assert!(reset_offset > 0);
                prop_assert_eq!(wait, Duration::from_secs(reset_offset.unsigned_abs()) + buffer);
            }
            None => prop_assert!(remaining > 10 || reset_offset <= 0),
        }
    }

    /// Every hostname maps to an https API root.
    #[test]
    fn test_api_base_url_is_https(host in "[a-z][a-z0-9-]{0,20}(\\.[a-z]{2,10}){1,3}") {
        let url = api_base_url(Some(&host));
        prop_assert!(url.starts_with("https://"));
        prop_assert!(url.contains(&host));
    }
}
