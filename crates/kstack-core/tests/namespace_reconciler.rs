mod support;

use std::time::Duration;

use kstack_core::clock::{Clock, ManualClock};
use kstack_core::error::{DeployError, FailureKind};
use kstack_core::log::DeployLog;
use kstack_core::namespace::{DeletePolicy, EnsureOutcome, NamespaceReconciler};
use kstack_core::types::NamespacePhase;

use support::{Call, FakeCluster};

fn policy(attempts: u32) -> DeletePolicy {
    DeletePolicy {
        attempts,
        interval: Duration::from_secs(2),
    }
}

#[test]
fn ensure_is_idempotent_on_active_namespace() {
    let cluster = FakeCluster::new().with_namespace("db", NamespacePhase::Active);
    let clock = ManualClock::new();
    let reconciler = NamespaceReconciler::new(&cluster, &clock, DeployLog::disabled());

    assert_eq!(reconciler.ensure("db").unwrap(), EnsureOutcome::AlreadyActive);
    assert_eq!(reconciler.ensure("db").unwrap(), EnsureOutcome::AlreadyActive);
    assert_eq!(cluster.count(|c| matches!(c, Call::NamespaceCreate(_))), 0);
}

#[test]
fn ensure_creates_once_then_is_a_noop() {
    let cluster = FakeCluster::new();
    let clock = ManualClock::new();
    let reconciler = NamespaceReconciler::new(&cluster, &clock, DeployLog::disabled());

    assert_eq!(reconciler.ensure("db").unwrap(), EnsureOutcome::Created);
    assert_eq!(reconciler.ensure("db").unwrap(), EnsureOutcome::AlreadyActive);
    assert_eq!(cluster.count(|c| matches!(c, Call::NamespaceCreate(_))), 1);
}

#[test]
fn ensure_reports_create_failure() {
    let cluster = FakeCluster::new().failing_create();
    let clock = ManualClock::new();
    let reconciler = NamespaceReconciler::new(&cluster, &clock, DeployLog::disabled());

    let err = reconciler.ensure("db").unwrap_err();
    assert!(matches!(err, DeployError::NamespaceCreateFailed { ref namespace, .. } if namespace == "db"));
    assert_eq!(err.kind(), FailureKind::Namespace);
}

#[test]
fn ensure_waits_out_a_terminating_namespace() {
    let cluster = FakeCluster::new().terminating_for("db", 2);
    let clock = ManualClock::new();
    let reconciler =
        NamespaceReconciler::new(&cluster, &clock, DeployLog::disabled()).with_policy(policy(10));

    assert_eq!(reconciler.ensure("db").unwrap(), EnsureOutcome::Created);
    assert_eq!(cluster.namespace_phase("db"), Some(NamespacePhase::Active));
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(2)]);
}

#[test]
fn delete_polls_until_absent() {
    let cluster = FakeCluster::new()
        .with_namespace("db", NamespacePhase::Active)
        .with_delete_lag(3);
    let clock = ManualClock::new();
    let reconciler =
        NamespaceReconciler::new(&cluster, &clock, DeployLog::disabled()).with_policy(policy(10));

    reconciler.delete("db").unwrap();

    assert_eq!(cluster.namespace_phase("db"), None);
    assert_eq!(clock.sleeps().len(), 3);
    assert_eq!(clock.now(), Duration::from_secs(6));
}

#[test]
fn delete_of_absent_namespace_is_a_noop() {
    let cluster = FakeCluster::new();
    let clock = ManualClock::new();
    let reconciler = NamespaceReconciler::new(&cluster, &clock, DeployLog::disabled());

    reconciler.delete("db").unwrap();
    assert_eq!(cluster.mutations(), 0);
}

#[test]
fn delete_gives_up_after_bounded_attempts() {
    let cluster = FakeCluster::new()
        .with_namespace("db", NamespacePhase::Active)
        .with_delete_lag(100);
    let clock = ManualClock::new();
    let reconciler =
        NamespaceReconciler::new(&cluster, &clock, DeployLog::disabled()).with_policy(policy(4));

    let err = reconciler.delete("db").unwrap_err();

    assert!(matches!(
        err,
        DeployError::NamespaceDeleteTimeout { attempts: 4, .. }
    ));
    assert_eq!(err.kind(), FailureKind::Namespace);
    // One lookup before deleting, then one per attempt.
    assert_eq!(cluster.count(|c| matches!(c, Call::NamespaceGet(_))), 5);
    assert_eq!(clock.sleeps().len(), 3);
}

#[test]
fn delete_request_failure_is_fatal() {
    let cluster = FakeCluster::new()
        .with_namespace("db", NamespacePhase::Active)
        .failing_delete();
    let clock = ManualClock::new();
    let reconciler = NamespaceReconciler::new(&cluster, &clock, DeployLog::disabled());

    assert!(matches!(
        reconciler.delete("db"),
        Err(DeployError::NamespaceDeleteFailed { .. })
    ));
}
