mod support;

use std::sync::Arc;

use kstack_core::log::{DeployLog, LogLevel, MemorySink};
use kstack_core::status::StatusReporter;
use kstack_core::types::WorkloadRow;

use support::{Call, FakeCluster};

#[test]
fn renders_resources_and_workloads() {
    let cluster = FakeCluster::new()
        .with_resources("database", &[("Pod", "mysql-0"), ("Service", "mysql")])
        .with_workloads(None, vec![WorkloadRow::new("mysql-0", 1, 1, "Running")]);

    let snapshot = StatusReporter::new(&cluster, DeployLog::disabled()).render("database");

    assert_eq!(snapshot.resources.len(), 2);
    assert_eq!(snapshot.ready_workloads(), 1);
    assert!(snapshot.warnings.is_empty());
    let text = snapshot.to_string();
    assert!(text.starts_with("Namespace: database\n"));
    assert!(text.contains("mysql-0  1/1    Running"));
    assert_eq!(cluster.mutations(), 0);
}

#[test]
fn listing_failure_becomes_a_warning() {
    let cluster = FakeCluster::new()
        .failing_resource_listing()
        .with_workloads(None, vec![WorkloadRow::new("mysql-0", 0, 1, "Pending")]);
    let sink = Arc::new(MemorySink::new());

    let snapshot = StatusReporter::new(&cluster, DeployLog::new(sink.clone())).render("database");

    assert_eq!(snapshot.warnings.len(), 1);
    assert!(snapshot.warnings[0].starts_with("could not list resources"));
    assert_eq!(snapshot.workloads.len(), 1);
    assert_eq!(sink.messages(LogLevel::Error).len(), 1);
    assert_eq!(
        cluster.calls(),
        vec![
            Call::ListResources("database".to_string()),
            Call::ListWorkloads(None),
        ]
    );
}
