// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::ReconcilerConfig;
use converge_adapters::{FakeResourceAdapter, FakeWatchSource, SourceError};
use converge_core::{Action, ManagedResource, ResourceKey, ResourceList, ResourceVersion};
use std::time::Duration;

fn listing(kind: &str, names: &[&str]) -> ResourceList<u32> {
    let items = names
        .iter()
        .map(|name| {
            ManagedResource::new(
                ResourceKey::new(kind, "default", *name),
                ResourceVersion::new(1),
                0,
            )
        })
        .collect();
    ResourceList::new(ResourceVersion::new(1), items)
}

#[tokio::test(start_paused = true)]
async fn kinds_run_independently_and_drain_on_shutdown() {
    let queues = FakeWatchSource::new("queue");
    queues.push_list(listing("queue", &["jobs"]));
    let buckets = FakeWatchSource::new("bucket");
    buckets.push_list(listing("bucket", &["assets"]));
    let queue_adapter = FakeResourceAdapter::new();
    queue_adapter.set_delay("jobs", Duration::from_secs(30));
    let bucket_adapter = FakeResourceAdapter::new();

    let mut controller = Controller::new();
    controller
        .spawn(Reconciler::new(
            queues,
            queue_adapter.clone(),
            ReconcilerConfig::default(),
        ))
        .await
        .unwrap();
    controller
        .spawn(Reconciler::new(
            buckets,
            bucket_adapter.clone(),
            ReconcilerConfig::default(),
        ))
        .await
        .unwrap();

    // The slow queue does not hold up the bucket
    bucket_adapter.wait_for_settled(1).await;
    assert_eq!(queue_adapter.settled_count(), 0);
    assert_eq!(
        controller.kinds(),
        vec![ResourceKind::new("queue"), ResourceKind::new("bucket")]
    );

    controller.shutdown().await;

    assert_eq!(queue_adapter.actions_for("jobs"), vec![Action::Update]);
    assert_eq!(queue_adapter.settled_count(), 1);
}

#[tokio::test]
async fn failed_initial_list_is_reported_and_not_registered() {
    let queues = FakeWatchSource::new("queue");
    queues.push_list(listing("queue", &[]));
    let roles = FakeWatchSource::<u32>::new("role");
    roles.push_list_error(SourceError::Connection("connection refused".to_string()));

    let mut controller = Controller::new();
    controller
        .spawn(Reconciler::new(
            queues,
            FakeResourceAdapter::new(),
            ReconcilerConfig::default(),
        ))
        .await
        .unwrap();
    let err = controller
        .spawn(Reconciler::new(
            roles,
            FakeResourceAdapter::new(),
            ReconcilerConfig::default(),
        ))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("initial list of role failed"));
    assert_eq!(controller.kinds(), vec![ResourceKind::new("queue")]);
    controller.shutdown().await;
}
