// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::provider::{FakeProvider, FieldChange, ProviderCall, ProviderOp};
use converge_core::{NetworkReason, ResourceKey, ResourceVersion, RetryPolicy};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
struct BucketSpec {
    region: String,
    versioning: bool,
}

impl ProviderSpec for BucketSpec {
    fn immutable_changes(&self, desired: &Self) -> Vec<FieldChange> {
        if self.region != desired.region {
            vec![FieldChange::new("region", &self.region, &desired.region)]
        } else {
            vec![]
        }
    }
}

fn spec(region: &str, versioning: bool) -> BucketSpec {
    BucketSpec {
        region: region.to_string(),
        versioning,
    }
}

fn resource(name: &str, spec: BucketSpec) -> ManagedResource<BucketSpec> {
    ManagedResource::new(
        ResourceKey::new("bucket", "default", name),
        ResourceVersion::new(1),
        spec,
    )
}

fn setup() -> (FakeProvider<BucketSpec>, ConvergingAdapter<FakeProvider<BucketSpec>>) {
    let provider = FakeProvider::new("bucket");
    let adapter = ConvergingAdapter::new(
        provider.clone(),
        RetryExecutor::new(RetryPolicy::new(
            Duration::from_secs(30),
            Duration::from_secs(5),
        )),
    );
    (provider, adapter)
}

// =============================================================================
// create
// =============================================================================

#[tokio::test]
async fn create_new_resource() {
    let (provider, adapter) = setup();

    let outcome = adapter
        .create(&resource("assets", spec("eu-west-1", false)))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Created);
    assert_eq!(provider.get("assets"), Some(spec("eu-west-1", false)));
    assert_eq!(provider.count(ProviderOp::Update), 0);
}

#[tokio::test]
async fn create_of_owned_resource_falls_back_to_one_update() {
    let (provider, adapter) = setup();
    provider.insert("assets", spec("eu-west-1", false));

    let desired = spec("eu-west-1", true);
    let outcome = adapter
        .create(&resource("assets", desired.clone()))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Updated);
    assert_eq!(provider.count(ProviderOp::Create), 1);
    let updates: Vec<_> = provider
        .calls()
        .into_iter()
        .filter(|c| c.op() == ProviderOp::Update)
        .collect();
    assert_eq!(
        updates,
        vec![ProviderCall::Update {
            name: "assets".to_string(),
            spec: desired.clone(),
        }]
    );
    assert_eq!(provider.get("assets"), Some(desired));
}

#[tokio::test]
async fn create_of_owned_matching_resource_is_unchanged() {
    let (provider, adapter) = setup();
    provider.insert("assets", spec("eu-west-1", true));

    let outcome = adapter
        .create(&resource("assets", spec("eu-west-1", true)))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Unchanged);
    assert_eq!(provider.count(ProviderOp::Update), 0);
}

#[tokio::test]
async fn create_of_foreign_resource_fails() {
    let (provider, adapter) = setup();
    provider.insert_foreign("assets", spec("eu-west-1", false));

    let err = adapter
        .create(&resource("assets", spec("eu-west-1", true)))
        .await
        .unwrap_err();

    assert_eq!(err, AdapterError::OwnedElsewhere("assets".to_string()));
    assert_eq!(provider.count(ProviderOp::Describe), 0);
    assert_eq!(provider.count(ProviderOp::Update), 0);
}

#[tokio::test]
async fn create_reporting_exists_then_missing_is_inconsistent() {
    let (provider, adapter) = setup();
    provider.fail_next(
        ProviderOp::Create,
        ProviderError::AlreadyExists {
            name: "assets".to_string(),
            owned: true,
        },
    );

    let err = adapter
        .create(&resource("assets", spec("eu-west-1", false)))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AdapterError::Inconsistent {
            action: Action::Create,
            ..
        }
    ));
    // No second create: the fallback is one level deep
    assert_eq!(provider.count(ProviderOp::Create), 1);
}

#[tokio::test(start_paused = true)]
async fn create_retries_transient_network_errors() {
    let (provider, adapter) = setup();
    provider.fail_next(
        ProviderOp::Create,
        ProviderError::network(NetworkReason::HostUnreachable),
    );

    let outcome = adapter
        .create(&resource("assets", spec("eu-west-1", false)))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Created);
    assert_eq!(provider.count(ProviderOp::Create), 2);
}

#[tokio::test(start_paused = true)]
async fn create_retries_bucket_name_conflicts() {
    let (provider, adapter) = setup();
    provider.fail_next(
        ProviderOp::Create,
        ProviderError::OperationAborted("recently deleted".to_string()),
    );
    let start = tokio::time::Instant::now();

    let outcome = adapter
        .create(&resource("assets", spec("eu-west-1", false)))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Created);
    assert_eq!(start.elapsed(), Duration::from_secs(5));
}

// =============================================================================
// update
// =============================================================================

#[tokio::test]
async fn update_of_missing_resource_falls_back_to_one_create() {
    let (provider, adapter) = setup();

    let desired = spec("eu-west-1", true);
    let outcome = adapter
        .update(&resource("assets", desired.clone()))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Created);
    let creates: Vec<_> = provider
        .calls()
        .into_iter()
        .filter(|c| c.op() == ProviderOp::Create)
        .collect();
    assert_eq!(
        creates,
        vec![ProviderCall::Create {
            name: "assets".to_string(),
            spec: desired,
        }]
    );
    assert_eq!(provider.count(ProviderOp::Update), 0);
}

#[tokio::test]
async fn update_changes_mutable_fields() {
    let (provider, adapter) = setup();
    provider.insert("assets", spec("eu-west-1", false));

    let outcome = adapter
        .update(&resource("assets", spec("eu-west-1", true)))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Updated);
    assert_eq!(provider.get("assets"), Some(spec("eu-west-1", true)));
}

#[tokio::test]
async fn update_of_converged_resource_is_noop() {
    let (provider, adapter) = setup();
    provider.insert("assets", spec("eu-west-1", true));

    let outcome = adapter
        .update(&resource("assets", spec("eu-west-1", true)))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Unchanged);
    assert_eq!(provider.count(ProviderOp::Update), 0);
    assert_eq!(provider.count(ProviderOp::Create), 0);
}

#[tokio::test]
async fn update_rejects_immutable_field_change() {
    let (provider, adapter) = setup();
    provider.insert("assets", spec("eu-west-1", false));

    let err = adapter
        .update(&resource("assets", spec("us-east-1", false)))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        AdapterError::ImmutableField {
            name: "assets".to_string(),
            field: "region".to_string(),
            current: "eu-west-1".to_string(),
            desired: "us-east-1".to_string(),
        }
    );
    assert_eq!(provider.count(ProviderOp::Update), 0);
    assert_eq!(provider.get("assets"), Some(spec("eu-west-1", false)));
}

#[tokio::test]
async fn update_reporting_missing_then_exists_is_inconsistent() {
    let (provider, adapter) = setup();
    provider.insert("assets", spec("eu-west-1", false));
    provider.fail_next(
        ProviderOp::Update,
        ProviderError::NotFound("assets".to_string()),
    );

    let err = adapter
        .update(&resource("assets", spec("eu-west-1", true)))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AdapterError::Inconsistent {
            action: Action::Update,
            ..
        }
    ));
    assert_eq!(provider.count(ProviderOp::Update), 1);
    assert_eq!(provider.count(ProviderOp::Create), 1);
}

#[tokio::test]
async fn update_propagates_rejections() {
    let (provider, adapter) = setup();
    provider.insert("assets", spec("eu-west-1", false));
    provider.fail_next(
        ProviderOp::Update,
        ProviderError::Rejected {
            code: "MalformedPolicy".to_string(),
            message: "bad json".to_string(),
        },
    );

    let err = adapter
        .update(&resource("assets", spec("eu-west-1", true)))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AdapterError::Provider(ProviderError::Rejected { .. })
    ));
    assert_eq!(provider.count(ProviderOp::Create), 0);
}

// =============================================================================
// delete
// =============================================================================

#[tokio::test]
async fn delete_existing_resource() {
    let (provider, adapter) = setup();
    provider.insert("assets", spec("eu-west-1", false));

    let outcome = adapter
        .delete(&resource("assets", spec("eu-west-1", false)))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Deleted);
    assert_eq!(provider.get("assets"), None);
}

#[tokio::test]
async fn delete_of_missing_resource_is_absent() {
    let (_provider, adapter) = setup();

    let outcome = adapter
        .delete(&resource("assets", spec("eu-west-1", false)))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Absent);
}

#[tokio::test]
async fn delete_failure_has_no_fallback() {
    let (provider, adapter) = setup();
    provider.insert("assets", spec("eu-west-1", false));
    provider.fail_next(
        ProviderOp::Delete,
        ProviderError::Rejected {
            code: "BucketNotEmpty".to_string(),
            message: "objects remain".to_string(),
        },
    );

    let result = adapter
        .delete(&resource("assets", spec("eu-west-1", false)))
        .await;

    assert!(result.is_err());
    assert_eq!(provider.calls().len(), 1);
}

#[tokio::test]
async fn apply_dispatches_by_action() {
    let (provider, adapter) = setup();
    let r = resource("assets", spec("eu-west-1", false));

    assert_eq!(
        adapter.apply(Action::Create, &r).await.unwrap(),
        Outcome::Created
    );
    assert_eq!(
        adapter.apply(Action::Update, &r).await.unwrap(),
        Outcome::Unchanged
    );
    assert_eq!(
        adapter.apply(Action::Delete, &r).await.unwrap(),
        Outcome::Deleted
    );
    assert_eq!(provider.get("assets"), None);
}
