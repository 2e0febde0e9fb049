#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Registry behavior against the in-memory keys API.

use std::sync::Arc;
use std::time::Duration;

use discovery_etcd::{EtcdKeysApi, EtcdRegistry, InMemoryEtcd, ServiceRegistry};
use discovery_sdk::Instance;

fn setup(namespace: &str) -> (Arc<InMemoryEtcd>, EtcdRegistry) {
    let store = Arc::new(InMemoryEtcd::new());
    let registry = EtcdRegistry::new(store.clone(), namespace).unwrap();
    (store, registry)
}

fn instance(name: &str, id: &str, region: &str, env: &str) -> Instance {
    Instance::new(name, id, region, env).with_endpoint(format!("app-{id}.{name}.io"), 123)
}

fn ids(instances: &[Instance]) -> Vec<(&str, &str, &str)> {
    instances
        .iter()
        .map(|i| (i.region.as_str(), i.name.as_str(), i.id.as_str()))
        .collect()
}

// =============================================================================
// Register / Lookup round trip
// =============================================================================

#[tokio::test]
async fn test_registered_instance_is_found() {
    let (_, registry) = setup("cfkit");
    let foo = instance("foo", "1", "us-west", "prod");

    registry.register(&foo, 100).await.unwrap();

    let found = registry.lookup("foo", "prod", "us-west").await.unwrap();
    assert_eq!(found, vec![foo]);
}

#[tokio::test]
async fn test_two_instances_same_coordinates_in_store_order() {
    let (_, registry) = setup("cfkit");
    let first = instance("foo", "1", "us-west", "prod");
    let second = instance("foo", "2", "us-west", "prod");

    registry.register(&first, 100).await.unwrap();
    registry.register(&second, 100).await.unwrap();

    let found = registry.lookup("foo", "prod", "us-west").await.unwrap();
    assert_eq!(found, vec![first, second]);
}

#[tokio::test]
async fn test_reregistering_overwrites_instead_of_duplicating() {
    let (store, registry) = setup("cfkit");
    let original = instance("foo", "1", "us-west", "prod");
    let moved = original.clone().with_endpoint("app-1b.foo.io", 456);

    registry.register(&original, 100).await.unwrap();
    registry.register(&moved, 100).await.unwrap();

    let found = registry.lookup("foo", "prod", "us-west").await.unwrap();
    assert_eq!(found, vec![moved]);
    assert_eq!(store.len(), 1);
}

// =============================================================================
// Absence
// =============================================================================

#[tokio::test]
async fn test_empty_namespace_returns_empty_list() {
    let (_, registry) = setup("cfkit");

    assert!(registry.lookup("", "", "").await.unwrap().is_empty());
    assert!(registry.lookup("foo", "prod", "us-west").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_other_region_is_not_returned() {
    let (_, registry) = setup("cfkit");
    registry
        .register(&instance("foo", "1", "us-east", "prod"), 100)
        .await
        .unwrap();

    let found = registry.lookup("foo", "prod", "us-west").await.unwrap();
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_namespaces_are_isolated() {
    let store = Arc::new(InMemoryEtcd::new());
    let a = EtcdRegistry::new(store.clone(), "tenant-a").unwrap();
    let b = EtcdRegistry::new(store, "tenant-b").unwrap();

    a.register(&instance("foo", "1", "us-west", "prod"), 100)
        .await
        .unwrap();

    assert_eq!(a.lookup("", "", "").await.unwrap().len(), 1);
    assert!(b.lookup("", "", "").await.unwrap().is_empty());
}

// =============================================================================
// Broadening and gap queries
// =============================================================================

async fn populated() -> EtcdRegistry {
    let (_, registry) = setup("cfkit");
    for i in [
        instance("foo", "1", "us-west", "production"),
        instance("foo", "2", "us-west", "production"),
        instance("bar", "1", "us-west", "production"),
        instance("foo", "1", "us-east", "production"),
        instance("foo", "3", "us-west", "staging"),
    ] {
        registry.register(&i, 100).await.unwrap();
    }
    registry
}

#[tokio::test]
async fn test_region_filter() {
    let registry = populated().await;

    let found = registry.lookup("foo", "production", "us-west").await.unwrap();
    assert_eq!(ids(&found), [("us-west", "foo", "1"), ("us-west", "foo", "2")]);
}

#[tokio::test]
async fn test_all_empty_returns_whole_namespace() {
    let registry = populated().await;

    let found = registry.lookup("", "", "").await.unwrap();
    assert_eq!(found.len(), 5);
}

#[tokio::test]
async fn test_trailing_omission() {
    let registry = populated().await;

    let found = registry.lookup("", "", "us-west").await.unwrap();
    assert_eq!(found.len(), 4);
    assert!(found.iter().all(|i| i.region == "us-west"));

    let found = registry.lookup("", "production", "us-west").await.unwrap();
    assert_eq!(
        ids(&found),
        [
            ("us-west", "bar", "1"),
            ("us-west", "foo", "1"),
            ("us-west", "foo", "2")
        ]
    );
}

#[tokio::test]
async fn test_gap_in_env_is_filtered_by_pattern() {
    let registry = populated().await;

    // env omitted: the read covers the whole region, the pattern keeps only "foo"
    let found = registry.lookup("foo", "", "us-west").await.unwrap();
    assert_eq!(
        ids(&found),
        [
            ("us-west", "foo", "1"),
            ("us-west", "foo", "2"),
            ("us-west", "foo", "3")
        ]
    );
}

#[tokio::test]
async fn test_gap_in_region_is_filtered_by_pattern() {
    let registry = populated().await;

    // region omitted: the read covers the namespace, env and name still filter
    let found = registry.lookup("foo", "production", "").await.unwrap();
    assert_eq!(
        ids(&found),
        [
            ("us-east", "foo", "1"),
            ("us-west", "foo", "1"),
            ("us-west", "foo", "2")
        ]
    );
}

// =============================================================================
// Failure semantics
// =============================================================================

#[tokio::test]
async fn test_malformed_value_fails_whole_lookup() {
    let (store, registry) = setup("cfkit");
    registry
        .register(&instance("foo", "1", "us-west", "prod"), 100)
        .await
        .unwrap();
    store
        .set("cfkit/us-west/prod/foo/2", "{not an instance", 100)
        .await
        .unwrap();

    let err = registry.lookup("foo", "prod", "us-west").await.unwrap_err();
    assert!(err.is_decode(), "unexpected error: {err}");

    // the malformed entry is outside this query, so it is pruned before decoding
    registry
        .register(&instance("foo", "1", "us-east", "prod"), 100)
        .await
        .unwrap();
    let found = registry.lookup("foo", "prod", "us-east").await.unwrap();
    assert_eq!(found.len(), 1);
}

#[tokio::test]
async fn test_store_conflict_is_propagated_from_register() {
    let (store, registry) = setup("cfkit");
    // a leaf where the region directory should be
    store.set("cfkit/us-west", "oops", 0).await.unwrap();

    let err = registry
        .register(&instance("foo", "1", "us-west", "prod"), 100)
        .await
        .unwrap_err();
    let store_err = err
        .store_error::<discovery_etcd::StoreError>()
        .expect("store error");
    assert!(!store_err.is_key_not_found());
}

// =============================================================================
// Leases
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_instance_disappears_after_lease() {
    let (_, registry) = setup("cfkit");
    let foo = instance("foo", "1", "us-west", "prod");

    registry.register(&foo, 10).await.unwrap();
    tokio::time::advance(Duration::from_secs(9)).await;
    assert_eq!(registry.lookup("foo", "prod", "us-west").await.unwrap().len(), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(registry.lookup("foo", "prod", "us-west").await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reregistration_renews_lease() {
    let (_, registry) = setup("cfkit");
    let foo = instance("foo", "1", "us-west", "prod");
    let bar = instance("bar", "1", "us-west", "prod");

    registry.register(&foo, 10).await.unwrap();
    registry.register(&bar, 10).await.unwrap();

    for _ in 0..3 {
        tokio::time::advance(Duration::from_secs(8)).await;
        registry.register(&foo, 10).await.unwrap();
    }

    let found = registry.lookup("", "prod", "us-west").await.unwrap();
    assert_eq!(found, vec![foo]);
}

#[tokio::test]
async fn test_registry_usable_as_trait_object() {
    let (_, registry) = setup("cfkit");
    let registry: Arc<dyn ServiceRegistry> = Arc::new(registry);
    let foo = instance("foo", "1", "us-west", "prod");

    registry.register(&foo, 0).await.unwrap();
    assert_eq!(registry.lookup("foo", "", "").await.unwrap(), vec![foo]);
}
