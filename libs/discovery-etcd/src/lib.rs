//! etcd-backed service registry.
//!
//! Instances are stored as JSON under `namespace/region/env/name/id` with a lease.
//! Lookups read the closest ancestor key recursively and flatten the returned tree
//! into instances, pruning branches that do not match the query.
//!
//! ## Layout
//!
//! - [`path`] - key construction and the wildcard pattern used for pruning
//! - [`lift`] - tree walk from a store response to a list of instances
//! - [`store`] - the keys API contract plus HTTP and in-memory implementations
//! - [`EtcdRegistry`] - the [`ServiceRegistry`] implementation tying them together
//!
//! ```ignore
//! let store = Arc::new(InMemoryEtcd::new());
//! let registry = EtcdRegistry::new(store, "cfkit")?;
//! registry.register(&instance, 30).await?;
//! let found = registry.lookup("foo", "production", "us-west").await?;
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub use discovery_sdk::{DiscoveryError, Instance, ServiceRegistry};

pub mod config;
pub mod lift;
pub mod path;
pub mod registry;
pub mod store;

pub use config::EtcdRegistryConfig;
pub use path::{PathCodec, Segment, WildcardPattern};
pub use registry::EtcdRegistry;
pub use store::{
    EtcdHttpClient, EtcdHttpClientBuilder, EtcdKeysApi, InMemoryEtcd, Node, Response, StoreError,
};
