//! Backing store contract and its implementations.

mod error;
mod http_client;
mod memory;
mod types;

use async_trait::async_trait;

pub use error::{StoreError, codes};
pub use http_client::{EtcdHttpClient, EtcdHttpClientBuilder};
pub use memory::InMemoryEtcd;
pub use types::{Node, Response};

/// Subset of the etcd v2 keys API used by the registry.
#[async_trait]
pub trait EtcdKeysApi: Send + Sync {
    /// Create or overwrite `key` with `value`. A `ttl` of `0` sets no expiry.
    async fn set(&self, key: &str, value: &str, ttl: u64) -> Result<Response, StoreError>;

    /// Read `key`, returning the subtree rooted there when `recursive` is set.
    async fn get(&self, key: &str, sort: bool, recursive: bool) -> Result<Response, StoreError>;
}
