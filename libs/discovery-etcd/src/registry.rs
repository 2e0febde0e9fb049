//! etcd-backed implementation of [`ServiceRegistry`].

use std::sync::Arc;

use async_trait::async_trait;
use discovery_sdk::{DiscoveryError, Instance, ServiceRegistry};
use tracing::{debug, info};

use crate::config::EtcdRegistryConfig;
use crate::lift::lift;
use crate::path::PathCodec;
use crate::store::{EtcdHttpClient, EtcdKeysApi};

/// Service registry storing instances under `namespace/region/env/name/id`.
///
/// The registry holds no state besides its namespace and the store client, so it can
/// be shared freely behind an `Arc`. Leases are renewed by registering again.
#[derive(Clone)]
pub struct EtcdRegistry {
    client: Arc<dyn EtcdKeysApi>,
    paths: PathCodec,
}

impl std::fmt::Debug for EtcdRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EtcdRegistry")
            .field("namespace", &self.paths.namespace())
            .finish_non_exhaustive()
    }
}

impl EtcdRegistry {
    /// Creates a registry over an existing store client.
    ///
    /// # Errors
    /// Returns [`DiscoveryError::InvalidSegment`] if `namespace` is empty or contains
    /// `/` or `*`.
    pub fn new(
        client: Arc<dyn EtcdKeysApi>,
        namespace: impl Into<String>,
    ) -> Result<Self, DiscoveryError> {
        let paths = PathCodec::new(namespace)?;
        info!(namespace = paths.namespace(), "service registry created");
        Ok(Self { client, paths })
    }

    /// Builds an HTTP store client from `config` and wraps it in a registry.
    ///
    /// # Errors
    /// Fails if the endpoints or the namespace are invalid.
    pub fn from_config(config: &EtcdRegistryConfig) -> anyhow::Result<Self> {
        let mut builder = EtcdHttpClient::builder().endpoints(config.endpoints.iter().cloned());
        if let Some(timeout) = config.request_timeout {
            builder = builder.request_timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build etcd client: {e}"))?;

        Ok(Self::new(Arc::new(client), config.namespace.clone())?)
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        self.paths.namespace()
    }

    #[must_use]
    pub fn paths(&self) -> &PathCodec {
        &self.paths
    }
}

#[async_trait]
impl ServiceRegistry for EtcdRegistry {
    async fn lookup(
        &self,
        name: &str,
        env: &str,
        region: &str,
    ) -> Result<Vec<Instance>, DiscoveryError> {
        PathCodec::validate_query(name, env, region)?;

        let key = self.paths.lookup_key(name, env, region);
        let pattern = self.paths.wildcard_pattern(name, env, region);

        let resp = match self.client.get(&key, false, true).await {
            Ok(resp) => resp,
            Err(e) if e.is_key_not_found() => {
                debug!(%key, "lookup key not found");
                return Ok(Vec::new());
            }
            Err(e) => return Err(DiscoveryError::store(e)),
        };

        let instances = lift(&resp.node, &pattern)?;
        debug!(%key, %pattern, found = instances.len(), "lookup completed");
        Ok(instances)
    }

    async fn register(&self, instance: &Instance, lease_secs: u64) -> Result<(), DiscoveryError> {
        PathCodec::validate_instance(instance)?;

        let key = self.paths.store_key(instance);
        let value = instance.encode()?;

        self.client
            .set(&key, &value, lease_secs)
            .await
            .map_err(DiscoveryError::store)?;

        debug!(%key, lease_secs, "instance registered");
        Ok(())
    }
}
