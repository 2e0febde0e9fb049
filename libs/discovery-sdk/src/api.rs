use async_trait::async_trait;

use crate::error::DiscoveryError;
use crate::instance::Instance;

/// Registry contract for publishing and discovering service instances.
///
/// Registrations are leased: an entry disappears once `lease_secs` elapse unless the
/// owner registers it again. Renewal is the caller's responsibility.
#[async_trait]
pub trait ServiceRegistry: Send + Sync {
    /// Find instances by `(name, env, region)`.
    ///
    /// Empty coordinates broaden the query. An unknown namespace or coordinate yields
    /// an empty list, not an error.
    async fn lookup(
        &self,
        name: &str,
        env: &str,
        region: &str,
    ) -> Result<Vec<Instance>, DiscoveryError>;

    /// Create or overwrite the registration of `instance` with a lease of `lease_secs`.
    /// A lease of `0` never expires.
    async fn register(&self, instance: &Instance, lease_secs: u64) -> Result<(), DiscoveryError>;
}
