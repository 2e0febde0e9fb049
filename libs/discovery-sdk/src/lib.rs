//! Service Discovery SDK
//!
//! This crate defines the public contract shared by every registry backend:
//!
//! - [`Instance`] - one running service endpoint and its canonical JSON encoding
//! - [`ServiceRegistry`] - the `register` / `lookup` trait
//! - [`DiscoveryError`] - error taxonomy surfaced to callers
//!
//! Backends (such as the etcd registry) depend on this crate; consumers only need
//! the trait object:
//!
//! ```ignore
//! let registry: Arc<dyn ServiceRegistry> = Arc::new(EtcdRegistry::new(client, "cfkit")?);
//! let instances = registry.lookup("foo", "production", "us-west").await?;
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod api;
pub mod error;
pub mod instance;

pub use api::ServiceRegistry;
pub use error::DiscoveryError;
pub use instance::Instance;
