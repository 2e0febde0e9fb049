//! Instance model and its canonical text encoding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DiscoveryError;

/// One running service endpoint.
///
/// The storage identity of an instance is `(region, env, name, id)` under a registry
/// namespace. The encoded form is a flat JSON object with the fields in declaration
/// order, which is both the stored value and the `Display` representation.
///
/// `port` is a TCP port, so a stored record whose port is negative or above 65535 does not
/// decode. Writers sharing the namespace must stay within that range, otherwise every lookup
/// covering their entry fails with [`DiscoveryError::Decode`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instance {
    pub name: String,
    pub id: String,
    pub region: String,
    pub env: String,
    pub host: String,
    pub port: u16,
}

impl Instance {
    /// Creates an instance with empty host and port `0`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        id: impl Into<String>,
        region: impl Into<String>,
        env: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            region: region.into(),
            env: env.into(),
            host: String::new(),
            port: 0,
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    /// Encodes the instance as compact JSON.
    ///
    /// # Errors
    /// Returns [`DiscoveryError::Encode`] if serialization fails.
    pub fn encode(&self) -> Result<String, DiscoveryError> {
        serde_json::to_string(self).map_err(DiscoveryError::Encode)
    }

    /// Decodes an instance from its JSON encoding. All six fields are required.
    ///
    /// # Errors
    /// Returns [`DiscoveryError::Decode`] if `raw` is not a well-formed instance record.
    pub fn decode(raw: &str) -> Result<Self, DiscoveryError> {
        serde_json::from_str(raw).map_err(DiscoveryError::Decode)
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.encode().map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl FromStr for Instance {
    type Err = DiscoveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
