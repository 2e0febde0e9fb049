/// Errors returned by service registries.
///
/// Absence of a queried key is never an error: lookups return an empty list instead.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// Any failure reported by the backing store, passed through unmodified.
    #[error(transparent)]
    Store(Box<dyn std::error::Error + Send + Sync>),

    /// A stored value could not be decoded into an [`Instance`](crate::Instance).
    #[error("failed to decode instance: {0}")]
    Decode(#[source] serde_json::Error),

    /// An instance could not be encoded for storage.
    #[error("failed to encode instance: {0}")]
    Encode(#[source] serde_json::Error),

    /// A path segment is empty or contains a reserved token.
    #[error("invalid {field} '{value}': {reason}")]
    InvalidSegment {
        field: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl DiscoveryError {
    /// Wraps a backing store error without adding context.
    #[must_use]
    pub fn store<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Store(Box::new(err))
    }

    /// Returns the backing store error downcast to its concrete type, if any.
    #[must_use]
    pub fn store_error<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            Self::Store(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}
