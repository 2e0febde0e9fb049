//! Key layout of the registry namespace.
//!
//! Instances live at `namespace/region/env/name/id`. A lookup reads one ancestor of
//! those keys and filters the returned subtree with a [`WildcardPattern`]:
//!
//! - [`PathCodec::lookup_key`] stops at the first empty coordinate (region, then env,
//!   then name), so a query with a gap reads a broader ancestor;
//! - [`PathCodec::wildcard_pattern`] turns every empty coordinate into a wildcard,
//!   wherever it sits.
//!
//! The two must stay in step: the lookup key only decides how much of the tree is
//! fetched, the pattern decides what survives. A query such as `("", "prod", "")`
//! fetches the whole namespace and relies on the pattern to keep `prod` only.

use std::fmt;

use discovery_sdk::{DiscoveryError, Instance};

pub const SEPARATOR: char = '/';
pub const WILDCARD: &str = "*";

/// One position of a [`WildcardPattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Any,
}

impl Segment {
    fn or_any(value: &str) -> Self {
        if value.is_empty() {
            Self::Any
        } else {
            Self::Literal(value.to_owned())
        }
    }

    #[must_use]
    pub fn admits(&self, segment: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Literal(literal) => literal == segment,
        }
    }
}

/// Positional pattern matched against absolute store keys.
///
/// The first position lines up with the empty segment in front of the leading `/`
/// and the last one with the instance id; both are always wildcards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardPattern {
    segments: Vec<Segment>,
}

impl WildcardPattern {
    #[must_use]
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when every segment of `key` is admitted by the pattern position at the
    /// same index. Keys deeper than the pattern never match.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        let mut positions = self.segments.iter();
        key.split(SEPARATOR)
            .all(|segment| positions.next().is_some_and(|p| p.admits(segment)))
    }
}

impl fmt::Display for WildcardPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{SEPARATOR}")?;
            }
            match segment {
                Segment::Any => f.write_str(WILDCARD)?,
                Segment::Literal(literal) => f.write_str(literal)?,
            }
        }
        Ok(())
    }
}

fn check_segment(field: &'static str, value: &str, required: bool) -> Result<(), DiscoveryError> {
    let reason = if value.is_empty() {
        required.then_some("must not be empty")
    } else if value.contains(SEPARATOR) {
        Some("must not contain '/'")
    } else if value.contains(WILDCARD) {
        Some("must not contain '*'")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(DiscoveryError::InvalidSegment {
            field,
            value: value.to_owned(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Builds store keys and lookup patterns for one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathCodec {
    namespace: String,
}

impl PathCodec {
    /// # Errors
    /// Returns [`DiscoveryError::InvalidSegment`] if `namespace` is empty or contains
    /// a reserved token.
    pub fn new(namespace: impl Into<String>) -> Result<Self, DiscoveryError> {
        let namespace = namespace.into();
        check_segment("namespace", &namespace, true)?;
        Ok(Self { namespace })
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// `namespace/region/env/name/id`
    #[must_use]
    pub fn store_key(&self, instance: &Instance) -> String {
        let mut key = self.namespace.clone();
        for part in [&instance.region, &instance.env, &instance.name, &instance.id] {
            key.push(SEPARATOR);
            key.push_str(part);
        }
        key
    }

    /// `namespace[/region[/env[/name]]]`, cut at the first empty coordinate.
    #[must_use]
    pub fn lookup_key(&self, name: &str, env: &str, region: &str) -> String {
        let mut key = self.namespace.clone();
        for part in [region, env, name] {
            if part.is_empty() {
                break;
            }
            key.push(SEPARATOR);
            key.push_str(part);
        }
        key
    }

    /// `[*, namespace, region|*, env|*, name|*, *]`
    #[must_use]
    pub fn wildcard_pattern(&self, name: &str, env: &str, region: &str) -> WildcardPattern {
        WildcardPattern::new(vec![
            Segment::Any,
            Segment::Literal(self.namespace.clone()),
            Segment::or_any(region),
            Segment::or_any(env),
            Segment::or_any(name),
            Segment::Any,
        ])
    }

    /// Rejects instances whose key segments are empty or contain reserved tokens.
    ///
    /// # Errors
    /// Returns [`DiscoveryError::InvalidSegment`] naming the first offending field.
    pub fn validate_instance(instance: &Instance) -> Result<(), DiscoveryError> {
        check_segment("region", &instance.region, true)?;
        check_segment("env", &instance.env, true)?;
        check_segment("name", &instance.name, true)?;
        check_segment("id", &instance.id, true)
    }

    /// Rejects query coordinates containing reserved tokens. Empty coordinates are allowed.
    ///
    /// # Errors
    /// Returns [`DiscoveryError::InvalidSegment`] naming the first offending field.
    pub fn validate_query(name: &str, env: &str, region: &str) -> Result<(), DiscoveryError> {
        check_segment("region", region, false)?;
        check_segment("env", env, false)?;
        check_segment("name", name, false)
    }
}
