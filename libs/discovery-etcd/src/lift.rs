//! Flattening of a store subtree into instances.

use discovery_sdk::{DiscoveryError, Instance};

use crate::path::WildcardPattern;
use crate::store::Node;

/// Collects the instances stored under `node` whose keys match `pattern`.
///
/// Every node re-checks its full key, so any subtree root can be passed in. Children
/// are visited in the order the store returned them. The first leaf that fails to
/// decode aborts the walk; no partial list is returned.
///
/// # Errors
/// Returns [`DiscoveryError::Decode`] for a malformed leaf value.
pub fn lift(node: &Node, pattern: &WildcardPattern) -> Result<Vec<Instance>, DiscoveryError> {
    let mut instances = Vec::new();
    lift_into(node, pattern, &mut instances)?;
    Ok(instances)
}

fn lift_into(
    node: &Node,
    pattern: &WildcardPattern,
    out: &mut Vec<Instance>,
) -> Result<(), DiscoveryError> {
    if !pattern.matches(&node.key) {
        return Ok(());
    }

    if node.dir {
        for child in &node.nodes {
            lift_into(child, pattern, out)?;
        }
        return Ok(());
    }

    let instance = Instance::decode(node.value.as_deref().unwrap_or_default())?;
    out.push(instance);
    Ok(())
}
