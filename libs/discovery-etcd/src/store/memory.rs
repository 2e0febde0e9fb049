//! Process-local keys API with lease expiry.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::time::Instant;

use super::error::{StoreError, codes};
use super::types::{Node, Response};
use super::EtcdKeysApi;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
    index: u64,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }

    fn to_node(&self, key: &str, now: Instant) -> Node {
        let ttl = self.expires_at.map(|at| {
            let remaining = at.saturating_duration_since(now).as_secs();
            i64::try_from(remaining).unwrap_or(i64::MAX)
        });
        Node {
            key: key.to_owned(),
            value: Some(self.value.clone()),
            ttl,
            modified_index: self.index,
            created_index: self.index,
            ..Node::default()
        }
    }
}

#[derive(Debug, Default)]
struct State {
    /// Leaves keyed by absolute path; directories are implied by their descendants.
    entries: BTreeMap<String, Entry>,
    index: u64,
}

/// In-memory implementation of [`EtcdKeysApi`].
///
/// Mirrors the etcd v2 tree semantics the registry relies on: directories are created
/// implicitly, leases expire entries, and reading a missing key fails with
/// [`codes::KEY_NOT_FOUND`]. Children are always returned in key order, so the `sort`
/// flag has no effect. Expiry follows `tokio::time`, which lets tests pause the clock.
#[derive(Debug, Default)]
pub struct InMemoryEtcd {
    state: RwLock<State>,
}

impl InMemoryEtcd {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live leaves.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let state = self.state.read();
        state.entries.values().filter(|e| e.is_live(now)).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Canonical absolute form: leading `/`, no empty or trailing segments.
fn normalize(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 1);
    for segment in key.split('/').filter(|s| !s.is_empty()) {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

fn dir_prefix(key: &str) -> String {
    if key == "/" {
        key.to_owned()
    } else {
        format!("{key}/")
    }
}

impl State {
    fn has_live_descendant(&self, prefix: &str, now: Instant) -> bool {
        self.entries
            .range(prefix.to_owned()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .any(|(_, e)| e.is_live(now))
    }

    /// Returns the first ancestor of `key` that is stored as a leaf.
    fn leaf_ancestor(&self, key: &str, now: Instant) -> Option<String> {
        key.match_indices('/')
            .skip(1)
            .map(|(pos, _)| &key[..pos])
            .find(|ancestor| self.entries.get(*ancestor).is_some_and(|e| e.is_live(now)))
            .map(str::to_owned)
    }

    fn dir_node(&self, key: &str, recursive: bool, now: Instant) -> Node {
        let prefix = dir_prefix(key);
        let mut children: Vec<Node> = Vec::new();

        let under = self
            .entries
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .filter(|(_, e)| e.is_live(now));

        for (entry_key, entry) in under {
            let rest = &entry_key[prefix.len()..];
            match rest.split_once('/') {
                None => children.push(entry.to_node(entry_key, now)),
                Some((child, _)) => {
                    let child_key = format!("{prefix}{child}");
                    if children.last().is_some_and(|n| n.key == child_key) {
                        continue;
                    }
                    let child_node = if recursive {
                        self.dir_node(&child_key, true, now)
                    } else {
                        Node::dir(child_key, Vec::new())
                    };
                    children.push(child_node);
                }
            }
        }

        let mut node = Node::dir(key, children);
        if key == "/" {
            node.key = String::new();
        }
        node
    }
}

#[async_trait]
impl EtcdKeysApi for InMemoryEtcd {
    async fn set(&self, key: &str, value: &str, ttl: u64) -> Result<Response, StoreError> {
        let key = normalize(key);
        let now = Instant::now();
        let mut state = self.state.write();
        state.entries.retain(|_, e| e.is_live(now));

        if key == "/" || state.has_live_descendant(&dir_prefix(&key), now) {
            return Err(StoreError::Etcd {
                error_code: codes::NOT_FILE,
                message: "Not a file".to_owned(),
                cause: key,
                index: state.index,
            });
        }
        if let Some(ancestor) = state.leaf_ancestor(&key, now) {
            return Err(StoreError::Etcd {
                error_code: codes::NOT_DIR,
                message: "Not a directory".to_owned(),
                cause: ancestor,
                index: state.index,
            });
        }

        state.index += 1;
        let entry = Entry {
            value: value.to_owned(),
            expires_at: (ttl > 0).then(|| now + Duration::from_secs(ttl)),
            index: state.index,
        };
        let node = entry.to_node(&key, now);
        let prev_node = state
            .entries
            .insert(key.clone(), entry)
            .map(|prev| prev.to_node(&key, now));

        Ok(Response {
            action: "set".to_owned(),
            node,
            prev_node,
        })
    }

    async fn get(&self, key: &str, _sort: bool, recursive: bool) -> Result<Response, StoreError> {
        let key = normalize(key);
        let now = Instant::now();
        let state = self.state.read();

        if let Some(entry) = state.entries.get(&key).filter(|e| e.is_live(now)) {
            return Ok(Response {
                action: "get".to_owned(),
                node: entry.to_node(&key, now),
                prev_node: None,
            });
        }

        if key != "/" && !state.has_live_descendant(&dir_prefix(&key), now) {
            return Err(StoreError::key_not_found(&key, state.index));
        }

        Ok(Response {
            action: "get".to_owned(),
            node: state.dir_node(&key, recursive, now),
            prev_node: None,
        })
    }
}
