//! Registry configuration.
//!
//! Values are layered with figment: built-in defaults, then an optional YAML file,
//! then `DISCOVERY_*` environment variables.
//!
//! Only the variables naming a config key are read, so unrelated `DISCOVERY_*` variables
//! are ignored. `DISCOVERY_NAMESPACE` and `DISCOVERY_REQUEST_TIMEOUT` are taken verbatim
//! as strings; `DISCOVERY_ENDPOINTS` uses figment's value syntax, e.g.
//! `[http://etcd-1:2379, http://etcd-2:2379]`.
//!
//! ```yaml
//! namespace: cfkit
//! endpoints:
//!   - http://etcd-1:2379
//!   - http://etcd-2:2379
//! request_timeout: 5s
//! ```

use std::path::Path;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "DISCOVERY_";

/// Keys read as raw strings. figment would otherwise parse `2024` as a number.
const ENV_STRING_KEYS: [&str; 2] = ["namespace", "request_timeout"];
const ENV_VALUE_KEYS: [&str; 1] = ["endpoints"];

/// Configuration of an etcd-backed registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EtcdRegistryConfig {
    /// Root segment of every key written or read by the registry.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// etcd cluster members, tried in order.
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,

    /// Per-request bound at the HTTP client, e.g. `"5s"` or `"500ms"`.
    #[serde(
        default,
        with = "humantime_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub request_timeout: Option<Duration>,
}

fn default_namespace() -> String {
    "discovery".to_owned()
}

fn default_endpoints() -> Vec<String> {
    vec!["http://127.0.0.1:2379".to_owned()]
}

impl Default for EtcdRegistryConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            endpoints: default_endpoints(),
            request_timeout: None,
        }
    }
}

impl EtcdRegistryConfig {
    /// Loads the configuration from defaults, `file` (if given) and the environment.
    ///
    /// # Errors
    /// Fails if `file` does not exist or any layer holds an invalid value.
    pub fn load(file: Option<&Path>) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = file {
            if !path.is_file() {
                anyhow::bail!("config file not found: {}", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).only(&ENV_VALUE_KEYS));
        let raw_env = Env::prefixed(ENV_PREFIX).only(&ENV_STRING_KEYS);
        for (key, value) in raw_env.iter() {
            figment = figment.merge(Serialized::default(key.as_str(), value));
        }

        let config: Self = figment
            .extract()
            .map_err(|e| anyhow::anyhow!("invalid discovery config: {e}"))?;

        tracing::debug!(
            namespace = %config.namespace,
            endpoints = ?config.endpoints,
            "discovery config loaded"
        );
        Ok(config)
    }
}

/// Serde adapter for `Option<Duration>` in humantime notation.
mod humantime_opt {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_str(&humantime::format_duration(*d).to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|raw| humantime::parse_duration(&raw).map_err(de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const VARS: [&str; 3] = [
        "DISCOVERY_NAMESPACE",
        "DISCOVERY_ENDPOINTS",
        "DISCOVERY_REQUEST_TIMEOUT",
    ];

    fn yaml_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_without_file_or_env() {
        temp_env::with_vars_unset(VARS, || {
            let config = EtcdRegistryConfig::load(None).unwrap();
            assert_eq!(config, EtcdRegistryConfig::default());
        });
    }

    #[test]
    fn yaml_file_then_env_overrides() {
        let file = yaml_file(
            r"
namespace: cfkit
endpoints:
  - http://etcd-1:2379
  - http://etcd-2:2379
request_timeout: 3s
",
        );

        temp_env::with_vars(
            [
                ("DISCOVERY_NAMESPACE", Some("staging")),
                ("DISCOVERY_ENDPOINTS", None),
                ("DISCOVERY_REQUEST_TIMEOUT", None),
            ],
            || {
                let config = EtcdRegistryConfig::load(Some(file.path())).unwrap();

                assert_eq!(config.namespace, "staging");
                assert_eq!(config.endpoints, ["http://etcd-1:2379", "http://etcd-2:2379"]);
                assert_eq!(config.request_timeout, Some(Duration::from_secs(3)));
            },
        );
    }

    #[test]
    fn env_sets_request_timeout() {
        temp_env::with_vars(
            [
                ("DISCOVERY_NAMESPACE", None),
                ("DISCOVERY_ENDPOINTS", None),
                ("DISCOVERY_REQUEST_TIMEOUT", Some("250ms")),
            ],
            || {
                let config = EtcdRegistryConfig::load(None).unwrap();
                assert_eq!(config.request_timeout, Some(Duration::from_millis(250)));
            },
        );
    }

    #[test]
    fn unrelated_env_vars_are_ignored() {
        temp_env::with_vars(
            [
                ("DISCOVERY_NAMESPACE", None),
                ("DISCOVERY_ENDPOINTS", None),
                ("DISCOVERY_REQUEST_TIMEOUT", None),
                ("DISCOVERY_LOG_LEVEL", Some("debug")),
                ("DISCOVERY_ENDPOINTS_BACKUP", Some("http://other:2379")),
            ],
            || {
                let config = EtcdRegistryConfig::load(None).unwrap();
                assert_eq!(config, EtcdRegistryConfig::default());
            },
        );
    }

    #[test]
    fn numeric_looking_env_values_stay_strings() {
        for namespace in ["2024", "007", "true"] {
            temp_env::with_vars(
                [
                    ("DISCOVERY_NAMESPACE", Some(namespace)),
                    ("DISCOVERY_ENDPOINTS", None),
                    ("DISCOVERY_REQUEST_TIMEOUT", None),
                ],
                || {
                    let config = EtcdRegistryConfig::load(None).unwrap();
                    assert_eq!(config.namespace, namespace);
                },
            );
        }
    }

    #[test]
    fn rejects_unknown_fields_and_bad_durations() {
        let unknown = yaml_file("namespace: a\nheartbeat: 5s\n");
        let duration = yaml_file("request_timeout: soon\n");
        let missing = duration.path().with_extension("missing");

        temp_env::with_vars_unset(VARS, || {
            assert!(EtcdRegistryConfig::load(Some(unknown.path())).is_err());
            assert!(EtcdRegistryConfig::load(Some(duration.path())).is_err());
            assert!(EtcdRegistryConfig::load(Some(&missing)).is_err());
        });
    }
}
