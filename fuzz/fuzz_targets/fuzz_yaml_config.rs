#![no_main]

use discovery_etcd::EtcdRegistryConfig;
use figment::Figment;
use figment::providers::{Format, Yaml};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Parse YAML through the same provider the registry config uses
        let _ = Figment::from(Yaml::string(s)).extract::<EtcdRegistryConfig>();
    }
});
