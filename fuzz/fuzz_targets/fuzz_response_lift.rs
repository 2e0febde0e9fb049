#![no_main]

use discovery_etcd::{PathCodec, Response, lift::lift};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(resp) = serde_json::from_slice::<Response>(data) else {
        return;
    };
    let codec = PathCodec::new("ns").expect("valid namespace");

    // Arbitrary trees must either lift or fail with an error, never panic
    let _ = lift(&resp.node, &codec.wildcard_pattern("", "", ""));
    let _ = lift(&resp.node, &codec.wildcard_pattern("name", "env", "region"));
});
