#![no_main]

use discovery_sdk::Instance;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Anything that decodes must survive an encode/decode cycle unchanged
        if let Ok(instance) = Instance::decode(s) {
            let encoded = instance.encode().expect("instance encodes");
            assert_eq!(Instance::decode(&encoded).ok(), Some(instance));
        }
    }
});
