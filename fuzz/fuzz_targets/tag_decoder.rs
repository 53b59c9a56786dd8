//! Fuzz target for IRCv3 tag decoding

#![no_main]

use libfuzzer_sys::fuzz_target;
use slirc_ingest::message::tags::decode;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        for key in decode(Some(input)).keys() {
            assert!(!key.contains('-'));
        }
    }
});
