//! Fuzzer for keybox configuration parsing.

#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = ksf_engine::config::parse_keybox_xml(text);
    }
});
