//! Fuzzer for attestation extension decoding and rewriting.

#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // `data` allegedly holds an attestation extension taken from a hardware-issued certificate.
    if let Ok(desc) = ksf_engine::attest::KeyDescription::decode(data) {
        let _ = desc.root_of_trust();
        let _ = desc.rewrite(&[0u8; 32], || vec![0u8; 32]);
    }
});
