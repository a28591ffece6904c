//! Loading of PEM-encoded keys and certificates.

use crate::{openssl_err, ossl, KeyPair};
use alloc::string::String;
use alloc::vec::Vec;
use ksf_common::Error;
use zeroize::Zeroizing;

/// Strip surrounding whitespace from every line of a PEM block.
pub fn trim_lines(text: &str) -> Zeroizing<String> {
    let mut result = Zeroizing::new(String::with_capacity(text.len()));
    for (idx, line) in text.trim().lines().enumerate() {
        if idx > 0 {
            result.push('\n');
        }
        result.push_str(line.trim());
    }
    result.push('\n');
    result
}

/// Parse a PEM private key (PKCS#1, SEC1 or PKCS#8).
pub fn private_key_from_pem(pem: &str) -> Result<KeyPair, Error> {
    let pem = trim_lines(pem);
    KeyPair::new(ossl!(openssl::pkey::PKey::private_key_from_pem(pem.as_bytes()))?)
}

/// Parse a PEM certificate, returning its DER encoding.
pub fn certificate_from_pem(pem: &str) -> Result<Vec<u8>, Error> {
    let pem = trim_lines(pem);
    let cert = ossl!(openssl::x509::X509::from_pem(pem.as_bytes()))?;
    ossl!(cert.to_der())
}
