use crate::{openssl_err, ossl};
use alloc::vec;
use alloc::vec::Vec;
use ksf_common::Error;

/// Generate `len` bytes from the OpenSSL CSPRNG.
pub fn random_bytes(len: usize) -> Result<Vec<u8>, Error> {
    let mut buf = vec![0u8; len];
    ossl!(openssl::rand::rand_bytes(&mut buf))?;
    Ok(buf)
}
