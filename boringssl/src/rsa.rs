//! RSA key generation.

use crate::{openssl_err, ossl, KeyPair};
use ksf_common::{ks_err, Error};
use ksf_wire::{KeySizeInBits, RsaExponent};

/// Smallest allowed public exponent.
const MIN_RSA_EXPONENT: RsaExponent = RsaExponent(3);

/// Supported range of modulus sizes.
const MIN_RSA_KEY_SIZE: KeySizeInBits = KeySizeInBits(512);
const MAX_RSA_KEY_SIZE: KeySizeInBits = KeySizeInBits(8192);

/// Generate an RSA key pair.
pub fn generate_key(key_size: KeySizeInBits, pub_exponent: RsaExponent) -> Result<KeyPair, Error> {
    // Reject some obviously-wrong parameter values.
    if pub_exponent < MIN_RSA_EXPONENT {
        return Err(ks_err!(
            InvalidArgument,
            "Invalid public exponent, {:?} < {:?}",
            pub_exponent,
            MIN_RSA_EXPONENT
        ));
    }
    if pub_exponent.0 % 2 != 1 {
        return Err(ks_err!(
            InvalidArgument,
            "Invalid public exponent {:?} (even number)",
            pub_exponent
        ));
    }
    if key_size < MIN_RSA_KEY_SIZE || key_size > MAX_RSA_KEY_SIZE {
        return Err(ks_err!(InvalidArgument, "unsupported RSA key size {:?}", key_size));
    }
    let exponent = openssl::bn::BigNum::from_slice(&pub_exponent.0.to_be_bytes()[..])
        .map_err(openssl_err!("failed to create BigNum for exponent {:?}", pub_exponent))?;

    let rsa_key =
        openssl::rsa::Rsa::generate_with_e(key_size.0, &exponent).map_err(openssl_err!(
            "failed to generate RSA key size {:?} exponent {:?}",
            key_size,
            pub_exponent
        ))?;
    KeyPair::new(ossl!(openssl::pkey::PKey::from_rsa(rsa_key))?)
}
