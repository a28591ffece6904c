//! EC key generation.

use crate::{openssl_err, ossl, KeyPair};
use ksf_common::{ks_err, Error};
use ksf_wire::keymint::EcCurve;
use openssl::ec::EcGroup;
use openssl::nid::Nid;

/// Generate a key pair on one of the NIST curves.
pub fn generate_key(curve: EcCurve) -> Result<KeyPair, Error> {
    let group = nist_curve_to_group(curve)?;
    let ec_key = ossl!(openssl::ec::EcKey::<openssl::pkey::Private>::generate(group.as_ref()))?;
    KeyPair::new(ossl!(openssl::pkey::PKey::from_ec_key(ec_key))?)
}

fn nist_curve_to_group(curve: EcCurve) -> Result<EcGroup, Error> {
    let nid = match curve {
        EcCurve::P224 => Nid::SECP224R1,
        EcCurve::P256 => Nid::X9_62_PRIME256V1,
        EcCurve::P384 => Nid::SECP384R1,
        EcCurve::P521 => Nid::SECP521R1,
        EcCurve::Curve25519 => {
            return Err(ks_err!(UnsupportedAlgorithm, "curve {:?} not supported for keygen", curve))
        }
    };
    EcGroup::from_curve_name(nid).map_err(openssl_err!("failed to determine EcGroup"))
}

/// Curve of an existing EC key pair.
pub fn curve_of(key: &KeyPair) -> Result<EcCurve, Error> {
    let ec_key = ossl!(key.pkey().ec_key())?;
    match ec_key.group().curve_name() {
        Some(Nid::SECP224R1) => Ok(EcCurve::P224),
        Some(Nid::X9_62_PRIME256V1) => Ok(EcCurve::P256),
        Some(Nid::SECP384R1) => Ok(EcCurve::P384),
        Some(Nid::SECP521R1) => Ok(EcCurve::P521),
        nid => Err(ks_err!(UnsupportedAlgorithm, "unrecognized curve {:?}", nid)),
    }
}
