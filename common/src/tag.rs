//! Helper functionality for working with tags and key parameters.

use crate::{ks_err, wire::keymint, Error};
use alloc::vec::Vec;
use keymint::{Algorithm, DateTime, Digest, EcCurve, KeyParam, KeyPurpose};
use ksf_wire::{KeySizeInBits, RsaExponent};

/// Public exponent used for RSA keys when none is requested.
pub const DEFAULT_RSA_EXPONENT: RsaExponent = RsaExponent(65537);

/// Macro to retrieve the value of a required single-valued tag in a collection of `KeyParam`s.
/// Missing or duplicate instances of the tag produce an error with the given code.
#[macro_export]
macro_rules! get_tag_value {
    { $params:expr, $variant:ident, $err:expr } => {
        {
            let mut result = None;
            let mut count = 0;
            for param in $params {
                if let $crate::wire::keymint::KeyParam::$variant(v) = param {
                    count += 1;
                    result = Some(v.clone());
                }
            }
            match (count, result) {
                (1, Some(v)) => Ok(v),
                (0, _) => Err($crate::ks_verr!($err, "missing tag {}", stringify!($variant))),
                _ => Err($crate::ks_verr!($err, "duplicate tag {}", stringify!($variant))),
            }
        }
    }
}

/// Macro to retrieve the value of an optional single-valued tag in a collection of `KeyParam`s.  It
/// may or may not be present, but multiple instances of the tag are assumed to be invalid.
#[macro_export]
macro_rules! get_opt_tag_value {
    { $params:expr, $variant:ident } => {
        $crate::get_opt_tag_value!($params, $variant, InvalidArgument)
    };
    { $params:expr, $variant:ident, $dup_error:ident } => {
        {
            let mut result = None;
            let mut count = 0;
            for param in $params {
                if let $crate::wire::keymint::KeyParam::$variant(v) = param {
                    count += 1;
                    result = Some(v);
                }
            }
            match count {
                0 | 1 => Ok(result),
                _ => Err($crate::ks_err!($dup_error, "duplicate tag {}", stringify!($variant))),
            }
        }
    }
}

/// Macro to gather every value of a repeatable tag in a collection of `KeyParam`s.
#[macro_export]
macro_rules! get_tag_values {
    { $params:expr, $variant:ident } => {
        {
            let mut result = alloc::vec::Vec::new();
            for param in $params {
                if let $crate::wire::keymint::KeyParam::$variant(v) = param {
                    result.push(v.clone());
                }
            }
            result
        }
    }
}

/// Attestation ID values that a caller asked to have included in an attestation record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttestationIds {
    pub brand: Option<Vec<u8>>,
    pub device: Option<Vec<u8>>,
    pub product: Option<Vec<u8>>,
    pub serial: Option<Vec<u8>>,
    pub imei: Option<Vec<u8>>,
    pub second_imei: Option<Vec<u8>>,
    pub meid: Option<Vec<u8>>,
    pub manufacturer: Option<Vec<u8>>,
    pub model: Option<Vec<u8>>,
}

/// Key generation parameters, gathered once from the caller's [`KeyParam`] list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyGenParams {
    pub algorithm: Algorithm,
    pub key_size: KeySizeInBits,
    /// Always `Some` for EC keys.
    pub ec_curve: Option<EcCurve>,
    pub rsa_public_exponent: RsaExponent,
    pub purposes: Vec<KeyPurpose>,
    pub digests: Vec<Digest>,
    pub attestation_challenge: Vec<u8>,
    pub cert_serial: Option<Vec<u8>>,
    /// DER-encoded `Name`.
    pub cert_subject: Option<Vec<u8>>,
    pub cert_not_before: Option<DateTime>,
    pub cert_not_after: Option<DateTime>,
    pub attestation_ids: AttestationIds,
}

impl KeyGenParams {
    /// Build the typed parameter set, checking that the parameters describe a key that can be
    /// generated: an algorithm must be present, RSA keys need a size, and EC keys need a curve
    /// either directly or implied by their size.
    pub fn new(params: &[KeyParam]) -> Result<Self, Error> {
        let algorithm = get_tag_value!(params, Algorithm, keymint::ErrorCode::InvalidArgument)?;
        let key_size = get_opt_tag_value!(params, KeySize)?.copied();
        let (key_size, ec_curve) = match algorithm {
            Algorithm::Ec => {
                let curve = match get_opt_tag_value!(params, EcCurve)? {
                    Some(curve) => *curve,
                    None => key_size.and_then(|sz| EcCurve::from_key_size(sz.0)).ok_or_else(
                        || ks_err!(InvalidArgument, "no curve for EC key of size {:?}", key_size),
                    )?,
                };
                (key_size.unwrap_or_else(|| curve.key_size()), Some(curve))
            }
            _ => {
                let size = key_size
                    .ok_or_else(|| ks_err!(InvalidArgument, "no key size for {:?}", algorithm))?;
                (size, None)
            }
        };
        let rsa_public_exponent =
            get_opt_tag_value!(params, RsaPublicExponent)?.copied().unwrap_or(DEFAULT_RSA_EXPONENT);

        let attestation_ids = AttestationIds {
            brand: get_opt_tag_value!(params, AttestationIdBrand)?.cloned(),
            device: get_opt_tag_value!(params, AttestationIdDevice)?.cloned(),
            product: get_opt_tag_value!(params, AttestationIdProduct)?.cloned(),
            serial: get_opt_tag_value!(params, AttestationIdSerial)?.cloned(),
            imei: get_opt_tag_value!(params, AttestationIdImei)?.cloned(),
            second_imei: get_opt_tag_value!(params, AttestationIdSecondImei)?.cloned(),
            meid: get_opt_tag_value!(params, AttestationIdMeid)?.cloned(),
            manufacturer: get_opt_tag_value!(params, AttestationIdManufacturer)?.cloned(),
            model: get_opt_tag_value!(params, AttestationIdModel)?.cloned(),
        };

        Ok(Self {
            algorithm,
            key_size,
            ec_curve,
            rsa_public_exponent,
            purposes: get_tag_values!(params, Purpose),
            digests: get_tag_values!(params, Digest),
            attestation_challenge: get_opt_tag_value!(params, AttestationChallenge)?
                .cloned()
                .unwrap_or_default(),
            cert_serial: get_opt_tag_value!(params, CertificateSerial)?.cloned(),
            cert_subject: get_opt_tag_value!(params, CertificateSubject)?.cloned(),
            cert_not_before: get_opt_tag_value!(params, CertificateNotBefore)?.copied(),
            cert_not_after: get_opt_tag_value!(params, CertificateNotAfter)?.copied(),
            attestation_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expect_err;
    use alloc::vec;

    #[test]
    fn test_ec_params() {
        let params = vec![
            KeyParam::Algorithm(Algorithm::Ec),
            KeyParam::EcCurve(EcCurve::P384),
            KeyParam::Purpose(KeyPurpose::Sign),
            KeyParam::Purpose(KeyPurpose::Verify),
            KeyParam::Digest(Digest::Sha256),
            KeyParam::AttestationChallenge(b"challenge".to_vec()),
        ];
        let got = KeyGenParams::new(&params).unwrap();
        assert_eq!(got.algorithm, Algorithm::Ec);
        assert_eq!(got.ec_curve, Some(EcCurve::P384));
        assert_eq!(got.key_size, KeySizeInBits(384));
        assert_eq!(got.purposes, vec![KeyPurpose::Sign, KeyPurpose::Verify]);
        assert_eq!(got.digests, vec![Digest::Sha256]);
        assert_eq!(got.attestation_challenge, b"challenge");
        assert_eq!(got.cert_serial, None);
    }

    #[test]
    fn test_ec_curve_from_size() {
        let params =
            vec![KeyParam::Algorithm(Algorithm::Ec), KeyParam::KeySize(KeySizeInBits(521))];
        let got = KeyGenParams::new(&params).unwrap();
        assert_eq!(got.ec_curve, Some(EcCurve::P521));
    }

    #[test]
    fn test_rsa_defaults() {
        let params =
            vec![KeyParam::Algorithm(Algorithm::Rsa), KeyParam::KeySize(KeySizeInBits(2048))];
        let got = KeyGenParams::new(&params).unwrap();
        assert_eq!(got.rsa_public_exponent, RsaExponent(65537));
        assert_eq!(got.ec_curve, None);
        assert!(got.attestation_challenge.is_empty());
    }

    #[test]
    fn test_invalid_params() {
        let result = KeyGenParams::new(&[KeyParam::KeySize(KeySizeInBits(256))]);
        expect_err!(result, "missing tag Algorithm");

        let result = KeyGenParams::new(&[
            KeyParam::Algorithm(Algorithm::Ec),
            KeyParam::Algorithm(Algorithm::Rsa),
        ]);
        expect_err!(result, "duplicate tag Algorithm");

        let result = KeyGenParams::new(&[
            KeyParam::Algorithm(Algorithm::Ec),
            KeyParam::KeySize(KeySizeInBits(512)),
        ]);
        expect_err!(result, "no curve for EC key");

        let result = KeyGenParams::new(&[KeyParam::Algorithm(Algorithm::Rsa)]);
        expect_err!(result, "no key size");

        let result = KeyGenParams::new(&[
            KeyParam::Algorithm(Algorithm::Rsa),
            KeyParam::KeySize(KeySizeInBits(2048)),
            KeyParam::AttestationIdBrand(b"a".to_vec()),
            KeyParam::AttestationIdBrand(b"b".to_vec()),
        ]);
        expect_err!(result, "duplicate tag AttestationIdBrand");
    }
}
