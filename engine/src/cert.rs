//! Generation of certificates.

use core::time::Duration;
use der::asn1::{AnyRef, BitStringRef, GeneralizedTime, UtcTime};
use der::{oid::AssociatedOid, Decode, Encode, ErrorKind};
use flagset::FlagSet;
use ksf_boringssl::{KeyPair, SignatureAlgorithm};
use ksf_common::{ks_err, Error};
use ksf_wire::keymint::{Algorithm, DateTime, Digest};
use spki::{AlgorithmIdentifier, ObjectIdentifier, SubjectPublicKeyInfo};
use x509_cert::{
    certificate::{Certificate, TbsCertificate},
    ext::pkix::{KeyUsage, KeyUsages},
    ext::Extension,
    time::Time,
};

/// OID value for the Android Attestation extension.
pub const ATTESTATION_EXTENSION_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.11129.2.1.17");

/// OID values for subject public key algorithms.
pub const EC_PUBLIC_KEY_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
pub const RSA_ENCRYPTION_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

/// OID values for signature algorithms.
const ECDSA_SHA1_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.1");
const ECDSA_SHA224_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.1");
const ECDSA_SHA256_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");
const ECDSA_SHA384_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.3");
const ECDSA_SHA512_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.4");
const SHA1_RSA_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.5");
const SHA224_RSA_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.14");
const SHA256_RSA_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
const SHA384_RSA_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.12");
const SHA512_RSA_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.13");

const SIGNATURE_OIDS: &[(ObjectIdentifier, SignatureAlgorithm)] = &[
    (ECDSA_SHA1_OID, SignatureAlgorithm::Ecdsa(Digest::Sha1)),
    (ECDSA_SHA224_OID, SignatureAlgorithm::Ecdsa(Digest::Sha224)),
    (ECDSA_SHA256_OID, SignatureAlgorithm::Ecdsa(Digest::Sha256)),
    (ECDSA_SHA384_OID, SignatureAlgorithm::Ecdsa(Digest::Sha384)),
    (ECDSA_SHA512_OID, SignatureAlgorithm::Ecdsa(Digest::Sha512)),
    (SHA1_RSA_OID, SignatureAlgorithm::RsaPkcs1(Digest::Sha1)),
    (SHA224_RSA_OID, SignatureAlgorithm::RsaPkcs1(Digest::Sha224)),
    (SHA256_RSA_OID, SignatureAlgorithm::RsaPkcs1(Digest::Sha256)),
    (SHA384_RSA_OID, SignatureAlgorithm::RsaPkcs1(Digest::Sha384)),
    (SHA512_RSA_OID, SignatureAlgorithm::RsaPkcs1(Digest::Sha512)),
];

/// Key algorithm of a subject public key.
pub(crate) fn key_algorithm(spki: &SubjectPublicKeyInfo) -> Result<Algorithm, Error> {
    let oid = spki.algorithm.oid;
    if oid == EC_PUBLIC_KEY_OID {
        Ok(Algorithm::Ec)
    } else if oid == RSA_ENCRYPTION_OID {
        Ok(Algorithm::Rsa)
    } else {
        Err(ks_err!(UnsupportedAlgorithm, "unsupported public key algorithm {}", oid))
    }
}

/// Signature scheme identified by a certificate's signature `AlgorithmIdentifier`.
pub(crate) fn signature_algorithm(
    alg_id: &AlgorithmIdentifier,
) -> Result<SignatureAlgorithm, Error> {
    SIGNATURE_OIDS
        .iter()
        .find(|(oid, _)| *oid == alg_id.oid)
        .map(|(_, sig_alg)| *sig_alg)
        .ok_or_else(|| ks_err!(SigningError, "unsupported signature algorithm {}", alg_id.oid))
}

/// `AlgorithmIdentifier` for a signature scheme.  RSA schemes carry NULL parameters; ECDSA
/// schemes have none.
pub(crate) fn signature_algorithm_id(
    sig_alg: SignatureAlgorithm,
) -> Result<AlgorithmIdentifier<'static>, Error> {
    let oid = SIGNATURE_OIDS
        .iter()
        .find(|(_, alg)| *alg == sig_alg)
        .map(|(oid, _)| *oid)
        .ok_or_else(|| ks_err!(SigningError, "no OID for {:?}", sig_alg))?;
    let parameters = match sig_alg {
        SignatureAlgorithm::Ecdsa(_) => None,
        SignatureAlgorithm::RsaPkcs1(_) => Some(AnyRef::new(der::Tag::Null, &[])?),
    };
    Ok(AlgorithmIdentifier { oid, parameters })
}

/// Build an ASN.1 DER-encodable `Certificate`.
pub(crate) fn certificate<'a>(
    tbs_cert: TbsCertificate<'a>,
    sig_val: &'a [u8],
) -> Result<Certificate<'a>, Error> {
    Ok(Certificate {
        signature_algorithm: tbs_cert.signature,
        tbs_certificate: tbs_cert,
        signature: BitStringRef::new(0, sig_val)?,
    })
}

/// Sign `tbs_cert` with `key`, returning the DER-encoded certificate.
pub(crate) fn sign_certificate(
    tbs_cert: TbsCertificate,
    key: &KeyPair,
    sig_alg: SignatureAlgorithm,
) -> Result<Vec<u8>, Error> {
    let tbs_data = tbs_cert
        .to_vec()
        .map_err(|e| ks_err!(EncodingError, "failed to DER-encode tbsCertificate: {:?}", e))?;
    let sig_val = key.sign(sig_alg, &tbs_data)?;
    let cert = certificate(tbs_cert, &sig_val)?;
    cert.to_vec().map_err(|e| ks_err!(EncodingError, "failed to DER-encode certificate: {:?}", e))
}

/// Extract the Subject field from a DER-encoded certificate.
pub(crate) fn extract_subject(cert: &[u8]) -> Result<Vec<u8>, Error> {
    let cert = Certificate::from_der(cert)
        .map_err(|e| ks_err!(EncodingError, "failed to parse certificate: {:?}", e))?;
    let subject_data = cert
        .tbs_certificate
        .subject
        .to_vec()
        .map_err(|e| ks_err!(EncodingError, "failed to DER-encode subject: {:?}", e))?;
    Ok(subject_data)
}

/// Find the value of the extension with the given OID.
pub(crate) fn find_extension<'a>(
    cert: &Certificate<'a>,
    oid: ObjectIdentifier,
) -> Option<&'a [u8]> {
    cert.tbs_certificate
        .extensions
        .as_ref()
        .and_then(|exts| exts.iter().find(|ext| ext.extn_id == oid))
        .map(|ext| ext.extn_value)
}

/// Construct x.509-cert::time::Time from Duration.
/// RFC 5280 section 4.1.2.5 requires that UtcTime is used up to 2049
/// and GeneralizedTime from 2050 onwards
fn validity_time_from_duration(duration: Duration) -> Result<Time, Error> {
    const MAX_UTC_TIME: Duration = Duration::from_secs(2524608000); // 2050-01-01T00:00:00Z
    if duration >= MAX_UTC_TIME {
        Ok(Time::GeneralTime(GeneralizedTime::from_unix_duration(duration)?))
    } else {
        Ok(Time::UtcTime(UtcTime::from_unix_duration(duration)?))
    }
}

/// Validity time for a point in time, truncated to whole seconds.
pub(crate) fn validity_time(when: DateTime) -> Result<Time, Error> {
    let secs =
        u64::try_from(when.ms_since_epoch / 1000).map_err(|_| Error::Der(ErrorKind::DateTime))?;
    validity_time_from_duration(Duration::from_secs(secs))
}

/// Build a critical key usage extension value allowing certificate signing only.
pub(crate) fn key_usage_cert_sign() -> Result<Vec<u8>, Error> {
    let key_usage = KeyUsage(FlagSet::<KeyUsages>::from(KeyUsages::KeyCertSign));
    key_usage
        .to_vec()
        .map_err(|e| ks_err!(EncodingError, "failed to DER-encode key usage: {:?}", e))
}

/// Key usage extension holding `value`.
pub(crate) fn key_usage_extension(value: &[u8]) -> Extension {
    Extension { extn_id: KeyUsage::OID, critical: true, extn_value: value }
}

/// Non-critical attestation extension holding `value`.
pub(crate) fn attestation_extension(value: &[u8]) -> Extension {
    Extension { extn_id: ATTESTATION_EXTENSION_OID, critical: false, extn_value: value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ksf_common::{expect_err, hex_encode};

    #[test]
    fn test_signature_algorithm_lookup() {
        for (oid, sig_alg) in SIGNATURE_OIDS {
            let id = signature_algorithm_id(*sig_alg).unwrap();
            assert_eq!(id.oid, *oid);
            assert_eq!(signature_algorithm(&id).unwrap(), *sig_alg);
        }
        let id = AlgorithmIdentifier {
            oid: ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.10"), // RSASSA-PSS
            parameters: None,
        };
        expect_err!(signature_algorithm(&id), "unsupported signature algorithm");
        expect_err!(
            signature_algorithm_id(SignatureAlgorithm::Ecdsa(Digest::Md5)),
            "no OID for Ecdsa(Md5)"
        );
    }

    #[test]
    fn test_signature_algorithm_encoding() {
        let id = signature_algorithm_id(SignatureAlgorithm::Ecdsa(Digest::Sha256)).unwrap();
        assert_eq!(hex_encode(&id.to_vec().unwrap()), "300a06082a8648ce3d040302");
        let id = signature_algorithm_id(SignatureAlgorithm::RsaPkcs1(Digest::Sha256)).unwrap();
        assert_eq!(hex_encode(&id.to_vec().unwrap()), "300d06092a864886f70d01010b0500");
    }

    #[test]
    fn test_key_usage() {
        let encoded = key_usage_cert_sign().unwrap();
        let got = KeyUsage::from_der(&encoded).unwrap();
        assert_eq!(got.0, FlagSet::from(KeyUsages::KeyCertSign));
        let ext = key_usage_extension(&encoded);
        assert!(ext.critical);
        assert!(!attestation_extension(&encoded).critical);
    }

    #[test]
    fn test_validity_time() {
        let got = validity_time(DateTime { ms_since_epoch: 1_700_000_000_999 }).unwrap();
        assert!(matches!(got, Time::UtcTime(_)));
        assert_eq!(hex_encode(&got.to_vec().unwrap()), "170d3233313131343232313332305a");
        let got = validity_time(DateTime { ms_since_epoch: 253_402_300_799_000 }).unwrap();
        assert_eq!(hex_encode(&got.to_vec().unwrap()), "180f39393939313233313233353935395a");
        expect_err!(validity_time(DateTime { ms_since_epoch: -1000 }), "DateTime");
    }
}
