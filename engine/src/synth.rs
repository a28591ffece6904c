//! Certificates for freshly generated keys.

use crate::attest::{self, AttestationInfo};
use crate::device::Implementation;
use crate::keybox::KeyBox;
use crate::{app_id, cert};
use der::Decode;
use ksf_boringssl::{ec, rsa, KeyPair, SignatureAlgorithm};
use ksf_common::tag::KeyGenParams;
use ksf_common::{ks_err, Error};
use ksf_wire::keymint::{Algorithm, DateTime, DEFAULT_CERT_SERIAL, DEFAULT_CERT_SUBJECT};
use spki::SubjectPublicKeyInfo;
use x509_cert::{
    certificate::{TbsCertificate, Version},
    der::asn1::UIntRef,
    name::RdnSequence,
    time::{Time, Validity},
};

/// Generate a key pair as described by `params`.
pub(crate) fn generate_key_pair(params: &KeyGenParams) -> Result<KeyPair, Error> {
    match params.algorithm {
        Algorithm::Ec => {
            let curve = params
                .ec_curve
                .ok_or_else(|| ks_err!(UnsupportedAlgorithm, "no curve for EC key"))?;
            ec::generate_key(curve)
        }
        Algorithm::Rsa => rsa::generate_key(params.key_size, params.rsa_public_exponent),
        alg => Err(ks_err!(UnsupportedAlgorithm, "cannot generate {:?} key pair", alg)),
    }
}

/// Certificate fields of a synthesized leaf that do not depend on its key or issuer.
#[derive(Debug, Clone)]
pub(crate) struct LeafTemplate<'a> {
    pub serial: &'a [u8],
    /// DER-encoded `Name`.
    pub subject: &'a [u8],
    pub not_before: Time,
    pub not_after: Time,
}

impl<'a> LeafTemplate<'a> {
    /// Default serial and subject, valid from the requested time (or `now`) until the keybox
    /// certificate expires.
    pub(crate) fn with_defaults(
        params: &KeyGenParams,
        keybox: &KeyBox,
        now: DateTime,
    ) -> Result<Self, Error> {
        Ok(Self {
            serial: DEFAULT_CERT_SERIAL,
            subject: DEFAULT_CERT_SUBJECT,
            not_before: cert::validity_time(params.cert_not_before.unwrap_or(now))?,
            not_after: keybox.issuer_validity.not_after,
        })
    }

    /// Serial, subject and validity requested in `params`, with defaults for anything absent.
    pub(crate) fn requested(
        params: &'a KeyGenParams,
        keybox: &KeyBox,
        now: DateTime,
    ) -> Result<Self, Error> {
        let mut template = Self::with_defaults(params, keybox, now)?;
        if let Some(serial) = &params.cert_serial {
            template.serial = serial.as_slice();
        }
        if let Some(subject) = &params.cert_subject {
            template.subject = subject.as_slice();
        }
        if let Some(not_after) = params.cert_not_after {
            template.not_after = cert::validity_time(not_after)?;
        }
        Ok(template)
    }
}

/// Key and identity that sign a synthesized leaf.
pub(crate) struct Issuer<'a> {
    pub key: &'a KeyPair,
    /// DER-encoded `Name`.
    pub subject: &'a [u8],
}

/// Build the attestation extension for a new key owned by `uid`.
pub(crate) fn attestation_extension(
    dev: &Implementation,
    uid: u32,
    params: &KeyGenParams,
) -> Result<Vec<u8>, Error> {
    let app_id = app_id::build(dev.packages.as_ref(), uid)?;
    let boot_key = dev.boot.verified_boot_key();
    let boot_hash = dev.boot.verified_boot_hash();
    let module_hash = dev.platform.module_hash();
    let telephony_ids = match params.attestation_ids.brand {
        Some(_) => dev.telephony.attestation_ids(),
        None => Vec::new(),
    };
    attest::synthesize(&AttestationInfo {
        params,
        app_id: &app_id,
        boot_key: &boot_key,
        boot_hash: &boot_hash,
        os_version: dev.platform.os_version(),
        os_patchlevel: dev.platform.os_patchlevel(),
        vendor_patchlevel: dev.platform.vendor_patchlevel(),
        boot_patchlevel: dev.platform.boot_patchlevel(),
        module_hash: &module_hash,
        telephony_ids: &telephony_ids,
        creation_time: dev.clock.now(),
    })
}

/// Build and sign a leaf certificate for `key_pair`.  The signature uses SHA-256 with the scheme
/// that matches the issuer's key.
pub(crate) fn build_leaf(
    template: &LeafTemplate,
    key_pair: &KeyPair,
    attest_ext: &[u8],
    issuer: &Issuer,
) -> Result<Vec<u8>, Error> {
    let sig_alg = SignatureAlgorithm::sha256_for(issuer.key.algorithm())?;
    let spki_data = key_pair.public_key_info()?;
    let key_usage = cert::key_usage_cert_sign()?;

    let tbs = TbsCertificate {
        version: Version::V3,
        serial_number: UIntRef::new(template.serial)?,
        signature: cert::signature_algorithm_id(sig_alg)?,
        issuer: RdnSequence::from_der(issuer.subject)?,
        validity: Validity { not_before: template.not_before, not_after: template.not_after },
        subject: RdnSequence::from_der(template.subject)?,
        subject_public_key_info: SubjectPublicKeyInfo::from_der(&spki_data)?,
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: Some(vec![
            cert::key_usage_extension(&key_usage),
            cert::attestation_extension(attest_ext),
        ]),
    };
    cert::sign_certificate(tbs, issuer.key, sig_alg)
}
