//! Re-signing of hardware attestation leaves under a keybox.

use crate::attest::KeyDescription;
use crate::cert;
use crate::device::BootState;
use crate::keybox::KeyBox;
use der::Decode;
use ksf_common::Error;
use ksf_wire::keymint::Algorithm;
use log::debug;
use x509_cert::{
    certificate::{Certificate, TbsCertificate, Version},
    name::RdnSequence,
};

/// Key algorithm of the certified public key.
pub(crate) fn leaf_algorithm(leaf: &Certificate) -> Result<Algorithm, Error> {
    cert::key_algorithm(&leaf.tbs_certificate.subject_public_key_info)
}

/// Build a replacement for `leaf`, issued and signed by `keybox`.
///
/// The new certificate keeps the serial, validity, subject, public key and signature algorithm of
/// `leaf`.  Its extensions are the attestation extension with a rewritten root of trust, followed
/// by every other extension of `leaf` in its original order.
pub(crate) fn forge_leaf(
    leaf: &Certificate,
    attest_ext: &[u8],
    keybox: &KeyBox,
    boot: &dyn BootState,
) -> Result<Vec<u8>, Error> {
    let sig_alg = cert::signature_algorithm(&leaf.signature_algorithm)?;
    let desc = KeyDescription::decode(attest_ext)?;
    let boot_key = boot.verified_boot_key();
    let new_ext = desc.rewrite(&boot_key, || boot.verified_boot_hash())?;

    let mut extensions = vec![cert::attestation_extension(&new_ext)];
    extensions.extend(
        leaf.tbs_certificate
            .extensions
            .iter()
            .flatten()
            .filter(|ext| ext.extn_id != cert::ATTESTATION_EXTENSION_OID)
            .cloned(),
    );
    debug!("forging leaf with {} extensions under {} keybox", extensions.len(), keybox.algorithm());

    let tbs = TbsCertificate {
        version: Version::V3,
        serial_number: leaf.tbs_certificate.serial_number,
        signature: leaf.signature_algorithm,
        issuer: RdnSequence::from_der(&keybox.issuer_subject)?,
        validity: leaf.tbs_certificate.validity.clone(),
        subject: leaf.tbs_certificate.subject.clone(),
        subject_public_key_info: leaf.tbs_certificate.subject_public_key_info.clone(),
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: Some(extensions),
    };
    cert::sign_certificate(tbs, &keybox.key, sig_alg)
}
