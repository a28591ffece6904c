//! Engine that substitutes Android key attestation chains.
//!
//! Given a certificate chain produced by secure hardware, the [`Forger`] re-issues the
//! attestation leaf under a configured "keybox" key, asserting a locked bootloader and verified
//! boot state.  It can also produce a complete attested chain for a key pair generated in
//! software.
//!
//! Every operation exposed by [`Forger`] is infallible from the caller's point of view: failures
//! are logged and the caller's input is handed back unchanged (or `None` is returned where there
//! is no input to fall back to).

extern crate alloc;

use crate::device::{AttestKey, Implementation};
use crate::keybox::{KeyBox, KeyboxStore};
use crate::pending::{KeyId, PendingAlgorithms};
use crate::synth::{Issuer, LeafTemplate};
use der::Decode;
use ksf_boringssl::KeyPair;
use ksf_common::tag::KeyGenParams;
use ksf_common::{ks_err, Error};
use ksf_wire::keymint::Algorithm;
use ksf_wire::KeyDescriptor;
use log::{debug, error, warn};
use std::sync::Arc;
use x509_cert::certificate::Certificate;

pub mod app_id;
pub mod attest;
pub mod cert;
pub mod config;
pub mod device;
pub mod env;
mod forge;
pub mod keybox;
pub mod pending;
mod synth;


/// Entry point for chain forging and synthesis.
pub struct Forger {
    keyboxes: KeyboxStore,
    pending: PendingAlgorithms,
    dev: Implementation,
}

impl Forger {
    /// Create an engine with no keyboxes loaded.
    pub fn new(dev: Implementation) -> Self {
        Self { keyboxes: KeyboxStore::new(), pending: PendingAlgorithms::default(), dev }
    }

    /// Replace the loaded keyboxes with those described by keybox XML.  `None` or blank text
    /// unloads all keyboxes, as does any error.
    pub fn load_keyboxes(&self, xml: Option<&str>) -> Result<usize, Error> {
        self.keyboxes.load_xml(xml)
    }

    /// Indicate whether any keybox is loaded.
    pub fn is_available(&self) -> bool {
        self.keyboxes.is_available()
    }

    /// Replace the attestation leaf of `chain` with one issued by the keybox for the leaf's key
    /// algorithm, followed by the keybox chain.  Chains without an attestation leaf, and chains
    /// that cannot be forged, are returned unchanged.
    pub fn forge_chain(&self, chain: &[Vec<u8>]) -> Vec<Vec<u8>> {
        match self.try_forge_chain(chain) {
            Ok(Some(forged)) => forged,
            Ok(None) => chain.to_vec(),
            Err(e) => {
                error!("failed to forge certificate chain: {}", e);
                chain.to_vec()
            }
        }
    }

    /// Replace a single attestation leaf, remembering its key algorithm so that a later
    /// [`Forger::resolve_ca_chain`] for the same key returns the matching keybox chain.
    pub fn forge_leaf(&self, leaf: &[u8], alias: &str, uid: u32) -> Vec<u8> {
        match self.try_forge_leaf(leaf, alias, uid) {
            Ok(Some(forged)) => forged,
            Ok(None) => leaf.to_vec(),
            Err(e) => {
                error!("failed to forge leaf for {} ({}): {}", alias, uid, e);
                leaf.to_vec()
            }
        }
    }

    /// Return the concatenated DER of the keybox chain that signed the leaf most recently forged
    /// for `(alias, uid)`, consuming the record of that leaf.  Returns `ca_chain` unchanged if no
    /// such leaf or keybox exists.
    pub fn resolve_ca_chain(&self, ca_chain: &[u8], alias: &str, uid: u32) -> Vec<u8> {
        let Some(algorithm) = self.pending.take(&KeyId::new(alias, uid)) else {
            return ca_chain.to_vec();
        };
        match self.keyboxes.get(algorithm) {
            Some(keybox) => keybox.chain.concat(),
            None => {
                warn!("no {} keybox for CA chain of {} ({})", algorithm, alias, uid);
                ca_chain.to_vec()
            }
        }
    }

    /// Generate a key pair as described by `params`.
    pub fn generate_key_pair(&self, params: &KeyGenParams) -> Option<KeyPair> {
        synth::generate_key_pair(params)
            .map_err(|e| error!("failed to generate key pair: {}", e))
            .ok()
    }

    /// Build an attested chain for `key_pair`, owned by `uid`, issued by the keybox for
    /// `params.algorithm`.  The leaf uses the default serial and subject.
    pub fn synthesize_chain(
        &self,
        uid: u32,
        params: &KeyGenParams,
        key_pair: &KeyPair,
    ) -> Option<Vec<Vec<u8>>> {
        self.try_synthesize_chain(uid, params, key_pair)
            .map_err(|e| error!("failed to synthesize chain for uid {}: {}", uid, e))
            .ok()
    }

    /// Generate a key pair and an attested chain for it.
    ///
    /// If `attest_key` names an attestation key owned by `uid`, the leaf is signed by that key and
    /// the chain holds only the leaf.  Otherwise the leaf is issued by the keybox and followed by
    /// the keybox chain.
    pub fn synthesize_chain_with_delegation(
        &self,
        uid: u32,
        descriptor: &KeyDescriptor,
        attest_key: Option<&KeyDescriptor>,
        params: &KeyGenParams,
    ) -> Option<(KeyPair, Vec<Vec<u8>>)> {
        self.try_synthesize_chain_with_delegation(uid, descriptor, attest_key, params)
            .map_err(|e| {
                error!("failed to synthesize chain for {:?} ({}): {}", descriptor.alias, uid, e)
            })
            .ok()
    }

    fn keybox(&self, algorithm: Algorithm) -> Result<Arc<KeyBox>, Error> {
        self.keyboxes
            .get(algorithm)
            .ok_or_else(|| ks_err!(UnsupportedAlgorithm, "no keybox for {}", algorithm))
    }

    fn try_forge_chain(&self, chain: &[Vec<u8>]) -> Result<Option<Vec<Vec<u8>>>, Error> {
        let Some(leaf_data) = chain.first() else {
            return Ok(None);
        };
        let leaf = Certificate::from_der(leaf_data)?;
        let Some(attest_ext) = cert::find_extension(&leaf, cert::ATTESTATION_EXTENSION_OID) else {
            debug!("leaf has no attestation extension");
            return Ok(None);
        };
        let keybox = self.keybox(forge::leaf_algorithm(&leaf)?)?;
        let forged = forge::forge_leaf(&leaf, attest_ext, &keybox, self.dev.boot.as_ref())?;
        Ok(Some(self_chained(forged, &keybox)))
    }

    fn try_forge_leaf(
        &self,
        leaf_data: &[u8],
        alias: &str,
        uid: u32,
    ) -> Result<Option<Vec<u8>>, Error> {
        let leaf = Certificate::from_der(leaf_data)?;
        let Some(attest_ext) = cert::find_extension(&leaf, cert::ATTESTATION_EXTENSION_OID) else {
            return Ok(None);
        };
        let algorithm = forge::leaf_algorithm(&leaf)?;
        self.pending.record(KeyId::new(alias, uid), algorithm);
        let keybox = self.keybox(algorithm)?;
        forge::forge_leaf(&leaf, attest_ext, &keybox, self.dev.boot.as_ref()).map(Some)
    }

    fn try_synthesize_chain(
        &self,
        uid: u32,
        params: &KeyGenParams,
        key_pair: &KeyPair,
    ) -> Result<Vec<Vec<u8>>, Error> {
        let keybox = self.keybox(params.algorithm)?;
        let template = LeafTemplate::with_defaults(params, &keybox, self.dev.clock.now())?;
        let attest_ext = synth::attestation_extension(&self.dev, uid, params)?;
        let issuer = Issuer { key: &keybox.key, subject: &keybox.issuer_subject };
        let leaf = synth::build_leaf(&template, key_pair, &attest_ext, &issuer)?;
        Ok(self_chained(leaf, &keybox))
    }

    fn try_synthesize_chain_with_delegation(
        &self,
        uid: u32,
        descriptor: &KeyDescriptor,
        attest_key: Option<&KeyDescriptor>,
        params: &KeyGenParams,
    ) -> Result<(KeyPair, Vec<Vec<u8>>), Error> {
        let key_pair = synth::generate_key_pair(params)?;
        let keybox = self.keybox(params.algorithm)?;
        let template = LeafTemplate::requested(params, &keybox, self.dev.clock.now())?;
        let attest_ext = synth::attestation_extension(&self.dev, uid, params)?;

        let chain = match attest_key.and_then(|d| self.delegated_key(uid, d)) {
            Some((signer, subject)) => {
                debug!("signing {:?} with attestation key", descriptor.alias);
                let issuer = Issuer { key: &signer.signing_key, subject: &subject };
                vec![synth::build_leaf(&template, &key_pair, &attest_ext, &issuer)?]
            }
            None => {
                let issuer = Issuer { key: &keybox.key, subject: &keybox.issuer_subject };
                let leaf = synth::build_leaf(&template, &key_pair, &attest_ext, &issuer)?;
                self_chained(leaf, &keybox)
            }
        };
        Ok((key_pair, chain))
    }

    /// Look up the attestation key named by `descriptor`, along with the subject of its
    /// certificate.
    fn delegated_key(&self, uid: u32, descriptor: &KeyDescriptor) -> Option<(AttestKey, Vec<u8>)> {
        let Some(alias) = descriptor.alias.as_deref() else {
            warn!("attestation key without alias, signing with keybox");
            return None;
        };
        let key = self.dev.attest_keys.attest_key(uid, alias);
        let subject = key.as_ref().and_then(|k| k.chain.first()).map(|c| cert::extract_subject(c));
        match (key, subject) {
            (Some(key), Some(Ok(subject))) => Some((key, subject)),
            (_, Some(Err(e))) => {
                warn!("unusable attestation key {} ({}), signing with keybox: {}", alias, uid, e);
                None
            }
            _ => {
                warn!("attestation key {} ({}) not found, signing with keybox", alias, uid);
                None
            }
        }
    }
}

/// `leaf` followed by the keybox chain.
fn self_chained(leaf: Vec<u8>, keybox: &KeyBox) -> Vec<Vec<u8>> {
    let mut chain = Vec::with_capacity(1 + keybox.chain.len());
    chain.push(leaf);
    chain.extend(keybox.chain.iter().cloned());
    chain
}
