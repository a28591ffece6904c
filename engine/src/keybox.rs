//! Storage of substitute attestation keys.

use crate::config::{self, KeyboxRecord};
use der::{Decode, Encode};
use ksf_boringssl::{pem, KeyPair};
use ksf_common::{ks_err, Error};
use ksf_wire::keymint::Algorithm;
use log::{error, info};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use x509_cert::time::Validity;

/// A substitute attestation key with the certificate chain that vouches for it.
#[derive(Debug)]
pub struct KeyBox {
    pub key: KeyPair,
    /// DER-encoded certificates.  The first is the certificate of `key`, whose subject becomes the
    /// issuer of every leaf signed by it.
    pub chain: Vec<Vec<u8>>,
    /// DER-encoded subject of `chain[0]`.
    pub issuer_subject: Vec<u8>,
    /// Validity of `chain[0]`.
    pub issuer_validity: Validity,
}

impl KeyBox {
    /// Decode a configured keybox.  The key must be of the configured algorithm.
    pub fn new(record: &KeyboxRecord) -> Result<Self, Error> {
        let key = pem::private_key_from_pem(&record.private_key_pem).map_err(|e| {
            ks_err!(ConfigParseError, "bad {} keybox private key: {}", record.algorithm, e)
        })?;
        if key.algorithm() != record.algorithm {
            return Err(ks_err!(
                ConfigParseError,
                "keybox declared as {} holds a {} key",
                record.algorithm,
                key.algorithm()
            ));
        }
        let chain = record
            .certificate_pems
            .iter()
            .map(|p| pem::certificate_from_pem(p))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                ks_err!(ConfigParseError, "bad {} keybox certificate: {}", record.algorithm, e)
            })?;
        let first = chain
            .first()
            .ok_or_else(|| ks_err!(ConfigParseError, "empty {} keybox chain", record.algorithm))?;
        let cert = x509_cert::Certificate::from_der(first)
            .map_err(|e| ks_err!(ConfigParseError, "failed to parse certificate: {:?}", e))?;
        let issuer_subject = cert
            .tbs_certificate
            .subject
            .to_vec()
            .map_err(|e| ks_err!(EncodingError, "failed to DER-encode subject: {:?}", e))?;
        let issuer_validity = cert.tbs_certificate.validity;
        Ok(Self { key, chain, issuer_subject, issuer_validity })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.key.algorithm()
    }
}

/// An immutable set of keyboxes, at most one per algorithm.
#[derive(Debug, Default)]
pub struct KeyboxSet {
    keyboxes: HashMap<Algorithm, Arc<KeyBox>>,
}

impl KeyboxSet {
    /// Decode all records.  A later record for an algorithm replaces an earlier one.
    pub fn new(records: &[KeyboxRecord]) -> Result<Self, Error> {
        let mut keyboxes = HashMap::new();
        for record in records {
            keyboxes.insert(record.algorithm, Arc::new(KeyBox::new(record)?));
        }
        Ok(Self { keyboxes })
    }

    pub fn get(&self, algorithm: Algorithm) -> Option<Arc<KeyBox>> {
        self.keyboxes.get(&algorithm).cloned()
    }

    pub fn len(&self) -> usize {
        self.keyboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyboxes.is_empty()
    }
}

/// The currently configured keyboxes.  Loading installs a complete new [`KeyboxSet`]; readers
/// keep using whichever set they took.
#[derive(Debug, Default)]
pub struct KeyboxStore {
    current: RwLock<Arc<KeyboxSet>>,
}

impl KeyboxStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn install(&self, set: KeyboxSet) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = Arc::new(set);
    }

    /// Replace the store contents with the keyboxes described by `records`.  On failure the store
    /// is left empty.
    pub fn load(&self, records: &[KeyboxRecord]) -> Result<usize, Error> {
        match KeyboxSet::new(records) {
            Ok(set) => {
                let count = set.len();
                self.install(set);
                Ok(count)
            }
            Err(e) => {
                self.clear();
                Err(e)
            }
        }
    }

    /// Replace the store contents from keybox XML.  Absent or blank text clears the store, as
    /// does any parse failure.
    pub fn load_xml(&self, xml: Option<&str>) -> Result<usize, Error> {
        let records = match xml.map(config::parse_keybox_xml).transpose() {
            Ok(records) => records.unwrap_or_default(),
            Err(e) => {
                self.clear();
                error!("error loading keyboxes (keyboxes cleared): {}", e);
                return Err(e);
            }
        };
        match self.load(&records) {
            Ok(0) => {
                info!("clear all keyboxes");
                Ok(0)
            }
            Ok(count) => {
                info!("update {} keyboxes", count);
                Ok(count)
            }
            Err(e) => {
                error!("error loading keyboxes (keyboxes cleared): {}", e);
                Err(e)
            }
        }
    }

    pub fn clear(&self) {
        self.install(KeyboxSet::default());
    }

    /// The currently installed set.
    pub fn snapshot(&self) -> Arc<KeyboxSet> {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn get(&self, algorithm: Algorithm) -> Option<Arc<KeyBox>> {
        self.snapshot().get(algorithm)
    }

    pub fn is_available(&self) -> bool {
        !self.snapshot().is_empty()
    }
}
