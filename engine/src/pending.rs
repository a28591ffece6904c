//! Correlation of forged leaves with later requests for their CA chain.

use ksf_wire::keymint::Algorithm;
use std::collections::HashMap;
use std::sync::Mutex;

/// Default bound on the number of unconsumed entries.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Identity of a key in the caller's keystore.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyId {
    pub alias: String,
    pub uid: u32,
}

impl KeyId {
    pub fn new(alias: &str, uid: u32) -> Self {
        Self { alias: alias.to_string(), uid }
    }
}

#[derive(Default)]
struct Entries {
    next_seq: u64,
    entries: HashMap<KeyId, (Algorithm, u64)>,
}

/// Algorithms of leaves that have been forged but whose CA chain has not yet been requested.
/// Each entry is consumed by exactly one [`PendingAlgorithms::take`].
pub struct PendingAlgorithms {
    capacity: usize,
    inner: Mutex<Entries>,
}

impl Default for PendingAlgorithms {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl PendingAlgorithms {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), inner: Mutex::new(Entries::default()) }
    }

    /// Record the algorithm for `key`, replacing any previous entry.  When full, the oldest entry
    /// is dropped to make room.
    pub fn record(&self, key: KeyId, algorithm: Algorithm) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.capacity {
            let oldest =
                inner.entries.iter().min_by_key(|(_, (_, seq))| *seq).map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                log::debug!("dropping unconsumed entry for {:?}", oldest);
                inner.entries.remove(&oldest);
            }
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(key, (algorithm, seq));
    }

    /// Remove and return the algorithm recorded for `key`.
    pub fn take(&self, key: &KeyId) -> Option<Algorithm> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.entries.remove(key).map(|(algorithm, _)| algorithm)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
