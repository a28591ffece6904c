//! Traits representing access to device-specific information and keystore state.

use ksf_boringssl::KeyPair;
use ksf_common::Error;
use ksf_wire::keymint::{DateTime, Tag};

/// Combined collection of trait implementations that must be provided.
pub struct Implementation {
    /// Verified boot key and hash used in forged roots of trust.
    pub boot: Box<dyn BootState>,

    /// OS version, patch levels and module hash.
    pub platform: Box<dyn PlatformInfo>,

    /// Device identifiers obtained from the telephony stack.
    pub telephony: Box<dyn TelephonyIds>,

    /// Package information used to build `attestationApplicationId`.
    pub packages: Box<dyn PackageManager>,

    /// Lookup of existing attestation keys for delegated signing.
    pub attest_keys: Box<dyn AttestKeyLookup>,

    /// Source of the current time.
    pub clock: Box<dyn Clock>,
}

/// Retrieval of the verified boot state that forged roots of trust assert.
pub trait BootState: Send + Sync {
    /// Verified boot key digest.  Must be stable for the lifetime of the process.
    fn verified_boot_key(&self) -> Vec<u8>;

    /// Verified boot hash, used when the original root of trust cannot supply one.
    fn verified_boot_hash(&self) -> Vec<u8>;
}

/// Retrieval of platform version information.
pub trait PlatformInfo: Send + Sync {
    /// OS version in the form `MMmmss`, e.g. 140000 for Android 14.
    fn os_version(&self) -> u32;

    /// OS patch level in the form `YYYYMM`.
    fn os_patchlevel(&self) -> u32;

    /// Vendor patch level in the form `YYYYMMDD`.
    fn vendor_patchlevel(&self) -> u32;

    /// Boot patch level in the form `YYYYMMDD`.
    fn boot_patchlevel(&self) -> u32;

    /// Digest over the set of active APEX modules.
    fn module_hash(&self) -> Vec<u8>;
}

/// Retrieval of telephony-derived attestation IDs.
pub trait TelephonyIds: Send + Sync {
    /// Identifier values keyed by their attestation tag (serial, IMEI, MEID, second IMEI).  Empty
    /// if the device has no telephony identifiers.
    fn attestation_ids(&self) -> Vec<(Tag, Vec<u8>)>;
}

/// Telephony implementation for devices without identifiers.
pub struct NoTelephony;

impl TelephonyIds for NoTelephony {
    fn attestation_ids(&self) -> Vec<(Tag, Vec<u8>)> {
        Vec::new()
    }
}

/// Information about an installed package.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PackageInfo {
    pub version_code: i64,
    /// Encoded signing certificates.
    pub signatures: Vec<Vec<u8>>,
}

/// Package manager queries.
pub trait PackageManager: Send + Sync {
    /// Names of all packages that run under `uid`.
    fn packages_for_uid(&self, uid: u32) -> Result<Vec<String>, Error>;

    /// Information about `package` as installed for `user_id`.
    fn package_info(&self, package: &str, user_id: u32) -> Result<PackageInfo, Error>;
}

/// An existing attestation key with its certificate chain.
#[derive(Clone, Debug)]
pub struct AttestKey {
    pub signing_key: KeyPair,
    /// DER-encoded chain, starting with the key's own certificate.
    pub chain: Vec<Vec<u8>>,
}

/// Lookup of previously generated attestation keys.
pub trait AttestKeyLookup: Send + Sync {
    fn attest_key(&self, uid: u32, alias: &str) -> Option<AttestKey>;
}

/// Lookup implementation for environments that never delegate.
pub struct NoAttestKeys;

impl AttestKeyLookup for NoAttestKeys {
    fn attest_key(&self, _uid: u32, _alias: &str) -> Option<AttestKey> {
        None
    }
}

/// Abstraction of wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime;
}

/// Clock backed by the system time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime {
        let since_epoch = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH);
        let ms_since_epoch = match since_epoch {
            Ok(d) => i64::try_from(d.as_millis()).unwrap_or(i64::MAX),
            Err(_) => 0,
        };
        DateTime { ms_since_epoch }
    }
}
