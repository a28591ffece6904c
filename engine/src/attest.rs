//! Decoding, rewriting and synthesis of the Android key attestation extension.

use der::asn1::OctetStringRef;
use der::{Decode, Encode, Enumerated, Sequence};
use ksf_common::asn1::{self, universal, ExplicitTaggedValue, RawDer, TagClass, Tlv};
use ksf_common::tag::KeyGenParams;
use ksf_common::{ks_err, Error};
use ksf_wire::keymint::{
    self, raw_tag_value, Algorithm, DateTime, KeyOrigin, Tag, ATTESTATION_VERSION,
};
use log::warn;

/// Attestation extension contents
///
/// ```asn1
/// KeyDescription ::= SEQUENCE {
///     attestationVersion         INTEGER, # Value 400
///     attestationSecurityLevel   SecurityLevel,
///     keymasterVersion           INTEGER, # Value 400
///     keymasterSecurityLevel     SecurityLevel,
///     attestationChallenge       OCTET_STRING,
///     uniqueId                   OCTET_STRING, # Always empty
///     softwareEnforced           AuthorizationList,
///     teeEnforced                AuthorizationList,
/// }
/// ```
#[derive(Debug, Clone, Sequence)]
struct AttestationExtension<'a> {
    attestation_version: i32,
    attestation_security_level: SecurityLevel,
    keymaster_version: i32,
    keymaster_security_level: SecurityLevel,
    #[asn1(type = "OCTET STRING")]
    attestation_challenge: &'a [u8],
    #[asn1(type = "OCTET STRING")]
    unique_id: &'a [u8],
    sw_enforced: AuthorizationList,
    hw_enforced: AuthorizationList,
}

/// Security level enumeration
/// ```asn1
/// SecurityLevel ::= ENUMERATED {
///     Software                   (0),
///     TrustedEnvironment         (1),
///     StrongBox                  (2),
/// }
/// ```
#[repr(u32)]
#[derive(Debug, Clone, Copy, Enumerated)]
enum SecurityLevel {
    Software = 0,
    TrustedEnvironment = 1,
    Strongbox = 2,
}

/// Root of Trust ASN.1 structure
/// ```asn1
/// RootOfTrust ::= SEQUENCE {
///     verifiedBootKey            OCTET_STRING,
///     deviceLocked               BOOLEAN,
///     verifiedBootState          VerifiedBootState,
///     verifiedBootHash           OCTET_STRING,
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Sequence)]
pub struct RootOfTrust<'a> {
    #[asn1(type = "OCTET STRING")]
    pub verified_boot_key: &'a [u8],
    pub device_locked: bool,
    pub verified_boot_state: VerifiedBootState,
    #[asn1(type = "OCTET STRING")]
    pub verified_boot_hash: &'a [u8],
}

impl<'a> RootOfTrust<'a> {
    /// A root of trust asserting a locked device with verified boot.
    pub fn locked_verified(boot_key: &'a [u8], boot_hash: &'a [u8]) -> Self {
        Self {
            verified_boot_key: boot_key,
            device_locked: true,
            verified_boot_state: VerifiedBootState::Verified,
            verified_boot_hash: boot_hash,
        }
    }
}

/// Verified Boot State as ASN.1 ENUMERATED type.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enumerated)]
pub enum VerifiedBootState {
    Verified = 0,
    SelfSigned = 1,
    Unverified = 2,
    Failed = 3,
}

impl From<keymint::VerifiedBootState> for VerifiedBootState {
    fn from(state: keymint::VerifiedBootState) -> VerifiedBootState {
        match state {
            keymint::VerifiedBootState::Verified => VerifiedBootState::Verified,
            keymint::VerifiedBootState::SelfSigned => VerifiedBootState::SelfSigned,
            keymint::VerifiedBootState::Unverified => VerifiedBootState::Unverified,
            keymint::VerifiedBootState::Failed => VerifiedBootState::Failed,
        }
    }
}

/// Value held in one `[tag] EXPLICIT` entry of an `AuthorizationList`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthValue<'a> {
    Integer(i64),
    /// Encoded as a canonical `SET OF INTEGER`.
    IntegerSet(Vec<i64>),
    Null,
    OctetString(&'a [u8]),
    RootOfTrust(RootOfTrust<'a>),
}

impl<'a> AuthValue<'a> {
    /// DER encoding of `[tag] EXPLICIT value`.
    fn tagged_der(&self, tag: u32) -> Result<Vec<u8>, Error> {
        match self {
            AuthValue::Integer(v) => asn1::asn1_der_encode(&ExplicitTaggedValue { tag, val: *v }),
            AuthValue::IntegerSet(vals) => {
                let items: Vec<&dyn Encode> = vals.iter().map(|v| v as &dyn Encode).collect();
                let set = asn1::der_set_of(&items)?;
                asn1::asn1_der_encode(&ExplicitTaggedValue { tag, val: RawDer(&set) })
            }
            AuthValue::Null => asn1::asn1_der_encode(&ExplicitTaggedValue { tag, val: () }),
            AuthValue::OctetString(data) => asn1::asn1_der_encode(&ExplicitTaggedValue {
                tag,
                val: OctetStringRef::new(data)?,
            }),
            AuthValue::RootOfTrust(rot) => {
                asn1::asn1_der_encode(&ExplicitTaggedValue { tag, val: rot.clone() })
            }
        }
    }
}

/// Structure for creating ASN.1 DER-serialized `AuthorizationList`, holding entries in ascending
/// tag order.
#[derive(Debug, Clone, Default)]
struct AuthorizationList {
    entries: Vec<(u32, Vec<u8>)>,
}

impl AuthorizationList {
    /// Sort entries by tag number.  Where a tag appears more than once, the first entry is kept.
    fn new(mut entries: Vec<(Tag, AuthValue)>) -> Result<Self, Error> {
        entries.sort_by_key(|(tag, _)| raw_tag_value(*tag));
        let mut encoded: Vec<(u32, Vec<u8>)> = Vec::with_capacity(entries.len());
        for (tag, value) in entries {
            let tag = raw_tag_value(tag);
            if encoded.last().map(|(t, _)| *t) == Some(tag) {
                warn!("dropping duplicate entry for tag {}", tag);
                continue;
            }
            encoded.push((tag, value.tagged_der(tag)?));
        }
        Ok(Self { entries: encoded })
    }

    #[cfg(test)]
    fn tags(&self) -> Vec<u32> {
        self.entries.iter().map(|(t, _)| *t).collect()
    }
}

/// Placeholder implementation of [`der::Decode`] which always fails. Needed to satisfy the
/// [`der::Sequence`] trait bound; existing extensions are read with [`KeyDescription`].
impl<'a> der::Decode<'a> for AuthorizationList {
    fn decode<R: der::Reader<'a>>(_decoder: &mut R) -> der::Result<Self> {
        Err(der::Error::new(der::ErrorKind::Failed, der::Length::ZERO))
    }
}

impl<'a> Sequence<'a> for AuthorizationList {
    fn fields<F, T>(&self, f: F) -> der::Result<T>
    where
        F: FnOnce(&[&dyn Encode]) -> der::Result<T>,
    {
        let raw: Vec<RawDer> = self.entries.iter().map(|(_, der)| RawDer(der)).collect();
        let contents: Vec<&dyn Encode> = raw.iter().map(|v| v as &dyn Encode).collect();
        f(&contents)
    }
}

/// Number of elements in a `KeyDescription`.
const KEY_DESCRIPTION_LEN: usize = 8;
const CHALLENGE_INDEX: usize = 4;
const SW_ENFORCED_INDEX: usize = 6;
const HW_ENFORCED_INDEX: usize = 7;

fn is_authorization_list(tlv: &Tlv) -> bool {
    tlv.constructed && (tlv.is_universal(universal::SEQUENCE) || tlv.is_universal(universal::SET))
}

/// An existing attestation extension, decoded far enough to replace its root of trust.  All
/// other content is kept in its original encoding.
#[derive(Debug, Clone)]
pub struct KeyDescription<'a> {
    /// Elements 0 to 6.
    leading: Vec<Tlv<'a>>,
    /// `teeEnforced` entries other than the root of trust, in their original order.
    hw_enforced: Vec<Tlv<'a>>,
    root_of_trust: Option<Tlv<'a>>,
}

impl<'a> KeyDescription<'a> {
    /// Decode the DER contents of an attestation extension.
    pub fn decode(data: &'a [u8]) -> Result<Self, Error> {
        let outer = asn1::read_single(data)?;
        if !outer.constructed || !outer.is_universal(universal::SEQUENCE) {
            return Err(ks_err!(MalformedExtension, "KeyDescription is not a SEQUENCE"));
        }
        let mut elements = outer.children()?;
        if elements.len() != KEY_DESCRIPTION_LEN {
            return Err(ks_err!(
                MalformedExtension,
                "KeyDescription has {} elements, expected {}",
                elements.len(),
                KEY_DESCRIPTION_LEN
            ));
        }
        if !elements[CHALLENGE_INDEX].is_universal(universal::OCTET_STRING) {
            return Err(ks_err!(MalformedExtension, "attestationChallenge is not an OCTET STRING"));
        }
        if !is_authorization_list(&elements[SW_ENFORCED_INDEX]) {
            return Err(ks_err!(MalformedExtension, "softwareEnforced is not a list"));
        }
        let tee = elements.remove(HW_ENFORCED_INDEX);
        if !is_authorization_list(&tee) {
            return Err(ks_err!(MalformedExtension, "teeEnforced is not a list"));
        }

        let mut hw_enforced = Vec::new();
        let mut root_of_trust = None;
        for entry in tee.children()? {
            if entry.class != TagClass::ContextSpecific || !entry.constructed {
                return Err(ks_err!(
                    MalformedExtension,
                    "teeEnforced entry {:?} is not explicitly tagged",
                    entry.class
                ));
            }
            if entry.number == raw_tag_value(Tag::RootOfTrust) {
                if root_of_trust.is_some() {
                    warn!("dropping repeated root of trust");
                }
                root_of_trust.get_or_insert(entry);
                continue;
            }
            hw_enforced.push(entry);
        }
        Ok(Self { leading: elements, hw_enforced, root_of_trust })
    }

    pub fn attestation_challenge(&self) -> &'a [u8] {
        self.leading[CHALLENGE_INDEX].value
    }

    /// Tag numbers of the remaining `teeEnforced` entries.
    pub fn hw_enforced_tags(&self) -> Vec<u32> {
        self.hw_enforced.iter().map(|t| t.number).collect()
    }

    /// Tag numbers of the `softwareEnforced` entries.
    pub fn sw_enforced_tags(&self) -> Result<Vec<u32>, Error> {
        Ok(self.leading[SW_ENFORCED_INDEX].children()?.iter().map(|t| t.number).collect())
    }

    /// The original root of trust, if there is one.
    pub fn root_of_trust(&self) -> Result<Option<RootOfTrust<'a>>, Error> {
        match &self.root_of_trust {
            None => Ok(None),
            Some(tlv) => RootOfTrust::from_der(tlv.value).map(Some).map_err(|e| {
                ks_err!(MalformedExtension, "failed to decode root of trust: {:?}", e)
            }),
        }
    }

    /// Re-encode with a root of trust asserting a locked device with verified boot, appended at
    /// the end of `teeEnforced`.  The boot hash of the original root of trust is kept when it can
    /// be decoded; otherwise `fallback_hash` supplies one.
    pub fn rewrite<F>(&self, boot_key: &[u8], fallback_hash: F) -> Result<Vec<u8>, Error>
    where
        F: FnOnce() -> Vec<u8>,
    {
        let original = match self.root_of_trust() {
            Ok(Some(rot)) => Some(rot.verified_boot_hash),
            Ok(None) => {
                warn!("no root of trust in original, using fallback boot hash");
                None
            }
            Err(e) => {
                warn!("{}, using fallback boot hash", e);
                None
            }
        };
        let fallback;
        let boot_hash = match original {
            Some(hash) => hash,
            None => {
                fallback = fallback_hash();
                &fallback[..]
            }
        };
        let rot = ExplicitTaggedValue {
            tag: raw_tag_value(Tag::RootOfTrust),
            val: RootOfTrust::locked_verified(boot_key, boot_hash),
        };

        let raw: Vec<RawDer> = self.hw_enforced.iter().map(|t| RawDer(t.encoded)).collect();
        let mut entries: Vec<&dyn Encode> = raw.iter().map(|v| v as &dyn Encode).collect();
        entries.push(&rot);
        let hw_enforced = asn1::der_sequence(&entries)?;

        let mut raw: Vec<RawDer> = self.leading.iter().map(|t| RawDer(t.encoded)).collect();
        raw.push(RawDer(&hw_enforced));
        let elements: Vec<&dyn Encode> = raw.iter().map(|v| v as &dyn Encode).collect();
        asn1::der_sequence(&elements)
    }
}

/// Device and caller information that goes into a synthesized attestation extension.
#[derive(Debug, Clone)]
pub struct AttestationInfo<'a> {
    pub params: &'a KeyGenParams,
    /// DER-encoded `AttestationApplicationId`.
    pub app_id: &'a [u8],
    pub boot_key: &'a [u8],
    pub boot_hash: &'a [u8],
    pub os_version: u32,
    pub os_patchlevel: u32,
    pub vendor_patchlevel: u32,
    pub boot_patchlevel: u32,
    pub module_hash: &'a [u8],
    /// Telephony-derived attestation IDs.  Only used alongside a requested brand.
    pub telephony_ids: &'a [(Tag, Vec<u8>)],
    pub creation_time: DateTime,
}

/// `teeEnforced` entries for a synthesized extension.
fn hw_entries<'a>(info: &AttestationInfo<'a>) -> Vec<(Tag, AuthValue<'a>)> {
    let params = info.params;
    let mut entries = vec![
        (Tag::Purpose, AuthValue::IntegerSet(params.purposes.iter().map(|p| *p as i64).collect())),
        (Tag::Algorithm, AuthValue::Integer(params.algorithm as i64)),
        (Tag::KeySize, AuthValue::Integer(params.key_size.0 as i64)),
        (Tag::Digest, AuthValue::IntegerSet(params.digests.iter().map(|d| *d as i64).collect())),
        (Tag::NoAuthRequired, AuthValue::Null),
        (Tag::Origin, AuthValue::Integer(KeyOrigin::Generated as i64)),
        (
            Tag::RootOfTrust,
            AuthValue::RootOfTrust(RootOfTrust::locked_verified(info.boot_key, info.boot_hash)),
        ),
        (Tag::OsVersion, AuthValue::Integer(info.os_version as i64)),
        (Tag::OsPatchlevel, AuthValue::Integer(info.os_patchlevel as i64)),
        (Tag::AttestationApplicationId, AuthValue::OctetString(info.app_id)),
        (Tag::VendorPatchlevel, AuthValue::Integer(info.vendor_patchlevel as i64)),
        (Tag::BootPatchlevel, AuthValue::Integer(info.boot_patchlevel as i64)),
        (Tag::ModuleHash, AuthValue::OctetString(info.module_hash)),
    ];
    if params.algorithm == Algorithm::Ec {
        if let Some(curve) = params.ec_curve {
            entries.push((Tag::EcCurve, AuthValue::Integer(curve as i64)));
        }
    }

    let ids = &params.attestation_ids;
    if ids.brand.is_some() {
        let requested = [
            (Tag::AttestationIdBrand, &ids.brand),
            (Tag::AttestationIdDevice, &ids.device),
            (Tag::AttestationIdProduct, &ids.product),
            (Tag::AttestationIdSerial, &ids.serial),
            (Tag::AttestationIdImei, &ids.imei),
            (Tag::AttestationIdMeid, &ids.meid),
            (Tag::AttestationIdManufacturer, &ids.manufacturer),
            (Tag::AttestationIdModel, &ids.model),
            (Tag::AttestationIdSecondImei, &ids.second_imei),
        ];
        for (tag, value) in requested {
            if let Some(value) = value {
                entries.push((tag, AuthValue::OctetString(value)));
            }
        }
        // Requested values take precedence, as the first entry for a tag is the one kept.
        for (tag, value) in info.telephony_ids {
            entries.push((*tag, AuthValue::OctetString(value)));
        }
    }
    entries
}

/// Build a complete attestation extension for a freshly generated key.
pub fn synthesize(info: &AttestationInfo) -> Result<Vec<u8>, Error> {
    let sw_enforced = AuthorizationList::new(vec![
        (Tag::CreationDatetime, AuthValue::Integer(info.creation_time.ms_since_epoch)),
        (Tag::AttestationApplicationId, AuthValue::OctetString(info.app_id)),
    ])?;
    let hw_enforced = AuthorizationList::new(hw_entries(info))?;
    let ext = AttestationExtension {
        attestation_version: ATTESTATION_VERSION,
        attestation_security_level: SecurityLevel::TrustedEnvironment,
        keymaster_version: ATTESTATION_VERSION,
        keymaster_security_level: SecurityLevel::TrustedEnvironment,
        attestation_challenge: &info.params.attestation_challenge,
        unique_id: &[],
        sw_enforced,
        hw_enforced,
    };
    asn1::asn1_der_encode(&ext)
}


#[cfg(test)]
mod tests {
    use super::*;
    use ksf_common::tag::AttestationIds;
    use ksf_common::{expect_err, hex_decode, hex_encode};
    use ksf_wire::keymint::{Digest, EcCurve, KeyPurpose};
    use ksf_wire::{KeySizeInBits, RsaExponent};

    // [2] EXPLICIT INTEGER 3
    const ALGORITHM_EC: &str = "a203020103";
    // [702] EXPLICIT INTEGER 0
    const ORIGIN_GENERATED: &str = "bf853e03020100";

    fn encode_all(items: &[Vec<u8>]) -> Vec<u8> {
        let raw: Vec<RawDer> = items.iter().map(|v| RawDer(v)).collect();
        let refs: Vec<&dyn Encode> = raw.iter().map(|v| v as &dyn Encode).collect();
        asn1::der_sequence(&refs).unwrap()
    }

    /// `[704] EXPLICIT RootOfTrust` as reported by unlocked hardware.
    fn unlocked_root_of_trust(boot_hash: &[u8]) -> Vec<u8> {
        let rot = RootOfTrust {
            verified_boot_key: &[0x01, 0x02],
            device_locked: false,
            verified_boot_state: keymint::VerifiedBootState::Unverified.into(),
            verified_boot_hash: boot_hash,
        };
        asn1::asn1_der_encode(&ExplicitTaggedValue { tag: 704, val: rot }).unwrap()
    }

    /// Build an extension in the shape produced by hardware, with the given `teeEnforced` entries.
    fn hardware_extension(tee_entries: &[Vec<u8>]) -> Vec<u8> {
        encode_all(&[
            hex_decode("02016e").unwrap(),     // INTEGER 110
            hex_decode("0a0101").unwrap(),     // ENUMERATED 1
            hex_decode("02016e").unwrap(),     // INTEGER 110
            hex_decode("0a0101").unwrap(),     // ENUMERATED 1
            hex_decode("0403636868").unwrap(), // OCTET STRING "chh"
            hex_decode("0400").unwrap(),       // OCTET STRING ""
            hex_decode("3007bf853d030201ff").unwrap(), // SEQUENCE { [701] INTEGER -1 }
            encode_all(tee_entries),
        ])
    }

    fn ec_params() -> KeyGenParams {
        KeyGenParams {
            algorithm: Algorithm::Ec,
            key_size: KeySizeInBits(256),
            ec_curve: Some(EcCurve::P256),
            rsa_public_exponent: RsaExponent(65537),
            purposes: vec![KeyPurpose::Verify, KeyPurpose::Sign],
            digests: vec![Digest::Sha256],
            attestation_challenge: b"abc"[..].to_vec(),
            cert_serial: None,
            cert_subject: None,
            cert_not_before: None,
            cert_not_after: None,
            attestation_ids: AttestationIds::default(),
        }
    }

    fn info<'a>(params: &'a KeyGenParams, telephony: &'a [(Tag, Vec<u8>)]) -> AttestationInfo<'a> {
        AttestationInfo {
            params,
            app_id: b"app",
            boot_key: &[0xbb; 4],
            boot_hash: &[0xee; 4],
            os_version: 140000,
            os_patchlevel: 202401,
            vendor_patchlevel: 20240105,
            boot_patchlevel: 20240105,
            module_hash: &[0x11; 2],
            telephony_ids: telephony,
            creation_time: DateTime { ms_since_epoch: 1000 },
        }
    }

    fn entry<'a>(desc: &KeyDescription<'a>, tag: u32) -> Option<&'a [u8]> {
        desc.hw_enforced.iter().find(|t| t.number == tag).map(|t| t.encoded)
    }

    #[test]
    fn test_root_of_trust_encode() {
        let rot = RootOfTrust::locked_verified(&[0x01, 0x02], &[0x03, 0x04]);
        let got = asn1::asn1_der_encode(&ExplicitTaggedValue { tag: 704, val: rot }).unwrap();
        assert_eq!(
            hex_encode(&got),
            concat!(
                "bf854010", // [704] len 16
                "300e",     // SEQUENCE len 14
                "04020102", // OCTET STRING
                "0101ff",   // BOOLEAN TRUE
                "0a0100",   // ENUMERATED Verified
                "04020304", // OCTET STRING
            )
        );
    }

    #[test]
    fn test_auth_values() {
        let tests = vec![
            (AuthValue::Integer(3), 2, "a203020103"),
            (AuthValue::IntegerSet(vec![3, 2, 3]), 1, "a1083106020102020103"),
            (AuthValue::IntegerSet(vec![]), 5, "a5023100"),
            (AuthValue::Null, 503, "bf8377020500"),
        ];
        for (value, tag, want) in tests {
            assert_eq!(hex_encode(&value.tagged_der(tag).unwrap()), want);
        }
    }

    #[test]
    fn test_authorization_list_order() {
        let list = AuthorizationList::new(vec![
            (Tag::Origin, AuthValue::Integer(0)),
            (Tag::Algorithm, AuthValue::Integer(3)),
            (Tag::Origin, AuthValue::Integer(1)),
            (Tag::Purpose, AuthValue::IntegerSet(vec![2])),
        ])
        .unwrap();
        assert_eq!(list.tags(), vec![1, 2, 702]);
        assert_eq!(hex_encode(&list.entries[2].1), ORIGIN_GENERATED);
    }

    #[test]
    fn test_decode() {
        let hash = [0x42u8; 32];
        let ext = hardware_extension(&[
            hex_decode(ALGORITHM_EC).unwrap(),
            unlocked_root_of_trust(&hash),
            hex_decode(ORIGIN_GENERATED).unwrap(),
        ]);
        let desc = KeyDescription::decode(&ext).unwrap();
        assert_eq!(desc.attestation_challenge(), b"chh");
        assert_eq!(desc.hw_enforced_tags(), vec![2, 702]);
        assert_eq!(desc.sw_enforced_tags().unwrap(), vec![701]);
        let rot = desc.root_of_trust().unwrap().unwrap();
        assert_eq!(rot.verified_boot_key, &[0x01, 0x02]);
        assert!(!rot.device_locked);
        assert_eq!(rot.verified_boot_state, VerifiedBootState::Unverified);
        assert_eq!(rot.verified_boot_hash, &hash);
    }

    #[test]
    fn test_decode_fail() {
        // Seven elements only.
        let ext = encode_all(&[
            hex_decode("02016e").unwrap(),
            hex_decode("0a0101").unwrap(),
            hex_decode("02016e").unwrap(),
            hex_decode("0a0101").unwrap(),
            hex_decode("0400").unwrap(),
            hex_decode("0400").unwrap(),
            hex_decode("3000").unwrap(),
        ]);
        expect_err!(KeyDescription::decode(&ext), "7 elements, expected 8");

        expect_err!(KeyDescription::decode(&hex_decode("020101").unwrap()), "not a SEQUENCE");

        // teeEnforced entry that is not explicitly tagged.
        let ext = hardware_extension(&[hex_decode("020101").unwrap()]);
        expect_err!(KeyDescription::decode(&ext), "not explicitly tagged");

        let mut ext = hardware_extension(&[]);
        ext.push(0x00);
        expect_err!(KeyDescription::decode(&ext), "trailing data");
    }

    #[test]
    fn test_rewrite_keeps_hash() {
        let hash = [0x42u8; 32];
        let ext = hardware_extension(&[
            unlocked_root_of_trust(&hash),
            hex_decode(ALGORITHM_EC).unwrap(),
            hex_decode(ORIGIN_GENERATED).unwrap(),
        ]);
        let desc = KeyDescription::decode(&ext).unwrap();
        let rewritten = desc.rewrite(&[0xaa; 32], || panic!("fallback not expected")).unwrap();

        let got = KeyDescription::decode(&rewritten).unwrap();
        for (orig, new) in desc.leading.iter().zip(got.leading.iter()) {
            assert_eq!(orig.encoded, new.encoded);
        }
        // Root of trust moves to the end without re-sorting.
        let outer = asn1::read_single(&rewritten).unwrap().children().unwrap();
        let tee_tags: Vec<u32> = outer[7].children().unwrap().iter().map(|t| t.number).collect();
        assert_eq!(tee_tags, vec![2, 702, 704]);
        assert_eq!(entry(&got, 2), Some(&hex_decode(ALGORITHM_EC).unwrap()[..]));

        let rot = got.root_of_trust().unwrap().unwrap();
        assert_eq!(rot, RootOfTrust::locked_verified(&[0xaa; 32], &hash));
    }

    #[test]
    fn test_rewrite_fallback_hash() {
        let tests = vec![
            // No root of trust.
            hardware_extension(&[hex_decode(ALGORITHM_EC).unwrap()]),
            // Root of trust with a single element.
            hardware_extension(&[hex_decode("bf854005300304010f").unwrap()]),
            // Root of trust missing its boot hash.
            hardware_extension(&[hex_decode("bf85400c300a040201020101000a0102").unwrap()]),
        ];
        for ext in tests {
            let desc = KeyDescription::decode(&ext).unwrap();
            let rewritten = desc.rewrite(&[0xaa; 4], || vec![0x77; 4]).unwrap();
            let got = KeyDescription::decode(&rewritten).unwrap();
            let rot = got.root_of_trust().unwrap().unwrap();
            assert_eq!(rot, RootOfTrust::locked_verified(&[0xaa; 4], &[0x77; 4]));
        }
    }

    #[test]
    fn test_synthesize_ec() {
        let params = ec_params();
        let ext = synthesize(&info(&params, &[])).unwrap();
        let desc = KeyDescription::decode(&ext).unwrap();

        assert_eq!(hex_encode(desc.leading[0].encoded), "02020190");
        assert_eq!(hex_encode(desc.leading[1].encoded), "0a0101");
        assert_eq!(hex_encode(desc.leading[2].encoded), "02020190");
        assert_eq!(hex_encode(desc.leading[3].encoded), "0a0101");
        assert_eq!(desc.attestation_challenge(), b"abc");
        assert_eq!(hex_encode(desc.leading[5].encoded), "0400");
        assert_eq!(desc.sw_enforced_tags().unwrap(), vec![701, 709]);
        assert_eq!(
            desc.hw_enforced_tags(),
            vec![1, 2, 3, 5, 10, 503, 702, 705, 706, 709, 718, 719, 724]
        );
        assert_eq!(entry(&desc, 1), Some(&hex_decode("a1083106020102020103").unwrap()[..]));
        assert_eq!(entry(&desc, 10), Some(&hex_decode("aa03020101").unwrap()[..]));
        assert_eq!(entry(&desc, 709), Some(&hex_decode("bf8545050403617070").unwrap()[..]));
        let rot = desc.root_of_trust().unwrap().unwrap();
        assert_eq!(rot, RootOfTrust::locked_verified(&[0xbb; 4], &[0xee; 4]));
    }

    #[test]
    fn test_synthesize_rsa() {
        let params = KeyGenParams {
            algorithm: Algorithm::Rsa,
            key_size: KeySizeInBits(2048),
            ec_curve: None,
            ..ec_params()
        };
        let ext = synthesize(&info(&params, &[])).unwrap();
        let desc = KeyDescription::decode(&ext).unwrap();
        let tags = desc.hw_enforced_tags();
        assert!(!tags.contains(&10));
        assert_eq!(entry(&desc, 2), Some(&hex_decode("a203020101").unwrap()[..]));
        assert_eq!(entry(&desc, 3), Some(&hex_decode("a30402020800").unwrap()[..]));
    }

    #[test]
    fn test_synthesize_attestation_ids() {
        let mut params = ec_params();
        let telephony = vec![
            (Tag::AttestationIdImei, b"351234"[..].to_vec()),
            (Tag::AttestationIdSerial, b"from-telephony"[..].to_vec()),
        ];

        // No brand: no IDs at all, even with telephony values available.
        let ext = synthesize(&info(&params, &telephony)).unwrap();
        let desc = KeyDescription::decode(&ext).unwrap();
        assert!(desc.hw_enforced_tags().iter().all(|t| !(710..=717).contains(t)));

        params.attestation_ids = AttestationIds {
            brand: Some(b"google"[..].to_vec()),
            device: Some(b"husky"[..].to_vec()),
            product: Some(b"husky"[..].to_vec()),
            serial: Some(b"requested"[..].to_vec()),
            manufacturer: Some(b"Google"[..].to_vec()),
            model: Some(b"Pixel 8 Pro"[..].to_vec()),
            ..Default::default()
        };
        let ext = synthesize(&info(&params, &telephony)).unwrap();
        let desc = KeyDescription::decode(&ext).unwrap();
        let tags = desc.hw_enforced_tags();
        for tag in [710, 711, 712, 713, 714, 716, 717] {
            assert!(tags.contains(&tag), "missing {tag}");
        }
        assert!(!tags.contains(&715));
        let mut sorted = tags.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(tags, sorted);
        // The requested serial wins over the telephony value.
        let serial = entry(&desc, 713).unwrap();
        assert!(serial.ends_with(b"requested"));
    }
}
