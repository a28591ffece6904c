//! Local equivalents of the KeyMint HAL types that appear in attestation records.
//!
//! - Enums are encoded as exhaustive Rust enums backed by `i32`, using Rust naming
//!   conventions (CamelCase values).
//! - Structs have all fields `pub`, using Rust naming conventions (snake_case fields).
//!
//! Only the subset of KeyMint that feeds an attestation extension is carried here.

use crate::{try_from_n, KeySizeInBits, RsaExponent};
use alloc::vec::Vec;
use enumn::N;

/// Default certificate serial number of 1.
pub const DEFAULT_CERT_SERIAL: &[u8] = &[0x01];

/// ASN.1 DER encoding of the default certificate subject of 'CN=Android KeyStore Key'.
pub const DEFAULT_CERT_SUBJECT: &[u8] = &[
    0x30, 0x1f, // SEQUENCE len 31
    0x31, 0x1d, // SET len 29
    0x30, 0x1b, // SEQUENCE len 27
    0x06, 0x03, // OBJECT IDENTIFIER len 3
    0x55, 0x04, 0x03, // 2.5.4.3 (commonName)
    0x0c, 0x14, // UTF8String len 20
    0x41, 0x6e, 0x64, 0x72, 0x6f, 0x69, 0x64, 0x20, 0x4b, 0x65, 0x79, 0x53, 0x74, 0x6f, 0x72, 0x65,
    0x20, 0x4b, 0x65, 0x79, // "Android KeyStore Key"
];

/// Version number written into synthesized attestation records.
pub const ATTESTATION_VERSION: i32 = 400;

/// Possible verified boot state values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, N)]
#[repr(i32)]
pub enum VerifiedBootState {
    Verified = 0,
    SelfSigned = 1,
    Unverified = 2,
    Failed = 3,
}
try_from_n!(VerifiedBootState);

/// Representation of a date/time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct DateTime {
    pub ms_since_epoch: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, N)]
#[repr(i32)]
pub enum Algorithm {
    Rsa = 1,
    Ec = 3,
    Aes = 32,
    TripleDes = 33,
    Hmac = 128,
}
try_from_n!(Algorithm);

impl core::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Algorithm::Rsa => "RSA",
            Algorithm::Ec => "EC",
            Algorithm::Aes => "AES",
            Algorithm::TripleDes => "DESede",
            Algorithm::Hmac => "HMAC",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, N)]
#[repr(i32)]
pub enum Digest {
    None = 0,
    Md5 = 1,
    Sha1 = 2,
    Sha224 = 3,
    Sha256 = 4,
    Sha384 = 5,
    Sha512 = 6,
}
try_from_n!(Digest);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, N)]
#[repr(i32)]
pub enum EcCurve {
    P224 = 0,
    P256 = 1,
    P384 = 2,
    P521 = 3,
    Curve25519 = 4,
}
try_from_n!(EcCurve);

impl EcCurve {
    /// Curve implied by a key size, for callers that only give `KeySize`.
    pub fn from_key_size(bits: u32) -> Option<Self> {
        match bits {
            224 => Some(EcCurve::P224),
            256 => Some(EcCurve::P256),
            384 => Some(EcCurve::P384),
            521 => Some(EcCurve::P521),
            _ => None,
        }
    }

    /// Key size in bits for the curve.
    pub fn key_size(&self) -> KeySizeInBits {
        KeySizeInBits(match self {
            EcCurve::P224 => 224,
            EcCurve::P256 => 256,
            EcCurve::P384 => 384,
            EcCurve::P521 => 521,
            EcCurve::Curve25519 => 256,
        })
    }
}

/// Failure categories surfaced by the forgery engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, N)]
#[repr(i32)]
pub enum ErrorCode {
    Ok = 0,
    ConfigParseError = -1,
    UnsupportedAlgorithm = -2,
    MalformedExtension = -3,
    SigningError = -4,
    EncodingError = -5,
    InvalidArgument = -6,
    MemoryAllocationFailed = -7,
    UnknownError = -1000,
}
try_from_n!(ErrorCode);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, N)]
#[repr(i32)]
pub enum KeyOrigin {
    Generated = 0,
    Derived = 1,
    Imported = 2,
    Reserved = 3,
    SecurelyImported = 4,
}
try_from_n!(KeyOrigin);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, N)]
#[repr(i32)]
pub enum KeyPurpose {
    Encrypt = 0,
    Decrypt = 1,
    Sign = 2,
    Verify = 3,
    WrapKey = 5,
    AgreeKey = 6,
    AttestKey = 7,
}
try_from_n!(KeyPurpose);

/// Key parameters that can influence a synthesized attestation record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyParam {
    Purpose(KeyPurpose),
    Algorithm(Algorithm),
    KeySize(KeySizeInBits),
    Digest(Digest),
    EcCurve(EcCurve),
    RsaPublicExponent(RsaExponent),
    NoAuthRequired,
    AttestationChallenge(Vec<u8>),
    AttestationIdBrand(Vec<u8>),
    AttestationIdDevice(Vec<u8>),
    AttestationIdProduct(Vec<u8>),
    AttestationIdSerial(Vec<u8>),
    AttestationIdImei(Vec<u8>),
    AttestationIdMeid(Vec<u8>),
    AttestationIdManufacturer(Vec<u8>),
    AttestationIdModel(Vec<u8>),
    AttestationIdSecondImei(Vec<u8>),
    CertificateSerial(Vec<u8>),
    CertificateSubject(Vec<u8>),
    CertificateNotBefore(DateTime),
    CertificateNotAfter(DateTime),
}

/// Determine the raw tag value with tag type information stripped out.
pub fn raw_tag_value(tag: Tag) -> u32 {
    (tag as u32) & 0x0fffffffu32
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, N)]
#[repr(i32)]
pub enum Tag {
    Invalid = 0,
    Purpose = 536870913,
    Algorithm = 268435458,
    KeySize = 805306371,
    Digest = 536870917,
    EcCurve = 268435466,
    RsaPublicExponent = 1342177480,
    NoAuthRequired = 1879048695,
    CreationDatetime = 1610613437,
    Origin = 268436158,
    RootOfTrust = -1879047488,
    OsVersion = 805307073,
    OsPatchlevel = 805307074,
    AttestationChallenge = -1879047484,
    AttestationApplicationId = -1879047483,
    AttestationIdBrand = -1879047482,
    AttestationIdDevice = -1879047481,
    AttestationIdProduct = -1879047480,
    AttestationIdSerial = -1879047479,
    AttestationIdImei = -1879047478,
    AttestationIdMeid = -1879047477,
    AttestationIdManufacturer = -1879047476,
    AttestationIdModel = -1879047475,
    VendorPatchlevel = 805307086,
    BootPatchlevel = 805307087,
    AttestationIdSecondImei = -1879047469,
    ModuleHash = -1879047468,
    CertificateSerial = -2147482642,
    CertificateSubject = -1879047185,
    CertificateNotBefore = 1610613744,
    CertificateNotAfter = 1610613745,
}
try_from_n!(Tag);
