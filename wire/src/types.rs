use alloc::string::String;

/// Key size in bits.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct KeySizeInBits(pub u32);

/// RSA exponent.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct RsaExponent(pub u64);

/// Marker type indicating failure to convert into an `enum` variant.
#[derive(Debug)]
pub struct ValueNotRecognized;

/// Identity of a key as seen by the keystore caller: an alias within a per-app namespace.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyDescriptor {
    pub nspace: i64,
    pub alias: Option<String>,
}

impl KeyDescriptor {
    /// Build a descriptor for an application-owned key with the given alias.
    pub fn app(alias: &str) -> Self {
        Self { nspace: -1, alias: Some(String::from(alias)) }
    }
}
