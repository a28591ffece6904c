//! Populate device information from Android-style system properties.

use crate::device::{BootState, PlatformInfo};
use ksf_boringssl::rng;
use ksf_common::{hex_decode, ks_err, Error};
use log::warn;
use regex::Regex;
use std::collections::HashMap;

// The OS version property is of form "12" or "12.1" or "12.1.3".
const OS_VERSION_PROPERTY: &str = "ro.build.version.release";
const OS_VERSION_REGEX: &str = r"^(?P<major>\d{1,2})(\.(?P<minor>\d{1,2}))?(\.(?P<sub>\d{1,2}))?$";

// The patchlevel properties are of form "YYYY-MM-DD".
pub const OS_PATCHLEVEL_PROPERTY: &str = "ro.build.version.security_patch";
const VENDOR_PATCHLEVEL_PROPERTY: &str = "ro.vendor.build.security_patch";
const BOOT_PATCHLEVEL_PROPERTY: &str = "ro.bootimage.build.security_patch";
const PATCHLEVEL_REGEX: &str = r"^(?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2})$";

/// Hex-encoded digest of the vbmeta image.
pub const VBMETA_DIGEST_PROPERTY: &str = "ro.boot.vbmeta.digest";

/// Length of generated boot key and hash values.
const BOOT_DIGEST_LEN: usize = 32;

/// Source of system property values.
pub trait PropertySource: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
}

impl PropertySource for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }
}

fn get_property(props: &dyn PropertySource, name: &str) -> Result<String, Error> {
    props.get(name).ok_or_else(|| ks_err!(InvalidArgument, "no value for property {}", name))
}

/// Retrieve a numeric value from a possible match.
fn extract_u32(value: Option<regex::Match>) -> Result<u32, Error> {
    match value {
        Some(m) => m
            .as_str()
            .parse::<u32>()
            .map_err(|e| ks_err!(InvalidArgument, "failed to parse integer: {:?}", e)),
        None => Err(ks_err!(InvalidArgument, "failed to find match")),
    }
}

fn patchlevel_parts(prop_value: &str) -> Result<(u32, u32, u32), Error> {
    let patchlevel_regex = Regex::new(PATCHLEVEL_REGEX)
        .map_err(|e| ks_err!(UnknownError, "failed to compile patchlevel regexp: {:?}", e))?;

    let captures = patchlevel_regex
        .captures(prop_value)
        .ok_or_else(|| ks_err!(InvalidArgument, "failed to match patchlevel regex"))?;
    let year = extract_u32(captures.name("year"))?;
    let month = extract_u32(captures.name("month"))?;
    if !(1..=12).contains(&month) {
        return Err(ks_err!(InvalidArgument, "month out of range: {}", month));
    }
    let day = extract_u32(captures.name("day"))?;
    Ok((year, month, day))
}

/// Extract a patchlevel in form YYYYMM from a "YYYY-MM-DD" property value.
pub fn extract_truncated_patchlevel(prop_value: &str) -> Result<u32, Error> {
    let (year, month, _day) = patchlevel_parts(prop_value)?;
    Ok(year * 100 + month)
}

/// Extract a patchlevel in form YYYYMMDD from a "YYYY-MM-DD" property value.
pub fn extract_patchlevel(prop_value: &str) -> Result<u32, Error> {
    let (year, month, day) = patchlevel_parts(prop_value)?;
    if !(1..=31).contains(&day) {
        return Err(ks_err!(InvalidArgument, "day out of range: {}", day));
    }
    Ok(year * 10000 + month * 100 + day)
}

/// Extract an OS version in form MMmmss from a "12.1.3" property value.
pub fn extract_os_version(prop_value: &str) -> Result<u32, Error> {
    let os_version_regex = Regex::new(OS_VERSION_REGEX)
        .map_err(|e| ks_err!(UnknownError, "failed to compile version regexp: {:?}", e))?;
    let captures = os_version_regex
        .captures(prop_value)
        .ok_or_else(|| ks_err!(InvalidArgument, "failed to match OS version regex"))?;
    let major = extract_u32(captures.name("major"))?;
    let minor = extract_u32(captures.name("minor")).unwrap_or(0u32);
    let sub = extract_u32(captures.name("sub")).unwrap_or(0u32);
    Ok((major * 10000) + (minor * 100) + sub)
}

/// Platform information read once from system properties.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyPlatformInfo {
    pub os_version: u32,
    pub os_patchlevel: u32,
    pub vendor_patchlevel: u32,
    pub boot_patchlevel: u32,
    pub module_hash: Vec<u8>,
}

impl PropertyPlatformInfo {
    /// Read platform information.  The vendor patch level falls back to the full OS patch level,
    /// and the boot patch level falls back to the vendor patch level.
    pub fn from_properties(
        props: &dyn PropertySource,
        module_hash: Vec<u8>,
    ) -> Result<Self, Error> {
        let os_version = extract_os_version(&get_property(props, OS_VERSION_PROPERTY)?)?;
        let os_patch_prop = get_property(props, OS_PATCHLEVEL_PROPERTY)?;
        let os_patchlevel = extract_truncated_patchlevel(&os_patch_prop)?;
        let vendor_patchlevel = match props.get(VENDOR_PATCHLEVEL_PROPERTY) {
            Some(v) => extract_patchlevel(&v)?,
            None => extract_patchlevel(&os_patch_prop)?,
        };
        let boot_patchlevel = match props.get(BOOT_PATCHLEVEL_PROPERTY) {
            Some(v) => extract_patchlevel(&v)?,
            None => vendor_patchlevel,
        };
        Ok(Self { os_version, os_patchlevel, vendor_patchlevel, boot_patchlevel, module_hash })
    }
}

impl PlatformInfo for PropertyPlatformInfo {
    fn os_version(&self) -> u32 {
        self.os_version
    }
    fn os_patchlevel(&self) -> u32 {
        self.os_patchlevel
    }
    fn vendor_patchlevel(&self) -> u32 {
        self.vendor_patchlevel
    }
    fn boot_patchlevel(&self) -> u32 {
        self.boot_patchlevel
    }
    fn module_hash(&self) -> Vec<u8> {
        self.module_hash.clone()
    }
}

/// Boot state fixed at construction time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixedBootState {
    pub boot_key: Vec<u8>,
    pub boot_hash: Vec<u8>,
}

impl FixedBootState {
    /// Take the boot hash from the vbmeta digest property when it holds a 32-byte hex value.
    /// Anything missing is replaced by random bytes, generated once here.
    pub fn from_properties(props: &dyn PropertySource) -> Result<Self, Error> {
        let boot_hash = match props.get(VBMETA_DIGEST_PROPERTY).map(|v| hex_decode(v.trim())) {
            Some(Ok(digest)) if digest.len() == BOOT_DIGEST_LEN => digest,
            Some(_) => {
                warn!("ignoring malformed {}", VBMETA_DIGEST_PROPERTY);
                rng::random_bytes(BOOT_DIGEST_LEN)?
            }
            None => rng::random_bytes(BOOT_DIGEST_LEN)?,
        };
        Ok(Self { boot_key: rng::random_bytes(BOOT_DIGEST_LEN)?, boot_hash })
    }
}

impl BootState for FixedBootState {
    fn verified_boot_key(&self) -> Vec<u8> {
        self.boot_key.clone()
    }
    fn verified_boot_hash(&self) -> Vec<u8> {
        self.boot_hash.clone()
    }
}
