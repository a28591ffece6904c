//! Construction of `AttestationApplicationId` values.

use crate::device::PackageManager;
use der::asn1::OctetStringRef;
use der::Encode;
use ksf_boringssl::sha256;
use ksf_common::asn1::{der_sequence, der_set_of, RawDer};
use ksf_common::Error;

/// Range of uids allotted to each Android user.
pub const AID_USER_OFFSET: u32 = 100000;

/// Build the DER-encoded `AttestationApplicationId` for the packages running as `uid`.
///
/// ```asn1
/// AttestationApplicationId ::= SEQUENCE {
///     package_infos              SET OF AttestationPackageInfo,
///     signature_digests          SET OF OCTET_STRING,
/// }
///
/// AttestationPackageInfo ::= SEQUENCE {
///     package_name               OCTET_STRING,
///     version                    INTEGER,
/// }
/// ```
pub fn build(packages: &dyn PackageManager, uid: u32) -> Result<Vec<u8>, Error> {
    let user_id = uid / AID_USER_OFFSET;
    let names = packages.packages_for_uid(uid)?;

    let mut package_infos = Vec::with_capacity(names.len());
    let mut digests = Vec::new();
    for name in &names {
        let info = packages.package_info(name, user_id)?;
        package_infos.push(der_sequence(&[
            &OctetStringRef::new(name.as_bytes())?,
            &info.version_code,
        ])?);
        digests.extend(info.signatures.iter().map(|cert| sha256(cert)));
    }

    let infos: Vec<RawDer> = package_infos.iter().map(|v| RawDer(v)).collect();
    let infos: Vec<&dyn Encode> = infos.iter().map(|v| v as &dyn Encode).collect();
    let digests =
        digests.iter().map(|d| OctetStringRef::new(d)).collect::<Result<Vec<_>, _>>()?;
    let digests: Vec<&dyn Encode> = digests.iter().map(|v| v as &dyn Encode).collect();
    der_sequence(&[&RawDer(&der_set_of(&infos)?), &RawDer(&der_set_of(&digests)?)])
}
