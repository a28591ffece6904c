//! Crypto primitives for the attestation forgery engine, based on BoringSSL/OpenSSL.

#![no_std]

extern crate alloc;

use ksf_wire::keymint::{Digest, ErrorCode};
use log::error;
use openssl::hash::MessageDigest;

pub mod ec;
pub mod keys;
pub mod pem;
pub mod rng;
pub mod rsa;

mod err;
use err::*;

pub use keys::{KeyPair, SignatureAlgorithm};

/// Map an OpenSSL `ErrorStack` into an [`ErrorCode`] value.
pub(crate) fn map_openssl_errstack(errs: &openssl::error::ErrorStack) -> ErrorCode {
    let errors = errs.errors();
    if errors.is_empty() {
        error!("OpenSSL error requested but none available!");
        return ErrorCode::UnknownError;
    }
    let err = &errors[0]; // safe: length checked above
    map_openssl_err(err)
}

/// Macro to auto-generate error mapping around invocations of `openssl` methods.
/// An invocation like:
///
/// ```ignore
/// let x = ossl!(y.func(a, b))?;
/// ```
///
/// will map to:
///
/// ```ignore
/// let x = y.func(a, b).map_err(openssl_err!("failed to perform: y.func(a, b)"))?;
/// ```
#[macro_export]
macro_rules! ossl {
    { $e:expr } => {
        $e.map_err(openssl_err!(concat!("failed to perform: ", stringify!($e))))
    }
}

/// Macro to emit a closure that builds an [`Error::Forge`] instance, based on an
/// openssl `ErrorStack` together with a format-like message.
#[macro_export]
macro_rules! openssl_err {
    { $($arg:tt)+ } => {
        |e| ksf_common::Error::Forge(
            $crate::map_openssl_errstack(&e),
            alloc::format!("{}:{}: {}: {:?}", file!(), line!(), format_args!($($arg)+), e)
        )
    };
}

/// Macro to emit a closure that builds an [`Error::Forge`] instance with a fixed [`ErrorCode`],
/// based on an openssl `ErrorStack` together with a format-like message.
#[macro_export]
macro_rules! openssl_err_as {
    { $code:ident, $($arg:tt)+ } => {
        |e| ksf_common::Error::Forge(
            ksf_wire::keymint::ErrorCode::$code,
            alloc::format!("{}:{}: {}: {:?}", file!(), line!(), format_args!($($arg)+), e)
        )
    };
}

/// Translate a [`Digest`] into an OpenSSL [`MessageDigest`].
fn digest_into_openssl(digest: Digest) -> Option<MessageDigest> {
    match digest {
        Digest::None => None,
        Digest::Md5 => Some(MessageDigest::md5()),
        Digest::Sha1 => Some(MessageDigest::sha1()),
        Digest::Sha224 => Some(MessageDigest::sha224()),
        Digest::Sha256 => Some(MessageDigest::sha256()),
        Digest::Sha384 => Some(MessageDigest::sha384()),
        Digest::Sha512 => Some(MessageDigest::sha512()),
    }
}

/// SHA-256 of the given data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    openssl::sha::sha256(data)
}

#[cfg(test)]
mod tests;
