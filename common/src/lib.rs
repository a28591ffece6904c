//! Functionality for the attestation forgery engine that is common across its crates.

#![no_std]
extern crate alloc;

use alloc::{format, string::String, vec::Vec};
use core::fmt::Write;

/// Re-export of the crate holding plain data types.
pub use ksf_wire as wire;
use wire::keymint::ErrorCode;

pub mod asn1;
pub mod tag;

/// General error type.
#[derive(Debug)]
pub enum Error {
    /// Failure in the ASN.1 DER encoding stack.
    Der(der::ErrorKind),
    /// Failure with a categorized cause and an explanatory message.
    Forge(ErrorCode, String),
    /// Allocation failure at the indicated location.
    Alloc(&'static str),
}

impl Error {
    /// Category of the failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Der(_) => ErrorCode::EncodingError,
            Error::Forge(code, _msg) => *code,
            Error::Alloc(_) => ErrorCode::MemoryAllocationFailed,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Der(kind) => write!(f, "DER failure: {}", kind),
            Error::Forge(code, msg) => write!(f, "{:?}: {}", code, msg),
            Error::Alloc(msg) => write!(f, "allocation failure: {}", msg),
        }
    }
}

// The following macros for error generation allow the message portion to be automatically
// compiled out in future, avoiding potential information leakage and allocation.

/// Macro to build an [`Error::Forge`] instance for a specific [`ErrorCode`] value known at compile
/// time: `ks_err!(MalformedExtension, "some {} format", arg)`.
#[macro_export]
macro_rules! ks_err {
    { $error_code:ident, $($arg:tt)+ } => {
        $crate::Error::Forge($crate::wire::keymint::ErrorCode::$error_code,
                             alloc::format!("{}:{}: {}", file!(), line!(), format_args!($($arg)+))) };
}

/// Macro to build an [`Error::Forge`] instance:
/// `ks_verr!(rc, "some {} format", arg)`.
#[macro_export]
macro_rules! ks_verr {
    { $error_code:expr, $($arg:tt)+ } => {
        $crate::Error::Forge($error_code,
                             alloc::format!("{}:{}: {}", file!(), line!(), format_args!($($arg)+))) };
}

impl From<der::Error> for Error {
    fn from(e: der::Error) -> Self {
        Error::Der(e.kind())
    }
}

impl From<Error> for ErrorCode {
    fn from(e: Error) -> Self {
        e.code()
    }
}

/// Check for an expected error.
#[macro_export]
macro_rules! expect_err {
    ($result:expr, $err_msg:expr) => {
        assert!(
            $result.is_err(),
            "Expected error containing '{}', got success {:?}",
            $err_msg,
            $result
        );
        let err = $result.err();
        assert!(
            alloc::format!("{:?}", err).contains($err_msg),
            "Unexpected error {:?}, doesn't contain '{}'",
            err,
            $err_msg
        );
    };
}

/// Convert data to a hex string.
pub fn hex_encode(data: &[u8]) -> String {
    let mut result = String::new();
    for byte in data {
        let _ = &write!(result, "{:02x}", byte);
    }
    result
}

/// Convert a hex string to data.
pub fn hex_decode(hex: &str) -> Result<Vec<u8>, String> {
    if hex.len() % 2 != 0 {
        return Err(format!("odd number of hex digits ({})", hex.len()));
    }
    let mut result = Vec::new();
    let mut pending = 0u8;
    for (idx, c) in hex.chars().enumerate() {
        let nibble = match c.to_digit(16) {
            Some(v) => v as u8,
            None => return Err(format!("char {} '{}' not a hex digit", idx, c)),
        };
        if idx % 2 == 0 {
            pending = nibble << 4;
        } else {
            result.push(pending | nibble);
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let data = [0x00, 0x01, 0xab, 0xff];
        assert_eq!(hex_encode(&data), "0001abff");
        assert_eq!(hex_decode("0001ABff").unwrap(), data);
    }

    #[test]
    fn test_hex_decode_fail() {
        let result = hex_decode("0g");
        expect_err!(result, "not a hex digit");
        let result = hex_decode("abc");
        expect_err!(result, "odd number");
    }

    #[test]
    fn test_error_code() {
        let err = ks_err!(SigningError, "bad key {}", 1);
        assert_eq!(err.code(), ErrorCode::SigningError);
        let err: Error = der::Error::from(der::ErrorKind::Failed).into();
        assert_eq!(ErrorCode::from(err), ErrorCode::EncodingError);
    }
}
