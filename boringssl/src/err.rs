//! Error mapping functionality.

use ksf_wire::keymint::ErrorCode;
use log::error;

// Library codes from `openssl/err.h`.
const ERR_LIB_RSA: i32 = 4;
const ERR_LIB_EVP: i32 = 6;
const ERR_LIB_PEM: i32 = 9;
const ERR_LIB_X509: i32 = 11;
const ERR_LIB_ASN1: i32 = 13;
const ERR_LIB_EC: i32 = 16;

/// Map an OpenSSL `Error` into an `ErrorCode` value.
pub(crate) fn map_openssl_err(err: &openssl::error::Error) -> ErrorCode {
    match err.library_code() {
        ERR_LIB_PEM | ERR_LIB_ASN1 | ERR_LIB_X509 => ErrorCode::EncodingError,
        ERR_LIB_EVP | ERR_LIB_RSA | ERR_LIB_EC => ErrorCode::SigningError,
        _ => {
            error!("unknown OpenSSL error code {}", err.code());
            ErrorCode::UnknownError
        }
    }
}
