//! Plain data types shared by the attestation forgery crates.

#![no_std]
extern crate alloc;

pub mod keymint;
pub mod types;
pub use types::*;

/// Macro that emits an implementation of `TryFrom<i32>` for an enum type that has
/// `[derive(N)]` attached to it.
#[macro_export]
macro_rules! try_from_n {
    { $ename:ident } => {
        impl core::convert::TryFrom<i32> for $ename {
            type Error = $crate::ValueNotRecognized;
            fn try_from(value: i32) -> Result<Self, Self::Error> {
                Self::n(value).ok_or($crate::ValueNotRecognized)
            }
        }
    };
}
