//! DER helpers that go beyond what the `der` crate offers: tag numbers above 30, verbatim
//! re-emission of already-encoded elements, and canonical `SET OF` ordering.

use crate::{ks_err, Error};
use alloc::vec::Vec;
use der::{Encode, Header, Length, Writer};

/// Class bits of an identifier octet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagClass {
    Universal,
    Application,
    ContextSpecific,
    Private,
}

/// A single decoded DER element, borrowing from the input it was read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tlv<'a> {
    pub class: TagClass,
    pub constructed: bool,
    pub number: u32,
    /// Contents octets.
    pub value: &'a [u8],
    /// Complete encoding: identifier, length and contents octets.
    pub encoded: &'a [u8],
}

impl<'a> Tlv<'a> {
    /// Whether this is a universal tag with the given number.
    pub fn is_universal(&self, number: u32) -> bool {
        self.class == TagClass::Universal && self.number == number
    }

    /// Parse the contents of a constructed element as a list of elements.
    pub fn children(&self) -> Result<Vec<Tlv<'a>>, Error> {
        if !self.constructed {
            return Err(ks_err!(
                MalformedExtension,
                "primitive tag {} has no children",
                self.number
            ));
        }
        read_all(self.value)
    }
}

/// Universal tag numbers used when inspecting decoded elements.
pub mod universal {
    pub const BOOLEAN: u32 = 1;
    pub const INTEGER: u32 = 2;
    pub const OCTET_STRING: u32 = 4;
    pub const NULL: u32 = 5;
    pub const ENUMERATED: u32 = 10;
    pub const SEQUENCE: u32 = 16;
    pub const SET: u32 = 17;
}

/// Read one element from the front of `data`, returning it along with the remaining input.
pub fn read_tlv(data: &[u8]) -> Result<(Tlv, &[u8]), Error> {
    let mut pos = 0;
    let first = *data.get(pos).ok_or_else(|| ks_err!(MalformedExtension, "empty input"))?;
    pos += 1;
    let class = match first >> 6 {
        0 => TagClass::Universal,
        1 => TagClass::Application,
        2 => TagClass::ContextSpecific,
        _ => TagClass::Private,
    };
    let constructed = first & 0x20 != 0;
    let mut number = (first & 0x1f) as u32;
    if number == 0x1f {
        // High tag number form: base-128 digits, most significant first.
        number = 0;
        loop {
            let b = *data
                .get(pos)
                .ok_or_else(|| ks_err!(MalformedExtension, "truncated tag number"))?;
            pos += 1;
            if number == 0 && b == 0x80 {
                return Err(ks_err!(MalformedExtension, "non-minimal tag number"));
            }
            if number > (u32::MAX >> 7) {
                return Err(ks_err!(MalformedExtension, "tag number overflow"));
            }
            number = (number << 7) | (b & 0x7f) as u32;
            if b & 0x80 == 0 {
                break;
            }
        }
    }

    let len_byte =
        *data.get(pos).ok_or_else(|| ks_err!(MalformedExtension, "missing length"))?;
    pos += 1;
    let len = match len_byte {
        0..=0x7f => len_byte as usize,
        0x80 => return Err(ks_err!(MalformedExtension, "indefinite length not allowed in DER")),
        _ => {
            let count = (len_byte & 0x7f) as usize;
            if count > 4 {
                return Err(ks_err!(MalformedExtension, "length of {} octets too large", count));
            }
            let len_bytes = data
                .get(pos..pos + count)
                .ok_or_else(|| ks_err!(MalformedExtension, "truncated length"))?;
            pos += count;
            len_bytes.iter().fold(0usize, |acc, b| (acc << 8) | *b as usize)
        }
    };
    let end = pos
        .checked_add(len)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| ks_err!(MalformedExtension, "content of {} bytes truncated", len))?;

    let tlv = Tlv { class, constructed, number, value: &data[pos..end], encoded: &data[..end] };
    Ok((tlv, &data[end..]))
}

/// Read consecutive elements until `data` is exhausted.
pub fn read_all(mut data: &[u8]) -> Result<Vec<Tlv>, Error> {
    let mut result = Vec::new();
    while !data.is_empty() {
        let (tlv, rest) = read_tlv(data)?;
        result.push(tlv);
        data = rest;
    }
    Ok(result)
}

/// Read exactly one element that must span all of `data`.
pub fn read_single(data: &[u8]) -> Result<Tlv, Error> {
    let (tlv, rest) = read_tlv(data)?;
    if !rest.is_empty() {
        return Err(ks_err!(MalformedExtension, "{} bytes of trailing data", rest.len()));
    }
    Ok(tlv)
}

/// An element held in its existing DER encoding, emitted byte for byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawDer<'a>(pub &'a [u8]);

impl<'a> Encode for RawDer<'a> {
    fn encoded_len(&self) -> der::Result<Length> {
        Length::try_from(self.0.len())
    }

    fn encode(&self, encoder: &mut dyn Writer) -> der::Result<()> {
        encoder.write(self.0)
    }
}

/// An `[N] EXPLICIT` context-specific wrapper around an inner value.
pub struct ExplicitTaggedValue<T: Encode> {
    pub tag: u32,
    pub val: T,
}

impl<T: Encode> ExplicitTaggedValue<T> {
    fn explicit_tag_len(&self) -> der::Result<der::Length> {
        match self.tag {
            0..=0x1e => Ok(der::Length::ONE),
            0x1f..=0x7f => Ok(der::Length::new(2)),
            0x80..=0x3fff => Ok(der::Length::new(3)),
            0x4000..=0x1fffff => Ok(der::Length::new(4)),
            _ => Err(der::ErrorKind::Overflow.into()),
        }
    }

    fn explicit_tag_encode(&self, encoder: &mut dyn der::Writer) -> der::Result<()> {
        match self.tag {
            0..=0x1e => {
                // b101vvvvv is context-specific+constructed
                encoder.write_byte(0b10100000u8 | (self.tag as u8))
            }
            0x1f..=0x7f => {
                // b101 11111 indicates a context-specific+constructed long-form tag number
                encoder.write_byte(0b10111111)?;
                encoder.write_byte(self.tag as u8)
            }
            0x80..=0x3fff => {
                encoder.write_byte(0b10111111)?;
                encoder.write_byte((self.tag >> 7) as u8 | 0x80u8)?;
                encoder.write_byte((self.tag & 0x007f) as u8)
            }
            0x4000..=0x1fffff => {
                encoder.write_byte(0b10111111)?;
                encoder.write_byte((self.tag >> 14) as u8 | 0x80u8)?;
                encoder.write_byte(((self.tag >> 7) & 0x7f) as u8 | 0x80u8)?;
                encoder.write_byte((self.tag & 0x007f) as u8)
            }
            _ => Err(der::ErrorKind::Overflow.into()),
        }
    }
}

/// The der library explicitly does not support `TagNumber` values bigger than 30,
/// which are required here.  Work around this by manually providing the encoding functionality.
impl<T: Encode> Encode for ExplicitTaggedValue<T> {
    fn encoded_len(&self) -> der::Result<der::Length> {
        let inner_len = self.val.encoded_len()?;
        self.explicit_tag_len() + inner_len.encoded_len()? + inner_len
    }

    fn encode(&self, encoder: &mut dyn der::Writer) -> der::Result<()> {
        let inner_len = self.val.encoded_len()?;
        self.explicit_tag_encode(encoder)?;
        inner_len.encode(encoder)?;
        self.val.encode(encoder)
    }
}

pub fn asn1_der_encode<T: Encode + ?Sized>(obj: &T) -> Result<Vec<u8>, Error> {
    let mut encoded_data = Vec::<u8>::new();
    obj.encode_to_vec(&mut encoded_data)?;
    Ok(encoded_data)
}

/// Encode the given items as the contents of a constructed element with the given universal tag.
fn constructed(tag: der::Tag, items: &[Vec<u8>]) -> Result<Vec<u8>, Error> {
    let inner_len: usize = items.iter().map(|v| v.len()).sum();
    let mut result = asn1_der_encode(&Header::new(tag, inner_len)?)?;
    result.try_reserve(inner_len).map_err(|_e| Error::Alloc("DER constructed element"))?;
    for item in items {
        result.extend_from_slice(item);
    }
    Ok(result)
}

/// Encode a `SEQUENCE` holding the given items in order.
pub fn der_sequence(items: &[&dyn Encode]) -> Result<Vec<u8>, Error> {
    let encoded = items.iter().map(|v| asn1_der_encode(*v)).collect::<Result<Vec<_>, _>>()?;
    constructed(der::Tag::Sequence, &encoded)
}

/// Encode a `SET OF` holding the given items in canonical DER order (ascending by encoding).
/// Identical encodings are collapsed to one element.
pub fn der_set_of(items: &[&dyn Encode]) -> Result<Vec<u8>, Error> {
    let mut encoded = items.iter().map(|v| asn1_der_encode(*v)).collect::<Result<Vec<_>, _>>()?;
    encoded.sort();
    encoded.dedup();
    constructed(der::Tag::Set, &encoded)
}
