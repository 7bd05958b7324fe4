//! Canonical encodings for signing input and compact payloads.
//!
//! Two encodings live here:
//!
//! - **Canonical JSON** ([`CanonicalBytes`]) is the signing input. Object keys
//!   are sorted bytewise, there is no insignificant whitespace, strings use
//!   serde_json escaping and floats are rejected. Any implementation that
//!   follows these rules produces the same bytes for the same fields.
//! - **Canonical CBOR** ([`to_canonical_cbor`]) is the compact transport form.
//!
//! ## CBOR Canonicalization Rules (RFC 8949 Section 4.2)
//! 1. Map keys sorted by their encoded byte string
//! 2. Integers encoded in minimal form
//! 3. No indefinite-length encoding

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Nesting limit when walking untrusted CBOR.
const MAX_CBOR_DEPTH: usize = 32;

#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Floating-point value not allowed in canonical JSON: {0}")]
    FloatRejected(String),

    #[error("CBOR encoding error: {0}")]
    CborEncode(#[from] ciborium::ser::Error<std::io::Error>),

    #[error("CBOR value error: {0}")]
    CborValue(#[from] ciborium::value::Error),

    #[error("CBOR decoding error: {0}")]
    CborDecode(#[from] ciborium::de::Error<std::io::Error>),

    #[error("Non-canonical CBOR: {0}")]
    NonCanonical(String),
}

pub type Result<T> = std::result::Result<T, SerializationError>;

/// Bytes produced by canonical JSON encoding. The only constructor is
/// [`CanonicalBytes::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    pub fn new<T: Serialize>(value: &T) -> Result<Self> {
        let value = serde_json::to_value(value)?;
        let mut buf = Vec::new();
        write_canonical_json(&value, &mut buf)?;
        Ok(Self(buf))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

fn write_canonical_json(value: &Value, out: &mut Vec<u8>) -> Result<()> {
    match value {
        Value::Object(map) => {
            // Sort explicitly: serde_json's map ordering depends on crate features.
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

            out.push(b'{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                serde_json::to_writer(&mut *out, key)?;
                out.push(b':');
                write_canonical_json(item, out)?;
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical_json(item, out)?;
            }
            out.push(b']');
        }
        Value::Number(n) if n.is_f64() => {
            return Err(SerializationError::FloatRejected(n.to_string()));
        }
        scalar => serde_json::to_writer(&mut *out, scalar)?,
    }
    Ok(())
}

/// Serialize a value to canonical CBOR bytes.
pub fn to_canonical_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    // ciborium writes struct fields in declaration order, so sort maps first.
    let mut value = ciborium::value::Value::serialized(value)?;
    sort_cbor_maps(&mut value)?;

    let mut buf = Vec::new();
    ciborium::into_writer(&value, &mut buf)?;
    verify_canonical(&buf)?;
    Ok(buf)
}

/// Deserialize a value from canonical CBOR bytes.
pub fn from_canonical_cbor<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T> {
    verify_canonical(bytes)?;
    let value = ciborium::from_reader(bytes)?;
    Ok(value)
}

fn sort_cbor_maps(value: &mut ciborium::value::Value) -> Result<()> {
    match value {
        ciborium::value::Value::Map(entries) => {
            let mut keyed = Vec::with_capacity(entries.len());
            for (mut key, mut item) in entries.drain(..) {
                sort_cbor_maps(&mut key)?;
                sort_cbor_maps(&mut item)?;
                let mut encoded = Vec::new();
                ciborium::into_writer(&key, &mut encoded)?;
                keyed.push((encoded, key, item));
            }
            keyed.sort_by(|a, b| a.0.cmp(&b.0));
            *entries = keyed.into_iter().map(|(_, k, v)| (k, v)).collect();
        }
        ciborium::value::Value::Array(items) => {
            for item in items.iter_mut() {
                sort_cbor_maps(item)?;
            }
        }
        ciborium::value::Value::Tag(_, inner) => sort_cbor_maps(inner)?,
        _ => {}
    }
    Ok(())
}

/// Verify that CBOR bytes are in canonical form.
///
/// Checks for:
/// - No indefinite-length encoding (additional info 31)
/// - No reserved additional info values (28..=30)
/// - Integer arguments and lengths in their shortest form
/// - Map keys in strictly ascending order of their encoded bytes
/// - Declared lengths that fit inside the buffer
/// - No trailing bytes after the top-level item
fn verify_canonical(bytes: &[u8]) -> Result<()> {
    let mut pos = 0;
    verify_canonical_item(bytes, &mut pos, 0)?;
    if pos != bytes.len() {
        return Err(non_canonical(format!(
            "{} trailing bytes after top-level item",
            bytes.len() - pos
        )));
    }
    Ok(())
}

fn non_canonical(msg: impl Into<String>) -> SerializationError {
    SerializationError::NonCanonical(msg.into())
}

fn take<'a>(bytes: &'a [u8], pos: &mut usize, n: usize) -> Result<&'a [u8]> {
    let end = pos
        .checked_add(n)
        .filter(|end| *end <= bytes.len())
        .ok_or_else(|| non_canonical("unexpected end of input"))?;
    let slice = &bytes[*pos..end];
    *pos = end;
    Ok(slice)
}

fn verify_canonical_item(bytes: &[u8], pos: &mut usize, depth: usize) -> Result<()> {
    if depth > MAX_CBOR_DEPTH {
        return Err(non_canonical("nesting too deep"));
    }

    let head = take(bytes, pos, 1)?[0];
    let major_type = head >> 5;
    let additional_info = head & 0x1F;

    let argument: u64 = match additional_info {
        0..=23 => additional_info as u64,
        24 => take(bytes, pos, 1)?[0] as u64,
        25 => {
            let b = take(bytes, pos, 2)?;
            u16::from_be_bytes([b[0], b[1]]) as u64
        }
        26 => {
            let b = take(bytes, pos, 4)?;
            u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as u64
        }
        27 => {
            let b = take(bytes, pos, 8)?;
            u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
        }
        31 => {
            return Err(non_canonical("indefinite-length encoding"));
        }
        _ => return Err(non_canonical(format!("reserved additional info {additional_info}"))),
    };

    // Major type 7 uses 25..=27 for floats of fixed width, not arguments.
    if major_type != 7 {
        let shortest = match argument {
            0..=23 => additional_info <= 23,
            24..=0xFF => additional_info == 24,
            0x100..=0xFFFF => additional_info == 25,
            0x1_0000..=0xFFFF_FFFF => additional_info == 26,
            _ => additional_info == 27,
        };
        if !shortest {
            return Err(non_canonical(format!("non-minimal argument {argument}")));
        }
    }

    match major_type {
        2 | 3 => {
            let len = usize::try_from(argument).map_err(|_| non_canonical("string too long"))?;
            take(bytes, pos, len)?;
        }
        4 => {
            for _ in 0..argument {
                verify_canonical_item(bytes, pos, depth + 1)?;
            }
        }
        5 => {
            let mut previous_key: Option<&[u8]> = None;
            for _ in 0..argument {
                let key_start = *pos;
                verify_canonical_item(bytes, pos, depth + 1)?;
                let key = &bytes[key_start..*pos];
                if previous_key.is_some_and(|prev| prev >= key) {
                    return Err(non_canonical("map keys out of order or duplicated"));
                }
                previous_key = Some(key);
                verify_canonical_item(bytes, pos, depth + 1)?;
            }
        }
        6 => verify_canonical_item(bytes, pos, depth + 1)?,
        _ => {} // Unsigned int, negative int, simple/float
    }

    Ok(())
}
