//! This module implements event production from [`serde_cbor::Value`].
//!
//! Decoded CBOR maps almost perfectly onto events; the exceptions are map
//! keys, which must be text (integers are accepted and converted to their
//! decimal form), and integers too large for 64 bits, which become tagged
//! big-number strings.

#![cfg(feature = "serde_cbor")]

use crate::event::{EncodingHint, Event, EventCursor, SemanticTag};
use crate::schema::CddlSpecification;
use crate::util::{ValidateError, ValidateResult};
use num_bigint::{BigInt, Sign};
use serde_cbor::Value as CBOR_Value;

fn integer_event(i: i128, tag: SemanticTag) -> Event {
    if let Ok(value) = u64::try_from(i) {
        Event::Uint { value, tag }
    } else if let Ok(value) = i64::try_from(i) {
        Event::Int { value, tag }
    } else {
        Event::String {
            text: i.to_string(),
            tag: SemanticTag::Bignum,
        }
    }
}

fn key_name(key: &CBOR_Value) -> Result<String, ValidateError> {
    match key {
        CBOR_Value::Text(t) => Ok(t.clone()),
        CBOR_Value::Integer(i) => Ok(i.to_string()),
        other => Err(ValidateError::ValueError(format!(
            "unsupported map key {:?}",
            other
        ))),
    }
}

// Convert the payload of a tag 2 or tag 3 item to decimal text.
fn bignum_text(negative: bool, bytes: &[u8]) -> String {
    let n = BigInt::from_bytes_be(Sign::Plus, bytes);
    if negative {
        (-n - 1u32).to_string()
    } else {
        n.to_string()
    }
}

fn push_tagged(tag: u64, value: &CBOR_Value, out: &mut Vec<Event>) -> Result<(), ValidateError> {
    match (tag, value) {
        (0, CBOR_Value::Text(t)) => out.push(Event::String {
            text: t.clone(),
            tag: SemanticTag::DateTime,
        }),
        (1, CBOR_Value::Integer(i)) => out.push(integer_event(*i, SemanticTag::EpochTime)),
        (1, CBOR_Value::Float(f)) => out.push(Event::Double {
            value: *f,
            tag: SemanticTag::EpochTime,
        }),
        (2, CBOR_Value::Bytes(b)) | (3, CBOR_Value::Bytes(b)) => out.push(Event::String {
            text: bignum_text(tag == 3, b),
            tag: SemanticTag::Bignum,
        }),
        (21..=23, CBOR_Value::Bytes(b)) => {
            let hint = match tag {
                21 => EncodingHint::Base64Url,
                22 => EncodingHint::Base64,
                _ => EncodingHint::Base16,
            };
            out.push(Event::ByteString {
                bytes: b.clone(),
                hint,
                tag: SemanticTag::None,
            });
        }
        _ => {
            tracing::trace!(tag, "ignoring cbor tag");
            push_events(value, out)?;
        }
    }
    Ok(())
}

fn push_events(value: &CBOR_Value, out: &mut Vec<Event>) -> Result<(), ValidateError> {
    let none = SemanticTag::None;
    match value {
        CBOR_Value::Null => out.push(Event::Null(none)),
        CBOR_Value::Bool(b) => out.push(Event::Bool(*b)),
        CBOR_Value::Integer(i) => out.push(integer_event(*i, none)),
        CBOR_Value::Float(f) => out.push(Event::double(*f)),
        CBOR_Value::Bytes(b) => out.push(Event::ByteString {
            bytes: b.clone(),
            hint: EncodingHint::None,
            tag: none,
        }),
        CBOR_Value::Text(t) => out.push(Event::text(t.as_str())),
        CBOR_Value::Array(a) => {
            out.push(Event::begin_array(u64::try_from(a.len()).ok()));
            for item in a {
                push_events(item, out)?;
            }
            out.push(Event::EndArray);
        }
        CBOR_Value::Map(m) => {
            out.push(Event::begin_object(u64::try_from(m.len()).ok()));
            for (k, v) in m {
                out.push(Event::Name(key_name(k)?));
                push_events(v, out)?;
            }
            out.push(Event::EndObject);
        }
        CBOR_Value::Tag(tag, inner) => push_tagged(*tag, inner, out)?,
        _ => {
            return Err(ValidateError::ValueError(
                "can't handle hidden cbor Value".into(),
            ))
        }
    }
    Ok(())
}

/// Convert a decoded CBOR value to a list of events.
pub fn cbor_events(value: &CBOR_Value) -> Result<Vec<Event>, ValidateError> {
    let mut events = Vec::new();
    push_events(value, &mut events)?;
    Ok(events)
}

/// Validate already-parsed CBOR data against an already-parsed CDDL schema.
pub fn validate_cbor(spec: &CddlSpecification, value: &CBOR_Value) -> ValidateResult {
    let mut reader = EventCursor::new(cbor_events(value)?);
    spec.validate(&mut reader)
}

/// Validate CBOR-encoded data against a specified rule in a UTF-8 CDDL schema.
pub fn validate_cbor_bytes(name: &str, cddl: &str, cbor: &[u8]) -> ValidateResult {
    let spec = CddlSpecification::parse(cddl)?;

    let cbor_value: CBOR_Value = serde_cbor::from_slice(cbor)
        .map_err(|e| ValidateError::ValueError(format!("cbor parsing failed: {}", e)))?;

    let mut reader = EventCursor::new(cbor_events(&cbor_value)?);
    spec.validate_named(name, &mut reader)
}
