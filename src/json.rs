//! This module implements event production from [`serde_json::Value`].
//!
//! # Examples
//!
//! ```
//! use cbor_cddl::validate_json_str;
//!
//! let cddl_input = "person = {name: tstr, age: int}";
//! let json_str = r#"{ "name": "Bob", "age": 43 }"#;
//!
//! validate_json_str("person", cddl_input, &json_str).unwrap();
//! ```
//!

#![cfg(feature = "serde_json")]

use crate::event::{ContentHandler, Event, EventCollector, EventCursor, SemanticTag};
use crate::schema::CddlSpecification;
use crate::util::{ValidateError, ValidateResult};
use serde_json::Value as JSON_Value;

/// Send a JSON value to a [`ContentHandler`] as a sequence of events.
///
/// Arrays and objects are announced with their lengths. Returns `false` if
/// the handler asked to stop.
pub fn emit_json<H: ContentHandler>(value: &JSON_Value, handler: &mut H) -> Result<bool, H::Error> {
    let none = SemanticTag::None;
    match value {
        JSON_Value::Null => handler.null_value(none),
        JSON_Value::Bool(b) => handler.bool_value(*b),
        JSON_Value::Number(num) => {
            // serde_json will convert integers to f64 if asked, so the
            // integer forms must be tried first.
            if let Some(u) = num.as_u64() {
                handler.uint_value(u, none)
            } else if let Some(i) = num.as_i64() {
                handler.int_value(i, none)
            } else if let Some(f) = num.as_f64() {
                handler.double_value(f, none)
            } else {
                handler.string_value(&num.to_string(), SemanticTag::DecimalFraction)
            }
        }
        JSON_Value::String(t) => handler.string_value(t, none),
        JSON_Value::Array(a) => {
            if !handler.begin_array(u64::try_from(a.len()).ok(), none)? {
                return Ok(false);
            }
            for item in a {
                if !emit_json(item, handler)? {
                    return Ok(false);
                }
            }
            handler.end_array()
        }
        JSON_Value::Object(m) => {
            if !handler.begin_object(u64::try_from(m.len()).ok(), none)? {
                return Ok(false);
            }
            for (k, v) in m {
                if !handler.name(k)? || !emit_json(v, handler)? {
                    return Ok(false);
                }
            }
            handler.end_object()
        }
    }
}

/// Convert a JSON value to a list of events.
pub fn json_events(value: &JSON_Value) -> Vec<Event> {
    let mut collector = EventCollector::new();
    emit_json(value, &mut collector).unwrap_or_else(|never| match never {});
    collector.into_events()
}

/// Validate already-parsed JSON data against an already-parsed CDDL schema.
pub fn validate_json(spec: &CddlSpecification, value: &JSON_Value) -> ValidateResult {
    let mut reader = EventCursor::new(json_events(value));
    spec.validate(&mut reader)
}

/// Validate JSON-encoded data against a specified rule in a UTF-8 CDDL schema.
pub fn validate_json_str(name: &str, cddl: &str, json: &str) -> ValidateResult {
    let spec = CddlSpecification::parse(cddl)?;

    // Deserialize the JSON bytes
    let json_value: JSON_Value =
        serde_json::from_str(json).map_err(|e| ValidateError::ValueError(format!("{}", e)))?;

    let mut reader = EventCursor::new(json_events(&json_value));
    spec.validate_named(name, &mut reader)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_number_behavior() {
        // Ensures that our JSON decoder tracks number types precisely, and
        // doesn't, say, allow floating-point values to become integers.
        // serde_json does sometimes permit as_f64 to work on integers, which is
        // why emit_json has to test u64, then i64, then f64.

        let json_value: JSON_Value = serde_json::from_str("1").unwrap();
        assert!(json_value.as_u64().is_some());
        assert_eq!(json_events(&json_value), [Event::uint(1)]);

        let json_value: JSON_Value = serde_json::from_str("-1").unwrap();
        assert!(json_value.as_u64().is_none());
        assert!(json_value.as_i64().is_some());
        assert_eq!(json_events(&json_value), [Event::int(-1)]);

        let json_value: JSON_Value = serde_json::from_str("1.0").unwrap();
        assert!(json_value.as_u64().is_none());
        assert!(json_value.as_i64().is_none());
        assert!(json_value.as_f64().is_some());
        assert_eq!(json_events(&json_value), [Event::double(1.0)]);
    }

    #[test]
    fn containers() {
        let json_value: JSON_Value = serde_json::from_str(r#"{"a": [null, true]}"#).unwrap();
        assert_eq!(
            json_events(&json_value),
            [
                Event::begin_object(Some(1)),
                Event::name("a"),
                Event::begin_array(Some(2)),
                Event::Null(SemanticTag::None),
                Event::Bool(true),
                Event::EndArray,
                Event::EndObject,
            ]
        );
    }

    #[test]
    fn early_stop() {
        // Stops after the first name.
        struct StopAtName(usize);
        impl ContentHandler for StopAtName {
            type Error = ();
            fn begin_object(&mut self, _: Option<u64>, _: SemanticTag) -> Result<bool, ()> {
                self.0 += 1;
                Ok(true)
            }
            fn end_object(&mut self) -> Result<bool, ()> {
                Err(())
            }
            fn begin_array(&mut self, _: Option<u64>, _: SemanticTag) -> Result<bool, ()> {
                Err(())
            }
            fn end_array(&mut self) -> Result<bool, ()> {
                Err(())
            }
            fn name(&mut self, _: &str) -> Result<bool, ()> {
                self.0 += 1;
                Ok(false)
            }
            fn null_value(&mut self, _: SemanticTag) -> Result<bool, ()> {
                Err(())
            }
            fn bool_value(&mut self, _: bool) -> Result<bool, ()> {
                Err(())
            }
            fn int_value(&mut self, _: i64, _: SemanticTag) -> Result<bool, ()> {
                Err(())
            }
            fn uint_value(&mut self, _: u64, _: SemanticTag) -> Result<bool, ()> {
                Err(())
            }
            fn double_value(&mut self, _: f64, _: SemanticTag) -> Result<bool, ()> {
                Err(())
            }
            fn string_value(&mut self, _: &str, _: SemanticTag) -> Result<bool, ()> {
                Err(())
            }
            fn byte_string_value(
                &mut self,
                _: &[u8],
                _: crate::event::EncodingHint,
                _: SemanticTag,
            ) -> Result<bool, ()> {
                Err(())
            }
            fn flush(&mut self) -> Result<(), ()> {
                Ok(())
            }
        }

        let json_value: JSON_Value = serde_json::from_str(r#"{"a": 1, "b": 2}"#).unwrap();
        let mut handler = StopAtName(0);
        assert_eq!(emit_json(&json_value, &mut handler), Ok(false));
        assert_eq!(handler.0, 2);
    }
}
