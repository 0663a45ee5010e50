//! `cbor-cddl` is a library for producing CBOR from a stream of data
//! events, and for validating such streams against a CDDL document that
//! describes the expected structure of the data.
//!
//! CDDL is a text document described by [RFC8610] that describes data
//! structures. [CBOR] is a compact binary encoding described by [RFC7049].
//!
//! # Implementation Details
//!
//! - Both halves of the library speak the same language: a flat sequence of
//!   [`Event`]s (begin/end array, begin/end object, map key, scalar). Events
//!   can carry a [`SemanticTag`] that asks for a richer CBOR encoding, like a
//!   date/time string, a big integer, or a decimal fraction.
//!
//! - The [`CborSerializer`] is a [`ContentHandler`]: it encodes each event
//!   as it arrives, always choosing the shortest encoding, and writes the
//!   bytes to a [`ByteSink`].
//!
//! - CDDL text is compiled by a character-level state machine into a
//!   [`RuleDictionary`](crate::rules::RuleDictionary): an arena of rules
//!   that refer to one another by index, so recursive rules are fine.
//!
//! - Validation pulls events from an [`EventReader`] and never looks back.
//!   Rules are fetched through a [`LookupContext`](crate::context::LookupContext).
//!
//! - JSON and CBOR documents can be turned into events, controlled by the
//!   `serde_json` and `serde_cbor` features.
//!
//! # Examples
//!
//! Encoding events as CBOR:
//!
//! ```
//! use cbor_cddl::{to_vec, Event, SemanticTag};
//!
//! let events = [
//!     Event::begin_array(Some(2)),
//!     Event::uint(500),
//!     Event::String { text: "273.15".into(), tag: SemanticTag::DecimalFraction },
//!     Event::EndArray,
//! ];
//! let bytes = to_vec(&events).unwrap();
//! assert_eq!(bytes, [0x82, 0x19, 0x01, 0xf4, 0xc4, 0x82, 0x21, 0x19, 0x6a, 0xb3]);
//! ```
//!
//! This example validates JSON-encoded data against a CDDL schema:
//!
//! ```
//! # #[cfg(feature = "serde_json")]
//! use cbor_cddl::validate_json_str;
//!
//! let cddl_input = "person = {name: tstr, age: int}";
//! let json_str = r#"{ "name": "Bob", "age": 43 }"#;
//!
//! # #[cfg(feature = "serde_json")]
//! validate_json_str("person", cddl_input, &json_str).unwrap();
//! ```
//!
//! If the JSON data doesn't have the expected structure, an error will
//! result:
//! ```
//! # #[cfg(feature = "serde_json")]
//! use cbor_cddl::validate_json_str;
//!
//! let cddl_input = "person = {name: tstr, age: int}";
//! let json_str = r#"{ "name": "Bob", "age": "forty three" }"#;
//!
//! # #[cfg(feature = "serde_json")]
//! assert!(validate_json_str("person", cddl_input, &json_str).is_err());
//! ```
//!
//! Supported prelude types:
//! - `any`, `uint`, `nint`, `int`, `bstr`, `bytes`, `tstr`, `text`
//! - `float`, `float16`, `float32`, `float64`, `bool`, `true`, `false`,
//!   `nil`, `null`
//!
//! Note: float sizes are not validated.
//!
//! Supported CDDL features:
//! - Literal int, float, bool, UTF-8 text strings
//! - Arrays and maps
//! - Rule lookups by name, including recursive rules
//! - Groups, including groups inlined into maps
//! - Occurrences `?`, `*`, `+` (and `0*1`, `0*`, `1*`)
//!
//! Parsed but rejected as unsupported during validation:
//! - Choices (using `/` or `//` syntax)
//! - Ranges (e.g. `1..7` or `1...8`)
//! - Other occurrences (`m*n`)
//!
//! [RFC8610]: https://tools.ietf.org/html/rfc8610
//! [RFC7049]: https://tools.ietf.org/html/rfc7049
//! [CBOR]: https://cbor.io/

#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![warn(clippy::cast_possible_truncation)]

pub mod context;
mod decimal;
pub mod event;
mod link;
pub mod parser;
pub mod rules;
pub mod schema;
pub mod serializer;
pub mod util;
#[doc(inline)]
pub use util::{ValidateError, ValidateResult};
pub(crate) mod validate;
pub mod writer;

#[cfg(feature = "serde_cbor")]
pub mod cbor;
#[cfg(feature = "serde_cbor")]
#[doc(inline)]
pub use cbor::{validate_cbor, validate_cbor_bytes};

#[cfg(feature = "serde_json")]
pub mod json;
#[cfg(feature = "serde_json")]
#[doc(inline)]
pub use json::{validate_json, validate_json_str};

#[doc(inline)]
pub use event::{
    ContentHandler, EncodingHint, Event, EventCollector, EventCursor, EventKind, EventReader,
    SemanticTag,
};
#[doc(inline)]
pub use parser::parse_cddl;
#[doc(inline)]
pub use schema::CddlSpecification;
#[doc(inline)]
pub use serializer::{to_vec, CborSerializer, SerializeError, SerializeErrorKind};
#[doc(inline)]
pub use writer::{ByteSink, StreamSink};
