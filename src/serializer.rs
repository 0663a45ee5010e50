//! This module contains the CBOR serializer.
//!
//! [`CborSerializer`] is a [`ContentHandler`]: feed it events and it writes
//! the RFC 7049 encoding of those events to a [`ByteSink`].
//!
//! # Examples
//!
//! ```
//! use cbor_cddl::{CborSerializer, ContentHandler, SemanticTag};
//!
//! let mut out = Vec::new();
//! {
//!     let mut ser = CborSerializer::new(&mut out);
//!     ser.begin_array(None, SemanticTag::None).unwrap();
//!     ser.uint_value(500, SemanticTag::None).unwrap();
//!     ser.string_value("IETF", SemanticTag::DateTime).unwrap();
//!     ser.end_array().unwrap();
//! }
//! assert_eq!(out, [0x9f, 0x19, 0x01, 0xf4, 0xc0, 0x64, b'I', b'E', b'T', b'F', 0xff]);
//! ```

use crate::decimal::{bignum_payload, parse_bignum, parse_decimal, Mantissa};
use crate::event::{replay, ContentHandler, EncodingHint, Event, SemanticTag};
use crate::writer::ByteSink;
use num_bigint::BigInt;
use std::io;
use thiserror::Error;

const MAJOR_UINT: u8 = 0;
const MAJOR_NINT: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const MAJOR_TAG: u8 = 6;

const TAG_DATETIME: u64 = 0;
const TAG_EPOCH: u64 = 1;
const TAG_POS_BIGNUM: u64 = 2;
const TAG_NEG_BIGNUM: u64 = 3;
const TAG_DECIMAL_FRACTION: u64 = 4;
const TAG_BIGFLOAT: u64 = 5;
const TAG_BASE64URL: u64 = 21;
const TAG_BASE64: u64 = 22;
const TAG_BASE16: u64 = 23;

const FALSE: u8 = 0xf4;
const TRUE: u8 = 0xf5;
const NULL: u8 = 0xf6;
const UNDEFINED: u8 = 0xf7;
const FLOAT32: u8 = 0xfa;
const FLOAT64: u8 = 0xfb;
const BREAK: u8 = 0xff;
const INDEFINITE_ARRAY: u8 = 0x9f;
const INDEFINITE_MAP: u8 = 0xbf;

/// The kind of failure during serialization.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SerializeErrorKind {
    /// Text that isn't valid UTF-8.
    #[error("Illegal unicode")]
    InvalidUnicode,
    /// Text that can't be parsed as a decimal number or big integer.
    #[error("Invalid decimal ({0})")]
    InvalidDecimal(String),
    /// An `end_array` or `end_object` with no open container.
    #[error("Stack underflow")]
    StackUnderflow,
    /// The byte sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// An error that occurred during serialization.
#[derive(Debug, Error)]
#[error("{kind} at depth {depth}")]
pub struct SerializeError {
    /// What went wrong.
    pub kind: SerializeErrorKind,
    /// The number of open containers when the error occurred.
    pub depth: usize,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ContainerKind {
    Object,
    Array,
}

#[derive(Debug)]
struct StackItem {
    kind: ContainerKind,
    indefinite: bool,
    // The declared length, for definite containers.
    length: u64,
    count: u64,
}

impl StackItem {
    // Maps count names and values separately.
    fn expected_count(&self) -> Option<u64> {
        match (self.indefinite, self.kind) {
            (true, _) => None,
            (false, ContainerKind::Array) => Some(self.length),
            (false, ContainerKind::Object) => self.length.checked_mul(2),
        }
    }
}

type SerResult<T = ()> = Result<T, SerializeError>;

/// Writes events to a [`ByteSink`] as CBOR.
///
/// Dropping the serializer flushes the sink; errors from that flush are
/// discarded. Containers that are still open at that point are not closed.
pub struct CborSerializer<S: ByteSink> {
    sink: S,
    stack: Vec<StackItem>,
}

impl<S: ByteSink> CborSerializer<S> {
    /// Create a serializer that writes to `sink`.
    pub fn new(sink: S) -> CborSerializer<S> {
        CborSerializer {
            sink,
            stack: Vec::new(),
        }
    }

    /// Borrow the byte sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutably borrow the byte sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// The number of containers that are currently open.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Write a text string from raw bytes, checking that they are UTF-8.
    pub fn string_value_utf8(&mut self, text: &[u8], tag: SemanticTag) -> SerResult<bool> {
        let text =
            std::str::from_utf8(text).map_err(|_| self.err(SerializeErrorKind::InvalidUnicode))?;
        self.string_value(text, tag)
    }

    fn err(&self, kind: SerializeErrorKind) -> SerializeError {
        SerializeError {
            kind,
            depth: self.stack.len(),
        }
    }

    fn push(&mut self, bytes: &[u8]) -> SerResult {
        self.sink
            .push_bytes(bytes)
            .map_err(|e| self.err(SerializeErrorKind::Io(e)))
    }

    // Write the initial byte (and any following length bytes) for a data
    // item, using the shortest form that holds `n`.
    fn write_head(&mut self, major: u8, n: u64) -> SerResult {
        let mt = major << 5;
        let mut buf = [0u8; 9];
        let len = if let Ok(v) = u8::try_from(n) {
            if v < 24 {
                buf[0] = mt | v;
                1
            } else {
                buf[0] = mt | 24;
                buf[1] = v;
                2
            }
        } else if let Ok(v) = u16::try_from(n) {
            buf[0] = mt | 25;
            buf[1..3].copy_from_slice(&v.to_be_bytes());
            3
        } else if let Ok(v) = u32::try_from(n) {
            buf[0] = mt | 26;
            buf[1..5].copy_from_slice(&v.to_be_bytes());
            5
        } else {
            buf[0] = mt | 27;
            buf[1..9].copy_from_slice(&n.to_be_bytes());
            9
        };
        self.push(&buf[..len])
    }

    fn write_tag(&mut self, tag: u64) -> SerResult {
        self.write_head(MAJOR_TAG, tag)
    }

    fn write_int(&mut self, value: i64) -> SerResult {
        match u64::try_from(value) {
            Ok(u) => self.write_head(MAJOR_UINT, u),
            // -1 - value can't overflow for a negative value.
            Err(_) => self.write_head(MAJOR_NINT, (-1 - value) as u64),
        }
    }

    fn write_text(&mut self, text: &str) -> SerResult {
        self.write_head(MAJOR_TEXT, text.len() as u64)?;
        self.push(text.as_bytes())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> SerResult {
        self.write_head(MAJOR_BYTES, bytes.len() as u64)?;
        self.push(bytes)
    }

    fn write_bignum(&mut self, n: &BigInt) -> SerResult {
        let (negative, payload) = bignum_payload(n);
        self.write_tag(if negative { TAG_NEG_BIGNUM } else { TAG_POS_BIGNUM })?;
        self.write_bytes(&payload)
    }

    fn write_decimal_fraction(&mut self, text: &str) -> SerResult {
        // Parse everything before writing anything.
        let decimal = parse_decimal(text).map_err(|k| self.err(k))?;
        self.write_tag(TAG_DECIMAL_FRACTION)?;
        self.write_head(MAJOR_ARRAY, 2)?;
        self.write_int(decimal.scale)?;
        match decimal.mantissa {
            Mantissa::Small(m) => self.write_int(m),
            Mantissa::Big(b) => self.write_bignum(&b),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn write_double(&mut self, value: f64) -> SerResult {
        let single = value as f32;
        if f64::from(single) == value {
            self.push(&[FLOAT32])?;
            self.push(&single.to_be_bytes())
        } else {
            self.push(&[FLOAT64])?;
            self.push(&value.to_be_bytes())
        }
    }

    fn epoch_prefix(&mut self, tag: SemanticTag) -> SerResult {
        if tag == SemanticTag::EpochTime {
            self.write_tag(TAG_EPOCH)?;
        }
        Ok(())
    }

    // Count one completed item in the enclosing container.
    fn end_value(&mut self) -> SerResult<bool> {
        if let Some(top) = self.stack.last_mut() {
            top.count += 1;
        }
        Ok(true)
    }

    fn begin_container(&mut self, kind: ContainerKind, length: Option<u64>) -> SerResult<bool> {
        let major = match kind {
            ContainerKind::Object => MAJOR_MAP,
            ContainerKind::Array => MAJOR_ARRAY,
        };
        match length {
            Some(n) => self.write_head(major, n)?,
            None => match kind {
                ContainerKind::Object => self.push(&[INDEFINITE_MAP])?,
                ContainerKind::Array => self.push(&[INDEFINITE_ARRAY])?,
            },
        }
        self.stack.push(StackItem {
            kind,
            indefinite: length.is_none(),
            length: length.unwrap_or(0),
            count: 0,
        });
        tracing::trace!(?kind, ?length, depth = self.stack.len(), "begin container");
        Ok(true)
    }

    fn end_container(&mut self, kind: ContainerKind) -> SerResult<bool> {
        let top = match self.stack.last() {
            Some(top) => top,
            None => return Err(self.err(SerializeErrorKind::StackUnderflow)),
        };
        if top.kind != kind {
            tracing::debug!(open = ?top.kind, closing = ?kind, "container kinds don't match");
        }
        if let Some(expected) = top.expected_count() {
            if expected != top.count {
                tracing::debug!(expected, written = top.count, "definite container length mismatch");
            }
        }
        if top.indefinite {
            self.push(&[BREAK])?;
        }
        self.stack.pop();
        tracing::trace!(?kind, depth = self.stack.len(), "end container");
        self.end_value()
    }
}

impl<S: ByteSink> ContentHandler for CborSerializer<S> {
    type Error = SerializeError;

    fn begin_object(&mut self, length: Option<u64>, _tag: SemanticTag) -> SerResult<bool> {
        self.begin_container(ContainerKind::Object, length)
    }

    fn end_object(&mut self) -> SerResult<bool> {
        self.end_container(ContainerKind::Object)
    }

    fn begin_array(&mut self, length: Option<u64>, tag: SemanticTag) -> SerResult<bool> {
        if tag == SemanticTag::BigFloat && length == Some(2) {
            self.write_tag(TAG_BIGFLOAT)?;
        }
        self.begin_container(ContainerKind::Array, length)
    }

    fn end_array(&mut self) -> SerResult<bool> {
        self.end_container(ContainerKind::Array)
    }

    fn name(&mut self, name: &str) -> SerResult<bool> {
        self.write_text(name)?;
        self.end_value()
    }

    fn null_value(&mut self, tag: SemanticTag) -> SerResult<bool> {
        match tag {
            SemanticTag::Undefined => self.push(&[UNDEFINED])?,
            _ => self.push(&[NULL])?,
        }
        self.end_value()
    }

    fn bool_value(&mut self, value: bool) -> SerResult<bool> {
        self.push(&[if value { TRUE } else { FALSE }])?;
        self.end_value()
    }

    fn int_value(&mut self, value: i64, tag: SemanticTag) -> SerResult<bool> {
        self.epoch_prefix(tag)?;
        self.write_int(value)?;
        self.end_value()
    }

    fn uint_value(&mut self, value: u64, tag: SemanticTag) -> SerResult<bool> {
        self.epoch_prefix(tag)?;
        self.write_head(MAJOR_UINT, value)?;
        self.end_value()
    }

    fn double_value(&mut self, value: f64, tag: SemanticTag) -> SerResult<bool> {
        self.epoch_prefix(tag)?;
        self.write_double(value)?;
        self.end_value()
    }

    fn string_value(&mut self, text: &str, tag: SemanticTag) -> SerResult<bool> {
        match tag {
            SemanticTag::Bignum => {
                let n = parse_bignum(text).map_err(|k| self.err(k))?;
                self.write_bignum(&n)?;
            }
            SemanticTag::DecimalFraction => self.write_decimal_fraction(text)?,
            SemanticTag::DateTime => {
                self.write_tag(TAG_DATETIME)?;
                self.write_text(text)?;
            }
            _ => self.write_text(text)?,
        }
        self.end_value()
    }

    fn byte_string_value(
        &mut self,
        bytes: &[u8],
        hint: EncodingHint,
        _tag: SemanticTag,
    ) -> SerResult<bool> {
        match hint {
            EncodingHint::Base64Url => self.write_tag(TAG_BASE64URL)?,
            EncodingHint::Base64 => self.write_tag(TAG_BASE64)?,
            EncodingHint::Base16 => self.write_tag(TAG_BASE16)?,
            EncodingHint::None => {}
        }
        self.write_bytes(bytes)?;
        self.end_value()
    }

    fn flush(&mut self) -> SerResult {
        self.sink
            .flush()
            .map_err(|e| self.err(SerializeErrorKind::Io(e)))
    }
}

impl<S: ByteSink> Drop for CborSerializer<S> {
    fn drop(&mut self) {
        if !self.stack.is_empty() {
            tracing::warn!(depth = self.stack.len(), "CBOR serializer dropped with open containers");
        }
        if let Err(e) = self.sink.flush() {
            tracing::debug!("discarding flush error on drop: {}", e);
        }
    }
}

/// Serialize a complete list of events into a CBOR byte vector.
pub fn to_vec(events: &[Event]) -> Result<Vec<u8>, SerializeError> {
    let mut out = Vec::new();
    {
        let mut ser = CborSerializer::new(&mut out);
        replay(events, &mut ser)?;
        ser.flush()?;
    }
    Ok(out)
}
