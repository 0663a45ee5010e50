//! This module defines the semantic event vocabulary.
//!
//! Both halves of this crate speak in [`Event`]s: the CBOR serializer
//! consumes them through the [`ContentHandler`] trait, and the CDDL validator
//! pulls them from an [`EventReader`].
//!

use std::convert::Infallible;
use std::fmt;
use strum_macros::Display;

/// A hint that promotes a raw event to a richer meaning.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Display)]
pub enum SemanticTag {
    /// No semantic tag.
    #[default]
    None,
    /// Marks a null event as `undefined`.
    Undefined,
    /// A decimal digit string that should be encoded as a big integer.
    Bignum,
    /// A decimal literal that should be encoded as a decimal fraction.
    DecimalFraction,
    /// A two-element array holding an exponent and a mantissa.
    BigFloat,
    /// Seconds since the epoch.
    EpochTime,
    /// A date/time string.
    DateTime,
}

/// The text encoding a byte string would prefer if converted to text.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Display)]
#[allow(missing_docs)]
pub enum EncodingHint {
    #[default]
    None,
    Base64Url,
    Base64,
    Base16,
}

/// One semantic data event.
///
/// A `length` of `None` means the producer hasn't declared the size of the
/// container.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum Event {
    BeginObject {
        length: Option<u64>,
        tag: SemanticTag,
    },
    EndObject,
    BeginArray {
        length: Option<u64>,
        tag: SemanticTag,
    },
    EndArray,
    /// A map key.
    Name(String),
    /// `null`, or `undefined` if tagged with [`SemanticTag::Undefined`].
    Null(SemanticTag),
    Bool(bool),
    Int {
        value: i64,
        tag: SemanticTag,
    },
    Uint {
        value: u64,
        tag: SemanticTag,
    },
    Double {
        value: f64,
        tag: SemanticTag,
    },
    String {
        text: String,
        tag: SemanticTag,
    },
    ByteString {
        bytes: Vec<u8>,
        hint: EncodingHint,
        tag: SemanticTag,
    },
}

/// The kind of an [`Event`], without its payload.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display)]
#[allow(missing_docs)]
pub enum EventKind {
    BeginObject,
    EndObject,
    BeginArray,
    EndArray,
    Name,
    Null,
    Bool,
    Int,
    Uint,
    Double,
    String,
    ByteString,
}

impl Event {
    /// Returns the kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::BeginObject { .. } => EventKind::BeginObject,
            Event::EndObject => EventKind::EndObject,
            Event::BeginArray { .. } => EventKind::BeginArray,
            Event::EndArray => EventKind::EndArray,
            Event::Name(_) => EventKind::Name,
            Event::Null(_) => EventKind::Null,
            Event::Bool(_) => EventKind::Bool,
            Event::Int { .. } => EventKind::Int,
            Event::Uint { .. } => EventKind::Uint,
            Event::Double { .. } => EventKind::Double,
            Event::String { .. } => EventKind::String,
            Event::ByteString { .. } => EventKind::ByteString,
        }
    }

    /// Shortcut for an untagged `String` event.
    pub fn text<T: Into<String>>(text: T) -> Event {
        Event::String {
            text: text.into(),
            tag: SemanticTag::None,
        }
    }

    /// Shortcut for an untagged `Uint` event.
    pub fn uint(value: u64) -> Event {
        Event::Uint {
            value,
            tag: SemanticTag::None,
        }
    }

    /// Shortcut for an untagged `Int` event.
    pub fn int(value: i64) -> Event {
        Event::Int {
            value,
            tag: SemanticTag::None,
        }
    }

    /// Shortcut for an untagged `Double` event.
    pub fn double(value: f64) -> Event {
        Event::Double {
            value,
            tag: SemanticTag::None,
        }
    }

    /// Shortcut for a `Name` event.
    pub fn name<T: Into<String>>(name: T) -> Event {
        Event::Name(name.into())
    }

    /// Shortcut for an untagged `BeginArray` event.
    pub fn begin_array(length: Option<u64>) -> Event {
        Event::BeginArray {
            length,
            tag: SemanticTag::None,
        }
    }

    /// Shortcut for an untagged `BeginObject` event.
    pub fn begin_object(length: Option<u64>) -> Event {
        Event::BeginObject {
            length,
            tag: SemanticTag::None,
        }
    }
}

// A diagnostic rendering, loosely following CBOR diagnostic notation.
impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::BeginObject { .. } => write!(f, "{{"),
            Event::EndObject => write!(f, "}}"),
            Event::BeginArray { .. } => write!(f, "["),
            Event::EndArray => write!(f, "]"),
            Event::Name(n) => write!(f, "{:?}:", n),
            Event::Null(SemanticTag::Undefined) => write!(f, "undefined"),
            Event::Null(_) => write!(f, "null"),
            Event::Bool(b) => write!(f, "{}", b),
            Event::Int { value, .. } => write!(f, "{}", value),
            Event::Uint { value, .. } => write!(f, "{}", value),
            Event::Double { value, .. } => write!(f, "{:?}", value),
            Event::String { text, .. } => write!(f, "{:?}", text),
            Event::ByteString { bytes, .. } => write!(f, "h'{}'", hex::encode(bytes)),
        }
    }
}

/// A consumer of semantic events.
///
/// Every method returns a "continue" indicator; a handler that returns
/// `false` asks the producer to stop.
pub trait ContentHandler {
    /// The error type returned by this handler.
    type Error;

    #[allow(missing_docs)]
    fn begin_object(&mut self, length: Option<u64>, tag: SemanticTag)
        -> Result<bool, Self::Error>;
    #[allow(missing_docs)]
    fn end_object(&mut self) -> Result<bool, Self::Error>;
    #[allow(missing_docs)]
    fn begin_array(&mut self, length: Option<u64>, tag: SemanticTag) -> Result<bool, Self::Error>;
    #[allow(missing_docs)]
    fn end_array(&mut self) -> Result<bool, Self::Error>;
    #[allow(missing_docs)]
    fn name(&mut self, name: &str) -> Result<bool, Self::Error>;
    #[allow(missing_docs)]
    fn null_value(&mut self, tag: SemanticTag) -> Result<bool, Self::Error>;
    #[allow(missing_docs)]
    fn bool_value(&mut self, value: bool) -> Result<bool, Self::Error>;
    #[allow(missing_docs)]
    fn int_value(&mut self, value: i64, tag: SemanticTag) -> Result<bool, Self::Error>;
    #[allow(missing_docs)]
    fn uint_value(&mut self, value: u64, tag: SemanticTag) -> Result<bool, Self::Error>;
    #[allow(missing_docs)]
    fn double_value(&mut self, value: f64, tag: SemanticTag) -> Result<bool, Self::Error>;
    #[allow(missing_docs)]
    fn string_value(&mut self, text: &str, tag: SemanticTag) -> Result<bool, Self::Error>;
    #[allow(missing_docs)]
    fn byte_string_value(
        &mut self,
        bytes: &[u8],
        hint: EncodingHint,
        tag: SemanticTag,
    ) -> Result<bool, Self::Error>;

    /// Push any buffered output to its destination.
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Dispatch a single [`Event`] to the matching handler method.
    fn event(&mut self, event: &Event) -> Result<bool, Self::Error> {
        match event {
            Event::BeginObject { length, tag } => self.begin_object(*length, *tag),
            Event::EndObject => self.end_object(),
            Event::BeginArray { length, tag } => self.begin_array(*length, *tag),
            Event::EndArray => self.end_array(),
            Event::Name(name) => self.name(name),
            Event::Null(tag) => self.null_value(*tag),
            Event::Bool(b) => self.bool_value(*b),
            Event::Int { value, tag } => self.int_value(*value, *tag),
            Event::Uint { value, tag } => self.uint_value(*value, *tag),
            Event::Double { value, tag } => self.double_value(*value, *tag),
            Event::String { text, tag } => self.string_value(text, *tag),
            Event::ByteString { bytes, hint, tag } => self.byte_string_value(bytes, *hint, *tag),
        }
    }
}

/// Drive a [`ContentHandler`] with a sequence of events.
///
/// Stops early if the handler asks to stop.
pub fn replay<H: ContentHandler>(events: &[Event], handler: &mut H) -> Result<(), H::Error> {
    for event in events {
        if !handler.event(event)? {
            break;
        }
    }
    Ok(())
}

/// A [`ContentHandler`] that records every event it receives.
#[derive(Debug, Default)]
pub struct EventCollector {
    /// The events received so far.
    pub events: Vec<Event>,
}

impl EventCollector {
    /// Create an empty collector.
    pub fn new() -> EventCollector {
        EventCollector::default()
    }

    /// Return the collected events.
    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    fn push(&mut self, event: Event) -> Result<bool, Infallible> {
        self.events.push(event);
        Ok(true)
    }
}

impl ContentHandler for EventCollector {
    type Error = Infallible;

    fn begin_object(&mut self, length: Option<u64>, tag: SemanticTag) -> Result<bool, Infallible> {
        self.push(Event::BeginObject { length, tag })
    }

    fn end_object(&mut self) -> Result<bool, Infallible> {
        self.push(Event::EndObject)
    }

    fn begin_array(&mut self, length: Option<u64>, tag: SemanticTag) -> Result<bool, Infallible> {
        self.push(Event::BeginArray { length, tag })
    }

    fn end_array(&mut self) -> Result<bool, Infallible> {
        self.push(Event::EndArray)
    }

    fn name(&mut self, name: &str) -> Result<bool, Infallible> {
        self.push(Event::Name(name.to_string()))
    }

    fn null_value(&mut self, tag: SemanticTag) -> Result<bool, Infallible> {
        self.push(Event::Null(tag))
    }

    fn bool_value(&mut self, value: bool) -> Result<bool, Infallible> {
        self.push(Event::Bool(value))
    }

    fn int_value(&mut self, value: i64, tag: SemanticTag) -> Result<bool, Infallible> {
        self.push(Event::Int { value, tag })
    }

    fn uint_value(&mut self, value: u64, tag: SemanticTag) -> Result<bool, Infallible> {
        self.push(Event::Uint { value, tag })
    }

    fn double_value(&mut self, value: f64, tag: SemanticTag) -> Result<bool, Infallible> {
        self.push(Event::Double { value, tag })
    }

    fn string_value(&mut self, text: &str, tag: SemanticTag) -> Result<bool, Infallible> {
        self.push(Event::String {
            text: text.to_string(),
            tag,
        })
    }

    fn byte_string_value(
        &mut self,
        bytes: &[u8],
        hint: EncodingHint,
        tag: SemanticTag,
    ) -> Result<bool, Infallible> {
        self.push(Event::ByteString {
            bytes: bytes.to_vec(),
            hint,
            tag,
        })
    }

    fn flush(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

/// A forward-only source of events.
///
/// This is the shape of a decoder as seen by the CDDL validator.
pub trait EventReader {
    /// The current event, or `None` at the end of the stream.
    fn current(&self) -> Option<&Event>;

    /// Advance to the next event.
    fn next(&mut self);

    /// Returns `true` once the stream is exhausted.
    fn done(&self) -> bool {
        self.current().is_none()
    }

    /// The source position of the current event, if the reader tracks one.
    fn position(&self) -> Option<usize> {
        None
    }
}

/// An [`EventReader`] over an in-memory list of events.
///
/// The position of an event is its index in the list.
#[derive(Debug, Clone, Default)]
pub struct EventCursor {
    events: Vec<Event>,
    index: usize,
}

impl EventCursor {
    /// Create a cursor positioned at the first event.
    pub fn new(events: Vec<Event>) -> EventCursor {
        EventCursor { events, index: 0 }
    }

    /// Move the cursor back to the first event.
    pub fn rewind(&mut self) {
        self.index = 0;
    }
}

impl From<Vec<Event>> for EventCursor {
    fn from(events: Vec<Event>) -> Self {
        EventCursor::new(events)
    }
}

impl EventReader for EventCursor {
    fn current(&self) -> Option<&Event> {
        self.events.get(self.index)
    }

    fn next(&mut self) {
        if self.index < self.events.len() {
            self.index += 1;
        }
    }

    fn position(&self) -> Option<usize> {
        Some(self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collector_replay() {
        let events = vec![
            Event::begin_array(Some(2)),
            Event::text("a"),
            Event::Null(SemanticTag::Undefined),
            Event::EndArray,
        ];
        let mut collector = EventCollector::new();
        replay(&events, &mut collector).unwrap();
        assert_eq!(collector.into_events(), events);
    }

    #[test]
    fn cursor_walk() {
        let mut cursor = EventCursor::from(vec![Event::uint(1), Event::Bool(true)]);
        assert_eq!(cursor.position(), Some(0));
        assert_eq!(cursor.current().map(Event::kind), Some(EventKind::Uint));
        cursor.next();
        assert_eq!(cursor.current(), Some(&Event::Bool(true)));
        cursor.next();
        assert!(cursor.done());
        // Advancing past the end is harmless.
        cursor.next();
        assert_eq!(cursor.position(), Some(2));
        cursor.rewind();
        assert!(!cursor.done());
    }

    #[test]
    fn event_display() {
        let bytes = Event::ByteString {
            bytes: vec![0xde, 0xad],
            hint: EncodingHint::Base16,
            tag: SemanticTag::None,
        };
        assert_eq!(bytes.to_string(), "h'dead'");
        assert_eq!(Event::Null(SemanticTag::Undefined).to_string(), "undefined");
        assert_eq!(Event::name("x").to_string(), "\"x\":");
        assert_eq!(EventKind::ByteString.to_string(), "ByteString");
    }
}
