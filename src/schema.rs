//! A compiled CDDL document, ready for validation.
//!

use crate::event::EventReader;
use crate::link::link_all;
use crate::parser::{parse_rules, ParseError};
use crate::rules::RuleDictionary;
use crate::util::ValidateResult;
use crate::validate::validate_events;

/// A parsed and linked CDDL document.
///
/// The root rule is the first rule in the document. A specification is
/// immutable once built, so it can be shared between threads and used by
/// any number of validations at once.
///
/// ```
/// use cbor_cddl::{parse_cddl, Event, EventCursor};
///
/// let spec = parse_cddl("point = [x: int, y: int]").unwrap();
/// let mut reader = EventCursor::new(vec![
///     Event::begin_array(Some(2)),
///     Event::int(3),
///     Event::int(-4),
///     Event::EndArray,
/// ]);
/// spec.validate(&mut reader).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct CddlSpecification {
    dictionary: RuleDictionary,
    root: String,
}

impl CddlSpecification {
    /// Parse and link a CDDL document.
    pub fn parse(input: &str) -> Result<CddlSpecification, ParseError> {
        let dictionary = parse_rules(input)?;
        // parse_rules refuses documents without rules.
        let root = dictionary.first_rule().unwrap_or_default().to_string();
        let mut spec = CddlSpecification { dictionary, root };
        spec.link()?;
        Ok(spec)
    }

    /// Resolve rule references and index map keys.
    ///
    /// [`parse`](Self::parse) already does this; calling it again changes
    /// nothing.
    pub fn link(&mut self) -> Result<(), ParseError> {
        link_all(&mut self.dictionary)
    }

    /// The name of the root rule.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// The compiled rules.
    pub fn dictionary(&self) -> &RuleDictionary {
        &self.dictionary
    }

    /// Validate the next value in `reader` against the root rule.
    pub fn validate(&self, reader: &mut dyn EventReader) -> ValidateResult {
        validate_events(&self.dictionary, &self.root, reader)
    }

    /// Validate the next value in `reader` against the named rule.
    pub fn validate_named(&self, name: &str, reader: &mut dyn EventReader) -> ValidateResult {
        validate_events(&self.dictionary, name, reader)
    }
}
