//! This module contains code to validate a stream of events.
//!
//! Validation reads forward only: each rule consumes the events that make up
//! the value it matches, and nothing is ever rewound. Optional and repeated
//! entries decide whether to run by looking at the current event. If an
//! optional entry starts to match and then fails, the rest of the value it
//! started is skipped and validation carries on with the next entry.
//!
//! The recursion limit counts rule references only; nesting written out in
//! the CDDL text is bounded by the text itself.

use crate::context::LookupContext;
use crate::event::{Event, EventReader, SemanticTag};
use crate::rules::{GroupEntry, Literal, MapRule, PreludeType, Rule, RuleId};
use crate::util::{Mismatch, MismatchKind, ValidateError, ValidateResult};
use std::collections::BTreeSet;

// A Result that returns some temporary value.
type TempResult<T> = Result<T, ValidateError>;

#[derive(Clone)]
struct Context<'a> {
    lookup: &'a dyn LookupContext,
    // The innermost map key or user rule name; used to label mismatches.
    rule: &'a str,
    depth: u32,
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("rule", &self.rule)
            .field("depth", &self.depth)
            .finish()
    }
}

impl<'a> Context<'a> {
    // Set a maximum depth, to avoid infinite recursion in the case of
    // circular rule references.
    const MAX_DEPTH: u32 = 50;

    fn inc_depth(&self) -> TempResult<u32> {
        if self.depth >= Self::MAX_DEPTH {
            Err(ValidateError::Structural("hit recursion limit".into()))
        } else {
            Ok(self.depth + 1)
        }
    }

    // Create a Context one level deeper, with a new label.
    fn derive(&self, rule: &'a str) -> TempResult<Context<'a>> {
        Ok(Context {
            lookup: self.lookup,
            rule,
            depth: self.inc_depth()?,
        })
    }

    fn get(&self, id: RuleId) -> TempResult<&'a Rule> {
        let lookup: &'a dyn LookupContext = self.lookup;
        lookup.rule(id)
    }

    fn mismatch(&self, kind: MismatchKind, reader: &dyn EventReader) -> ValidateError {
        mismatch_at(kind, self.rule, reader)
    }
}

fn mismatch_at(kind: MismatchKind, rule: &str, reader: &dyn EventReader) -> ValidateError {
    ValidateError::Mismatch(Mismatch {
        kind,
        rule: rule.to_string(),
        found: reader.current().map(Event::kind),
        position: reader.position(),
    })
}

/// Validate the value at the front of `reader` against the named rule.
pub(crate) fn validate_events(
    lookup: &dyn LookupContext,
    name: &str,
    reader: &mut dyn EventReader,
) -> ValidateResult {
    let id = lookup.lookup_rule(name)?;
    let ctx = Context {
        lookup,
        rule: name,
        depth: 0,
    };
    tracing::trace!(rule = name, "validating");
    validate(id, reader, &ctx)
}

// This is the main validation dispatch function.
// It matches one rule against the reader, recursing as needed.
fn validate(id: RuleId, reader: &mut dyn EventReader, ctx: &Context) -> ValidateResult {
    let rule = ctx.get(id)?;
    tracing::trace!(id = id.index(), label = ctx.rule, found = ?reader.current().map(Event::kind), "validate");
    match rule {
        Rule::Prelude(p) => validate_prelude_type(*p, reader, ctx),
        Rule::Literal(l) => validate_literal(l, reader, ctx),
        Rule::Lookup(l) => {
            let target = l.target.ok_or_else(|| unresolved(&l.name))?;
            // Rules that name a structure take over the label; a rule that
            // is just another name for a prelude type keeps the key.
            let label = if ctx.lookup.rule(target).map_or(false, Rule::is_terminal) {
                ctx.rule
            } else {
                l.name.as_str()
            };
            validate(target, reader, &ctx.derive(label)?)
        }
        Rule::Array(entries) => validate_array(entries, reader, ctx),
        Rule::Map(map) => validate_map(map, reader, ctx),
        Rule::Group(entries) => validate_entries(entries, reader, ctx),
        Rule::Choice(_) => Err(ValidateError::Unsupported("choice".into())),
        Rule::Range(_) => Err(ValidateError::Unsupported("range".into())),
    }
}

fn unresolved(name: &str) -> ValidateError {
    ValidateError::Structural(format!("unresolved rule {}", name))
}

fn prelude_matches(p: PreludeType, event: &Event) -> bool {
    match (p, event) {
        (PreludeType::Any, event) => starts_value(event),
        (PreludeType::Nil, Event::Null(tag)) => *tag != SemanticTag::Undefined,
        (PreludeType::Bool, Event::Bool(_)) => true,
        (PreludeType::Int, Event::Int { .. }) => true,
        (PreludeType::Int, Event::Uint { .. }) => true,
        (PreludeType::Uint, Event::Uint { .. }) => true,
        (PreludeType::Uint, Event::Int { value, .. }) => *value >= 0,
        (PreludeType::Nint, Event::Int { value, .. }) => *value < 0,
        (PreludeType::Float, Event::Double { .. }) => true,
        (PreludeType::Tstr, Event::String { .. }) => true,
        (PreludeType::Bstr, Event::ByteString { .. }) => true,
        _ => false,
    }
}

fn prelude_mismatch(p: PreludeType) -> MismatchKind {
    match p {
        PreludeType::Any => MismatchKind::ExpectedValue,
        PreludeType::Nil => MismatchKind::ExpectedNil,
        PreludeType::Bool => MismatchKind::ExpectedBool,
        PreludeType::Int => MismatchKind::ExpectedInt,
        PreludeType::Uint => MismatchKind::ExpectedUint,
        PreludeType::Nint => MismatchKind::ExpectedNint,
        PreludeType::Float => MismatchKind::ExpectedFloat,
        PreludeType::Tstr => MismatchKind::ExpectedTstr,
        PreludeType::Bstr => MismatchKind::ExpectedBstr,
    }
}

fn validate_prelude_type(
    p: PreludeType,
    reader: &mut dyn EventReader,
    ctx: &Context,
) -> ValidateResult {
    if p == PreludeType::Any {
        return skip_value(reader, ctx);
    }
    match reader.current() {
        Some(event) if prelude_matches(p, event) => {
            reader.next();
            Ok(())
        }
        _ => Err(ctx.mismatch(prelude_mismatch(p), reader)),
    }
}

fn literal_matches(literal: &Literal, event: &Event) -> bool {
    match (literal, event) {
        (Literal::Bool(l), Event::Bool(b)) => l == b,
        (Literal::Uint(l), Event::Uint { value, .. }) => l == value,
        (Literal::Uint(l), Event::Int { value, .. }) => u64::try_from(*value) == Ok(*l),
        (Literal::Nint(l), Event::Int { value, .. }) => l == value,
        (Literal::Float(l), Event::Double { value, .. }) => l == value,
        (Literal::Text(l), Event::String { text, .. }) => l == text,
        _ => false,
    }
}

fn literal_mismatch(literal: &Literal) -> MismatchKind {
    match literal {
        Literal::Bool(_) => MismatchKind::ExpectedBool,
        Literal::Uint(_) => MismatchKind::ExpectedUint,
        Literal::Nint(_) => MismatchKind::ExpectedNint,
        Literal::Float(_) => MismatchKind::ExpectedFloat,
        Literal::Text(_) => MismatchKind::ExpectedTstr,
    }
}

fn validate_literal(literal: &Literal, reader: &mut dyn EventReader, ctx: &Context) -> ValidateResult {
    match reader.current() {
        Some(event) if literal_matches(literal, event) => {
            reader.next();
            Ok(())
        }
        _ => Err(ctx.mismatch(literal_mismatch(literal), reader)),
    }
}

// Returns true if this event can begin a value.
fn starts_value(event: &Event) -> bool {
    !matches!(
        event,
        Event::EndArray | Event::EndObject | Event::Name(_)
    )
}

/// Consume one complete value, whatever it is.
///
/// Containers are skipped as a whole, including any keys inside them.
fn skip_value(reader: &mut dyn EventReader, ctx: &Context) -> ValidateResult {
    let mut open = 0usize;
    loop {
        match reader.current() {
            None if open == 0 => return Err(ctx.mismatch(MismatchKind::ExpectedValue, reader)),
            None => return Err(ctx.mismatch(MismatchKind::UnexpectedEnd, reader)),
            Some(Event::BeginArray { .. }) | Some(Event::BeginObject { .. }) => open += 1,
            Some(Event::EndArray) | Some(Event::EndObject) => {
                if open == 0 {
                    return Err(ctx.mismatch(MismatchKind::ExpectedValue, reader));
                }
                open -= 1;
            }
            Some(Event::Name(_)) if open == 0 => {
                return Err(ctx.mismatch(MismatchKind::ExpectedValue, reader))
            }
            Some(_) => {}
        }
        reader.next();
        if open == 0 {
            return Ok(());
        }
    }
}

/// Returns `true` if the rule could begin matching at this event.
///
/// Only the first event is examined, so a `true` answer doesn't promise
/// that validation will succeed.
fn accepts(id: RuleId, event: Option<&Event>, ctx: &Context, depth: u32) -> TempResult<bool> {
    let event = match event {
        Some(event) => event,
        None => return Ok(false),
    };
    if depth >= Context::MAX_DEPTH {
        return Err(ValidateError::Structural("hit recursion limit".into()));
    }
    let answer = match ctx.get(id)? {
        Rule::Prelude(p) => prelude_matches(*p, event),
        Rule::Literal(l) => literal_matches(l, event),
        Rule::Lookup(l) => {
            let target = l.target.ok_or_else(|| unresolved(&l.name))?;
            accepts(target, Some(event), ctx, depth + 1)?
        }
        Rule::Array(_) => matches!(event, Event::BeginArray { .. }),
        Rule::Map(_) => matches!(event, Event::BeginObject { .. }),
        Rule::Group(entries) => {
            let mut answer = false;
            for entry in entries {
                // Let validation report the unsupported occurrence.
                if !entry.occur.is_basic() || accepts(entry.rule, Some(event), ctx, depth)? {
                    answer = true;
                    break;
                }
                if entry.occur.min > 0 {
                    break;
                }
            }
            answer
        }
        // Let validation report these as unsupported.
        Rule::Choice(_) | Rule::Range(_) => starts_value(event),
    };
    Ok(answer)
}

// Apply each entry in order.
fn validate_entries(
    entries: &[GroupEntry],
    reader: &mut dyn EventReader,
    ctx: &Context,
) -> ValidateResult {
    for entry in entries {
        validate_entry(entry, reader, ctx)?;
    }
    Ok(())
}

fn validate_entry(entry: &GroupEntry, reader: &mut dyn EventReader, ctx: &Context) -> ValidateResult {
    let occur = entry.occur;
    if !occur.is_basic() {
        return Err(ValidateError::Unsupported(format!("occurrence {}", occur)));
    }
    let label = entry.key.as_deref().unwrap_or(ctx.rule);
    let ctx = Context {
        lookup: ctx.lookup,
        rule: label,
        depth: ctx.depth,
    };

    let mut count = 0;
    while count < occur.max {
        let optional = count >= occur.min;
        if optional && !accepts(entry.rule, reader.current(), &ctx, ctx.depth)? {
            if count == 0 {
                tracing::debug!(label, "skipping optional entry");
            }
            break;
        }
        let before = reader.position();
        if optional {
            let mut tracked = OpenCount::new(&mut *reader);
            match validate(entry.rule, &mut tracked, &ctx) {
                Ok(()) => {}
                Err(ValidateError::Mismatch(m)) => {
                    tracing::debug!(label, mismatch = %m, "skipping failed optional entry");
                    return tracked.close(&ctx);
                }
                Err(e) => return Err(e),
            }
        } else {
            validate(entry.rule, reader, &ctx)?;
        }
        count += 1;
        // A match that consumed nothing would repeat forever.
        if before.is_some() && reader.position() == before {
            break;
        }
    }
    Ok(())
}

// Passes events through, counting the containers opened since it was
// created and not yet closed.
struct OpenCount<'r> {
    reader: &'r mut dyn EventReader,
    open: usize,
}

impl<'r> OpenCount<'r> {
    fn new(reader: &'r mut dyn EventReader) -> OpenCount<'r> {
        OpenCount { reader, open: 0 }
    }

    // Skip to the end of whatever containers are still open.
    fn close(&mut self, ctx: &Context) -> ValidateResult {
        while self.open > 0 {
            if self.current().is_none() {
                return Err(ctx.mismatch(MismatchKind::UnexpectedEnd, &*self));
            }
            self.next();
        }
        Ok(())
    }
}

impl EventReader for OpenCount<'_> {
    fn current(&self) -> Option<&Event> {
        self.reader.current()
    }

    fn next(&mut self) {
        match self.reader.current() {
            Some(Event::BeginArray { .. }) | Some(Event::BeginObject { .. }) => self.open += 1,
            Some(Event::EndArray) | Some(Event::EndObject) => {
                self.open = self.open.saturating_sub(1)
            }
            _ => {}
        }
        self.reader.next();
    }

    fn position(&self) -> Option<usize> {
        self.reader.position()
    }
}

fn validate_array(
    entries: &[GroupEntry],
    reader: &mut dyn EventReader,
    ctx: &Context,
) -> ValidateResult {
    match reader.current() {
        Some(Event::BeginArray { .. }) => reader.next(),
        _ => return Err(ctx.mismatch(MismatchKind::ExpectedArray, reader)),
    }
    validate_entries(entries, reader, ctx)?;

    // Anything the entries didn't claim is skipped.
    loop {
        match reader.current() {
            None => return Err(ctx.mismatch(MismatchKind::UnexpectedEnd, reader)),
            Some(Event::EndArray) => {
                reader.next();
                return Ok(());
            }
            Some(_) => {
                tracing::trace!(label = ctx.rule, "skipping extra array element");
                skip_value(reader, ctx)?;
            }
        }
    }
}

fn validate_map(map: &MapRule, reader: &mut dyn EventReader, ctx: &Context) -> ValidateResult {
    match reader.current() {
        Some(Event::BeginObject { .. }) => reader.next(),
        _ => return Err(ctx.mismatch(MismatchKind::ExpectedMap, reader)),
    }
    if let Some(what) = &map.unsupported {
        return Err(ValidateError::Unsupported(what.clone()));
    }
    let mut seen: BTreeSet<&str> = BTreeSet::new();

    loop {
        let key = match reader.current() {
            None => return Err(ctx.mismatch(MismatchKind::UnexpectedEnd, reader)),
            Some(Event::EndObject) => break,
            Some(Event::Name(key)) => key,
            Some(_) => return Err(ctx.mismatch(MismatchKind::ExpectedName, reader)),
        };
        let (key, member) = match map.index.get_key_value(key.as_str()) {
            Some(found) => found,
            None => {
                let key = key.clone();
                return Err(mismatch_at(MismatchKind::UnknownKey, &key, reader));
            }
        };
        if !member.occur.is_basic() {
            return Err(ValidateError::Unsupported(format!("occurrence {}", member.occur)));
        }
        if !seen.insert(key.as_str()) && member.occur.max == 1 {
            tracing::debug!(key = key.as_str(), "repeated map key");
        }
        reader.next();
        let member_ctx = Context {
            lookup: ctx.lookup,
            rule: key.as_str(),
            depth: ctx.depth,
        };
        validate(member.rule, reader, &member_ctx)?;
    }

    for (key, member) in &map.index {
        if member.occur.min > 0 && !seen.contains(key.as_str()) {
            return Err(mismatch_at(MismatchKind::MissingKey, key, reader));
        }
    }
    // Step past the EndObject.
    reader.next();
    Ok(())
}
