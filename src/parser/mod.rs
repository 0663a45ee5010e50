//! This module contains the CDDL parser.
//!
//! The parser is a pushdown automaton. It looks at one character at a time
//! and dispatches on the state at the top of its stack; each state either
//! consumes the character or hands it to another state without consuming
//! it. Every stack entry carries the closing delimiter of the innermost
//! container, so a state deep inside a group knows which character ends it.
//!
//! As pieces of the grammar are recognized they are handed to a
//! `RuleBuilder`, which adds rules to a [`RuleDictionary`]. Names are left
//! unresolved; [`parse_cddl`] runs the link pass before returning.
//!
//! # Examples
//!
//! ```
//! use cbor_cddl::parse_cddl;
//!
//! let schema = parse_cddl("person = { name: tstr, ? age: uint }").unwrap();
//! assert_eq!(schema.root(), "person");
//!
//! let err = parse_cddl("person = { name: tstr age: uint }").unwrap_err();
//! assert_eq!(
//!     err.to_string(),
//!     "Expected , or ( or } at line 1 and column 23"
//! );
//! ```

mod parse_err;

pub use parse_err::{ErrorKind, ParseError, Position};

use crate::rules::{
    GroupEntry, Literal, Lookup, MapRule, Occur, Range, Rule, RuleDictionary, RuleId,
};
use crate::schema::CddlSpecification;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum State {
    ExpectRule,
    Id,
    ExpectAssign,
    ExpectGroupent,
    ArrayDefinition,
    ArrayDefinition2,
    MapDefinition,
    MapDefinition2,
    Group,
    Group2,
    ExpectOccurOrMemberkey,
    Occur,
    ExpectMemberkey,
    ExpectColonOrCommaOrDelimiter,
    ExpectValue,
    Value,
    QuotedValue,
    Minus,
    Digit1,
    ZeroDigit,
    HexNumberValue,
    Fraction,
    PlusMinusExponent,
    Exponent,
    ExpectRangeopOrSlashOrCommaOrDelimiter,
    ExpectRangeop,
    ExpectExclusiveOrInclusiveRangeop,
}

impl State {
    // States that sit between tokens, where whitespace and comments are
    // skipped.
    fn skips_trivia(self) -> bool {
        use State::*;
        matches!(
            self,
            ExpectRule
                | ExpectAssign
                | ExpectGroupent
                | ArrayDefinition
                | ArrayDefinition2
                | MapDefinition
                | MapDefinition2
                | Group
                | Group2
                | ExpectOccurOrMemberkey
                | ExpectMemberkey
                | ExpectColonOrCommaOrDelimiter
                | ExpectValue
                | ExpectRangeopOrSlashOrCommaOrDelimiter
        )
    }
}

#[derive(Debug, Copy, Clone)]
struct StateItem {
    state: State,
    delimiter: Option<char>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ContainerKind {
    Array,
    Map,
    Group,
}

impl ContainerKind {
    fn open_state(self) -> State {
        match self {
            ContainerKind::Array => State::ArrayDefinition,
            ContainerKind::Map => State::MapDefinition,
            ContainerKind::Group => State::Group,
        }
    }

    fn next_state(self) -> State {
        match self {
            ContainerKind::Array => State::ArrayDefinition2,
            ContainerKind::Map => State::MapDefinition2,
            ContainerKind::Group => State::Group2,
        }
    }

    fn missing_separator(self) -> ErrorKind {
        match self {
            ContainerKind::Array => ErrorKind::ExpectedCommaOrLeftParOrRightSqBracket,
            ContainerKind::Map => ErrorKind::ExpectedCommaOrLeftParOrRightCurBracket,
            ContainerKind::Group => ErrorKind::ExpectedCommaOrRightPar,
        }
    }
}

// A token that may turn out to be either a member key or a value,
// depending on whether a `:` follows it.
#[derive(Debug)]
enum Atom {
    Id(String, Position),
    Text(String),
    Number(Literal, String),
}

impl Atom {
    fn into_key(self) -> String {
        match self {
            Atom::Id(name, _) => name,
            Atom::Text(text) => text,
            Atom::Number(_, text) => text,
        }
    }
}

#[derive(Debug)]
enum Frame {
    Container {
        kind: ContainerKind,
        entries: Vec<GroupEntry>,
    },
    Entry {
        occur: Occur,
        key: Option<String>,
        // Alternatives of a type choice, in order.
        operands: Vec<RuleId>,
        // Set after a range operator: `Some(true)` for `..`.
        range: Option<bool>,
    },
}

// Collects reductions from the parser into rules.
#[derive(Debug)]
struct RuleBuilder {
    dict: RuleDictionary,
    frames: Vec<Frame>,
    rule_name: Option<String>,
}

// Frames arrive in an order the parser guarantees; this is the error for
// any reduction that finds the wrong frame on top.
const MISPLACED: ErrorKind = ErrorKind::ExpectedGroupent;

impl RuleBuilder {
    fn new() -> RuleBuilder {
        RuleBuilder {
            dict: RuleDictionary::new(),
            frames: Vec::new(),
            rule_name: None,
        }
    }

    fn begin_rule(&mut self, name: String) -> Result<(), ErrorKind> {
        if self.dict.is_defined(&name) {
            return Err(ErrorKind::DuplicateRuleId);
        }
        self.rule_name = Some(name);
        Ok(())
    }

    fn begin_entry(&mut self) {
        self.frames.push(Frame::Entry {
            occur: Occur::ONCE,
            key: None,
            operands: Vec::new(),
            range: None,
        });
    }

    fn set_occur(&mut self, new_occur: Occur) -> Result<(), ErrorKind> {
        match self.frames.last_mut() {
            Some(Frame::Entry { occur, .. }) => {
                *occur = new_occur;
                Ok(())
            }
            _ => Err(MISPLACED),
        }
    }

    fn set_key(&mut self, new_key: String) -> Result<(), ErrorKind> {
        match self.frames.last_mut() {
            Some(Frame::Entry { key, .. }) => {
                *key = Some(new_key);
                Ok(())
            }
            _ => Err(MISPLACED),
        }
    }

    fn begin_container(&mut self, kind: ContainerKind) {
        tracing::trace!(?kind, "begin container");
        self.frames.push(Frame::Container {
            kind,
            entries: Vec::new(),
        });
    }

    fn end_container(&mut self) -> Result<(), ErrorKind> {
        let (kind, entries) = match self.frames.pop() {
            Some(Frame::Container { kind, entries }) => (kind, entries),
            _ => return Err(MISPLACED),
        };
        let rule = match kind {
            ContainerKind::Array => Rule::Array(entries),
            ContainerKind::Map => Rule::Map(MapRule::new(entries)),
            ContainerKind::Group => Rule::Group(entries),
        };
        let id = self.dict.insert(rule);
        tracing::trace!(?kind, id = id.index(), "end container");
        self.operand(id)
    }

    fn atom(&mut self, atom: Atom) -> Result<(), ErrorKind> {
        let rule = match atom {
            Atom::Id(name, pos) => Rule::Lookup(Lookup {
                name,
                target: None,
                pos,
            }),
            Atom::Text(text) => Rule::Literal(Literal::Text(text)),
            Atom::Number(literal, _) => Rule::Literal(literal),
        };
        let id = self.dict.insert(rule);
        self.operand(id)
    }

    fn operand(&mut self, id: RuleId) -> Result<(), ErrorKind> {
        match self.frames.last_mut() {
            Some(Frame::Entry {
                operands, range, ..
            }) => {
                let id = match range.take() {
                    Some(inclusive) => {
                        let start = operands.pop().ok_or(MISPLACED)?;
                        self.dict.insert(Rule::Range(Range {
                            start,
                            end: id,
                            inclusive,
                        }))
                    }
                    None => id,
                };
                operands.push(id);
                Ok(())
            }
            _ => Err(MISPLACED),
        }
    }

    fn range(&mut self, inclusive: bool) -> Result<(), ErrorKind> {
        match self.frames.last_mut() {
            Some(Frame::Entry {
                operands, range, ..
            }) if range.is_none() && !operands.is_empty() => {
                *range = Some(inclusive);
                Ok(())
            }
            _ => Err(ErrorKind::ExpectedSlashOrCommaOrRightBracket),
        }
    }

    fn end_entry(&mut self) -> Result<(), ErrorKind> {
        let (occur, key, mut operands) = match self.frames.pop() {
            Some(Frame::Entry {
                occur,
                key,
                operands,
                range: None,
            }) => (occur, key, operands),
            _ => return Err(MISPLACED),
        };
        let rule = match operands.len() {
            0 => return Err(MISPLACED),
            1 => operands.remove(0),
            _ => self.dict.insert(Rule::Choice(operands)),
        };
        match self.frames.last_mut() {
            Some(Frame::Container { entries, .. }) => {
                entries.push(GroupEntry { occur, key, rule });
                Ok(())
            }
            Some(Frame::Entry { .. }) => Err(MISPLACED),
            None => {
                let name = self.rule_name.take().ok_or(ErrorKind::ExpectedId)?;
                if !self.dict.define(&name, rule) {
                    return Err(ErrorKind::DuplicateRuleId);
                }
                tracing::debug!(rule = %name, id = rule.index(), "defined rule");
                Ok(())
            }
        }
    }
}

fn is_ealpha(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '@' || c == '_' || c == '$'
}

fn is_id_char(c: char) -> bool {
    is_ealpha(c) || c.is_ascii_digit() || c == '-' || c == '.'
}

fn starts_value(c: char) -> bool {
    is_ealpha(c) || c.is_ascii_digit() || matches!(c, '-' | '"' | '[' | '{' | '(')
}

fn int_literal(negative: bool, value: u64) -> Option<Literal> {
    if !negative || value == 0 {
        Some(Literal::Uint(value))
    } else {
        i64::try_from(-i128::from(value)).ok().map(Literal::Nint)
    }
}

// Convert the text of a number token to a literal value.
fn parse_number(text: &str) -> Option<Literal> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(body) => (true, body),
        None => (false, text),
    };
    if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        let value = u64::from_str_radix(hex, 16).ok()?;
        return int_literal(negative, value);
    }
    if body.contains(|c| matches!(c, '.' | 'e' | 'E')) {
        return text.parse::<f64>().ok().map(Literal::Float);
    }
    int_literal(negative, body.parse().ok()?)
}

struct Parser {
    chars: Vec<char>,
    index: usize,
    pos: Position,
    stack: Vec<StateItem>,
    // Text of the token being read.
    buffer: String,
    token_pos: Position,
    pending: Option<Atom>,
    occur_min: Option<u32>,
    builder: RuleBuilder,
}

impl Parser {
    fn new(input: &str) -> Parser {
        Parser {
            chars: input.chars().collect(),
            index: 0,
            pos: Position::default(),
            stack: vec![StateItem {
                state: State::ExpectRule,
                delimiter: None,
            }],
            buffer: String::new(),
            token_pos: Position::default(),
            pending: None,
            occur_min: None,
            builder: RuleBuilder::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.index + 1).copied()
    }

    fn advance(&mut self) {
        match self.peek() {
            Some('\n') => {
                self.pos.line += 1;
                self.pos.column = 1;
            }
            // A CR that starts a CRLF pair doesn't take a column.
            Some('\r') if self.peek_next() == Some('\n') => {}
            Some(_) => self.pos.column += 1,
            None => return,
        }
        self.index += 1;
    }

    // Consume one char into the token buffer.
    fn take(&mut self, c: char) {
        self.buffer.push(c);
        self.advance();
    }

    fn start_token(&mut self) {
        self.buffer.clear();
        self.token_pos = self.pos;
    }

    fn replace(&mut self, state: State) {
        if let Some(top) = self.stack.last_mut() {
            top.state = state;
        }
    }

    fn replace_with(&mut self, state: State, delimiter: Option<char>) {
        if let Some(top) = self.stack.last_mut() {
            *top = StateItem { state, delimiter };
        }
    }

    // Push a state that inherits the current delimiter.
    fn push(&mut self, state: State) {
        let delimiter = self.stack.last().and_then(|top| top.delimiter);
        self.stack.push(StateItem { state, delimiter });
    }

    fn pop(&mut self) {
        self.stack.pop();
    }

    fn error(&self, kind: ErrorKind) -> ParseError {
        ParseError::new(kind, self.pos)
    }

    // Skip one whitespace character, or one comment up to the end of the
    // line. Returns `false` if `c` starts neither.
    fn skip_trivia(&mut self, c: char) -> bool {
        if c.is_whitespace() {
            self.advance();
            true
        } else if c == ';' {
            while let Some(c) = self.peek() {
                if c == '\n' {
                    break;
                }
                self.advance();
            }
            true
        } else {
            false
        }
    }

    // Digits followed by `*` mean an occurrence like `1*3`, not a value.
    fn numbered_occur_ahead(&self) -> bool {
        let rest = &self.chars[self.index..];
        let digits = rest.iter().take_while(|c| c.is_ascii_digit()).count();
        rest.get(digits) == Some(&'*')
    }

    fn flush_pending(&mut self) -> Result<(), ParseError> {
        if let Some(atom) = self.pending.take() {
            self.builder.atom(atom).map_err(|k| self.error(k))?;
        }
        Ok(())
    }

    fn end_entry(&mut self) -> Result<(), ParseError> {
        self.builder.end_entry().map_err(|k| self.error(k))?;
        self.pop();
        Ok(())
    }

    fn finish_id(&mut self) -> Result<String, ParseError> {
        if self.buffer.ends_with(|c| c == '-' || c == '.') {
            return Err(self.error(ErrorKind::InvalidId));
        }
        Ok(std::mem::take(&mut self.buffer))
    }

    fn finish_number(&mut self) -> Result<(), ParseError> {
        if !self.buffer.ends_with(|c: char| c.is_ascii_hexdigit()) {
            return Err(self.error(ErrorKind::InvalidNumber));
        }
        let text = std::mem::take(&mut self.buffer);
        let literal = parse_number(&text).ok_or_else(|| self.error(ErrorKind::InvalidNumber))?;
        self.pending = Some(Atom::Number(literal, text));
        self.pop();
        Ok(())
    }

    fn finish_occur(&mut self) -> Result<(), ParseError> {
        let max = if self.buffer.is_empty() {
            u32::MAX
        } else {
            self.buffer
                .parse()
                .map_err(|_| self.error(ErrorKind::InvalidNumber))?
        };
        let min = self.occur_min.take().unwrap_or(0);
        self.buffer.clear();
        self.builder
            .set_occur(Occur { min, max })
            .map_err(|k| self.error(k))?;
        self.replace(State::ExpectMemberkey);
        Ok(())
    }

    fn run(mut self) -> Result<RuleDictionary, ParseError> {
        while let Some(item) = self.stack.last().copied() {
            self.step(item, self.peek())?;
        }
        if self.builder.dict.first_rule().is_none() {
            return Err(self.error(ErrorKind::UnexpectedEof));
        }
        Ok(self.builder.dict)
    }

    fn step(&mut self, item: StateItem, c: Option<char>) -> Result<(), ParseError> {
        if item.state == State::ExpectRangeopOrSlashOrCommaOrDelimiter {
            self.flush_pending()?;
        }
        if let Some(ch) = c {
            if item.state.skips_trivia() && self.skip_trivia(ch) {
                return Ok(());
            }
        }

        match item.state {
            State::ExpectRule => match c {
                None => self.pop(),
                Some(c) if is_ealpha(c) => {
                    self.start_token();
                    self.replace(State::ExpectAssign);
                    self.push(State::Id);
                }
                Some(_) => return Err(self.error(ErrorKind::ExpectedId)),
            },
            State::Id => match c {
                Some(c) if is_id_char(c) => self.take(c),
                _ => {
                    let name = self.finish_id()?;
                    self.builder
                        .begin_rule(name)
                        .map_err(|k| ParseError::new(k, self.token_pos))?;
                    self.pop();
                }
            },
            State::ExpectAssign => match c {
                None => return Err(self.error(ErrorKind::UnexpectedEof)),
                Some('=') => {
                    self.advance();
                    self.replace(State::ExpectGroupent);
                }
                Some(_) => return Err(self.error(ErrorKind::ExpectedAssign)),
            },
            State::ExpectGroupent => match c {
                None => return Err(self.error(ErrorKind::UnexpectedEof)),
                Some(c) if starts_value(c) => {
                    self.builder.begin_entry();
                    self.replace(State::ExpectRule);
                    self.push(State::ExpectRangeopOrSlashOrCommaOrDelimiter);
                    self.push(State::ExpectValue);
                }
                Some(_) => return Err(self.error(ErrorKind::ExpectedGroupent)),
            },
            State::ArrayDefinition | State::MapDefinition | State::Group => {
                let kind = match item.state {
                    State::ArrayDefinition => ContainerKind::Array,
                    State::MapDefinition => ContainerKind::Map,
                    _ => ContainerKind::Group,
                };
                match c {
                    None => return Err(self.error(ErrorKind::UnexpectedEof)),
                    Some(c) if Some(c) == item.delimiter => {
                        self.advance();
                        self.builder.end_container().map_err(|k| self.error(k))?;
                        self.pop();
                    }
                    Some(_) => {
                        self.builder.begin_entry();
                        self.replace(kind.next_state());
                        self.push(State::ExpectOccurOrMemberkey);
                    }
                }
            }
            State::ArrayDefinition2 | State::MapDefinition2 | State::Group2 => {
                let kind = match item.state {
                    State::ArrayDefinition2 => ContainerKind::Array,
                    State::MapDefinition2 => ContainerKind::Map,
                    _ => ContainerKind::Group,
                };
                match c {
                    None => return Err(self.error(ErrorKind::UnexpectedEof)),
                    Some(',') => {
                        self.advance();
                        self.replace(kind.open_state());
                    }
                    Some(c) if Some(c) == item.delimiter => {
                        self.advance();
                        self.builder.end_container().map_err(|k| self.error(k))?;
                        self.pop();
                    }
                    // A parenthesized group may follow without a comma.
                    Some('(') => self.replace(kind.open_state()),
                    Some(_) => return Err(self.error(kind.missing_separator())),
                }
            }
            State::ExpectOccurOrMemberkey => match c {
                None => return Err(self.error(ErrorKind::UnexpectedEof)),
                Some('?') => {
                    self.advance();
                    self.builder
                        .set_occur(Occur::OPTIONAL)
                        .map_err(|k| self.error(k))?;
                    self.replace(State::ExpectMemberkey);
                }
                Some('+') => {
                    self.advance();
                    self.builder
                        .set_occur(Occur::ONE_OR_MORE)
                        .map_err(|k| self.error(k))?;
                    self.replace(State::ExpectMemberkey);
                }
                Some('*') => {
                    self.advance();
                    self.buffer.clear();
                    self.occur_min = Some(0);
                    self.replace(State::Occur);
                }
                Some(c) if c.is_ascii_digit() && self.numbered_occur_ahead() => {
                    self.buffer.clear();
                    self.occur_min = None;
                    self.replace(State::Occur);
                }
                Some(_) => self.replace(State::ExpectMemberkey),
            },
            State::Occur => match c {
                Some(c) if c.is_ascii_digit() => self.take(c),
                Some('*') if self.occur_min.is_none() => {
                    let min = self
                        .buffer
                        .parse()
                        .map_err(|_| self.error(ErrorKind::InvalidNumber))?;
                    self.occur_min = Some(min);
                    self.buffer.clear();
                    self.advance();
                }
                _ => self.finish_occur()?,
            },
            State::ExpectMemberkey => match c {
                None => return Err(self.error(ErrorKind::UnexpectedEof)),
                Some('[') | Some('{') | Some('(') => {
                    self.replace(State::ExpectRangeopOrSlashOrCommaOrDelimiter);
                    self.push(State::ExpectValue);
                }
                Some(c) if starts_value(c) => {
                    self.replace(State::ExpectColonOrCommaOrDelimiter);
                    self.push(State::ExpectValue);
                }
                Some(_) => return Err(self.error(ErrorKind::ExpectedGroupent)),
            },
            State::ExpectColonOrCommaOrDelimiter => match c {
                Some(':') => {
                    self.advance();
                    let atom = self.pending.take().ok_or_else(|| self.error(MISPLACED))?;
                    self.builder
                        .set_key(atom.into_key())
                        .map_err(|k| self.error(k))?;
                    self.replace(State::ExpectRangeopOrSlashOrCommaOrDelimiter);
                    self.push(State::ExpectValue);
                }
                _ => self.replace(State::ExpectRangeopOrSlashOrCommaOrDelimiter),
            },
            State::ExpectValue => match c {
                None => return Err(self.error(ErrorKind::UnexpectedEof)),
                Some(c) if is_ealpha(c) => {
                    self.start_token();
                    self.replace(State::Value);
                }
                Some('"') => {
                    self.start_token();
                    self.advance();
                    self.replace(State::QuotedValue);
                }
                Some('-') => {
                    self.start_token();
                    self.take('-');
                    self.replace(State::Minus);
                }
                Some('0') => {
                    self.start_token();
                    self.take('0');
                    self.replace(State::ZeroDigit);
                }
                Some(c) if c.is_ascii_digit() => {
                    self.start_token();
                    self.take(c);
                    self.replace(State::Digit1);
                }
                Some('[') => {
                    self.advance();
                    self.builder.begin_container(ContainerKind::Array);
                    self.replace_with(State::ArrayDefinition, Some(']'));
                }
                Some('{') => {
                    self.advance();
                    self.builder.begin_container(ContainerKind::Map);
                    self.replace_with(State::MapDefinition, Some('}'));
                }
                Some('(') => {
                    self.advance();
                    self.builder.begin_container(ContainerKind::Group);
                    self.replace_with(State::Group, Some(')'));
                }
                Some(_) => return Err(self.error(ErrorKind::ExpectedGroupent)),
            },
            State::Value => match c {
                Some(c) if is_id_char(c) => self.take(c),
                _ => {
                    let name = self.finish_id()?;
                    self.pending = Some(Atom::Id(name, self.token_pos));
                    self.pop();
                }
            },
            State::QuotedValue => match c {
                None => return Err(self.error(ErrorKind::UnexpectedEof)),
                Some('"') => {
                    self.advance();
                    let text = escape8259::unescape(&self.buffer)
                        .map_err(|_| ParseError::new(ErrorKind::InvalidText, self.token_pos))?;
                    self.buffer.clear();
                    self.pending = Some(Atom::Text(text));
                    self.pop();
                }
                // Keep escapes intact for unescape(), including \".
                Some('\\') => {
                    self.take('\\');
                    if let Some(escaped) = self.peek() {
                        self.take(escaped);
                    }
                }
                Some(c) => self.take(c),
            },
            State::Minus => match c {
                Some('0') => {
                    self.take('0');
                    self.replace(State::ZeroDigit);
                }
                Some(c) if c.is_ascii_digit() => {
                    self.take(c);
                    self.replace(State::Digit1);
                }
                _ => return Err(self.error(ErrorKind::InvalidNumber)),
            },
            State::ZeroDigit => match c {
                Some('x') | Some('X') => {
                    self.take('x');
                    self.replace(State::HexNumberValue);
                }
                Some(c) if c.is_ascii_digit() => return Err(self.error(ErrorKind::InvalidNumber)),
                _ => self.after_integer(c)?,
            },
            State::Digit1 => match c {
                Some(c) if c.is_ascii_digit() => self.take(c),
                _ => self.after_integer(c)?,
            },
            State::Fraction => match c {
                Some(c) if c.is_ascii_digit() => self.take(c),
                Some(c) if (c == 'e' || c == 'E') && !self.buffer.ends_with('.') => {
                    self.take(c);
                    self.replace(State::PlusMinusExponent);
                }
                _ => self.finish_number()?,
            },
            State::PlusMinusExponent => match c {
                Some(c) if c == '+' || c == '-' => {
                    self.take(c);
                    self.replace(State::Exponent);
                }
                _ => self.replace(State::Exponent),
            },
            State::Exponent => match c {
                Some(c) if c.is_ascii_digit() => self.take(c),
                _ => {
                    if !self.buffer.ends_with(|c: char| c.is_ascii_digit()) {
                        return Err(self.error(ErrorKind::InvalidNumber));
                    }
                    self.finish_number()?
                }
            },
            State::HexNumberValue => match c {
                Some(c) if c.is_ascii_hexdigit() => self.take(c),
                _ => self.finish_number()?,
            },
            State::ExpectRangeopOrSlashOrCommaOrDelimiter => match c {
                Some('/') => {
                    self.advance();
                    // A group choice `//` is recorded like a type choice.
                    if self.peek() == Some('/') {
                        self.advance();
                    }
                    self.push(State::ExpectValue);
                }
                Some('.') => {
                    self.advance();
                    self.replace(State::ExpectRangeop);
                }
                // Whatever comes next belongs to the enclosing state.
                _ => self.end_entry()?,
            },
            State::ExpectRangeop => match c {
                Some('.') => {
                    self.advance();
                    self.replace(State::ExpectExclusiveOrInclusiveRangeop);
                }
                None => return Err(self.error(ErrorKind::UnexpectedEof)),
                Some(_) => return Err(self.error(ErrorKind::ExpectedSlashOrCommaOrRightBracket)),
            },
            State::ExpectExclusiveOrInclusiveRangeop => {
                let inclusive = if c == Some('.') {
                    self.advance();
                    false
                } else {
                    true
                };
                self.builder.range(inclusive).map_err(|k| self.error(k))?;
                self.replace(State::ExpectRangeopOrSlashOrCommaOrDelimiter);
                self.push(State::ExpectValue);
            }
        }
        Ok(())
    }

    // Shared by Digit1 and ZeroDigit once the integer digits are done.
    fn after_integer(&mut self, c: Option<char>) -> Result<(), ParseError> {
        match c {
            // `1..5` is a range, not a fraction.
            Some('.') if self.peek_next() != Some('.') => {
                self.take('.');
                self.replace(State::Fraction);
            }
            Some(c) if c == 'e' || c == 'E' => {
                self.take(c);
                self.replace(State::PlusMinusExponent);
            }
            _ => self.finish_number()?,
        }
        Ok(())
    }
}

/// Parse CDDL text into a rule dictionary, without linking it.
pub(crate) fn parse_rules(input: &str) -> Result<RuleDictionary, ParseError> {
    Parser::new(input).run()
}

/// Parse a CDDL document and link its rules.
///
/// The first rule defined becomes the root rule.
pub fn parse_cddl(input: &str) -> Result<CddlSpecification, ParseError> {
    CddlSpecification::parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::PreludeType;

    fn parse_err(input: &str) -> (ErrorKind, usize, usize) {
        let err = parse_rules(input).unwrap_err();
        (err.kind, err.line, err.column)
    }

    fn rule<'a>(dict: &'a RuleDictionary, name: &str) -> &'a Rule {
        dict.get(dict.lookup(name).unwrap()).unwrap()
    }

    fn lookup_name(dict: &RuleDictionary, id: RuleId) -> &str {
        match dict.get(id).unwrap() {
            Rule::Lookup(l) => &l.name,
            other => panic!("expected lookup, got {:?}", other),
        }
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_number("0"), Some(Literal::Uint(0)));
        assert_eq!(parse_number("-0"), Some(Literal::Uint(0)));
        assert_eq!(parse_number("42"), Some(Literal::Uint(42)));
        assert_eq!(parse_number("-42"), Some(Literal::Nint(-42)));
        assert_eq!(parse_number("0x1F"), Some(Literal::Uint(31)));
        assert_eq!(parse_number("-0x10"), Some(Literal::Nint(-16)));
        assert_eq!(parse_number("1.5"), Some(Literal::Float(1.5)));
        assert_eq!(parse_number("-2e3"), Some(Literal::Float(-2000.0)));
        assert_eq!(
            parse_number("-9223372036854775808"),
            Some(Literal::Nint(i64::MIN))
        );
        assert_eq!(parse_number("-9223372036854775809"), None);
        assert_eq!(parse_number("18446744073709551616"), None);
    }

    #[test]
    fn array_rule() {
        let dict = parse_rules("geography = [city: tstr, gpsCoordinates: gps]\ngps = { longitude: uint, latitude: uint }").unwrap();
        assert_eq!(dict.first_rule(), Some("geography"));
        let entries = match rule(&dict, "geography") {
            Rule::Array(entries) => entries,
            other => panic!("{:?}", other),
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key.as_deref(), Some("city"));
        assert_eq!(lookup_name(&dict, entries[0].rule), "tstr");
        assert_eq!(entries[1].occur, Occur::ONCE);
        assert_eq!(lookup_name(&dict, entries[1].rule), "gps");
        match rule(&dict, "gps") {
            Rule::Map(m) => assert_eq!(m.entries.len(), 2),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn occurrences_and_nesting() {
        let dict = parse_rules(
            "located-samples = {\n  sample-point: int,\n  samples: [+ float],\n  ? note: tstr,\n  * extra: any\n  1*3 few: int\n}",
        );
        // No comma before `1*3`.
        assert_eq!(
            dict.unwrap_err().kind,
            ErrorKind::ExpectedCommaOrLeftParOrRightCurBracket
        );

        let dict = parse_rules(
            "located-samples = {\n  sample-point: int,\n  samples: [+ float],\n  ? note: tstr,\n  * extra: any,\n  1*3 few: int, ; trailing comma\n}",
        )
        .unwrap();
        let entries = match rule(&dict, "located-samples") {
            Rule::Map(m) => &m.entries,
            other => panic!("{:?}", other),
        };
        let occurs: Vec<Occur> = entries.iter().map(|e| e.occur).collect();
        assert_eq!(
            occurs,
            [
                Occur::ONCE,
                Occur::ONCE,
                Occur::OPTIONAL,
                Occur::ZERO_OR_MORE,
                Occur { min: 1, max: 3 }
            ]
        );
        match dict.get(entries[1].rule).unwrap() {
            Rule::Array(inner) => {
                assert_eq!(inner[0].occur, Occur::ONE_OR_MORE);
                assert_eq!(lookup_name(&dict, inner[0].rule), "float");
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn literals_choices_ranges() {
        let dict = parse_rules(
            r#"thing = [ "a\"b", 1..10, 0x10...-1.5e2, 7 / "seven" / nil, (int // tstr) ]"#,
        )
        .unwrap();
        let entries = match rule(&dict, "thing") {
            Rule::Array(entries) => entries.clone(),
            other => panic!("{:?}", other),
        };
        assert_eq!(
            dict.get(entries[0].rule),
            Some(&Rule::Literal(Literal::Text("a\"b".into())))
        );
        match dict.get(entries[1].rule).unwrap() {
            Rule::Range(r) => {
                assert!(r.inclusive);
                assert_eq!(dict.get(r.start), Some(&Rule::Literal(Literal::Uint(1))));
                assert_eq!(dict.get(r.end), Some(&Rule::Literal(Literal::Uint(10))));
            }
            other => panic!("{:?}", other),
        }
        match dict.get(entries[2].rule).unwrap() {
            Rule::Range(r) => {
                assert!(!r.inclusive);
                assert_eq!(dict.get(r.start), Some(&Rule::Literal(Literal::Uint(16))));
                assert_eq!(
                    dict.get(r.end),
                    Some(&Rule::Literal(Literal::Float(-150.0)))
                );
            }
            other => panic!("{:?}", other),
        }
        match dict.get(entries[3].rule).unwrap() {
            Rule::Choice(options) => assert_eq!(options.len(), 3),
            other => panic!("{:?}", other),
        }
        match dict.get(entries[4].rule).unwrap() {
            Rule::Group(g) => {
                assert_eq!(g.len(), 1);
                assert!(matches!(dict.get(g[0].rule), Some(Rule::Choice(_))));
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn rule_level_types() {
        let dict = parse_rules("a = int / tstr\nb = c\nc = uint ; comment\n").unwrap();
        assert!(matches!(rule(&dict, "a"), Rule::Choice(_)));
        assert!(matches!(rule(&dict, "b"), Rule::Lookup(_)));
        assert_eq!(lookup_name(&dict, dict.lookup("c").unwrap()), "uint");
        // Unlinked: the prelude entry is untouched.
        let uint = dict.lookup("uint").unwrap();
        assert_eq!(dict.get(uint), Some(&Rule::Prelude(PreludeType::Uint)));
    }

    #[test]
    fn parenthesized_without_comma() {
        let dict = parse_rules("a = [int (tstr, tstr)]").unwrap();
        match rule(&dict, "a") {
            Rule::Array(entries) => assert_eq!(entries.len(), 2),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn error_positions() {
        use ErrorKind::*;
        assert_eq!(parse_err(""), (UnexpectedEof, 1, 1));
        assert_eq!(parse_err("  ; only a comment\n"), (UnexpectedEof, 2, 1));
        assert_eq!(parse_err("a"), (UnexpectedEof, 1, 2));
        assert_eq!(parse_err("a int"), (ExpectedAssign, 1, 3));
        assert_eq!(parse_err("1 = int"), (ExpectedId, 1, 1));
        assert_eq!(parse_err("a- = int"), (InvalidId, 1, 3));
        assert_eq!(parse_err("a = ]"), (ExpectedGroupent, 1, 5));
        assert_eq!(parse_err("a = [int tstr]"), (ExpectedCommaOrLeftParOrRightSqBracket, 1, 10));
        assert_eq!(parse_err("a = {x: int\n y: int}"), (ExpectedCommaOrLeftParOrRightCurBracket, 2, 2));
        assert_eq!(parse_err("a = (int tstr)"), (ExpectedCommaOrRightPar, 1, 10));
        assert_eq!(parse_err("a = [1 .5]"), (ExpectedSlashOrCommaOrRightBracket, 1, 9));
        assert_eq!(parse_err("a = [int"), (UnexpectedEof, 1, 9));
        assert_eq!(parse_err("a = \"abc"), (UnexpectedEof, 1, 9));
        assert_eq!(parse_err("a = 0x"), (InvalidNumber, 1, 7));
        assert_eq!(parse_err("a = 1.e3"), (InvalidNumber, 1, 7));
        assert_eq!(parse_err("a = 01"), (InvalidNumber, 1, 6));
        assert_eq!(parse_err("a = -x"), (InvalidNumber, 1, 6));
        assert_eq!(parse_err("a = 1e+"), (InvalidNumber, 1, 8));
        assert_eq!(parse_err("a = \"\\q\""), (InvalidText, 1, 5));
        assert_eq!(parse_err("a = int\na = tstr"), (DuplicateRuleId, 2, 1));
        assert_eq!(parse_err("a = [? ]"), (ExpectedGroupent, 1, 8));
    }

    #[test]
    fn crlf_positions() {
        assert_eq!(parse_err("a = int\r\nb tstr"), (ErrorKind::ExpectedAssign, 2, 3));
    }
}
