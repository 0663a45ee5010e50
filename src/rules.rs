//! This module defines the compiled form of a CDDL document.
//!
//! Rules live in an arena owned by a [`RuleDictionary`] and refer to one
//! another by [`RuleId`]. References by name start out as
//! [`Rule::Lookup`] nodes and are resolved by the link pass, so the rule
//! graph may contain cycles.

use crate::parser::Position;
use std::collections::BTreeMap;
use std::fmt;
use strum_macros::Display;

/// An index into a [`RuleDictionary`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(pub(crate) usize);

impl RuleId {
    /// The arena index of this rule.
    pub fn index(self) -> usize {
        self.0
    }
}

/// One of the types named in the CDDL prelude.
///
/// The following types are defined in [RFC8610 appendix D]:
/// `any`, `bool`, `int`, `uint`, `nint`, `float`, `tstr`, `bstr`, `nil`.
///
/// [RFC8610 appendix D]: https://tools.ietf.org/html/rfc8610#appendix-D
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display)]
pub enum PreludeType {
    /// Any type or embedded data structure
    #[strum(to_string = "any")]
    Any,
    /// Nil aka null: nothing.
    #[strum(to_string = "nil")]
    Nil,
    /// A boolean value: true or false
    #[strum(to_string = "bool")]
    Bool,
    /// A positive or negative integer
    #[strum(to_string = "int")]
    Int,
    /// An integer >= 0
    #[strum(to_string = "uint")]
    Uint,
    /// An integer < 0
    #[strum(to_string = "nint")]
    Nint,
    /// A floating-point value
    #[strum(to_string = "float")]
    Float,
    /// A text string
    #[strum(to_string = "tstr")]
    Tstr,
    /// A byte string
    #[strum(to_string = "bstr")]
    Bstr,
}

/// A literal value, e.g. `7`, `1.3`, or ``"foo"``.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum Literal {
    Bool(bool),
    Uint(u64),
    /// A negative integer.
    Nint(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Uint(u) => write!(f, "{}", u),
            Literal::Nint(i) => write!(f, "{}", i),
            Literal::Float(fl) => write!(f, "{:?}", fl),
            Literal::Text(s) => write!(f, "\"{}\"", s),
        }
    }
}

/// How many times a group entry may appear.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Occur {
    /// The minimum number of occurrences.
    pub min: u32,
    /// The maximum number of occurrences; `u32::MAX` means unbounded.
    pub max: u32,
}

impl Occur {
    /// Exactly once (no occurrence indicator).
    pub const ONCE: Occur = Occur { min: 1, max: 1 };
    /// `?`
    pub const OPTIONAL: Occur = Occur { min: 0, max: 1 };
    /// `*`
    pub const ZERO_OR_MORE: Occur = Occur {
        min: 0,
        max: u32::MAX,
    };
    /// `+`
    pub const ONE_OR_MORE: Occur = Occur {
        min: 1,
        max: u32::MAX,
    };

    /// Returns `true` if the validator knows how to evaluate this occurrence.
    ///
    /// That covers `?`, `*`, `+`, and their numbered equivalents
    /// (`0*1`, `0*`, `1*`).
    pub fn is_basic(&self) -> bool {
        self.min <= 1 && (self.max == 1 || self.max == u32::MAX) && self.min <= self.max
    }
}

impl Default for Occur {
    fn default() -> Self {
        Occur::ONCE
    }
}

impl fmt::Display for Occur {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Occur::ONCE => Ok(()),
            Occur::OPTIONAL => write!(f, "?"),
            Occur::ZERO_OR_MORE => write!(f, "*"),
            Occur::ONE_OR_MORE => write!(f, "+"),
            Occur { min, max: u32::MAX } => write!(f, "{}*", min),
            Occur { min, max } => write!(f, "{}*{}", min, max),
        }
    }
}

/// One member of a group: `[occur] [key:] type`.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupEntry {
    #[allow(missing_docs)]
    pub occur: Occur,
    /// The member key, if any. In arrays this only labels the entry.
    pub key: Option<String>,
    /// The type of the entry.
    pub rule: RuleId,
}

/// A reference to another rule by name.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    /// The name being referenced.
    pub name: String,
    /// The rule the name resolves to; filled in by the link pass.
    pub target: Option<RuleId>,
    /// Where the reference appears in the source.
    pub pos: Position,
}

/// A member of a map, as found by key.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MapMember {
    #[allow(missing_docs)]
    pub occur: Occur,
    #[allow(missing_docs)]
    pub rule: RuleId,
}

/// A map definition.
#[derive(Debug, Clone, PartialEq)]
pub struct MapRule {
    /// The group entries, in source order.
    pub entries: Vec<GroupEntry>,
    /// Keyed members, including those of keyless groups that are
    /// included by reference. Built by the link pass.
    pub index: BTreeMap<String, MapMember>,
    /// Set by the link pass when a keyless entry is something other than
    /// a group, e.g. a group choice. Such maps can't be validated.
    pub unsupported: Option<String>,
}

impl MapRule {
    pub(crate) fn new(entries: Vec<GroupEntry>) -> MapRule {
        MapRule {
            entries,
            index: BTreeMap::new(),
            unsupported: None,
        }
    }
}

/// A range of values, e.g. `1..7` or `1...8`.
#[derive(Debug, Copy, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct Range {
    pub start: RuleId,
    pub end: RuleId,
    pub inclusive: bool,
}

/// A node in the rule graph.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum Rule {
    Prelude(PreludeType),
    Literal(Literal),
    Lookup(Lookup),
    Array(Vec<GroupEntry>),
    Map(MapRule),
    Group(Vec<GroupEntry>),
    /// A type choice (`a / b`).
    Choice(Vec<RuleId>),
    Range(Range),
}

impl Rule {
    /// Returns `true` for prelude types and literals.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Rule::Prelude(_) | Rule::Literal(_))
    }
}

/// The compiled rules of a CDDL document.
///
/// The prelude types are pre-registered; a user rule with the same name
/// shadows the prelude definition.
#[derive(Debug, Clone)]
pub struct RuleDictionary {
    rules: Vec<Rule>,
    prelude: BTreeMap<String, RuleId>,
    names: BTreeMap<String, RuleId>,
    first: Option<String>,
}

impl Default for RuleDictionary {
    fn default() -> Self {
        RuleDictionary::new()
    }
}

impl RuleDictionary {
    /// Create a dictionary containing only the prelude.
    pub fn new() -> RuleDictionary {
        let mut dict = RuleDictionary {
            rules: Vec::new(),
            prelude: BTreeMap::new(),
            names: BTreeMap::new(),
            first: None,
        };
        let prelude: &[(&str, Rule)] = &[
            ("any", Rule::Prelude(PreludeType::Any)),
            ("nil", Rule::Prelude(PreludeType::Nil)),
            ("null", Rule::Prelude(PreludeType::Nil)),
            ("bool", Rule::Prelude(PreludeType::Bool)),
            ("true", Rule::Literal(Literal::Bool(true))),
            ("false", Rule::Literal(Literal::Bool(false))),
            ("int", Rule::Prelude(PreludeType::Int)),
            ("uint", Rule::Prelude(PreludeType::Uint)),
            ("nint", Rule::Prelude(PreludeType::Nint)),
            ("float", Rule::Prelude(PreludeType::Float)),
            ("float16", Rule::Prelude(PreludeType::Float)),
            ("float32", Rule::Prelude(PreludeType::Float)),
            ("float64", Rule::Prelude(PreludeType::Float)),
            ("tstr", Rule::Prelude(PreludeType::Tstr)),
            ("text", Rule::Prelude(PreludeType::Tstr)),
            ("bstr", Rule::Prelude(PreludeType::Bstr)),
            ("bytes", Rule::Prelude(PreludeType::Bstr)),
        ];
        for (name, rule) in prelude {
            let id = dict.insert(rule.clone());
            dict.prelude.insert(name.to_string(), id);
        }
        dict
    }

    /// Add a rule to the arena.
    pub(crate) fn insert(&mut self, rule: Rule) -> RuleId {
        self.rules.push(rule);
        RuleId(self.rules.len() - 1)
    }

    /// Bind a user rule name. Returns `false` if the name is already bound.
    pub(crate) fn define(&mut self, name: &str, id: RuleId) -> bool {
        if self.names.contains_key(name) {
            return false;
        }
        if self.first.is_none() {
            self.first = Some(name.to_string());
        }
        self.names.insert(name.to_string(), id);
        true
    }

    /// Returns `true` if a user rule with this name exists.
    pub(crate) fn is_defined(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub(crate) fn rule_mut(&mut self, id: RuleId) -> Option<&mut Rule> {
        self.rules.get_mut(id.0)
    }

    /// Fetch a rule by id.
    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id.0)
    }

    /// Find a rule by name. User rules are searched before the prelude.
    pub fn lookup(&self, name: &str) -> Option<RuleId> {
        self.names
            .get(name)
            .or_else(|| self.prelude.get(name))
            .copied()
    }

    /// The name of the first user rule, which is the default root.
    pub fn first_rule(&self) -> Option<&str> {
        self.first.as_deref()
    }

    /// Iterate over user rule names and their ids, sorted by name.
    pub fn names(&self) -> impl Iterator<Item = (&str, RuleId)> {
        self.names.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// The number of rules in the arena, including prelude and anonymous rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Always `false`; the prelude is always present.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns `true` if `id` is a prelude type or literal, as opposed to
    /// a user-defined structure.
    pub fn is_terminal(&self, id: RuleId) -> bool {
        self.get(id).map_or(false, Rule::is_terminal)
    }
}
