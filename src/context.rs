//! This module defines the LookupContext trait.
//!
//! A [`LookupContext`] is used to resolve rules during validation.
//! The validator never touches the rule arena directly; every rule it
//! evaluates is fetched through this trait.
//!

use crate::rules::{Rule, RuleDictionary, RuleId};
use crate::util::ValidateError;

/// Supplies rules to the validator.
pub trait LookupContext {
    /// Lookup a rule by name.
    fn lookup_rule(&self, name: &str) -> Result<RuleId, ValidateError>;

    /// Fetch a rule by id.
    fn rule(&self, id: RuleId) -> Result<&Rule, ValidateError>;
}

impl LookupContext for RuleDictionary {
    fn lookup_rule(&self, name: &str) -> Result<RuleId, ValidateError> {
        self.lookup(name)
            .ok_or_else(|| ValidateError::MissingRule(name.into()))
    }

    fn rule(&self, id: RuleId) -> Result<&Rule, ValidateError> {
        self.get(id).ok_or_else(|| {
            ValidateError::Structural(format!("rule index {} out of range", id.index()))
        })
    }
}
