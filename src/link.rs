//! The link pass: resolves names and indexes map members.
//!

use crate::parser::{ErrorKind, ParseError};
use crate::rules::{GroupEntry, MapMember, Occur, Rule, RuleDictionary, RuleId};
use std::collections::{BTreeMap, BTreeSet};

/// Resolve every [`Lookup`](crate::rules::Lookup) in the dictionary, then
/// build the key index of every map.
///
/// A name that doesn't resolve is reported at the position of the
/// reference. Running this more than once has no further effect.
pub(crate) fn link_all(dict: &mut RuleDictionary) -> Result<(), ParseError> {
    let mut resolved = 0;
    for index in 0..dict.len() {
        let id = RuleId(index);
        let target = match dict.get(id) {
            Some(Rule::Lookup(lookup)) => match dict.lookup(&lookup.name) {
                Some(target) => target,
                None => return Err(ParseError::new(ErrorKind::IdLookupFailed, lookup.pos)),
            },
            _ => continue,
        };
        if let Some(Rule::Lookup(lookup)) = dict.rule_mut(id) {
            lookup.target = Some(target);
            resolved += 1;
        }
    }

    let mut maps = 0;
    for index in 0..dict.len() {
        let id = RuleId(index);
        let (members, unsupported) = match dict.get(id) {
            Some(Rule::Map(map)) => {
                let mut members = MapMembers::default();
                let mut visited = BTreeSet::new();
                collect_members(dict, &map.entries, false, &mut members, &mut visited);
                (members.index, members.unsupported)
            }
            _ => continue,
        };
        if let Some(Rule::Map(map)) = dict.rule_mut(id) {
            map.index = members;
            map.unsupported = unsupported;
            maps += 1;
        }
    }
    tracing::debug!(lookups = resolved, maps, "linked rules");
    Ok(())
}

// Follow lookups from `id` until reaching something that isn't a lookup.
pub(crate) fn resolve(dict: &RuleDictionary, mut id: RuleId) -> Option<RuleId> {
    // A chain longer than the arena must be a cycle.
    for _ in 0..=dict.len() {
        match dict.get(id)? {
            Rule::Lookup(lookup) => id = lookup.target?,
            _ => return Some(id),
        }
    }
    None
}

#[derive(Default)]
struct MapMembers {
    index: BTreeMap<String, MapMember>,
    // The first keyless entry that isn't a group.
    unsupported: Option<String>,
}

// Add the keyed entries of a map's group to `members`. Keyless entries that
// refer to groups are inlined; if the entry itself is optional, so is every
// member it brings in. Any other keyless entry marks the map unsupported.
fn collect_members(
    dict: &RuleDictionary,
    entries: &[GroupEntry],
    optional: bool,
    members: &mut MapMembers,
    visited: &mut BTreeSet<RuleId>,
) {
    for entry in entries {
        match &entry.key {
            Some(key) => {
                let occur = if optional {
                    Occur {
                        min: 0,
                        max: entry.occur.max,
                    }
                } else {
                    entry.occur
                };
                members.index.insert(
                    key.clone(),
                    MapMember {
                        occur,
                        rule: entry.rule,
                    },
                );
            }
            None => {
                let target = resolve(dict, entry.rule);
                match target.and_then(|id| dict.get(id)) {
                    Some(Rule::Group(group)) => {
                        if target.map_or(false, |id| visited.insert(id)) {
                            let optional = optional || entry.occur.min == 0;
                            collect_members(dict, group, optional, members, visited);
                        }
                    }
                    other => {
                        let what = match other {
                            Some(Rule::Choice(_)) => "choice in map",
                            Some(Rule::Range(_)) => "range in map",
                            _ => "keyless map entry",
                        };
                        tracing::debug!(rule = entry.rule.index(), what, "map can't be validated");
                        members.unsupported.get_or_insert_with(|| what.to_string());
                    }
                }
            }
        }
    }
}
