// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key matchers
//!
//! Listener registrations and pause/resume selections use matchers to pick
//! the keys they apply to.

use crate::key::Key;
use serde::{Deserialize, Serialize};

/// String comparison used by group and name matchers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StringOperator {
    Equals,
    StartsWith,
    EndsWith,
    Contains,
    Anything,
}

impl StringOperator {
    pub fn evaluate(self, value: &str, compare_to: &str) -> bool {
        match self {
            StringOperator::Equals => value == compare_to,
            StringOperator::StartsWith => value.starts_with(compare_to),
            StringOperator::EndsWith => value.ends_with(compare_to),
            StringOperator::Contains => value.contains(compare_to),
            StringOperator::Anything => true,
        }
    }
}

/// Selects keys by group name only
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupMatcher {
    pub operator: StringOperator,
    pub value: String,
}

impl GroupMatcher {
    pub fn equals(group: impl Into<String>) -> Self {
        Self {
            operator: StringOperator::Equals,
            value: group.into(),
        }
    }

    pub fn starts_with(prefix: impl Into<String>) -> Self {
        Self {
            operator: StringOperator::StartsWith,
            value: prefix.into(),
        }
    }

    pub fn ends_with(suffix: impl Into<String>) -> Self {
        Self {
            operator: StringOperator::EndsWith,
            value: suffix.into(),
        }
    }

    pub fn contains(fragment: impl Into<String>) -> Self {
        Self {
            operator: StringOperator::Contains,
            value: fragment.into(),
        }
    }

    pub fn any() -> Self {
        Self {
            operator: StringOperator::Anything,
            value: String::new(),
        }
    }

    pub fn is_match(&self, group: &str) -> bool {
        self.operator.evaluate(group, &self.value)
    }

    /// Exact group name, when this matcher selects exactly one group
    pub fn exact_group(&self) -> Option<&str> {
        match self.operator {
            StringOperator::Equals => Some(&self.value),
            _ => None,
        }
    }
}

/// Predicate over job or trigger keys
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Matcher<K> {
    Everything,
    KeyEquals(K),
    Group(GroupMatcher),
    Name {
        operator: StringOperator,
        value: String,
    },
    Or(Box<Matcher<K>>, Box<Matcher<K>>),
    And(Box<Matcher<K>>, Box<Matcher<K>>),
    Not(Box<Matcher<K>>),
}

impl<K: Key + PartialEq> Matcher<K> {
    pub fn key_equals(key: K) -> Self {
        Matcher::KeyEquals(key)
    }

    pub fn group_equals(group: impl Into<String>) -> Self {
        Matcher::Group(GroupMatcher::equals(group))
    }

    pub fn group_starts_with(prefix: impl Into<String>) -> Self {
        Matcher::Group(GroupMatcher::starts_with(prefix))
    }

    pub fn group_ends_with(suffix: impl Into<String>) -> Self {
        Matcher::Group(GroupMatcher::ends_with(suffix))
    }

    pub fn group_contains(fragment: impl Into<String>) -> Self {
        Matcher::Group(GroupMatcher::contains(fragment))
    }

    pub fn name_equals(name: impl Into<String>) -> Self {
        Matcher::Name {
            operator: StringOperator::Equals,
            value: name.into(),
        }
    }

    pub fn name_starts_with(prefix: impl Into<String>) -> Self {
        Matcher::Name {
            operator: StringOperator::StartsWith,
            value: prefix.into(),
        }
    }

    pub fn name_ends_with(suffix: impl Into<String>) -> Self {
        Matcher::Name {
            operator: StringOperator::EndsWith,
            value: suffix.into(),
        }
    }

    pub fn name_contains(fragment: impl Into<String>) -> Self {
        Matcher::Name {
            operator: StringOperator::Contains,
            value: fragment.into(),
        }
    }

    pub fn or(self, other: Matcher<K>) -> Self {
        Matcher::Or(Box::new(self), Box::new(other))
    }

    pub fn and(self, other: Matcher<K>) -> Self {
        Matcher::And(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Self {
        Matcher::Not(Box::new(self))
    }

    pub fn is_match(&self, key: &K) -> bool {
        match self {
            Matcher::Everything => true,
            Matcher::KeyEquals(k) => k == key,
            Matcher::Group(g) => g.is_match(key.group()),
            Matcher::Name { operator, value } => operator.evaluate(key.name(), value),
            Matcher::Or(a, b) => a.is_match(key) || b.is_match(key),
            Matcher::And(a, b) => a.is_match(key) && b.is_match(key),
            Matcher::Not(m) => !m.is_match(key),
        }
    }
}

/// True when any matcher in the list selects the key; an empty list selects
/// every key
pub fn any_match<K: Key + PartialEq>(matchers: &[Matcher<K>], key: &K) -> bool {
    matchers.is_empty() || matchers.iter().any(|m| m.is_match(key))
}

#[cfg(test)]
#[path = "matcher_tests.rs"]
mod tests;
