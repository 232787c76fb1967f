// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job and trigger identity
//!
//! Keys are `(name, group)` pairs. Equality and ordering compare the group
//! first, then the name.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Group assigned when none is given
pub const DEFAULT_GROUP: &str = "DEFAULT";

/// Shared view over job and trigger keys, used by matchers
pub trait Key {
    fn name(&self) -> &str;
    fn group(&self) -> &str;
}

macro_rules! define_key {
    ($(#[$meta:meta])* $ty:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $ty {
            name: String,
            group: String,
        }

        impl $ty {
            /// Key in the default group
            pub fn new(name: impl Into<String>) -> Self {
                Self::with_group(name, DEFAULT_GROUP)
            }

            pub fn with_group(name: impl Into<String>, group: impl Into<String>) -> Self {
                let group = group.into();
                Self {
                    name: name.into(),
                    group: if group.is_empty() {
                        DEFAULT_GROUP.to_string()
                    } else {
                        group
                    },
                }
            }

            pub fn name(&self) -> &str {
                &self.name
            }

            pub fn group(&self) -> &str {
                &self.group
            }
        }

        impl Key for $ty {
            fn name(&self) -> &str {
                &self.name
            }

            fn group(&self) -> &str {
                &self.group
            }
        }

        impl Ord for $ty {
            fn cmp(&self, other: &Self) -> Ordering {
                self.group
                    .cmp(&other.group)
                    .then_with(|| self.name.cmp(&other.name))
            }
        }

        impl PartialOrd for $ty {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}.{}", self.group, self.name)
            }
        }

        impl From<&str> for $ty {
            fn from(name: &str) -> Self {
                Self::new(name)
            }
        }
    };
}

define_key!(
    /// Identifies a stored job
    JobKey
);

define_key!(
    /// Identifies a stored trigger
    TriggerKey
);

#[cfg(test)]
#[path = "key_tests.rs"]
mod tests;
