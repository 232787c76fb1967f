// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fire-instance id generation
//!
//! Every acquired firing gets an id that is unique within the scheduler
//! instance. Listeners and stores use it to correlate the notifications of
//! one firing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identifies one acquisition of one trigger
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FireInstanceId(pub String);

impl fmt::Display for FireInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generates fire-instance ids
pub trait IdGen: Clone + Send + Sync + 'static {
    fn next(&self) -> FireInstanceId;
}

/// UUID-based generator for production use
#[derive(Clone, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next(&self) -> FireInstanceId {
        FireInstanceId(uuid::Uuid::new_v4().to_string())
    }
}

/// Sequential generator, prefixed with the scheduler instance id
#[derive(Clone)]
pub struct SequentialIdGen {
    instance_id: String,
    counter: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new("NON_CLUSTERED")
    }
}

impl IdGen for SequentialIdGen {
    fn next(&self) -> FireInstanceId {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        FireInstanceId(format!("{}{}", self.instance_id, n))
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
