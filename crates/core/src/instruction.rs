// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! What the store should do with a trigger after a firing completes

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompletedExecutionInstruction {
    Noop,
    ReExecuteJob,
    SetTriggerComplete,
    SetAllJobsOfTriggerGroupComplete,
    DeleteTrigger,
    SetTriggerPaused,
    SetAllJobsOfTriggerGroupPaused,
    SetTriggerError,
    SetAllJobsOfTriggerGroupError,
}

impl CompletedExecutionInstruction {
    /// Instructions that apply to every trigger in the fired trigger's group
    pub fn is_group_level(self) -> bool {
        matches!(
            self,
            CompletedExecutionInstruction::SetAllJobsOfTriggerGroupComplete
                | CompletedExecutionInstruction::SetAllJobsOfTriggerGroupPaused
                | CompletedExecutionInstruction::SetAllJobsOfTriggerGroupError
        )
    }
}

impl fmt::Display for CompletedExecutionInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompletedExecutionInstruction::Noop => "noop",
            CompletedExecutionInstruction::ReExecuteJob => "re-execute-job",
            CompletedExecutionInstruction::SetTriggerComplete => "set-trigger-complete",
            CompletedExecutionInstruction::SetAllJobsOfTriggerGroupComplete => {
                "set-all-jobs-of-trigger-group-complete"
            }
            CompletedExecutionInstruction::DeleteTrigger => "delete-trigger",
            CompletedExecutionInstruction::SetTriggerPaused => "set-trigger-paused",
            CompletedExecutionInstruction::SetAllJobsOfTriggerGroupPaused => {
                "set-all-jobs-of-trigger-group-paused"
            }
            CompletedExecutionInstruction::SetTriggerError => "set-trigger-error",
            CompletedExecutionInstruction::SetAllJobsOfTriggerGroupError => {
                "set-all-jobs-of-trigger-group-error"
            }
        };
        write!(f, "{}", s)
    }
}
