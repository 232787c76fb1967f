// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Misfire instructions and how each trigger family applies them

use super::{Schedule, ScheduleFamily, Trigger};
use crate::calendar::ExclusionCalendar;
use crate::error::ScheduleError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What to do when a trigger's fire time passed without it firing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MisfireInstruction {
    /// Pick the family's sensible default when the misfire is handled
    #[default]
    Smart,
    /// Fire every missed time as soon as possible
    IgnoreMisfires,
    /// Fire once now, then resume the schedule
    FireOnceNow,
    /// Skip missed fires and wait for the next scheduled time
    DoNothing,
    FireNow,
    RescheduleNowWithExistingRepeatCount,
    RescheduleNowWithRemainingRepeatCount,
    RescheduleNextWithRemainingCount,
    RescheduleNextWithExistingCount,
}

impl MisfireInstruction {
    /// Numeric code, shared across families for `Smart` and `IgnoreMisfires`
    pub fn code(self) -> i32 {
        match self {
            MisfireInstruction::IgnoreMisfires => -1,
            MisfireInstruction::Smart => 0,
            MisfireInstruction::FireOnceNow | MisfireInstruction::FireNow => 1,
            MisfireInstruction::DoNothing
            | MisfireInstruction::RescheduleNowWithExistingRepeatCount => 2,
            MisfireInstruction::RescheduleNowWithRemainingRepeatCount => 3,
            MisfireInstruction::RescheduleNextWithRemainingCount => 4,
            MisfireInstruction::RescheduleNextWithExistingCount => 5,
        }
    }

    pub fn from_code(family: ScheduleFamily, code: i32) -> Result<Self, ScheduleError> {
        let instruction = match (family, code) {
            (_, -1) => MisfireInstruction::IgnoreMisfires,
            (_, 0) => MisfireInstruction::Smart,
            (ScheduleFamily::Simple, 1) => MisfireInstruction::FireNow,
            (ScheduleFamily::Simple, 2) => MisfireInstruction::RescheduleNowWithExistingRepeatCount,
            (ScheduleFamily::Simple, 3) => {
                MisfireInstruction::RescheduleNowWithRemainingRepeatCount
            }
            (ScheduleFamily::Simple, 4) => MisfireInstruction::RescheduleNextWithRemainingCount,
            (ScheduleFamily::Simple, 5) => MisfireInstruction::RescheduleNextWithExistingCount,
            (_, 1) => MisfireInstruction::FireOnceNow,
            (_, 2) => MisfireInstruction::DoNothing,
            (_, other) => return Err(ScheduleError::UnknownMisfireCode(other)),
        };
        Ok(instruction)
    }

    /// Whether triggers of the family accept this instruction
    pub fn is_valid_for(self, family: ScheduleFamily) -> bool {
        match self {
            MisfireInstruction::Smart | MisfireInstruction::IgnoreMisfires => true,
            MisfireInstruction::FireOnceNow | MisfireInstruction::DoNothing => {
                family != ScheduleFamily::Simple
            }
            MisfireInstruction::FireNow
            | MisfireInstruction::RescheduleNowWithExistingRepeatCount
            | MisfireInstruction::RescheduleNowWithRemainingRepeatCount
            | MisfireInstruction::RescheduleNextWithRemainingCount
            | MisfireInstruction::RescheduleNextWithExistingCount => family == ScheduleFamily::Simple,
        }
    }
}

impl fmt::Display for MisfireInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MisfireInstruction::Smart => "smart",
            MisfireInstruction::IgnoreMisfires => "ignore-misfires",
            MisfireInstruction::FireOnceNow => "fire-once-now",
            MisfireInstruction::DoNothing => "do-nothing",
            MisfireInstruction::FireNow => "fire-now",
            MisfireInstruction::RescheduleNowWithExistingRepeatCount => {
                "reschedule-now-with-existing-repeat-count"
            }
            MisfireInstruction::RescheduleNowWithRemainingRepeatCount => {
                "reschedule-now-with-remaining-repeat-count"
            }
            MisfireInstruction::RescheduleNextWithRemainingCount => {
                "reschedule-next-with-remaining-count"
            }
            MisfireInstruction::RescheduleNextWithExistingCount => {
                "reschedule-next-with-existing-count"
            }
        };
        write!(f, "{}", s)
    }
}

/// Resolve `Smart` and the one-shot `FireNow` case for a trigger
pub(crate) fn resolve(trigger: &Trigger) -> MisfireInstruction {
    let instruction = trigger.misfire_instruction;
    match &trigger.schedule {
        Schedule::Simple(simple) => match (instruction, simple.repeat_count()) {
            (MisfireInstruction::Smart, Some(0)) => MisfireInstruction::FireNow,
            (MisfireInstruction::Smart, None) => {
                MisfireInstruction::RescheduleNextWithRemainingCount
            }
            (MisfireInstruction::Smart, Some(_)) => {
                MisfireInstruction::RescheduleNowWithExistingRepeatCount
            }
            (MisfireInstruction::FireNow, count) if count != Some(0) => {
                MisfireInstruction::RescheduleNowWithRemainingRepeatCount
            }
            (other, _) => other,
        },
        _ => match instruction {
            MisfireInstruction::Smart => MisfireInstruction::FireOnceNow,
            other => other,
        },
    }
}

pub(crate) fn apply(
    trigger: &mut Trigger,
    calendar: Option<&dyn ExclusionCalendar>,
    now: DateTime<Utc>,
) {
    let instruction = resolve(trigger);
    tracing::debug!(
        trigger = %trigger.key,
        %instruction,
        missed = ?trigger.next_fire_time,
        "applying misfire instruction"
    );
    match instruction {
        MisfireInstruction::IgnoreMisfires | MisfireInstruction::Smart => {}
        MisfireInstruction::FireOnceNow | MisfireInstruction::FireNow => {
            trigger.next_fire_time = Some(now);
        }
        MisfireInstruction::DoNothing | MisfireInstruction::RescheduleNextWithExistingCount => {
            trigger.next_fire_time = trigger.compute_fire_time_after(now, calendar);
        }
        MisfireInstruction::RescheduleNextWithRemainingCount => {
            let next = trigger.compute_fire_time_after(now, calendar);
            if let (Some(new_time), Some(missed_from), Schedule::Simple(simple)) =
                (next, trigger.next_fire_time, &trigger.schedule)
            {
                let missed = simple.times_fired_between(missed_from, new_time);
                trigger.times_triggered = trigger.times_triggered.saturating_add(missed);
            }
            trigger.next_fire_time = next;
        }
        MisfireInstruction::RescheduleNowWithExistingRepeatCount => {
            let times_triggered = trigger.times_triggered;
            if let Schedule::Simple(simple) = &mut trigger.schedule {
                if let Some(count) = simple.repeat_count().filter(|c| *c != 0) {
                    simple.set_repeat_count(Some(count.saturating_sub(times_triggered)));
                    trigger.times_triggered = 0;
                }
            }
            reschedule_now(trigger, now);
        }
        MisfireInstruction::RescheduleNowWithRemainingRepeatCount => {
            let times_triggered = trigger.times_triggered;
            let missed_from = trigger.next_fire_time;
            if let Schedule::Simple(simple) = &mut trigger.schedule {
                if let Some(count) = simple.repeat_count().filter(|c| *c != 0) {
                    let missed =
                        missed_from.map_or(0, |from| simple.times_fired_between(from, now));
                    let used = times_triggered.saturating_add(missed);
                    simple.set_repeat_count(Some(count.saturating_sub(used)));
                    trigger.times_triggered = 0;
                }
            }
            reschedule_now(trigger, now);
        }
    }
}

fn reschedule_now(trigger: &mut Trigger, now: DateTime<Utc>) {
    if trigger.end_time.is_some_and(|end| end < now) {
        trigger.next_fire_time = None;
    } else {
        trigger.start_time = now;
        trigger.next_fire_time = Some(now);
    }
}

#[cfg(test)]
#[path = "misfire_tests.rs"]
mod tests;
