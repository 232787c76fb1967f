// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local wall-clock helpers for zoned schedules

use chrono::{DateTime, Duration, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

/// Wall-clock time of an instant in a zone
pub(crate) fn to_local(tz: Tz, instant: DateTime<Utc>) -> NaiveDateTime {
    instant.with_timezone(&tz).naive_local()
}

/// Whether a wall-clock time occurs in the zone
pub(crate) fn local_exists(tz: Tz, local: NaiveDateTime) -> bool {
    tz.from_local_datetime(&local).earliest().is_some()
}

/// Map a wall-clock time to an instant
///
/// Ambiguous times (clocks set back) take the earlier instant. Times inside a
/// gap (clocks set forward) are read with the offset in force just before the
/// gap, so 02:30 on a spring-forward night becomes 03:30 in the new offset.
pub(crate) fn resolve_local(tz: Tz, local: NaiveDateTime) -> DateTime<Utc> {
    if let Some(dt) = tz.from_local_datetime(&local).earliest() {
        return dt.with_timezone(&Utc);
    }
    let mut earlier = local;
    for _ in 0..(4 * 24) {
        earlier -= Duration::minutes(15);
        if let Some(before) = tz.from_local_datetime(&earlier).earliest() {
            let offset = before.offset().fix().local_minus_utc();
            return Utc.from_utc_datetime(&(local - Duration::seconds(i64::from(offset))));
        }
    }
    Utc.from_utc_datetime(&local)
}

/// Map a wall-clock time to an instant no earlier than `not_before` when the
/// zone allows it
///
/// A wall time that occurs twice takes its later instant when the earlier one
/// falls before `not_before`.
pub(crate) fn resolve_local_not_before(
    tz: Tz,
    local: NaiveDateTime,
    not_before: DateTime<Utc>,
) -> DateTime<Utc> {
    let mapped = tz.from_local_datetime(&local);
    match (mapped.earliest(), mapped.latest()) {
        (Some(early), _) if early.with_timezone(&Utc) >= not_before => early.with_timezone(&Utc),
        (_, Some(late)) if late.with_timezone(&Utc) >= not_before => late.with_timezone(&Utc),
        _ => resolve_local(tz, local),
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
