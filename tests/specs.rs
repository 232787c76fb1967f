//! Behavioral specifications for the kairos scheduler.
//!
//! These tests are black-box: they drive a real `Scheduler` over a
//! `RamJobStore` and observe what listeners and the store report.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// schedules/
#[path = "specs/schedules/calendar_interval.rs"]
mod schedules_calendar_interval;
#[path = "specs/schedules/daily_window.rs"]
mod schedules_daily_window;

// firing/
#[path = "specs/firing/completion.rs"]
mod firing_completion;
#[path = "specs/firing/faults.rs"]
mod firing_faults;
#[path = "specs/firing/store.rs"]
mod firing_store;

// listeners/
#[path = "specs/listeners/matchers.rs"]
mod listeners_matchers;
