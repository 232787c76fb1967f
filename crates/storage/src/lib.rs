// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kairos-storage: job stores
//!
//! [`RamJobStore`] keeps jobs, triggers, and calendars in memory and orders
//! waiting triggers by next fire time, then priority, then key.

mod ram;
mod state;

pub use ram::RamJobStore;
