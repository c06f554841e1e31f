// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Bounded busy-poll helper with an injectable delay source.
// Author: Lukas Bower

use std::thread;
use std::time::Duration;

use log::trace;
use serde::Deserialize;

use crate::error::{Result, RpuError};

/// Millisecond delay between hardware polls.
pub trait Delay {
    /// Block for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

impl<D: Delay + ?Sized> Delay for &mut D {
    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms);
    }
}

/// Delay backed by `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

impl Delay for StdDelay {
    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

/// Iteration cap and spacing of a bounded poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollPolicy {
    /// Number of checks before giving up.
    pub attempts: u32,
    /// Delay between unsuccessful checks.
    pub interval_ms: u32,
}

impl PollPolicy {
    /// Boot signature wait: 1000 checks, 10 ms apart.
    pub const BOOT_CHECK: Self = Self {
        attempts: 1000,
        interval_ms: 10,
    };

    /// Soft reset completion: 100 checks, 1 ms apart.
    pub const RESET: Self = Self {
        attempts: 100,
        interval_ms: 1,
    };
}

/// Call `ready` until it reports `true`, sleeping `interval_ms` between misses.
///
/// Returns the number of checks used. Errors from `ready` end the wait
/// immediately. No delay follows the final miss.
pub fn poll_until<D, F>(policy: PollPolicy, delay: &mut D, what: &'static str, mut ready: F) -> Result<u32>
where
    D: Delay + ?Sized,
    F: FnMut() -> Result<bool>,
{
    for attempt in 1..=policy.attempts {
        if ready()? {
            trace!("[rpu-boot] {what} after {attempt} checks");
            return Ok(attempt);
        }
        if attempt < policy.attempts {
            delay.delay_ms(policy.interval_ms);
        }
    }
    Err(RpuError::Timeout {
        what,
        attempts: policy.attempts,
    })
}
