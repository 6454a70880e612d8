//! Register status polling.
//!
//! Every wait in the resume path goes through this module, which makes the
//! distinction between bounded and unbounded waits an explicit, auditable
//! property of each call site instead of an accident of an inlined loop.
use embedded_hal::delay::DelayNs;

use crate::bus::DmcBus;

/// Iteration budget of a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    /// Give up (with [BudgetExhausted]) after this many checks.
    Bounded(u32),
    /// Spin until the condition holds. Only a watchdog can recover from a
    /// condition that never comes true.
    Unbounded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("poll budget exhausted")]
pub struct BudgetExhausted;

/// Poll `check` until it yields a value.
#[inline]
pub fn poll_unbounded<B: DmcBus, T>(
    bus: &mut B,
    mut check: impl FnMut(&mut B) -> Option<T>,
) -> T {
    loop {
        if let Some(value) = check(bus) {
            return value;
        }
    }
}

/// Poll `check` until it yields a value or the budget runs out.
pub fn poll<B: DmcBus, T>(
    bus: &mut B,
    budget: Budget,
    mut check: impl FnMut(&mut B) -> Option<T>,
) -> Result<T, BudgetExhausted> {
    match budget {
        Budget::Unbounded => Ok(poll_unbounded(bus, check)),
        Budget::Bounded(iterations) => {
            for _ in 0..iterations {
                if let Some(value) = check(bus) {
                    return Ok(value);
                }
            }
            Err(BudgetExhausted)
        }
    }
}

/// Poll with a fixed sleep between unsuccessful checks.
pub fn poll_spaced<B: DmcBus, D: DelayNs, T>(
    bus: &mut B,
    delay: &mut D,
    budget: Budget,
    interval_us: u32,
    mut check: impl FnMut(&mut B) -> Option<T>,
) -> Result<T, BudgetExhausted> {
    poll(bus, budget, |bus| {
        let result = check(bus);
        if result.is_none() {
            delay.delay_us(interval_us);
        }
        result
    })
}
