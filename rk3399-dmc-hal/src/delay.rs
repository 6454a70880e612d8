//! Busy-wait microsecond delay on a free-running counter.
//!
//! The resume path needs delays before any timer peripheral is guaranteed to
//! be programmed, so this is built directly on a free-running counter that is
//! always ticking — on the target, the generic timer's physical counter.
use embedded_hal::delay::DelayNs;

#[cfg(target_arch = "aarch64")]
use crate::time::Hertz;

/// A free-running, wrapping 32-bit down counter.
pub trait FreeRunningCounter {
    /// Current counter value. The counter decrements and wraps at 32 bits;
    /// up counters are adapted by bit inversion (see [ArchCounter]).
    fn ticks(&self) -> u32;

    /// Counter ticks per microsecond.
    fn ticks_per_micro(&self) -> u32;
}

/// Blocking delay provider over a [FreeRunningCounter].
pub struct CounterDelay<C> {
    counter: C,
}

impl<C: FreeRunningCounter> CounterDelay<C> {
    #[inline]
    pub const fn new(counter: C) -> Self {
        Self { counter }
    }

    /// Busy-wait for at least `us` microseconds.
    pub fn delay_us(&mut self, us: u32) {
        let start = self.counter.ticks();
        let total_ticks = us * self.counter.ticks_per_micro();
        loop {
            // The counter decrements; wrapping subtraction yields the
            // elapsed tick count across the 32-bit rollover.
            let elapsed = start.wrapping_sub(self.counter.ticks());
            if elapsed > total_ticks {
                return;
            }
        }
    }
}

impl<C: FreeRunningCounter> DelayNs for CounterDelay<C> {
    fn delay_ns(&mut self, ns: u32) {
        self.delay_us(ns.div_ceil(1000));
    }
}

/// The AArch64 generic-timer physical counter viewed as a down counter.
#[cfg(target_arch = "aarch64")]
pub struct ArchCounter {
    ticks_per_micro: u32,
}

#[cfg(target_arch = "aarch64")]
impl ArchCounter {
    /// `counter_freq` is the system counter frequency (CNTFRQ_EL0).
    #[inline]
    pub const fn new(counter_freq: Hertz) -> Self {
        Self {
            ticks_per_micro: counter_freq.raw() / 1_000_000,
        }
    }
}

#[cfg(target_arch = "aarch64")]
impl FreeRunningCounter for ArchCounter {
    #[inline]
    fn ticks(&self) -> u32 {
        let count: u64;
        unsafe {
            core::arch::asm!(
                "isb",
                "mrs {}, cntpct_el0",
                out(reg) count,
                options(nostack, preserves_flags)
            );
        }
        // The physical counter counts up; invert to satisfy the
        // down-counter contract.
        !(count as u32)
    }

    #[inline]
    fn ticks_per_micro(&self) -> u32 {
        self.ticks_per_micro
    }
}
