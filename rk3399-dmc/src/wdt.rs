//! Watchdog timer (WDT0) in the alive domain.

pub const WDT0_BASE: u32 = 0xFF84_8000;

/// Control register.
pub const CR: u32 = WDT0_BASE + 0x0;
/// Timeout range register.
pub const TORR: u32 = WDT0_BASE + 0x4;
/// Counter restart register; accepts only [CRR_RESTART_KEY].
pub const CRR: u32 = WDT0_BASE + 0xC;

/// Magic value restarting the watchdog counter.
pub const CRR_RESTART_KEY: u32 = 0x76;

#[bitbybit::bitfield(u32, default = 0x0)]
pub struct Control {
    /// 0 = reset the system on timeout, 1 = interrupt first.
    #[bit(1, rw)]
    response_mode: bool,
    #[bit(0, rw)]
    enable: bool,
}
