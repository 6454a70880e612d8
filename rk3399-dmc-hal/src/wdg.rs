//! Watchdog rearm for the resume path.
//!
//! Several resume waits are unbounded; if the watchdog was armed before
//! suspend it must be rearmed before the first of them, so a wedged resume
//! ends in a watchdog reset instead of a silent hang. The watchdog cannot be
//! turned off again, so this must never run when it was not armed before.
use rk3399_dmc::{cru, wdt};

use crate::bus::DmcBus;

/// Timeout range selector 0x9: 0x1FF_FFFF cycles of the 4 MHz reset-default
/// pclk, roughly 8 seconds.
const TIMEOUT_RANGE: u32 = 0x9;

/// Whether the watchdog is currently armed.
pub fn is_armed<B: DmcBus>(bus: &mut B) -> bool {
    wdt::Control::new_with_raw_value(bus.read(wdt::CR)).enable()
}

/// Arm the watchdog and route the first global reset to it.
pub fn rearm<B: DmcBus>(bus: &mut B) {
    bus.write(cru::GLB_RST_CON, cru::GLB_RST_CON_WDT_FIRST);
    bus.write(wdt::TORR, TIMEOUT_RANGE);
    let enable = wdt::Control::builder()
        .with_response_mode(false)
        .with_enable(true)
        .build();
    bus.set_bits(wdt::CR, enable.raw_value());
    bus.write(wdt::CRR, wdt::CRR_RESTART_KEY);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::SimBus;

    #[test]
    fn rearm_enables_and_restarts() {
        let mut bus = SimBus::new();
        rearm(&mut bus);
        assert_eq!(bus.value(wdt::CR) & 1, 1);
        assert_eq!(bus.value(wdt::TORR), TIMEOUT_RANGE);
        assert_eq!(bus.value(wdt::CRR), wdt::CRR_RESTART_KEY);
        assert_eq!(bus.value(cru::GLB_RST_CON), cru::GLB_RST_CON_WDT_FIRST);
    }

    #[test]
    fn armed_query_reads_enable_bit() {
        let mut bus = SimBus::new();
        assert!(!is_armed(&mut bus));
        bus.set(wdt::CR, 1);
        assert!(is_armed(&mut bus));
    }
}
