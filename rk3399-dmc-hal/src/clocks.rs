//! DDR PLL (DPLL) snapshot, frequency derivation and restore.
//!
//! During suspend the DDR clock is parked on the always-on PLL, so resume has
//! to rebuild both the clock-select word and the full DPLL configuration from
//! the captured control words before any controller register is touched.
use rk3399_dmc::cru::{
    self, DDR_CLKSEL_CON, DPLL, PLL_CON_COUNT, PLL_SLOW_MODE, PllCon0, PllCon1, PllCon2,
};
use rk3399_dmc::WRITE_MASK_ALL;

use crate::bus::DmcBus;
use crate::poll;
use crate::time::Hertz;

/// Crystal oscillator feeding the PLL reference inputs.
pub const OSC_MHZ: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    /// A reference or post divider field reads zero; the PLL cannot be
    /// running off these values.
    #[error("pll divider field is zero")]
    DividerZero,
    /// The feedback divider reads zero.
    #[error("pll feedback divider is zero")]
    FeedbackZero,
}

/// Captured DPLL control words plus the DDR clock-select word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DpllSnapshot {
    pub con: [u32; PLL_CON_COUNT],
    pub clksel: u32,
}

impl DpllSnapshot {
    pub const fn zeroed() -> Self {
        Self {
            con: [0; PLL_CON_COUNT],
            clksel: 0,
        }
    }

    /// Operating frequency encoded by the captured divider fields:
    /// `fbdiv * osc / (refdiv * postdiv1 * postdiv2)`.
    pub fn frequency(&self) -> Result<Hertz, ClockError> {
        let con0 = PllCon0::new_with_raw_value(self.con[0]);
        let con1 = PllCon1::new_with_raw_value(self.con[1]);
        let fbdiv = con0.fbdiv().value() as u32;
        let refdiv = con1.refdiv().value() as u32;
        let postdiv1 = con1.postdiv1().value() as u32;
        let postdiv2 = con1.postdiv2().value() as u32;
        if fbdiv == 0 {
            return Err(ClockError::FeedbackZero);
        }
        if refdiv == 0 || postdiv1 == 0 || postdiv2 == 0 {
            return Err(ClockError::DividerZero);
        }
        let mhz = fbdiv * OSC_MHZ / (refdiv * postdiv1 * postdiv2);
        Ok(Hertz::from_raw(mhz * 1_000_000))
    }
}

/// Read the DPLL control words and the DDR clock-select word.
pub fn capture_dpll<B: DmcBus>(bus: &mut B) -> DpllSnapshot {
    let mut snapshot = DpllSnapshot::zeroed();
    snapshot.clksel = bus.read(DDR_CLKSEL_CON);
    for (i, con) in snapshot.con.iter_mut().enumerate() {
        *con = bus.read(cru::pll_con(DPLL, i));
    }
    snapshot
}

/// Reprogram the DPLL and the DDR clock select from a snapshot.
///
/// The PLL is dropped into slow mode, reprogrammed, put back into its
/// captured mode and only then awaited: new divider values are consumed when
/// the mode switch re-locks the PLL. The lock wait is unbounded — a PLL that
/// never locks leaves the system to the watchdog.
pub fn restore_dpll<B: DmcBus>(bus: &mut B, snapshot: &DpllSnapshot) {
    bus.write(DDR_CLKSEL_CON, snapshot.clksel | WRITE_MASK_ALL);

    bus.write(cru::pll_con(DPLL, 3), PLL_SLOW_MODE);

    bus.write(cru::pll_con(DPLL, 0), snapshot.con[0] | WRITE_MASK_ALL);
    bus.write(cru::pll_con(DPLL, 1), snapshot.con[1] | WRITE_MASK_ALL);
    bus.write(cru::pll_con(DPLL, 2), snapshot.con[2]);
    bus.write(cru::pll_con(DPLL, 4), snapshot.con[4] | WRITE_MASK_ALL);
    bus.write(cru::pll_con(DPLL, 5), snapshot.con[5] | WRITE_MASK_ALL);

    bus.write(cru::pll_con(DPLL, 3), snapshot.con[3] | WRITE_MASK_ALL);

    poll::poll_unbounded(bus, |bus| {
        PllCon2::new_with_raw_value(bus.read(cru::pll_con(DPLL, 2)))
            .locked()
            .then_some(())
    });
}
