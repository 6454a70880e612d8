//! Clock and reset unit (CRU) and the always-on PMUCRU.
use arbitrary_int::{u3, u6, u12};

use crate::masked_write;

pub const CRU_BASE: u32 = 0xFF76_0000;
pub const PMUCRU_BASE: u32 = 0xFF75_0000;

/// Control words per PLL (CON0..=CON5).
pub const PLL_CON_COUNT: usize = 6;

/// Index of the PLL feeding the DDR clock domain.
pub const DPLL: u32 = 2;

/// Address of `PLL_CONn` for the given PLL index.
#[inline]
pub const fn pll_con(pll: u32, n: usize) -> u32 {
    CRU_BASE + pll * 0x20 + (n as u32) * 4
}

/// PLL_CON0: feedback divider.
#[bitbybit::bitfield(u32)]
pub struct PllCon0 {
    #[bits(0..=11, rw)]
    fbdiv: u12,
}

/// PLL_CON1: reference and post dividers.
#[bitbybit::bitfield(u32)]
pub struct PllCon1 {
    #[bits(12..=14, rw)]
    postdiv2: u3,
    #[bits(8..=10, rw)]
    postdiv1: u3,
    #[bits(0..=5, rw)]
    refdiv: u6,
}

/// PLL_CON2: fractional divider and lock status.
#[bitbybit::bitfield(u32)]
pub struct PllCon2 {
    #[bit(31, r)]
    locked: bool,
}

/// Masked write putting a PLL into slow (bypass) mode via PLL_CON3.
pub const PLL_SLOW_MODE: u32 = masked_write(0x0300, 0x0000);

/// Clock-select control word addresses.
#[inline]
pub const fn clksel_con(n: usize) -> u32 {
    CRU_BASE + 0x100 + (n as u32) * 4
}

/// CLKSEL_CON6 selects the DDR controller clock source.
pub const DDR_CLKSEL_CON: u32 = clksel_con(6);

/// Soft-reset control word addresses.
#[inline]
pub const fn softrst_con(n: usize) -> u32 {
    CRU_BASE + 0x400 + (n as u32) * 4
}

/// SOFTRST_CON4 carries the per-channel DMC controller and PHY reset lines.
pub const DMC_SOFTRST_CON: u32 = softrst_con(4);

/// Masked soft-reset word driving one channel's controller and PHY reset
/// lines. `true` asserts the line.
#[inline]
pub const fn dmc_softrst(channel: u8, ctl: bool, phy: bool) -> u32 {
    let ctl_bit = 8 + channel * 4;
    let phy_bit = 9 + channel * 4;
    masked_write(
        (1 << ctl_bit) | (1 << phy_bit),
        ((ctl as u16) << ctl_bit) | ((phy as u16) << phy_bit),
    )
}

/// Global reset configuration (not a masked register).
pub const GLB_RST_CON: u32 = CRU_BASE + 0x0510;

/// Route the first global reset to the watchdog.
pub const GLB_RST_CON_WDT_FIRST: u32 = 1 << 1;

/// First/second global reset enable bits, set together after resume.
pub const GLB_RST_CON_SRST_MASK: u32 = 0x3;

/// PMUCRU reset-hold control for the domains shared with other SoC blocks.
pub const RSTNHOLD_CON1: u32 = PMUCRU_BASE + 0x124;

/// Release the secure-GRF reset hold (bit 6 of RSTNHOLD_CON1).
pub const SGRF_RST_HOLD_BIT: u16 = 1 << 6;

/// Hold GPIO0 state across a reset (bit 7 of RSTNHOLD_CON1).
pub const PRESET_GPIO0_HOLD_BIT: u16 = 1 << 7;

/// Hold GPIO1 state across a reset (bit 8 of RSTNHOLD_CON1).
pub const PRESET_GPIO1_HOLD_BIT: u16 = 1 << 8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn softrst_words() {
        // Channel 0: controller bit 8, PHY bit 9.
        assert_eq!(dmc_softrst(0, true, true), 0x0300_0300);
        assert_eq!(dmc_softrst(0, true, false), 0x0300_0100);
        assert_eq!(dmc_softrst(0, false, false), 0x0300_0000);
        // Channel 1: controller bit 12, PHY bit 13.
        assert_eq!(dmc_softrst(1, true, true), 0x3000_3000);
    }

    #[test]
    fn dpll_con_addresses() {
        assert_eq!(pll_con(DPLL, 0), CRU_BASE + 0x40);
        assert_eq!(pll_con(DPLL, 5), CRU_BASE + 0x54);
    }
}
