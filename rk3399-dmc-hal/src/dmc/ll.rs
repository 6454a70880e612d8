//! Low-level resume sequencing: reset, register replay, controller start.
use embedded_hal::delay::DelayNs;
use rk3399_dmc::dmc::{self, ctl, phy, pi};
use rk3399_dmc::{cru, pmu};

use crate::bus::DmcBus;
use crate::poll::{self, Budget};
use crate::time::Hertz;

use super::{ChannelSnapshot, StartTimeout, SuspendSnapshot};

/// Delay between the reset sequencing steps.
const RESET_STEP_US: u32 = 10;

/// Controller-ready poll: up to 100 checks spaced by 100 us (~10 ms).
const READY_POLL_BUDGET: u32 = 100;
const READY_POLL_INTERVAL_US: u32 = 100;

/// Slices fall back to software master mode below this frequency.
const DLL_BYPASS_FREQ: Hertz = Hertz::from_raw(125_000_000);

/// Cycle one channel through its reset sequence.
///
/// The order is a hardware contract: both domains under reset, the PHY
/// domain released first, the controller domain last, 10 us apart. The
/// sequence is idempotent as long as nothing is programmed in between.
pub fn reset_channel<B: DmcBus, D: DelayNs>(bus: &mut B, delay: &mut D, channel: u8) {
    bus.write(cru::DMC_SOFTRST_CON, cru::dmc_softrst(channel, true, true));
    delay.delay_us(RESET_STEP_US);
    bus.write(cru::DMC_SOFTRST_CON, cru::dmc_softrst(channel, true, false));
    delay.delay_us(RESET_STEP_US);
    bus.write(cru::DMC_SOFTRST_CON, cru::dmc_softrst(channel, false, false));
    delay.delay_us(RESET_STEP_US);
}

/// Program the slice DLL master-mode override for the operating frequency.
pub fn set_dll_bypass<B: DmcBus>(bus: &mut B, channel: usize, freq: Hertz) {
    if freq <= DLL_BYPASS_FREQ {
        for reg in phy::DATA_SLICE_MASTER_REGS {
            bus.set_bits(dmc::phy_reg(channel, reg), phy::DATA_SLICE_MASTER_MODE_SW);
        }
        for reg in phy::ADR_SLICE_MASTER_REGS {
            bus.set_bits(dmc::phy_reg(channel, reg), phy::ADR_SLICE_MASTER_MODE_SW);
        }
    } else {
        for reg in phy::DATA_SLICE_MASTER_REGS {
            bus.clear_bits(dmc::phy_reg(channel, reg), phy::DATA_SLICE_MASTER_MODE_SW);
        }
        for reg in phy::ADR_SLICE_MASTER_REGS {
            bus.clear_bits(dmc::phy_reg(channel, reg), phy::ADR_SLICE_MASTER_MODE_SW);
        }
    }
}

/// Replay the captured register banks into one channel and trigger it.
///
/// Has no failure path: it either completes or spins in the PHY lock wait
/// (skipped entirely when the PHY reports PLL bypass).
pub fn program_channel<B: DmcBus>(bus: &mut B, channel: usize, snap: &ChannelSnapshot) {
    // Controller bug workaround: CTL_00 must be written after the rest of
    // the bank, so the interrupt-masking fields are in place before the
    // memory class is programmed.
    bus.write_block(dmc::ctl_reg(channel, 1), &snap.ctl[1..]);
    bus.write(dmc::ctl_reg(channel, 0), snap.ctl[0]);
    bus.write_block(dmc::pi_reg(channel, 0), &snap.pi);

    // PHY PLL controls must be in place before the start trigger.
    let pll_ctrl_offset = phy::PLL_CTRL_BASE - phy::TOP_BASE;
    bus.write_block(
        dmc::phy_reg(channel, phy::PLL_CTRL_BASE),
        &snap.phy.top[pll_ctrl_offset..pll_ctrl_offset + phy::PLL_CTRL_COUNT],
    );

    bus.update(
        dmc::ctl_reg(channel, ctl::SREFRESH_EXIT_REG),
        ctl::PWRUP_SREFRESH_EXIT,
        ctl::PWRUP_SREFRESH_EXIT,
    );

    bus.update(
        dmc::phy_reg(channel, phy::DLL_RST_REG),
        phy::DLL_RST_MASK,
        phy::DLL_RST_HOLD,
    );
    // Everything above must be globally visible before the triggers fire.
    bus.barrier();

    bus.set_bits(dmc::pi_reg(channel, 0), pi::START);
    bus.set_bits(dmc::ctl_reg(channel, 0), ctl::START);

    // The bypass decision is taken once, not per poll iteration.
    let bypassed =
        bus.read(dmc::phy_reg(channel, phy::PLL_BYPASS_REG)) & phy::PLL_BYPASS != 0;
    if !bypassed {
        poll::poll_unbounded(bus, |bus| phy_locked(bus, channel).then_some(()));
    }

    bus.write_block(dmc::phy_reg(channel, phy::TOP_BASE), &snap.phy.top);
    for lane in 0..phy::LANE_COUNT {
        bus.write_block(
            dmc::phy_reg(channel, lane * phy::LANE_STRIDE),
            &snap.phy.data_slice,
        );
    }
    for (i, block) in snap.phy.adr_slice.iter().enumerate() {
        bus.write_block(
            dmc::phy_reg(channel, phy::ADR_SLICE_BASE + i * phy::LANE_STRIDE),
            block,
        );
    }
}

/// The four PLL/DLL lock flags, spread over three observation registers.
fn phy_locked<B: DmcBus>(bus: &mut B, channel: usize) -> bool {
    let [obs0, obs1, obs2] = phy::LOCK_OBS_REGS;
    let lock0 = bus.read(dmc::phy_reg(channel, obs0));
    let lock1 = bus.read(dmc::phy_reg(channel, obs1));
    let lock2 = bus.read(dmc::phy_reg(channel, obs2));
    (lock0 >> 16) & 1 == 1 && (lock1 >> 16) & 1 == 1 && lock1 & 1 == 1 && lock2 & 1 == 1
}

/// Start the controllers of all masked channels and wait for their ready
/// handshakes.
///
/// Handles both channels in one call because the reset signal may be shared
/// between them: the self-refresh-exit flag is made consistent on *both*
/// channels before any channel-specific trigger.
pub fn start_channels<B: DmcBus, D: DelayNs>(
    bus: &mut B,
    delay: &mut D,
    channel_mask: u8,
    snapshot: &SuspendSnapshot,
) -> Result<(), StartTimeout> {
    for channel in 0..rk3399_dmc::CHANNEL_COUNT {
        bus.set_bits(
            dmc::ctl_reg(channel, ctl::SREFRESH_EXIT_REG),
            ctl::PWRUP_SREFRESH_EXIT,
        );
    }

    for channel in masked(channel_mask) {
        // The IO pads must leave retention before the controller starts
        // driving them.
        bus.set_bits(pmu::PWRMODE_CON, pmu::ddrio_retention_release(channel as u8));
        bus.update(
            dmc::phy_reg(channel, phy::DLL_RST_REG),
            phy::DLL_RST_MASK,
            phy::DLL_RST_RELEASE,
        );
    }

    for channel in masked(channel_mask) {
        poll::poll_spaced(
            bus,
            delay,
            Budget::Bounded(READY_POLL_BUDGET),
            READY_POLL_INTERVAL_US,
            |bus| {
                (bus.read(dmc::ctl_reg(channel, ctl::STATUS_REG)) & ctl::CONTROLLER_READY
                    != 0)
                    .then_some(())
            },
        )
        .map_err(|_| StartTimeout {
            channel: channel as u8,
        })?;

        bus.clear_bits(
            dmc::ctl_reg(channel, ctl::SREFRESH_EXIT_REG),
            ctl::PWRUP_SREFRESH_EXIT,
        );

        // Fine calibration is only meaningful on a confirmed-ready
        // controller; reset cleared these fields earlier.
        for (lane, value) in snapshot.channels[channel].rx_cal_dqs.iter().enumerate() {
            bus.update(
                dmc::phy_reg(channel, phy::lane_reg(phy::RX_CAL_DQS_REG, lane)),
                phy::RX_CAL_DQS_MASK,
                *value,
            );
        }
    }
    Ok(())
}

fn masked(channel_mask: u8) -> impl Iterator<Item = usize> {
    (0..rk3399_dmc::CHANNEL_COUNT).filter(move |ch| channel_mask & (1 << ch) != 0)
}
