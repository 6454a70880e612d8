//! Geometry programming, system-wide configuration and the switch to the
//! secondary frequency profile.
use arbitrary_int::u6;
use rk3399_dmc::dmc::{self, ctl, phy};
use rk3399_dmc::{cic, cru, masked_write, msch, sgrf};

use crate::bus::DmcBus;
use crate::poll;

use super::{FrequencyIndex, SdramParams, TrainingError, training};

/// Program device geometry and interleave mapping into the channel's memory
/// scheduler. Never fails.
pub fn set_ddrconfig<B: DmcBus>(bus: &mut B, params: &SdramParams, channel: usize) {
    let geometry = &params.channels[channel];

    // Capacity per chip select in MB.
    let mut cs0_cap: u32 =
        1 << (geometry.cs0_row + geometry.col + geometry.bank + geometry.bus_width - 20);
    let mut cs1_cap = if geometry.rank > 1 {
        cs0_cap >> (geometry.cs0_row - geometry.cs1_row)
    } else {
        0
    };
    if geometry.row_3_4 {
        cs0_cap = cs0_cap * 3 / 4;
        cs1_cap = cs1_cap * 3 / 4;
    }

    let mapping = u6::new(geometry.ddr_config & 0x3F);
    let conf = msch::DeviceConf::builder()
        .with_mapping_hi(mapping)
        .with_mapping_lo(mapping)
        .build();
    bus.write(msch::base(channel) + msch::DEVICECONF, conf.raw_value());

    let size = msch::DeviceSize::builder()
        .with_cs1_capacity_div32((cs1_cap / 32) as u8)
        .with_cs0_capacity_div32((cs0_cap / 32) as u8)
        .build();
    bus.write(msch::base(channel) + msch::DEVICESIZE, size.raw_value());
}

/// Capability handle for the reset-hold domains this component shares with
/// other SoC consumers. `finalize` goes through it so the cross-subsystem
/// side effect is visible to callers and tests.
pub struct SharedResetControl {
    _private: (),
}

impl SharedResetControl {
    /// # Safety
    ///
    /// At most one handle may exist; the reset-hold registers it writes are
    /// shared with the GPIO and secure-world drivers.
    #[inline]
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }

    /// Hold GPIO state across the next reset, release the secure-GRF reset
    /// hold and re-enable both global reset paths.
    pub fn release_reboot_holds<B: DmcBus>(&mut self, bus: &mut B) {
        bus.write(
            cru::RSTNHOLD_CON1,
            masked_write(
                cru::SGRF_RST_HOLD_BIT | cru::PRESET_GPIO0_HOLD_BIT | cru::PRESET_GPIO1_HOLD_BIT,
                cru::SGRF_RST_HOLD_BIT | cru::PRESET_GPIO0_HOLD_BIT | cru::PRESET_GPIO1_HOLD_BIT,
            ),
        );
        bus.update(
            cru::GLB_RST_CON,
            cru::GLB_RST_CON_SRST_MASK,
            cru::GLB_RST_CON_SRST_MASK,
        );
    }
}

/// One-time system-wide configuration after all channels are up: scheduler
/// timings, single-rank clock gating, the interleave stride and the shared
/// reset-hold release.
pub fn finalize<B: DmcBus>(
    bus: &mut B,
    params: &SdramParams,
    reset_hold: &mut SharedResetControl,
) {
    for channel in params.present_channels() {
        let noc = &params.channels[channel].noc;
        let base = msch::base(channel);
        bus.write(base + msch::DDRTIMINGA0, noc.ddrtiminga0);
        bus.write(base + msch::DDRTIMINGB0, noc.ddrtimingb0);
        bus.write(base + msch::DDRTIMINGC0, noc.ddrtimingc0);
        bus.write(base + msch::DEVTODEV0, noc.devtodev);
        bus.write(base + msch::DDRMODE, noc.ddrmode);

        if params.channels[channel].rank == 1 {
            // No rank 1 behind this channel; stop clocking it.
            bus.set_bits(
                dmc::ctl_reg(channel, ctl::LOW_POWER_REG),
                ctl::RANK1_CLK_DISABLE,
            );
        }
    }

    bus.write(sgrf::SOC_CON4, sgrf::stride_word(params.stride));

    reset_hold.release_reboot_holds(bus);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IndexSwitchError {
    /// The one-directional switch has already been performed.
    #[error("frequency index already switched")]
    AlreadySwitched,
    /// Training at the secondary profile failed; not retried.
    #[error(transparent)]
    Training(#[from] TrainingError),
}

/// Switch the whole memory subsystem to the secondary frequency profile and
/// retrain every channel there.
///
/// The transition is one-directional; a second invocation is rejected. Both
/// sequencer handshakes are status-polled without bound, as the hardware
/// gives no failure indication for them.
pub fn switch_to_next_index<B: DmcBus>(
    bus: &mut B,
    params: &SdramParams,
    index: &mut FrequencyIndex,
) -> Result<(), IndexSwitchError> {
    if *index == FrequencyIndex::Secondary {
        return Err(IndexSwitchError::AlreadySwitched);
    }

    let current =
        bus.read(dmc::ctl_reg(0, ctl::FREQ_INDEX_REG)) >> ctl::FREQ_INDEX_SHIFT;
    let next = (current + 1) & 1;

    let trigger = cic::Control0::builder()
        .with_target_index(arbitrary_int::u2::new(next as u8))
        .with_idle_request(true)
        .with_ack_complete(false)
        .with_start_switch(true)
        .build();
    bus.write(
        cic::CTRL0,
        masked_write(cic::CTRL0_TRIGGER_MASK, trigger.raw_value() as u16),
    );
    poll::poll_unbounded(bus, |bus| {
        cic::Status0::new_with_raw_value(bus.read(cic::STATUS0))
            .switch_accepted()
            .then_some(())
    });

    bus.write(cic::CTRL0, masked_write(cic::CTRL0_ACK_MASK, cic::CTRL0_ACK_MASK));
    poll::poll_unbounded(bus, |bus| {
        cic::Status0::new_with_raw_value(bus.read(cic::STATUS0))
            .switch_complete()
            .then_some(())
    });

    for channel in params.present_channels() {
        // The secondary profile is untrainable on LPDDR4 (a known hardware
        // limitation); it keeps the replayed calibration instead.
        if !params.dram_type.secondary_index_trainable() {
            continue;
        }
        bus.update(
            dmc::phy_reg(channel, phy::FREQ_SEL_REG),
            phy::FREQ_SEL_INDEX_MASK | phy::FREQ_SEL_FROM_REGS,
            next << phy::FREQ_SEL_INDEX_SHIFT,
        );

        let geometry = &params.channels[channel];
        training::train(
            bus,
            channel as u8,
            params.dram_type.full_training(),
            geometry.rank,
            params.dram_type.rank_presence_mask(geometry.rank),
        )?;
    }

    *index = FrequencyIndex::Secondary;
    Ok(())
}
