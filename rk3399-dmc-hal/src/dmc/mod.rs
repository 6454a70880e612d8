//! DRAM controller suspend capture and resume orchestration.
//!
//! [capture] runs once while the controller is still quiescent and powered;
//! [resume] rebuilds the whole memory subsystem on wake. Any controller-start
//! timeout or training failure restarts the complete multi-channel sequence
//! from the reset step — there is no per-channel or per-phase recovery, the
//! hardware state after a partial failure is not trustworthy enough for one.
use arbitrary_int::u5;
use embedded_hal::delay::DelayNs;
use num_enum::TryFromPrimitive;
use rk3399_dmc::dmc::{self, CTL_REG_COUNT, PI_REG_COUNT, ctl, phy, pi};
use rk3399_dmc::{CHANNEL_COUNT, pmugrf};

use crate::bus::DmcBus;
use crate::clocks::{self, ClockError, DpllSnapshot};
use crate::time::Hertz;
use crate::wdg;

pub mod config;
pub mod ll;
pub mod training;

pub use config::{IndexSwitchError, SharedResetControl};

/// DRAM device type of both channels. Discriminants match the boot-state tag
/// the loader leaves in the PMUGRF OS registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum DramType {
    Ddr3 = 3,
    Lpddr3 = 6,
    Lpddr4 = 7,
}

impl DramType {
    /// Decode the type tag from the PMUGRF OS_REG2 boot-state word.
    pub fn from_os_reg(value: u32) -> Result<Self, UnknownDramType> {
        let tag = (value >> pmugrf::OS_REG2_DDRTYPE_SHIFT) & pmugrf::OS_REG2_DDRTYPE_MASK;
        Self::try_from(tag as u8).map_err(|_| UnknownDramType(tag as u8))
    }

    /// Calibration phases making up a full training pass for this type.
    pub const fn full_training(self) -> &'static [TrainingPhase] {
        use TrainingPhase::*;
        match self {
            DramType::Ddr3 => &[WriteLeveling, ReadGate, ReadLeveling],
            DramType::Lpddr3 => &[CommandAddress, WriteLeveling, ReadGate],
            DramType::Lpddr4 => &[WriteLeveling, ReadGate, ReadLeveling, WriteDqLeveling],
        }
    }

    /// 4-slot rank presence mask used by the phases that iterate chip-select
    /// slots instead of rank count.
    pub const fn rank_presence_mask(self, rank_count: u8) -> u8 {
        match self {
            // LPDDR4 ranks occupy every other slot.
            DramType::Lpddr4 => {
                if rank_count == 1 {
                    0x5
                } else {
                    0xF
                }
            }
            _ => {
                if rank_count == 1 {
                    0x1
                } else {
                    0x3
                }
            }
        }
    }

    /// Training at the secondary frequency profile always fails on LPDDR4
    /// (and corrupts write data on the way); the index switch skips it.
    pub const fn secondary_index_trainable(self) -> bool {
        !matches!(self, DramType::Lpddr4)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown dram type tag {0}")]
pub struct UnknownDramType(pub u8);

/// One hardware calibration phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingPhase {
    CommandAddress,
    WriteLeveling,
    ReadGate,
    ReadLeveling,
    WriteDqLeveling,
}

/// Pre-calibrated controller/PHY timing profile selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyIndex {
    Primary,
    Secondary,
}

/// Memory scheduler timing words replayed into the interconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NocTimings {
    pub ddrtiminga0: u32,
    pub ddrtimingb0: u32,
    pub ddrtimingc0: u32,
    pub devtodev: u32,
    pub ddrmode: u32,
}

/// Geometry and scheduler configuration of one channel. A channel with
/// `col == 0` is not populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelParams {
    /// Chip-select (rank) count, 1 or 2.
    pub rank: u8,
    /// Column address bits; 0 marks the channel absent.
    pub col: u8,
    /// Bank address bits.
    pub bank: u8,
    /// Bus width as log2 bytes.
    pub bus_width: u8,
    /// Row address bits per chip select.
    pub cs0_row: u8,
    pub cs1_row: u8,
    /// Dies with 3/4 of a power-of-two row count.
    pub row_3_4: bool,
    /// Scheduler address-mapping selector.
    pub ddr_config: u8,
    pub noc: NocTimings,
}

impl ChannelParams {
    #[inline]
    pub const fn present(&self) -> bool {
        self.col != 0
    }
}

/// Static configuration of the memory subsystem, owned by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SdramParams {
    pub dram_type: DramType,
    pub channels: [ChannelParams; CHANNEL_COUNT],
    /// System-wide channel interleave policy.
    pub stride: u5,
}

impl SdramParams {
    /// Bit mask of populated channels.
    pub fn channel_mask(&self) -> u8 {
        let mut mask = 0;
        for (i, channel) in self.channels.iter().enumerate() {
            if channel.present() {
                mask |= 1 << i;
            }
        }
        mask
    }

    /// Iterate the indices of populated channels.
    pub fn present_channels(&self) -> impl Iterator<Item = usize> + '_ {
        self.channels
            .iter()
            .enumerate()
            .filter(|(_, ch)| ch.present())
            .map(|(i, _)| i)
    }
}

/// Captured PHY state of one channel: the byte-lane register template, the
/// three address-slice blocks and the top-level block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhyBank {
    pub data_slice: [u32; phy::DATA_SLICE_REG_COUNT],
    pub adr_slice: [[u32; phy::ADR_SLICE_REG_COUNT]; phy::ADR_SLICE_COUNT],
    pub top: [u32; phy::TOP_REG_COUNT],
}

impl PhyBank {
    pub const fn zeroed() -> Self {
        Self {
            data_slice: [0; phy::DATA_SLICE_REG_COUNT],
            adr_slice: [[0; phy::ADR_SLICE_REG_COUNT]; phy::ADR_SLICE_COUNT],
            top: [0; phy::TOP_REG_COUNT],
        }
    }
}

/// Captured controller state of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSnapshot {
    pub ctl: [u32; CTL_REG_COUNT],
    pub pi: [u32; PI_REG_COUNT],
    pub phy: PhyBank,
    /// Per-lane RX DQS calibration fields, stored in register position.
    /// Deliberately not part of the blind bank replay: reset clears them and
    /// they may only be rewritten once the controller start handshake has
    /// succeeded.
    pub rx_cal_dqs: [u32; phy::LANE_COUNT],
}

impl ChannelSnapshot {
    pub const fn zeroed() -> Self {
        Self {
            ctl: [0; CTL_REG_COUNT],
            pi: [0; PI_REG_COUNT],
            phy: PhyBank::zeroed(),
            rx_cal_dqs: [0; phy::LANE_COUNT],
        }
    }
}

/// Everything resume needs, captured before power-down.
///
/// The power-management framework owns exactly one of these in always-on
/// SRAM (`static SNAPSHOT: SuspendSnapshot = SuspendSnapshot::new()` placed
/// by the platform linker script), writes it through [capture] and hands it
/// to [resume] on wake. Resume re-reads it unmodified on every internal
/// retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuspendSnapshot {
    pub dpll: DpllSnapshot,
    pub freq: Hertz,
    /// On-die termination was enabled at suspend.
    pub odt: bool,
    /// The watchdog was armed at suspend; resume must rearm it before its
    /// first unbounded wait.
    pub watchdog_was_armed: bool,
    pub channels: [ChannelSnapshot; CHANNEL_COUNT],
}

impl SuspendSnapshot {
    pub const fn new() -> Self {
        Self {
            dpll: DpllSnapshot::zeroed(),
            freq: Hertz::from_raw(0),
            odt: false,
            watchdog_was_armed: false,
            channels: [ChannelSnapshot::zeroed(); CHANNEL_COUNT],
        }
    }
}

impl Default for SuspendSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// Reserved always-on SRAM region the snapshot must fit.
pub const SNAPSHOT_REGION_SIZE: usize = 8192;

static_assertions::const_assert!(
    core::mem::size_of::<SuspendSnapshot>() <= SNAPSHOT_REGION_SIZE
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    /// The captured PLL control words cannot describe a running clock.
    #[error("dpll state malformed: {0}")]
    Clock(#[from] ClockError),
}

/// Snapshot the controller, PHY and clock state of all populated channels.
///
/// Preconditions: the controller is quiescent (no in-flight transaction) and
/// self-refresh has not been entered yet. The only failure path is a
/// malformed PLL readout, which cannot occur while the DDR clock is running.
pub fn capture<B: DmcBus>(
    bus: &mut B,
    params: &SdramParams,
    snapshot: &mut SuspendSnapshot,
) -> Result<(), CaptureError> {
    snapshot.dpll = clocks::capture_dpll(bus);
    snapshot.freq = snapshot.dpll.frequency()?;
    log::info!("suspend: ddr frequency {} MHz", snapshot.freq.to_MHz());

    let pad_term = bus.read(dmc::phy_reg(0, phy::PAD_TERM_REG));
    snapshot.odt = (pad_term >> phy::PAD_TERM_ODT_SHIFT) & phy::PAD_TERM_ODT_MASK != 0;
    snapshot.watchdog_was_armed = wdg::is_armed(bus);

    for channel in params.present_channels() {
        capture_channel(bus, channel, &mut snapshot.channels[channel]);
    }
    Ok(())
}

fn capture_channel<B: DmcBus>(bus: &mut B, channel: usize, snap: &mut ChannelSnapshot) {
    bus.read_block(dmc::ctl_reg(channel, 0), &mut snap.ctl);
    // The start triggers must never be replayed as 1; they are asserted
    // explicitly at the right point of the programming sequence.
    snap.ctl[0] &= !ctl::START;
    bus.read_block(dmc::pi_reg(channel, 0), &mut snap.pi);
    snap.pi[0] &= !pi::START;

    // Byte lane 0 serves as the replay template for all four lanes.
    bus.read_block(dmc::phy_reg(channel, 0), &mut snap.phy.data_slice);
    for (i, block) in snap.phy.adr_slice.iter_mut().enumerate() {
        bus.read_block(
            dmc::phy_reg(channel, phy::ADR_SLICE_BASE + i * phy::LANE_STRIDE),
            block,
        );
    }
    bus.read_block(dmc::phy_reg(channel, phy::TOP_BASE), &mut snap.phy.top);

    for (lane, slot) in snap.rx_cal_dqs.iter_mut().enumerate() {
        *slot = bus.read(dmc::phy_reg(channel, phy::lane_reg(phy::RX_CAL_DQS_REG, lane)))
            & phy::RX_CAL_DQS_MASK;
    }

    // The replayed PHY must come up with the DLL held in reset (released only
    // once the controller is about to start, to avoid a clock glitch) and
    // with the frequency select pinned to the register-driven primary
    // profile.
    let dll_rst = &mut snap.phy.top[phy::DLL_RST_REG - phy::TOP_BASE];
    *dll_rst = (*dll_rst & !phy::DLL_RST_MASK) | phy::DLL_RST_HOLD;
    let freq_sel = &mut snap.phy.top[phy::FREQ_SEL_REG - phy::TOP_BASE];
    *freq_sel |= phy::FREQ_SEL_FROM_REGS;
    *freq_sel &= !phy::FREQ_SEL_INDEX_MASK;
}

/// Outer retry policy for the whole-system resume loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Retry forever; a persistent failure is ended by the watchdog.
    Forever,
    /// Give up after this many attempts (at least one runs).
    Limited(u32),
}

/// A single resume attempt failed; the whole sequence restarts from reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AttemptError {
    #[error(transparent)]
    Start(#[from] StartTimeout),
    #[error(transparent)]
    Training(#[from] TrainingError),
}

/// Bounded controller-ready poll exceeded its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("channel {channel} controller not ready within poll budget")]
pub struct StartTimeout {
    pub channel: u8,
}

/// A hardware error status was observed during a calibration phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{phase:?} training failed on channel {channel}")]
pub struct TrainingError {
    pub channel: u8,
    pub phase: TrainingPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ResumeError {
    /// Every permitted attempt failed; carries the last fault.
    #[error("resume attempts exhausted: {0}")]
    AttemptsExhausted(AttemptError),
    /// The post-resume switch to the secondary frequency profile failed.
    #[error("frequency index switch failed: {0}")]
    IndexSwitch(#[from] IndexSwitchError),
}

/// Rebuild the memory subsystem from a snapshot.
///
/// Runs reset → program → start → train → configure for every populated
/// channel, restarting the whole sequence from reset on any start or
/// training failure, then programs the system-wide configuration and
/// switches to the secondary frequency profile. Executes entirely from the
/// caller's resident image; DRAM contents are preserved in self-refresh
/// throughout.
pub fn resume<B: DmcBus, D: DelayNs>(
    bus: &mut B,
    delay: &mut D,
    params: &SdramParams,
    snapshot: &SuspendSnapshot,
    retry: RetryPolicy,
    reset_hold: &mut SharedResetControl,
) -> Result<(), ResumeError> {
    // Unbounded waits follow; the watchdog is the only way out of a wedge.
    if snapshot.watchdog_was_armed {
        wdg::rearm(bus);
    }

    clocks::restore_dpll(bus, &snapshot.dpll);

    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match resume_attempt(bus, delay, params, snapshot) {
            Ok(()) => break,
            Err(fault) => {
                log::warn!("resume attempt {} failed: {}", attempt, fault);
                match retry {
                    RetryPolicy::Forever => continue,
                    RetryPolicy::Limited(max) if attempt < max => continue,
                    RetryPolicy::Limited(_) => {
                        return Err(ResumeError::AttemptsExhausted(fault));
                    }
                }
            }
        }
    }

    config::finalize(bus, params, reset_hold);

    let mut index = FrequencyIndex::Primary;
    config::switch_to_next_index(bus, params, &mut index)?;
    Ok(())
}

fn resume_attempt<B: DmcBus, D: DelayNs>(
    bus: &mut B,
    delay: &mut D,
    params: &SdramParams,
    snapshot: &SuspendSnapshot,
) -> Result<(), AttemptError> {
    for channel in params.present_channels() {
        ll::reset_channel(bus, delay, channel as u8);
        if params.dram_type == DramType::Lpddr4 {
            // LPDDR4 writes garbage patterns without the master-mode
            // override matching the operating frequency.
            ll::set_dll_bypass(bus, channel, snapshot.freq);
        }
        ll::program_channel(bus, channel, &snapshot.channels[channel]);
    }

    ll::start_channels(bus, delay, params.channel_mask(), snapshot)?;

    for channel in params.present_channels() {
        if params.dram_type == DramType::Lpddr3 {
            // LPDDR3 needs the device auto-init to finish, at most 10 us.
            delay.delay_us(10);
        }
        if params.dram_type != DramType::Lpddr4 {
            let geometry = &params.channels[channel];
            training::train(
                bus,
                channel as u8,
                params.dram_type.full_training(),
                geometry.rank,
                params.dram_type.rank_presence_mask(geometry.rank),
            )?;
        }
        config::set_ddrconfig(bus, params, channel);
    }
    Ok(())
}

#[cfg(test)]
mod tests;
