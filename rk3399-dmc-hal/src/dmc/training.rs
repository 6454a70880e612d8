//! Hardware calibration ("training") engine.
//!
//! Each phase is armed on the protocol interface, requested per rank (or per
//! chip-select slot) and then polled for completion on the PI leveling
//! interrupt status. Two independent error channels are watched on every
//! iteration: the phase's own error bit in the interrupt status and, where
//! the PHY provides them, the per-slice observation registers. Either aborts
//! the run immediately.
use rk3399_dmc::dmc::{self, ctl, phy, pi};

use crate::bus::DmcBus;
use crate::poll;

use super::{TrainingError, TrainingPhase};

/// How a phase iterates the ranks of a channel.
#[derive(Clone, Copy)]
enum RankIteration {
    /// One run per rank, 0..rank_count.
    PerRank,
    /// One run per populated slot of the 4-bit presence mask.
    PerSlot,
}

/// Register/bit binding of one phase.
struct PhaseHw {
    en_reg: usize,
    en_shift: u32,
    req_reg: usize,
    req_bit: u32,
    cs_shift: u32,
    /// Completion/error positions within the shifted interrupt status.
    done_bit: u32,
    err_bit: u32,
    /// Secondary observation registers and their error field.
    obs_regs: &'static [usize],
    obs_err_shift: u32,
    obs_err_mask: u32,
    iteration: RankIteration,
}

impl TrainingPhase {
    const fn hw(self) -> PhaseHw {
        match self {
            TrainingPhase::CommandAddress => PhaseHw {
                en_reg: pi::CALVL_EN_REG,
                en_shift: pi::CALVL_EN_SHIFT,
                req_reg: pi::CALVL_REQ_REG,
                req_bit: pi::CALVL_REQ_BIT,
                cs_shift: pi::CALVL_CS_SHIFT,
                done_bit: 11,
                err_bit: 5,
                obs_regs: &phy::CALVL_OBS_REGS,
                obs_err_shift: phy::CALVL_OBS_ERR_SHIFT,
                obs_err_mask: phy::CALVL_OBS_ERR_MASK,
                iteration: RankIteration::PerSlot,
            },
            TrainingPhase::WriteLeveling => PhaseHw {
                en_reg: pi::WRLVL_EN_REG,
                en_shift: pi::WRLVL_EN_SHIFT,
                req_reg: pi::WRLVL_REQ_REG,
                req_bit: pi::WRLVL_REQ_BIT,
                cs_shift: pi::WRLVL_CS_SHIFT,
                done_bit: 10,
                err_bit: 4,
                obs_regs: &phy::WRLVL_OBS_REGS,
                obs_err_shift: phy::WRLVL_OBS_ERR_SHIFT,
                obs_err_mask: phy::WRLVL_OBS_ERR_MASK,
                iteration: RankIteration::PerRank,
            },
            TrainingPhase::ReadGate => PhaseHw {
                en_reg: pi::RDGATE_EN_REG,
                en_shift: pi::RDGATE_EN_SHIFT,
                req_reg: pi::RDGATE_REQ_REG,
                req_bit: pi::RDGATE_REQ_BIT,
                cs_shift: pi::RDGATE_CS_SHIFT,
                done_bit: 9,
                err_bit: 3,
                obs_regs: &phy::GATE_OBS_REGS,
                obs_err_shift: phy::GATE_OBS_ERR_SHIFT,
                obs_err_mask: phy::GATE_OBS_ERR_MASK,
                iteration: RankIteration::PerRank,
            },
            TrainingPhase::ReadLeveling => PhaseHw {
                en_reg: pi::RDLVL_EN_REG,
                en_shift: pi::RDLVL_EN_SHIFT,
                req_reg: pi::RDLVL_REQ_REG,
                req_bit: pi::RDLVL_REQ_BIT,
                cs_shift: pi::RDLVL_CS_SHIFT,
                done_bit: 8,
                err_bit: 2,
                obs_regs: &[],
                obs_err_shift: 0,
                obs_err_mask: 0,
                iteration: RankIteration::PerRank,
            },
            TrainingPhase::WriteDqLeveling => PhaseHw {
                en_reg: pi::WDQLVL_EN_REG,
                en_shift: pi::WDQLVL_EN_SHIFT,
                req_reg: pi::WDQLVL_REQ_REG,
                req_bit: pi::WDQLVL_REQ_BIT,
                cs_shift: pi::WDQLVL_CS_SHIFT,
                done_bit: 12,
                err_bit: 6,
                obs_regs: &[],
                obs_err_shift: 0,
                obs_err_mask: 0,
                iteration: RankIteration::PerSlot,
            },
        }
    }
}

/// Run the given calibration phases on one channel.
///
/// `rank_count` drives the per-rank phases, `rank_mask` the per-slot ones.
/// Polls are unbounded; an observed error aborts immediately and the caller
/// restarts the whole resume sequence.
pub fn train<B: DmcBus>(
    bus: &mut B,
    channel: u8,
    phases: &[TrainingPhase],
    rank_count: u8,
    rank_mask: u8,
) -> Result<(), TrainingError> {
    let ch = channel as usize;

    // Keep the DQS pads pulled while leveling runs.
    bus.set_bits(
        dmc::phy_reg(ch, phy::PAD_DQS_DRIVE_REG),
        phy::PAD_DQS_RPULL,
    );

    for &phase in phases {
        let hw = phase.hw();

        if phase == TrainingPhase::WriteDqLeveling {
            // VREF stepping interferes with DQ leveling.
            bus.clear_bits(
                dmc::pi_reg(ch, pi::WDQLVL_VREF_EN_REG),
                pi::WDQLVL_VREF_EN,
            );
        }

        let slots: u8 = match hw.iteration {
            RankIteration::PerRank => rank_count,
            RankIteration::PerSlot => 4,
        };
        for slot in 0..slots as u32 {
            if matches!(hw.iteration, RankIteration::PerSlot)
                && rank_mask & (1 << slot) == 0
            {
                continue;
            }

            select_per_cs_index(bus, ch, slot);

            bus.update(
                dmc::pi_reg(ch, hw.en_reg),
                0x3 << hw.en_shift,
                0x2 << hw.en_shift,
            );
            bus.update(
                dmc::pi_reg(ch, hw.req_reg),
                (1 << hw.req_bit) | (0x3 << hw.cs_shift),
                (1 << hw.req_bit) | (slot << hw.cs_shift),
            );

            poll::poll_unbounded(bus, |bus| {
                let status =
                    bus.read(dmc::pi_reg(ch, pi::INT_STATUS_REG)) >> pi::INT_STATUS_SHIFT;
                let obs_error = hw.obs_regs.iter().any(|&reg| {
                    (bus.read(dmc::phy_reg(ch, reg)) >> hw.obs_err_shift) & hw.obs_err_mask
                        != 0
                });
                if status & (1 << hw.err_bit) != 0 || obs_error {
                    return Some(Err(TrainingError { channel, phase }));
                }
                let done = status & (1 << hw.done_bit) != 0
                    && status & (1 << pi::INT_ACTIVE_BIT) != 0;
                done.then_some(Ok(()))
            })?;

            bus.write(
                dmc::pi_reg(ch, pi::INT_ACK_REG),
                pi::INT_ACK_ALL_LEVELING,
            );
        }

        if phase == TrainingPhase::WriteLeveling {
            override_write_leveling(bus, ch);
        }

        bus.clear_bits(dmc::pi_reg(ch, hw.en_reg), 0x3 << hw.en_shift);
    }

    bus.clear_bits(
        dmc::phy_reg(ch, phy::PAD_DQS_DRIVE_REG),
        phy::PAD_DQS_RPULL,
    );
    Ok(())
}

/// Point the per-CS training machinery at one rank, when the PHY supports
/// per-rank training at all; otherwise training applies globally.
fn select_per_cs_index<B: DmcBus>(bus: &mut B, channel: usize, rank: u32) {
    let capable =
        (bus.read(dmc::phy_reg(channel, phy::PER_CS_CAP_REG)) >> phy::PER_CS_CAP_BIT) & 1 != 0;
    if !capable {
        return;
    }
    for lane in 0..phy::LANE_COUNT {
        bus.update(
            dmc::phy_reg(channel, phy::lane_reg(phy::PER_CS_CTRL_REG, lane)),
            1 << phy::PER_CS_INDEX_BIT,
            rank << phy::PER_CS_INDEX_BIT,
        );
    }
}

/// Mandatory post-write-leveling correction: multicast the fixed fine-delay
/// override into every lane, then tell the controller to latch the update.
fn override_write_leveling<B: DmcBus>(bus: &mut B, channel: usize) {
    for lane in 0..phy::LANE_COUNT {
        bus.update(
            dmc::phy_reg(channel, phy::lane_reg(phy::PER_CS_CTRL_REG, lane)),
            1 << phy::MULTICAST_EN_BIT,
            1 << phy::MULTICAST_EN_BIT,
        );
        bus.update(
            dmc::phy_reg(channel, phy::lane_reg(phy::WRLVL_DELAY_REG, lane)),
            phy::WRLVL_DELAY_MASK,
            phy::WRLVL_DELAY_OVERRIDE,
        );
    }
    bus.update(
        dmc::ctl_reg(channel, ctl::UPDATE_REG),
        ctl::CONTROLLER_UPDATE_REQ,
        ctl::CONTROLLER_UPDATE_REQ,
    );
}
