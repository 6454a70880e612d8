use std::vec;
use std::vec::Vec;

use arbitrary_int::u5;
use rk3399_dmc::dmc::{self, ctl, phy, pi};
use rk3399_dmc::{cic, cru, msch, sgrf, wdt};

use super::*;
use crate::testutil::{Access, InstantDelay, SimBus};

fn ddr3_params() -> SdramParams {
    SdramParams {
        dram_type: DramType::Ddr3,
        channels: [
            ChannelParams {
                rank: 1,
                col: 10,
                bank: 3,
                bus_width: 2,
                cs0_row: 15,
                cs1_row: 0,
                row_3_4: false,
                ddr_config: 3,
                noc: NocTimings {
                    ddrtiminga0: 0x1011_1111,
                    ddrtimingb0: 0x2022_2222,
                    ddrtimingc0: 0x3033_3333,
                    devtodev: 0x4044_4444,
                    ddrmode: 0x5055_5555,
                },
            },
            ChannelParams::default(),
        ],
        stride: u5::new(9),
    }
}

fn dual_channel_params() -> SdramParams {
    let mut params = ddr3_params();
    params.channels[1] = params.channels[0];
    params
}

/// Bus seeded with the pre-suspend hardware state of the §8 scenario:
/// 800 MHz DPLL, ODT on, start triggers set, calibrated lanes.
fn suspended_bus() -> SimBus {
    let mut bus = SimBus::new();
    // fbdiv 100, refdiv 1, postdiv1 3, postdiv2 1 -> 800 MHz.
    bus.set(cru::pll_con(cru::DPLL, 0), 100);
    bus.set(cru::pll_con(cru::DPLL, 1), (1 << 12) | (3 << 8) | 1);
    bus.set(cru::DDR_CLKSEL_CON, 0x0043);
    bus.set(dmc::phy_reg(0, phy::PAD_TERM_REG), 1 << phy::PAD_TERM_ODT_SHIFT);
    // Both banks were running when captured.
    bus.set(dmc::ctl_reg(0, 0), ctl::START | 0xAB00);
    bus.set(dmc::pi_reg(0, 0), pi::START | 0xCD00);
    // Live DLL state differs from what the snapshot must force.
    bus.set(dmc::phy_reg(0, phy::DLL_RST_REG), phy::DLL_RST_RELEASE);
    bus.set(
        dmc::phy_reg(0, phy::FREQ_SEL_REG),
        phy::FREQ_SEL_INDEX_MASK,
    );
    for lane in 0..phy::LANE_COUNT {
        bus.set(
            dmc::phy_reg(0, phy::lane_reg(phy::RX_CAL_DQS_REG, lane)),
            (0x123 + lane as u32) << 16 | 0x7,
        );
    }
    bus
}

fn captured_snapshot(params: &SdramParams) -> SuspendSnapshot {
    let mut bus = suspended_bus();
    let mut snapshot = SuspendSnapshot::new();
    capture(&mut bus, params, &mut snapshot).unwrap();
    snapshot
}

/// Script the status registers a clean resume observes: PHY lock after three
/// polls, controller ready after two, every training phase done on its first
/// poll and both index-switch handshakes immediate.
fn script_clean_resume(bus: &mut SimBus, channels: &[usize]) {
    bus.script(cru::pll_con(cru::DPLL, 2), &[1 << 31]);
    let all_phases_done = 0x3F << (8 + pi::INT_STATUS_SHIFT);
    for &ch in channels {
        bus.script(dmc::phy_reg(ch, 920), &[0, 0, 0x1_0000]);
        bus.script(dmc::phy_reg(ch, 921), &[0x1_0001]);
        bus.script(dmc::phy_reg(ch, 922), &[0x1]);
        bus.script(dmc::ctl_reg(ch, ctl::STATUS_REG), &[0, ctl::CONTROLLER_READY]);
        bus.script(dmc::pi_reg(ch, pi::INT_STATUS_REG), &[all_phases_done]);
    }
    bus.script(cic::STATUS0, &[0x5]);
}

fn reset_hold() -> SharedResetControl {
    unsafe { SharedResetControl::new() }
}

#[test]
fn capture_masks_start_triggers() {
    let params = ddr3_params();
    let snapshot = captured_snapshot(&params);
    let ch = &snapshot.channels[0];
    assert_eq!(ch.ctl[0] & ctl::START, 0);
    assert_eq!(ch.ctl[0], 0xAB00);
    assert_eq!(ch.pi[0] & pi::START, 0);
    assert_eq!(ch.pi[0], 0xCD00);
}

#[test]
fn capture_pins_dll_and_frequency_select() {
    let params = ddr3_params();
    let snapshot = captured_snapshot(&params);
    let top = &snapshot.channels[0].phy.top;
    assert_eq!(
        top[phy::DLL_RST_REG - phy::TOP_BASE] & phy::DLL_RST_MASK,
        phy::DLL_RST_HOLD
    );
    let freq_sel = top[phy::FREQ_SEL_REG - phy::TOP_BASE];
    assert_eq!(freq_sel & phy::FREQ_SEL_FROM_REGS, phy::FREQ_SEL_FROM_REGS);
    assert_eq!(freq_sel & phy::FREQ_SEL_INDEX_MASK, 0);
}

#[test]
fn capture_derives_frequency_odt_and_lane_calibration() {
    let params = ddr3_params();
    let snapshot = captured_snapshot(&params);
    assert_eq!(snapshot.freq, crate::time::Hertz::from_raw(800_000_000));
    assert!(snapshot.odt);
    assert!(!snapshot.watchdog_was_armed);
    assert_eq!(snapshot.channels[0].rx_cal_dqs[0], 0x123 << 16);
    assert_eq!(snapshot.channels[0].rx_cal_dqs[3], 0x126 << 16);
}

#[test]
fn full_resume_scenario() {
    let params = ddr3_params();
    let snapshot = captured_snapshot(&params);

    let mut bus = SimBus::new();
    script_clean_resume(&mut bus, &[0]);
    let mut delay = InstantDelay;
    let result = resume(
        &mut bus,
        &mut delay,
        &params,
        &snapshot,
        RetryPolicy::Limited(1),
        &mut reset_hold(),
    );
    assert_eq!(result, Ok(()));

    // Zero retries: exactly one three-step reset sequence.
    assert_eq!(
        bus.writes_to(cru::DMC_SOFTRST_CON),
        vec![
            cru::dmc_softrst(0, true, true),
            cru::dmc_softrst(0, true, false),
            cru::dmc_softrst(0, false, false),
        ]
    );
    // PHY lock observed on the third poll, ready handshake on the second.
    assert_eq!(bus.reads_of(dmc::phy_reg(0, 920)), 3);
    assert_eq!(bus.reads_of(dmc::ctl_reg(0, ctl::STATUS_REG)), 2);
    // Self-refresh-exit pending cleared again after the handshake.
    assert_eq!(
        bus.value(dmc::ctl_reg(0, ctl::SREFRESH_EXIT_REG)) & ctl::PWRUP_SREFRESH_EXIT,
        0
    );
    // The four lane calibration values came back.
    for lane in 0..phy::LANE_COUNT {
        assert_eq!(
            bus.value(dmc::phy_reg(0, phy::lane_reg(phy::RX_CAL_DQS_REG, lane)))
                & phy::RX_CAL_DQS_MASK,
            (0x123 + lane as u32) << 16
        );
    }
    // Write-leveling fixup reached every lane plus the controller.
    for lane in 0..phy::LANE_COUNT {
        assert_eq!(
            bus.value(dmc::phy_reg(0, phy::lane_reg(phy::WRLVL_DELAY_REG, lane)))
                & phy::WRLVL_DELAY_MASK,
            phy::WRLVL_DELAY_OVERRIDE
        );
    }
    assert_ne!(
        bus.value(dmc::ctl_reg(0, ctl::UPDATE_REG)) & ctl::CONTROLLER_UPDATE_REQ,
        0
    );
    // Geometry derived from (row=15, col=10, bank=3, width=2): 1 GB cs0.
    assert_eq!(bus.value(msch::base(0) + msch::DEVICESIZE), 32);
    assert_eq!(bus.value(msch::base(0) + msch::DEVICECONF), 0xC3);
    // Stride policy and the shared reset-hold release.
    assert_eq!(
        bus.writes_to(sgrf::SOC_CON4),
        vec![sgrf::stride_word(u5::new(9))]
    );
    assert_eq!(
        bus.value(cru::GLB_RST_CON) & cru::GLB_RST_CON_SRST_MASK,
        cru::GLB_RST_CON_SRST_MASK
    );
    // The watchdog was not armed at suspend, so resume must not arm it.
    assert_eq!(bus.writes_to(wdt::CRR), Vec::new());
}

#[test]
fn resume_round_trips_clock_and_odt_state() {
    let params = ddr3_params();
    let snapshot = captured_snapshot(&params);

    let mut bus = SimBus::new();
    script_clean_resume(&mut bus, &[0]);
    resume(
        &mut bus,
        &mut InstantDelay,
        &params,
        &snapshot,
        RetryPolicy::Limited(1),
        &mut reset_hold(),
    )
    .unwrap();

    // The DPLL divider fields land back in the hardware unchanged.
    assert_eq!(bus.value(cru::pll_con(cru::DPLL, 0)) & 0xFFF, 100);
    assert_eq!(
        bus.value(cru::pll_con(cru::DPLL, 1)) & 0x7F3F,
        (1 << 12) | (3 << 8) | 1
    );
    assert_eq!(bus.value(cru::DDR_CLKSEL_CON) & 0xFFFF, 0x0043);
    // The ODT-carrying pad register is replayed verbatim.
    assert_eq!(
        bus.value(dmc::phy_reg(0, phy::PAD_TERM_REG)),
        1 << phy::PAD_TERM_ODT_SHIFT
    );
}

#[test]
fn ready_poll_never_precedes_start_trigger() {
    let params = ddr3_params();
    let snapshot = captured_snapshot(&params);

    let mut bus = SimBus::new();
    script_clean_resume(&mut bus, &[0]);
    resume(
        &mut bus,
        &mut InstantDelay,
        &params,
        &snapshot,
        RetryPolicy::Limited(1),
        &mut reset_hold(),
    )
    .unwrap();

    let trigger = bus
        .position_of(Access::Write {
            addr: dmc::ctl_reg(0, 0),
            value: 0xAB00 | ctl::START,
        })
        .expect("controller start trigger missing");
    let first_ready_read = bus
        .position_of(Access::Read(dmc::ctl_reg(0, ctl::STATUS_REG)))
        .expect("ready poll missing");
    assert!(trigger < first_ready_read);
}

#[test]
fn persistent_training_error_restarts_everything_from_reset() {
    let params = dual_channel_params();
    let snapshot = captured_snapshot(&params);

    let mut bus = SimBus::new();
    script_clean_resume(&mut bus, &[0, 1]);
    // Write leveling reports its error bit on every poll.
    let wrlvl_error = 1 << (4 + pi::INT_STATUS_SHIFT);
    bus.script(dmc::pi_reg(0, pi::INT_STATUS_REG), &[wrlvl_error]);
    bus.script(dmc::pi_reg(1, pi::INT_STATUS_REG), &[wrlvl_error]);

    let result = resume(
        &mut bus,
        &mut InstantDelay,
        &params,
        &snapshot,
        RetryPolicy::Limited(2),
        &mut reset_hold(),
    );
    assert_eq!(
        result,
        Err(ResumeError::AttemptsExhausted(AttemptError::Training(
            TrainingError {
                channel: 0,
                phase: TrainingPhase::WriteLeveling,
            }
        )))
    );

    // Both attempts reset both channels: 2 attempts x 2 channels x 3 steps.
    let resets = bus.writes_to(cru::DMC_SOFTRST_CON);
    assert_eq!(resets.len(), 12);
    assert_eq!(resets[3], cru::dmc_softrst(1, true, true));

    // The second pass through reset happens after the first training poll:
    // the restart covers the whole system, not just the failing phase.
    let first_training_poll = bus
        .position_of(Access::Read(dmc::pi_reg(0, pi::INT_STATUS_REG)))
        .unwrap();
    let second_reset = bus
        .log
        .iter()
        .enumerate()
        .filter(|(_, a)| {
            **a == Access::Write {
                addr: cru::DMC_SOFTRST_CON,
                value: cru::dmc_softrst(0, true, true),
            }
        })
        .map(|(i, _)| i)
        .nth(1)
        .expect("no second whole-system reset");
    assert!(second_reset > first_training_poll);
}

#[test]
fn start_timeout_is_reported_when_ready_never_comes() {
    let params = ddr3_params();
    let snapshot = captured_snapshot(&params);

    let mut bus = SimBus::new();
    script_clean_resume(&mut bus, &[0]);
    bus.script(dmc::ctl_reg(0, ctl::STATUS_REG), &[0]);

    let result = resume(
        &mut bus,
        &mut InstantDelay,
        &params,
        &snapshot,
        RetryPolicy::Limited(1),
        &mut reset_hold(),
    );
    assert_eq!(
        result,
        Err(ResumeError::AttemptsExhausted(AttemptError::Start(
            StartTimeout { channel: 0 }
        )))
    );
    // The bounded budget: exactly 100 ready polls.
    assert_eq!(bus.reads_of(dmc::ctl_reg(0, ctl::STATUS_REG)), 100);
}

#[test]
fn reset_sequence_is_idempotent() {
    let mut bus = SimBus::new();
    ll::reset_channel(&mut bus, &mut InstantDelay, 0);
    let first = bus.log.clone();
    ll::reset_channel(&mut bus, &mut InstantDelay, 0);
    assert_eq!(bus.log[first.len()..], first[..]);
}

#[test]
fn watchdog_rearmed_before_first_unbounded_wait() {
    let params = ddr3_params();
    let mut snapshot = captured_snapshot(&params);
    snapshot.watchdog_was_armed = true;

    let mut bus = SimBus::new();
    script_clean_resume(&mut bus, &[0]);
    resume(
        &mut bus,
        &mut InstantDelay,
        &params,
        &snapshot,
        RetryPolicy::Limited(1),
        &mut reset_hold(),
    )
    .unwrap();

    let rearmed = bus
        .position_of(Access::Write {
            addr: wdt::CRR,
            value: wdt::CRR_RESTART_KEY,
        })
        .expect("watchdog not rearmed");
    let first_lock_poll = bus
        .position_of(Access::Read(cru::pll_con(cru::DPLL, 2)))
        .unwrap();
    assert!(rearmed < first_lock_poll);
}

#[test]
fn second_index_switch_is_rejected() {
    let params = ddr3_params();
    let mut bus = SimBus::new();
    script_clean_resume(&mut bus, &[0]);

    let mut index = FrequencyIndex::Primary;
    config::switch_to_next_index(&mut bus, &params, &mut index).unwrap();
    assert_eq!(index, FrequencyIndex::Secondary);
    assert_eq!(
        config::switch_to_next_index(&mut bus, &params, &mut index),
        Err(IndexSwitchError::AlreadySwitched)
    );
}

#[test]
fn index_switch_skips_training_for_lpddr4() {
    let mut params = ddr3_params();
    params.dram_type = DramType::Lpddr4;
    let mut bus = SimBus::new();
    script_clean_resume(&mut bus, &[0]);

    let mut index = FrequencyIndex::Primary;
    config::switch_to_next_index(&mut bus, &params, &mut index).unwrap();
    // No training request was ever issued.
    assert_eq!(bus.reads_of(dmc::pi_reg(0, pi::INT_STATUS_REG)), 0);
}

#[test]
fn full_training_sets_per_type() {
    use TrainingPhase::*;
    assert_eq!(
        DramType::Ddr3.full_training(),
        &[WriteLeveling, ReadGate, ReadLeveling]
    );
    assert_eq!(
        DramType::Lpddr3.full_training(),
        &[CommandAddress, WriteLeveling, ReadGate]
    );
    assert_eq!(
        DramType::Lpddr4.full_training(),
        &[WriteLeveling, ReadGate, ReadLeveling, WriteDqLeveling]
    );
}

#[test]
fn rank_presence_masks() {
    assert_eq!(DramType::Lpddr4.rank_presence_mask(1), 0x5);
    assert_eq!(DramType::Lpddr4.rank_presence_mask(2), 0xF);
    assert_eq!(DramType::Lpddr3.rank_presence_mask(1), 0x1);
    assert_eq!(DramType::Ddr3.rank_presence_mask(2), 0x3);
}

#[test]
fn dram_type_decodes_from_boot_tag() {
    assert_eq!(DramType::from_os_reg(3 << 13), Ok(DramType::Ddr3));
    assert_eq!(DramType::from_os_reg(7 << 13), Ok(DramType::Lpddr4));
    assert_eq!(DramType::from_os_reg(1 << 13), Err(UnknownDramType(1)));
}

#[test]
fn channel_mask_follows_population() {
    assert_eq!(ddr3_params().channel_mask(), 0b01);
    assert_eq!(dual_channel_params().channel_mask(), 0b11);
    assert_eq!(
        ddr3_params().present_channels().collect::<Vec<_>>(),
        vec![0]
    );
}

#[test]
fn observation_error_aborts_command_address_training() {
    let mut bus = SimBus::new();
    // Interrupt status pending forever; the secondary observation registers
    // must still abort the poll.
    bus.script(dmc::pi_reg(0, pi::INT_STATUS_REG), &[0]);
    bus.set(
        dmc::phy_reg(0, phy::CALVL_OBS_REGS[1]),
        1 << phy::CALVL_OBS_ERR_SHIFT,
    );
    let result = training::train(
        &mut bus,
        0,
        &[TrainingPhase::CommandAddress],
        1,
        DramType::Lpddr3.rank_presence_mask(1),
    );
    assert_eq!(
        result,
        Err(TrainingError {
            channel: 0,
            phase: TrainingPhase::CommandAddress,
        })
    );
}

#[test]
fn training_acks_interrupts_between_ranks() {
    let mut bus = SimBus::new();
    let all_done = 0x3F << (8 + pi::INT_STATUS_SHIFT);
    bus.script(dmc::pi_reg(0, pi::INT_STATUS_REG), &[all_done]);
    training::train(&mut bus, 0, &[TrainingPhase::ReadGate], 2, 0x3).unwrap();
    // One ack per rank.
    assert_eq!(
        bus.writes_to(dmc::pi_reg(0, pi::INT_ACK_REG)),
        vec![pi::INT_ACK_ALL_LEVELING, pi::INT_ACK_ALL_LEVELING]
    );
}

#[test]
fn per_cs_training_index_follows_capability_bit() {
    let mut bus = SimBus::new();
    let all_done = 0x3F << (8 + pi::INT_STATUS_SHIFT);
    bus.script(dmc::pi_reg(0, pi::INT_STATUS_REG), &[all_done]);
    bus.set(dmc::phy_reg(0, phy::PER_CS_CAP_REG), 1 << phy::PER_CS_CAP_BIT);
    training::train(&mut bus, 0, &[TrainingPhase::ReadLeveling], 2, 0x3).unwrap();
    // Rank 1 selected on all four lanes on the second pass.
    assert_eq!(
        bus.value(dmc::phy_reg(0, phy::lane_reg(phy::PER_CS_CTRL_REG, 3)))
            & (1 << phy::PER_CS_INDEX_BIT),
        1 << phy::PER_CS_INDEX_BIT
    );
}
