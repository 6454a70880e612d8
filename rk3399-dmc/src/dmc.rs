//! Per-channel DMC complex: Denali memory controller (CTL), training
//! protocol interface (PI) and PHY register banks.
//!
//! The banks are word-indexed the way the vendor documents them
//! (`DENALI_CTL_nn` and friends); only the handful of registers the
//! suspend/resume path manipulates by field carry named constants here.

/// Channel register window base.
#[inline]
pub const fn channel_base(channel: usize) -> u32 {
    0xFFA8_0000 + (channel as u32) * 0x8000
}

const CTL_OFFSET: u32 = 0x0000;
const PI_OFFSET: u32 = 0x0800;
const PHY_OFFSET: u32 = 0x2000;

/// Address of `DENALI_CTL_n` for the given channel.
#[inline]
pub const fn ctl_reg(channel: usize, n: usize) -> u32 {
    channel_base(channel) + CTL_OFFSET + (n as u32) * 4
}

/// Address of `DENALI_PI_n` for the given channel.
#[inline]
pub const fn pi_reg(channel: usize, n: usize) -> u32 {
    channel_base(channel) + PI_OFFSET + (n as u32) * 4
}

/// Address of `DENALI_PHY_n` for the given channel.
#[inline]
pub const fn phy_reg(channel: usize, n: usize) -> u32 {
    channel_base(channel) + PHY_OFFSET + (n as u32) * 4
}

pub const CTL_REG_COUNT: usize = 332;
pub const PI_REG_COUNT: usize = 200;

pub mod ctl {
    /// CTL_00: controller start trigger.
    pub const START: u32 = 1 << 0;

    /// CTL_68 carries the self-refresh-exit-pending flag.
    pub const SREFRESH_EXIT_REG: usize = 68;
    pub const PWRUP_SREFRESH_EXIT: u32 = 1 << 16;

    /// CTL_111: currently active frequency-profile index in bit 16.
    pub const FREQ_INDEX_REG: usize = 111;
    pub const FREQ_INDEX_SHIFT: u32 = 16;

    /// CTL_200: controller update request.
    pub const UPDATE_REG: usize = 200;
    pub const CONTROLLER_UPDATE_REQ: u32 = 1 << 8;

    /// CTL_203: controller status; bit 3 reports the init/ready handshake.
    pub const STATUS_REG: usize = 203;
    pub const CONTROLLER_READY: u32 = 1 << 3;

    /// CTL_276: stop the memory clock towards an absent rank 1.
    pub const LOW_POWER_REG: usize = 276;
    pub const RANK1_CLK_DISABLE: u32 = 1 << 17;
}

pub mod pi {
    /// PI_00: protocol-interface start trigger.
    pub const START: u32 = 1 << 0;

    /// PI_174: leveling interrupt status, valid from bit 8 upwards.
    pub const INT_STATUS_REG: usize = 174;
    pub const INT_STATUS_SHIFT: u32 = 8;
    /// Global "operation done" bit within the shifted status word.
    pub const INT_ACTIVE_BIT: u32 = 13;

    /// PI_175: interrupt acknowledge; this value clears every leveling
    /// source at once.
    pub const INT_ACK_REG: usize = 175;
    pub const INT_ACK_ALL_LEVELING: u32 = 0x0000_3F7C;

    // Per-phase enable/request registers. The enable fields are two bits
    // wide (0b10 = armed); the request registers combine the request bit
    // with a two-bit chip-select index.

    /// Command-address leveling: PI_100 enable, PI_92 request.
    pub const CALVL_EN_REG: usize = 100;
    pub const CALVL_EN_SHIFT: u32 = 8;
    pub const CALVL_REQ_REG: usize = 92;
    pub const CALVL_REQ_BIT: u32 = 16;
    pub const CALVL_CS_SHIFT: u32 = 24;

    /// Write leveling: PI_60 enable, PI_59 request.
    pub const WRLVL_EN_REG: usize = 60;
    pub const WRLVL_EN_SHIFT: u32 = 8;
    pub const WRLVL_REQ_REG: usize = 59;
    pub const WRLVL_REQ_BIT: u32 = 8;
    pub const WRLVL_CS_SHIFT: u32 = 16;

    /// Read-gate training: PI_80 enable (high half), PI_74 request.
    pub const RDGATE_EN_REG: usize = 80;
    pub const RDGATE_EN_SHIFT: u32 = 24;
    pub const RDGATE_REQ_REG: usize = 74;
    pub const RDGATE_REQ_BIT: u32 = 16;
    pub const RDGATE_CS_SHIFT: u32 = 24;

    /// Read leveling: PI_80 enable (low half), PI_74 request.
    pub const RDLVL_EN_REG: usize = 80;
    pub const RDLVL_EN_SHIFT: u32 = 16;
    pub const RDLVL_REQ_REG: usize = 74;
    pub const RDLVL_REQ_BIT: u32 = 8;
    pub const RDLVL_CS_SHIFT: u32 = 24;

    /// Write DQ leveling: PI_124 enable, PI_121 request, PI_181 VREF enable.
    pub const WDQLVL_EN_REG: usize = 124;
    pub const WDQLVL_EN_SHIFT: u32 = 16;
    pub const WDQLVL_REQ_REG: usize = 121;
    pub const WDQLVL_REQ_BIT: u32 = 8;
    pub const WDQLVL_CS_SHIFT: u32 = 16;
    pub const WDQLVL_VREF_EN_REG: usize = 181;
    pub const WDQLVL_VREF_EN: u32 = 1 << 8;
}

pub mod phy {
    /// Data byte lanes per channel.
    pub const LANE_COUNT: usize = 4;
    /// Register stride between data-slice register sets.
    pub const LANE_STRIDE: usize = 128;

    /// Data-slice registers captured as the per-lane replay template.
    pub const DATA_SLICE_REG_COUNT: usize = 91;
    /// Address-slice register blocks (PHY_512/640/768 + 38 each).
    pub const ADR_SLICE_BASE: usize = 512;
    pub const ADR_SLICE_COUNT: usize = 3;
    pub const ADR_SLICE_REG_COUNT: usize = 38;
    /// Top-level block (PHY_896..).
    pub const TOP_BASE: usize = 896;
    pub const TOP_REG_COUNT: usize = 63;

    /// Data-slice register `n` of the given byte lane.
    #[inline]
    pub const fn lane_reg(n: usize, lane: usize) -> usize {
        n + LANE_STRIDE * lane
    }

    /// PHY_5: pad termination select for byte 0; a non-zero ODT field in
    /// bits 16..=18 means on-die termination is enabled.
    pub const PAD_TERM_REG: usize = 5;
    pub const PAD_TERM_ODT_SHIFT: u32 = 16;
    pub const PAD_TERM_ODT_MASK: u32 = 0x7;

    /// PHY_8 (+128·lane): per-CS training index (bit 24) and write-leveling
    /// multicast enable (bit 16).
    pub const PER_CS_CTRL_REG: usize = 8;
    pub const PER_CS_INDEX_BIT: u32 = 24;
    pub const MULTICAST_EN_BIT: u32 = 16;

    /// PHY_57 (+128·lane): RX DQS calibration result in bits 16..=27.
    pub const RX_CAL_DQS_REG: usize = 57;
    pub const RX_CAL_DQS_MASK: u32 = 0xFFF << 16;

    /// PHY_63 (+128·lane): write-leveling fine delay in the upper half-word.
    pub const WRLVL_DELAY_REG: usize = 63;
    pub const WRLVL_DELAY_MASK: u32 = 0xFFFF << 16;
    /// Fine-delay override applied after write leveling.
    pub const WRLVL_DELAY_OVERRIDE: u32 = 0x200 << 16;

    /// PHY_84: per-CS training capability in bit 16.
    pub const PER_CS_CAP_REG: usize = 84;
    pub const PER_CS_CAP_BIT: u32 = 16;

    /// Data-slice DLL master-mode override fields (bits 10..=11).
    pub const DATA_SLICE_MASTER_REGS: [usize; 4] = [86, 214, 342, 470];
    pub const DATA_SLICE_MASTER_MODE_SW: u32 = 0x3 << 10;
    /// Address-slice DLL master-mode override fields (bits 18..=19).
    pub const ADR_SLICE_MASTER_REGS: [usize; 3] = [547, 675, 803];
    pub const ADR_SLICE_MASTER_MODE_SW: u32 = 0x3 << 18;

    /// Write-leveling status observation registers, error flag in bit 12.
    pub const WRLVL_OBS_REGS: [usize; 4] = [40, 168, 296, 424];
    pub const WRLVL_OBS_ERR_SHIFT: u32 = 12;
    pub const WRLVL_OBS_ERR_MASK: u32 = 0x1;

    /// Gate-training status observation registers, error flags in
    /// bits 22..=23.
    pub const GATE_OBS_REGS: [usize; 4] = [43, 171, 299, 427];
    pub const GATE_OBS_ERR_SHIFT: u32 = 22;
    pub const GATE_OBS_ERR_MASK: u32 = 0x3;

    /// Command-address leveling observation registers, error flags in
    /// bits 30..=31.
    pub const CALVL_OBS_REGS: [usize; 3] = [532, 660, 788];
    pub const CALVL_OBS_ERR_SHIFT: u32 = 30;
    pub const CALVL_OBS_ERR_MASK: u32 = 0x3;

    /// PHY_896: frequency-profile select (bits 8..=9) and the
    /// select-from-registers enable (bit 0).
    pub const FREQ_SEL_REG: usize = TOP_BASE;
    pub const FREQ_SEL_FROM_REGS: u32 = 1 << 0;
    pub const FREQ_SEL_INDEX_SHIFT: u32 = 8;
    pub const FREQ_SEL_INDEX_MASK: u32 = 0x3 << 8;

    /// PHY_911: PLL bypass indicator in bit 0.
    pub const PLL_BYPASS_REG: usize = 911;
    pub const PLL_BYPASS: u32 = 1 << 0;

    /// PHY PLL control triple replayed before the controller start trigger.
    pub const PLL_CTRL_BASE: usize = 910;
    pub const PLL_CTRL_COUNT: usize = 3;

    /// PHY_920..=922 spread the four PLL/DLL lock flags over two
    /// observation words each.
    pub const LOCK_OBS_REGS: [usize; 3] = [920, 921, 922];

    /// PHY_927: DQS pad pull-up enable during training.
    pub const PAD_DQS_DRIVE_REG: usize = 927;
    pub const PAD_DQS_RPULL: u32 = 1 << 22;

    /// PHY_957: DLL reset control field in bits 24..=25.
    pub const DLL_RST_REG: usize = 957;
    pub const DLL_RST_MASK: u32 = 0x3 << 24;
    /// Hold the DLL in reset.
    pub const DLL_RST_HOLD: u32 = 0x1 << 24;
    /// Intermediate release used once the controller is about to start.
    pub const DLL_RST_RELEASE: u32 = 0x2 << 24;
}

static_assertions::const_assert!(
    phy::TOP_BASE + phy::TOP_REG_COUNT > phy::DLL_RST_REG
);
static_assertions::const_assert!(
    phy::ADR_SLICE_BASE + 2 * phy::LANE_STRIDE + phy::ADR_SLICE_REG_COUNT
        <= phy::TOP_BASE
);
