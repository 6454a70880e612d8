//! Clock-interchange block (CIC).
//!
//! The CIC serializes DMC frequency-profile switches against the rest of the
//! SoC: software requests a switch with a target profile index, waits for the
//! request to be accepted, acknowledges, and waits for completion.
use arbitrary_int::u2;

pub const CIC_BASE: u32 = 0xFF62_0000;

pub const CTRL0: u32 = CIC_BASE + 0x0;
pub const STATUS0: u32 = CIC_BASE + 0x10;

/// Lower half-word of CTRL0; writes must go through [crate::masked_write].
#[bitbybit::bitfield(u32, default = 0x0)]
pub struct Control0 {
    /// Frequency-profile index the switch should land on.
    #[bits(4..=5, rw)]
    target_index: u2,
    /// Quiesce the interconnect paths into the DMC for the switch window.
    #[bit(2, rw)]
    idle_request: bool,
    /// Acknowledge an accepted switch so the sequencer completes it.
    #[bit(1, rw)]
    ack_complete: bool,
    /// Start a frequency switch.
    #[bit(0, rw)]
    start_switch: bool,
}

/// CTRL0 bits used when triggering a switch (start, idle request, index).
pub const CTRL0_TRIGGER_MASK: u16 = (0x3 << 4) | (1 << 2) | 1;

/// CTRL0 bit used when acknowledging an accepted switch.
pub const CTRL0_ACK_MASK: u16 = 1 << 1;

#[bitbybit::bitfield(u32)]
pub struct Status0 {
    /// The switch request has been accepted by the sequencer.
    #[bit(2, r)]
    switch_accepted: bool,
    /// The switch has completed and the DMC runs on the target profile.
    #[bit(0, r)]
    switch_complete: bool,
}
