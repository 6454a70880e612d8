//! Per-channel memory scheduler (MSCH) in the interconnect.
use arbitrary_int::u6;

/// MSCH register block base for the given channel.
#[inline]
pub const fn base(channel: usize) -> u32 {
    0xFFA8_4000 + (channel as u32) * 0x8000
}

pub const DEVICECONF: u32 = 0x0008;
pub const DEVICESIZE: u32 = 0x000C;
pub const DDRTIMINGA0: u32 = 0x0010;
pub const DDRTIMINGB0: u32 = 0x0014;
pub const DDRTIMINGC0: u32 = 0x0018;
pub const DEVTODEV0: u32 = 0x001C;
pub const DDRMODE: u32 = 0x0110;

/// Address-mapping selector; the scheduler expects the selected mapping index
/// mirrored into both fields.
#[bitbybit::bitfield(u32, default = 0x0)]
pub struct DeviceConf {
    #[bits(6..=11, rw)]
    mapping_hi: u6,
    #[bits(0..=5, rw)]
    mapping_lo: u6,
}

/// Per chip-select capacity in units of 32 MB.
#[bitbybit::bitfield(u32, default = 0x0)]
pub struct DeviceSize {
    #[bits(8..=15, rw)]
    cs1_capacity_div32: u8,
    #[bits(0..=7, rw)]
    cs0_capacity_div32: u8,
}
