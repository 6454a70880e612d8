//! Secure general register file (SGRF), memory interleave policy only.
use arbitrary_int::u5;

use crate::masked_write;

pub const SGRF_BASE: u32 = 0xFF33_0000;

/// SOC_CON4 carries the system-wide channel interleave ("stride") policy.
pub const SOC_CON4: u32 = SGRF_BASE + 0xE010;

const STRIDE_SHIFT: u16 = 10;
const STRIDE_MASK: u16 = 0x1F << STRIDE_SHIFT;

/// Masked write programming the interleave stride.
#[inline]
pub const fn stride_word(stride: u5) -> u32 {
    masked_write(STRIDE_MASK, (stride.value() as u16) << STRIDE_SHIFT)
}
