//! PMU general register file (PMUGRF), boot-state scratch words only.

pub const PMUGRF_BASE: u32 = 0xFF32_0000;

/// OS scratch registers; OS_REG2 carries the DRAM boot-state tag written by
/// the loader (type, channel population, geometry).
pub const OS_REG2: u32 = PMUGRF_BASE + 0x308;

/// DRAM type tag position within OS_REG2.
pub const OS_REG2_DDRTYPE_SHIFT: u32 = 13;
pub const OS_REG2_DDRTYPE_MASK: u32 = 0x7;
