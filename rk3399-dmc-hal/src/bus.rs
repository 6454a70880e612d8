//! Register access seam for the suspend/resume engine.
//!
//! The whole engine runs against [DmcBus] instead of raw pointers. On
//! hardware the implementation is [MmioBus]; host tests drive the same
//! sequencing code through a scripted bus that records an access log.

/// Word-granular access to the memory-mapped register space of the DMC
/// complex.
pub trait DmcBus {
    fn read(&mut self, addr: u32) -> u32;

    fn write(&mut self, addr: u32, value: u32);

    /// Full store barrier: every prior write is globally visible before this
    /// returns.
    fn barrier(&mut self);

    #[inline]
    fn set_bits(&mut self, addr: u32, mask: u32) {
        let value = self.read(addr);
        self.write(addr, value | mask);
    }

    #[inline]
    fn clear_bits(&mut self, addr: u32, mask: u32) {
        let value = self.read(addr);
        self.write(addr, value & !mask);
    }

    /// Read-modify-write clearing `clear` and setting `set`.
    #[inline]
    fn update(&mut self, addr: u32, clear: u32, set: u32) {
        let value = self.read(addr);
        self.write(addr, (value & !clear) | set);
    }

    /// Replay a block of consecutive registers from a snapshot slice.
    #[inline]
    fn write_block(&mut self, mut addr: u32, values: &[u32]) {
        for &value in values {
            self.write(addr, value);
            addr += 4;
        }
    }

    /// Copy a block of consecutive registers into a snapshot slice.
    #[inline]
    fn read_block(&mut self, mut addr: u32, out: &mut [u32]) {
        for slot in out {
            *slot = self.read(addr);
            addr += 4;
        }
    }
}

/// Volatile MMIO implementation used on the target.
pub struct MmioBus {
    _private: (),
}

impl MmioBus {
    /// Create the MMIO bus.
    ///
    /// # Safety
    ///
    /// The caller must guarantee exclusive access to the DMC-complex register
    /// space for the lifetime of this value; the suspend/resume sequences
    /// perform read-modify-write cycles that must not race with any other
    /// master.
    #[inline]
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl DmcBus for MmioBus {
    #[inline]
    fn read(&mut self, addr: u32) -> u32 {
        unsafe { core::ptr::read_volatile(addr as usize as *const u32) }
    }

    #[inline]
    fn write(&mut self, addr: u32, value: u32) {
        unsafe { core::ptr::write_volatile(addr as usize as *mut u32, value) }
    }

    #[inline]
    fn barrier(&mut self) {
        #[cfg(target_arch = "aarch64")]
        unsafe {
            core::arch::asm!("dmb sy", options(nostack, preserves_flags));
        }
        core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
    }
}
