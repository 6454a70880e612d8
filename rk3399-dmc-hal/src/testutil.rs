//! Scripted register bus for host-side tests.
use std::collections::BTreeMap;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;

use crate::bus::DmcBus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read(u32),
    Write { addr: u32, value: u32 },
    Barrier,
}

/// In-memory register bus with an access log and per-address scripted read
/// sequences (the last scripted value repeats forever).
pub struct SimBus {
    mem: BTreeMap<u32, u32>,
    scripts: BTreeMap<u32, (Vec<u32>, usize)>,
    pub log: Vec<Access>,
}

impl SimBus {
    pub fn new() -> Self {
        Self {
            mem: BTreeMap::new(),
            scripts: BTreeMap::new(),
            log: Vec::new(),
        }
    }

    /// Seed backing memory without logging.
    pub fn set(&mut self, addr: u32, value: u32) {
        self.mem.insert(addr, value);
    }

    /// Script the values successive reads of `addr` observe; the final value
    /// repeats. Scripted reads shadow backing memory.
    pub fn script(&mut self, addr: u32, values: &[u32]) {
        assert!(!values.is_empty());
        self.scripts.insert(addr, (values.to_vec(), 0));
    }

    /// Current backing-memory value (last write wins), default 0.
    pub fn value(&self, addr: u32) -> u32 {
        self.mem.get(&addr).copied().unwrap_or(0)
    }

    /// All values written to `addr`, in order.
    pub fn writes_to(&self, addr: u32) -> Vec<u32> {
        self.log
            .iter()
            .filter_map(|access| match access {
                Access::Write { addr: a, value } if *a == addr => Some(*value),
                _ => None,
            })
            .collect()
    }

    /// Number of reads of `addr`.
    pub fn reads_of(&self, addr: u32) -> usize {
        self.log
            .iter()
            .filter(|access| matches!(access, Access::Read(a) if *a == addr))
            .count()
    }

    /// Position of the first matching log entry.
    pub fn position_of(&self, access: Access) -> Option<usize> {
        self.log.iter().position(|a| *a == access)
    }
}

impl DmcBus for SimBus {
    fn read(&mut self, addr: u32) -> u32 {
        self.log.push(Access::Read(addr));
        if let Some((values, cursor)) = self.scripts.get_mut(&addr) {
            let value = values[(*cursor).min(values.len() - 1)];
            *cursor += 1;
            return value;
        }
        self.value(addr)
    }

    fn write(&mut self, addr: u32, value: u32) {
        self.log.push(Access::Write { addr, value });
        self.mem.insert(addr, value);
    }

    fn barrier(&mut self) {
        self.log.push(Access::Barrier);
    }
}

/// Delay provider that does not wait.
pub struct InstantDelay;

impl DelayNs for InstantDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}
