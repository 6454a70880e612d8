//! # Suspend/resume engine for the RK3399 DRAM controller
//!
//! This crate snapshots the live state of the DRAM controller and PHY before
//! a deep low-power state removes their power, and rebuilds a calibrated,
//! operational memory subsystem on wake — without touching DRAM itself, which
//! is unusable for most of the sequence. It is meant to be linked into the
//! resident firmware image placed in always-on SRAM: the crate is `no_std`,
//! performs no allocation and keeps all state in caller-provided fixed-size
//! buffers.
//!
//! The power-management framework drives it with exactly two calls:
//! [`dmc::capture`] right before entering the low-power state and
//! [`dmc::resume`] on wake. Everything in between — reset sequencing,
//! register replay, the controller handshake, per-phase calibration training,
//! geometry programming and the switch to the second frequency profile — is
//! internal, with a whole-system retry on any start or training failure.
//!
//! All register traffic flows through the [`bus::DmcBus`] seam so the
//! sequencing logic can be exercised against a scripted register bus on the
//! host.
#![no_std]

#[cfg(test)]
extern crate std;

pub mod bus;
pub mod clocks;
pub mod delay;
pub mod dmc;
pub mod poll;
pub mod time;
pub mod wdg;

#[cfg(test)]
pub(crate) mod testutil;

pub use rk3399_dmc as pac;
