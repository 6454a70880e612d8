//! # Time units

/// Hertz
pub type Hertz = fugit::HertzU32;

/// MegaHertz
pub type MegaHertz = fugit::MegahertzU32;

/// Microseconds
pub type Microseconds = fugit::MicrosDurationU32;
