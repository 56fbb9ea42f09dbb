//! RP2040 binding for the nvconf HAL
//!
//! Provides the configuration flash region on RP2040 boards: the last
//! sectors of the external QSPI flash, driven through `embassy-rp`'s async
//! flash driver and exposed as [`nvconf_hal::ConfigFlash`].

#![no_std]

pub mod flash;

// Re-export shared traits from nvconf-hal for convenience
pub use nvconf_hal::{ConfigFlash, FlashError, FlashRegion};
