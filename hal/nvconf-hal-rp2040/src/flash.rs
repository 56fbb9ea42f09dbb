//! Flash driver for RP2040
//!
//! Reserves the top of the 2MB flash for the configuration image and wraps
//! `embassy-rp`'s async driver in [`NorFlashRegion`].

use embassy_rp::dma::Channel;
use embassy_rp::flash::{Async, Flash, ERASE_SIZE};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;

use nvconf_hal::NorFlashRegion;

/// Flash storage configuration
pub const FLASH_SIZE: usize = 2 * 1024 * 1024; // 2MB flash on typical RP2040 boards
pub const CONFIG_PARTITION_SIZE: usize = 16 * 1024; // 16KB for config
pub const CONFIG_PARTITION_START: usize = FLASH_SIZE - CONFIG_PARTITION_SIZE;

/// Flash erase size for RP2040
pub const FLASH_ERASE_SIZE: usize = ERASE_SIZE;

/// Flash range for the config partition
pub const CONFIG_RANGE: core::ops::Range<u32> =
    (CONFIG_PARTITION_START as u32)..(FLASH_SIZE as u32);

// Partition must be sector aligned for erase
const _: () = assert!(CONFIG_PARTITION_SIZE % ERASE_SIZE == 0);

/// The raw embassy driver type backing the config region
pub type Rp2040Flash<'d> = Flash<'d, FLASH, Async, FLASH_SIZE>;

/// RP2040 configuration flash region
pub type Rp2040ConfigFlash<'d> = NorFlashRegion<Rp2040Flash<'d>>;

/// Create the configuration flash region
pub fn config_flash<'d>(flash: Peri<'d, FLASH>, dma: Peri<'d, impl Channel>) -> Rp2040ConfigFlash<'d> {
    NorFlashRegion::new(Flash::new(flash, dma), CONFIG_RANGE)
}
