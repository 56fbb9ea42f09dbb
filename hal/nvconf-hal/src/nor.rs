//! `embedded-storage-async` adaptor
//!
//! Exposes a byte range of any async [`NorFlash`] device as a
//! [`ConfigFlash`] region. NOR devices driven through `embedded-storage`
//! have no hardware write protection, so lock/unlock only gate the
//! adaptor's own program/erase calls.
//!
//! The range must be aligned to the device's erase size, and the device's
//! write size must divide the store's program page size.

use core::ops::Range;

use embedded_storage_async::nor_flash::NorFlash;

use crate::flash::{ConfigFlash, FlashError, FlashRegion};

/// A [`NorFlash`] device restricted to one configuration range
pub struct NorFlashRegion<F> {
    flash: F,
    range: Range<u32>,
    locked: bool,
}

impl<F: NorFlash> NorFlashRegion<F> {
    /// Wrap `flash`, reserving `range` (device offsets) for configuration
    pub fn new(flash: F, range: Range<u32>) -> Self {
        Self {
            flash,
            range,
            locked: true,
        }
    }

    /// Get the underlying device for low-level access
    pub fn flash(&mut self) -> &mut F {
        &mut self.flash
    }

    /// Release the underlying device
    pub fn into_inner(self) -> F {
        self.flash
    }

    fn check(&self, address: u32, len: usize) -> Result<(), FlashError> {
        if self.region().contains(address, len) {
            Ok(())
        } else {
            Err(FlashError::OutOfBounds)
        }
    }
}

impl<F: NorFlash> ConfigFlash for NorFlashRegion<F> {
    fn region(&self) -> FlashRegion {
        FlashRegion::new(self.range.start, self.range.end)
    }

    async fn unlock(&mut self) -> Result<(), FlashError> {
        self.locked = false;
        Ok(())
    }

    async fn lock(&mut self) -> Result<(), FlashError> {
        self.locked = true;
        Ok(())
    }

    async fn erase(&mut self) -> Result<(), FlashError> {
        if self.locked {
            return Err(FlashError::Locked);
        }
        self.flash
            .erase(self.range.start, self.range.end)
            .await
            .map_err(|_| FlashError::Erase)
    }

    async fn program(&mut self, address: u32, data: &[u8]) -> Result<(), FlashError> {
        if self.locked {
            return Err(FlashError::Locked);
        }
        self.check(address, data.len())?;
        self.flash
            .write(address, data)
            .await
            .map_err(|_| FlashError::Program)
    }

    async fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        self.check(address, buf.len())?;
        self.flash
            .read(address, buf)
            .await
            .map_err(|_| FlashError::Read)
    }
}
