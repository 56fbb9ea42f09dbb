//! RAM-backed flash region
//!
//! Simulates a NOR flash region in memory for host tests and simulators:
//! programming only clears bits, erase restores `0xFF`, and program/erase
//! are refused while locked. Failures can be injected to exercise error
//! paths.

use crate::flash::{ConfigFlash, FlashError, FlashRegion};

/// In-memory flash region of `N` bytes
#[derive(Debug, Clone)]
pub struct RamFlash<const N: usize> {
    base: u32,
    data: [u8; N],
    locked: bool,
    erase_count: u32,
    fail_erase: bool,
    fail_program: bool,
}

impl<const N: usize> RamFlash<N> {
    /// Create an erased, locked region starting at `base`
    pub const fn new(base: u32) -> Self {
        Self {
            base,
            data: [0xFF; N],
            locked: true,
            erase_count: 0,
            fail_erase: false,
            fail_program: false,
        }
    }

    /// Raw region contents
    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    /// Overwrite bytes at `offset` (relative to the region start), ignoring
    /// NOR semantics and the lock
    ///
    /// Used to lay down hand-built images or inject corruption.
    pub fn corrupt(&mut self, offset: usize, bytes: &[u8]) {
        let end = (offset + bytes.len()).min(N);
        if offset < end {
            self.data[offset..end].copy_from_slice(&bytes[..end - offset]);
        }
    }

    /// Whether the region is currently locked
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Number of completed erase operations
    pub fn erase_count(&self) -> u32 {
        self.erase_count
    }

    /// Make subsequent erase operations fail
    pub fn set_fail_erase(&mut self, fail: bool) {
        self.fail_erase = fail;
    }

    /// Make subsequent program operations fail
    pub fn set_fail_program(&mut self, fail: bool) {
        self.fail_program = fail;
    }

    fn offset_of(&self, address: u32, len: usize) -> Result<usize, FlashError> {
        if !self.region().contains(address, len) {
            return Err(FlashError::OutOfBounds);
        }
        Ok((address - self.base) as usize)
    }
}

impl<const N: usize> Default for RamFlash<N> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<const N: usize> ConfigFlash for RamFlash<N> {
    fn region(&self) -> FlashRegion {
        FlashRegion::new(self.base, self.base + N as u32)
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
        if self.fail_erase {
            return Err(FlashError::Erase);
        }
        self.data.fill(0xFF);
        self.erase_count += 1;
        Ok(())
    }

    async fn program(&mut self, address: u32, data: &[u8]) -> Result<(), FlashError> {
        if self.locked {
            return Err(FlashError::Locked);
        }
        if self.fail_program {
            return Err(FlashError::Program);
        }
        let offset = self.offset_of(address, data.len())?;
        for (dst, src) in self.data[offset..offset + data.len()].iter_mut().zip(data) {
            *dst &= *src;
        }
        Ok(())
    }

    async fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        let offset = self.offset_of(address, buf.len())?;
        buf.copy_from_slice(&self.data[offset..offset + buf.len()]);
        Ok(())
    }
}
