//! Flash region abstractions
//!
//! The configuration store owns one contiguous flash region. It erases the
//! whole region and reprograms it from the start on every save, so the
//! primitive set is deliberately small.

use core::future::Future;

/// Errors from flash primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// Program or erase attempted while the region is locked
    Locked,
    /// Access outside the configured region
    OutOfBounds,
    /// Erase operation failed
    Erase,
    /// Program operation failed
    Program,
    /// Read operation failed
    Read,
}

/// Bounds of the configuration region
///
/// Absolute flash addresses, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashRegion {
    pub start: u32,
    pub end: u32,
}

impl FlashRegion {
    /// Create a region from its bounds
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Region size in bytes
    pub const fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Whether the region holds no bytes at all
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check that `len` bytes starting at `address` fall inside the region
    pub fn contains(&self, address: u32, len: usize) -> bool {
        let Ok(len) = u32::try_from(len) else {
            return false;
        };
        match address.checked_add(len) {
            Some(end) => address >= self.start && end <= self.end,
            None => false,
        }
    }
}

/// Flash primitive used by the configuration store
///
/// Implementations must provide NOR semantics: `erase` sets every byte of
/// the region to `0xFF`, and `program` can only clear bits.
///
/// # Invariants
///
/// - Only one owner per instance; callers never issue overlapping
///   operations.
/// - `program` and `erase` fail with [`FlashError::Locked`] unless the
///   region was unlocked first.
pub trait ConfigFlash {
    /// The region reserved for configuration data
    fn region(&self) -> FlashRegion;

    /// Allow erase/program operations
    fn unlock(&mut self) -> impl Future<Output = Result<(), FlashError>>;

    /// Forbid erase/program operations again
    fn lock(&mut self) -> impl Future<Output = Result<(), FlashError>>;

    /// Erase the whole region
    fn erase(&mut self) -> impl Future<Output = Result<(), FlashError>>;

    /// Program `data` at the absolute address `address`
    fn program(
        &mut self,
        address: u32,
        data: &[u8],
    ) -> impl Future<Output = Result<(), FlashError>>;

    /// Read `buf.len()` bytes starting at the absolute address `address`
    fn read(
        &mut self,
        address: u32,
        buf: &mut [u8],
    ) -> impl Future<Output = Result<(), FlashError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_contains() {
        let region = FlashRegion::new(0x1000, 0x2000);
        assert_eq!(region.len(), 0x1000);
        assert!(region.contains(0x1000, 0x1000));
        assert!(region.contains(0x1ff0, 16));
        assert!(!region.contains(0x1ff0, 17));
        assert!(!region.contains(0x0fff, 1));
        assert!(!region.contains(u32::MAX, 2));
    }

    #[test]
    fn test_empty_region() {
        let region = FlashRegion::new(0x2000, 0x1000);
        assert!(region.is_empty());
        assert!(!region.contains(0x2000, 1));
    }
}
