//! nvconf Hardware Abstraction Layer
//!
//! This crate defines the flash primitive the configuration store is
//! written against. Chip-specific crates implement it (directly, or by
//! wrapping an `embedded-storage-async` driver in [`NorFlashRegion`]).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  nvconf-core (registry, image, command) │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  nvconf-hal (this crate - ConfigFlash)  │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ nvconf-hal-   │       │   RamFlash    │
//! │    rp2040     │       │  (host/sim)   │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`flash::ConfigFlash`] - Erase/program/lock access to the config region

#![no_std]
#![deny(unsafe_code)]

pub mod flash;
pub mod nor;
pub mod ram;

// Re-export key types at crate root for convenience
pub use flash::{ConfigFlash, FlashError, FlashRegion};
pub use nor::NorFlashRegion;
pub use ram::RamFlash;
