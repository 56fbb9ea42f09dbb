//! Flash-persisted configuration for embedded firmware
//!
//! This crate stores a set of named configuration groups in one flash
//! region and exposes them over a line-oriented text protocol:
//!
//! - Record registry (bounded, insertion ordered)
//! - Schema fingerprints that detect layout drift between firmware builds
//! - Flash image codec with skip-on-mismatch recovery
//! - Non-blocking enumeration of every group's fields
//! - Command dispatcher (`enumerate`, `get`, `set`, `load`, `write`, `default`)
//! - A generic handler for groups made of scalar fields

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// Must come first so the logging macros are visible to the other modules
#[macro_use]
mod fmt;

pub mod command;
pub mod enumerate;
pub mod error;
pub mod fingerprint;
pub mod group;
pub mod handler;
pub mod image;
pub mod registry;
pub mod stream;

#[cfg(test)]
mod testing;

pub use command::{PersistentConfig, COMMAND_NAME, SEND_BUFFER_SIZE};
pub use enumerate::{EnumerateState, Enumerator};
pub use error::{CommandError, ConfigError, FieldError, StreamError};
pub use group::{ConfigGroup, FieldDesc, FieldKind, Fields, Value};
pub use handler::{ConfigHandler, Emit};
pub use image::{load_image, write_image, LoadSummary, MAX_ENTRY_SIZE, PROGRAM_SIZE};
pub use registry::{Record, Registry, MAX_NAME_LEN, MAX_RECORDS};
