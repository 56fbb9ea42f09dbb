//! Error types
//!
//! Duplicate or malformed registrations are programmer errors and panic at
//! registration time; everything here is a runtime condition.

use nvconf_hal::FlashError;

/// Failures writing to a [`WriteStream`](crate::stream::WriteStream)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamError {
    /// Sink has no room for the data
    Overflow,
    /// A value could not be encoded
    Encode,
}

/// Failures reported by a handler for a single field operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FieldError {
    /// No field with that name in the group
    UnknownField,
    /// Text value could not be parsed for the field's type
    InvalidValue,
    /// Stored binary data could not be decoded
    Decode,
    /// Output buffer too small for the rendered text
    Overflow,
}

impl From<core::fmt::Error> for FieldError {
    fn from(_: core::fmt::Error) -> Self {
        FieldError::Overflow
    }
}

/// Failures saving the configuration image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Flash primitive failed
    Flash(FlashError),
    /// A record's binary form exceeds the staging buffer
    EntryTooLarge,
    /// A record could not be serialized
    Encode,
    /// The image does not fit in the flash region
    ImageFull,
}

impl From<FlashError> for ConfigError {
    fn from(e: FlashError) -> Self {
        ConfigError::Flash(e)
    }
}

/// Failures that end an in-flight command
///
/// Protocol-level problems (unknown verb, unknown group, rejected value)
/// are answered with an `ERR` line instead and never show up here. The
/// exception is an enumeration cut short by a handler: part of the listing
/// has already been sent, so it ends with [`CommandError::Field`] and no
/// `OK`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError<E> {
    /// The response sink failed
    Transport(E),
    /// Saving to flash failed
    Config(ConfigError),
    /// A handler failed while listing its fields
    Field(FieldError),
}

impl<E> From<ConfigError> for CommandError<E> {
    fn from(e: ConfigError) -> Self {
        CommandError::Config(e)
    }
}

impl<E> From<FieldError> for CommandError<E> {
    fn from(e: FieldError) -> Self {
        CommandError::Field(e)
    }
}
