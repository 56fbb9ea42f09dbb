//! Configuration handler capability
//!
//! A handler owns one configuration group's value and knows how to render,
//! parse, serialize and describe it. The registry only borrows handlers, so
//! every operation takes `&self` and implementations use interior
//! mutability (see [`ConfigGroup`](crate::group::ConfigGroup)).

use core::fmt;

use crate::error::{FieldError, StreamError};
use crate::stream::WriteStream;

/// Result of one enumeration step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Emit {
    /// A line was written; ask again with the next index
    Line,
    /// Nothing left to describe
    Done,
}

/// Operations the configuration store needs from each group
pub trait ConfigHandler {
    /// Render the current value of `field` as text
    fn read_field(&self, field: &str, out: &mut dyn fmt::Write) -> Result<(), FieldError>;

    /// Parse `value` and store it in `field`
    ///
    /// Either the whole assignment happens or none of it does.
    fn set_field(&self, field: &str, value: &str) -> Result<(), FieldError>;

    /// Restore every field to its compiled-in default
    fn set_default(&self);

    /// Serialize the current value
    fn write_binary(&self, out: &mut dyn WriteStream) -> Result<(), StreamError>;

    /// Replace the current value from a serialized form
    ///
    /// On failure the value may be left partially updated.
    fn read_binary(&self, data: &[u8]) -> Result<(), FieldError>;

    /// Describe the field layout
    ///
    /// Must depend only on the compiled layout, never on field values.
    fn write_schema(&self, out: &mut dyn WriteStream) -> Result<(), StreamError>;

    /// Write line `index` of this group's self-description, using `prefix`
    /// as the group name
    fn enumerate(
        &self,
        prefix: &str,
        index: usize,
        out: &mut dyn fmt::Write,
    ) -> Result<Emit, FieldError>;
}
