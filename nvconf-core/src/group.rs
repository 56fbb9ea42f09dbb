//! Generic handler for groups of scalar fields
//!
//! Firmware describes a plain struct with [`config_fields!`] and wraps it in
//! a [`ConfigGroup`] to get a complete [`ConfigHandler`]:
//!
//! ```
//! use nvconf_core::{config_fields, ConfigGroup};
//!
//! #[derive(Default)]
//! struct Motor {
//!     kp: f32,
//!     max_current_ma: u16,
//! }
//!
//! config_fields!(Motor { kp: F32, max_current_ma: U16 });
//!
//! let motor: ConfigGroup<Motor> = ConfigGroup::new(Motor::default());
//! assert_eq!(motor.with(|m| m.max_current_ma), 0);
//! ```
//!
//! Schema description: for every field, the varint name length, the name,
//! and the one-byte kind tag. Binary form: every field's value in
//! declaration order, postcard encoded.

use core::cell::RefCell;
use core::fmt;

use embassy_sync::blocking_mutex::raw::{NoopRawMutex, RawMutex};
use embassy_sync::blocking_mutex::Mutex;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{FieldError, StreamError};
use crate::handler::{ConfigHandler, Emit};
use crate::stream::{write_string, WriteStream};

/// Scalar field types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum FieldKind {
    Bool = 0,
    U8 = 1,
    U16 = 2,
    U32 = 3,
    I8 = 4,
    I16 = 5,
    I32 = 6,
    F32 = 7,
}

impl FieldKind {
    /// Tag written into schema descriptions
    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// A single field value
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    I8(i8),
    I16(i16),
    I32(i32),
    F32(f32),
}

impl Value {
    /// The kind of this value
    pub fn kind(&self) -> FieldKind {
        match self {
            Value::Bool(_) => FieldKind::Bool,
            Value::U8(_) => FieldKind::U8,
            Value::U16(_) => FieldKind::U16,
            Value::U32(_) => FieldKind::U32,
            Value::I8(_) => FieldKind::I8,
            Value::I16(_) => FieldKind::I16,
            Value::I32(_) => FieldKind::I32,
            Value::F32(_) => FieldKind::F32,
        }
    }

    /// Parse text as a value of `kind`
    ///
    /// Booleans accept `0`, `1`, `true` and `false`.
    pub fn parse(kind: FieldKind, text: &str) -> Option<Value> {
        let text = text.trim();
        let value = match kind {
            FieldKind::Bool => match text {
                "1" | "true" => Value::Bool(true),
                "0" | "false" => Value::Bool(false),
                _ => return None,
            },
            FieldKind::U8 => Value::U8(text.parse().ok()?),
            FieldKind::U16 => Value::U16(text.parse().ok()?),
            FieldKind::U32 => Value::U32(text.parse().ok()?),
            FieldKind::I8 => Value::I8(text.parse().ok()?),
            FieldKind::I16 => Value::I16(text.parse().ok()?),
            FieldKind::I32 => Value::I32(text.parse().ok()?),
            FieldKind::F32 => Value::F32(text.parse().ok()?),
        };
        Some(value)
    }

    fn encode<'b>(&self, buf: &'b mut [u8; 8]) -> Result<&'b mut [u8], postcard::Error> {
        match *self {
            Value::Bool(v) => postcard::to_slice(&v, buf),
            Value::U8(v) => postcard::to_slice(&v, buf),
            Value::U16(v) => postcard::to_slice(&v, buf),
            Value::U32(v) => postcard::to_slice(&v, buf),
            Value::I8(v) => postcard::to_slice(&v, buf),
            Value::I16(v) => postcard::to_slice(&v, buf),
            Value::I32(v) => postcard::to_slice(&v, buf),
            Value::F32(v) => postcard::to_slice(&v, buf),
        }
    }

    fn decode(kind: FieldKind, bytes: &[u8]) -> Result<(Value, &[u8]), postcard::Error> {
        Ok(match kind {
            FieldKind::Bool => {
                let (v, rest) = postcard::take_from_bytes(bytes)?;
                (Value::Bool(v), rest)
            }
            FieldKind::U8 => {
                let (v, rest) = postcard::take_from_bytes(bytes)?;
                (Value::U8(v), rest)
            }
            FieldKind::U16 => {
                let (v, rest) = postcard::take_from_bytes(bytes)?;
                (Value::U16(v), rest)
            }
            FieldKind::U32 => {
                let (v, rest) = postcard::take_from_bytes(bytes)?;
                (Value::U32(v), rest)
            }
            FieldKind::I8 => {
                let (v, rest) = postcard::take_from_bytes(bytes)?;
                (Value::I8(v), rest)
            }
            FieldKind::I16 => {
                let (v, rest) = postcard::take_from_bytes(bytes)?;
                (Value::I16(v), rest)
            }
            FieldKind::I32 => {
                let (v, rest) = postcard::take_from_bytes(bytes)?;
                (Value::I32(v), rest)
            }
            FieldKind::F32 => {
                let (v, rest) = postcard::take_from_bytes(bytes)?;
                (Value::F32(v), rest)
            }
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => f.write_str(if *v { "1" } else { "0" }),
            Value::U8(v) => write!(f, "{}", v),
            Value::U16(v) => write!(f, "{}", v),
            Value::U32(v) => write!(f, "{}", v),
            Value::I8(v) => write!(f, "{}", v),
            Value::I16(v) => write!(f, "{}", v),
            Value::I32(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", v),
        }
    }
}

/// Name and type of one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FieldDesc {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldDesc {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// A struct whose fields can be addressed by index
///
/// Usually implemented with [`config_fields!`]. `Default` supplies the
/// compiled-in defaults restored by the `default` command.
pub trait Fields: Default {
    /// Field layout in declaration order
    const FIELDS: &'static [FieldDesc];

    /// Current value of field `index`
    fn get(&self, index: usize) -> Option<Value>;

    /// Store `value` in field `index`
    ///
    /// Returns false if the index is out of range or the value has the
    /// wrong kind.
    fn set(&mut self, index: usize, value: Value) -> bool;

    /// Index of the field called `name`
    fn index_of(name: &str) -> Option<usize> {
        Self::FIELDS.iter().position(|f| f.name == name)
    }
}

/// Implement [`Fields`] for a struct of scalar fields
///
/// Each entry names a struct field and its [`FieldKind`] variant; the Rust
/// type of the field must match the kind (`F32` is `f32`, and so on).
#[macro_export]
macro_rules! config_fields {
    ($ty:ty { $($field:ident : $kind:ident),+ $(,)? }) => {
        impl $crate::group::Fields for $ty {
            const FIELDS: &'static [$crate::group::FieldDesc] = &[
                $($crate::group::FieldDesc::new(
                    stringify!($field),
                    $crate::group::FieldKind::$kind,
                ),)+
            ];

            fn get(&self, index: usize) -> Option<$crate::group::Value> {
                let name = <Self as $crate::group::Fields>::FIELDS.get(index)?.name;
                $(
                    if name == stringify!($field) {
                        return Some($crate::group::Value::$kind(self.$field));
                    }
                )+
                None
            }

            fn set(&mut self, index: usize, value: $crate::group::Value) -> bool {
                let Some(desc) = <Self as $crate::group::Fields>::FIELDS.get(index) else {
                    return false;
                };
                $(
                    if desc.name == stringify!($field) {
                        if let $crate::group::Value::$kind(v) = value {
                            self.$field = v;
                            return true;
                        }
                        return false;
                    }
                )+
                false
            }
        }
    };
}

/// [`ConfigHandler`] for a [`Fields`] struct
///
/// The value lives behind a blocking mutex so the registry and the owner
/// can share it; pick `CriticalSectionRawMutex` for groups placed in
/// statics that interrupts also read.
pub struct ConfigGroup<T, M: RawMutex = NoopRawMutex> {
    inner: Mutex<M, RefCell<T>>,
}

impl<T, M: RawMutex> ConfigGroup<T, M> {
    /// Wrap an initial value
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }

    /// Run `f` with shared access to the value
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.lock(|cell| f(&cell.borrow()))
    }

    /// Run `f` with exclusive access to the value
    ///
    /// No update notification is fired.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Replace the value, returning the old one
    pub fn replace(&self, value: T) -> T {
        self.inner.lock(|cell| cell.replace(value))
    }
}

impl<T: Clone, M: RawMutex> ConfigGroup<T, M> {
    /// Copy of the current value
    pub fn get(&self) -> T {
        self.with(T::clone)
    }
}

impl<T: Default, M: RawMutex> Default for ConfigGroup<T, M> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Fields, M: RawMutex> ConfigHandler for ConfigGroup<T, M> {
    fn read_field(&self, field: &str, out: &mut dyn fmt::Write) -> Result<(), FieldError> {
        let index = T::index_of(field).ok_or(FieldError::UnknownField)?;
        let value = self
            .with(|v| v.get(index))
            .ok_or(FieldError::UnknownField)?;
        write!(out, "{}", value)?;
        Ok(())
    }

    fn set_field(&self, field: &str, value: &str) -> Result<(), FieldError> {
        let index = T::index_of(field).ok_or(FieldError::UnknownField)?;
        let value = Value::parse(T::FIELDS[index].kind, value).ok_or(FieldError::InvalidValue)?;
        if self.update(|v| v.set(index, value)) {
            Ok(())
        } else {
            Err(FieldError::InvalidValue)
        }
    }

    fn set_default(&self) {
        self.replace(T::default());
    }

    fn write_binary(&self, out: &mut dyn WriteStream) -> Result<(), StreamError> {
        self.with(|v| -> Result<(), StreamError> {
            let mut buf = [0u8; 8];
            for index in 0..T::FIELDS.len() {
                let value = v.get(index).ok_or(StreamError::Encode)?;
                let bytes = value.encode(&mut buf).map_err(|_| StreamError::Encode)?;
                out.write(bytes)?;
            }
            Ok(())
        })
    }

    fn read_binary(&self, data: &[u8]) -> Result<(), FieldError> {
        self.update(|v| -> Result<(), FieldError> {
            let mut rest = data;
            for (index, desc) in T::FIELDS.iter().enumerate() {
                // Fields decoded before a failure stay applied
                let (value, tail) = Value::decode(desc.kind, rest).map_err(|_| FieldError::Decode)?;
                if !v.set(index, value) {
                    return Err(FieldError::Decode);
                }
                rest = tail;
            }
            Ok(())
        })
    }

    fn write_schema(&self, out: &mut dyn WriteStream) -> Result<(), StreamError> {
        for desc in T::FIELDS {
            write_string(out, desc.name)?;
            out.write(&[desc.kind.tag()])?;
        }
        Ok(())
    }

    fn enumerate(
        &self,
        prefix: &str,
        index: usize,
        out: &mut dyn fmt::Write,
    ) -> Result<Emit, FieldError> {
        let Some(desc) = T::FIELDS.get(index) else {
            return Ok(Emit::Done);
        };
        let value = self
            .with(|v| v.get(index))
            .ok_or(FieldError::UnknownField)?;
        write!(out, "{}.{} {}\r\n", prefix, desc.name, value)?;
        Ok(Emit::Line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::schema_fingerprint;
    use crate::testing::{Limit, Motor};
    use heapless::{String, Vec};

    #[derive(Default, Clone)]
    struct Mixed {
        enabled: bool,
        offset: i16,
        gain: f32,
    }

    config_fields!(Mixed {
        enabled: Bool,
        offset: I16,
        gain: F32,
    });

    fn read(group: &dyn ConfigHandler, field: &str) -> String<32> {
        let mut out = String::new();
        group.read_field(field, &mut out).unwrap();
        out
    }

    #[test]
    fn test_set_and_read_fields() {
        let group: ConfigGroup<Mixed> = ConfigGroup::default();
        group.set_field("enabled", "true").unwrap();
        group.set_field("offset", "-12").unwrap();
        group.set_field("gain", "1.5").unwrap();

        assert_eq!(read(&group, "enabled"), "1");
        assert_eq!(read(&group, "offset"), "-12");
        assert_eq!(read(&group, "gain"), "1.5");
        assert!(group.with(|m| m.enabled));
    }

    #[test]
    fn test_set_rejects_bad_input_without_change() {
        let group: ConfigGroup<Mixed> = ConfigGroup::default();
        group.set_field("offset", "7").unwrap();

        assert_eq!(group.set_field("offset", "40000"), Err(FieldError::InvalidValue));
        assert_eq!(group.set_field("offset", "abc"), Err(FieldError::InvalidValue));
        assert_eq!(group.set_field("missing", "1"), Err(FieldError::UnknownField));
        assert_eq!(group.set_field("enabled", "yes"), Err(FieldError::InvalidValue));
        assert_eq!(read(&group, "offset"), "7");
    }

    #[test]
    fn test_read_unknown_field() {
        let group: ConfigGroup<Mixed> = ConfigGroup::default();
        let mut out: String<8> = String::new();
        assert_eq!(group.read_field("nope", &mut out), Err(FieldError::UnknownField));
    }

    #[test]
    fn test_binary_roundtrip_between_groups() {
        let source: ConfigGroup<Mixed> = ConfigGroup::new(Mixed {
            enabled: true,
            offset: -300,
            gain: 0.25,
        });
        let mut bytes: Vec<u8, 32> = Vec::new();
        source.write_binary(&mut bytes).unwrap();

        let target: ConfigGroup<Mixed> = ConfigGroup::default();
        target.read_binary(&bytes).unwrap();
        let value = target.get();
        assert!(value.enabled);
        assert_eq!(value.offset, -300);
        assert_eq!(value.gain, 0.25);
    }

    #[test]
    fn test_truncated_binary_leaves_prefix_applied() {
        let source: ConfigGroup<Mixed> = ConfigGroup::new(Mixed {
            enabled: true,
            offset: 5,
            gain: 2.0,
        });
        let mut bytes: Vec<u8, 32> = Vec::new();
        source.write_binary(&mut bytes).unwrap();

        let target: ConfigGroup<Mixed> = ConfigGroup::default();
        // Drop the last byte of the f32
        let cut = bytes.len() - 1;
        assert_eq!(target.read_binary(&bytes[..cut]), Err(FieldError::Decode));
        let value = target.get();
        assert!(value.enabled);
        assert_eq!(value.offset, 5);
        assert_eq!(value.gain, 0.0);
    }

    #[test]
    fn test_set_default_restores_defaults() {
        let group: ConfigGroup<Limit> = ConfigGroup::default();
        group.set_field("max", "7").unwrap();
        group.set_default();
        assert_eq!(read(&group, "max"), "100");
    }

    #[test]
    fn test_schema_ignores_values() {
        let a: ConfigGroup<Mixed> = ConfigGroup::default();
        let b: ConfigGroup<Mixed> = ConfigGroup::new(Mixed {
            enabled: true,
            offset: 1,
            gain: 9.0,
        });
        assert_eq!(schema_fingerprint(&a), schema_fingerprint(&b));

        let motor: ConfigGroup<Motor> = ConfigGroup::default();
        assert_ne!(schema_fingerprint(&a), schema_fingerprint(&motor));
    }

    #[test]
    fn test_enumerate_lines() {
        let group: ConfigGroup<Mixed> = ConfigGroup::default();
        group.set_field("offset", "3").unwrap();

        let mut out: String<64> = String::new();
        assert_eq!(group.enumerate("mixed", 0, &mut out), Ok(Emit::Line));
        assert_eq!(group.enumerate("mixed", 1, &mut out), Ok(Emit::Line));
        assert_eq!(group.enumerate("mixed", 2, &mut out), Ok(Emit::Line));
        assert_eq!(group.enumerate("mixed", 3, &mut out), Ok(Emit::Done));
        assert_eq!(out, "mixed.enabled 0\r\nmixed.offset 3\r\nmixed.gain 0\r\n");
    }

    #[test]
    fn test_enumerate_overflow_is_reported() {
        let group: ConfigGroup<Mixed> = ConfigGroup::default();
        let mut out: String<4> = String::new();
        assert_eq!(group.enumerate("mixed", 0, &mut out), Err(FieldError::Overflow));
    }
}
