//! Shared fixtures for unit tests

use core::cell::Cell;

use embedded_io_async::{ErrorKind, ErrorType, Write};
use heapless::Vec;

#[derive(Default, Clone, Debug, PartialEq)]
pub struct Motor {
    pub kp: f32,
    pub ki: f32,
}

crate::config_fields!(Motor { kp: F32, ki: F32 });

#[derive(Clone, Debug, PartialEq)]
pub struct Limit {
    pub max: u32,
}

impl Default for Limit {
    fn default() -> Self {
        Self { max: 100 }
    }
}

crate::config_fields!(Limit { max: U32 });

/// Same field name as [`Motor`] but a different type
#[derive(Default, Clone, Debug, PartialEq)]
pub struct MotorV2 {
    pub kp: u32,
    pub ki: f32,
}

crate::config_fields!(MotorV2 { kp: U32, ki: F32 });

/// Response sink recording everything written to it
///
/// Accepts at most `chunk` bytes per write to mimic a transport that
/// cannot take a whole reply at once.
pub struct Transcript {
    bytes: Vec<u8, 2048>,
    chunk: usize,
    fail_after: Option<usize>,
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            chunk: 7,
            fail_after: None,
        }
    }

    /// Fail every write once `limit` bytes have been accepted
    pub fn failing_after(limit: usize) -> Self {
        Self {
            fail_after: Some(limit),
            ..Self::new()
        }
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.bytes).unwrap()
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Return the transcript so far and start a fresh one
    pub fn take(&mut self) -> heapless::String<2048> {
        let mut out = heapless::String::new();
        out.push_str(self.as_str()).unwrap();
        self.clear();
        out
    }
}

impl ErrorType for Transcript {
    type Error = ErrorKind;
}

impl Write for Transcript {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut len = buf.len().min(self.chunk);
        if let Some(limit) = self.fail_after {
            let room = limit.saturating_sub(self.bytes.len());
            if room == 0 {
                return Err(ErrorKind::BrokenPipe);
            }
            len = len.min(room);
        }
        self.bytes
            .extend_from_slice(&buf[..len])
            .map_err(|_| ErrorKind::OutOfMemory)?;
        Ok(len)
    }
}

/// Counts update notifications
#[derive(Default)]
pub struct Counter(Cell<u32>);

impl Counter {
    pub fn bump(&self) {
        self.0.set(self.0.get() + 1);
    }

    pub fn get(&self) -> u32 {
        self.0.get()
    }
}
