//! Byte sinks and integer encodings used by the flash image
//!
//! Varints are postcard's unsigned LEB128: seven bits per byte, least
//! significant group first, high bit set on every byte but the last.

use heapless::Vec;

use crate::error::StreamError;

/// Longest varint encoding of a `u32`
pub const MAX_VARUINT_LEN: usize = 5;

/// String lengths at or above this are never valid in an image
pub const MAX_STRING_SIZE: u32 = 1 << 24;

/// Dyn-compatible byte sink
pub trait WriteStream {
    /// Append `data` to the sink
    fn write(&mut self, data: &[u8]) -> Result<(), StreamError>;
}

impl<const N: usize> WriteStream for Vec<u8, N> {
    fn write(&mut self, data: &[u8]) -> Result<(), StreamError> {
        self.extend_from_slice(data)
            .map_err(|_| StreamError::Overflow)
    }
}

/// Write `value` as a varint
pub fn write_varuint(out: &mut dyn WriteStream, value: u32) -> Result<(), StreamError> {
    let mut buf = [0u8; MAX_VARUINT_LEN];
    let bytes = postcard::to_slice(&value, &mut buf).map_err(|_| StreamError::Encode)?;
    out.write(bytes)
}

/// Write a varint length followed by the string bytes
pub fn write_string(out: &mut dyn WriteStream, value: &str) -> Result<(), StreamError> {
    let len = u32::try_from(value.len()).map_err(|_| StreamError::Encode)?;
    write_varuint(out, len)?;
    out.write(value.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varuint_known_encodings() {
        let mut out: Vec<u8, 16> = Vec::new();
        write_varuint(&mut out, 0).unwrap();
        write_varuint(&mut out, 300).unwrap();
        write_varuint(&mut out, u32::MAX).unwrap();
        assert_eq!(&out[..], &[0x00, 0xac, 0x02, 0xff, 0xff, 0xff, 0xff, 0x0f]);
    }

    #[test]
    fn test_write_string_prefixes_length() {
        let mut out: Vec<u8, 16> = Vec::new();
        write_string(&mut out, "motor").unwrap();
        assert_eq!(&out[..], b"\x05motor");
    }

    #[test]
    fn test_vec_stream_overflow() {
        let mut out: Vec<u8, 4> = Vec::new();
        assert_eq!(out.write(b"abcde"), Err(StreamError::Overflow));
    }
}
