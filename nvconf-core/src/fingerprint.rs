//! Schema fingerprints
//!
//! A fingerprint is the CRC32 of the bytes a handler produces when asked
//! to describe its field layout. It is stored next to each record in the
//! flash image and recomputed from the live handler on load, so a firmware
//! build with a different layout refuses bytes written by an older one.

use crc::{Crc, Digest, CRC_32_ISO_HDLC};

use crate::error::StreamError;
use crate::handler::ConfigHandler;
use crate::stream::WriteStream;

/// CRC32 algorithm (ISO HDLC / Ethernet / ZIP)
static SCHEMA_CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Sink that feeds everything written into a running CRC
struct DigestStream {
    digest: Digest<'static, u32>,
}

impl WriteStream for DigestStream {
    fn write(&mut self, data: &[u8]) -> Result<(), StreamError> {
        self.digest.update(data);
        Ok(())
    }
}

/// Fingerprint of `handler`'s current schema
///
/// The description is streamed straight into the CRC, so schemas of any
/// size are covered in full.
pub fn schema_fingerprint(handler: &dyn ConfigHandler) -> u32 {
    let mut stream = DigestStream {
        digest: SCHEMA_CRC.digest(),
    };
    if let Err(e) = handler.write_schema(&mut stream) {
        warn!("schema description failed: {}", e);
    }
    stream.digest.finalize()
}
