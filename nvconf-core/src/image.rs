//! Flash image codec
//!
//! The configuration region holds a sequence of entries closed by an empty
//! name:
//!
//! ```text
//! Entry      := NameLen(varint) Name Fingerprint(u32 LE) DataSize(u32 LE) Data
//! Image      := Entry* Terminator
//! Terminator := NameLen(varint) == 0
//! ```
//!
//! Saving erases the region and rewrites every record; there is no
//! atomicity across power loss. Loading walks the entries and applies the
//! ones whose name and fingerprint match a registered record, skipping the
//! rest by their declared size.

use heapless::Vec;
use nvconf_hal::{ConfigFlash, FlashRegion};

use crate::error::{ConfigError, StreamError};
use crate::fingerprint::schema_fingerprint;
use crate::registry::{Registry, MAX_NAME_LEN};
use crate::stream::{write_string, write_varuint, MAX_STRING_SIZE, MAX_VARUINT_LEN};

/// Bytes programmed per flash write; the region length should be a
/// multiple of this
pub const PROGRAM_SIZE: usize = 256;

/// Largest binary form a single record may have
pub const MAX_ENTRY_SIZE: usize = 2048;

/// Name length, name, fingerprint and data size
const HEADER_CAPACITY: usize = MAX_VARUINT_LEN + MAX_NAME_LEN + 8;

/// What a load found in the image
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LoadSummary {
    /// Entries decoded into their record
    pub applied: u16,
    /// Entries with no registered record
    pub unknown: u16,
    /// Entries whose stored fingerprint differs from the live schema
    pub mismatched: u16,
    /// Entries larger than [`MAX_ENTRY_SIZE`]
    pub oversized: u16,
    /// Entries the record failed to decode (possibly partially applied)
    pub failed: u16,
}

/// Buffers the image into program-sized pages
struct FlashWriter<'f, F> {
    flash: &'f mut F,
    region: FlashRegion,
    page_addr: u32,
    page: [u8; PROGRAM_SIZE],
    len: usize,
}

impl<'f, F: ConfigFlash> FlashWriter<'f, F> {
    fn new(flash: &'f mut F) -> Self {
        let region = flash.region();
        Self {
            flash,
            region,
            page_addr: region.start,
            page: [0xFF; PROGRAM_SIZE],
            len: 0,
        }
    }

    async fn write(&mut self, mut data: &[u8]) -> Result<(), ConfigError> {
        while !data.is_empty() {
            let n = (PROGRAM_SIZE - self.len).min(data.len());
            self.page[self.len..self.len + n].copy_from_slice(&data[..n]);
            self.len += n;
            data = &data[n..];
            if self.len == PROGRAM_SIZE {
                self.flush().await?;
            }
        }
        Ok(())
    }

    /// Program the pending page, padded with erased bytes
    async fn flush(&mut self) -> Result<(), ConfigError> {
        if self.len == 0 {
            return Ok(());
        }
        if !self.region.contains(self.page_addr, PROGRAM_SIZE) {
            return Err(ConfigError::ImageFull);
        }
        self.page[self.len..].fill(0xFF);
        self.flash.program(self.page_addr, &self.page).await?;
        self.page_addr += PROGRAM_SIZE as u32;
        self.len = 0;
        Ok(())
    }
}

/// Sequential reader bounded by the region end
struct FlashReader<'f, F> {
    flash: &'f mut F,
    pos: u32,
    end: u32,
}

impl<'f, F: ConfigFlash> FlashReader<'f, F> {
    fn new(flash: &'f mut F) -> Self {
        let region = flash.region();
        Self {
            flash,
            pos: region.start,
            end: region.end,
        }
    }

    fn remaining(&self) -> u32 {
        self.end.saturating_sub(self.pos)
    }

    async fn read_exact(&mut self, buf: &mut [u8]) -> Option<()> {
        if (self.remaining() as usize) < buf.len() {
            return None;
        }
        self.flash.read(self.pos, buf).await.ok()?;
        self.pos += buf.len() as u32;
        Some(())
    }

    /// Decode a varint from a peek at the next bytes, consuming only its
    /// own length
    async fn read_varuint(&mut self) -> Option<u32> {
        let mut peek = [0u8; MAX_VARUINT_LEN];
        let len = (self.remaining() as usize).min(MAX_VARUINT_LEN);
        let peek = &mut peek[..len];
        self.flash.read(self.pos, peek).await.ok()?;
        let (value, rest) = postcard::take_from_bytes::<u32>(peek).ok()?;
        self.pos += (len - rest.len()) as u32;
        Some(value)
    }

    async fn read_u32(&mut self) -> Option<u32> {
        let mut bytes = [0u8; 4];
        self.read_exact(&mut bytes).await?;
        Some(u32::from_le_bytes(bytes))
    }

    fn skip(&mut self, len: u32) -> bool {
        if self.remaining() < len {
            return false;
        }
        self.pos += len;
        true
    }
}

/// Erase the region and write every record in registry order
///
/// The region is unlocked for the duration and relocked afterwards even if
/// a step failed; the first error is returned.
pub async fn write_image<F: ConfigFlash, const N: usize>(
    flash: &mut F,
    registry: &Registry<'_, N>,
) -> Result<(), ConfigError> {
    flash.unlock().await?;
    let written = write_entries(flash, registry).await;
    let locked = flash.lock().await;

    let count = written.inspect_err(|e| error!("config write failed: {}", e))?;
    locked?;
    info!("wrote {} config records", count);
    Ok(())
}

async fn write_entries<F: ConfigFlash, const N: usize>(
    flash: &mut F,
    registry: &Registry<'_, N>,
) -> Result<usize, ConfigError> {
    flash.erase().await?;

    let mut writer = FlashWriter::new(flash);
    let mut header: Vec<u8, HEADER_CAPACITY> = Vec::new();
    let mut data: Vec<u8, MAX_ENTRY_SIZE> = Vec::new();

    for record in registry.iter() {
        data.clear();
        record.handler().write_binary(&mut data).map_err(|e| {
            warn!("cannot serialize config group {}: {}", record.name(), e);
            match e {
                StreamError::Overflow => ConfigError::EntryTooLarge,
                StreamError::Encode => ConfigError::Encode,
            }
        })?;

        header.clear();
        write_string(&mut header, record.name()).map_err(|_| ConfigError::Encode)?;
        header
            .extend_from_slice(&schema_fingerprint(record.handler()).to_le_bytes())
            .map_err(|_| ConfigError::Encode)?;
        header
            .extend_from_slice(&(data.len() as u32).to_le_bytes())
            .map_err(|_| ConfigError::Encode)?;

        writer.write(&header).await?;
        writer.write(&data).await?;
        trace!("config group {}: {} bytes", record.name(), data.len());
    }

    header.clear();
    write_varuint(&mut header, 0).map_err(|_| ConfigError::Encode)?;
    writer.write(&header).await?;
    writer.flush().await?;

    Ok(registry.len())
}

/// Apply the stored image to the registered records
///
/// Never fails: a malformed header ends the scan as if the image ended
/// there. Afterwards every record's update notification fires exactly
/// once, whether or not the image touched it.
pub async fn load_image<F: ConfigFlash, const N: usize>(
    flash: &mut F,
    registry: &Registry<'_, N>,
) -> LoadSummary {
    let mut summary = LoadSummary::default();
    let mut reader = FlashReader::new(flash);
    let mut name_buf = [0u8; MAX_NAME_LEN];
    let mut data = [0u8; MAX_ENTRY_SIZE];

    loop {
        let Some(name_len) = reader.read_varuint().await else {
            debug!("config image: unreadable name length, stopping");
            break;
        };
        if name_len == 0 {
            break;
        }
        if name_len >= MAX_STRING_SIZE {
            debug!("config image: name length {} out of range, stopping", name_len);
            break;
        }

        // Names too long to be registered can only be skipped
        let name = if name_len as usize <= MAX_NAME_LEN {
            let buf = &mut name_buf[..name_len as usize];
            if reader.read_exact(buf).await.is_none() {
                break;
            }
            core::str::from_utf8(buf).ok()
        } else {
            if !reader.skip(name_len) {
                break;
            }
            None
        };

        if reader.remaining() < 8 {
            break;
        }
        let (Some(stored_fingerprint), Some(data_size)) =
            (reader.read_u32().await, reader.read_u32().await)
        else {
            break;
        };

        // From here the entry's data is consumed one way or another
        let Some(record) = name.and_then(|n| registry.find(n)) else {
            warn!("config image: skipping unknown group {}", name.unwrap_or("?"));
            summary.unknown += 1;
            if !reader.skip(data_size) {
                break;
            }
            continue;
        };

        if schema_fingerprint(record.handler()) != stored_fingerprint {
            warn!("config image: schema changed for {}, keeping current value", record.name());
            summary.mismatched += 1;
            if !reader.skip(data_size) {
                break;
            }
            continue;
        }

        if data_size as usize > MAX_ENTRY_SIZE {
            warn!("config image: {} entry too large ({} bytes)", record.name(), data_size);
            summary.oversized += 1;
            if !reader.skip(data_size) {
                break;
            }
            continue;
        }

        let buf = &mut data[..data_size as usize];
        if reader.read_exact(buf).await.is_none() {
            break;
        }
        match record.handler().read_binary(buf) {
            Ok(()) => summary.applied += 1,
            Err(e) => {
                warn!("config image: failed to decode {}: {}", record.name(), e);
                summary.failed += 1;
            }
        }
    }

    registry.notify_all();
    debug!("config load: {}", summary);
    summary
}
