//! Field enumeration
//!
//! Lists every field of every registered group as `group.field value`
//! lines, one line at a time through a fixed send buffer. The position is
//! an explicit state so a slow transport only ever holds one rendered line.

use embedded_io_async::Write;
use heapless::String;

use crate::error::{CommandError, FieldError};
use crate::handler::Emit;
use crate::registry::Registry;

/// Where an enumeration stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EnumerateState {
    /// Never started
    Idle,
    /// Next line comes from `field` of the record at `record`
    Streaming { record: usize, field: usize },
    /// Every record was listed
    Done,
    /// The handler or the transport failed while listing `record`
    Aborted { record: usize },
}

/// Cursor over all fields of a registry
#[derive(Debug)]
pub struct Enumerator {
    state: EnumerateState,
}

impl Default for Enumerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Enumerator {
    pub const fn new() -> Self {
        Self {
            state: EnumerateState::Idle,
        }
    }

    pub fn state(&self) -> EnumerateState {
        self.state
    }

    /// Rewind to the first field of the first record
    ///
    /// Starting while still [`Streaming`](EnumerateState::Streaming) does not
    /// panic. Listings run under `&mut self`, so two can never overlap; a
    /// listing left streaming means its future was dropped mid-way, and it
    /// is abandoned in favour of the new one.
    pub fn start(&mut self) {
        if let EnumerateState::Streaming { record, .. } = self.state {
            debug!("restarting enumeration interrupted at record {}", record);
        }
        self.state = EnumerateState::Streaming {
            record: 0,
            field: 0,
        };
    }

    /// Render the next line into `line`
    ///
    /// Returns `Ok(false)` once every record has been listed. A handler
    /// failure (for example a line that does not fit in `line`) stops the
    /// listing there and leaves the enumerator
    /// [`Aborted`](EnumerateState::Aborted).
    pub fn next_line<const N: usize, const B: usize>(
        &mut self,
        registry: &Registry<'_, N>,
        line: &mut String<B>,
    ) -> Result<bool, FieldError> {
        loop {
            let EnumerateState::Streaming { record, field } = self.state else {
                return Ok(false);
            };
            let Some(entry) = registry.get(record) else {
                self.state = EnumerateState::Done;
                return Ok(false);
            };

            line.clear();
            match entry.handler().enumerate(entry.name(), field, line) {
                Ok(Emit::Line) => {
                    self.state = EnumerateState::Streaming {
                        record,
                        field: field + 1,
                    };
                    return Ok(true);
                }
                Ok(Emit::Done) => {
                    self.state = EnumerateState::Streaming {
                        record: record + 1,
                        field: 0,
                    };
                }
                Err(e) => {
                    warn!("enumerate {}: field {} failed: {}", entry.name(), field, e);
                    self.state = EnumerateState::Aborted { record };
                    return Err(e);
                }
            }
        }
    }

    /// List everything to `out`, followed by `OK`
    ///
    /// Each line is fully written before the next is rendered. A handler or
    /// transport error ends the listing without `OK` and leaves the
    /// enumerator [`Aborted`](EnumerateState::Aborted).
    pub async fn run<W: Write, const N: usize, const B: usize>(
        &mut self,
        registry: &Registry<'_, N>,
        line: &mut String<B>,
        out: &mut W,
    ) -> Result<(), CommandError<W::Error>> {
        self.start();
        while self.next_line(registry, line)? {
            if let Err(e) = out.write_all(line.as_bytes()).await {
                if let EnumerateState::Streaming { record, .. } = self.state {
                    self.state = EnumerateState::Aborted { record };
                }
                return Err(CommandError::Transport(e));
            }
        }
        out.write_all(b"OK\r\n")
            .await
            .map_err(CommandError::Transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt;

    use embassy_futures::block_on;
    use embedded_io_async::ErrorKind;

    use crate::error::StreamError;
    use crate::group::ConfigGroup;
    use crate::handler::ConfigHandler;
    use crate::stream::WriteStream;
    use crate::testing::{Limit, Motor, Transcript};

    #[test]
    fn test_lists_records_in_registration_order() {
        let motor: ConfigGroup<Motor> = ConfigGroup::new(Motor { kp: 12.0, ki: 0.5 });
        let limit: ConfigGroup<Limit> = ConfigGroup::default();
        let mut registry: Registry<'_> = Registry::new();
        registry.register("motor", &motor);
        registry.register("limit", &limit);

        let mut enumerator = Enumerator::new();
        let mut line: String<64> = String::new();
        let mut out = Transcript::new();
        block_on(enumerator.run(&registry, &mut line, &mut out)).unwrap();

        assert_eq!(
            out.as_str(),
            "motor.kp 12\r\nmotor.ki 0.5\r\nlimit.max 100\r\nOK\r\n"
        );
        assert_eq!(enumerator.state(), EnumerateState::Done);
    }

    #[test]
    fn test_empty_registry_only_acknowledges() {
        let registry: Registry<'_> = Registry::new();
        let mut enumerator = Enumerator::new();
        let mut line: String<64> = String::new();
        let mut out = Transcript::new();
        block_on(enumerator.run(&registry, &mut line, &mut out)).unwrap();
        assert_eq!(out.as_str(), "OK\r\n");
    }

    #[test]
    fn test_next_line_steps_one_field_at_a_time() {
        let limit: ConfigGroup<Limit> = ConfigGroup::default();
        let mut registry: Registry<'_> = Registry::new();
        registry.register("limit", &limit);

        let mut enumerator = Enumerator::new();
        let mut line: String<64> = String::new();
        assert_eq!(enumerator.next_line(&registry, &mut line), Ok(false));

        enumerator.start();
        assert_eq!(enumerator.next_line(&registry, &mut line), Ok(true));
        assert_eq!(line.as_str(), "limit.max 100\r\n");
        assert_eq!(
            enumerator.state(),
            EnumerateState::Streaming {
                record: 0,
                field: 1
            }
        );
        assert_eq!(enumerator.next_line(&registry, &mut line), Ok(false));
        assert_eq!(enumerator.state(), EnumerateState::Done);
    }

    #[test]
    fn test_start_rewinds_interrupted_listing() {
        let limit: ConfigGroup<Limit> = ConfigGroup::default();
        let mut registry: Registry<'_> = Registry::new();
        registry.register("limit", &limit);

        let mut enumerator = Enumerator::new();
        let mut line: String<64> = String::new();
        enumerator.start();
        assert_eq!(enumerator.next_line(&registry, &mut line), Ok(true));

        enumerator.start();
        assert_eq!(
            enumerator.state(),
            EnumerateState::Streaming {
                record: 0,
                field: 0
            }
        );
        assert_eq!(enumerator.next_line(&registry, &mut line), Ok(true));
        assert_eq!(line.as_str(), "limit.max 100\r\n");
    }

    #[test]
    fn test_line_too_long_stops_listing() {
        let motor: ConfigGroup<Motor> = ConfigGroup::new(Motor { kp: 12.0, ki: 0.5 });
        let limit: ConfigGroup<Limit> = ConfigGroup::default();
        let mut registry: Registry<'_> = Registry::new();
        registry.register("motor", &motor);
        registry.register("limit", &limit);

        // "limit.max 100\r\n" is one byte too long
        let mut enumerator = Enumerator::new();
        let mut line: String<14> = String::new();
        let mut out = Transcript::new();
        assert_eq!(
            block_on(enumerator.run(&registry, &mut line, &mut out)),
            Err(CommandError::Field(FieldError::Overflow))
        );
        assert_eq!(out.as_str(), "motor.kp 12\r\nmotor.ki 0.5\r\n");
        assert_eq!(enumerator.state(), EnumerateState::Aborted { record: 1 });
    }

    /// Handler whose listing always fails
    struct Broken;

    impl ConfigHandler for Broken {
        fn read_field(&self, _: &str, _: &mut dyn fmt::Write) -> Result<(), FieldError> {
            Err(FieldError::UnknownField)
        }
        fn set_field(&self, _: &str, _: &str) -> Result<(), FieldError> {
            Err(FieldError::UnknownField)
        }
        fn set_default(&self) {}
        fn write_binary(&self, _: &mut dyn WriteStream) -> Result<(), StreamError> {
            Ok(())
        }
        fn read_binary(&self, _: &[u8]) -> Result<(), FieldError> {
            Ok(())
        }
        fn write_schema(&self, _: &mut dyn WriteStream) -> Result<(), StreamError> {
            Ok(())
        }
        fn enumerate(&self, _: &str, _: usize, _: &mut dyn fmt::Write) -> Result<Emit, FieldError> {
            Err(FieldError::Overflow)
        }
    }

    #[test]
    fn test_handler_failure_is_not_acknowledged() {
        let broken = Broken;
        let limit: ConfigGroup<Limit> = ConfigGroup::default();
        let mut registry: Registry<'_> = Registry::new();
        registry.register("broken", &broken);
        registry.register("limit", &limit);

        let mut enumerator = Enumerator::new();
        let mut line: String<64> = String::new();
        let mut out = Transcript::new();
        assert_eq!(
            block_on(enumerator.run(&registry, &mut line, &mut out)),
            Err(CommandError::Field(FieldError::Overflow))
        );
        assert_eq!(out.as_str(), "");
        assert_eq!(enumerator.state(), EnumerateState::Aborted { record: 0 });
    }

    #[test]
    fn test_transport_failure_aborts() {
        let motor: ConfigGroup<Motor> = ConfigGroup::default();
        let limit: ConfigGroup<Limit> = ConfigGroup::default();
        let mut registry: Registry<'_> = Registry::new();
        registry.register("motor", &motor);
        registry.register("limit", &limit);

        let mut enumerator = Enumerator::new();
        let mut line: String<64> = String::new();
        let mut out = Transcript::failing_after(4);
        assert_eq!(
            block_on(enumerator.run(&registry, &mut line, &mut out)),
            Err(CommandError::Transport(ErrorKind::BrokenPipe))
        );
        assert_eq!(enumerator.state(), EnumerateState::Aborted { record: 0 });

        // A new listing starts from scratch
        let mut out = Transcript::new();
        block_on(enumerator.run(&registry, &mut line, &mut out)).unwrap();
        assert!(out.as_str().starts_with("motor.kp 0\r\n"));
        assert!(out.as_str().ends_with("limit.max 100\r\nOK\r\n"));
    }
}
