//! Text command dispatcher
//!
//! One line in, one reply out. Lines look like `<verb> [args]`:
//!
//! | Line | Reply |
//! |---|---|
//! | `enumerate` | `group.field value` per field, then `OK` |
//! | `get G.F` | the value |
//! | `set G.F V` | `OK` |
//! | `load` | `OK` |
//! | `write` | `OK` |
//! | `default` | `OK` |
//!
//! Every reply line ends in `\r\n`. Protocol problems are answered with an
//! `ERR ...` line; only transport and flash failures, and handlers failing
//! mid-listing, are returned as errors.

use embedded_io_async::Write;
use heapless::String;
use nvconf_hal::ConfigFlash;

use crate::enumerate::Enumerator;
use crate::error::{CommandError, ConfigError};
use crate::handler::ConfigHandler;
use crate::image::{load_image, write_image, LoadSummary};
use crate::registry::{Registry, MAX_RECORDS};

/// Word a line front end routes to [`PersistentConfig::command`]
pub const COMMAND_NAME: &str = "conf";

/// Capacity for one rendered field value or enumeration line
pub const SEND_BUFFER_SIZE: usize = 256;

const OK: &str = "OK\r\n";
const ERR_UNKNOWN_GROUP: &str = "ERR unknown group\r\n";
const ERR_READING: &str = "ERR error reading\r\n";
const ERR_SETTING: &str = "ERR error setting\r\n";
const ERR_UNKNOWN_SUBCOMMAND: &str = "ERR unknown subcommand\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Subcommand<'l> {
    Enumerate,
    Get { target: &'l str },
    Set { target: &'l str, value: &'l str },
    Load,
    Write,
    Default,
    Unknown,
}

impl<'l> Subcommand<'l> {
    fn parse(line: &'l str) -> Self {
        let line = line.trim_end_matches(|c: char| c == '\r' || c == '\n');
        let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
        match verb {
            "enumerate" => Subcommand::Enumerate,
            "get" => Subcommand::Get { target: rest },
            "set" => {
                let (target, value) = rest.split_once(' ').unwrap_or((rest, ""));
                Subcommand::Set { target, value }
            }
            "load" => Subcommand::Load,
            "write" => Subcommand::Write,
            "default" => Subcommand::Default,
            _ => Subcommand::Unknown,
        }
    }
}

/// `group.field` -> (`group`, `field`)
fn split_target(target: &str) -> (&str, &str) {
    target.split_once('.').unwrap_or((target, ""))
}

async fn reply<W: Write>(out: &mut W, text: &str) -> Result<(), CommandError<W::Error>> {
    out.write_all(text.as_bytes())
        .await
        .map_err(CommandError::Transport)
}

/// Registered configuration groups bound to their flash region
///
/// Owns the registry, the flash, and the buffers the text protocol needs.
/// `&mut self` on every command keeps commands strictly sequential.
pub struct PersistentConfig<'a, F, const N: usize = MAX_RECORDS> {
    registry: Registry<'a, N>,
    flash: F,
    enumerator: Enumerator,
    send_buffer: String<SEND_BUFFER_SIZE>,
}

impl<'a, F: ConfigFlash, const N: usize> PersistentConfig<'a, F, N> {
    pub fn new(flash: F) -> Self {
        Self {
            registry: Registry::new(),
            flash,
            enumerator: Enumerator::new(),
            send_buffer: String::new(),
        }
    }

    /// See [`Registry::register`]
    pub fn register(&mut self, name: &'a str, handler: &'a dyn ConfigHandler) {
        self.registry.register(name, handler);
    }

    /// See [`Registry::register_with_update`]
    pub fn register_with_update(
        &mut self,
        name: &'a str,
        handler: &'a dyn ConfigHandler,
        on_update: &'a dyn Fn(),
    ) {
        self.registry.register_with_update(name, handler, on_update);
    }

    pub fn registry(&self) -> &Registry<'a, N> {
        &self.registry
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    /// Restore every group from flash, then notify all of them
    ///
    /// Usually called once at boot, after registration.
    pub async fn load(&mut self) -> LoadSummary {
        load_image(&mut self.flash, &self.registry).await
    }

    /// Persist every group, replacing the stored image
    pub async fn write(&mut self) -> Result<(), ConfigError> {
        write_image(&mut self.flash, &self.registry).await
    }

    /// Reset every group to its defaults without notifying
    pub fn set_default(&self) {
        self.registry.set_default_all();
    }

    /// Execute one command line and write the reply to `out`
    pub async fn command<W: Write>(
        &mut self,
        line: &str,
        out: &mut W,
    ) -> Result<(), CommandError<W::Error>> {
        match Subcommand::parse(line) {
            Subcommand::Enumerate => {
                self.enumerator
                    .run(&self.registry, &mut self.send_buffer, out)
                    .await
            }
            Subcommand::Get { target } => self.get(target, out).await,
            Subcommand::Set { target, value } => self.set(target, value, out).await,
            Subcommand::Load => {
                self.load().await;
                reply(out, OK).await
            }
            Subcommand::Write => {
                self.write().await?;
                reply(out, OK).await
            }
            Subcommand::Default => {
                self.set_default();
                reply(out, OK).await
            }
            Subcommand::Unknown => {
                debug!("unknown config subcommand");
                reply(out, ERR_UNKNOWN_SUBCOMMAND).await
            }
        }
    }

    async fn get<W: Write>(
        &mut self,
        target: &str,
        out: &mut W,
    ) -> Result<(), CommandError<W::Error>> {
        let (group, field) = split_target(target);
        let Some(record) = self.registry.find(group) else {
            return reply(out, ERR_UNKNOWN_GROUP).await;
        };

        self.send_buffer.clear();
        if let Err(e) = record.handler().read_field(field, &mut self.send_buffer) {
            debug!("get {}: {}", target, e);
            return reply(out, ERR_READING).await;
        }
        out.write_all(self.send_buffer.as_bytes())
            .await
            .map_err(CommandError::Transport)?;
        reply(out, "\r\n").await
    }

    async fn set<W: Write>(
        &mut self,
        target: &str,
        value: &str,
        out: &mut W,
    ) -> Result<(), CommandError<W::Error>> {
        let (group, field) = split_target(target);
        let Some(record) = self.registry.find(group) else {
            return reply(out, ERR_UNKNOWN_GROUP).await;
        };

        match record.handler().set_field(field, value) {
            Ok(()) => {
                record.notify();
                reply(out, OK).await
            }
            Err(e) => {
                debug!("set {}: {}", target, e);
                reply(out, ERR_SETTING).await
            }
        }
    }
}
