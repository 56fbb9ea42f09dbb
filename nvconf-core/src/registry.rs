//! Record registry
//!
//! Bounded, insertion-ordered map from group name to handler. Insertion
//! order is the canonical order for saving, defaulting, notifying and
//! enumerating.

use heapless::Vec;

use crate::handler::ConfigHandler;

/// Default registry capacity
pub const MAX_RECORDS: usize = 16;

/// Longest accepted group name
pub const MAX_NAME_LEN: usize = 32;

/// One registered configuration group
///
/// Both the handler and the update callback are borrowed for `'a`: records
/// of different closure types share one fixed-capacity table without an
/// allocator, so their owner keeps them alive at least as long as the
/// registry.
#[derive(Clone, Copy)]
pub struct Record<'a> {
    name: &'a str,
    handler: &'a dyn ConfigHandler,
    on_update: Option<&'a dyn Fn()>,
}

impl<'a> Record<'a> {
    /// Group name
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// The group's handler
    pub fn handler(&self) -> &'a dyn ConfigHandler {
        self.handler
    }

    /// Fire the update notification, if one was registered
    pub fn notify(&self) {
        if let Some(on_update) = self.on_update {
            on_update();
        }
    }
}

/// Fixed-capacity registry of configuration groups
pub struct Registry<'a, const N: usize = MAX_RECORDS> {
    records: Vec<Record<'a>, N>,
}

impl<'a, const N: usize> Default for Registry<'a, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, const N: usize> Registry<'a, N> {
    /// Create an empty registry
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Register a group without an update notification
    ///
    /// # Panics
    ///
    /// See [`register_with_update`](Self::register_with_update).
    pub fn register(&mut self, name: &'a str, handler: &'a dyn ConfigHandler) {
        self.insert(name, handler, None);
    }

    /// Register a group and the callback fired after its value changes
    ///
    /// # Panics
    ///
    /// Registration mistakes are programming errors: this panics if `name`
    /// is empty, longer than [`MAX_NAME_LEN`], contains `.` or a space,
    /// is already registered, or the registry is full.
    pub fn register_with_update(
        &mut self,
        name: &'a str,
        handler: &'a dyn ConfigHandler,
        on_update: &'a dyn Fn(),
    ) {
        self.insert(name, handler, Some(on_update));
    }

    fn insert(
        &mut self,
        name: &'a str,
        handler: &'a dyn ConfigHandler,
        on_update: Option<&'a dyn Fn()>,
    ) {
        assert!(!name.is_empty(), "config group name must not be empty");
        assert!(name.len() <= MAX_NAME_LEN, "config group name too long");
        assert!(
            !name.contains(|c: char| c == '.' || c == ' '),
            "config group name must not contain '.' or ' '"
        );
        assert!(self.find(name).is_none(), "duplicate config group name");

        let pushed = self.records.push(Record {
            name,
            handler,
            on_update,
        });
        assert!(pushed.is_ok(), "config registry full");
    }

    /// Look up a group by name
    pub fn find(&self, name: &str) -> Option<&Record<'a>> {
        self.records.iter().find(|r| r.name == name)
    }

    /// Record at insertion slot `index`
    pub fn get(&self, index: usize) -> Option<&Record<'a>> {
        self.records.get(index)
    }

    /// Records in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Record<'a>> {
        self.records.iter()
    }

    /// Number of registered groups
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Fire every update notification, in insertion order
    pub fn notify_all(&self) {
        for record in self.iter() {
            record.notify();
        }
    }

    /// Restore every group's defaults, in insertion order
    ///
    /// No notifications are fired.
    pub fn set_default_all(&self) {
        for record in self.iter() {
            record.handler.set_default();
        }
    }
}
