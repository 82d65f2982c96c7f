//! Interned name pool
//!
//! Types and fields are keyed by [`Name`] handles instead of strings. Equal
//! byte content always yields the same handle, so name comparison anywhere
//! in the registry is an integer compare. Handles are refcounted; a name is
//! dropped from the pool when its last holder releases it, and its slot is
//! recycled for future interns.
//!
//! # Design
//!
//! An arena of unique strings addressed by index with a per-slot refcount,
//! plus a content map for the intern lookup. The arena slot, not the string
//! address, is the identity: `Name` handles stay valid and comparable for
//! as long as a reference is held.

use std::collections::HashMap;
use std::sync::Arc;

/// Handle to an interned string
///
/// Handle equality implies content equality (and vice versa) while either
/// handle is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Name(u32);

#[derive(Debug)]
struct NameEntry {
    text: Arc<str>,
    refcount: u32,
}

/// Content-addressed pool of refcounted strings
#[derive(Debug, Default)]
pub struct NameTable {
    slots: Vec<Option<NameEntry>>,
    index: HashMap<Arc<str>, u32>,
    free: Vec<u32>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live names
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Intern `text`, returning its canonical handle
    ///
    /// An existing entry gets its refcount bumped; a new entry starts at 1.
    pub fn intern(&mut self, text: &str) -> Name {
        if let Some(&slot) = self.index.get(text) {
            if let Some(entry) = self.slots[slot as usize].as_mut() {
                entry.refcount += 1;
            }
            return Name(slot);
        }
        let text: Arc<str> = Arc::from(text);
        let entry = NameEntry {
            text: Arc::clone(&text),
            refcount: 1,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize] = Some(entry);
                slot
            }
            None => {
                self.slots.push(Some(entry));
                (self.slots.len() - 1) as u32
            }
        };
        self.index.insert(text, slot);
        Name(slot)
    }

    /// Look up an existing name without interning
    pub fn lookup(&self, text: &str) -> Option<Name> {
        self.index.get(text).map(|&slot| Name(slot))
    }

    /// Take an extra reference to an already-interned name
    pub fn retain(&mut self, name: Name) -> Name {
        if let Some(entry) = self.slots.get_mut(name.0 as usize).and_then(Option::as_mut) {
            entry.refcount += 1;
        }
        name
    }

    /// Drop one reference; the slot is freed and recycled at zero
    pub fn release(&mut self, name: Name) {
        let slot = name.0 as usize;
        let Some(entry) = self.slots.get_mut(slot).and_then(Option::as_mut) else {
            return;
        };
        if entry.refcount > 1 {
            entry.refcount -= 1;
            return;
        }
        let entry = self.slots[slot].take();
        if let Some(entry) = entry {
            self.index.remove(&entry.text);
        }
        self.free.push(name.0);
    }

    /// Resolve a handle back to its content
    ///
    /// Returns `None` for a handle whose slot has been freed.
    pub fn resolve(&self, name: Name) -> Option<&str> {
        self.slots
            .get(name.0 as usize)
            .and_then(Option::as_ref)
            .map(|entry| &*entry.text)
    }

    /// Current refcount of a handle, 0 if freed
    pub fn refcount(&self, name: Name) -> u32 {
        self.slots
            .get(name.0 as usize)
            .and_then(Option::as_ref)
            .map_or(0, |entry| entry.refcount)
    }
}
