//! Token table mapping opaque owner tokens to live host-side owners.
//!
//! Native code only ever sees an [`OwnerToken`]. Each slot carries a
//! generation that is bumped on unregister, so a token that outlived its
//! owner resolves to `None` instead of a recycled slot.

use std::sync::{Arc, Mutex};

use tickbridge_common::OwnerToken;

use crate::lock;

struct Slot<T> {
    generation: u32,
    owner: Option<Arc<T>>,
}

struct Slots<T> {
    entries: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

/// Thread-safe registry of owners addressed by [`OwnerToken`].
///
/// A registered owner is kept alive by the registry until `unregister`.
pub struct HandleRegistry<T> {
    slots: Mutex<Slots<T>>,
}

impl<T> HandleRegistry<T> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Slots {
                entries: Vec::new(),
                free: Vec::new(),
                live: 0,
            }),
        }
    }

    /// Register an owner and return the token native code will hand back.
    pub fn register(&self, owner: Arc<T>) -> OwnerToken {
        let mut slots = lock(&self.slots);
        slots.live += 1;

        if let Some(index) = slots.free.pop() {
            let slot = &mut slots.entries[index as usize];
            slot.owner = Some(owner);
            return OwnerToken::new(index, slot.generation);
        }

        let index = slots.entries.len() as u32;
        slots.entries.push(Slot {
            generation: 1,
            owner: Some(owner),
        });
        OwnerToken::new(index, 1)
    }

    /// Look up the owner for `token`. Stale and forged tokens give `None`.
    pub fn resolve(&self, token: OwnerToken) -> Option<Arc<T>> {
        let slots = lock(&self.slots);
        slots
            .entries
            .get(token.index() as usize)
            .filter(|slot| slot.generation == token.generation())
            .and_then(|slot| slot.owner.clone())
    }

    /// Release the registration. Returns the owner if `token` was live.
    pub fn unregister(&self, token: OwnerToken) -> Option<Arc<T>> {
        let mut slots = lock(&self.slots);
        let slot = slots.entries.get_mut(token.index() as usize)?;
        if slot.generation != token.generation() {
            return None;
        }
        let owner = slot.owner.take()?;

        // A slot whose generation would wrap is retired rather than reused.
        let retired = slot.generation == u32::MAX;
        slot.generation = slot.generation.wrapping_add(1);
        slots.live -= 1;
        if !retired {
            slots.free.push(token.index());
        }
        Some(owner)
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        lock(&self.slots).live
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for HandleRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
