//! Visual handles.
//!
//! Render caches (tile and particle vertex buffers) are keyed by
//! [`VisualId`], so a handle must never come to mean a different visual.
//! Each id pairs a slot in the world with that slot's generation at the time
//! the visual was added; removing the visual retires the generation, and a
//! later visual placed in the same slot gets a new one.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

// ---------------------------------------------------------------------------
// VisualId
// ---------------------------------------------------------------------------

/// Handle to a visual in a [`World`](crate::world::World).
///
/// Packed as `[generation: u32 | slot: u32]`, which also makes ids of the
/// same generation sort by slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VisualId(u64);

impl VisualId {
    pub fn new(slot: u32, generation: u32) -> Self {
        Self(u64::from(generation) << 32 | u64::from(slot))
    }

    /// Slot in the world's visual table.
    #[inline]
    pub fn index(self) -> u32 {
        self.0 as u32
    }

    #[inline]
    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl fmt::Debug for VisualId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VisualId({self})")
    }
}

/// `slot#generation`, e.g. `3#1` for the second visual placed in slot 3.
impl fmt::Display for VisualId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.index(), self.generation())
    }
}

// ---------------------------------------------------------------------------
// VisualSlots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    generation: u32,
    occupied: bool,
}

/// Slot bookkeeping behind the world's visual table.
///
/// Vacated slots are refilled oldest first, so a slot that was just emptied
/// is the last to be handed out again.
#[derive(Debug, Default)]
pub struct VisualSlots {
    slots: Vec<Slot>,
    vacant: VecDeque<u32>,
}

impl VisualSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a slot for a new visual.
    pub fn claim(&mut self) -> VisualId {
        match self.vacant.pop_front() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.occupied = true;
                VisualId::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    occupied: true,
                });
                VisualId::new(index, 0)
            }
        }
    }

    /// Vacate the slot `id` holds. Every copy of `id` stops resolving.
    /// Returns `false` if `id` does not name the slot's current visual.
    pub fn vacate(&mut self, id: VisualId) -> bool {
        if !self.is_current(id) {
            return false;
        }
        let slot = &mut self.slots[id.index() as usize];
        slot.occupied = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.vacant.push_back(id.index());
        true
    }

    /// Whether `id` names the visual currently in its slot.
    pub fn is_current(&self, id: VisualId) -> bool {
        self.slots
            .get(id.index() as usize)
            .is_some_and(|slot| slot.occupied && slot.generation == id.generation())
    }

    pub fn occupied(&self) -> usize {
        self.slots.len() - self.vacant.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
