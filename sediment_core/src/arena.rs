// Copyright 2026 the Sediment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generational slot storage shared by the layer and task queues.

use alloc::vec::Vec;

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slots recycled through a free list; each reuse bumps the generation so
/// handles to a removed value stop resolving.
#[derive(Debug)]
pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    live: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            live: 0,
        }
    }

    /// Stores `value`, returning `(index, generation)`.
    pub(crate) fn insert(&mut self, value: T) -> (u32, u32) {
        self.live += 1;
        if let Some(idx) = self.free_list.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.value = Some(value);
            return (idx, slot.generation);
        }
        let idx = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        (idx, 0)
    }

    pub(crate) fn get(&self, idx: u32, generation: u32) -> Option<&T> {
        self.slots
            .get(idx as usize)
            .filter(|s| s.generation == generation)
            .and_then(|s| s.value.as_ref())
    }

    pub(crate) fn get_mut(&mut self, idx: u32, generation: u32) -> Option<&mut T> {
        self.slots
            .get_mut(idx as usize)
            .filter(|s| s.generation == generation)
            .and_then(|s| s.value.as_mut())
    }

    pub(crate) fn remove(&mut self, idx: u32, generation: u32) -> Option<T> {
        let slot = self
            .slots
            .get_mut(idx as usize)
            .filter(|s| s.generation == generation)?;
        let value = slot.value.take()?;
        self.free_list.push(idx);
        self.live -= 1;
        Some(value)
    }

    /// Current generation of a slot, for stale-handle diagnostics.
    pub(crate) fn generation_of(&self, idx: u32) -> u32 {
        self.slots
            .get(idx as usize)
            .map_or(u32::MAX, |s| s.generation)
    }

    pub(crate) const fn len(&self) -> usize {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuse_bumps_generation() {
        let mut arena = Arena::new();
        let (i0, g0) = arena.insert("a");
        assert_eq!(arena.remove(i0, g0), Some("a"));
        let (i1, g1) = arena.insert("b");
        assert_eq!(i0, i1);
        assert_ne!(g0, g1);
        assert!(arena.get(i0, g0).is_none());
        assert_eq!(arena.get(i1, g1), Some(&"b"));
    }

    #[test]
    fn double_remove_is_none() {
        let mut arena = Arena::new();
        let (i, g) = arena.insert(5_u8);
        assert_eq!(arena.len(), 1);
        assert!(arena.remove(i, g).is_some());
        assert!(arena.remove(i, g).is_none());
        assert_eq!(arena.len(), 0);
    }
}
