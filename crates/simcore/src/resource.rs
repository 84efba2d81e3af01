use tracing::{debug, warn};

use crate::ActorId;

/// Fixed-capacity pool of indexed slots, each held by at most one actor.
/// The pool is the single source of truth for who holds what; callers that
/// cache an index must reconcile against it.
pub struct SlotPool {
    name: &'static str,
    slots: Vec<Option<ActorId>>,
}

impl SlotPool {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            slots: vec![None; capacity],
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(|slot| slot.is_some())
    }

    /// Grants the lowest free slot. Idempotent: an actor that already holds
    /// a slot gets the same index back instead of a second slot.
    pub fn try_acquire(&mut self, actor: &ActorId) -> Option<usize> {
        if let Some(existing) = self.index_of(actor) {
            return Some(existing);
        }
        let free = self.slots.iter().position(|slot| slot.is_none())?;
        self.slots[free] = Some(actor.clone());
        debug!(pool = self.name, actor = %actor, slot = free, "slot_acquired");
        Some(free)
    }

    /// Grants a specific slot, used when restoring persisted claims. Fails
    /// when the index is out of range or the slot belongs to someone else.
    pub fn try_acquire_index(&mut self, actor: &ActorId, index: usize) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            warn!(pool = self.name, actor = %actor, slot = index, "slot_index_out_of_range");
            return false;
        };
        match slot {
            Some(holder) if holder == actor => true,
            Some(_) => false,
            None => {
                *slot = Some(actor.clone());
                debug!(pool = self.name, actor = %actor, slot = index, "slot_acquired");
                true
            }
        }
    }

    pub fn release_index(&mut self, index: usize) -> Option<ActorId> {
        let holder = self.slots.get_mut(index)?.take();
        if let Some(actor) = &holder {
            debug!(pool = self.name, actor = %actor, slot = index, "slot_released");
        }
        holder
    }

    /// Releases whatever slot `actor` holds, returning its index. A no-op
    /// for actors holding nothing.
    pub fn release_holder(&mut self, actor: &ActorId) -> Option<usize> {
        let index = self.index_of(actor)?;
        self.slots[index] = None;
        debug!(pool = self.name, actor = %actor, slot = index, "slot_released");
        Some(index)
    }

    pub fn index_of(&self, actor: &ActorId) -> Option<usize> {
        self.slots.iter().position(|slot| slot.as_ref() == Some(actor))
    }

    pub fn holder(&self, index: usize) -> Option<&ActorId> {
        self.slots.get(index).and_then(|slot| slot.as_ref())
    }

    pub fn holders(&self) -> impl Iterator<Item = (usize, &ActorId)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|actor| (index, actor)))
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> ActorId {
        ActorId::new(raw)
    }

    #[test]
    fn acquire_grants_lowest_free_slot() {
        let mut pool = SlotPool::new("queue", 3);
        assert_eq!(pool.try_acquire(&id("a")), Some(0));
        assert_eq!(pool.try_acquire(&id("b")), Some(1));
        pool.release_index(0);
        assert_eq!(pool.try_acquire(&id("c")), Some(0));
    }

    #[test]
    fn acquire_is_idempotent_per_actor() {
        let mut pool = SlotPool::new("queue", 2);
        assert_eq!(pool.try_acquire(&id("a")), Some(0));
        assert_eq!(pool.try_acquire(&id("a")), Some(0));
        assert_eq!(pool.occupied(), 1);
    }

    #[test]
    fn full_pool_refuses_new_holders() {
        let mut pool = SlotPool::new("queue", 1);
        assert_eq!(pool.try_acquire(&id("a")), Some(0));
        assert_eq!(pool.try_acquire(&id("b")), None);
        assert!(pool.is_full());
    }

    #[test]
    fn acquire_index_refuses_taken_and_out_of_range_slots() {
        let mut pool = SlotPool::new("queue", 2);
        assert!(pool.try_acquire_index(&id("a"), 1));
        assert!(!pool.try_acquire_index(&id("b"), 1));
        assert!(pool.try_acquire_index(&id("a"), 1));
        assert!(!pool.try_acquire_index(&id("b"), 5));
        assert_eq!(pool.holder(1), Some(&id("a")));
    }

    #[test]
    fn release_holder_frees_the_right_slot() {
        let mut pool = SlotPool::new("queue", 3);
        pool.try_acquire(&id("a"));
        pool.try_acquire(&id("b"));
        assert_eq!(pool.release_holder(&id("a")), Some(0));
        assert_eq!(pool.release_holder(&id("a")), None);
        assert_eq!(pool.index_of(&id("b")), Some(1));
    }
}
