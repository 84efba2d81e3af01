use tracing::debug;

use crate::ActorId;

/// Delivery counters for the most recently completed tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventBusCounts {
    pub published: u32,
    pub delivered: u32,
    pub dropped: u32,
}

/// Synchronous, single-threaded event bus. Events are either addressed to a
/// single actor or broadcast to whoever drains the shared channel; both are
/// expected to be consumed within the tick that published them. Anything
/// still pending at rollover is counted as dropped and discarded.
pub struct EventBus<E> {
    addressed: Vec<(ActorId, E)>,
    broadcasts: Vec<E>,
    published_this_tick: u32,
    delivered_this_tick: u32,
    last_tick: EventBusCounts,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            addressed: Vec::new(),
            broadcasts: Vec::new(),
            published_this_tick: 0,
            delivered_this_tick: 0,
            last_tick: EventBusCounts::default(),
        }
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&mut self, target: &ActorId, event: E) {
        self.published_this_tick = self.published_this_tick.saturating_add(1);
        self.addressed.push((target.clone(), event));
    }

    pub fn broadcast(&mut self, event: E) {
        self.published_this_tick = self.published_this_tick.saturating_add(1);
        self.broadcasts.push(event);
    }

    /// Removes and returns every event addressed to `target`, preserving
    /// publish order.
    pub fn drain_for(&mut self, target: &ActorId) -> Vec<E> {
        let mut drained = Vec::new();
        let mut index = 0;
        while index < self.addressed.len() {
            if &self.addressed[index].0 == target {
                let (_, event) = self.addressed.remove(index);
                drained.push(event);
            } else {
                index += 1;
            }
        }
        self.delivered_this_tick = self
            .delivered_this_tick
            .saturating_add(drained.len() as u32);
        drained
    }

    pub fn drain_broadcasts(&mut self) -> Vec<E> {
        let drained = std::mem::take(&mut self.broadcasts);
        self.delivered_this_tick = self
            .delivered_this_tick
            .saturating_add(drained.len() as u32);
        drained
    }

    /// Distinct actors with pending addressed events, in publish order.
    pub fn pending_targets(&self) -> Vec<ActorId> {
        let mut targets: Vec<ActorId> = Vec::new();
        for (target, _) in &self.addressed {
            if !targets.contains(target) {
                targets.push(target.clone());
            }
        }
        targets
    }

    pub fn pending_addressed_len(&self) -> usize {
        self.addressed.len()
    }

    /// Discards anything still queued for an actor that no longer exists.
    pub fn drop_subscriber(&mut self, target: &ActorId) {
        let before = self.addressed.len();
        self.addressed.retain(|(recipient, _)| recipient != target);
        let removed = before - self.addressed.len();
        if removed > 0 {
            debug!(actor = %target, removed, "event_subscriber_dropped");
        }
    }

    pub fn clear(&mut self) {
        self.addressed.clear();
        self.broadcasts.clear();
        self.published_this_tick = 0;
        self.delivered_this_tick = 0;
    }

    /// Ends the tick: undelivered events are counted as dropped and
    /// discarded, counters roll into `last_tick_counts`.
    pub fn finish_tick_rollover(&mut self) {
        let dropped = (self.addressed.len() + self.broadcasts.len()) as u32;
        self.addressed.clear();
        self.broadcasts.clear();
        self.last_tick = EventBusCounts {
            published: self.published_this_tick,
            delivered: self.delivered_this_tick,
            dropped,
        };
        self.published_this_tick = 0;
        self.delivered_this_tick = 0;
    }

    pub fn last_tick_counts(&self) -> EventBusCounts {
        self.last_tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> ActorId {
        ActorId::new(raw)
    }

    #[test]
    fn addressed_events_reach_only_their_target() {
        let mut bus: EventBus<u32> = EventBus::new();
        bus.publish(&id("a"), 1);
        bus.publish(&id("b"), 2);
        bus.publish(&id("a"), 3);

        assert_eq!(bus.drain_for(&id("a")), vec![1, 3]);
        assert_eq!(bus.drain_for(&id("a")), Vec::<u32>::new());
        assert_eq!(bus.drain_for(&id("b")), vec![2]);
    }

    #[test]
    fn rollover_counts_undelivered_as_dropped() {
        let mut bus: EventBus<u32> = EventBus::new();
        bus.publish(&id("a"), 1);
        bus.broadcast(2);
        bus.broadcast(3);
        let _ = bus.drain_broadcasts();

        bus.finish_tick_rollover();
        let counts = bus.last_tick_counts();
        assert_eq!(counts.published, 3);
        assert_eq!(counts.delivered, 2);
        assert_eq!(counts.dropped, 1);
        assert_eq!(bus.pending_addressed_len(), 0);
    }

    #[test]
    fn drop_subscriber_removes_pending_events() {
        let mut bus: EventBus<u32> = EventBus::new();
        bus.publish(&id("gone"), 1);
        bus.publish(&id("kept"), 2);

        bus.drop_subscriber(&id("gone"));
        assert_eq!(bus.pending_addressed_len(), 1);
        assert_eq!(bus.drain_for(&id("kept")), vec![2]);
    }

    #[test]
    fn pending_targets_are_distinct_in_publish_order() {
        let mut bus: EventBus<u32> = EventBus::new();
        bus.publish(&id("b"), 1);
        bus.publish(&id("a"), 2);
        bus.publish(&id("b"), 3);

        assert_eq!(bus.pending_targets(), vec![id("b"), id("a")]);
    }
}
