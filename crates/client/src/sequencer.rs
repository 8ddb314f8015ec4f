//! Per-key ordering of asynchronous completions.
//!
//! Every fetch takes a ticket before it starts and hands it back through
//! [`Sequencer::finish`] when it completes, successfully or not. A completion
//! is fresh only if no higher ticket has been applied for the same key, so
//! the last issued fetch wins regardless of which response arrives last.
//!
//! A key is tracked only while something is in flight for it; once its last
//! ticket finishes the key is forgotten and numbering starts over.

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Default)]
struct Slot {
    issued: u64,
    applied: u64,
    in_flight: usize,
}

#[derive(Debug)]
pub(crate) struct Sequencer<K> {
    slots: HashMap<K, Slot>,
}

impl<K: Hash + Eq + Copy> Sequencer<K> {
    pub(crate) fn new() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }

    /// Take the next ticket for `key`. Must be handed back via `finish`.
    pub(crate) fn issue(&mut self, key: K) -> u64 {
        let slot = self.slots.entry(key).or_default();
        slot.issued += 1;
        slot.in_flight += 1;
        slot.issued
    }

    /// Hand back `ticket`; returns whether its result may be applied.
    pub(crate) fn finish(&mut self, key: K, ticket: u64) -> bool {
        let Some(slot) = self.slots.get_mut(&key) else {
            return false;
        };
        slot.in_flight = slot.in_flight.saturating_sub(1);
        let fresh = ticket > slot.applied;
        if fresh {
            slot.applied = ticket;
        }
        if slot.in_flight == 0 {
            self.slots.remove(&key);
        }
        fresh
    }

    /// Discard every ticket of `key` still in flight.
    pub(crate) fn fence(&mut self, key: K) {
        if let Some(slot) = self.slots.get_mut(&key) {
            slot.issued += 1;
            slot.applied = slot.issued;
        }
    }

    /// A point in `key`'s ticket order that in-flight tickets precede, or
    /// `None` if nothing is in flight.
    pub(crate) fn stamp(&mut self, key: K) -> Option<u64> {
        let slot = self.slots.get_mut(&key)?;
        slot.issued += 1;
        Some(slot.issued)
    }

    pub(crate) fn is_tracking(&self, key: K) -> bool {
        self.slots.contains_key(&key)
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_ticket_wins() {
        let mut seq = Sequencer::new();
        let first = seq.issue("p");
        let second = seq.issue("p");

        assert!(seq.finish("p", second));
        assert!(!seq.finish("p", first));
    }

    #[test]
    fn test_in_order_completions_all_apply() {
        let mut seq = Sequencer::new();
        let first = seq.issue("p");
        let second = seq.issue("p");

        assert!(seq.finish("p", first));
        assert!(seq.finish("p", second));
    }

    #[test]
    fn test_fence_discards_in_flight() {
        let mut seq = Sequencer::new();
        let in_flight = seq.issue("p");
        seq.fence("p");
        let after = seq.issue("p");

        assert!(!seq.finish("p", in_flight));
        assert!(seq.finish("p", after));
    }

    #[test]
    fn test_stamp_follows_in_flight_tickets() {
        let mut seq = Sequencer::new();
        assert_eq!(seq.stamp("p"), None);

        let ticket = seq.issue("p");
        let stamp = seq.stamp("p").unwrap_or_default();
        assert!(stamp > ticket);
        assert!(seq.finish("p", ticket));
    }

    #[test]
    fn test_keys_are_independent() {
        let mut seq = Sequencer::new();
        let a = seq.issue("a");
        seq.issue("b");
        seq.fence("b");
        assert!(seq.finish("a", a));
    }

    #[test]
    fn test_idle_keys_are_forgotten() {
        let mut seq = Sequencer::new();
        for key in ["a", "b", "c"] {
            let ticket = seq.issue(key);
            seq.finish(key, ticket);
        }
        seq.fence("d");

        assert_eq!(seq.tracked(), 0);
        assert!(!seq.is_tracking("a"));
    }

    #[test]
    fn test_key_stays_tracked_while_any_ticket_is_in_flight() {
        let mut seq = Sequencer::new();
        let first = seq.issue("p");
        let second = seq.issue("p");

        seq.finish("p", first);
        assert!(seq.is_tracking("p"));
        seq.finish("p", second);
        assert!(!seq.is_tracking("p"));
    }
}
