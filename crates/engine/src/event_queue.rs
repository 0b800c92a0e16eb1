//! Event queue with deterministic ordering.

use shopfloor_types::Priority;
use std::cmp::Ordering;
use std::time::Duration;

/// Key for ordering events in the queue.
///
/// Events are ordered by:
/// 1. Time (earlier first)
/// 2. Priority (ascending, lower value is more urgent)
/// 3. Sequence number (FIFO for same time/priority)
///
/// This total order is the engine's core correctness property: it makes two
/// runs of the same scenario resume processes in exactly the same order.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct EventKey {
    /// When this event should be processed.
    pub time: Duration,
    /// Priority for ordering at the same time.
    pub priority: Priority,
    /// Sequence number for deterministic FIFO ordering.
    pub sequence: u64,
}

impl EventKey {
    /// Create a new event key.
    pub fn new(time: Duration, priority: Priority, sequence: u64) -> Self {
        Self {
            time,
            priority,
            sequence,
        }
    }
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Order by time first
        match self.time.cmp(&other.time) {
            Ordering::Equal => {}
            ord => return ord,
        }

        // Then by priority (1 before 10)
        match self.priority.cmp(&other.priority) {
            Ordering::Equal => {}
            ord => return ord,
        }

        // Finally by sequence (FIFO)
        self.sequence.cmp(&other.sequence)
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_key_ordering_by_time() {
        let earlier = EventKey::new(Duration::from_secs(1), Priority::DEFAULT, 2);
        let later = EventKey::new(Duration::from_secs(2), Priority::DEFAULT, 1);
        assert!(earlier < later);
    }

    #[test]
    fn test_priority_ordering_at_same_time() {
        let urgent = EventKey::new(Duration::from_secs(1), Priority::new(2), 9);
        let relaxed = EventKey::new(Duration::from_secs(1), Priority::new(8), 1);
        assert!(
            urgent < relaxed,
            "lower priority value should process first even with a higher sequence"
        );
    }

    #[test]
    fn test_sequence_breaks_remaining_ties() {
        let first = EventKey::new(Duration::from_secs(1), Priority::DEFAULT, 1);
        let second = EventKey::new(Duration::from_secs(1), Priority::DEFAULT, 2);
        assert!(first < second, "submission order decides full ties");
    }
}
