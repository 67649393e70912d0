use std::collections::{HashSet, VecDeque};

/// Size at which the set gets compacted.
pub const SEEN_HIGH_WATER: usize = 1000;

/// Number of most recently added identifiers kept by a compaction.
pub const SEEN_KEEP_AFTER_COMPACTION: usize = 500;

/// Insertion-ordered set of item identifiers already observed by one trigger.
///
/// Compaction forgets the oldest identifiers. An evicted identifier that is
/// still present in the feed will be reported as new again on a later cycle.
#[derive(Debug, Default, Clone)]
pub struct SeenSet {
    order: VecDeque<String>,
    members: HashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    /// Returns `true` when the identifier was not present before.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.members.contains(id) {
            return false;
        }
        self.members.insert(id.to_string());
        self.order.push_back(id.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }

    /// Compact once past the high-water mark. Returns the number of evicted
    /// identifiers.
    pub fn compact(&mut self) -> usize {
        if self.order.len() <= SEEN_HIGH_WATER {
            return 0;
        }
        let evict = self.order.len() - SEEN_KEEP_AFTER_COMPACTION;
        for id in self.order.drain(..evict) {
            self.members.remove(&id);
        }
        evict
    }
}
