use std::collections::HashMap;

use crate::core::settings::EventConfig;

/// Capacity limit for categories without a configured override.
pub const DEFAULT_CATEGORY_LIMIT: u32 = 20;

/// Tracks how many slots remain per category for one event.
///
/// Counts are only as fresh as the last `refresh`; the database insert
/// re-checks the limit inside its own transaction, so this tracker is
/// the fast local gate, not the authority.
pub struct CapacityTracker {
    limits: HashMap<String, u32>,
    counts: HashMap<String, u32>,
}

impl CapacityTracker {
    pub fn new(config: &EventConfig) -> Self {
        let limits = config
            .categories
            .iter()
            .map(|c| (c.clone(), config.limit(c)))
            .collect();

        CapacityTracker {
            limits,
            counts: HashMap::new(),
        }
    }

    /// Replaces the cached per-category counts with a fresh fetch.
    pub fn refresh(&mut self, counts: HashMap<String, u32>) {
        self.counts = counts;
    }

    pub fn count(&self, category: &str) -> u32 {
        self.counts.get(category).copied().unwrap_or(0)
    }

    pub fn limit(&self, category: &str) -> u32 {
        self.limits
            .get(category)
            .copied()
            .unwrap_or(DEFAULT_CATEGORY_LIMIT)
    }

    /// Slots left in a category, floored at zero.
    pub fn remaining_slots(&self, category: &str) -> u32 {
        self.limit(category).saturating_sub(self.count(category))
    }

    pub fn is_full(&self, category: &str) -> bool {
        self.remaining_slots(category) == 0
    }

    /// Remaining slots for every configured category, in no particular
    /// order.
    pub fn all_remaining(&self) -> HashMap<String, u32> {
        self.limits
            .keys()
            .map(|c| (c.clone(), self.remaining_slots(c)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> CapacityTracker {
        let config = EventConfig {
            categories: vec!["novicemen".to_owned(), "open".to_owned()],
            limits: HashMap::from([("novicemen".to_owned(), 32)]),
            ..Default::default()
        };
        CapacityTracker::new(&config)
    }

    #[test]
    fn limits_come_from_configuration() {
        let tracker = tracker();
        assert_eq!(tracker.limit("novicemen"), 32);
        assert_eq!(tracker.limit("open"), DEFAULT_CATEGORY_LIMIT);
    }

    #[test]
    fn remaining_slots_follow_counts() {
        let mut tracker = tracker();
        assert_eq!(tracker.remaining_slots("open"), 20);
        assert!(!tracker.is_full("open"));

        tracker.refresh(HashMap::from([("open".to_owned(), 19)]));
        assert_eq!(tracker.remaining_slots("open"), 1);
        assert!(!tracker.is_full("open"));

        tracker.refresh(HashMap::from([("open".to_owned(), 20)]));
        assert_eq!(tracker.remaining_slots("open"), 0);
        assert!(tracker.is_full("open"));
    }

    #[test]
    fn remaining_slots_never_go_negative() {
        let mut tracker = tracker();
        tracker.refresh(HashMap::from([("open".to_owned(), 25)]));
        assert_eq!(tracker.remaining_slots("open"), 0);
        assert!(tracker.is_full("open"));
    }

    #[test]
    fn all_remaining_covers_every_category() {
        let mut tracker = tracker();
        tracker.refresh(HashMap::from([("novicemen".to_owned(), 2)]));

        let all = tracker.all_remaining();
        assert_eq!(all.get("novicemen"), Some(&30));
        assert_eq!(all.get("open"), Some(&20));
    }
}
