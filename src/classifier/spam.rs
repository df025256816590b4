use crate::store::HistoryEntry;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy)]
pub struct SpamRule {
    pub threshold: usize,
    pub window_ms: i64,
    /// Highest unique/total ratio that still counts as spam.
    pub similarity: f64,
}

impl SpamRule {
    /// Returns the entries that make up the spam burst, or `None` when the
    /// window is too short or too varied.
    pub fn matches<'a>(&self, entries: &'a [HistoryEntry], now: i64) -> Option<Vec<&'a HistoryEntry>> {
        let recent: Vec<&HistoryEntry> = entries.iter().filter(|e| now - e.timestamp < self.window_ms).collect();
        if recent.is_empty() || recent.len() < self.threshold {
            return None;
        }

        let unique: HashSet<&str> = recent.iter().map(|e| e.content.as_str()).collect();
        let ratio = unique.len() as f64 / recent.len() as f64;
        if ratio <= self.similarity {
            Some(recent)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULE: SpamRule = SpamRule { threshold: 5, window_ms: 10_000, similarity: 0.5 };

    fn burst(contents: &[&str], step: i64) -> Vec<HistoryEntry> {
        contents.iter().enumerate().map(|(i, c)| HistoryEntry::new(i as i64 * step, *c)).collect()
    }

    #[test]
    fn identical_burst_is_spam() {
        let entries = burst(&["buy now"; 5], 1_000);
        let hit = RULE.matches(&entries, 4_000).unwrap();
        assert_eq!(hit.len(), 5);
    }

    #[test]
    fn near_identical_burst_is_spam() {
        let entries = burst(&["a", "a", "a", "b", "a", "b"], 500);
        // 2 unique / 6 total
        assert!(RULE.matches(&entries, 3_000).is_some());
    }

    #[test]
    fn varied_conversation_is_not_spam() {
        let entries = burst(&["hi", "how are you", "lol", "same", "ok"], 1_000);
        assert!(RULE.matches(&entries, 4_000).is_none());
    }

    #[test]
    fn below_threshold_is_not_spam() {
        let entries = burst(&["x"; 4], 1_000);
        assert!(RULE.matches(&entries, 3_000).is_none());
    }

    #[test]
    fn stale_messages_do_not_count() {
        let entries = burst(&["x"; 5], 5_000);
        // only the last two are inside the 10s window at t=20s
        assert!(RULE.matches(&entries, 20_000).is_none());
        assert!(RULE.matches(&[], 0).is_none());
    }
}
