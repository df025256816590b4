use super::JsonStore;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}

impl HistoryEntry {
    pub fn new(timestamp: i64, content: impl Into<String>) -> Self {
        Self { timestamp, content: content.into(), message_id: None, channel_id: None }
    }

    pub fn with_message(mut self, channel_id: &str, message_id: &str) -> Self {
        self.channel_id = Some(channel_id.to_string());
        self.message_id = Some(message_id.to_string());
        self
    }
}

/// Eviction rules for a per-user sliding window. Oldest entries leave first.
#[derive(Debug, Clone, Copy)]
pub struct HistoryWindow {
    pub capacity: usize,
    /// Entries older than this (relative to the newest push) are dropped.
    pub max_age_ms: Option<i64>,
}

impl HistoryWindow {
    pub fn by_count(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), max_age_ms: None }
    }

    pub fn by_age(capacity: usize, max_age_ms: i64) -> Self {
        Self { capacity: capacity.max(1), max_age_ms: Some(max_age_ms) }
    }

    pub fn push(&self, entries: &mut VecDeque<HistoryEntry>, entry: HistoryEntry) {
        let now = entry.timestamp;
        entries.push_back(entry);
        self.evict(entries, now);
    }

    pub fn evict(&self, entries: &mut VecDeque<HistoryEntry>, now: i64) {
        if let Some(max_age) = self.max_age_ms {
            while let Some(front) = entries.front() {
                if now - front.timestamp >= max_age {
                    entries.pop_front();
                } else {
                    break;
                }
            }
        }
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }
}

/// Persisted rolling history per user (`messageHistory.json`).
pub struct MessageHistory {
    store: JsonStore<HashMap<String, VecDeque<HistoryEntry>>>,
    window: HistoryWindow,
}

impl MessageHistory {
    pub async fn open(path: impl Into<PathBuf>, window: HistoryWindow) -> Self {
        Self { store: JsonStore::open(path).await, window }
    }

    /// Appends an entry and returns the user's window after eviction.
    pub async fn push(&self, user_id: &str, entry: HistoryEntry) -> Vec<HistoryEntry> {
        let window = self.window;
        self.store.update(|map| {
            let entries = map.entry(user_id.to_string()).or_default();
            window.push(entries, entry);
            entries.iter().cloned().collect()
        }).await
    }

    pub async fn clear(&self, user_id: &str) {
        self.store.update(|map| {
            if let Some(entries) = map.get_mut(user_id) {
                entries.clear();
            }
        }).await
    }

    pub fn capacity(&self) -> usize {
        self.window.capacity
    }
}

/// In-memory spam windows keyed by `(guild_id, user_id)`. Not persisted.
pub struct SpamTracker {
    windows: RwLock<HashMap<(String, String), VecDeque<HistoryEntry>>>,
    window: HistoryWindow,
}

impl SpamTracker {
    pub fn new(window: HistoryWindow) -> Self {
        Self { windows: RwLock::new(HashMap::new()), window }
    }

    /// Appends an entry and returns the sender's window. Other members'
    /// windows are aged against the same clock and dropped once empty.
    pub async fn push(&self, guild_id: &str, user_id: &str, entry: HistoryEntry) -> Vec<HistoryEntry> {
        let now = entry.timestamp;
        let key = (guild_id.to_string(), user_id.to_string());
        let mut map = self.windows.write().await;

        let window = self.window;
        map.retain(|k, entries| {
            if *k != key {
                window.evict(entries, now);
            }
            !entries.is_empty()
        });

        let entries = map.entry(key).or_default();
        window.push(entries, entry);
        entries.iter().cloned().collect()
    }

    #[cfg(test)]
    pub async fn tracked(&self) -> usize {
        self.windows.read().await.len()
    }

    pub async fn clear(&self, guild_id: &str, user_id: &str) {
        let mut map = self.windows.write().await;
        map.remove(&(guild_id.to_string(), user_id.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn window_never_exceeds_capacity(
            capacity in 1usize..16,
            gaps in proptest::collection::vec(0i64..5_000, 0..200),
            max_age in proptest::option::of(1i64..20_000),
        ) {
            let window = HistoryWindow { capacity, max_age_ms: max_age };
            let mut entries = VecDeque::new();
            let mut now = 0;
            for (i, gap) in gaps.into_iter().enumerate() {
                now += gap;
                window.push(&mut entries, HistoryEntry::new(now, format!("m{}", i)));
                prop_assert!(entries.len() <= capacity);
                prop_assert_eq!(entries.back().map(|e| e.timestamp), Some(now));
            }
        }
    }

    #[test]
    fn count_window_evicts_oldest_first() {
        let window = HistoryWindow::by_count(3);
        let mut entries = VecDeque::new();
        for i in 0..5 {
            window.push(&mut entries, HistoryEntry::new(i, format!("m{}", i)));
        }
        let contents: Vec<&str> = entries.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
    }

    #[test]
    fn age_window_drops_stale_entries() {
        let window = HistoryWindow::by_age(10, 10_000);
        let mut entries = VecDeque::new();
        window.push(&mut entries, HistoryEntry::new(0, "old"));
        window.push(&mut entries, HistoryEntry::new(5_000, "mid"));
        window.push(&mut entries, HistoryEntry::new(12_000, "new"));
        let contents: Vec<&str> = entries.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["mid", "new"]);
    }

    #[tokio::test]
    async fn persisted_history_is_bounded_and_clearable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messageHistory.json");
        let history = MessageHistory::open(&path, HistoryWindow::by_count(4)).await;

        let mut last = Vec::new();
        for i in 0..6 {
            last = history.push("1", HistoryEntry::new(i, format!("m{}", i))).await;
        }
        assert_eq!(last.len(), 4);
        assert_eq!(last[0].content, "m2");

        history.clear("1").await;
        let reopened = MessageHistory::open(&path, HistoryWindow::by_count(4)).await;
        assert_eq!(reopened.push("1", HistoryEntry::new(10, "fresh")).await.len(), 1);
    }

    #[tokio::test]
    async fn idle_members_are_forgotten() {
        let tracker = SpamTracker::new(HistoryWindow::by_age(10, 10_000));
        tracker.push("g", "a", HistoryEntry::new(0, "hello")).await;
        tracker.push("g", "b", HistoryEntry::new(5_000, "hi")).await;
        assert_eq!(tracker.tracked().await, 2);

        let window = tracker.push("g", "c", HistoryEntry::new(12_000, "hey")).await;
        assert_eq!(window.len(), 1);
        assert_eq!(tracker.tracked().await, 2);

        tracker.push("g", "c", HistoryEntry::new(30_000, "still here")).await;
        assert_eq!(tracker.tracked().await, 1);
    }

    #[tokio::test]
    async fn spam_windows_are_scoped_per_guild() {
        let tracker = SpamTracker::new(HistoryWindow::by_age(10, 10_000));
        tracker.push("g1", "u", HistoryEntry::new(0, "a")).await;
        tracker.push("g1", "u", HistoryEntry::new(1, "a")).await;
        let other = tracker.push("g2", "u", HistoryEntry::new(2, "a")).await;
        assert_eq!(other.len(), 1);

        tracker.clear("g1", "u").await;
        assert_eq!(tracker.push("g1", "u", HistoryEntry::new(3, "a")).await.len(), 1);
    }
}
