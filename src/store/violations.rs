use super::JsonStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleSet {
    Slur,
    Violation,
    Bot,
}

impl RuleSet {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleSet::Slur => "slur",
            RuleSet::Violation => "violation",
            RuleSet::Bot => "bot",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViolationRecord {
    /// Violations since the last punishment when resets are enabled,
    /// otherwise all confirmed violations.
    pub warnings: u32,
    /// All confirmed violations. Never reset.
    pub strict_violations: u32,
    /// Timeouts or kicks applied so far.
    pub punishments: u32,
    /// Epoch milliseconds, 0 when the user has no violations.
    pub last_violation_timestamp: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserViolations {
    pub slur: ViolationRecord,
    pub violation: ViolationRecord,
    pub bot: ViolationRecord,
}

impl UserViolations {
    pub fn get(&self, rule_set: RuleSet) -> &ViolationRecord {
        match rule_set {
            RuleSet::Slur => &self.slur,
            RuleSet::Violation => &self.violation,
            RuleSet::Bot => &self.bot,
        }
    }

    pub fn get_mut(&mut self, rule_set: RuleSet) -> &mut ViolationRecord {
        match rule_set {
            RuleSet::Slur => &mut self.slur,
            RuleSet::Violation => &mut self.violation,
            RuleSet::Bot => &mut self.bot,
        }
    }
}

/// Per-user violation counters (`violations.json`).
pub struct ViolationStore {
    store: JsonStore<HashMap<String, UserViolations>>,
}

impl ViolationStore {
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        Self { store: JsonStore::open(path).await }
    }

    pub async fn get(&self, user_id: &str, rule_set: RuleSet) -> ViolationRecord {
        self.store
            .read(|map| map.get(user_id).map(|u| *u.get(rule_set)).unwrap_or_default())
            .await
    }

    /// Runs `f` against one user's record and persists the result as a
    /// single atomic step.
    pub async fn update<R>(
        &self,
        user_id: &str,
        rule_set: RuleSet,
        f: impl FnOnce(&mut ViolationRecord) -> R,
    ) -> R {
        self.store
            .update(|map| f(map.entry(user_id.to_string()).or_default().get_mut(rule_set)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_uses_camel_case_fields() {
        let rec = ViolationRecord { warnings: 1, strict_violations: 2, punishments: 0, last_violation_timestamp: 5 };
        let v = serde_json::to_value(rec).unwrap();
        assert_eq!(v["strictViolations"], 2);
        assert_eq!(v["lastViolationTimestamp"], 5);
    }

    #[test]
    fn older_records_without_punishments_still_load() {
        let raw = r#"{ "42": { "slur": { "warnings": 3, "strictViolations": 3, "lastViolationTimestamp": 9 } } }"#;
        let map: HashMap<String, UserViolations> = serde_json::from_str(raw).unwrap();
        assert_eq!(map["42"].slur.punishments, 0);
        assert_eq!(map["42"].bot, ViolationRecord::default());
    }

    #[tokio::test]
    async fn rule_sets_do_not_share_counters() {
        let dir = tempfile::tempdir().unwrap();
        let store = ViolationStore::open(dir.path().join("violations.json")).await;

        store.update("7", RuleSet::Slur, |r| r.warnings += 2).await;
        store.update("7", RuleSet::Bot, |r| r.warnings += 1).await;

        assert_eq!(store.get("7", RuleSet::Slur).await.warnings, 2);
        assert_eq!(store.get("7", RuleSet::Bot).await.warnings, 1);
        assert_eq!(store.get("7", RuleSet::Violation).await.warnings, 0);
        assert_eq!(store.get("8", RuleSet::Slur).await, ViolationRecord::default());
    }
}
