use crate::config::{EscalationConfig, PunishmentKind};
use crate::store::{now_millis, RuleSet, ViolationRecord, ViolationStore};
use std::time::Duration;
use tracing::debug;

/// What the executor should do about one confirmed violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Warn { count: u32, limit: u32 },
    Timeout { duration: Duration, offense: u32 },
    Kick { offense: u32 },
    /// Ban threshold reached: no automatic punishment, staff decide.
    StaffReview { total: u32 },
}

impl Action {
    pub fn is_punishment(&self) -> bool {
        matches!(self, Action::Warn { .. } | Action::Timeout { .. } | Action::Kick { .. })
    }

    pub fn describe(&self) -> String {
        match self {
            Action::Warn { count, limit } => format!("Warning {}/{}", count, limit),
            Action::Timeout { duration, .. } => format!("Timeout ({})", format_duration(*duration)),
            Action::Kick { offense } => format!("Kick (offense {})", offense),
            Action::StaffReview { total } => format!("Flagged for staff review ({} violations)", total),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Punishment {
    Timeout(Vec<Duration>),
    Kick,
}

/// Maps a user's running counters to an [`Action`].
///
/// `strict_violations` only ever grows, so once it reaches `ban_threshold`
/// every further violation yields [`Action::StaffReview`].
#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    warn_threshold: u32,
    ban_threshold: u32,
    punishment: Punishment,
    reset_after_punishment: bool,
}

impl EscalationPolicy {
    pub fn from_config(cfg: &EscalationConfig) -> Self {
        let punishment = match cfg.punishment {
            PunishmentKind::Timeout => Punishment::Timeout(cfg.timeouts.iter().map(|ms| Duration::from_millis(*ms)).collect()),
            PunishmentKind::Kick => Punishment::Kick,
        };
        Self {
            warn_threshold: cfg.warn_threshold,
            ban_threshold: cfg.ban_threshold.max(1),
            punishment,
            reset_after_punishment: cfg.reset_after_punishment,
        }
    }

    /// Records one violation on `record` and returns the resulting action.
    pub fn apply(&self, record: &mut ViolationRecord, now: i64) -> Action {
        record.warnings = record.warnings.saturating_add(1);
        record.strict_violations = record.strict_violations.saturating_add(1);
        record.last_violation_timestamp = now;

        if record.strict_violations >= self.ban_threshold {
            return Action::StaffReview { total: record.strict_violations };
        }

        if self.warn_threshold > 0 && record.warnings <= self.warn_threshold {
            return Action::Warn { count: record.warnings, limit: self.warn_threshold + 1 };
        }

        let step = record.punishments as usize;
        record.punishments = record.punishments.saturating_add(1);
        if self.reset_after_punishment {
            record.warnings = 0;
        }

        match &self.punishment {
            Punishment::Timeout(ladder) => {
                let duration = ladder
                    .get(step.min(ladder.len().saturating_sub(1)))
                    .copied()
                    .unwrap_or(Duration::from_secs(60));
                Action::Timeout { duration, offense: record.punishments }
            }
            Punishment::Kick => Action::Kick { offense: record.punishments },
        }
    }

    /// Applies the policy to the stored record for `user_id` as one atomic
    /// update.
    pub async fn escalate(&self, store: &ViolationStore, user_id: &str, rule_set: RuleSet) -> Action {
        let now = now_millis();
        let action = store.update(user_id, rule_set, |record| self.apply(record, now)).await;
        debug!("{} escalation for {}: {:?}", rule_set.as_str(), user_id, action);
        action
    }
}

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 3600 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs >= 60 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EscalationSettings;
    use proptest::prelude::*;

    fn run(policy: &EscalationPolicy, n: usize) -> (Vec<Action>, ViolationRecord) {
        let mut record = ViolationRecord::default();
        let actions = (0..n).map(|i| policy.apply(&mut record, i as i64)).collect();
        (actions, record)
    }

    #[test]
    fn slur_defaults_warn_then_timeout_then_review() {
        let policy = EscalationPolicy::from_config(&EscalationSettings::default().slur);
        let (actions, record) = run(&policy, 11);

        assert_eq!(actions[0], Action::Warn { count: 1, limit: 3 });
        assert_eq!(actions[1], Action::Warn { count: 2, limit: 3 });
        assert!(matches!(actions[2], Action::Timeout { offense: 1, .. }));
        // counter was reset, so the cycle starts over
        assert_eq!(actions[3], Action::Warn { count: 1, limit: 3 });
        assert!(matches!(actions[5], Action::Timeout { offense: 2, .. }));
        assert_eq!(actions[9], Action::StaffReview { total: 10 });
        assert_eq!(actions[10], Action::StaffReview { total: 11 });
        assert_eq!(record.strict_violations, 11);
        assert_eq!(record.last_violation_timestamp, 10);
    }

    #[test]
    fn heavy_violation_ladder_caps_at_last_step() {
        let policy = EscalationPolicy::from_config(&EscalationSettings::default().violation);
        let (actions, _) = run(&policy, 6);
        let minutes: Vec<u64> = actions
            .iter()
            .filter_map(|a| match a {
                Action::Timeout { duration, .. } => Some(duration.as_secs() / 60),
                _ => None,
            })
            .collect();
        assert_eq!(minutes, vec![2, 5, 10, 30, 30]);
        assert_eq!(actions[5], Action::StaffReview { total: 6 });
    }

    #[test]
    fn bot_rule_kicks_twice_then_flags() {
        let policy = EscalationPolicy::from_config(&EscalationSettings::default().bot);
        let (actions, _) = run(&policy, 3);
        assert_eq!(actions, vec![
            Action::Kick { offense: 1 },
            Action::Kick { offense: 2 },
            Action::StaffReview { total: 3 },
        ]);
    }

    #[test]
    fn without_reset_warnings_keep_counting() {
        let cfg = EscalationConfig {
            warn_threshold: 1,
            ban_threshold: 100,
            punishment: PunishmentKind::Timeout,
            timeouts: vec![1_000, 2_000],
            reset_after_punishment: false,
        };
        let (actions, record) = run(&EscalationPolicy::from_config(&cfg), 4);
        assert_eq!(actions[0], Action::Warn { count: 1, limit: 2 });
        assert!(actions[1..].iter().all(|a| matches!(a, Action::Timeout { .. })));
        assert_eq!(record.warnings, 4);
        assert_eq!(record.punishments, 3);
    }

    #[test]
    fn describes_actions() {
        assert_eq!(Action::Timeout { duration: Duration::from_secs(120), offense: 1 }.describe(), "Timeout (2m)");
        assert_eq!(format_duration(Duration::from_secs(7200)), "2h");
        assert_eq!(format_duration(Duration::from_secs(90)), "90s");
    }

    proptest! {
        #[test]
        fn ban_threshold_is_a_permanent_ceiling(
            warn in 0u32..5,
            ban in 1u32..12,
            reset in any::<bool>(),
            kick in any::<bool>(),
            extra in 1usize..20,
        ) {
            let cfg = EscalationConfig {
                warn_threshold: warn,
                ban_threshold: ban,
                punishment: if kick { PunishmentKind::Kick } else { PunishmentKind::Timeout },
                timeouts: vec![60_000, 120_000],
                reset_after_punishment: reset,
            };
            let policy = EscalationPolicy::from_config(&cfg);
            let (actions, _) = run(&policy, ban as usize + extra);

            for (i, action) in actions.iter().enumerate() {
                let count = i as u32 + 1;
                if count >= ban {
                    prop_assert_eq!(action, &Action::StaffReview { total: count });
                } else {
                    prop_assert!(action.is_punishment());
                }
            }
        }
    }

    #[tokio::test]
    async fn escalate_persists_counters() {
        let dir = tempfile::tempdir().unwrap();
        let store = ViolationStore::open(dir.path().join("violations.json")).await;
        let policy = EscalationPolicy::from_config(&EscalationSettings::default().bot);

        assert_eq!(policy.escalate(&store, "9", RuleSet::Bot).await, Action::Kick { offense: 1 });
        assert_eq!(policy.escalate(&store, "9", RuleSet::Bot).await, Action::Kick { offense: 2 });

        let reopened = ViolationStore::open(dir.path().join("violations.json")).await;
        let record = reopened.get("9", RuleSet::Bot).await;
        assert_eq!(record.strict_violations, 2);
        assert_eq!(record.punishments, 2);
        assert!(record.last_violation_timestamp > 0);
    }
}
