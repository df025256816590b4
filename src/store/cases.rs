use super::JsonStore;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionMethod {
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "AI")]
    Ai,
}

/// One moderation action taken against a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    #[serde(rename = "type")]
    pub kind: String,
    pub decision_method: DecisionMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_reason: Option<String>,
    pub user_id: String,
    pub username: String,
    pub channel_id: String,
    pub channel_name: String,
    pub message_content: String,
    pub action_taken: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RemoveError {
    #[error("case #{case_id} does not exist (the log has {len} cases)")]
    OutOfRange { case_id: usize, len: usize },
    #[error("case #{case_id} does not belong to that user")]
    WrongUser { case_id: usize },
}

/// Removes the case at 1-based position `case_id` if it belongs to `user_id`.
/// The log is left untouched on any rejection.
pub fn remove_case(cases: &mut Vec<Case>, user_id: &str, case_id: usize) -> Result<Case, RemoveError> {
    if case_id == 0 || case_id > cases.len() {
        return Err(RemoveError::OutOfRange { case_id, len: cases.len() });
    }
    if cases[case_id - 1].user_id != user_id {
        return Err(RemoveError::WrongUser { case_id });
    }
    Ok(cases.remove(case_id - 1))
}

/// Cases for one user, paired with their 1-based position in the log.
pub fn cases_for_user<'a>(cases: &'a [Case], user_id: &str) -> Vec<(usize, &'a Case)> {
    cases
        .iter()
        .enumerate()
        .filter(|(_, c)| c.user_id == user_id)
        .map(|(i, c)| (i + 1, c))
        .collect()
}

/// The append-only case log (`cases.json`).
pub struct CaseLog {
    store: JsonStore<Vec<Case>>,
}

impl CaseLog {
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        Self { store: JsonStore::open(path).await }
    }

    pub async fn append(&self, case: Case) -> usize {
        self.store.update(|cases| {
            cases.push(case);
            cases.len()
        }).await
    }

    pub async fn for_user(&self, user_id: &str) -> Vec<(usize, Case)> {
        self.store.read(|cases| {
            cases_for_user(cases, user_id)
                .into_iter()
                .map(|(id, c)| (id, c.clone()))
                .collect()
        }).await
    }

    pub async fn remove(&self, user_id: &str, case_id: usize) -> Result<Case, RemoveError> {
        self.store.update(|cases| remove_case(cases, user_id, case_id)).await
    }

    pub async fn len(&self) -> usize {
        self.store.read(|cases| cases.len()).await
    }
}
