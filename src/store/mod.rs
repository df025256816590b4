pub mod cases;
pub mod history;
pub mod violations;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

pub use cases::{Case, CaseLog, DecisionMethod};
pub use history::{HistoryEntry, HistoryWindow, MessageHistory, SpamTracker};
pub use violations::{RuleSet, ViolationRecord, ViolationStore};

/// One JSON document on disk, held in memory behind a mutex.
///
/// Every `update` mutates the in-memory copy and rewrites the file while the
/// lock is held, so concurrent handlers serialize instead of overwriting each
/// other. Writes go to a sibling temp file that is renamed over the target.
pub struct JsonStore<T> {
    path: PathBuf,
    state: Mutex<T>,
}

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Loads the document, falling back to `T::default()` when the file is
    /// missing or unreadable. A missing file is created immediately.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<T>(&bytes) {
                Ok(doc) => doc,
                Err(e) => {
                    error!("Failed to parse {}: {:?}. Starting from an empty document.", path.display(), e);
                    T::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let doc = T::default();
                match write_atomic(&path, &doc).await {
                    Ok(()) => info!("Created {}", path.display()),
                    Err(e) => error!("Failed to create {}: {:?}", path.display(), e),
                }
                doc
            }
            Err(e) => {
                error!("Failed to read {}: {:?}. Starting from an empty document.", path.display(), e);
                T::default()
            }
        };

        Self { path, state: Mutex::new(state) }
    }

    pub async fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let state = self.state.lock().await;
        f(&state)
    }

    /// Applies `f` and persists the result. A failed write is logged and the
    /// in-memory state is kept.
    pub async fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut state = self.state.lock().await;
        let out = f(&mut state);
        if let Err(e) = write_atomic(&self.path, &*state).await {
            error!("Failed to write {}: {:?}", self.path.display(), e);
        }
        out
    }
}

async fn write_atomic<T: Serialize>(path: &Path, doc: &T) -> anyhow::Result<()> {
    let bytes = serde_json::to_vec_pretty(doc)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&tmp, &bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        warn!("Rename of {} failed ({:?}), writing in place", tmp.display(), e);
        tokio::fs::write(path, &bytes).await?;
        let _ = tokio::fs::remove_file(&tmp).await;
    }
    Ok(())
}

/// Current wall-clock time as epoch milliseconds, the unit of every
/// persisted timestamp.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
