//! Settings and analysis-history store.
//!
//! History is append-only and kept most-recent-first, capped at
//! [`HISTORY_LIMIT`] entries; the oldest entry is evicted first. Appends are
//! serialized through an internal mutex so concurrent sessions in one
//! process never lose each other's entries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use crate::error::StoreError;
use crate::persistence::{read_json, write_json_atomic};
use crate::research::{AnalysisSession, SessionStatus};

/// Maximum number of history entries kept.
pub const HISTORY_LIMIT: usize = 50;

const SETTINGS_FILE: &str = "settings.json";
const HISTORY_FILE: &str = "history.json";

/// One completed analysis, as listed in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub topic: String,
    pub timestamp: DateTime<Utc>,
    pub status: SessionStatus,
    pub artifact_count: usize,
}

impl HistoryEntry {
    pub fn from_session(session: &AnalysisSession) -> Self {
        Self {
            id: session.id.clone(),
            topic: session.topic.clone(),
            timestamp: session.created_at,
            status: session.status,
            artifact_count: session.artifacts.len(),
        }
    }
}

/// User settings persisted next to the history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,
    /// Model used for research runs when none is given explicitly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Persistent settings and history.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_settings(&self) -> Result<Settings, StoreError>;

    async fn put_settings(&self, settings: &Settings) -> Result<(), StoreError>;

    /// Insert `entry` at the front, evicting the oldest past the cap.
    async fn append_history(&self, entry: HistoryEntry) -> Result<(), StoreError>;

    /// Most-recent-first, at most [`HISTORY_LIMIT`] entries.
    async fn load_history(&self) -> Result<Vec<HistoryEntry>, StoreError>;
}

fn push_front_capped(history: &mut VecDeque<HistoryEntry>, entry: HistoryEntry) {
    history.push_front(entry);
    history.truncate(HISTORY_LIMIT);
}

/// Keeps everything in memory, for tests and ephemeral runs.
#[derive(Default)]
pub struct InMemorySessionStore {
    settings: Mutex<Settings>,
    history: Mutex<VecDeque<HistoryEntry>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(settings),
            history: Mutex::new(VecDeque::new()),
        }
    }
}

fn poisoned() -> StoreError {
    StoreError::Io(std::io::Error::other("store lock poisoned"))
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_settings(&self) -> Result<Settings, StoreError> {
        self.settings.lock().map(|s| s.clone()).map_err(|_| poisoned())
    }

    async fn put_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        let mut current = self.settings.lock().map_err(|_| poisoned())?;
        *current = settings.clone();
        Ok(())
    }

    async fn append_history(&self, entry: HistoryEntry) -> Result<(), StoreError> {
        let mut history = self.history.lock().map_err(|_| poisoned())?;
        push_front_capped(&mut history, entry);
        Ok(())
    }

    async fn load_history(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        let history = self.history.lock().map_err(|_| poisoned())?;
        Ok(history.iter().cloned().collect())
    }
}

/// JSON files in a data directory: `settings.json` and `history.json`.
///
/// Every write is atomic (temp file + rename). A missing file reads as
/// empty; a corrupt one is a `StoreError::Serialization`.
pub struct FileSessionStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn settings_path(&self) -> PathBuf {
        self.dir.join(SETTINGS_FILE)
    }

    fn history_path(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE)
    }

    fn read_history(&self) -> Result<VecDeque<HistoryEntry>, StoreError> {
        Ok(read_json::<VecDeque<HistoryEntry>>(&self.history_path())?.unwrap_or_default())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get_settings(&self) -> Result<Settings, StoreError> {
        Ok(read_json::<Settings>(&self.settings_path())?.unwrap_or_default())
    }

    async fn put_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| poisoned())?;
        write_json_atomic(&self.settings_path(), settings)?;
        Ok(())
    }

    async fn append_history(&self, entry: HistoryEntry) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| poisoned())?;
        let mut history = self.read_history()?;
        debug!(
            id = entry.id.as_str(),
            existing = history.len(),
            "Appending history entry"
        );
        push_front_capped(&mut history, entry);
        write_json_atomic(&self.history_path(), &history)?;
        Ok(())
    }

    async fn load_history(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        let mut history: Vec<HistoryEntry> = self.read_history()?.into();
        history.truncate(HISTORY_LIMIT);
        Ok(history)
    }
}
