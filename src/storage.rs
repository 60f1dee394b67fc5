// File: ./src/storage.rs
// Manages local file storage for saved events.
//
// Changes to StoredEvent or CalendarEventRecord serialization require
// incrementing LOCAL_STORAGE_VERSION below.
use crate::context::AppContext;
use crate::identity::UserId;
use crate::model::CalendarEventRecord;
use crate::model::dates;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// Version history:
// - v1: initial format
const LOCAL_STORAGE_VERSION: u32 = 1;

/// A record as persisted for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub id: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub record: CalendarEventRecord,
}

/// Persistence contract. The hosted backend implements the same shape.
pub trait EventStore {
    /// Stores `records` for `user` in order and returns the stored rows.
    fn insert(
        &self,
        user: &UserId,
        records: &[CalendarEventRecord],
        now: DateTime<Utc>,
    ) -> Result<Vec<StoredEvent>>;

    /// All events of `user`, sorted by event date then insertion time.
    fn list(&self, user: &UserId) -> Result<Vec<StoredEvent>>;
}

#[derive(Serialize, Deserialize)]
struct LocalStorageData {
    #[serde(default)]
    version: u32,
    events: Vec<StoredEvent>,
}

/// One JSON file per user under the context's events directory.
#[derive(Debug)]
pub struct LocalStorage<'a> {
    ctx: &'a dyn AppContext,
}

impl<'a> LocalStorage<'a> {
    pub fn new(ctx: &'a dyn AppContext) -> Self {
        Self { ctx }
    }

    pub fn path_for_user(&self, user: &UserId) -> Result<PathBuf> {
        let stem = user.file_stem();
        if stem.is_empty() {
            anyhow::bail!("Cannot store events for an empty user id");
        }
        Ok(self.ctx.get_events_dir()?.join(format!("{}.json", stem)))
    }

    // events/<stem>.json -> events/<stem>.json.lock
    fn get_lock_path(file_path: &Path) -> PathBuf {
        let mut name = file_path.as_os_str().to_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Runs `f` while holding an exclusive lock on a sidecar `.lock` file.
    pub fn with_lock<F, T>(file_path: &Path, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let lock_path = Self::get_lock_path(file_path);
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        file.lock_exclusive()?;
        let result = f();
        file.unlock()?;
        result
    }

    /// Atomic write: Write to .tmp file then rename
    pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<()> {
        let path = path.as_ref();
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(tmp_path, path)?;
        Ok(())
    }

    // Caller must hold the lock.
    fn read_unlocked(path: &Path) -> Result<Vec<StoredEvent>> {
        if !path.exists() {
            return Ok(vec![]);
        }
        let json = fs::read_to_string(path)?;
        let data: LocalStorageData = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse event file {:?}", path))?;
        if data.version > LOCAL_STORAGE_VERSION {
            anyhow::bail!(
                "Event file {:?} has version {}, newer than supported v{}",
                path,
                data.version,
                LOCAL_STORAGE_VERSION
            );
        }
        Ok(data.events)
    }

    fn write_unlocked(path: &Path, events: Vec<StoredEvent>) -> Result<()> {
        let data = LocalStorageData {
            version: LOCAL_STORAGE_VERSION,
            events,
        };
        let json = serde_json::to_string_pretty(&data)?;
        Self::atomic_write(path, json)
    }
}

impl EventStore for LocalStorage<'_> {
    fn insert(
        &self,
        user: &UserId,
        records: &[CalendarEventRecord],
        now: DateTime<Utc>,
    ) -> Result<Vec<StoredEvent>> {
        let path = self.path_for_user(user)?;
        let inserted: Vec<StoredEvent> = records
            .iter()
            .map(|record| {
                let mut record = record.clone();
                record.date = dates::repair_date(&record.date, now);
                StoredEvent {
                    id: uuid::Uuid::new_v4().to_string(),
                    user_id: user.clone(),
                    created_at: now,
                    record,
                }
            })
            .collect();

        Self::with_lock(&path, || {
            let mut events = Self::read_unlocked(&path)?;
            events.extend(inserted.iter().cloned());
            Self::write_unlocked(&path, events)
        })?;

        log::info!("Saved {} event(s) for {}", inserted.len(), user);
        Ok(inserted)
    }

    fn list(&self, user: &UserId) -> Result<Vec<StoredEvent>> {
        let path = self.path_for_user(user)?;
        let mut events: Vec<StoredEvent> = Self::with_lock(&path, || Self::read_unlocked(&path))?
            .into_iter()
            .filter(|e| e.user_id == *user)
            .collect();
        // Dates were repaired on insert, so a failed parse only happens for hand-edited files.
        events.sort_by_key(|e| (e.record.parsed_date(), e.created_at));
        Ok(events)
    }
}
