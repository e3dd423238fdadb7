//! In-process entry store
//!
//! Used for offline sessions and tests. Inserts can be made to fail on demand
//! to exercise the flow's persistence-error path.

use std::cmp::Reverse;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use tracing::debug;
use uuid::Uuid;

use crate::{EntryStore, NewTimeEntry, Profile, StoreError};

#[derive(Debug, Default)]
struct Tables {
    entries: Vec<NewTimeEntry>,
    profiles: Vec<Profile>,
    /// Remaining inserts that should fail, with the message to report
    failures: Vec<String>,
}

/// Entry store that keeps rows in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    insert_attempts: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next insert fail with the given message
    ///
    /// Can be called repeatedly to queue several failures.
    pub fn fail_next_insert(&self, message: impl Into<String>) {
        let message = message.into();
        debug!(%message, "MemoryStore::fail_next_insert: called");
        self.lock().failures.push(message);
    }

    /// Snapshot of all stored entries in insertion order
    pub fn entries(&self) -> Vec<NewTimeEntry> {
        self.lock().entries.clone()
    }

    /// Snapshot of all stored profiles
    pub fn profiles(&self) -> Vec<Profile> {
        self.lock().profiles.clone()
    }

    /// Number of insert calls, including failed ones
    pub fn insert_attempts(&self) -> usize {
        self.insert_attempts.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn insert(&self, entry: &NewTimeEntry) -> Result<(), StoreError> {
        debug!(id = %entry.id, "MemoryStore::insert: called");
        self.insert_attempts.fetch_add(1, Ordering::SeqCst);

        let mut tables = self.lock();
        if !tables.failures.is_empty() {
            let message = tables.failures.remove(0);
            debug!(%message, "MemoryStore::insert: injected failure");
            return Err(StoreError::Unavailable(message));
        }
        if tables.entries.iter().any(|e| e.id == entry.id) {
            debug!("MemoryStore::insert: duplicate id");
            return Err(StoreError::Duplicate(entry.id));
        }

        tables.entries.push(entry.clone());
        Ok(())
    }

    async fn get_or_create_profile(&self, email: &str) -> Result<Profile, StoreError> {
        debug!(%email, "MemoryStore::get_or_create_profile: called");
        if email.trim().is_empty() {
            return Err(StoreError::InvalidRequest(
                "User email is required to create a profile".to_string(),
            ));
        }

        let mut tables = self.lock();
        if let Some(profile) = tables.profiles.iter().find(|p| p.email == email) {
            return Ok(profile.clone());
        }

        let profile = Profile {
            id: Uuid::now_v7().to_string(),
            email: email.to_string(),
        };
        tables.profiles.push(profile.clone());
        Ok(profile)
    }

    async fn list_entries(&self, user_id: &str) -> Result<Vec<NewTimeEntry>, StoreError> {
        debug!(%user_id, "MemoryStore::list_entries: called");
        if user_id.trim().is_empty() {
            return Err(StoreError::InvalidRequest("A profile is required to list entries".to_string()));
        }

        let mut entries: Vec<NewTimeEntry> = self
            .lock()
            .entries
            .iter()
            .filter(|e| e.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect();
        entries.sort_by_key(|e| Reverse(start_instant(e)));
        Ok(entries)
    }
}

/// Sort key for an entry's start; unparseable timestamps sort last
fn start_instant(entry: &NewTimeEntry) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(&entry.started_at).ok()
}
