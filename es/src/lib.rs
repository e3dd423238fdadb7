//! EntryStore - persistence for billable time entries
//!
//! The conversational flow only ever needs two remote operations: insert a
//! finished time entry, and find (or create) the profile that owns it. Both
//! sit behind the [`EntryStore`] trait so the flow can run against a hosted
//! PostgREST table or an in-process store.
//!
//! # Example
//!
//! ```ignore
//! use entrystore::{EntryStore, RestStore, RestStoreConfig};
//!
//! let store = RestStore::new(RestStoreConfig::new(url, key))?;
//! let profile = store.get_or_create_profile("me@example.com").await?;
//! store.insert(&entry).await?;
//! ```

mod error;
mod memory;
mod record;
mod rest;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use record::{NewTimeEntry, Profile};
pub use rest::{RestStore, RestStoreConfig};

use async_trait::async_trait;

/// Default table holding time entries
pub const DEFAULT_ENTRIES_TABLE: &str = "time_entries";

/// Default table holding user profiles
pub const DEFAULT_PROFILES_TABLE: &str = "profiles";

/// Remote store for time entries and their owners
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Insert a single time entry keyed by its id
    async fn insert(&self, entry: &NewTimeEntry) -> Result<(), StoreError>;

    /// Look up a profile by email, creating it when none exists
    async fn get_or_create_profile(&self, email: &str) -> Result<Profile, StoreError>;

    /// Entries owned by a profile, latest start first
    async fn list_entries(&self, user_id: &str) -> Result<Vec<NewTimeEntry>, StoreError>;
}
