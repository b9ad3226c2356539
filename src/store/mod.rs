//! Local cache store.
//!
//! Holds the last-synced copy of every entity-type collection, persisted
//! across restarts, plus a change-notification channel. Reads are
//! synchronous point-in-time snapshots. Writes always replace a whole
//! collection — callers patch the array they read and hand the full new
//! collection back — and fire one generic "data changed" notification with
//! no per-collection filtering: interested parties re-pull whatever they
//! care about.

mod sqlite;

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::model::Staff;

/// The named collections the store manages, one per entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Staff,
    Workstreams,
    Deliverables,
    PtoRequests,
    AuditLogs,
}

impl Collection {
    /// Stable persistence key for this collection.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Staff => "staff",
            Self::Workstreams => "workstreams",
            Self::Deliverables => "deliverables",
            Self::PtoRequests => "pto_requests",
            Self::AuditLogs => "audit_logs",
        }
    }
}

const CURRENT_USER_KEY: &str = "session:user";

/// Handle returned by [`Listeners::subscribe`]; pass it back to
/// unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A registry of notification callbacks.
///
/// Used for both the store's "data changed" channel and the sync engine's
/// "status changed" channel — the two are distinct instances so the UI can
/// subscribe to either independently.
pub struct Listeners<T> {
    next_id: AtomicU64,
    callbacks: Mutex<HashMap<u64, Box<dyn Fn(&T) + Send + Sync>>>,
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            callbacks: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> Listeners<T> {
    /// Register a callback; returns a handle for unsubscribing.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut callbacks) = self.callbacks.lock() {
            callbacks.insert(id, Box::new(callback));
        }
        SubscriptionId(id)
    }

    /// Remove a previously registered callback. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        if let Ok(mut callbacks) = self.callbacks.lock() {
            callbacks.remove(&id.0);
        }
    }

    /// Invoke every registered callback.
    pub fn emit(&self, value: &T) {
        if let Ok(callbacks) = self.callbacks.lock() {
            for callback in callbacks.values() {
                callback(value);
            }
        }
    }
}

/// The persisted local cache.
///
/// Process-wide and shared: wrap it in an `Arc` and hand clones to the
/// sync engine, the mutator, and the UI. There is no expiry; staleness is
/// bounded only by how often a sync pass runs.
pub struct CacheStore {
    conn: Mutex<rusqlite::Connection>,
    data_listeners: Listeners<()>,
}

impl CacheStore {
    /// Open (creating if needed) the cache at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(sqlite::open(path)?),
            data_listeners: Listeners::default(),
        })
    }

    /// Open an in-memory cache (tests and throwaway embedders).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(sqlite::open_in_memory()?),
            data_listeners: Listeners::default(),
        })
    }

    /// Read a snapshot of a collection. An absent collection is empty, not
    /// an error — persisted state is disposable.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure or if the stored JSON does not
    /// deserialize as `Vec<T>`.
    pub fn get<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        match sqlite::read_value(&conn, collection.key())? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    /// Replace a collection and broadcast the data-changed notification.
    ///
    /// # Errors
    ///
    /// Returns an error on serialization or database failure.
    pub fn set<T: Serialize>(&self, collection: Collection, items: &[T]) -> Result<()> {
        let json = serde_json::to_string(items)?;
        {
            let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            sqlite::write_value(&conn, collection.key(), &json)?;
        }
        self.data_listeners.emit(&());
        Ok(())
    }

    /// Replace a collection only if the new snapshot is non-empty.
    ///
    /// The sync pass uses this so a transient empty remote response never
    /// wipes a previously good cache. Returns whether a write happened.
    ///
    /// # Errors
    ///
    /// Returns an error on serialization or database failure.
    pub fn set_if_nonempty<T: Serialize>(
        &self,
        collection: Collection,
        items: &[T],
    ) -> Result<bool> {
        if items.is_empty() {
            return Ok(false);
        }
        self.set(collection, items)?;
        Ok(true)
    }

    /// Subscribe to the generic data-changed notification.
    pub fn subscribe(&self, callback: impl Fn() + Send + Sync + 'static) -> SubscriptionId {
        self.data_listeners.subscribe(move |_| callback())
    }

    /// Unsubscribe a data-changed callback.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.data_listeners.unsubscribe(id);
    }

    /// Read the persisted session user, if one is set.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure or malformed stored JSON.
    pub fn current_user(&self) -> Result<Option<Staff>> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        match sqlite::read_value(&conn, CURRENT_USER_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Persist (or clear) the session user.
    ///
    /// # Errors
    ///
    /// Returns an error on serialization or database failure.
    pub fn set_current_user(&self, user: Option<&Staff>) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        match user {
            Some(staff) => {
                sqlite::write_value(&conn, CURRENT_USER_KEY, &serde_json::to_string(staff)?)
            }
            None => sqlite::delete_value(&conn, CURRENT_USER_KEY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Deliverable, Staff};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn test_absent_collection_reads_empty() {
        let store = CacheStore::open_in_memory().unwrap();
        let staff: Vec<Staff> = store.get(Collection::Staff).unwrap();
        assert!(staff.is_empty());
    }

    #[test]
    fn test_set_replaces_whole_collection() {
        let store = CacheStore::open_in_memory().unwrap();
        let first = vec![Staff::new("Ann", "ann@x.com"), Staff::new("Bob", "bob@x.com")];
        store.set(Collection::Staff, &first).unwrap();

        let second = vec![Staff::new("Cam", "cam@x.com")];
        store.set(Collection::Staff, &second).unwrap();

        let cached: Vec<Staff> = store.get(Collection::Staff).unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].name, "Cam");
    }

    #[test]
    fn test_set_if_nonempty_skips_empty_snapshot() {
        let store = CacheStore::open_in_memory().unwrap();
        let deliverables = vec![Deliverable::new("t", "ws", "stf")];
        store.set(Collection::Deliverables, &deliverables).unwrap();

        let wrote = store
            .set_if_nonempty::<Deliverable>(Collection::Deliverables, &[])
            .unwrap();
        assert!(!wrote);

        let cached: Vec<Deliverable> = store.get(Collection::Deliverables).unwrap();
        assert_eq!(cached.len(), 1);
    }

    #[test]
    fn test_subscribe_fires_on_any_collection() {
        let store = CacheStore::open_in_memory().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let id = store.subscribe(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        store.set(Collection::Staff, &[Staff::new("Ann", "a@x.com")]).unwrap();
        store
            .set(Collection::Deliverables, &[Deliverable::new("t", "ws", "stf")])
            .unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);

        store.unsubscribe(id);
        store.set(Collection::Staff, &[Staff::new("Bob", "b@x.com")]).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cache.db");

        {
            let store = CacheStore::open(&path).unwrap();
            store.set(Collection::Staff, &[Staff::new("Ann", "a@x.com")]).unwrap();
        }

        let reopened = CacheStore::open(&path).unwrap();
        let cached: Vec<Staff> = reopened.get(Collection::Staff).unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].name, "Ann");
    }

    #[test]
    fn test_current_user_round_trip() {
        let store = CacheStore::open_in_memory().unwrap();
        assert!(store.current_user().unwrap().is_none());

        let user = Staff::new("Ann", "ann@x.com");
        store.set_current_user(Some(&user)).unwrap();
        assert_eq!(store.current_user().unwrap().unwrap().id, user.id);

        store.set_current_user(None).unwrap();
        assert!(store.current_user().unwrap().is_none());
    }
}
