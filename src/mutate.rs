//! Optimistic mutation protocol.
//!
//! A local edit is applied to the cache immediately (the UI updates
//! instantly), then the authoritative remote write runs asynchronously. On
//! remote failure the mutated entity is restored to its exact pre-mutation
//! value and the error is returned to the caller — no silent retry. The
//! revert re-reads the collection and patches that one entity, so mutations
//! confirmed on other ids while the remote write was in flight stay intact.
//!
//! Mutations are serialized per entity id: without that, two overlapping
//! edits to the same entity could capture each other's unconfirmed state
//! as their "prior value" and revert incorrectly. Rapid consecutive edits
//! (drag-and-drop reordering) are the primary trigger.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::{Error, Result};
use crate::model::AuditLog;
use crate::normalize::RawRecord;
use crate::remote::{RemoteStore, Table};
use crate::store::{CacheStore, Collection};

/// An entity the optimistic protocol can write.
///
/// Not implemented for [`AuditLog`]: audit entries are append-only and go
/// through [`Mutator::append_audit`] instead.
pub trait Mutable: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// The remote table this entity type lives in.
    const TABLE: Table;

    /// Stable entity id.
    fn id(&self) -> &str;

    /// Stamp the update timestamp, for entity types that carry one.
    fn touch(&mut self) {}
}

impl Mutable for crate::model::Staff {
    const TABLE: Table = Table::Staff;
    fn id(&self) -> &str {
        &self.id
    }
}

impl Mutable for crate::model::Workstream {
    const TABLE: Table = Table::Workstreams;
    fn id(&self) -> &str {
        &self.id
    }
}

impl Mutable for crate::model::Deliverable {
    const TABLE: Table = Table::Deliverables;
    fn id(&self) -> &str {
        &self.id
    }
    fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().timestamp_millis();
    }
}

impl Mutable for crate::model::PtoRequest {
    const TABLE: Table = Table::PtoRequests;
    fn id(&self) -> &str {
        &self.id
    }
}

/// Applies local mutations optimistically and reconciles them against the
/// remote store.
pub struct Mutator<R: RemoteStore> {
    store: Arc<CacheStore>,
    remote: R,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl<R: RemoteStore> Mutator<R> {
    /// Create a mutator over a shared cache and a remote client.
    #[must_use]
    pub fn new(store: Arc<CacheStore>, remote: R) -> Self {
        Self {
            store,
            remote,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Per-entity-id mutation lock. Overlapping mutations on the same id
    /// queue behind each other so snapshot/revert pairs never interleave.
    fn lock_for(&self, id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(locks.entry(id.to_string()).or_default())
    }

    /// Drop a lock-table entry once no mutation holds it, so the table
    /// does not grow with every id ever mutated. A strong count of 1 means
    /// only the table itself still holds the `Arc`; taking the table mutex
    /// first makes that check race-free against `lock_for`.
    fn evict_idle_lock(&self, id: &str) {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if locks.get(id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(id);
        }
    }

    /// Create an entity: cache it immediately, then push to the remote.
    /// If the remote create fails, the entity is removed from the cache
    /// again and the error returned.
    ///
    /// # Errors
    ///
    /// Returns the remote error on a failed create, or a cache error.
    pub async fn create<T: Mutable>(&self, entity: T) -> Result<T> {
        let id = entity.id().to_string();
        let lock = self.lock_for(&id);
        let guard = lock.lock().await;
        let result = self.apply_create(entity).await;
        drop(guard);
        drop(lock);
        self.evict_idle_lock(&id);
        result
    }

    async fn apply_create<T: Mutable>(&self, entity: T) -> Result<T> {
        let collection = T::TABLE.collection();
        let mut next: Vec<T> = self.store.get(collection)?;
        next.push(entity.clone());
        self.store.set(collection, &next)?;

        match self.remote.create(T::TABLE, to_record(&entity)?).await {
            Ok(_) => {
                self.append_audit("create", collection, entity.id(), "").await;
                Ok(entity)
            }
            Err(e) => {
                warn!(id = entity.id(), error = %e, "remote create failed, reverting");
                self.remove_entity::<T>(entity.id())?;
                Err(e)
            }
        }
    }

    /// Update an entity in place: the cached collection is replaced with a
    /// copy holding the new value, then the remote write runs. On failure
    /// the entity is restored to its exact prior value — including fields
    /// the mutation never touched — while every other entity keeps its
    /// current state.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the id is not cached, the remote error
    /// on a failed write, or a cache error.
    pub async fn update<T: Mutable>(&self, updated: T) -> Result<T> {
        let id = updated.id().to_string();
        let lock = self.lock_for(&id);
        let guard = lock.lock().await;
        let result = self.apply_update(updated).await;
        drop(guard);
        drop(lock);
        self.evict_idle_lock(&id);
        result
    }

    async fn apply_update<T: Mutable>(&self, updated: T) -> Result<T> {
        let collection = T::TABLE.collection();
        let current: Vec<T> = self.store.get(collection)?;
        let index = current
            .iter()
            .position(|e| e.id() == updated.id())
            .ok_or_else(|| Error::NotFound {
                collection: collection.key().to_string(),
                id: updated.id().to_string(),
            })?;
        let prior = current[index].clone();

        let mut entity = updated;
        entity.touch();

        let mut next = current;
        next[index] = entity.clone();
        self.store.set(collection, &next)?;

        match self
            .remote
            .update(T::TABLE, entity.id(), to_record(&entity)?)
            .await
        {
            Ok(_) => {
                self.append_audit("update", collection, entity.id(), "").await;
                Ok(entity)
            }
            Err(e) => {
                warn!(id = entity.id(), error = %e, "remote update failed, reverting");
                self.restore_entity(&prior, index)?;
                Err(e)
            }
        }
    }

    /// Delete an entity: remove it from the cache immediately, then issue
    /// the remote delete. On failure the entity is reinserted — it only
    /// stays gone when the remote delete succeeded.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the id is not cached, the remote error
    /// on a failed delete, or a cache error.
    pub async fn delete<T: Mutable>(&self, id: &str) -> Result<()> {
        let lock = self.lock_for(id);
        let guard = lock.lock().await;
        let result = self.apply_delete::<T>(id).await;
        drop(guard);
        drop(lock);
        self.evict_idle_lock(id);
        result
    }

    async fn apply_delete<T: Mutable>(&self, id: &str) -> Result<()> {
        let collection = T::TABLE.collection();
        let current: Vec<T> = self.store.get(collection)?;
        let index = current
            .iter()
            .position(|e| e.id() == id)
            .ok_or_else(|| Error::NotFound {
                collection: collection.key().to_string(),
                id: id.to_string(),
            })?;
        let removed = current[index].clone();

        let mut next = current;
        next.remove(index);
        self.store.set(collection, &next)?;

        match self.remote.delete(T::TABLE, id).await {
            Ok(()) => {
                self.append_audit("delete", collection, id, "").await;
                Ok(())
            }
            Err(e) => {
                warn!(id, error = %e, "remote delete failed, reverting");
                self.restore_entity(&removed, index)?;
                Err(e)
            }
        }
    }

    /// Put one entity's prior value back into the collection. The
    /// collection is re-read first so mutations confirmed on other ids
    /// while the remote write was in flight stay intact; only the reverted
    /// entity changes. The per-id lock guarantees nothing else touched this
    /// id in the meantime.
    fn restore_entity<T: Mutable>(&self, prior: &T, index: usize) -> Result<()> {
        let collection = T::TABLE.collection();
        let mut current: Vec<T> = self.store.get(collection)?;
        match current.iter().position(|e| e.id() == prior.id()) {
            Some(i) => current[i] = prior.clone(),
            None => current.insert(index.min(current.len()), prior.clone()),
        }
        self.store.set(collection, &current)
    }

    /// Remove a failed optimistic create from the current collection,
    /// leaving every other entity as it is now.
    fn remove_entity<T: Mutable>(&self, id: &str) -> Result<()> {
        let collection = T::TABLE.collection();
        let mut current: Vec<T> = self.store.get(collection)?;
        current.retain(|e| e.id() != id);
        self.store.set(collection, &current)
    }

    /// Append an audit entry for a confirmed mutation, attributed to the
    /// persisted session user. Best-effort: a failed audit write is logged
    /// and never fails or reverts the mutation it describes.
    async fn append_audit(&self, action: &str, collection: Collection, entity_id: &str, details: &str) {
        let user = match self.store.current_user() {
            Ok(Some(user)) => user,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "could not read session user for audit entry");
                return;
            }
        };

        let entry = AuditLog::new(&user.id, &user.name, action, collection.key())
            .with_entity_id(entity_id)
            .with_details(details);

        let mut logs: Vec<AuditLog> = self
            .store
            .get(Collection::AuditLogs)
            .unwrap_or_default();
        logs.push(entry.clone());
        if let Err(e) = self.store.set(Collection::AuditLogs, &logs) {
            warn!(error = %e, "audit cache write failed");
        }

        match to_record(&entry) {
            Ok(fields) => {
                if let Err(e) = self.remote.create(Table::AuditLogs, fields).await {
                    warn!(error = %e, "audit remote write failed");
                }
            }
            Err(e) => warn!(error = %e, "audit entry did not serialize"),
        }
    }
}

/// Serialize an entity into the raw-record shape remote writes expect.
fn to_record<T: Serialize>(entity: &T) -> Result<RawRecord> {
    match serde_json::to_value(entity)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(Error::Json(serde::ser::Error::custom(format!(
            "entity serialized to non-object JSON: {other}"
        )))),
    }
}
