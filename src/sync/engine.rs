//! The sync engine: one ordered pull-normalize-resolve-cache pass.

use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::model::{assign_colors, Staff};
use crate::normalize;
use crate::remote::{RemoteStore, Table};
use crate::resolve::{StaffDirectory, WorkstreamDirectory};
use crate::store::{CacheStore, Listeners, SubscriptionId};

use super::{ConnectionState, SyncReport, SyncStatus};

/// Pulls the remote collections in dependency order and publishes them
/// into the cache.
///
/// The order is mandatory: staff first (everything references them), then
/// workstreams (which need the staff maps for their leads), then a staff
/// second pass (staff and workstreams mutually reference each other), then
/// everything else using both directories. Pulls are sequential by design
/// — later pulls consume lookup maps built by earlier ones.
pub struct SyncEngine<R: RemoteStore> {
    store: Arc<CacheStore>,
    remote: R,
    status: Mutex<SyncStatus>,
    status_listeners: Listeners<SyncStatus>,
}

impl<R: RemoteStore> SyncEngine<R> {
    /// Create an engine over a shared cache and a remote client.
    #[must_use]
    pub fn new(store: Arc<CacheStore>, remote: R) -> Self {
        Self {
            store,
            remote,
            status: Mutex::new(SyncStatus::default()),
            status_listeners: Listeners::default(),
        }
    }

    /// Snapshot of the current status surface.
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        self.status
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Subscribe to status-changed notifications (distinct from the
    /// store's data-changed channel).
    pub fn subscribe_status(
        &self,
        callback: impl Fn(&SyncStatus) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.status_listeners.subscribe(callback)
    }

    /// Unsubscribe a status callback.
    pub fn unsubscribe_status(&self, id: SubscriptionId) {
        self.status_listeners.unsubscribe(id);
    }

    fn transition(&self, state: ConnectionState, error: Option<String>) {
        let snapshot = {
            let mut status = self
                .status
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            status.state = state;
            status.connected = state == ConnectionState::Connected;
            status.error = error;
            if state == ConnectionState::Connected {
                status.last_sync = Some(chrono::Utc::now().timestamp_millis());
            }
            // Error retains last_sync from the previous successful pass.
            status.clone()
        };
        self.status_listeners.emit(&snapshot);
    }

    /// Run one full sync pass.
    ///
    /// Each collection's pull is independent: a failure is recorded and
    /// the pass continues with the previously cached snapshot of that
    /// collection, so earlier successes are never rolled back. An empty
    /// remote response never overwrites a populated cache.
    pub async fn sync_all(&self) -> SyncReport {
        self.transition(ConnectionState::Connecting, None);
        let mut report = SyncReport::default();

        // 1. Staff, with references still raw. On failure fall back to the
        // cached snapshot so the directories for later pulls still exist.
        let mut staff: Vec<Staff> = match self.pull(Table::Staff, &mut report).await {
            Some(records) => records.iter().map(normalize::staff_from_record).collect(),
            None => self.cached(Table::Staff),
        };
        if staff.is_empty() {
            staff = self.cached(Table::Staff);
        }
        let staff_dir = StaffDirectory::new(&staff);

        // 2. Workstreams: leads resolve against the staff maps, colors are
        // assigned by name-sorted position.
        let mut workstreams = match self.pull(Table::Workstreams, &mut report).await {
            Some(records) => {
                let mut list: Vec<_> = records
                    .iter()
                    .map(|r| normalize::workstream_from_record(r, &staff_dir))
                    .collect();
                assign_colors(&mut list);
                list
            }
            None => self.cached(Table::Workstreams),
        };
        if workstreams.is_empty() {
            workstreams = self.cached(Table::Workstreams);
        }
        self.publish(Table::Workstreams, &workstreams, &mut report);
        let workstream_dir = WorkstreamDirectory::new(&workstreams);

        // 3. Staff second pass: supervisors and workstream memberships can
        // only resolve now that both directories exist.
        resolve_staff_refs(&mut staff, &staff_dir, &workstream_dir);
        self.publish(Table::Staff, &staff, &mut report);

        // 4. Remaining collections, each independent of the others.
        if let Some(records) = self.pull(Table::Deliverables, &mut report).await {
            let deliverables: Vec<_> = records
                .iter()
                .map(|r| normalize::deliverable_from_record(r, &staff_dir, &workstream_dir))
                .collect();
            self.publish(Table::Deliverables, &deliverables, &mut report);
        }

        if let Some(records) = self.pull(Table::PtoRequests, &mut report).await {
            let requests: Vec<_> = records
                .iter()
                .map(|r| normalize::pto_from_record(r, &staff_dir))
                .collect();
            self.publish(Table::PtoRequests, &requests, &mut report);
        }

        if let Some(records) = self.pull(Table::AuditLogs, &mut report).await {
            let logs: Vec<_> = records.iter().map(normalize::audit_from_record).collect();
            self.publish(Table::AuditLogs, &logs, &mut report);
        }

        if report.any_success() {
            self.transition(ConnectionState::Connected, report.failure_summary());
        } else {
            self.transition(
                ConnectionState::Error,
                report
                    .failure_summary()
                    .or_else(|| Some("no collections pulled".to_string())),
            );
        }

        report
    }

    /// Fetch one table, recording the outcome. `None` means the pull
    /// failed; the caller continues with cached data.
    async fn pull(&self, table: Table, report: &mut SyncReport) -> Option<Vec<normalize::RawRecord>> {
        match self.remote.fetch_all(table).await {
            Ok(records) => {
                info!(table = table.name(), count = records.len(), "pulled collection");
                report.pulled.push((table.name(), records.len()));
                Some(records)
            }
            Err(e) => {
                warn!(table = table.name(), error = %e, "pull failed, keeping cached data");
                report.failures.push((table.name(), e.to_string()));
                None
            }
        }
    }

    /// Write a collection into the cache, skipping empty snapshots so a
    /// transient empty response never wipes good data.
    fn publish<T: serde::Serialize>(&self, table: Table, items: &[T], report: &mut SyncReport) {
        match self.store.set_if_nonempty(table.collection(), items) {
            Ok(_) => {}
            Err(e) => {
                warn!(table = table.name(), error = %e, "cache write failed");
                report.failures.push((table.name(), e.to_string()));
            }
        }
    }

    /// Last cached snapshot of a collection; empty on any failure.
    fn cached<T: serde::de::DeserializeOwned>(&self, table: Table) -> Vec<T> {
        self.store.get(table.collection()).unwrap_or_default()
    }
}

/// Re-resolve staff cross-references once both directories exist.
///
/// Supervisors resolve against the staff maps (a staff member referencing
/// another), workstream memberships against the workstream maps. Misses
/// keep the raw token, as everywhere else.
fn resolve_staff_refs(
    staff: &mut [Staff],
    staff_dir: &StaffDirectory,
    workstream_dir: &WorkstreamDirectory,
) {
    for member in staff {
        if let Some(raw) = member.supervisor_id.take() {
            let resolved = staff_dir.resolve_str(&raw).into_id();
            member.supervisor_id = if resolved.is_empty() { None } else { Some(resolved) };
        }
        member.workstream_ids = member
            .workstream_ids
            .iter()
            .map(|raw| workstream_dir.resolve_str(raw).into_id())
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::Deliverable;
    use crate::normalize::RawRecord;
    use crate::store::Collection;
    use serde_json::json;
    use std::collections::{HashMap, HashSet};

    /// In-memory remote: canned records per table, with failure injection.
    struct MockRemote {
        tables: HashMap<&'static str, Vec<RawRecord>>,
        failing: HashSet<&'static str>,
    }

    impl MockRemote {
        fn new() -> Self {
            Self {
                tables: HashMap::new(),
                failing: HashSet::new(),
            }
        }

        fn with_table(mut self, table: Table, records: Vec<serde_json::Value>) -> Self {
            let records = records
                .into_iter()
                .map(|v| v.as_object().cloned().expect("mock records are objects"))
                .collect();
            self.tables.insert(table.name(), records);
            self
        }

        fn failing(mut self, table: Table) -> Self {
            self.failing.insert(table.name());
            self
        }
    }

    impl RemoteStore for MockRemote {
        async fn fetch_all(&self, table: Table) -> crate::Result<Vec<RawRecord>> {
            if self.failing.contains(table.name()) {
                return Err(Error::RemoteRejected {
                    table: table.name().to_string(),
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            Ok(self.tables.get(table.name()).cloned().unwrap_or_default())
        }

        async fn create(&self, _table: Table, fields: RawRecord) -> crate::Result<RawRecord> {
            Ok(fields)
        }

        async fn update(&self, _table: Table, _id: &str, fields: RawRecord) -> crate::Result<RawRecord> {
            Ok(fields)
        }

        async fn delete(&self, _table: Table, _id: &str) -> crate::Result<()> {
            Ok(())
        }
    }

    fn seeded_remote() -> MockRemote {
        MockRemote::new()
            .with_table(
                Table::Staff,
                vec![
                    json!({
                        "id": "s1",
                        "name": "Ann Lee (Contractor)",
                        "email": "A@X.com",
                        "Supervisor": "boss@x.com",
                        "Workstreams": "Audit; Tax"
                    }),
                    json!({"id": "s2", "name": "Boss Person", "email": "boss@x.com"}),
                ],
            )
            .with_table(
                Table::Workstreams,
                vec![
                    json!({"id": "w2", "name": "Tax", "lead": "boss@x.com"}),
                    json!({"id": "w1", "name": "Audit", "lead": "ann lee"}),
                ],
            )
            .with_table(
                Table::Deliverables,
                vec![json!({"id": "d1", "title": "Filing", "Owner": "ann lee", "Workstream": "Audit"})],
            )
    }

    #[tokio::test]
    async fn test_sync_resolves_in_dependency_order() {
        let store = Arc::new(CacheStore::open_in_memory().unwrap());
        let engine = SyncEngine::new(Arc::clone(&store), seeded_remote());

        engine.sync_all().await;

        // Workstream leads resolved via the staff maps built in step 1,
        // including the name-normalized "ann lee" form.
        let workstreams: Vec<crate::model::Workstream> =
            store.get(Collection::Workstreams).unwrap();
        let audit = workstreams.iter().find(|w| w.name == "Audit").unwrap();
        assert_eq!(audit.lead_id, "s1");

        // Staff memberships resolved in the second pass, after the
        // workstream directory exists.
        let staff: Vec<Staff> = store.get(Collection::Staff).unwrap();
        let ann = staff.iter().find(|s| s.id == "s1").unwrap();
        assert_eq!(ann.supervisor_id.as_deref(), Some("s2"));
        assert_eq!(ann.workstream_ids, vec!["w1", "w2"]);

        // Deliverable references resolved via both directories.
        let deliverables: Vec<Deliverable> = store.get(Collection::Deliverables).unwrap();
        assert_eq!(deliverables[0].owner_id, "s1");
        assert_eq!(deliverables[0].workstream_id, "w1");
    }

    #[tokio::test]
    async fn test_colors_follow_name_sorted_order() {
        let store = Arc::new(CacheStore::open_in_memory().unwrap());
        let engine = SyncEngine::new(Arc::clone(&store), seeded_remote());
        engine.sync_all().await;

        let workstreams: Vec<crate::model::Workstream> =
            store.get(Collection::Workstreams).unwrap();
        // Remote listed Tax before Audit; sorted order wins.
        assert_eq!(workstreams[0].name, "Audit");
        assert_eq!(workstreams[0].color, crate::model::palette()[0]);
        assert_eq!(workstreams[1].name, "Tax");
        assert_eq!(workstreams[1].color, crate::model::palette()[1]);
    }

    #[tokio::test]
    async fn test_empty_response_does_not_wipe_cache() {
        let store = Arc::new(CacheStore::open_in_memory().unwrap());
        let previous: Vec<Deliverable> = (0..10)
            .map(|i| Deliverable::new(&format!("d{i}"), "w1", "s1"))
            .collect();
        store.set(Collection::Deliverables, &previous).unwrap();

        // Remote answers every pull, but Deliverables comes back empty.
        let remote = seeded_remote().with_table(Table::Deliverables, vec![]);
        let engine = SyncEngine::new(Arc::clone(&store), remote);
        engine.sync_all().await;

        let cached: Vec<Deliverable> = store.get(Collection::Deliverables).unwrap();
        assert_eq!(cached.len(), 10);
    }

    #[tokio::test]
    async fn test_one_failed_pull_does_not_abort_others() {
        let store = Arc::new(CacheStore::open_in_memory().unwrap());
        let remote = seeded_remote().failing(Table::Deliverables);
        let engine = SyncEngine::new(Arc::clone(&store), remote);

        let report = engine.sync_all().await;

        assert!(report.any_success());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "Deliverables");

        // Staff and workstreams still landed.
        let staff: Vec<Staff> = store.get(Collection::Staff).unwrap();
        assert_eq!(staff.len(), 2);

        // Connected, with the failure surfaced on the status.
        let status = engine.status();
        assert!(status.connected);
        assert!(status.error.unwrap().contains("Deliverables"));
        assert!(status.last_sync.is_some());
    }

    #[tokio::test]
    async fn test_total_failure_keeps_last_sync() {
        let store = Arc::new(CacheStore::open_in_memory().unwrap());
        let engine = SyncEngine::new(Arc::clone(&store), seeded_remote());
        engine.sync_all().await;
        let first_sync = engine.status().last_sync.unwrap();

        let dead = MockRemote::new()
            .failing(Table::Staff)
            .failing(Table::Workstreams)
            .failing(Table::Deliverables)
            .failing(Table::PtoRequests)
            .failing(Table::AuditLogs);
        let engine2 = SyncEngine::new(Arc::clone(&store), dead);
        // Seed the second engine's status with a successful pass first.
        {
            let mut status = engine2.status.lock().unwrap();
            status.last_sync = Some(first_sync);
        }
        engine2.sync_all().await;

        let status = engine2.status();
        assert_eq!(status.state, ConnectionState::Error);
        assert!(!status.connected);
        assert!(status.error.is_some());
        // Error retains the previous successful sync timestamp.
        assert_eq!(status.last_sync, Some(first_sync));

        // Cached data from the earlier pass is still there.
        let staff: Vec<Staff> = store.get(Collection::Staff).unwrap();
        assert_eq!(staff.len(), 2);
    }

    #[tokio::test]
    async fn test_status_transitions_are_broadcast() {
        let store = Arc::new(CacheStore::open_in_memory().unwrap());
        let engine = SyncEngine::new(store, seeded_remote());

        let states = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&states);
        let id = engine.subscribe_status(move |status| {
            sink.lock().unwrap().push(status.state);
        });

        engine.sync_all().await;
        engine.unsubscribe_status(id);
        engine.sync_all().await;

        let seen = states.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![ConnectionState::Connecting, ConnectionState::Connected]
        );
    }
}
