//! Remote store contract.
//!
//! The remote is a tabular store reached over HTTP. This layer only needs
//! four operations per table, all trafficking in raw records — field-name
//! normalization happens after fetch, not here. The trait exists so the
//! sync engine and mutator can run against a mock in tests.

use serde::Deserialize;
use serde_json::Value;

use crate::config::RemoteConfig;
use crate::error::{Error, Result};
use crate::normalize::RawRecord;
use crate::store::Collection;

/// Remote table names, one per entity-type collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Staff,
    Workstreams,
    Deliverables,
    PtoRequests,
    AuditLogs,
}

impl Table {
    /// The table's name in the remote store.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Staff => "Staff",
            Self::Workstreams => "Workstreams",
            Self::Deliverables => "Deliverables",
            Self::PtoRequests => "PTORequests",
            Self::AuditLogs => "AuditLogs",
        }
    }

    /// The local cache collection this table syncs into.
    #[must_use]
    pub const fn collection(&self) -> Collection {
        match self {
            Self::Staff => Collection::Staff,
            Self::Workstreams => Collection::Workstreams,
            Self::Deliverables => Collection::Deliverables,
            Self::PtoRequests => Collection::PtoRequests,
            Self::AuditLogs => Collection::AuditLogs,
        }
    }
}

/// The four operations this layer needs from the remote store.
///
/// Async methods in RPITIT form; implement for the real HTTP client and
/// for test mocks. No cancellation: a call, once issued, runs to success
/// or failure, and timeouts are the transport's concern.
pub trait RemoteStore: Send + Sync {
    /// Fetch every record in a table.
    fn fetch_all(
        &self,
        table: Table,
    ) -> impl std::future::Future<Output = Result<Vec<RawRecord>>> + Send;

    /// Create a record; returns the record as the remote stored it.
    fn create(
        &self,
        table: Table,
        fields: RawRecord,
    ) -> impl std::future::Future<Output = Result<RawRecord>> + Send;

    /// Update a record by id; returns the record as the remote stored it.
    fn update(
        &self,
        table: Table,
        id: &str,
        fields: RawRecord,
    ) -> impl std::future::Future<Output = Result<RawRecord>> + Send;

    /// Delete a record by id.
    fn delete(
        &self,
        table: Table,
        id: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// HTTP implementation of the remote store contract.
pub struct HttpRemote {
    client: reqwest::Client,
    config: RemoteConfig,
}

/// Fetch responses arrive either as a bare array or wrapped in a
/// `{"records": [...]}` envelope depending on the remote's API version.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FetchResponse {
    Envelope { records: Vec<RawRecord> },
    Bare(Vec<RawRecord>),
}

impl FetchResponse {
    fn into_records(self) -> Vec<RawRecord> {
        match self {
            Self::Envelope { records } | Self::Bare(records) => records,
        }
    }
}

impl HttpRemote {
    /// Create a client for the given remote.
    #[must_use]
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn records_url(&self, table: Table) -> String {
        format!("{}/tables/{}/records", self.config.base_url, table.name())
    }

    fn record_url(&self, table: Table, id: &str) -> String {
        format!("{}/{id}", self.records_url(table))
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.config.api_key.is_empty() {
            req
        } else {
            req.bearer_auth(&self.config.api_key)
        }
    }

    async fn check(table: Table, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::RemoteRejected {
            table: table.name().to_string(),
            status: status.as_u16(),
            body,
        })
    }
}

impl RemoteStore for HttpRemote {
    async fn fetch_all(&self, table: Table) -> Result<Vec<RawRecord>> {
        let response = self
            .authorize(self.client.get(self.records_url(table)))
            .send()
            .await?;
        let parsed: FetchResponse = Self::check(table, response).await?.json().await?;
        Ok(parsed.into_records())
    }

    async fn create(&self, table: Table, fields: RawRecord) -> Result<RawRecord> {
        let response = self
            .authorize(self.client.post(self.records_url(table)))
            .json(&Value::Object(fields))
            .send()
            .await?;
        let record: RawRecord = Self::check(table, response).await?.json().await?;
        Ok(record)
    }

    async fn update(&self, table: Table, id: &str, fields: RawRecord) -> Result<RawRecord> {
        let response = self
            .authorize(self.client.patch(self.record_url(table, id)))
            .json(&Value::Object(fields))
            .send()
            .await?;
        let record: RawRecord = Self::check(table, response).await?.json().await?;
        Ok(record)
    }

    async fn delete(&self, table: Table, id: &str) -> Result<()> {
        let response = self
            .authorize(self.client.delete(self.record_url(table, id)))
            .send()
            .await?;
        Self::check(table, response).await?;
        Ok(())
    }
}
