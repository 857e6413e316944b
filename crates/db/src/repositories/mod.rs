use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use hrdesk_core::audit::{AuditEntry, AuditQuery, AuditSummary};
use hrdesk_core::domain::asset::{AssetId, EmployeeAsset};
use hrdesk_core::domain::justification::{JustificationStatus, TripJustification};
use hrdesk_core::domain::request::{Request, RequestId, RequestKind, RequestStatus};

pub mod asset;
pub mod audit;
mod codec;
pub mod justification;
pub mod memory;
pub mod request;

pub use asset::SqlAssetRepository;
pub use audit::SqlAuditRepository;
pub use justification::SqlJustificationRepository;
pub use memory::{
    InMemoryAssetRepository, InMemoryAuditRepository, InMemoryJustificationRepository,
    InMemoryRequestRepository,
};
pub use request::SqlRequestRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("`{id}` was modified concurrently")]
    Conflict { id: String },
    #[error("`{id}` does not exist")]
    NotFound { id: String },
    #[error("duplicate record: {0}")]
    Duplicate(String),
}

impl RepositoryError {
    /// Maps unique-constraint violations to [`RepositoryError::Duplicate`].
    pub(crate) fn from_insert(error: sqlx::Error, what: impl Into<String>) -> Self {
        let unique = error.as_database_error().is_some_and(|db| db.is_unique_violation());
        if unique {
            Self::Duplicate(what.into())
        } else {
            Self::Database(error)
        }
    }
}

/// Equality and range filters for request listings. Empty filter lists everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestFilter {
    pub requester_email: Option<String>,
    pub manager_email: Option<String>,
    pub statuses: Vec<RequestStatus>,
    pub kind: Option<RequestKind>,
    pub starts_on_or_after: Option<NaiveDate>,
    pub starts_on_or_before: Option<NaiveDate>,
}

impl RequestFilter {
    pub fn matches(&self, request: &Request) -> bool {
        let start = request.payload.date_range().map(|(start, _)| start);
        self.requester_email.as_deref().map_or(true, |email| request.requester_email == email)
            && self.manager_email.as_deref().map_or(true, |email| request.manager_email == email)
            && (self.statuses.is_empty() || self.statuses.contains(&request.status))
            && self.kind.map_or(true, |kind| request.kind() == kind)
            && self.starts_on_or_after.map_or(true, |bound| start.is_some_and(|s| s >= bound))
            && self.starts_on_or_before.map_or(true, |bound| start.is_some_and(|s| s <= bound))
    }
}

#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError>;

    async fn insert(&self, request: &Request) -> Result<(), RepositoryError>;

    /// Replaces the stored row with `next` only while it still holds
    /// `expected_status` at `expected_version`.
    ///
    /// Reminder task ids are not part of the write.
    async fn compare_and_set(
        &self,
        expected_status: RequestStatus,
        expected_version: u32,
        next: &Request,
    ) -> Result<(), RepositoryError>;

    async fn delete_if(
        &self,
        id: &RequestId,
        expected_status: RequestStatus,
        expected_version: u32,
    ) -> Result<(), RepositoryError>;

    async fn append_reminder_task(
        &self,
        id: &RequestId,
        task_id: &str,
    ) -> Result<(), RepositoryError>;

    async fn remove_reminder_tasks(
        &self,
        id: &RequestId,
        task_ids: &[String],
    ) -> Result<(), RepositoryError>;

    /// Newest first.
    async fn list(&self, filter: &RequestFilter) -> Result<Vec<Request>, RepositoryError>;
}

#[async_trait]
pub trait JustificationRepository: Send + Sync {
    async fn insert(&self, justification: &TripJustification) -> Result<(), RepositoryError>;

    async fn compare_and_set(
        &self,
        expected_status: JustificationStatus,
        next: &TripJustification,
    ) -> Result<(), RepositoryError>;

    async fn delete(&self, justification: &TripJustification) -> Result<(), RepositoryError>;

    /// Ordered by submission number.
    async fn list_for_trip(
        &self,
        trip_request_id: &RequestId,
    ) -> Result<Vec<TripJustification>, RepositoryError>;

    async fn latest_for_trip(
        &self,
        trip_request_id: &RequestId,
    ) -> Result<Option<TripJustification>, RepositoryError> {
        Ok(self.list_for_trip(trip_request_id).await?.pop())
    }
}

#[async_trait]
pub trait AssetRepository: Send + Sync {
    async fn insert(&self, asset: &EmployeeAsset) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &AssetId) -> Result<Option<EmployeeAsset>, RepositoryError>;
    async fn list_for_employee(&self, email: &str)
        -> Result<Vec<EmployeeAsset>, RepositoryError>;

    /// Replaces the stored record with `next` only while it is still at `expected_version`.
    async fn compare_and_set(
        &self,
        expected_version: u32,
        next: &EmployeeAsset,
    ) -> Result<(), RepositoryError>;

    async fn remove(&self, id: &AssetId) -> Result<(), RepositoryError>;
}

/// Append-only store. There is deliberately no update or delete.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> Result<(), RepositoryError>;

    /// Newest first, at most `query.limit` entries.
    async fn find(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, RepositoryError>;

    /// Oldest first, capped at [`hrdesk_core::audit::RESOURCE_TRAIL_LIMIT`].
    async fn resource_trail(
        &self,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<Vec<AuditEntry>, RepositoryError>;

    /// Counts over every matching entry; `query.limit` is ignored.
    async fn summarize(&self, query: &AuditQuery) -> Result<AuditSummary, RepositoryError>;
}
