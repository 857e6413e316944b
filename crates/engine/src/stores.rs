use std::sync::Arc;

use hrdesk_core::errors::ApplicationError;
use hrdesk_db::{
    AssetRepository, AuditRepository, DbPool, InMemoryAssetRepository, InMemoryAuditRepository,
    InMemoryJustificationRepository, InMemoryRequestRepository, JustificationRepository,
    RepositoryError, RequestRepository, SqlAssetRepository, SqlAuditRepository,
    SqlJustificationRepository, SqlRequestRepository,
};

/// The four repositories a [`crate::RequestService`] works against.
#[derive(Clone)]
pub struct Stores {
    pub requests: Arc<dyn RequestRepository>,
    pub justifications: Arc<dyn JustificationRepository>,
    pub assets: Arc<dyn AssetRepository>,
    pub audit: Arc<dyn AuditRepository>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            requests: Arc::new(InMemoryRequestRepository::default()),
            justifications: Arc::new(InMemoryJustificationRepository::default()),
            assets: Arc::new(InMemoryAssetRepository::default()),
            audit: Arc::new(InMemoryAuditRepository::default()),
        }
    }

    pub fn sqlite(pool: DbPool) -> Self {
        Self {
            requests: Arc::new(SqlRequestRepository::new(pool.clone())),
            justifications: Arc::new(SqlJustificationRepository::new(pool.clone())),
            assets: Arc::new(SqlAssetRepository::new(pool.clone())),
            audit: Arc::new(SqlAuditRepository::new(pool)),
        }
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditRepository>) -> Self {
        self.audit = audit;
        self
    }
}

pub(crate) fn storage_error(resource_type: &str, error: RepositoryError) -> ApplicationError {
    match error {
        RepositoryError::Conflict { id } => ApplicationError::Conflict {
            resource_id: id,
            message: "the record changed since it was loaded".to_string(),
        },
        RepositoryError::NotFound { id } => ApplicationError::not_found(resource_type, id),
        RepositoryError::Duplicate(what) => ApplicationError::Conflict {
            resource_id: what,
            message: "a matching record already exists".to_string(),
        },
        other => ApplicationError::StorageFailure(other.to_string()),
    }
}
