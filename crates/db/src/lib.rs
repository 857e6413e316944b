pub mod connection;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_from_config, connect_with_settings, DbPool};
pub use repositories::{
    AssetRepository, AuditRepository, InMemoryAssetRepository, InMemoryAuditRepository,
    InMemoryJustificationRepository, InMemoryRequestRepository, JustificationRepository,
    RepositoryError, RequestFilter, RequestRepository, SqlAssetRepository, SqlAuditRepository,
    SqlJustificationRepository, SqlRequestRepository,
};
