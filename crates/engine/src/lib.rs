pub mod inventory;
pub mod notifier;
pub mod queries;
pub mod service;
pub mod stores;
pub mod trip;

pub use inventory::ASSET_RESOURCE;
pub use notifier::{NotificationJob, NotificationQueue, RetryPolicy};
pub use queries::AwaitingAction;
pub use service::{RequestService, ServiceSettings};
pub use stores::Stores;
pub use trip::TripUpdate;
