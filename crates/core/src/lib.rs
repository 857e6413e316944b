pub mod audit;
pub mod calendar;
pub mod clock;
pub mod config;
pub mod directory;
pub mod domain;
pub mod errors;
pub mod notify;
pub mod workflow;

pub use audit::{AuditAction, AuditEntry, AuditEntryId, AuditQuery, AuditSummary};
pub use calendar::{count_working_days, Holiday, HolidayCalendar, RegionInfo};
pub use clock::{Clock, MonotonicClock};
pub use directory::{Directory, StaticDirectory};
pub use domain::asset::{AssetChange, AssetId, AssetStatus, AssetUpdate, EmployeeAsset, NewAsset};
pub use domain::justification::{
    JustificationId, JustificationReview, JustificationStatus, JustificationSubmission,
    TripJustification,
};
pub use domain::payload::RequestPayload;
pub use domain::request::{Request, RequestId, RequestKind, RequestStatus};
pub use errors::{ApplicationError, DomainError, InterfaceError, ValidationError};
pub use notify::{NotificationDispatcher, NotificationError, NotificationPayload, ReminderTaskId};
pub use workflow::{Actor, TransitionError, WorkflowCommand, WorkflowEngine};
