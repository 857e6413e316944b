use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::payload::RequestPayload;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    #[serde(rename = "timeoff")]
    TimeOff,
    Travel,
    Tool,
    Asset,
    Trip,
}

impl RequestKind {
    pub const ALL: [RequestKind; 5] =
        [Self::TimeOff, Self::Travel, Self::Tool, Self::Asset, Self::Trip];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TimeOff => "timeoff",
            Self::Travel => "travel",
            Self::Tool => "tool",
            Self::Asset => "asset",
            Self::Trip => "trip",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "timeoff" | "time_off" => Some(Self::TimeOff),
            "travel" => Some(Self::Travel),
            "tool" => Some(Self::Tool),
            "asset" => Some(Self::Asset),
            "trip" => Some(Self::Trip),
            _ => None,
        }
    }

    /// Audit `resource_type` for requests of this kind.
    pub fn resource_type(self) -> &'static str {
        match self {
            Self::TimeOff => "timeoff_request",
            Self::Travel => "travel_request",
            Self::Tool => "tool_request",
            Self::Asset => "asset_request",
            Self::Trip => "trip_request",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    ManagerApproved,
    Approved,
    Rejected,
    InProgress,
    JustificationSubmitted,
    JustificationRejected,
    Completed,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ManagerApproved => "manager_approved",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::InProgress => "in_progress",
            Self::JustificationSubmitted => "justification_submitted",
            Self::JustificationRejected => "justification_rejected",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "manager_approved" => Some(Self::ManagerApproved),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "in_progress" => Some(Self::InProgress),
            "justification_submitted" => Some(Self::JustificationSubmitted),
            "justification_rejected" => Some(Self::JustificationRejected),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// `Approved` only ends the lifecycle of non-trip requests.
    pub fn is_terminal_for(self, kind: RequestKind) -> bool {
        match self {
            Self::Rejected | Self::Completed => true,
            Self::Approved => kind != RequestKind::Trip,
            _ => false,
        }
    }

    pub fn is_awaiting_approval(self) -> bool {
        matches!(self, Self::Pending | Self::ManagerApproved)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStamp {
    pub by: String,
    pub at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub by: String,
    pub at: DateTime<Utc>,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub requester_email: String,
    pub manager_email: String,
    pub status: RequestStatus,
    pub payload: RequestPayload,
    pub manager_approval: Option<ApprovalStamp>,
    pub admin_approval: Option<ApprovalStamp>,
    pub rejection: Option<Rejection>,
    pub reminder_task_ids: Vec<String>,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Request {
    pub fn new_pending(
        requester_email: impl Into<String>,
        manager_email: impl Into<String>,
        payload: RequestPayload,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RequestId::generate(),
            requester_email: requester_email.into(),
            manager_email: manager_email.into(),
            status: RequestStatus::Pending,
            payload,
            manager_approval: None,
            admin_approval: None,
            rejection: None,
            reminder_task_ids: Vec::new(),
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn kind(&self) -> RequestKind {
        self.payload.kind()
    }

    pub fn resource_type(&self) -> &'static str {
        self.kind().resource_type()
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection.as_ref().map(|rejection| rejection.reason.as_str())
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal_for(self.kind())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::{Request, RequestKind, RequestStatus};
    use crate::domain::payload::{RequestPayload, TimeOffPayload, TimeOffType};

    fn time_off() -> RequestPayload {
        let start = NaiveDate::from_ymd_opt(2026, 3, 2).expect("date");
        RequestPayload::TimeOff(TimeOffPayload::new(start, start, TimeOffType::DayOff, None))
    }

    #[test]
    fn new_requests_start_pending_at_version_one() {
        let now = Utc::now();
        let request = Request::new_pending("ana@corp.test", "mo@corp.test", time_off(), now);

        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.version, 1);
        assert_eq!(request.created_at, request.updated_at);
        assert_eq!(request.kind(), RequestKind::TimeOff);
        assert_eq!(request.resource_type(), "timeoff_request");
        assert!(request.rejection_reason().is_none());
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [
            RequestStatus::Pending,
            RequestStatus::ManagerApproved,
            RequestStatus::Approved,
            RequestStatus::Rejected,
            RequestStatus::InProgress,
            RequestStatus::JustificationSubmitted,
            RequestStatus::JustificationRejected,
            RequestStatus::Completed,
        ] {
            assert_eq!(RequestStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RequestStatus::parse("archived"), None);
    }

    #[test]
    fn approved_is_terminal_except_for_trips() {
        assert!(RequestStatus::Approved.is_terminal_for(RequestKind::Tool));
        assert!(!RequestStatus::Approved.is_terminal_for(RequestKind::Trip));
        assert!(RequestStatus::Completed.is_terminal_for(RequestKind::Trip));
        assert!(!RequestStatus::ManagerApproved.is_terminal_for(RequestKind::Asset));
    }

    #[test]
    fn kind_parse_accepts_both_spellings() {
        assert_eq!(RequestKind::parse("time_off"), Some(RequestKind::TimeOff));
        assert_eq!(RequestKind::parse(" Trip "), Some(RequestKind::Trip));
        assert_eq!(RequestKind::parse("loan"), None);
    }
}
