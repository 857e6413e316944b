use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default page size for [`AuditQuery`].
pub const DEFAULT_FIND_LIMIT: usize = 100;
/// Upper bound on the entries returned for a single resource trail.
pub const RESOURCE_TRAIL_LIMIT: usize = 1000;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditEntryId(pub String);

impl AuditEntryId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    ApproveManager,
    ApproveAdmin,
    Reject,
    StartTrip,
    JustificationSubmit,
    JustificationApprove,
    JustificationReject,
}

impl AuditAction {
    pub const ALL: [AuditAction; 10] = [
        Self::Create,
        Self::Update,
        Self::Delete,
        Self::ApproveManager,
        Self::ApproveAdmin,
        Self::Reject,
        Self::StartTrip,
        Self::JustificationSubmit,
        Self::JustificationApprove,
        Self::JustificationReject,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::ApproveManager => "approve_manager",
            Self::ApproveAdmin => "approve_admin",
            Self::Reject => "reject",
            Self::StartTrip => "start_trip",
            Self::JustificationSubmit => "justification_submit",
            Self::JustificationApprove => "justification_approve",
            Self::JustificationReject => "justification_reject",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.as_str() == value)
    }

    fn verb(self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Update => "updated",
            Self::Delete => "deleted",
            Self::ApproveManager => "approved (manager)",
            Self::ApproveAdmin => "approved (admin)",
            Self::Reject => "rejected",
            Self::StartTrip => "started",
            Self::JustificationSubmit => "submitted a justification for",
            Self::JustificationApprove => "approved the justification for",
            Self::JustificationReject => "rejected the justification for",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only record of a state-changing operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub actor_email: String,
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: String,
    pub details: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        actor_email: impl Into<String>,
        action: AuditAction,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditEntryId::generate(),
            actor_email: actor_email.into(),
            action,
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            details: BTreeMap::new(),
            timestamp,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Human readable one-liner, e.g. `ana@corp.test rejected timeoff_request 42: overlap`.
    pub fn display_message(&self) -> String {
        let mut message = format!(
            "{} {} {} {}",
            self.actor_email,
            self.action.verb(),
            self.resource_type,
            self.resource_id
        );
        if let Some(reason) = self.details.get("reason").filter(|reason| !reason.is_empty()) {
            message.push_str(": ");
            message.push_str(reason);
        }
        message
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditQuery {
    pub actor_email: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub action: Option<AuditAction>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: usize,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            actor_email: None,
            resource_type: None,
            resource_id: None,
            action: None,
            since: None,
            until: None,
            limit: DEFAULT_FIND_LIMIT,
        }
    }
}

impl AuditQuery {
    pub fn actor(mut self, actor_email: impl Into<String>) -> Self {
        self.actor_email = Some(actor_email.into());
        self
    }

    pub fn resource(mut self, resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    pub fn action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn between(mut self, since: Option<DateTime<Utc>>, until: Option<DateTime<Utc>>) -> Self {
        self.since = since;
        self.until = until;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Bounds are inclusive on both ends.
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.actor_email.as_deref().map_or(true, |actor| entry.actor_email == actor)
            && self.resource_type.as_deref().map_or(true, |kind| entry.resource_type == kind)
            && self.resource_id.as_deref().map_or(true, |id| entry.resource_id == id)
            && self.action.map_or(true, |action| entry.action == action)
            && self.since.map_or(true, |since| entry.timestamp >= since)
            && self.until.map_or(true, |until| entry.timestamp <= until)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub total: u64,
    pub by_action: BTreeMap<String, u64>,
    pub by_actor: BTreeMap<String, u64>,
}

impl AuditSummary {
    pub fn record(&mut self, entry: &AuditEntry) {
        self.total += 1;
        *self.by_action.entry(entry.action.as_str().to_string()).or_default() += 1;
        *self.by_actor.entry(entry.actor_email.clone()).or_default() += 1;
    }
}
