use std::fmt;

use serde::{Deserialize, Serialize};

use crate::audit::AuditAction;
use crate::directory::{normalize_email, Directory};
use crate::domain::request::RequestStatus;

/// Caller identity with the admin flag resolved once per command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub email: String,
    pub is_admin: bool,
}

impl Actor {
    pub fn new(email: &str, is_admin: bool) -> Self {
        Self { email: normalize_email(email), is_admin }
    }

    pub fn resolve(email: &str, directory: &dyn Directory) -> Self {
        Self::new(email, directory.is_admin(email))
    }

    pub fn is(&self, email: &str) -> bool {
        self.email == normalize_email(email)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowCommand {
    ApproveAsManager,
    ApproveAsAdmin,
    Reject { reason: Option<String> },
    StartTrip,
    SubmitJustification,
    ApproveJustification,
    RejectJustification,
}

impl WorkflowCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ApproveAsManager => "approve_as_manager",
            Self::ApproveAsAdmin => "approve_as_admin",
            Self::Reject { .. } => "reject",
            Self::StartTrip => "start_trip",
            Self::SubmitJustification => "submit_justification",
            Self::ApproveJustification => "approve_justification",
            Self::RejectJustification => "reject_justification",
        }
    }
}

impl fmt::Display for WorkflowCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalTier {
    Manager,
    Admin,
}

impl ApprovalTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manager => "manager",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for ApprovalTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Follow-up work a transition authorizes. Executed by the application layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SideEffect {
    NotifyApprovers(ApprovalTier),
    NotifyRequester,
    CloseReminderTasks,
    CreateInventoryRecord,
    OpenJustification,
    CloseJustification { approved: bool },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: RequestStatus,
    pub to: RequestStatus,
    pub action: AuditAction,
    pub effects: Vec<SideEffect>,
}
