use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::audit::AuditAction;
use crate::domain::request::{ApprovalStamp, Rejection, Request, RequestKind, RequestStatus};
use crate::workflow::states::{
    Actor, ApprovalTier, SideEffect, TransitionOutcome, WorkflowCommand,
};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("`{operation}` is not permitted while the request is {status}: {reason}")]
    NotPermitted { operation: &'static str, status: RequestStatus, reason: String },
    #[error("`{operation}` does not apply to {kind} requests")]
    NotApplicable { operation: &'static str, kind: RequestKind },
    #[error("the {tier} approval has already been recorded")]
    AlreadyApproved { tier: ApprovalTier },
    #[error("`{operation}` is reserved to {role}")]
    RoleRequired { operation: &'static str, role: &'static str },
}

impl TransitionError {
    fn not_permitted(
        command: &WorkflowCommand,
        status: RequestStatus,
        reason: impl Into<String>,
    ) -> Self {
        Self::NotPermitted { operation: command.name(), status, reason: reason.into() }
    }
}

/// Requester-owned edits outside the approval graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditOperation {
    Update,
    Delete,
}

impl EditOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

pub trait WorkflowDefinition: Send + Sync {
    fn transition(
        &self,
        request: &Request,
        actor: &Actor,
        command: &WorkflowCommand,
    ) -> Result<TransitionOutcome, TransitionError>;
}

/// Manager then admin approval shared by every request kind.
#[derive(Clone, Debug, Default)]
pub struct TwoTierApproval;

impl WorkflowDefinition for TwoTierApproval {
    fn transition(
        &self,
        request: &Request,
        actor: &Actor,
        command: &WorkflowCommand,
    ) -> Result<TransitionOutcome, TransitionError> {
        transition_two_tier(request, actor, command)
    }
}

/// Two-tier approval followed by the trip justification loop.
#[derive(Clone, Debug, Default)]
pub struct TripLifecycle {
    approval: TwoTierApproval,
}

impl WorkflowDefinition for TripLifecycle {
    fn transition(
        &self,
        request: &Request,
        actor: &Actor,
        command: &WorkflowCommand,
    ) -> Result<TransitionOutcome, TransitionError> {
        use RequestStatus::{
            Approved, Completed, InProgress, JustificationRejected, JustificationSubmitted,
        };
        use SideEffect::{CloseJustification, NotifyApprovers, NotifyRequester, OpenJustification};
        use WorkflowCommand::{
            ApproveJustification, RejectJustification, StartTrip, SubmitJustification,
        };

        let status = request.status;
        let is_requester = actor.is(&request.requester_email);

        let (to, action, effects) = match (status, command) {
            (Approved, StartTrip) => {
                if !(is_requester || actor.is_admin) {
                    return Err(TransitionError::not_permitted(
                        command,
                        status,
                        "only the traveller or an admin may start the trip",
                    ));
                }
                (InProgress, AuditAction::StartTrip, Vec::new())
            }
            (InProgress | JustificationRejected, SubmitJustification) => {
                if !is_requester {
                    return Err(TransitionError::not_permitted(
                        command,
                        status,
                        "only the traveller may submit a justification",
                    ));
                }
                (
                    JustificationSubmitted,
                    AuditAction::JustificationSubmit,
                    vec![OpenJustification, NotifyApprovers(ApprovalTier::Admin)],
                )
            }
            (JustificationSubmitted, ApproveJustification | RejectJustification) => {
                if !actor.is_admin {
                    return Err(TransitionError::not_permitted(
                        command,
                        status,
                        "only admins may review a justification",
                    ));
                }
                if matches!(command, ApproveJustification) {
                    (
                        Completed,
                        AuditAction::JustificationApprove,
                        vec![CloseJustification { approved: true }, NotifyRequester],
                    )
                } else {
                    (
                        JustificationRejected,
                        AuditAction::JustificationReject,
                        vec![CloseJustification { approved: false }, NotifyRequester],
                    )
                }
            }
            (_, StartTrip | SubmitJustification | ApproveJustification | RejectJustification) => {
                return Err(TransitionError::not_permitted(
                    command,
                    status,
                    "the trip is not at this stage",
                ));
            }
            _ => return self.approval.transition(request, actor, command),
        };

        Ok(TransitionOutcome { from: status, to, action, effects })
    }
}

fn transition_two_tier(
    request: &Request,
    actor: &Actor,
    command: &WorkflowCommand,
) -> Result<TransitionOutcome, TransitionError> {
    use RequestStatus::{Approved, ManagerApproved, Pending, Rejected};
    use SideEffect::{CloseReminderTasks, CreateInventoryRecord, NotifyApprovers, NotifyRequester};
    use WorkflowCommand::{ApproveAsAdmin, ApproveAsManager, Reject};

    let status = request.status;
    let is_manager = actor.is(&request.manager_email);
    let is_requester = actor.is(&request.requester_email);

    let (to, action, effects) = match (status, command) {
        (Pending, ApproveAsManager) => {
            if !is_manager {
                return Err(TransitionError::not_permitted(
                    command,
                    status,
                    "only the manager captured at creation may approve this tier",
                ));
            }
            if is_requester {
                return Err(TransitionError::not_permitted(
                    command,
                    status,
                    "requesters cannot approve their own request",
                ));
            }
            (
                ManagerApproved,
                AuditAction::ApproveManager,
                vec![CloseReminderTasks, NotifyApprovers(ApprovalTier::Admin), NotifyRequester],
            )
        }
        (_, ApproveAsManager) if request.manager_approval.is_some() => {
            return Err(TransitionError::AlreadyApproved { tier: ApprovalTier::Manager });
        }
        (ManagerApproved | Pending, ApproveAsAdmin) => {
            if !actor.is_admin {
                return Err(TransitionError::not_permitted(
                    command,
                    status,
                    "only admins may grant final approval",
                ));
            }
            // Pending is only reachable here through the manager fast path.
            if status == Pending && !is_manager {
                return Err(TransitionError::not_permitted(
                    command,
                    status,
                    "manager approval is still outstanding",
                ));
            }
            let mut effects = vec![CloseReminderTasks, NotifyRequester];
            if request.kind() == RequestKind::Asset {
                effects.push(CreateInventoryRecord);
            }
            (Approved, AuditAction::ApproveAdmin, effects)
        }
        (_, ApproveAsAdmin) if request.admin_approval.is_some() => {
            return Err(TransitionError::AlreadyApproved { tier: ApprovalTier::Admin });
        }
        (Pending | ManagerApproved, Reject { .. }) => {
            if !(is_manager || actor.is_admin) {
                return Err(TransitionError::not_permitted(
                    command,
                    status,
                    "only the manager or an admin may reject",
                ));
            }
            (Rejected, AuditAction::Reject, vec![CloseReminderTasks, NotifyRequester])
        }
        (_, ApproveAsManager | ApproveAsAdmin | Reject { .. }) => {
            return Err(TransitionError::not_permitted(
                command,
                status,
                "no approval decision is outstanding",
            ));
        }
        _ => {
            return Err(TransitionError::NotApplicable {
                operation: command.name(),
                kind: request.kind(),
            });
        }
    };

    Ok(TransitionOutcome { from: status, to, action, effects })
}

/// Picks the definition for a request kind and applies its outcome.
#[derive(Clone, Debug, Default)]
pub struct WorkflowEngine {
    two_tier: TwoTierApproval,
    trip: TripLifecycle,
}

impl WorkflowEngine {
    pub fn definition_for(&self, kind: RequestKind) -> &dyn WorkflowDefinition {
        match kind {
            RequestKind::Trip => &self.trip,
            RequestKind::TimeOff | RequestKind::Travel | RequestKind::Tool | RequestKind::Asset => {
                &self.two_tier
            }
        }
    }

    pub fn decide(
        &self,
        request: &Request,
        actor: &Actor,
        command: &WorkflowCommand,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.definition_for(request.kind()).transition(request, actor, command)
    }

    /// Returns the next persisted shape of `request`. The input is left untouched.
    pub fn apply(
        &self,
        request: &Request,
        actor: &Actor,
        command: &WorkflowCommand,
        now: DateTime<Utc>,
    ) -> Result<(Request, TransitionOutcome), TransitionError> {
        let outcome = self.decide(request, actor, command)?;
        let stamp = || ApprovalStamp { by: actor.email.clone(), at: now };

        let mut next = request.clone();
        match outcome.action {
            AuditAction::ApproveManager => {
                if next.manager_approval.is_some() {
                    return Err(TransitionError::AlreadyApproved { tier: ApprovalTier::Manager });
                }
                next.manager_approval = Some(stamp());
            }
            AuditAction::ApproveAdmin => {
                if next.admin_approval.is_some() {
                    return Err(TransitionError::AlreadyApproved { tier: ApprovalTier::Admin });
                }
                next.admin_approval = Some(stamp());
            }
            AuditAction::Reject => {
                let reason = match command {
                    WorkflowCommand::Reject { reason } => reason.clone().unwrap_or_default(),
                    _ => String::new(),
                };
                next.rejection = Some(Rejection { by: actor.email.clone(), at: now, reason });
            }
            _ => {}
        }
        next.status = outcome.to;
        next.version = request.version.saturating_add(1);
        next.updated_at = now.max(request.updated_at);

        Ok((next, outcome))
    }

    pub fn authorize_edit(
        &self,
        request: &Request,
        actor: &Actor,
        operation: EditOperation,
    ) -> Result<(), TransitionError> {
        if !actor.is(&request.requester_email) {
            return Err(TransitionError::NotPermitted {
                operation: operation.as_str(),
                status: request.status,
                reason: "only the requester may change a request".to_string(),
            });
        }
        if request.status != RequestStatus::Pending {
            return Err(TransitionError::NotPermitted {
                operation: operation.as_str(),
                status: request.status,
                reason: "requests can only change while pending".to_string(),
            });
        }
        Ok(())
    }

    pub fn can_view(&self, request: &Request, actor: &Actor) -> bool {
        actor.is_admin || actor.is(&request.requester_email) || actor.is(&request.manager_email)
    }
}
