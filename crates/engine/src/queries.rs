use chrono::Datelike;
use tracing::info;

use hrdesk_core::audit::{AuditEntry, AuditQuery, AuditSummary};
use hrdesk_core::directory::normalize_email;
use hrdesk_core::domain::asset::EmployeeAsset;
use hrdesk_core::domain::payload::{RequestPayload, TimeOffType};
use hrdesk_core::domain::request::{Request, RequestId, RequestKind, RequestStatus};
use hrdesk_core::errors::ApplicationError;
use hrdesk_core::notify::NotificationPayload;
use hrdesk_core::workflow::{Actor, ApprovalTier, TransitionError};
use hrdesk_db::RequestFilter;

use crate::notifier::NotificationJob;
use crate::service::{new_correlation_id, RequestService};
use crate::stores::storage_error;

/// One outstanding approval owed by one approver.
#[derive(Clone, Debug, PartialEq)]
pub struct AwaitingAction {
    pub approver: String,
    pub tier: ApprovalTier,
    pub request: Request,
}

impl RequestService {
    /// Visible to the requester, the captured manager and admins.
    pub async fn get(&self, id: &RequestId, actor_email: &str) -> Result<Request, ApplicationError> {
        let request = self.load(id).await?;
        let actor = Actor::resolve(actor_email, self.directory.as_ref());
        if !self.workflow.can_view(&request, &actor) {
            return Err(TransitionError::RoleRequired {
                operation: "get",
                role: "the requester, the approving manager or admins",
            }
            .into());
        }
        Ok(request)
    }

    /// The employee's own requests, newest first.
    pub async fn list_for_employee(
        &self,
        email: &str,
        kind: Option<RequestKind>,
    ) -> Result<Vec<Request>, ApplicationError> {
        self.list(RequestFilter {
            requester_email: Some(normalize_email(email)),
            kind,
            ..RequestFilter::default()
        })
        .await
    }

    pub async fn list_pending_for_manager(
        &self,
        manager_email: &str,
        kind: Option<RequestKind>,
    ) -> Result<Vec<Request>, ApplicationError> {
        let manager = normalize_email(manager_email);
        let pending = self
            .list(RequestFilter {
                manager_email: Some(manager.clone()),
                statuses: vec![RequestStatus::Pending],
                kind,
                ..RequestFilter::default()
            })
            .await?;
        Ok(pending.into_iter().filter(|request| request.requester_email != manager).collect())
    }

    pub async fn list_pending_for_admin(
        &self,
        actor_email: &str,
        kind: Option<RequestKind>,
    ) -> Result<Vec<Request>, ApplicationError> {
        let actor = Actor::resolve(actor_email, self.directory.as_ref());
        if !actor.is_admin {
            return Err(TransitionError::RoleRequired {
                operation: "list_pending_for_admin",
                role: "admins",
            }
            .into());
        }
        self.list(RequestFilter {
            statuses: vec![RequestStatus::ManagerApproved],
            kind,
            ..RequestFilter::default()
        })
        .await
    }

    /// Every approval still owed, one item per approver.
    pub async fn awaiting_action(&self) -> Result<Vec<AwaitingAction>, ApplicationError> {
        let open = self
            .list(RequestFilter {
                statuses: vec![
                    RequestStatus::Pending,
                    RequestStatus::ManagerApproved,
                    RequestStatus::JustificationSubmitted,
                ],
                ..RequestFilter::default()
            })
            .await?;

        let mut items = Vec::new();
        for request in open {
            let (tier, approvers) = match request.status {
                RequestStatus::Pending => {
                    if request.manager_email == request.requester_email {
                        continue;
                    }
                    (ApprovalTier::Manager, vec![request.manager_email.clone()])
                }
                _ => {
                    let requester = Actor::new(&request.requester_email, false);
                    (ApprovalTier::Admin, self.approvers_for(ApprovalTier::Admin, &request, &requester))
                }
            };
            for approver in approvers {
                items.push(AwaitingAction { approver, tier, request: request.clone() });
            }
        }
        Ok(items)
    }

    /// Queues one reminder per outstanding approval. Returns how many were queued.
    pub async fn send_reminders(&self) -> Result<usize, ApplicationError> {
        let correlation_id = new_correlation_id();
        let now = self.clock.now();
        let items = self.awaiting_action().await?;

        for item in &items {
            let payload = NotificationPayload::for_request(&item.request)
                .with_due_date(self.reminder_due_date(&item.request, now));
            self.notifications.enqueue(
                NotificationJob::ApprovalRequired { recipients: vec![item.approver.clone()], payload },
                &correlation_id,
            );
        }

        info!(
            event_name = "reminders.sweep.queued",
            correlation_id = %correlation_id,
            reminders = items.len(),
            "approval reminders queued"
        );
        Ok(items.len())
    }

    /// Working days of approved vacation starting in `year`.
    pub async fn used_vacation_days(&self, email: &str, year: i32) -> Result<u32, ApplicationError> {
        let approved = self
            .list(RequestFilter {
                requester_email: Some(normalize_email(email)),
                statuses: vec![RequestStatus::Approved],
                kind: Some(RequestKind::TimeOff),
                ..RequestFilter::default()
            })
            .await?;

        Ok(approved
            .iter()
            .filter_map(|request| match &request.payload {
                RequestPayload::TimeOff(time_off)
                    if time_off.timeoff_type == TimeOffType::Vacation
                        && time_off.start_date.year() == year =>
                {
                    Some(time_off.working_days_count)
                }
                _ => None,
            })
            .sum())
    }

    pub async fn employee_assets(&self, email: &str) -> Result<Vec<EmployeeAsset>, ApplicationError> {
        self.stores
            .assets
            .list_for_employee(&normalize_email(email))
            .await
            .map_err(|error| storage_error("employee_asset", error))
    }

    pub async fn find_audit(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, ApplicationError> {
        self.stores.audit.find(query).await.map_err(|error| storage_error("audit_log", error))
    }

    pub async fn resource_trail(
        &self,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<Vec<AuditEntry>, ApplicationError> {
        self.stores
            .audit
            .resource_trail(resource_type, resource_id)
            .await
            .map_err(|error| storage_error("audit_log", error))
    }

    pub async fn audit_summary(&self, query: &AuditQuery) -> Result<AuditSummary, ApplicationError> {
        self.stores.audit.summarize(query).await.map_err(|error| storage_error("audit_log", error))
    }

    async fn list(&self, filter: RequestFilter) -> Result<Vec<Request>, ApplicationError> {
        self.stores.requests.list(&filter).await.map_err(|error| storage_error("request", error))
    }
}
