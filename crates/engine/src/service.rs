use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use hrdesk_core::audit::{AuditAction, AuditEntry};
use hrdesk_core::calendar::HolidayCalendar;
use hrdesk_core::clock::{Clock, MonotonicClock};
use hrdesk_core::config::AppConfig;
use hrdesk_core::directory::{normalize_email, Directory};
use hrdesk_core::domain::asset::EmployeeAsset;
use hrdesk_core::domain::justification::TripJustification;
use hrdesk_core::domain::payload::RequestPayload;
use hrdesk_core::domain::request::{Request, RequestId};
use hrdesk_core::errors::{ApplicationError, ValidationError};
use hrdesk_core::notify::{NotificationDispatcher, NotificationPayload};
use hrdesk_core::workflow::{
    Actor, ApprovalTier, EditOperation, SideEffect, TransitionOutcome, WorkflowCommand,
    WorkflowEngine,
};
use hrdesk_db::RepositoryError;

use crate::notifier::{NotificationJob, NotificationQueue, RetryPolicy};
use crate::stores::{storage_error, Stores};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceSettings {
    pub audit_write_attempts: u32,
    /// Holiday region for employees without one on record.
    pub default_region: Option<String>,
    pub retry: RetryPolicy,
    /// Working days an approver gets before a reminder task is due.
    pub task_due_days: u32,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            audit_write_attempts: 3,
            default_region: None,
            retry: RetryPolicy::default(),
            task_due_days: 2,
        }
    }
}

impl ServiceSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            audit_write_attempts: config.audit.write_attempts.max(1),
            default_region: config.calendar.default_region.clone(),
            retry: RetryPolicy::from_config(&config.notifications),
            task_due_days: config.notifications.task_due_days,
        }
    }
}

/// The persisted write that carries a request's state change.
pub(crate) enum StateWrite {
    Insert(Request),
    Replace { current: Request, next: Request },
    Delete(Request),
}

impl StateWrite {
    fn request(&self) -> &Request {
        match self {
            Self::Insert(request) | Self::Delete(request) => request,
            Self::Replace { next, .. } => next,
        }
    }
}

/// A child record written alongside a transition.
pub(crate) enum RecordChange {
    None,
    Asset(EmployeeAsset),
    OpenJustification(TripJustification),
    ReviewJustification { before: TripJustification, after: TripJustification },
}

impl RecordChange {
    fn resource_type(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Asset(_) => "employee_asset",
            Self::OpenJustification(_) | Self::ReviewJustification { .. } => "trip_justification",
        }
    }
}

/// A decided but not yet persisted transition.
pub(crate) struct PlannedTransition {
    pub(crate) correlation_id: String,
    pub(crate) actor: Actor,
    pub(crate) current: Request,
    pub(crate) next: Request,
    pub(crate) outcome: TransitionOutcome,
    pub(crate) now: DateTime<Utc>,
}

impl PlannedTransition {
    pub(crate) fn audit_entry(&self) -> AuditEntry {
        AuditEntry::new(
            self.actor.email.clone(),
            self.outcome.action,
            self.next.resource_type(),
            self.next.id.0.clone(),
            self.now,
        )
        .with_detail("from", self.outcome.from.as_str())
        .with_detail("to", self.outcome.to.as_str())
    }
}

/// Application service for every request operation.
pub struct RequestService {
    pub(crate) stores: Stores,
    pub(crate) directory: Arc<dyn Directory>,
    pub(crate) calendar: Arc<HolidayCalendar>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) workflow: WorkflowEngine,
    pub(crate) notifications: NotificationQueue,
    pub(crate) settings: ServiceSettings,
}

pub(crate) fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

impl RequestService {
    pub fn new(
        stores: Stores,
        directory: Arc<dyn Directory>,
        calendar: Arc<HolidayCalendar>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        settings: ServiceSettings,
    ) -> Self {
        let notifications =
            NotificationQueue::new(dispatcher, Arc::clone(&stores.requests), settings.retry.clone());
        Self {
            stores,
            directory,
            calendar,
            clock: Arc::new(MonotonicClock::default()),
            workflow: WorkflowEngine::default(),
            notifications,
            settings,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn calendar(&self) -> &HolidayCalendar {
        &self.calendar
    }

    /// Waits for background notification work started so far.
    pub async fn drain_notifications(&self) {
        self.notifications.drain().await;
    }

    pub async fn create(
        &self,
        requester_email: &str,
        mut payload: RequestPayload,
    ) -> Result<Request, ApplicationError> {
        let correlation_id = new_correlation_id();
        let requester = normalize_email(requester_email);

        payload.validate()?;
        let manager = self.directory.manager_of(&requester).ok_or_else(|| {
            ValidationError::new("manager_email", format!("no manager on record for {requester}"))
        })?;
        let region = self.region_for(&requester);
        payload.prepare(&self.calendar, region.as_deref())?;

        let now = self.clock.now();
        let request = Request::new_pending(requester.clone(), normalize_email(&manager), payload, now);
        let entry = AuditEntry::new(
            requester.clone(),
            AuditAction::Create,
            request.resource_type(),
            request.id.0.clone(),
            now,
        )
        .with_detail("summary", request.payload.summary())
        .with_detail("manager", request.manager_email.clone());

        self.commit(&correlation_id, &StateWrite::Insert(request.clone()), &RecordChange::None, &entry)
            .await?;

        info!(
            event_name = "request.created",
            correlation_id = %correlation_id,
            request_id = %request.id,
            kind = request.kind().as_str(),
            actor = %requester,
            "request created"
        );

        let approver = Actor::new(&requester, self.directory.is_admin(&requester));
        self.dispatch(
            &correlation_id,
            &request,
            &request,
            &approver,
            &[SideEffect::NotifyApprovers(ApprovalTier::Manager)],
            now,
        );
        Ok(request)
    }

    /// Full replacement of a pending request's payload by its requester.
    pub async fn update(
        &self,
        id: &RequestId,
        actor_email: &str,
        mut payload: RequestPayload,
    ) -> Result<Request, ApplicationError> {
        let correlation_id = new_correlation_id();
        let current = self.load(id).await?;
        let actor = Actor::resolve(actor_email, self.directory.as_ref());
        self.refuse_on_error(
            &correlation_id,
            &current,
            &actor,
            self.workflow.authorize_edit(&current, &actor, EditOperation::Update),
        )?;

        if payload.kind() != current.kind() {
            return Err(ValidationError::new(
                "kind",
                format!("a {} request cannot become a {} request", current.kind(), payload.kind()),
            )
            .into());
        }
        payload.validate()?;
        let region = match &current.payload {
            RequestPayload::TimeOff(previous) => previous.holiday_region.clone(),
            _ => None,
        }
        .or_else(|| self.region_for(&current.requester_email));
        payload.prepare(&self.calendar, region.as_deref())?;

        let now = self.clock.now();
        let mut next = current.clone();
        next.payload = payload;
        next.version = current.version.saturating_add(1);
        next.updated_at = now.max(current.updated_at);

        let entry = AuditEntry::new(
            actor.email.clone(),
            AuditAction::Update,
            next.resource_type(),
            next.id.0.clone(),
            now,
        )
        .with_detail("summary", next.payload.summary());
        let write = StateWrite::Replace { current, next: next.clone() };
        self.commit(&correlation_id, &write, &RecordChange::None, &entry).await?;

        info!(
            event_name = "request.updated",
            correlation_id = %correlation_id,
            request_id = %next.id,
            actor = %actor.email,
            version = next.version,
            "request updated"
        );
        Ok(next)
    }

    pub async fn delete(&self, id: &RequestId, actor_email: &str) -> Result<(), ApplicationError> {
        let correlation_id = new_correlation_id();
        let current = self.load(id).await?;
        let actor = Actor::resolve(actor_email, self.directory.as_ref());
        self.refuse_on_error(
            &correlation_id,
            &current,
            &actor,
            self.workflow.authorize_edit(&current, &actor, EditOperation::Delete),
        )?;

        let now = self.clock.now();
        let entry = AuditEntry::new(
            actor.email.clone(),
            AuditAction::Delete,
            current.resource_type(),
            current.id.0.clone(),
            now,
        )
        .with_detail("summary", current.payload.summary());
        self.commit(&correlation_id, &StateWrite::Delete(current.clone()), &RecordChange::None, &entry)
            .await?;

        info!(
            event_name = "request.deleted",
            correlation_id = %correlation_id,
            request_id = %current.id,
            actor = %actor.email,
            "request deleted"
        );
        self.dispatch(
            &correlation_id,
            &current,
            &current,
            &actor,
            &[SideEffect::CloseReminderTasks],
            now,
        );
        Ok(())
    }

    pub async fn approve_as_manager(
        &self,
        id: &RequestId,
        actor_email: &str,
    ) -> Result<Request, ApplicationError> {
        let plan = self.plan(id, actor_email, &WorkflowCommand::ApproveAsManager).await?;
        let entry = plan.audit_entry();
        self.complete(plan, RecordChange::None, entry).await
    }

    /// Final approval. Asset requests also get their inventory record.
    pub async fn approve_as_admin(
        &self,
        id: &RequestId,
        actor_email: &str,
    ) -> Result<Request, ApplicationError> {
        let plan = self.plan(id, actor_email, &WorkflowCommand::ApproveAsAdmin).await?;
        let mut entry = plan.audit_entry();
        if plan.current.manager_approval.is_none() {
            entry = entry.with_detail("fast_path", "true");
        }

        let creates_inventory = plan.outcome.effects.contains(&SideEffect::CreateInventoryRecord);
        let record = match &plan.next.payload {
            RequestPayload::Asset(asset) if creates_inventory => {
                RecordChange::Asset(EmployeeAsset::from_approved_request(
                    &plan.next.id,
                    &plan.next.requester_email,
                    asset,
                    &plan.actor.email,
                    plan.now,
                ))
            }
            _ => RecordChange::None,
        };
        if let RecordChange::Asset(asset) = &record {
            entry = entry.with_detail("asset_id", asset.id.0.clone());
        }
        self.complete(plan, record, entry).await
    }

    pub async fn reject(
        &self,
        id: &RequestId,
        actor_email: &str,
        reason: Option<String>,
    ) -> Result<Request, ApplicationError> {
        let reason = reason.map(|reason| reason.trim().to_string()).filter(|r| !r.is_empty());
        let plan = self.plan(id, actor_email, &WorkflowCommand::Reject { reason }).await?;
        let entry = plan
            .audit_entry()
            .with_detail("reason", plan.next.rejection_reason().unwrap_or_default());
        self.complete(plan, RecordChange::None, entry).await
    }

    pub(crate) async fn load(&self, id: &RequestId) -> Result<Request, ApplicationError> {
        self.stores
            .requests
            .find_by_id(id)
            .await
            .map_err(|error| storage_error("request", error))?
            .ok_or_else(|| ApplicationError::not_found("request", id.0.clone()))
    }

    pub(crate) fn region_for(&self, email: &str) -> Option<String> {
        self.directory.holiday_region_of(email).or_else(|| self.settings.default_region.clone())
    }

    /// Loads the request and decides the transition without writing anything.
    pub(crate) async fn plan(
        &self,
        id: &RequestId,
        actor_email: &str,
        command: &WorkflowCommand,
    ) -> Result<PlannedTransition, ApplicationError> {
        let correlation_id = new_correlation_id();
        let current = self.load(id).await?;
        let actor = Actor::resolve(actor_email, self.directory.as_ref());
        let now = self.clock.now();

        let decided = self.workflow.apply(&current, &actor, command, now);
        let (next, outcome) = self.refuse_on_error(&correlation_id, &current, &actor, decided)?;
        Ok(PlannedTransition { correlation_id, actor, current, next, outcome, now })
    }

    /// Persists a planned transition, audits it and queues its notifications.
    pub(crate) async fn complete(
        &self,
        plan: PlannedTransition,
        record: RecordChange,
        entry: AuditEntry,
    ) -> Result<Request, ApplicationError> {
        let PlannedTransition { correlation_id, actor, current, next, outcome, now } = plan;
        let write = StateWrite::Replace { current: current.clone(), next: next.clone() };
        self.commit(&correlation_id, &write, &record, &entry).await?;

        info!(
            event_name = "request.transitioned",
            correlation_id = %correlation_id,
            request_id = %next.id,
            actor = %actor.email,
            action = outcome.action.as_str(),
            from = outcome.from.as_str(),
            to = outcome.to.as_str(),
            "request transitioned"
        );
        self.dispatch(&correlation_id, &current, &next, &actor, &outcome.effects, now);
        Ok(next)
    }

    fn refuse_on_error<T, E>(
        &self,
        correlation_id: &str,
        request: &Request,
        actor: &Actor,
        result: Result<T, E>,
    ) -> Result<T, ApplicationError>
    where
        E: Into<ApplicationError> + std::fmt::Display,
    {
        result.map_err(|error| {
            info!(
                event_name = "request.command.refused",
                correlation_id = %correlation_id,
                request_id = %request.id,
                actor = %actor.email,
                status = request.status.as_str(),
                reason = %error,
                "command refused"
            );
            error.into()
        })
    }

    /// State write, child record, then audit entry. Undoes the earlier writes
    /// when a later one fails.
    pub(crate) async fn commit(
        &self,
        correlation_id: &str,
        write: &StateWrite,
        record: &RecordChange,
        entry: &AuditEntry,
    ) -> Result<(), ApplicationError> {
        let resource_type = write.request().resource_type();
        self.write_state(write).await.map_err(|error| storage_error(resource_type, error))?;

        if let Err(error) = self.write_record(record).await {
            let reverted = self.revert_state(correlation_id, write).await;
            warn!(
                event_name = "request.record.write_failed",
                correlation_id = %correlation_id,
                request_id = %write.request().id,
                record = record.resource_type(),
                reverted,
                error = %error,
                "child record write failed; state change reverted"
            );
            return Err(storage_error(record.resource_type(), error));
        }

        if let Err(error) = self.append_audit(correlation_id, entry).await {
            let record_undone = self.undo_record(record).await;
            let state_reverted = self.revert_state(correlation_id, write).await;
            let compensated = record_undone && state_reverted;
            error!(
                event_name = "audit.write.failed",
                correlation_id = %correlation_id,
                request_id = %write.request().id,
                action = entry.action.as_str(),
                compensated,
                error = %error,
                "audit entry could not be written; transition compensated"
            );
            return Err(ApplicationError::AuditWriteFailure {
                resource_id: entry.resource_id.clone(),
                message: error.to_string(),
                compensated,
            });
        }
        Ok(())
    }

    async fn write_state(&self, write: &StateWrite) -> Result<(), RepositoryError> {
        let requests = &self.stores.requests;
        match write {
            StateWrite::Insert(request) => requests.insert(request).await,
            StateWrite::Replace { current, next } => {
                requests.compare_and_set(current.status, current.version, next).await
            }
            StateWrite::Delete(request) => {
                requests.delete_if(&request.id, request.status, request.version).await
            }
        }
    }

    /// Returns whether the stored request is back to its pre-write shape.
    async fn revert_state(&self, correlation_id: &str, write: &StateWrite) -> bool {
        let requests = &self.stores.requests;
        let result = match write {
            StateWrite::Insert(request) => {
                requests.delete_if(&request.id, request.status, request.version).await
            }
            StateWrite::Replace { current, next } => {
                let mut restored = current.clone();
                restored.version = next.version.saturating_add(1);
                restored.updated_at = self.clock.now().max(next.updated_at);
                requests.compare_and_set(next.status, next.version, &restored).await
            }
            StateWrite::Delete(request) => requests.insert(request).await,
        };

        match result {
            Ok(()) => true,
            Err(error) => {
                error!(
                    event_name = "request.compensation.failed",
                    correlation_id = %correlation_id,
                    request_id = %write.request().id,
                    error = %error,
                    "state change could not be reverted"
                );
                false
            }
        }
    }

    async fn write_record(&self, record: &RecordChange) -> Result<(), RepositoryError> {
        match record {
            RecordChange::None => Ok(()),
            RecordChange::Asset(asset) => self.stores.assets.insert(asset).await,
            RecordChange::OpenJustification(justification) => {
                self.stores.justifications.insert(justification).await
            }
            RecordChange::ReviewJustification { before, after } => {
                self.stores.justifications.compare_and_set(before.status, after).await
            }
        }
    }

    async fn undo_record(&self, record: &RecordChange) -> bool {
        let result = match record {
            RecordChange::None => Ok(()),
            RecordChange::Asset(asset) => self.stores.assets.remove(&asset.id).await,
            RecordChange::OpenJustification(justification) => {
                self.stores.justifications.delete(justification).await
            }
            RecordChange::ReviewJustification { before, after } => {
                self.stores.justifications.compare_and_set(after.status, before).await
            }
        };
        result.is_ok()
    }

    pub(crate) async fn append_audit(
        &self,
        correlation_id: &str,
        entry: &AuditEntry,
    ) -> Result<(), RepositoryError> {
        let attempts = self.settings.audit_write_attempts.max(1);
        let mut attempt = 0;
        loop {
            match self.stores.audit.append(entry).await {
                Ok(()) => return Ok(()),
                // The entry id is fixed across attempts, so a duplicate means an
                // earlier attempt landed.
                Err(RepositoryError::Duplicate(_)) if attempt > 0 => return Ok(()),
                Err(error) if attempt + 1 >= attempts => return Err(error),
                Err(error) => {
                    warn!(
                        event_name = "audit.write.retry",
                        correlation_id = %correlation_id,
                        resource_id = %entry.resource_id,
                        attempt = attempt + 1,
                        error = %error,
                        "audit write failed; retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(25_u64 << attempt.min(4))).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Turns notification side effects into background jobs.
    pub(crate) fn dispatch(
        &self,
        correlation_id: &str,
        before: &Request,
        after: &Request,
        actor: &Actor,
        effects: &[SideEffect],
        now: DateTime<Utc>,
    ) {
        for effect in effects {
            let job = match effect {
                SideEffect::NotifyApprovers(tier) => {
                    let recipients = self.approvers_for(*tier, after, actor);
                    if recipients.is_empty() {
                        continue;
                    }
                    let payload = NotificationPayload::for_request(after)
                        .with_actor(actor.email.clone())
                        .with_due_date(self.reminder_due_date(after, now));
                    NotificationJob::ApprovalRequired { recipients, payload }
                }
                SideEffect::NotifyRequester => NotificationJob::StatusChange {
                    recipient: after.requester_email.clone(),
                    payload: NotificationPayload::for_request(after)
                        .with_actor(actor.email.clone())
                        .with_reason(after.rejection_reason().map(str::to_string)),
                },
                SideEffect::CloseReminderTasks => {
                    if before.reminder_task_ids.is_empty() {
                        continue;
                    }
                    NotificationJob::CancelReminders {
                        request_id: before.id.clone(),
                        task_ids: before.reminder_task_ids.clone(),
                    }
                }
                SideEffect::CreateInventoryRecord
                | SideEffect::OpenJustification
                | SideEffect::CloseJustification { .. } => continue,
            };
            self.notifications.enqueue(job, correlation_id);
        }
    }

    pub(crate) fn approvers_for(
        &self,
        tier: ApprovalTier,
        request: &Request,
        actor: &Actor,
    ) -> Vec<String> {
        match tier {
            ApprovalTier::Manager => vec![request.manager_email.clone()],
            ApprovalTier::Admin => self
                .directory
                .admins()
                .into_iter()
                .map(|admin| normalize_email(&admin))
                .filter(|admin| !actor.is(admin))
                .collect(),
        }
    }

    /// `task_due_days` working days after `now` in the requester's region.
    pub(crate) fn reminder_due_date(&self, request: &Request, now: DateTime<Utc>) -> NaiveDate {
        let region = self.region_for(&request.requester_email);
        let mut due = now.date_naive();
        let mut remaining = self.settings.task_due_days;
        while remaining > 0 {
            match due.succ_opt() {
                Some(next) => due = next,
                None => break,
            }
            if self.calendar.is_working_day(due, region.as_deref()) {
                remaining -= 1;
            }
        }
        due
    }
}
