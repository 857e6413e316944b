use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::request::{Request, RequestKind, RequestStatus};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReminderTaskId(pub String);

/// What a downstream channel needs to tell someone about a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub request_id: String,
    pub kind: RequestKind,
    pub status: RequestStatus,
    pub requester_email: String,
    pub summary: String,
    pub actor_email: Option<String>,
    pub reason: Option<String>,
    pub due_date: Option<NaiveDate>,
}

impl NotificationPayload {
    pub fn for_request(request: &Request) -> Self {
        Self {
            request_id: request.id.0.clone(),
            kind: request.kind(),
            status: request.status,
            requester_email: request.requester_email.clone(),
            summary: request.payload.summary(),
            actor_email: None,
            reason: None,
            due_date: None,
        }
    }

    pub fn with_actor(mut self, actor_email: impl Into<String>) -> Self {
        self.actor_email = Some(actor_email.into());
        self
    }

    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NotificationError {
    #[error("notification transport failed: {0}")]
    Transport(String),
    #[error("notification endpoint rejected the message with status {status}")]
    Rejected { status: u16 },
    #[error("notification attempt timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// Outbound channel for approval prompts and status updates.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Prompts `recipient` to act. Returns the reminder task created, if any.
    async fn notify_approval_required(
        &self,
        recipient: &str,
        payload: &NotificationPayload,
    ) -> Result<Option<ReminderTaskId>, NotificationError>;

    async fn notify_status_change(
        &self,
        recipient: &str,
        payload: &NotificationPayload,
    ) -> Result<(), NotificationError>;

    async fn cancel_reminder_task(&self, task_id: &ReminderTaskId)
        -> Result<(), NotificationError>;
}

#[derive(Clone, Debug, Default)]
pub struct NoopDispatcher;

#[async_trait]
impl NotificationDispatcher for NoopDispatcher {
    async fn notify_approval_required(
        &self,
        _recipient: &str,
        _payload: &NotificationPayload,
    ) -> Result<Option<ReminderTaskId>, NotificationError> {
        Ok(None)
    }

    async fn notify_status_change(
        &self,
        _recipient: &str,
        _payload: &NotificationPayload,
    ) -> Result<(), NotificationError> {
        Ok(())
    }

    async fn cancel_reminder_task(
        &self,
        _task_id: &ReminderTaskId,
    ) -> Result<(), NotificationError> {
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SentNotification {
    ApprovalRequired { recipient: String, request_id: String, task_id: ReminderTaskId },
    StatusChange { recipient: String, request_id: String, status: RequestStatus },
    CancelledTask(ReminderTaskId),
}

#[derive(Debug, Default)]
struct RecordingState {
    sent: Vec<SentNotification>,
    next_task: u64,
    failures_remaining: u32,
    attempts: u32,
}

/// Keeps every delivered notification in memory; can fail the first N attempts.
#[derive(Clone, Debug, Default)]
pub struct RecordingDispatcher {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingDispatcher {
    pub fn failing_first(attempts: u32) -> Self {
        let dispatcher = Self::default();
        dispatcher.with_state(|state| state.failures_remaining = attempts);
        dispatcher
    }

    pub fn sent(&self) -> Vec<SentNotification> {
        self.with_state(|state| state.sent.clone())
    }

    pub fn attempts(&self) -> u32 {
        self.with_state(|state| state.attempts)
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut RecordingState) -> T) -> T {
        match self.state.lock() {
            Ok(mut state) => f(&mut state),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    fn attempt(&self) -> Result<(), NotificationError> {
        self.with_state(|state| {
            state.attempts += 1;
            if state.failures_remaining > 0 {
                state.failures_remaining -= 1;
                return Err(NotificationError::Transport("simulated outage".to_string()));
            }
            Ok(())
        })
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn notify_approval_required(
        &self,
        recipient: &str,
        payload: &NotificationPayload,
    ) -> Result<Option<ReminderTaskId>, NotificationError> {
        self.attempt()?;
        let task_id = self.with_state(|state| {
            state.next_task += 1;
            let task_id = ReminderTaskId(format!("task-{}", state.next_task));
            state.sent.push(SentNotification::ApprovalRequired {
                recipient: recipient.to_string(),
                request_id: payload.request_id.clone(),
                task_id: task_id.clone(),
            });
            task_id
        });
        Ok(Some(task_id))
    }

    async fn notify_status_change(
        &self,
        recipient: &str,
        payload: &NotificationPayload,
    ) -> Result<(), NotificationError> {
        self.attempt()?;
        self.with_state(|state| {
            state.sent.push(SentNotification::StatusChange {
                recipient: recipient.to_string(),
                request_id: payload.request_id.clone(),
                status: payload.status,
            })
        });
        Ok(())
    }

    async fn cancel_reminder_task(
        &self,
        task_id: &ReminderTaskId,
    ) -> Result<(), NotificationError> {
        self.attempt()?;
        self.with_state(|state| state.sent.push(SentNotification::CancelledTask(task_id.clone())));
        Ok(())
    }
}
