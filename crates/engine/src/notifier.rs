use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hrdesk_core::config::NotificationsConfig;
use hrdesk_core::notify::{
    NotificationDispatcher, NotificationError, NotificationPayload, ReminderTaskId,
};
use hrdesk_core::domain::request::{RequestId, RequestStatus};
use hrdesk_db::{RepositoryError, RequestRepository};
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub attempt_timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay_ms: 2_000, max_delay_ms: 60_000, attempt_timeout_ms: 5_000 }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &NotificationsConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
            attempt_timeout_ms: config.attempt_timeout_ms,
        }
    }

    /// Delay after the zero-based `attempt` failed.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }

    fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms.max(1))
    }
}

/// Unit of outbound work produced by a committed transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NotificationJob {
    ApprovalRequired { recipients: Vec<String>, payload: NotificationPayload },
    StatusChange { recipient: String, payload: NotificationPayload },
    CancelReminders { request_id: RequestId, task_ids: Vec<String> },
}

impl NotificationJob {
    fn name(&self) -> &'static str {
        match self {
            Self::ApprovalRequired { .. } => "approval_required",
            Self::StatusChange { .. } => "status_change",
            Self::CancelReminders { .. } => "cancel_reminders",
        }
    }
}

#[derive(Clone)]
struct Delivery {
    dispatcher: Arc<dyn NotificationDispatcher>,
    requests: Arc<dyn RequestRepository>,
    policy: RetryPolicy,
}

impl Delivery {
    async fn run(self, job: NotificationJob, correlation_id: String) {
        match job {
            NotificationJob::ApprovalRequired { recipients, payload } => {
                let request_id = RequestId(payload.request_id.clone());
                for recipient in recipients {
                    let outcome = self
                        .with_retry("approval_required", &correlation_id, || {
                            self.dispatcher.notify_approval_required(&recipient, &payload)
                        })
                        .await;
                    if let Some(Some(task)) = outcome {
                        self.record_task(&request_id, &task, payload.status, &correlation_id)
                            .await;
                    }
                }
            }
            NotificationJob::StatusChange { recipient, payload } => {
                self.with_retry("status_change", &correlation_id, || {
                    self.dispatcher.notify_status_change(&recipient, &payload)
                })
                .await;
            }
            NotificationJob::CancelReminders { request_id, task_ids } => {
                self.cancel_tasks(&request_id, task_ids, &correlation_id).await;
            }
        }
    }

    /// Tracks a new reminder task on its request. A task that lands after the
    /// request left the prompted status is cancelled straight away.
    async fn record_task(
        &self,
        request_id: &RequestId,
        task: &ReminderTaskId,
        prompted_status: RequestStatus,
        correlation_id: &str,
    ) {
        match self.requests.append_reminder_task(request_id, &task.0).await {
            Ok(()) => {}
            Err(RepositoryError::NotFound { .. }) => {
                self.cancel_stale(request_id, task, None, correlation_id).await;
                return;
            }
            Err(error) => {
                warn!(
                    event_name = "notify.reminder.track_failed",
                    correlation_id = %correlation_id,
                    request_id = %request_id,
                    task_id = %task.0,
                    error = %error,
                    "reminder task was created but could not be recorded"
                );
                return;
            }
        }

        match self.requests.find_by_id(request_id).await {
            Ok(Some(current)) if current.status == prompted_status => {}
            Ok(current) => {
                let status = current.map(|request| request.status);
                self.cancel_stale(request_id, task, status, correlation_id).await;
            }
            Err(error) => warn!(
                event_name = "notify.reminder.recheck_failed",
                correlation_id = %correlation_id,
                request_id = %request_id,
                task_id = %task.0,
                error = %error,
                "could not confirm the request still awaits this reminder"
            ),
        }
    }

    async fn cancel_stale(
        &self,
        request_id: &RequestId,
        task: &ReminderTaskId,
        status: Option<RequestStatus>,
        correlation_id: &str,
    ) {
        debug!(
            event_name = "notify.reminder.stale",
            correlation_id = %correlation_id,
            request_id = %request_id,
            task_id = %task.0,
            status = status.map(RequestStatus::as_str).unwrap_or("deleted"),
            "request moved on before its reminder task was recorded"
        );
        self.cancel_tasks(request_id, vec![task.0.clone()], correlation_id).await;
    }

    async fn cancel_tasks(&self, request_id: &RequestId, task_ids: Vec<String>, correlation_id: &str) {
        let mut cancelled = Vec::with_capacity(task_ids.len());
        for task_id in task_ids {
            let task = ReminderTaskId(task_id);
            let outcome = self
                .with_retry("cancel_reminder", correlation_id, || {
                    self.dispatcher.cancel_reminder_task(&task)
                })
                .await;
            if outcome.is_some() {
                cancelled.push(task.0);
            }
        }
        if cancelled.is_empty() {
            return;
        }
        if let Err(error) = self.requests.remove_reminder_tasks(request_id, &cancelled).await {
            // A deleted request has nothing left to clean up.
            debug!(
                event_name = "notify.reminder.untrack_skipped",
                correlation_id = %correlation_id,
                request_id = %request_id,
                error = %error,
                "cancelled reminder tasks were not removed from the request"
            );
        }
    }

    async fn with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        correlation_id: &str,
        mut send: F,
    ) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, NotificationError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        for attempt in 0..max_attempts {
            let error = match tokio::time::timeout(self.policy.attempt_timeout(), send()).await {
                Ok(Ok(value)) => return Some(value),
                Ok(Err(error)) => error,
                Err(_) => NotificationError::Timeout { timeout_ms: self.policy.attempt_timeout_ms },
            };

            if attempt + 1 == max_attempts {
                error!(
                    event_name = "notify.delivery.exhausted",
                    correlation_id = %correlation_id,
                    operation,
                    attempts = max_attempts,
                    error = %error,
                    "notification dropped after final attempt"
                );
                break;
            }

            let delay = self.policy.backoff(attempt);
            warn!(
                event_name = "notify.delivery.retry",
                correlation_id = %correlation_id,
                operation,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "notification attempt failed; retrying"
            );
            tokio::time::sleep(delay).await;
        }
        None
    }
}

/// Fire-and-forget delivery of notification jobs on background tasks.
pub struct NotificationQueue {
    delivery: Delivery,
    in_flight: Mutex<JoinSet<()>>,
}

impl NotificationQueue {
    pub fn new(
        dispatcher: Arc<dyn NotificationDispatcher>,
        requests: Arc<dyn RequestRepository>,
        policy: RetryPolicy,
    ) -> Self {
        Self { delivery: Delivery { dispatcher, requests, policy }, in_flight: Mutex::default() }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.delivery.policy
    }

    /// Never blocks on the dispatcher.
    pub fn enqueue(&self, job: NotificationJob, correlation_id: &str) {
        debug!(
            event_name = "notify.job.enqueued",
            correlation_id = %correlation_id,
            job = job.name(),
            "notification job enqueued"
        );
        let delivery = self.delivery.clone();
        let correlation_id = correlation_id.to_string();
        let mut in_flight = match self.in_flight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Reap finished tasks so the set does not grow without bound.
        while in_flight.try_join_next().is_some() {}
        in_flight.spawn(delivery.run(job, correlation_id));
    }

    /// Waits for every job enqueued so far. Used by tests and on shutdown.
    pub async fn drain(&self) {
        loop {
            let mut pending = {
                let mut in_flight = match self.in_flight.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                std::mem::take(&mut *in_flight)
            };
            if pending.is_empty() {
                return;
            }
            while pending.join_next().await.is_some() {}
        }
    }
}
