use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use hrdesk_core::notify::{
    NotificationDispatcher, NotificationError, NotificationPayload, ReminderTaskId,
};

/// Posts notification events as JSON to a single configured endpoint.
///
/// `approval_required` responses may carry `{"task_id": "..."}`; that id is
/// handed back later in a `cancel_reminder` event.
#[derive(Clone)]
pub struct WebhookDispatcher {
    client: Client,
    url: String,
    token: Option<SecretString>,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum WebhookEvent<'a> {
    ApprovalRequired { recipient: &'a str, payload: &'a NotificationPayload },
    StatusChange { recipient: &'a str, payload: &'a NotificationPayload },
    CancelReminder { task_id: &'a str },
}

#[derive(Debug, Default, Deserialize)]
struct ApprovalAck {
    #[serde(default)]
    task_id: Option<String>,
}

impl WebhookDispatcher {
    pub fn new(url: impl Into<String>, token: Option<SecretString>, timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_else(|_| Client::new());
        Self { client, url: url.into(), token, timeout }
    }

    async fn post(&self, event: &WebhookEvent<'_>) -> Result<reqwest::Response, NotificationError> {
        let mut request = self.client.post(&self.url).json(event);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.map_err(|error| {
            if error.is_timeout() {
                NotificationError::Timeout {
                    timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                }
            } else {
                NotificationError::Transport(error.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(NotificationError::Rejected { status: response.status().as_u16() });
        }
        Ok(response)
    }
}

#[async_trait]
impl NotificationDispatcher for WebhookDispatcher {
    async fn notify_approval_required(
        &self,
        recipient: &str,
        payload: &NotificationPayload,
    ) -> Result<Option<ReminderTaskId>, NotificationError> {
        let response = self.post(&WebhookEvent::ApprovalRequired { recipient, payload }).await?;
        // An empty or non-JSON body just means the receiver tracks no tasks.
        let ack = response.json::<ApprovalAck>().await.unwrap_or_default();
        debug!(
            event_name = "notify.webhook.approval_required",
            request_id = %payload.request_id,
            recipient,
            task_id = ack.task_id.as_deref().unwrap_or("none"),
            "approval prompt delivered"
        );
        Ok(ack.task_id.filter(|id| !id.is_empty()).map(ReminderTaskId))
    }

    async fn notify_status_change(
        &self,
        recipient: &str,
        payload: &NotificationPayload,
    ) -> Result<(), NotificationError> {
        self.post(&WebhookEvent::StatusChange { recipient, payload }).await?;
        Ok(())
    }

    async fn cancel_reminder_task(
        &self,
        task_id: &ReminderTaskId,
    ) -> Result<(), NotificationError> {
        self.post(&WebhookEvent::CancelReminder { task_id: &task_id.0 }).await?;
        Ok(())
    }
}
