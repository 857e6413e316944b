mod support;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use hrdesk_core::domain::request::RequestStatus;
use hrdesk_core::notify::{
    NotificationDispatcher, NotificationError, NotificationPayload, RecordingDispatcher,
    ReminderTaskId, SentNotification,
};
use hrdesk_engine::{RequestService, Stores};

use support::{date, vacation, ANA, BOSS, HR};

/// Answers approval prompts only after `delay`, like a slow task tracker.
struct SlowPrompts {
    inner: RecordingDispatcher,
    delay: Duration,
}

#[async_trait]
impl NotificationDispatcher for SlowPrompts {
    async fn notify_approval_required(
        &self,
        recipient: &str,
        payload: &NotificationPayload,
    ) -> Result<Option<ReminderTaskId>, NotificationError> {
        tokio::time::sleep(self.delay).await;
        self.inner.notify_approval_required(recipient, payload).await
    }

    async fn notify_status_change(
        &self,
        recipient: &str,
        payload: &NotificationPayload,
    ) -> Result<(), NotificationError> {
        self.inner.notify_status_change(recipient, payload).await
    }

    async fn cancel_reminder_task(
        &self,
        task_id: &ReminderTaskId,
    ) -> Result<(), NotificationError> {
        self.inner.cancel_reminder_task(task_id).await
    }
}

fn slow_service(recorder: &RecordingDispatcher) -> RequestService {
    let dispatcher = SlowPrompts { inner: recorder.clone(), delay: Duration::from_millis(100) };
    support::service_with_dispatcher(Stores::in_memory(), Arc::new(dispatcher))
}

fn issued_tasks(recorder: &RecordingDispatcher) -> Vec<ReminderTaskId> {
    recorder
        .sent()
        .into_iter()
        .filter_map(|sent| match sent {
            SentNotification::ApprovalRequired { task_id, .. } => Some(task_id),
            _ => None,
        })
        .collect()
}

fn cancelled_tasks(recorder: &RecordingDispatcher) -> Vec<ReminderTaskId> {
    recorder
        .sent()
        .into_iter()
        .filter_map(|sent| match sent {
            SentNotification::CancelledTask(task_id) => Some(task_id),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn reminders_issued_after_a_rejection_are_cancelled() {
    let recorder = RecordingDispatcher::default();
    let service = slow_service(&recorder);
    let created = service
        .create(ANA, vacation(date(2026, 3, 9), date(2026, 3, 10)))
        .await
        .expect("create");

    let rejected =
        service.reject(&created.id, BOSS, Some("team offsite".into())).await.expect("reject");
    assert_eq!(rejected.status, RequestStatus::Rejected);
    service.drain_notifications().await;

    let stored = service.get(&created.id, ANA).await.expect("get");
    assert!(stored.reminder_task_ids.is_empty(), "left over: {:?}", stored.reminder_task_ids);
    let issued = issued_tasks(&recorder);
    assert_eq!(issued.len(), 1);
    assert_eq!(cancelled_tasks(&recorder), issued);
}

#[tokio::test]
async fn reminders_issued_after_final_approval_are_cancelled() {
    let recorder = RecordingDispatcher::default();
    let service = slow_service(&recorder);
    let created = service
        .create(ANA, vacation(date(2026, 3, 9), date(2026, 3, 10)))
        .await
        .expect("create");

    service.approve_as_manager(&created.id, BOSS).await.expect("manager");
    service.approve_as_admin(&created.id, HR).await.expect("admin");
    service.drain_notifications().await;

    let stored = service.get(&created.id, ANA).await.expect("get");
    assert_eq!(stored.status, RequestStatus::Approved);
    assert!(stored.reminder_task_ids.is_empty(), "left over: {:?}", stored.reminder_task_ids);

    let mut issued = issued_tasks(&recorder);
    let mut cancelled = cancelled_tasks(&recorder);
    issued.sort_by(|a, b| a.0.cmp(&b.0));
    cancelled.sort_by(|a, b| a.0.cmp(&b.0));
    // One manager prompt, then one per admin.
    assert_eq!(issued.len(), 3);
    assert_eq!(cancelled, issued);
}

#[tokio::test]
async fn reminders_for_a_still_pending_request_stay_tracked() {
    let recorder = RecordingDispatcher::default();
    let service = slow_service(&recorder);
    let created = service
        .create(ANA, vacation(date(2026, 3, 9), date(2026, 3, 10)))
        .await
        .expect("create");
    service.drain_notifications().await;

    let stored = service.get(&created.id, ANA).await.expect("get");
    assert_eq!(stored.reminder_task_ids.len(), 1);
    assert!(cancelled_tasks(&recorder).is_empty());
}
