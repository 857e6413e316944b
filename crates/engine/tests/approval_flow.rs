mod support;

use hrdesk_core::audit::{AuditAction, AuditQuery};
use hrdesk_core::domain::payload::RequestPayload;
use hrdesk_core::domain::request::{RequestKind, RequestStatus};
use hrdesk_core::errors::{ApplicationError, DomainError};
use hrdesk_core::notify::SentNotification;
use hrdesk_core::workflow::{ApprovalTier, TransitionError};

use support::{date, laptop, service, vacation, ANA, BOSS, HR, LEO, NOBODY, OPS};

fn is_forbidden(error: &ApplicationError) -> bool {
    matches!(error, ApplicationError::Domain(DomainError::Forbidden(_)))
}

#[tokio::test]
async fn manager_then_admin_approval_completes_a_time_off_request() {
    let (service, _) = service();
    let created = service
        .create(ANA, vacation(date(2026, 3, 9), date(2026, 3, 20)))
        .await
        .expect("create");
    assert_eq!(created.status, RequestStatus::Pending);
    assert_eq!(created.manager_email, BOSS);
    match &created.payload {
        RequestPayload::TimeOff(time_off) => {
            assert_eq!(time_off.holiday_region.as_deref(), Some("mexico"));
            // Ten weekdays minus Benito Juarez on March 16.
            assert_eq!(time_off.working_days_count, 9);
        }
        other => panic!("unexpected payload {other:?}"),
    }

    let manager_approved = service.approve_as_manager(&created.id, BOSS).await.expect("manager");
    assert_eq!(manager_approved.status, RequestStatus::ManagerApproved);

    let approved = service.approve_as_admin(&created.id, OPS).await.expect("admin");
    assert_eq!(approved.status, RequestStatus::Approved);
    assert!(approved.manager_approval.is_some());
    assert!(approved.admin_approval.is_some());
    assert_eq!(approved.version, 3);
    assert!(approved.updated_at >= approved.created_at);

    let trail = service.resource_trail("timeoff_request", &created.id.0).await.expect("trail");
    let actions: Vec<_> = trail.iter().map(|entry| entry.action).collect();
    assert_eq!(
        actions,
        vec![AuditAction::Create, AuditAction::ApproveManager, AuditAction::ApproveAdmin]
    );
    assert!(trail.windows(2).all(|pair| pair[0].timestamp < pair[1].timestamp));

    assert_eq!(service.used_vacation_days(ANA, 2026).await.expect("used"), 9);
    assert_eq!(service.used_vacation_days(ANA, 2025).await.expect("used"), 0);
}

#[tokio::test]
async fn admin_who_is_the_manager_approves_both_tiers_at_once() {
    let (service, _) = service();
    let created = service
        .create(LEO, vacation(date(2026, 3, 9), date(2026, 3, 10)))
        .await
        .expect("create");
    assert_eq!(created.manager_email, HR);

    let approved = service.approve_as_admin(&created.id, HR).await.expect("fast path");
    assert_eq!(approved.status, RequestStatus::Approved);
    assert!(approved.manager_approval.is_none());

    let trail = service.resource_trail("timeoff_request", &created.id.0).await.expect("trail");
    let actions: Vec<_> = trail.iter().map(|entry| entry.action).collect();
    assert_eq!(actions, vec![AuditAction::Create, AuditAction::ApproveAdmin]);
    assert_eq!(trail[1].details.get("fast_path").map(String::as_str), Some("true"));
}

#[tokio::test]
async fn admin_that_is_not_the_manager_waits_for_the_manager_tier() {
    let (service, _) = service();
    let created = service
        .create(ANA, vacation(date(2026, 3, 9), date(2026, 3, 10)))
        .await
        .expect("create");

    let error = service.approve_as_admin(&created.id, OPS).await.expect_err("too early");
    assert!(is_forbidden(&error));

    let stored = service.get(&created.id, ANA).await.expect("get");
    assert_eq!(stored.status, RequestStatus::Pending);
    assert_eq!(stored.version, 1);
}

#[tokio::test]
async fn only_the_captured_manager_may_approve_the_first_tier() {
    let (service, _) = service();
    let created = service
        .create(ANA, vacation(date(2026, 3, 9), date(2026, 3, 10)))
        .await
        .expect("create");

    for outsider in [ANA, HR, NOBODY] {
        let error = service.approve_as_manager(&created.id, outsider).await.expect_err("refused");
        assert!(is_forbidden(&error), "{outsider} must be refused");
    }

    service.approve_as_manager(&created.id, "  Boss@Corp.Test ").await.expect("normalised email");
    let error = service.approve_as_manager(&created.id, BOSS).await.expect_err("write once");
    assert_eq!(
        error,
        ApplicationError::from(TransitionError::AlreadyApproved { tier: ApprovalTier::Manager })
    );

    let trail = service.resource_trail("timeoff_request", &created.id.0).await.expect("trail");
    assert_eq!(trail.len(), 2, "refusals never reach the audit trail");
}

#[tokio::test]
async fn rejection_records_reason_and_is_terminal() {
    let (service, _) = service();
    let created = service
        .create(ANA, vacation(date(2026, 3, 9), date(2026, 3, 10)))
        .await
        .expect("create");

    let rejected = service.reject(&created.id, BOSS, None).await.expect("reject");
    assert_eq!(rejected.status, RequestStatus::Rejected);
    assert_eq!(rejected.rejection_reason(), Some(""));

    let error = service.approve_as_admin(&created.id, HR).await.expect_err("terminal");
    assert!(is_forbidden(&error));
    let error = service.reject(&created.id, HR, Some("again".into())).await.expect_err("terminal");
    assert!(is_forbidden(&error));

    let entries = service
        .find_audit(&AuditQuery::default().action(AuditAction::Reject))
        .await
        .expect("find");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].display_message(), format!("{BOSS} rejected timeoff_request {}", created.id));
}

#[tokio::test]
async fn admins_may_reject_after_manager_approval() {
    let (service, dispatcher) = service();
    let created = service
        .create(ANA, vacation(date(2026, 3, 9), date(2026, 3, 10)))
        .await
        .expect("create");
    service.approve_as_manager(&created.id, BOSS).await.expect("manager");

    let rejected = service
        .reject(&created.id, OPS, Some("  overlaps the release  ".into()))
        .await
        .expect("reject");
    assert_eq!(rejected.rejection_reason(), Some("overlaps the release"));

    service.drain_notifications().await;
    let sent = dispatcher.sent();
    assert!(sent.iter().any(|notification| matches!(
        notification,
        SentNotification::StatusChange { recipient, status: RequestStatus::Rejected, .. }
            if recipient == ANA
    )));
}

#[tokio::test]
async fn requester_edits_only_while_pending() {
    let (service, _) = service();
    let created = service
        .create(ANA, vacation(date(2026, 3, 9), date(2026, 3, 10)))
        .await
        .expect("create");

    let error = service
        .update(&created.id, BOSS, vacation(date(2026, 3, 9), date(2026, 3, 13)))
        .await
        .expect_err("not the requester");
    assert!(is_forbidden(&error));

    let error = service.update(&created.id, ANA, laptop()).await.expect_err("kind is fixed");
    assert!(matches!(error, ApplicationError::Domain(DomainError::Validation(_))));

    let updated = service
        .update(&created.id, ANA, vacation(date(2026, 3, 9), date(2026, 3, 13)))
        .await
        .expect("update");
    assert_eq!(updated.version, 2);
    match &updated.payload {
        RequestPayload::TimeOff(time_off) => assert_eq!(time_off.working_days_count, 5),
        other => panic!("unexpected payload {other:?}"),
    }

    service.approve_as_manager(&created.id, BOSS).await.expect("manager");
    let error = service.delete(&created.id, ANA).await.expect_err("no longer pending");
    assert!(is_forbidden(&error));
}

#[tokio::test]
async fn deleting_a_pending_request_removes_it() {
    let (service, _) = service();
    let created = service
        .create(ANA, vacation(date(2026, 3, 9), date(2026, 3, 10)))
        .await
        .expect("create");

    service.delete(&created.id, ANA).await.expect("delete");
    let error = service.get(&created.id, ANA).await.expect_err("gone");
    assert!(matches!(error, ApplicationError::NotFound { .. }));

    let trail = service.resource_trail("timeoff_request", &created.id.0).await.expect("trail");
    assert_eq!(trail.last().map(|entry| entry.action), Some(AuditAction::Delete));
}

#[tokio::test]
async fn invalid_payloads_are_refused_before_any_write() {
    let (service, _) = service();

    let backwards = service
        .create(ANA, vacation(date(2026, 3, 10), date(2026, 3, 9)))
        .await
        .expect_err("end before start");
    assert!(matches!(backwards, ApplicationError::Domain(DomainError::Validation(_))));

    let weekend = service
        .create(ANA, vacation(date(2026, 3, 7), date(2026, 3, 8)))
        .await
        .expect_err("no working days");
    assert!(matches!(weekend, ApplicationError::Domain(DomainError::Validation(_))));

    let unmanaged = service
        .create(NOBODY, vacation(date(2026, 3, 9), date(2026, 3, 10)))
        .await
        .expect_err("no manager on record");
    assert!(matches!(unmanaged, ApplicationError::Domain(DomainError::Validation(_))));

    let summary = service.audit_summary(&AuditQuery::default()).await.expect("summary");
    assert_eq!(summary.total, 0);
}

#[tokio::test]
async fn unknown_requests_are_not_found() {
    let (service, _) = service();
    let missing = hrdesk_core::domain::request::RequestId("missing".into());

    let error = service.approve_as_manager(&missing, BOSS).await.expect_err("missing");
    assert_eq!(error, ApplicationError::not_found("request", "missing"));
}

#[tokio::test]
async fn approved_asset_requests_land_in_inventory() {
    let (service, _) = service();
    let created = service.create(ANA, laptop()).await.expect("create");
    service.approve_as_manager(&created.id, BOSS).await.expect("manager");
    service.approve_as_admin(&created.id, HR).await.expect("admin");

    let assets = service.employee_assets(ANA).await.expect("assets");
    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0].asset_request_id.as_ref(), Some(&created.id));
    assert_eq!(assets[0].assigned_by, HR);
    assert!(assets[0].purchase_cost.is_none());
}

#[tokio::test]
async fn listings_follow_role_and_status() {
    let (service, _) = service();
    let first = service
        .create(ANA, vacation(date(2026, 3, 9), date(2026, 3, 10)))
        .await
        .expect("create");
    let second = service.create(ANA, laptop()).await.expect("create");
    let leos = service
        .create(LEO, vacation(date(2026, 3, 9), date(2026, 3, 10)))
        .await
        .expect("create");

    let mine = service.list_for_employee(ANA, None).await.expect("list");
    assert_eq!(
        mine.iter().map(|request| request.id.clone()).collect::<Vec<_>>(),
        vec![second.id.clone(), first.id.clone()]
    );
    let assets_only = service.list_for_employee(ANA, Some(RequestKind::Asset)).await.expect("list");
    assert_eq!(assets_only.len(), 1);

    assert_eq!(service.list_pending_for_manager(BOSS, None).await.expect("list").len(), 2);
    assert_eq!(service.list_pending_for_manager(HR, None).await.expect("list").len(), 1);

    let error = service.list_pending_for_admin(BOSS, None).await.expect_err("not an admin");
    assert!(is_forbidden(&error));
    assert!(service.list_pending_for_admin(HR, None).await.expect("list").is_empty());

    service.approve_as_manager(&first.id, BOSS).await.expect("manager");
    let queue = service.list_pending_for_admin(HR, None).await.expect("list");
    assert_eq!(queue.iter().map(|request| &request.id).collect::<Vec<_>>(), vec![&first.id]);

    let awaiting = service.awaiting_action().await.expect("awaiting");
    // second and leo's request wait on their managers; first waits on both admins.
    assert_eq!(awaiting.len(), 4);
    assert!(awaiting
        .iter()
        .any(|item| item.request.id == leos.id && item.approver == HR && item.tier == ApprovalTier::Manager));
}

#[tokio::test]
async fn requests_are_visible_only_to_their_participants() {
    let (service, _) = service();
    let created = service
        .create(ANA, vacation(date(2026, 3, 9), date(2026, 3, 10)))
        .await
        .expect("create");

    for viewer in [ANA, BOSS, HR] {
        service.get(&created.id, viewer).await.expect("visible");
    }
    let error = service.get(&created.id, LEO).await.expect_err("outsider");
    assert!(is_forbidden(&error));
}

#[tokio::test]
async fn reminders_are_tracked_and_cancelled_as_the_request_moves() {
    let (service, dispatcher) = service();
    let created = service
        .create(ANA, vacation(date(2026, 3, 9), date(2026, 3, 10)))
        .await
        .expect("create");
    service.drain_notifications().await;

    let pending = service.get(&created.id, ANA).await.expect("get");
    assert_eq!(pending.reminder_task_ids.len(), 1);
    assert_eq!(pending.version, 1, "reminder bookkeeping does not bump the version");

    service.approve_as_manager(&created.id, BOSS).await.expect("manager");
    service.drain_notifications().await;
    let manager_approved = service.get(&created.id, ANA).await.expect("get");
    assert!(!manager_approved.reminder_task_ids.contains(&pending.reminder_task_ids[0]));
    // One prompt per admin for the second tier.
    assert_eq!(manager_approved.reminder_task_ids.len(), 2);

    service.approve_as_admin(&created.id, HR).await.expect("admin");
    service.drain_notifications().await;
    let approved = service.get(&created.id, ANA).await.expect("get");
    assert!(approved.reminder_task_ids.is_empty());

    let cancelled = dispatcher
        .sent()
        .into_iter()
        .filter(|notification| matches!(notification, SentNotification::CancelledTask(_)))
        .count();
    assert_eq!(cancelled, 3);
}

#[tokio::test]
async fn notification_outages_never_fail_a_transition() {
    let dispatcher = hrdesk_core::notify::RecordingDispatcher::failing_first(100);
    let service = support::service_with(hrdesk_engine::Stores::in_memory(), dispatcher.clone());
    let created = service
        .create(ANA, vacation(date(2026, 3, 9), date(2026, 3, 10)))
        .await
        .expect("create");

    let approved = service.approve_as_manager(&created.id, BOSS).await.expect("manager");
    assert_eq!(approved.status, RequestStatus::ManagerApproved);

    service.drain_notifications().await;
    assert!(dispatcher.sent().is_empty());
    assert!(dispatcher.attempts() >= 3);
}

#[tokio::test]
async fn reminder_sweep_queues_one_prompt_per_outstanding_approval() {
    let (service, dispatcher) = service();
    service
        .create(ANA, vacation(date(2026, 3, 9), date(2026, 3, 10)))
        .await
        .expect("create");
    service.drain_notifications().await;
    let before = dispatcher.sent().len();

    let queued = service.send_reminders().await.expect("sweep");
    service.drain_notifications().await;

    assert_eq!(queued, 1);
    assert_eq!(dispatcher.sent().len(), before + 1);
}
