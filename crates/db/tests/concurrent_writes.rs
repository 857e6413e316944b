use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};

use hrdesk_core::domain::payload::{RequestPayload, TimeOffPayload, TimeOffType};
use hrdesk_core::domain::request::{ApprovalStamp, Rejection, Request, RequestStatus};
use hrdesk_db::{connect_with_settings, migrations, RepositoryError, RequestRepository, SqlRequestRepository};

fn pending() -> Request {
    let day = NaiveDate::from_ymd_opt(2026, 3, 3).expect("date");
    let mut payload = TimeOffPayload::new(day, day, TimeOffType::Vacation, None);
    payload.working_days_count = 1;
    let created = Utc.with_ymd_and_hms(2026, 2, 20, 8, 30, 0).single().expect("timestamp");
    Request::new_pending("ana@corp.test", "boss@corp.test", RequestPayload::TimeOff(payload), created)
}

#[tokio::test]
async fn exactly_one_of_two_racing_writers_wins() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("hrdesk.db").display());
    let pool = connect_with_settings(&url, 4, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");

    let repo = Arc::new(SqlRequestRepository::new(pool));
    let request = pending();
    repo.insert(&request).await.expect("insert");

    let mut approve = request.clone();
    approve.status = RequestStatus::ManagerApproved;
    approve.manager_approval = Some(ApprovalStamp { by: "boss@corp.test".into(), at: request.created_at });
    approve.version = 2;

    let mut reject = request.clone();
    reject.status = RequestStatus::Rejected;
    reject.rejection = Some(Rejection {
        by: "hr@corp.test".into(),
        at: request.created_at,
        reason: "team offsite".into(),
    });
    reject.version = 2;

    let (first, second) = tokio::join!(
        {
            let repo = Arc::clone(&repo);
            async move { repo.compare_and_set(RequestStatus::Pending, 1, &approve).await }
        },
        {
            let repo = Arc::clone(&repo);
            async move { repo.compare_and_set(RequestStatus::Pending, 1, &reject).await }
        }
    );

    let outcomes = [first, second];
    let wins = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(wins, 1, "exactly one writer must succeed: {outcomes:?}");
    assert!(outcomes
        .iter()
        .any(|outcome| matches!(outcome, Err(RepositoryError::Conflict { .. }))));

    let stored = repo.find_by_id(&request.id).await.expect("find").expect("present");
    assert_eq!(stored.version, 2);
    assert!(matches!(stored.status, RequestStatus::ManagerApproved | RequestStatus::Rejected));
    assert_eq!(stored.status == RequestStatus::Rejected, stored.rejection.is_some());
}
