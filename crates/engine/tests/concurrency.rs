mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Barrier;

use hrdesk_core::audit::{AuditAction, AuditQuery};
use hrdesk_core::domain::request::{Request, RequestId, RequestStatus};
use hrdesk_core::errors::ApplicationError;
use hrdesk_core::notify::RecordingDispatcher;
use hrdesk_db::{
    connect_with_settings, migrations, InMemoryRequestRepository, RepositoryError, RequestFilter,
    RequestRepository, SqlRequestRepository,
};
use hrdesk_engine::{RequestService, Stores};

use support::{date, service_with, vacation, ANA, BOSS, OPS};

/// Once armed, holds the next `gated` reads until all of them have loaded the
/// same row.
struct LockstepReads<R> {
    inner: R,
    barrier: Barrier,
    gated: usize,
    remaining: AtomicUsize,
}

impl<R> LockstepReads<R> {
    fn new(inner: R, gated: usize) -> Self {
        Self { inner, barrier: Barrier::new(gated), gated, remaining: AtomicUsize::new(0) }
    }

    fn arm(&self) {
        self.remaining.store(self.gated, Ordering::SeqCst);
    }
}

#[async_trait]
impl<R: RequestRepository> RequestRepository for LockstepReads<R> {
    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError> {
        let found = self.inner.find_by_id(id).await?;
        let gated = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if gated {
            self.barrier.wait().await;
        }
        Ok(found)
    }

    async fn insert(&self, request: &Request) -> Result<(), RepositoryError> {
        self.inner.insert(request).await
    }

    async fn compare_and_set(
        &self,
        expected_status: RequestStatus,
        expected_version: u32,
        next: &Request,
    ) -> Result<(), RepositoryError> {
        self.inner.compare_and_set(expected_status, expected_version, next).await
    }

    async fn delete_if(
        &self,
        id: &RequestId,
        expected_status: RequestStatus,
        expected_version: u32,
    ) -> Result<(), RepositoryError> {
        self.inner.delete_if(id, expected_status, expected_version).await
    }

    async fn append_reminder_task(
        &self,
        id: &RequestId,
        task_id: &str,
    ) -> Result<(), RepositoryError> {
        self.inner.append_reminder_task(id, task_id).await
    }

    async fn remove_reminder_tasks(
        &self,
        id: &RequestId,
        task_ids: &[String],
    ) -> Result<(), RepositoryError> {
        self.inner.remove_reminder_tasks(id, task_ids).await
    }

    async fn list(&self, filter: &RequestFilter) -> Result<Vec<Request>, RepositoryError> {
        self.inner.list(filter).await
    }
}

async fn race_two_decisions<R>(service: &RequestService, reads: &LockstepReads<R>) {
    let created = service
        .create(ANA, vacation(date(2026, 3, 9), date(2026, 3, 10)))
        .await
        .expect("create");
    // Prompt bookkeeping reads the request too; keep it out of the gate.
    service.drain_notifications().await;
    reads.arm();

    let (manager, admin_reject) = tokio::join!(
        service.approve_as_manager(&created.id, BOSS),
        service.reject(&created.id, OPS, Some("budget freeze".into())),
    );

    let outcomes = [manager.map(|request| request.status), admin_reject.map(|request| request.status)];
    let winners: Vec<_> = outcomes.iter().filter_map(|outcome| outcome.as_ref().ok()).collect();
    let conflicts = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, Err(ApplicationError::Conflict { .. })))
        .count();
    assert_eq!(winners.len(), 1, "exactly one decision lands: {outcomes:?}");
    assert_eq!(conflicts, 1);

    let stored = service.get(&created.id, ANA).await.expect("get");
    assert_eq!(stored.version, 2);
    assert_eq!(&stored.status, winners[0]);

    let decisions = service
        .find_audit(&AuditQuery::default().resource("timeoff_request", created.id.0.clone()))
        .await
        .expect("find")
        .into_iter()
        .filter(|entry| entry.action != AuditAction::Create)
        .count();
    assert_eq!(decisions, 1, "the losing writer leaves no audit entry");
}

async fn race_two_manager_approvals<R>(service: &RequestService, reads: &LockstepReads<R>) {
    let created = service
        .create(ANA, vacation(date(2026, 3, 9), date(2026, 3, 10)))
        .await
        .expect("create");
    // Prompt bookkeeping reads the request too; keep it out of the gate.
    service.drain_notifications().await;
    reads.arm();

    let (first, second) = tokio::join!(
        service.approve_as_manager(&created.id, BOSS),
        service.approve_as_manager(&created.id, BOSS),
    );

    let outcomes = [first.map(|request| request.status), second.map(|request| request.status)];
    let winners = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    let conflicts = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, Err(ApplicationError::Conflict { .. })))
        .count();
    assert_eq!(winners, 1, "exactly one approval lands: {outcomes:?}");
    assert_eq!(conflicts, 1);

    let stored = service.get(&created.id, ANA).await.expect("get");
    assert_eq!(stored.status, RequestStatus::ManagerApproved);
    assert_eq!(stored.version, 2);

    let approvals = service
        .find_audit(
            &AuditQuery::default()
                .resource("timeoff_request", created.id.0.clone())
                .action(AuditAction::ApproveManager),
        )
        .await
        .expect("find");
    assert_eq!(approvals.len(), 1);
}

#[tokio::test]
async fn racing_approvers_produce_one_winner_in_memory() {
    let reads = Arc::new(LockstepReads::new(InMemoryRequestRepository::default(), 2));
    let stores = Stores { requests: reads.clone(), ..Stores::in_memory() };
    let service = service_with(stores, RecordingDispatcher::default());

    race_two_decisions(&service, &*reads).await;
}

#[tokio::test]
async fn racing_approvers_produce_one_winner_on_sqlite() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("hrdesk.db").display());
    let pool = connect_with_settings(&url, 4, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");

    let reads = Arc::new(LockstepReads::new(SqlRequestRepository::new(pool.clone()), 2));
    let stores = Stores { requests: reads.clone(), ..Stores::sqlite(pool) };
    let service = service_with(stores, RecordingDispatcher::default());

    race_two_decisions(&service, &*reads).await;
}

#[tokio::test]
async fn duplicate_manager_approvals_produce_one_winner_in_memory() {
    let reads = Arc::new(LockstepReads::new(InMemoryRequestRepository::default(), 2));
    let stores = Stores { requests: reads.clone(), ..Stores::in_memory() };
    let service = service_with(stores, RecordingDispatcher::default());

    race_two_manager_approvals(&service, &*reads).await;
}

#[tokio::test]
async fn duplicate_manager_approvals_produce_one_winner_on_sqlite() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("hrdesk.db").display());
    let pool = connect_with_settings(&url, 4, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");

    let reads = Arc::new(LockstepReads::new(SqlRequestRepository::new(pool.clone()), 2));
    let stores = Stores { requests: reads.clone(), ..Stores::sqlite(pool) };
    let service = service_with(stores, RecordingDispatcher::default());

    race_two_manager_approvals(&service, &*reads).await;
}
