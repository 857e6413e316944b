use std::collections::HashMap;

use tokio::sync::RwLock;

use hrdesk_core::audit::{AuditEntry, AuditQuery, AuditSummary, RESOURCE_TRAIL_LIMIT};
use hrdesk_core::domain::asset::{AssetId, EmployeeAsset};
use hrdesk_core::domain::justification::{JustificationStatus, TripJustification};
use hrdesk_core::domain::request::{Request, RequestId, RequestStatus};

use super::{
    AssetRepository, AuditRepository, JustificationRepository, RepositoryError, RequestFilter,
    RequestRepository,
};

#[derive(Default)]
pub struct InMemoryRequestRepository {
    requests: RwLock<HashMap<String, Request>>,
}

#[async_trait::async_trait]
impl RequestRepository for InMemoryRequestRepository {
    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError> {
        let requests = self.requests.read().await;
        Ok(requests.get(&id.0).cloned())
    }

    async fn insert(&self, request: &Request) -> Result<(), RepositoryError> {
        let mut requests = self.requests.write().await;
        if requests.contains_key(&request.id.0) {
            return Err(RepositoryError::Duplicate(format!("request `{}`", request.id)));
        }
        requests.insert(request.id.0.clone(), request.clone());
        Ok(())
    }

    async fn compare_and_set(
        &self,
        expected_status: RequestStatus,
        expected_version: u32,
        next: &Request,
    ) -> Result<(), RepositoryError> {
        let mut requests = self.requests.write().await;
        let current = requests
            .get_mut(&next.id.0)
            .ok_or_else(|| RepositoryError::NotFound { id: next.id.0.clone() })?;
        if current.status != expected_status || current.version != expected_version {
            return Err(RepositoryError::Conflict { id: next.id.0.clone() });
        }

        let reminder_task_ids = std::mem::take(&mut current.reminder_task_ids);
        *current = Request { reminder_task_ids, ..next.clone() };
        Ok(())
    }

    async fn delete_if(
        &self,
        id: &RequestId,
        expected_status: RequestStatus,
        expected_version: u32,
    ) -> Result<(), RepositoryError> {
        let mut requests = self.requests.write().await;
        let current =
            requests.get(&id.0).ok_or_else(|| RepositoryError::NotFound { id: id.0.clone() })?;
        if current.status != expected_status || current.version != expected_version {
            return Err(RepositoryError::Conflict { id: id.0.clone() });
        }
        requests.remove(&id.0);
        Ok(())
    }

    async fn append_reminder_task(
        &self,
        id: &RequestId,
        task_id: &str,
    ) -> Result<(), RepositoryError> {
        let mut requests = self.requests.write().await;
        let current =
            requests.get_mut(&id.0).ok_or_else(|| RepositoryError::NotFound { id: id.0.clone() })?;
        current.reminder_task_ids.push(task_id.to_string());
        Ok(())
    }

    async fn remove_reminder_tasks(
        &self,
        id: &RequestId,
        task_ids: &[String],
    ) -> Result<(), RepositoryError> {
        let mut requests = self.requests.write().await;
        let current =
            requests.get_mut(&id.0).ok_or_else(|| RepositoryError::NotFound { id: id.0.clone() })?;
        current.reminder_task_ids.retain(|task| !task_ids.contains(task));
        Ok(())
    }

    async fn list(&self, filter: &RequestFilter) -> Result<Vec<Request>, RepositoryError> {
        let requests = self.requests.read().await;
        let mut matching: Vec<Request> =
            requests.values().filter(|request| filter.matches(request)).cloned().collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.0.cmp(&a.id.0)));
        Ok(matching)
    }
}

#[derive(Default)]
pub struct InMemoryJustificationRepository {
    justifications: RwLock<HashMap<String, TripJustification>>,
}

#[async_trait::async_trait]
impl JustificationRepository for InMemoryJustificationRepository {
    async fn insert(&self, justification: &TripJustification) -> Result<(), RepositoryError> {
        let mut justifications = self.justifications.write().await;
        let clashes = justifications.values().any(|existing| {
            existing.trip_request_id == justification.trip_request_id
                && (existing.submission_number == justification.submission_number
                    || (existing.status == JustificationStatus::PendingReview
                        && justification.status == JustificationStatus::PendingReview))
        });
        if clashes || justifications.contains_key(&justification.id.0) {
            return Err(RepositoryError::Duplicate(format!(
                "justification #{} for trip `{}`",
                justification.submission_number, justification.trip_request_id
            )));
        }
        justifications.insert(justification.id.0.clone(), justification.clone());
        Ok(())
    }

    async fn compare_and_set(
        &self,
        expected_status: JustificationStatus,
        next: &TripJustification,
    ) -> Result<(), RepositoryError> {
        let mut justifications = self.justifications.write().await;
        let current = justifications
            .get_mut(&next.id.0)
            .ok_or_else(|| RepositoryError::NotFound { id: next.id.0.clone() })?;
        if current.status != expected_status {
            return Err(RepositoryError::Conflict { id: next.id.0.clone() });
        }
        *current = next.clone();
        Ok(())
    }

    async fn delete(&self, justification: &TripJustification) -> Result<(), RepositoryError> {
        self.justifications.write().await.remove(&justification.id.0);
        Ok(())
    }

    async fn list_for_trip(
        &self,
        trip_request_id: &RequestId,
    ) -> Result<Vec<TripJustification>, RepositoryError> {
        let justifications = self.justifications.read().await;
        let mut matching: Vec<TripJustification> = justifications
            .values()
            .filter(|justification| &justification.trip_request_id == trip_request_id)
            .cloned()
            .collect();
        matching.sort_by_key(|justification| justification.submission_number);
        Ok(matching)
    }
}

#[derive(Default)]
pub struct InMemoryAssetRepository {
    assets: RwLock<HashMap<String, EmployeeAsset>>,
}

#[async_trait::async_trait]
impl AssetRepository for InMemoryAssetRepository {
    async fn insert(&self, asset: &EmployeeAsset) -> Result<(), RepositoryError> {
        let mut assets = self.assets.write().await;
        if let Some(request_id) = &asset.asset_request_id {
            if assets.values().any(|existing| existing.asset_request_id.as_ref() == Some(request_id)) {
                return Err(RepositoryError::Duplicate(format!(
                    "inventory record for request `{request_id}`"
                )));
            }
        }
        if assets.contains_key(&asset.id.0) {
            return Err(RepositoryError::Duplicate(format!("inventory record `{}`", asset.id)));
        }
        assets.insert(asset.id.0.clone(), asset.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &AssetId) -> Result<Option<EmployeeAsset>, RepositoryError> {
        Ok(self.assets.read().await.get(&id.0).cloned())
    }

    async fn list_for_employee(
        &self,
        email: &str,
    ) -> Result<Vec<EmployeeAsset>, RepositoryError> {
        let assets = self.assets.read().await;
        let mut owned: Vec<EmployeeAsset> =
            assets.values().filter(|asset| asset.employee_email == email).cloned().collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.0.cmp(&a.id.0)));
        Ok(owned)
    }

    async fn compare_and_set(
        &self,
        expected_version: u32,
        next: &EmployeeAsset,
    ) -> Result<(), RepositoryError> {
        let mut assets = self.assets.write().await;
        let current = assets
            .get_mut(&next.id.0)
            .ok_or_else(|| RepositoryError::NotFound { id: next.id.0.clone() })?;
        if current.version != expected_version {
            return Err(RepositoryError::Conflict { id: next.id.0.clone() });
        }
        *current = next.clone();
        Ok(())
    }

    async fn remove(&self, id: &AssetId) -> Result<(), RepositoryError> {
        self.assets.write().await.remove(&id.0);
        Ok(())
    }
}

/// Insertion order stands in for the SQL sequence column.
#[derive(Default)]
pub struct InMemoryAuditRepository {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditRepository {
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn append(&self, entry: &AuditEntry) -> Result<(), RepositoryError> {
        let mut entries = self.entries.write().await;
        if entries.iter().any(|existing| existing.id == entry.id) {
            return Err(RepositoryError::Duplicate(format!("audit entry `{}`", entry.id.0)));
        }
        entries.push(entry.clone());
        Ok(())
    }

    async fn find(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, RepositoryError> {
        let entries = self.entries.read().await;
        let mut matching: Vec<(usize, &AuditEntry)> =
            entries.iter().enumerate().filter(|(_, entry)| query.matches(entry)).collect();
        matching.sort_by(|(seq_a, a), (seq_b, b)| {
            b.timestamp.cmp(&a.timestamp).then_with(|| seq_b.cmp(seq_a))
        });
        Ok(matching.into_iter().take(query.limit).map(|(_, entry)| entry.clone()).collect())
    }

    async fn resource_trail(
        &self,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<Vec<AuditEntry>, RepositoryError> {
        let entries = self.entries.read().await;
        let mut trail: Vec<AuditEntry> = entries
            .iter()
            .filter(|entry| entry.resource_type == resource_type && entry.resource_id == resource_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps.
        trail.sort_by_key(|entry| entry.timestamp);
        trail.truncate(RESOURCE_TRAIL_LIMIT);
        Ok(trail)
    }

    async fn summarize(&self, query: &AuditQuery) -> Result<AuditSummary, RepositoryError> {
        let entries = self.entries.read().await;
        let mut summary = AuditSummary::default();
        for entry in entries.iter().filter(|entry| query.matches(entry)) {
            summary.record(entry);
        }
        Ok(summary)
    }
}
