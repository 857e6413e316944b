use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite};

use hrdesk_core::domain::payload::RequestPayload;
use hrdesk_core::domain::request::{
    ApprovalStamp, Rejection, Request, RequestId, RequestKind, RequestStatus,
};

use super::codec::{
    format_date, format_timestamp, from_json, parse_optional_timestamp, parse_timestamp,
    parse_u32, to_json,
};
use super::{RepositoryError, RequestFilter, RequestRepository};
use crate::DbPool;

const SELECT_COLUMNS: &str = "SELECT id, kind, requester_email, manager_email, status, \
     payload_json, manager_approved_by, manager_approved_at, admin_approved_by, \
     admin_approved_at, rejected_by, rejected_at, rejection_reason, reminder_task_ids_json, \
     version, created_at, updated_at FROM request";

pub struct SqlRequestRepository {
    pool: DbPool,
}

impl SqlRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: &RequestId) -> Result<bool, RepositoryError> {
        let row = sqlx::query("SELECT 1 AS present FROM request WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn conflict_or_missing(&self, id: &RequestId) -> RepositoryError {
        match self.exists(id).await {
            Ok(true) => RepositoryError::Conflict { id: id.0.clone() },
            Ok(false) => RepositoryError::NotFound { id: id.0.clone() },
            Err(error) => error,
        }
    }
}

#[async_trait]
impl RequestRepository for SqlRequestRepository {
    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(request_from_row).transpose()
    }

    async fn insert(&self, request: &Request) -> Result<(), RepositoryError> {
        let columns = RequestColumns::encode(request)?;

        sqlx::query(
            "INSERT INTO request (
                id, kind, requester_email, manager_email, status, start_date, end_date,
                payload_json, manager_approved_by, manager_approved_at, admin_approved_by,
                admin_approved_at, rejected_by, rejected_at, rejection_reason,
                reminder_task_ids_json, version, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id.0)
        .bind(request.kind().as_str())
        .bind(&request.requester_email)
        .bind(&request.manager_email)
        .bind(request.status.as_str())
        .bind(&columns.start_date)
        .bind(&columns.end_date)
        .bind(&columns.payload_json)
        .bind(&columns.manager_approved_by)
        .bind(&columns.manager_approved_at)
        .bind(&columns.admin_approved_by)
        .bind(&columns.admin_approved_at)
        .bind(&columns.rejected_by)
        .bind(&columns.rejected_at)
        .bind(&columns.rejection_reason)
        .bind(to_json("reminder_task_ids_json", &request.reminder_task_ids)?)
        .bind(i64::from(request.version))
        .bind(format_timestamp(request.created_at))
        .bind(format_timestamp(request.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|error| RepositoryError::from_insert(error, format!("request `{}`", request.id)))?;

        Ok(())
    }

    async fn compare_and_set(
        &self,
        expected_status: RequestStatus,
        expected_version: u32,
        next: &Request,
    ) -> Result<(), RepositoryError> {
        let columns = RequestColumns::encode(next)?;

        let result = sqlx::query(
            "UPDATE request SET
                kind = ?, status = ?, start_date = ?, end_date = ?, payload_json = ?,
                manager_approved_by = ?, manager_approved_at = ?,
                admin_approved_by = ?, admin_approved_at = ?,
                rejected_by = ?, rejected_at = ?, rejection_reason = ?,
                version = ?, updated_at = ?
             WHERE id = ? AND status = ? AND version = ?",
        )
        .bind(next.kind().as_str())
        .bind(next.status.as_str())
        .bind(&columns.start_date)
        .bind(&columns.end_date)
        .bind(&columns.payload_json)
        .bind(&columns.manager_approved_by)
        .bind(&columns.manager_approved_at)
        .bind(&columns.admin_approved_by)
        .bind(&columns.admin_approved_at)
        .bind(&columns.rejected_by)
        .bind(&columns.rejected_at)
        .bind(&columns.rejection_reason)
        .bind(i64::from(next.version))
        .bind(format_timestamp(next.updated_at))
        .bind(&next.id.0)
        .bind(expected_status.as_str())
        .bind(i64::from(expected_version))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.conflict_or_missing(&next.id).await);
        }
        Ok(())
    }

    async fn delete_if(
        &self,
        id: &RequestId,
        expected_status: RequestStatus,
        expected_version: u32,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM request WHERE id = ? AND status = ? AND version = ?")
            .bind(&id.0)
            .bind(expected_status.as_str())
            .bind(i64::from(expected_version))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(self.conflict_or_missing(id).await);
        }
        Ok(())
    }

    async fn append_reminder_task(
        &self,
        id: &RequestId,
        task_id: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE request
             SET reminder_task_ids_json = json_insert(reminder_task_ids_json, '$[#]', ?)
             WHERE id = ?",
        )
        .bind(task_id)
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound { id: id.0.clone() });
        }
        Ok(())
    }

    async fn remove_reminder_tasks(
        &self,
        id: &RequestId,
        task_ids: &[String],
    ) -> Result<(), RepositoryError> {
        if task_ids.is_empty() {
            return Ok(());
        }

        // Read-modify-write inside one statement keeps concurrent appends intact.
        let result = sqlx::query(
            "UPDATE request
             SET reminder_task_ids_json = (
                 SELECT IFNULL(json_group_array(task.value), '[]')
                 FROM json_each(request.reminder_task_ids_json) AS task
                 WHERE task.value NOT IN (SELECT value FROM json_each(?))
             )
             WHERE id = ?",
        )
        .bind(to_json("reminder_task_ids", &task_ids)?)
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound { id: id.0.clone() });
        }
        Ok(())
    }

    async fn list(&self, filter: &RequestFilter) -> Result<Vec<Request>, RepositoryError> {
        let mut query = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
        query.push(" WHERE 1 = 1");

        if let Some(email) = &filter.requester_email {
            query.push(" AND requester_email = ").push_bind(email.clone());
        }
        if let Some(email) = &filter.manager_email {
            query.push(" AND manager_email = ").push_bind(email.clone());
        }
        if !filter.statuses.is_empty() {
            query.push(" AND status IN (");
            let mut separated = query.separated(", ");
            for status in &filter.statuses {
                separated.push_bind(status.as_str());
            }
            separated.push_unseparated(")");
        }
        if let Some(kind) = filter.kind {
            query.push(" AND kind = ").push_bind(kind.as_str());
        }
        if let Some(bound) = filter.starts_on_or_after {
            query.push(" AND start_date >= ").push_bind(format_date(bound));
        }
        if let Some(bound) = filter.starts_on_or_before {
            query.push(" AND start_date <= ").push_bind(format_date(bound));
        }
        query.push(" ORDER BY created_at DESC, id DESC");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(request_from_row).collect()
    }
}

/// Column values shared by insert and compare-and-set.
struct RequestColumns {
    start_date: Option<String>,
    end_date: Option<String>,
    payload_json: String,
    manager_approved_by: Option<String>,
    manager_approved_at: Option<String>,
    admin_approved_by: Option<String>,
    admin_approved_at: Option<String>,
    rejected_by: Option<String>,
    rejected_at: Option<String>,
    rejection_reason: Option<String>,
}

impl RequestColumns {
    fn encode(request: &Request) -> Result<Self, RepositoryError> {
        let range = request.payload.date_range();
        let stamp_by = |stamp: &Option<ApprovalStamp>| stamp.as_ref().map(|s| s.by.clone());
        let stamp_at =
            |stamp: &Option<ApprovalStamp>| stamp.as_ref().map(|s| format_timestamp(s.at));

        Ok(Self {
            start_date: range.map(|(start, _)| format_date(start)),
            end_date: range.map(|(_, end)| format_date(end)),
            payload_json: to_json("payload_json", &request.payload)?,
            manager_approved_by: stamp_by(&request.manager_approval),
            manager_approved_at: stamp_at(&request.manager_approval),
            admin_approved_by: stamp_by(&request.admin_approval),
            admin_approved_at: stamp_at(&request.admin_approval),
            rejected_by: request.rejection.as_ref().map(|r| r.by.clone()),
            rejected_at: request.rejection.as_ref().map(|r| format_timestamp(r.at)),
            rejection_reason: request.rejection.as_ref().map(|r| r.reason.clone()),
        })
    }
}

fn request_from_row(row: SqliteRow) -> Result<Request, RepositoryError> {
    let raw_kind: String = row.try_get("kind")?;
    let kind = RequestKind::parse(&raw_kind)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown request kind `{raw_kind}`")))?;
    let raw_status: String = row.try_get("status")?;
    let status = RequestStatus::parse(&raw_status)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown request status `{raw_status}`")))?;

    let payload_json: String = row.try_get("payload_json")?;
    let payload: RequestPayload = from_json("payload_json", &payload_json)?;
    if payload.kind() != kind {
        return Err(RepositoryError::Decode(format!(
            "payload kind `{}` does not match column kind `{raw_kind}`",
            payload.kind().as_str()
        )));
    }

    let manager_approval = stamp_from_row(&row, "manager_approved_by", "manager_approved_at")?;
    let admin_approval = stamp_from_row(&row, "admin_approved_by", "admin_approved_at")?;

    let rejected_by: Option<String> = row.try_get("rejected_by")?;
    let rejected_at = parse_optional_timestamp("rejected_at", row.try_get("rejected_at")?)?;
    let rejection_reason: Option<String> = row.try_get("rejection_reason")?;
    let rejection = match (rejected_by, rejected_at) {
        (Some(by), Some(at)) => {
            Some(Rejection { by, at, reason: rejection_reason.unwrap_or_default() })
        }
        _ => None,
    };

    let reminder_json: String = row.try_get("reminder_task_ids_json")?;

    Ok(Request {
        id: RequestId(row.try_get("id")?),
        requester_email: row.try_get("requester_email")?,
        manager_email: row.try_get("manager_email")?,
        status,
        payload,
        manager_approval,
        admin_approval,
        rejection,
        reminder_task_ids: from_json("reminder_task_ids_json", &reminder_json)?,
        version: parse_u32("version", row.try_get("version")?)?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

fn stamp_from_row(
    row: &SqliteRow,
    by_column: &str,
    at_column: &str,
) -> Result<Option<ApprovalStamp>, RepositoryError> {
    let by: Option<String> = row.try_get(by_column)?;
    let at = parse_optional_timestamp(at_column, row.try_get(at_column)?)?;
    Ok(match (by, at) {
        (Some(by), Some(at)) => Some(ApprovalStamp { by, at }),
        _ => None,
    })
}
