use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row};

use hrdesk_core::domain::justification::{JustificationId, JustificationStatus, TripJustification};
use hrdesk_core::domain::request::RequestId;

use super::codec::{
    format_timestamp, parse_optional_decimal, parse_optional_timestamp, parse_timestamp,
    parse_u32,
};
use super::{JustificationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlJustificationRepository {
    pool: DbPool,
}

impl SqlJustificationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JustificationRepository for SqlJustificationRepository {
    async fn insert(&self, justification: &TripJustification) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO trip_justification (
                id, trip_request_id, employee_email, submission_number, status, submitted_at,
                reviewed_by, reviewed_at, admin_feedback, total_claimed, total_approved, notes
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&justification.id.0)
        .bind(&justification.trip_request_id.0)
        .bind(&justification.employee_email)
        .bind(i64::from(justification.submission_number))
        .bind(justification.status.as_str())
        .bind(format_timestamp(justification.submitted_at))
        .bind(&justification.reviewed_by)
        .bind(justification.reviewed_at.map(format_timestamp))
        .bind(&justification.admin_feedback)
        .bind(justification.total_claimed.map(|value| value.to_string()))
        .bind(justification.total_approved.map(|value| value.to_string()))
        .bind(&justification.notes)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            RepositoryError::from_insert(
                error,
                format!(
                    "justification #{} for trip `{}`",
                    justification.submission_number, justification.trip_request_id
                ),
            )
        })?;

        Ok(())
    }

    async fn compare_and_set(
        &self,
        expected_status: JustificationStatus,
        next: &TripJustification,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE trip_justification SET
                status = ?, reviewed_by = ?, reviewed_at = ?, admin_feedback = ?,
                total_claimed = ?, total_approved = ?, notes = ?
             WHERE id = ? AND status = ?",
        )
        .bind(next.status.as_str())
        .bind(&next.reviewed_by)
        .bind(next.reviewed_at.map(format_timestamp))
        .bind(&next.admin_feedback)
        .bind(next.total_claimed.map(|value| value.to_string()))
        .bind(next.total_approved.map(|value| value.to_string()))
        .bind(&next.notes)
        .bind(&next.id.0)
        .bind(expected_status.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let present = sqlx::query("SELECT 1 AS present FROM trip_justification WHERE id = ?")
                .bind(&next.id.0)
                .fetch_optional(&self.pool)
                .await?
                .is_some();
            return Err(if present {
                RepositoryError::Conflict { id: next.id.0.clone() }
            } else {
                RepositoryError::NotFound { id: next.id.0.clone() }
            });
        }
        Ok(())
    }

    async fn delete(&self, justification: &TripJustification) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM trip_justification WHERE id = ?")
            .bind(&justification.id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_for_trip(
        &self,
        trip_request_id: &RequestId,
    ) -> Result<Vec<TripJustification>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, trip_request_id, employee_email, submission_number, status, submitted_at,
                    reviewed_by, reviewed_at, admin_feedback, total_claimed, total_approved, notes
             FROM trip_justification
             WHERE trip_request_id = ?
             ORDER BY submission_number ASC",
        )
        .bind(&trip_request_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(justification_from_row).collect()
    }
}

fn justification_from_row(row: SqliteRow) -> Result<TripJustification, RepositoryError> {
    let raw_status: String = row.try_get("status")?;
    let status = JustificationStatus::parse(&raw_status).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown justification status `{raw_status}`"))
    })?;

    Ok(TripJustification {
        id: JustificationId(row.try_get("id")?),
        trip_request_id: RequestId(row.try_get("trip_request_id")?),
        employee_email: row.try_get("employee_email")?,
        submission_number: parse_u32("submission_number", row.try_get("submission_number")?)?,
        status,
        submitted_at: parse_timestamp("submitted_at", row.try_get("submitted_at")?)?,
        reviewed_by: row.try_get("reviewed_by")?,
        reviewed_at: parse_optional_timestamp("reviewed_at", row.try_get("reviewed_at")?)?,
        admin_feedback: row.try_get("admin_feedback")?,
        total_claimed: parse_optional_decimal("total_claimed", row.try_get("total_claimed")?)?,
        total_approved: parse_optional_decimal("total_approved", row.try_get("total_approved")?)?,
        notes: row.try_get("notes")?,
    })
}
