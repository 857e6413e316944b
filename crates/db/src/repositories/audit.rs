use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite};

use hrdesk_core::audit::{
    AuditAction, AuditEntry, AuditEntryId, AuditQuery, AuditSummary, RESOURCE_TRAIL_LIMIT,
};

use super::codec::{format_timestamp, from_json, parse_timestamp, to_json};
use super::{AuditRepository, RepositoryError};
use crate::DbPool;

const SELECT_COLUMNS: &str = "SELECT id, actor_email, action, resource_type, resource_id, \
     details_json, timestamp FROM audit_log";

pub struct SqlAuditRepository {
    pool: DbPool,
}

impl SqlAuditRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, filter: &AuditQuery) {
    query.push(" WHERE 1 = 1");
    if let Some(actor) = &filter.actor_email {
        query.push(" AND actor_email = ").push_bind(actor.clone());
    }
    if let Some(resource_type) = &filter.resource_type {
        query.push(" AND resource_type = ").push_bind(resource_type.clone());
    }
    if let Some(resource_id) = &filter.resource_id {
        query.push(" AND resource_id = ").push_bind(resource_id.clone());
    }
    if let Some(action) = filter.action {
        query.push(" AND action = ").push_bind(action.as_str());
    }
    if let Some(since) = filter.since {
        query.push(" AND timestamp >= ").push_bind(format_timestamp(since));
    }
    if let Some(until) = filter.until {
        query.push(" AND timestamp <= ").push_bind(format_timestamp(until));
    }
}

#[async_trait]
impl AuditRepository for SqlAuditRepository {
    async fn append(&self, entry: &AuditEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO audit_log (
                id, actor_email, action, resource_type, resource_id, details_json, timestamp
            ) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.id.0)
        .bind(&entry.actor_email)
        .bind(entry.action.as_str())
        .bind(&entry.resource_type)
        .bind(&entry.resource_id)
        .bind(to_json("details_json", &entry.details)?)
        .bind(format_timestamp(entry.timestamp))
        .execute(&self.pool)
        .await
        .map_err(|error| RepositoryError::from_insert(error, format!("audit entry `{}`", entry.id.0)))?;

        Ok(())
    }

    async fn find(&self, filter: &AuditQuery) -> Result<Vec<AuditEntry>, RepositoryError> {
        let mut query = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
        push_filters(&mut query, filter);
        query.push(" ORDER BY timestamp DESC, seq DESC LIMIT ");
        query.push_bind(i64::try_from(filter.limit).unwrap_or(i64::MAX));

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(entry_from_row).collect()
    }

    async fn resource_trail(
        &self,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<Vec<AuditEntry>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE resource_type = ? AND resource_id = ?
             ORDER BY timestamp ASC, seq ASC LIMIT ?"
        ))
        .bind(resource_type)
        .bind(resource_id)
        .bind(RESOURCE_TRAIL_LIMIT as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(entry_from_row).collect()
    }

    async fn summarize(&self, filter: &AuditQuery) -> Result<AuditSummary, RepositoryError> {
        let mut query =
            QueryBuilder::<Sqlite>::new("SELECT action, actor_email, COUNT(*) AS total FROM audit_log");
        push_filters(&mut query, filter);
        query.push(" GROUP BY action, actor_email");

        let rows = query.build().fetch_all(&self.pool).await?;
        let mut summary = AuditSummary::default();
        for row in rows {
            let action: String = row.try_get("action")?;
            let actor: String = row.try_get("actor_email")?;
            let total: i64 = row.try_get("total")?;
            let total = u64::try_from(total)
                .map_err(|_| RepositoryError::Decode(format!("negative audit count {total}")))?;

            summary.total += total;
            *summary.by_action.entry(action).or_default() += total;
            *summary.by_actor.entry(actor).or_default() += total;
        }
        Ok(summary)
    }
}

fn entry_from_row(row: SqliteRow) -> Result<AuditEntry, RepositoryError> {
    let raw_action: String = row.try_get("action")?;
    let action = AuditAction::parse(&raw_action)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown audit action `{raw_action}`")))?;
    let details_json: String = row.try_get("details_json")?;
    let details: BTreeMap<String, String> = from_json("details_json", &details_json)?;

    Ok(AuditEntry {
        id: AuditEntryId(row.try_get("id")?),
        actor_email: row.try_get("actor_email")?,
        action,
        resource_type: row.try_get("resource_type")?,
        resource_id: row.try_get("resource_id")?,
        details,
        timestamp: parse_timestamp("timestamp", row.try_get("timestamp")?)?,
    })
}
