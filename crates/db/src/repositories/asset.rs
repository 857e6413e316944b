use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row};

use hrdesk_core::domain::asset::{AssetId, AssetStatus, EmployeeAsset};
use hrdesk_core::domain::payload::AssetCategory;
use hrdesk_core::domain::request::RequestId;

use super::codec::{format_date, format_timestamp, parse_date, parse_optional_decimal, parse_timestamp};
use super::{AssetRepository, RepositoryError};
use crate::DbPool;

const SELECT_COLUMNS: &str = "SELECT id, employee_email, asset_request_id, category, description, \
     serial_number, purchase_url, purchase_cost, status, notes, assigned_by, assigned_date, \
     created_at, updated_at, version \
     FROM employee_asset";

pub struct SqlAssetRepository {
    pool: DbPool,
}

impl SqlAssetRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn conflict_or_missing(&self, id: &AssetId) -> RepositoryError {
        let exists = sqlx::query("SELECT 1 FROM employee_asset WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await;
        match exists {
            Ok(Some(_)) => RepositoryError::Conflict { id: id.0.clone() },
            Ok(None) => RepositoryError::NotFound { id: id.0.clone() },
            Err(error) => error.into(),
        }
    }
}

#[async_trait]
impl AssetRepository for SqlAssetRepository {
    async fn insert(&self, asset: &EmployeeAsset) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO employee_asset (
                id, employee_email, asset_request_id, category, description, serial_number,
                purchase_url, purchase_cost, status, notes, assigned_by, assigned_date,
                created_at, updated_at, version
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&asset.id.0)
        .bind(&asset.employee_email)
        .bind(asset.asset_request_id.as_ref().map(|id| id.0.as_str()))
        .bind(asset.category.as_str())
        .bind(&asset.description)
        .bind(&asset.serial_number)
        .bind(&asset.purchase_url)
        .bind(asset.purchase_cost.map(|cost| cost.to_string()))
        .bind(asset.status.as_str())
        .bind(&asset.notes)
        .bind(&asset.assigned_by)
        .bind(format_date(asset.assigned_date))
        .bind(format_timestamp(asset.created_at))
        .bind(format_timestamp(asset.updated_at))
        .bind(i64::from(asset.version))
        .execute(&self.pool)
        .await
        .map_err(|error| RepositoryError::from_insert(error, duplicate_label(asset)))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &AssetId) -> Result<Option<EmployeeAsset>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(asset_from_row).transpose()
    }

    async fn list_for_employee(
        &self,
        email: &str,
    ) -> Result<Vec<EmployeeAsset>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE employee_email = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(asset_from_row).collect()
    }

    async fn compare_and_set(
        &self,
        expected_version: u32,
        next: &EmployeeAsset,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE employee_asset SET
                employee_email = ?, description = ?, serial_number = ?, status = ?, notes = ?,
                updated_at = ?, version = ?
             WHERE id = ? AND version = ?",
        )
        .bind(&next.employee_email)
        .bind(&next.description)
        .bind(&next.serial_number)
        .bind(next.status.as_str())
        .bind(&next.notes)
        .bind(format_timestamp(next.updated_at))
        .bind(i64::from(next.version))
        .bind(&next.id.0)
        .bind(i64::from(expected_version))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.conflict_or_missing(&next.id).await);
        }
        Ok(())
    }

    async fn remove(&self, id: &AssetId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM employee_asset WHERE id = ?").bind(&id.0).execute(&self.pool).await?;
        Ok(())
    }
}

fn duplicate_label(asset: &EmployeeAsset) -> String {
    match &asset.asset_request_id {
        Some(request_id) => format!("inventory record for request `{request_id}`"),
        None => format!("inventory record `{}`", asset.id),
    }
}

fn asset_from_row(row: SqliteRow) -> Result<EmployeeAsset, RepositoryError> {
    let raw_category: String = row.try_get("category")?;
    let category = AssetCategory::parse(&raw_category)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown asset category `{raw_category}`")))?;
    let raw_status: String = row.try_get("status")?;
    let status = AssetStatus::parse(&raw_status)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown asset status `{raw_status}`")))?;
    let version: i64 = row.try_get("version")?;

    Ok(EmployeeAsset {
        id: AssetId(row.try_get("id")?),
        employee_email: row.try_get("employee_email")?,
        asset_request_id: row.try_get::<Option<String>, _>("asset_request_id")?.map(RequestId),
        category,
        description: row.try_get("description")?,
        serial_number: row.try_get("serial_number")?,
        purchase_url: row.try_get("purchase_url")?,
        purchase_cost: parse_optional_decimal("purchase_cost", row.try_get("purchase_cost")?)?,
        status,
        notes: row.try_get("notes")?,
        assigned_by: row.try_get("assigned_by")?,
        assigned_date: parse_date("assigned_date", row.try_get("assigned_date")?)?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
        version: u32::try_from(version)
            .map_err(|_| RepositoryError::Decode(format!("asset version out of range: {version}")))?,
    })
}
