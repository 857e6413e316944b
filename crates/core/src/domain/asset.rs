use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::directory::normalize_email;
use crate::domain::payload::{require_non_negative, require_text, AssetCategory, AssetPayload};
use crate::domain::request::RequestId;
use crate::errors::ValidationError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId(pub String);

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    Active,
    Returned,
    Damaged,
}

impl AssetStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Returned => "returned",
            Self::Damaged => "damaged",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "returned" => Some(Self::Returned),
            "damaged" => Some(Self::Damaged),
            _ => None,
        }
    }
}

/// Inventory record for company equipment or a subscription held by an employee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeAsset {
    pub id: AssetId,
    pub employee_email: String,
    /// The approved asset request this record came from; `None` when registered by hand.
    pub asset_request_id: Option<RequestId>,
    pub category: AssetCategory,
    pub description: String,
    pub serial_number: Option<String>,
    pub purchase_url: Option<String>,
    pub purchase_cost: Option<Decimal>,
    pub status: AssetStatus,
    pub notes: Option<String>,
    pub assigned_by: String,
    pub assigned_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u32,
}

impl EmployeeAsset {
    pub fn from_approved_request(
        request_id: &RequestId,
        employee_email: &str,
        payload: &AssetPayload,
        approver: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let misc = payload.is_misc();
        Self {
            id: AssetId(Uuid::new_v4().to_string()),
            employee_email: employee_email.to_string(),
            asset_request_id: Some(request_id.clone()),
            category: payload.category,
            description: payload.display_name(),
            serial_number: None,
            purchase_url: if misc { payload.purchase_url.clone() } else { None },
            purchase_cost: if misc { payload.estimated_cost } else { None },
            status: AssetStatus::Active,
            notes: None,
            assigned_by: approver.to_string(),
            assigned_date: now.date_naive(),
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    /// An asset handed out outside the request workflow.
    pub fn register(asset: NewAsset, assigned_by: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: AssetId(Uuid::new_v4().to_string()),
            employee_email: normalize_email(&asset.employee_email),
            asset_request_id: None,
            category: asset.category,
            description: asset.description.trim().to_string(),
            serial_number: non_blank(asset.serial_number.as_deref()),
            purchase_url: non_blank(asset.purchase_url.as_deref()),
            purchase_cost: asset.purchase_cost,
            status: AssetStatus::Active,
            notes: non_blank(asset.notes.as_deref()),
            assigned_by: normalize_email(assigned_by),
            assigned_date: now.date_naive(),
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    /// The record after `update`, with one [`AssetChange`] per field that
    /// actually moved. Version and timestamp only advance when something did.
    pub fn apply(&self, update: &AssetUpdate, now: DateTime<Utc>) -> (Self, Vec<AssetChange>) {
        let mut next = self.clone();
        let mut changes = Vec::new();

        if let Some(status) = update.status.filter(|status| *status != self.status) {
            changes.push(AssetChange::new("status", self.status.as_str(), status.as_str()));
            next.status = status;
        }
        if let Some(holder) = update.employee_email.as_deref().map(normalize_email) {
            if holder != self.employee_email {
                changes.push(AssetChange::new("employee_email", &self.employee_email, &holder));
                next.employee_email = holder;
            }
        }
        if let Some(description) = update.description.as_deref().map(str::trim) {
            if description != self.description {
                changes.push(AssetChange::new("description", &self.description, description));
                next.description = description.to_string();
            }
        }
        if let Some(serial) = update.serial_number.as_deref() {
            let serial = non_blank(Some(serial));
            if serial != self.serial_number {
                changes.push(AssetChange::optional("serial_number", &self.serial_number, &serial));
                next.serial_number = serial;
            }
        }
        if let Some(notes) = update.notes.as_deref() {
            let notes = non_blank(Some(notes));
            if notes != self.notes {
                changes.push(AssetChange::optional("notes", &self.notes, &notes));
                next.notes = notes;
            }
        }

        if !changes.is_empty() {
            next.version = self.version.saturating_add(1);
            next.updated_at = now.max(self.updated_at);
        }
        (next, changes)
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
}

/// Input for registering an asset by hand.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAsset {
    pub employee_email: String,
    pub category: AssetCategory,
    pub description: String,
    pub serial_number: Option<String>,
    pub purchase_url: Option<String>,
    pub purchase_cost: Option<Decimal>,
    pub notes: Option<String>,
}

impl NewAsset {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("employee_email", &self.employee_email)?;
        require_text("description", &self.description)?;
        if let Some(cost) = self.purchase_cost {
            require_non_negative("purchase_cost", cost)?;
        }
        Ok(())
    }
}

/// Partial edit of an inventory record. `None` leaves a field alone; an empty
/// serial number or note clears it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetUpdate {
    pub status: Option<AssetStatus>,
    /// New holder of the asset.
    pub employee_email: Option<String>,
    pub description: Option<String>,
    pub serial_number: Option<String>,
    pub notes: Option<String>,
}

impl AssetUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(holder) = &self.employee_email {
            require_text("employee_email", holder)?;
        }
        if let Some(description) = &self.description {
            require_text("description", description)?;
        }
        Ok(())
    }
}

/// One field of an inventory record before and after an update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AssetChange {
    pub field: &'static str,
    pub old: String,
    pub new: String,
}

impl AssetChange {
    fn new(field: &'static str, old: &str, new: &str) -> Self {
        Self { field, old: old.to_string(), new: new.to_string() }
    }

    fn optional(field: &'static str, old: &Option<String>, new: &Option<String>) -> Self {
        Self::new(field, old.as_deref().unwrap_or_default(), new.as_deref().unwrap_or_default())
    }

    pub fn kind(&self) -> &'static str {
        match self.field {
            "status" => "status_changed",
            "employee_email" => "reassigned",
            _ => "updated",
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{AssetStatus, AssetUpdate, EmployeeAsset, NewAsset};
    use crate::domain::payload::{AssetCategory, AssetPayload};
    use crate::domain::request::RequestId;

    fn laptop() -> EmployeeAsset {
        EmployeeAsset::register(
            NewAsset {
                employee_email: " Ana@Corp.Test ".to_string(),
                category: AssetCategory::Laptop,
                description: "ThinkPad X1".to_string(),
                serial_number: Some("SN-100".to_string()),
                purchase_url: None,
                purchase_cost: Some(Decimal::new(180_000, 2)),
                notes: Some("  ".to_string()),
            },
            "HR@corp.test",
            Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).single().expect("timestamp"),
        )
    }

    #[test]
    fn misc_requests_carry_purchase_details_into_inventory() {
        let payload = AssetPayload {
            category: AssetCategory::Misc,
            business_justification: "Field recordings".to_string(),
            custom_description: Some("Portable recorder".to_string()),
            purchase_url: Some("https://shop.example/recorder".to_string()),
            estimated_cost: Some(Decimal::new(21900, 2)),
        };
        let asset = EmployeeAsset::from_approved_request(
            &RequestId("req-9".to_string()),
            "ana@corp.test",
            &payload,
            "admin@corp.test",
            Utc::now(),
        );

        assert_eq!(asset.description, "Portable recorder");
        assert_eq!(asset.purchase_cost, Some(Decimal::new(21900, 2)));
        assert_eq!(asset.status, AssetStatus::Active);
        assert_eq!(asset.assigned_by, "admin@corp.test");
        assert_eq!(asset.asset_request_id, Some(RequestId("req-9".to_string())));
    }

    #[test]
    fn catalog_requests_omit_purchase_details() {
        let payload = AssetPayload {
            category: AssetCategory::Monitor,
            business_justification: "Second screen".to_string(),
            custom_description: None,
            purchase_url: Some("ignored".to_string()),
            estimated_cost: None,
        };
        let asset = EmployeeAsset::from_approved_request(
            &RequestId("req-10".to_string()),
            "ana@corp.test",
            &payload,
            "admin@corp.test",
            Utc::now(),
        );

        assert_eq!(asset.description, "monitor");
        assert!(asset.purchase_url.is_none());
    }

    #[test]
    fn registered_assets_normalize_emails_and_drop_blank_text() {
        let asset = laptop();

        assert_eq!(asset.employee_email, "ana@corp.test");
        assert_eq!(asset.assigned_by, "hr@corp.test");
        assert_eq!(asset.asset_request_id, None);
        assert_eq!(asset.notes, None);
        assert_eq!(asset.version, 1);
    }

    #[test]
    fn apply_reports_only_fields_that_moved() {
        let asset = laptop();
        let later = asset.updated_at + Duration::hours(1);
        let update = AssetUpdate {
            status: Some(AssetStatus::Returned),
            employee_email: Some("ANA@corp.test".to_string()),
            serial_number: Some(String::new()),
            ..AssetUpdate::default()
        };

        let (next, changes) = asset.apply(&update, later);

        let fields: Vec<&str> = changes.iter().map(|change| change.field).collect();
        assert_eq!(fields, ["status", "serial_number"]);
        assert_eq!(changes[0].kind(), "status_changed");
        assert_eq!((changes[0].old.as_str(), changes[0].new.as_str()), ("active", "returned"));
        assert_eq!((changes[1].old.as_str(), changes[1].new.as_str()), ("SN-100", ""));
        assert_eq!(next.serial_number, None);
        assert_eq!(next.version, 2);
        assert_eq!(next.updated_at, later);
    }

    #[test]
    fn reassignment_is_its_own_kind_of_change() {
        let asset = laptop();
        let update =
            AssetUpdate { employee_email: Some("Luis@corp.test".to_string()), ..AssetUpdate::default() };

        let (next, changes) = asset.apply(&update, asset.updated_at);

        assert_eq!(next.employee_email, "luis@corp.test");
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind(), "reassigned");
    }

    #[test]
    fn empty_updates_leave_the_record_untouched() {
        let asset = laptop();
        let same = AssetUpdate {
            status: Some(AssetStatus::Active),
            description: Some(" ThinkPad X1 ".to_string()),
            ..AssetUpdate::default()
        };

        let (next, changes) = asset.apply(&same, asset.updated_at + Duration::hours(2));

        assert!(changes.is_empty());
        assert_eq!(next, asset);
    }

    #[test]
    fn blank_descriptions_and_negative_costs_are_refused() {
        let blank = AssetUpdate { description: Some("   ".to_string()), ..AssetUpdate::default() };
        assert_eq!(blank.validate().expect_err("blank").field, "description");

        let negative = NewAsset {
            employee_email: "ana@corp.test".to_string(),
            category: AssetCategory::Chair,
            description: "Ergonomic chair".to_string(),
            serial_number: None,
            purchase_url: None,
            purchase_cost: Some(Decimal::new(-1, 0)),
            notes: None,
        };
        assert_eq!(negative.validate().expect_err("negative").field, "purchase_cost");
    }
}
