use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use hrdesk_core::audit::{AuditAction, AuditEntry, AuditQuery};
use hrdesk_core::directory::normalize_email;
use hrdesk_core::domain::asset::{AssetChange, AssetId, AssetUpdate, EmployeeAsset, NewAsset};
use hrdesk_core::domain::request::RequestKind;
use hrdesk_core::errors::ApplicationError;
use hrdesk_core::workflow::{Actor, TransitionError};

use crate::service::{new_correlation_id, RequestService};
use crate::stores::storage_error;

pub const ASSET_RESOURCE: &str = "employee_asset";

impl RequestService {
    /// Visible to the holder, the holder's manager and admins.
    pub async fn get_asset(
        &self,
        id: &AssetId,
        actor_email: &str,
    ) -> Result<EmployeeAsset, ApplicationError> {
        let asset = self.load_asset(id).await?;
        let actor = Actor::resolve(actor_email, self.directory.as_ref());
        if !actor.is(&asset.employee_email) && !self.manages_holder(&actor, &asset.employee_email) {
            return Err(TransitionError::RoleRequired {
                operation: "get_asset",
                role: "the holder, the holder's manager or admins",
            }
            .into());
        }
        Ok(asset)
    }

    /// Registers an asset handed out outside the request workflow.
    pub async fn create_asset(
        &self,
        actor_email: &str,
        asset: NewAsset,
    ) -> Result<EmployeeAsset, ApplicationError> {
        let correlation_id = new_correlation_id();
        asset.validate()?;
        let actor = Actor::resolve(actor_email, self.directory.as_ref());
        let holder = normalize_email(&asset.employee_email);
        self.authorize_inventory(&correlation_id, "create_asset", &actor, &holder)?;

        let now = self.clock.now();
        let record = EmployeeAsset::register(asset, &actor.email, now);
        let entry = AuditEntry::new(
            actor.email.clone(),
            AuditAction::Create,
            ASSET_RESOURCE,
            record.id.0.clone(),
            now,
        )
        .with_detail("employee_email", record.employee_email.clone())
        .with_detail("category", record.category.as_str())
        .with_detail("description", record.description.clone());

        self.stores.assets.insert(&record).await.map_err(|error| storage_error(ASSET_RESOURCE, error))?;
        if let Err(error) = self.append_audit(&correlation_id, &entry).await {
            let compensated = self.stores.assets.remove(&record.id).await.is_ok();
            error!(
                event_name = "audit.write.failed",
                correlation_id = %correlation_id,
                asset_id = %record.id,
                action = entry.action.as_str(),
                compensated,
                error = %error,
                "audit entry could not be written; asset registration undone"
            );
            return Err(ApplicationError::AuditWriteFailure {
                resource_id: record.id.0.clone(),
                message: error.to_string(),
                compensated,
            });
        }

        info!(
            event_name = "inventory.asset.created",
            correlation_id = %correlation_id,
            asset_id = %record.id,
            holder = %record.employee_email,
            actor = %actor.email,
            "asset registered"
        );
        Ok(record)
    }

    /// Status changes, reassignment and field edits. All changed fields land
    /// in a single audit entry.
    pub async fn update_asset(
        &self,
        id: &AssetId,
        actor_email: &str,
        update: AssetUpdate,
    ) -> Result<EmployeeAsset, ApplicationError> {
        let correlation_id = new_correlation_id();
        update.validate()?;
        let current = self.load_asset(id).await?;
        let actor = Actor::resolve(actor_email, self.directory.as_ref());
        self.authorize_inventory(&correlation_id, "update_asset", &actor, &current.employee_email)?;

        let now = self.clock.now();
        let (next, changes) = current.apply(&update, now);
        let Some(first) = changes.first() else {
            debug!(
                event_name = "inventory.asset.unchanged",
                correlation_id = %correlation_id,
                asset_id = %current.id,
                "update matched the stored asset"
            );
            return Ok(current);
        };
        let entry = change_entry(&actor, &next, &changes, now);

        self.stores
            .assets
            .compare_and_set(current.version, &next)
            .await
            .map_err(|error| storage_error(ASSET_RESOURCE, error))?;
        if let Err(error) = self.append_audit(&correlation_id, &entry).await {
            let mut restored = current.clone();
            restored.version = next.version.saturating_add(1);
            restored.updated_at = self.clock.now().max(next.updated_at);
            let compensated =
                self.stores.assets.compare_and_set(next.version, &restored).await.is_ok();
            error!(
                event_name = "audit.write.failed",
                correlation_id = %correlation_id,
                asset_id = %next.id,
                action = entry.action.as_str(),
                compensated,
                error = %error,
                "audit entry could not be written; asset update reverted"
            );
            return Err(ApplicationError::AuditWriteFailure {
                resource_id: next.id.0.clone(),
                message: error.to_string(),
                compensated,
            });
        }

        info!(
            event_name = "inventory.asset.updated",
            correlation_id = %correlation_id,
            asset_id = %next.id,
            actor = %actor.email,
            change = first.kind(),
            fields = changes.len(),
            version = next.version,
            "asset updated"
        );
        Ok(next)
    }

    /// The asset's history, oldest first. Assets that came from an approved
    /// request start with that final approval.
    pub async fn asset_trail(
        &self,
        id: &AssetId,
        actor_email: &str,
    ) -> Result<Vec<AuditEntry>, ApplicationError> {
        let asset = self.get_asset(id, actor_email).await?;
        let mut trail = Vec::new();
        if let Some(request_id) = &asset.asset_request_id {
            let query = AuditQuery::default()
                .resource(RequestKind::Asset.resource_type(), request_id.0.clone())
                .action(AuditAction::ApproveAdmin);
            trail.extend(self.find_audit(&query).await?);
        }
        trail.extend(self.resource_trail(ASSET_RESOURCE, &asset.id.0).await?);
        trail.sort_by_key(|entry| entry.timestamp);
        Ok(trail)
    }

    async fn load_asset(&self, id: &AssetId) -> Result<EmployeeAsset, ApplicationError> {
        self.stores
            .assets
            .find_by_id(id)
            .await
            .map_err(|error| storage_error(ASSET_RESOURCE, error))?
            .ok_or_else(|| ApplicationError::not_found(ASSET_RESOURCE, id.0.clone()))
    }

    fn manages_holder(&self, actor: &Actor, holder: &str) -> bool {
        actor.is_admin || self.directory.manager_of(holder).is_some_and(|manager| actor.is(&manager))
    }

    fn authorize_inventory(
        &self,
        correlation_id: &str,
        operation: &'static str,
        actor: &Actor,
        holder: &str,
    ) -> Result<(), ApplicationError> {
        if self.manages_holder(actor, holder) {
            return Ok(());
        }
        info!(
            event_name = "inventory.command.refused",
            correlation_id = %correlation_id,
            operation,
            actor = %actor.email,
            holder = %holder,
            "command refused"
        );
        Err(TransitionError::RoleRequired { operation, role: "the holder's manager or admins" }.into())
    }
}

/// `fields` lists what moved, in order; each field carries `<field>.old` and `<field>.new`.
fn change_entry(
    actor: &Actor,
    asset: &EmployeeAsset,
    changes: &[AssetChange],
    now: DateTime<Utc>,
) -> AuditEntry {
    let fields: Vec<&str> = changes.iter().map(|change| change.field).collect();
    let mut entry =
        AuditEntry::new(actor.email.clone(), AuditAction::Update, ASSET_RESOURCE, asset.id.0.clone(), now)
            .with_detail("fields", fields.join(","));
    if let Some(first) = changes.first() {
        entry = entry.with_detail("change", first.kind());
    }
    for change in changes {
        entry = entry
            .with_detail(format!("{}.old", change.field), change.old.clone())
            .with_detail(format!("{}.new", change.field), change.new.clone());
    }
    entry
}
