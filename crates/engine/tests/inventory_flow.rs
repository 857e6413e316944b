mod support;

use rust_decimal::Decimal;

use hrdesk_core::audit::{AuditAction, AuditQuery};
use hrdesk_core::domain::asset::{AssetId, AssetStatus, AssetUpdate, NewAsset};
use hrdesk_core::domain::payload::AssetCategory;
use hrdesk_core::errors::ApplicationError;
use hrdesk_core::notify::RecordingDispatcher;
use hrdesk_db::{connect_with_settings, migrations};
use hrdesk_engine::{RequestService, Stores, ASSET_RESOURCE};

use support::{laptop, service, service_with, ANA, BOSS, HR, LEO, NOBODY};

fn monitor_for(employee: &str) -> NewAsset {
    NewAsset {
        employee_email: employee.to_string(),
        category: AssetCategory::Monitor,
        description: "27 inch monitor".to_string(),
        serial_number: Some("MON-2231".to_string()),
        purchase_url: None,
        purchase_cost: Some(Decimal::new(32_000, 2)),
        notes: None,
    }
}

async fn asset_entries(service: &RequestService, id: &AssetId) -> usize {
    service
        .find_audit(&AuditQuery::default().resource(ASSET_RESOURCE, id.0.clone()))
        .await
        .expect("audit")
        .len()
}

#[tokio::test]
async fn managers_and_admins_register_assets_by_hand() {
    let (service, _) = service();

    let by_manager = service.create_asset(BOSS, monitor_for(ANA)).await.expect("manager");
    assert_eq!(by_manager.employee_email, ANA);
    assert_eq!(by_manager.assigned_by, BOSS);
    assert_eq!(by_manager.asset_request_id, None);
    assert_eq!(by_manager.status, AssetStatus::Active);

    let by_admin = service.create_asset(HR, monitor_for(LEO)).await.expect("admin");
    assert_eq!(by_admin.assigned_by, HR);

    let error = service.create_asset(LEO, monitor_for(ANA)).await.expect_err("not ana's manager");
    assert!(error.forbidden());
    let error = service.create_asset(ANA, monitor_for(ANA)).await.expect_err("not for yourself");
    assert!(error.forbidden());

    let trail = service.asset_trail(&by_manager.id, ANA).await.expect("trail");
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].action, AuditAction::Create);
    assert_eq!(trail[0].details.get("employee_email").map(String::as_str), Some(ANA));
    assert_eq!(service.employee_assets(ANA).await.expect("assets"), vec![by_manager]);
}

#[tokio::test]
async fn status_changes_and_reassignment_record_each_field() {
    let (service, _) = service();
    let asset = service.create_asset(HR, monitor_for(ANA)).await.expect("create");

    let damaged = service
        .update_asset(
            &asset.id,
            BOSS,
            AssetUpdate {
                status: Some(AssetStatus::Damaged),
                notes: Some("cracked stand".to_string()),
                ..AssetUpdate::default()
            },
        )
        .await
        .expect("mark damaged");
    assert_eq!(damaged.status, AssetStatus::Damaged);
    assert_eq!(damaged.version, 2);

    let moved = service
        .update_asset(
            &asset.id,
            HR,
            AssetUpdate { employee_email: Some(LEO.to_uppercase()), ..AssetUpdate::default() },
        )
        .await
        .expect("reassign");
    assert_eq!(moved.employee_email, LEO);
    assert!(service.employee_assets(ANA).await.expect("ana").is_empty());
    assert_eq!(service.employee_assets(LEO).await.expect("leo").len(), 1);

    let trail = service.asset_trail(&asset.id, HR).await.expect("trail");
    let actions: Vec<AuditAction> = trail.iter().map(|entry| entry.action).collect();
    assert_eq!(actions, [AuditAction::Create, AuditAction::Update, AuditAction::Update]);

    let status_entry = &trail[1].details;
    assert_eq!(status_entry.get("fields").map(String::as_str), Some("status,notes"));
    assert_eq!(status_entry.get("change").map(String::as_str), Some("status_changed"));
    assert_eq!(status_entry.get("status.old").map(String::as_str), Some("active"));
    assert_eq!(status_entry.get("status.new").map(String::as_str), Some("damaged"));
    assert_eq!(status_entry.get("notes.old").map(String::as_str), Some(""));
    assert_eq!(status_entry.get("notes.new").map(String::as_str), Some("cracked stand"));

    let reassignment = &trail[2].details;
    assert_eq!(reassignment.get("change").map(String::as_str), Some("reassigned"));
    assert_eq!(reassignment.get("employee_email.old").map(String::as_str), Some(ANA));
    assert_eq!(reassignment.get("employee_email.new").map(String::as_str), Some(LEO));

    // Leo now holds it and reports to hr, so boss has lost access.
    let error = service
        .update_asset(
            &asset.id,
            BOSS,
            AssetUpdate { status: Some(AssetStatus::Returned), ..AssetUpdate::default() },
        )
        .await
        .expect_err("no longer boss's report");
    assert!(error.forbidden());
    assert!(service.get_asset(&asset.id, ANA).await.expect_err("former holder").forbidden());
    assert_eq!(service.get_asset(&asset.id, LEO).await.expect("holder").version, 3);
}

#[tokio::test]
async fn holders_cannot_edit_their_own_assets() {
    let (service, _) = service();
    let asset = service.create_asset(HR, monitor_for(ANA)).await.expect("create");

    let error = service
        .update_asset(
            &asset.id,
            ANA,
            AssetUpdate { description: Some("Two monitors".to_string()), ..AssetUpdate::default() },
        )
        .await
        .expect_err("holder");
    assert!(error.forbidden());
    assert!(service.asset_trail(&asset.id, NOBODY).await.expect_err("stranger").forbidden());
    assert_eq!(asset_entries(&service, &asset.id).await, 1);
}

#[tokio::test]
async fn updates_that_change_nothing_write_nothing() {
    let (service, _) = service();
    let asset = service.create_asset(HR, monitor_for(ANA)).await.expect("create");

    let same = service
        .update_asset(
            &asset.id,
            HR,
            AssetUpdate {
                status: Some(AssetStatus::Active),
                serial_number: Some(" MON-2231 ".to_string()),
                ..AssetUpdate::default()
            },
        )
        .await
        .expect("no-op");

    assert_eq!(same, asset);
    assert_eq!(asset_entries(&service, &asset.id).await, 1);
}

#[tokio::test]
async fn blank_and_unknown_targets_are_refused() {
    let (service, _) = service();
    let asset = service.create_asset(HR, monitor_for(ANA)).await.expect("create");

    let blank = service
        .update_asset(
            &asset.id,
            HR,
            AssetUpdate { employee_email: Some("  ".to_string()), ..AssetUpdate::default() },
        )
        .await
        .expect_err("blank holder");
    assert!(matches!(blank, ApplicationError::Domain(_)));
    assert!(!blank.forbidden());

    let missing = AssetId("missing".to_string());
    let error = service
        .update_asset(&missing, HR, AssetUpdate::default())
        .await
        .expect_err("missing");
    assert_eq!(error, ApplicationError::not_found(ASSET_RESOURCE, "missing"));
}

#[tokio::test]
async fn approved_asset_requests_open_the_asset_trail() {
    let (service, _) = service();
    let created = service.create(ANA, laptop()).await.expect("create");
    service.approve_as_manager(&created.id, BOSS).await.expect("manager");
    service.approve_as_admin(&created.id, HR).await.expect("admin");
    let asset = service.employee_assets(ANA).await.expect("assets").remove(0);

    service
        .update_asset(
            &asset.id,
            HR,
            AssetUpdate { status: Some(AssetStatus::Returned), ..AssetUpdate::default() },
        )
        .await
        .expect("returned");

    let trail = service.asset_trail(&asset.id, BOSS).await.expect("trail");
    assert_eq!(trail.len(), 2);
    assert_eq!(trail[0].action, AuditAction::ApproveAdmin);
    assert_eq!(trail[0].resource_id, created.id.0);
    assert_eq!(trail[0].details.get("asset_id"), Some(&asset.id.0));
    assert_eq!(trail[1].details.get("status.new").map(String::as_str), Some("returned"));
}

#[tokio::test]
async fn inventory_changes_persist_on_sqlite() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("hrdesk.db").display());
    let pool = connect_with_settings(&url, 2, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");
    let service = service_with(Stores::sqlite(pool.clone()), RecordingDispatcher::default());

    let asset = service.create_asset(BOSS, monitor_for(ANA)).await.expect("create");
    let updated = service
        .update_asset(
            &asset.id,
            BOSS,
            AssetUpdate {
                status: Some(AssetStatus::Returned),
                serial_number: Some(String::new()),
                ..AssetUpdate::default()
            },
        )
        .await
        .expect("update");

    let stored = service.get_asset(&asset.id, ANA).await.expect("get");
    assert_eq!(stored, updated);
    assert_eq!(stored.serial_number, None);
    assert_eq!(service.asset_trail(&asset.id, ANA).await.expect("trail").len(), 2);

    pool.close().await;
}
