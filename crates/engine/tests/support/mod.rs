#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use hrdesk_core::calendar::HolidayCalendar;
use hrdesk_core::clock::SteppingClock;
use hrdesk_core::directory::StaticDirectory;
use hrdesk_core::domain::payload::{
    AssetCategory, AssetPayload, Currency, RequestPayload, TimeOffPayload, TimeOffType, TripPayload,
};
use hrdesk_core::notify::{NotificationDispatcher, RecordingDispatcher};
use hrdesk_engine::{RequestService, RetryPolicy, ServiceSettings, Stores};

pub const ANA: &str = "ana@corp.test";
pub const BOSS: &str = "boss@corp.test";
pub const HR: &str = "hr@corp.test";
pub const OPS: &str = "ops@corp.test";
pub const LEO: &str = "leo@corp.test";
pub const NOBODY: &str = "nobody@corp.test";

/// ana reports to boss; leo reports to hr, who is also an admin.
pub fn directory() -> StaticDirectory {
    StaticDirectory::default()
        .with_admin(HR)
        .with_admin(OPS)
        .with_employee(ANA, Some(BOSS), Some("mexico"))
        .with_employee(LEO, Some(HR), Some("madrid"))
        .with_employee(BOSS, Some(HR), None)
}

pub fn settings() -> ServiceSettings {
    ServiceSettings {
        audit_write_attempts: 3,
        default_region: None,
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 4,
            attempt_timeout_ms: 500,
        },
        task_due_days: 2,
    }
}

pub fn service_with(stores: Stores, dispatcher: RecordingDispatcher) -> RequestService {
    service_with_dispatcher(stores, Arc::new(dispatcher))
}

pub fn service_with_dispatcher(
    stores: Stores,
    dispatcher: Arc<dyn NotificationDispatcher>,
) -> RequestService {
    let start = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).single().expect("timestamp");
    RequestService::new(
        stores,
        Arc::new(directory()),
        Arc::new(HolidayCalendar::builtin()),
        dispatcher,
        settings(),
    )
    .with_clock(Arc::new(SteppingClock::starting_at(start)))
}

pub fn service() -> (RequestService, RecordingDispatcher) {
    let dispatcher = RecordingDispatcher::default();
    (service_with(Stores::in_memory(), dispatcher.clone()), dispatcher)
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub fn vacation(start: NaiveDate, end: NaiveDate) -> RequestPayload {
    RequestPayload::TimeOff(TimeOffPayload::new(start, end, TimeOffType::Vacation, None))
}

pub fn laptop() -> RequestPayload {
    RequestPayload::Asset(AssetPayload {
        category: AssetCategory::Laptop,
        business_justification: "current machine is out of warranty".into(),
        custom_description: None,
        purchase_url: None,
        estimated_cost: None,
    })
}

pub fn trip() -> RequestPayload {
    RequestPayload::Trip(TripPayload {
        destination: "Bogota".into(),
        start_date: date(2026, 4, 6),
        end_date: date(2026, 4, 9),
        purpose: "client workshop".into(),
        expected_goal: "signed pilot".into(),
        estimated_budget: Decimal::new(1_500, 0),
        currency: Currency::Usd,
        needs_advance_funding: true,
        advance_amount: Some(Decimal::new(500, 0)),
    })
}
