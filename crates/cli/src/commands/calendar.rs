use chrono::NaiveDate;
use hrdesk_core::calendar::{normalize_region, Holiday, HolidayCalendar};
use serde::Serialize;

use crate::commands::{load_config, CommandResult, EXIT_CONFIG};

#[derive(Debug, Serialize)]
struct WorkingDays {
    region: String,
    known_region: bool,
    from: NaiveDate,
    to: NaiveDate,
    working_days: u32,
    holidays: Vec<Holiday>,
}

#[derive(Debug, Serialize)]
struct YearHolidays {
    region: String,
    year: i32,
    holidays: Vec<Holiday>,
}

fn load_calendar(command: &str) -> Result<HolidayCalendar, CommandResult> {
    let config = load_config(command)?;
    HolidayCalendar::load(config.calendar.holidays_path.as_deref()).map_err(|error| {
        CommandResult::failure(command, "holiday_calendar", error.to_string(), EXIT_CONFIG)
    })
}

/// Counts working days in `from..=to` for a region.
pub fn working_days(region: &str, from: NaiveDate, to: NaiveDate) -> CommandResult {
    if from > to {
        return CommandResult::failure(
            "working-days",
            "invalid_input",
            format!("`--from` {from} is after `--to` {to}"),
            EXIT_CONFIG,
        );
    }
    let calendar = match load_calendar("working-days") {
        Ok(calendar) => calendar,
        Err(failure) => return failure,
    };

    let region = normalize_region(region);
    let known_region = calendar.knows_region(&region);
    let report = WorkingDays {
        working_days: calendar.count_working_days(from, to, Some(&region)),
        holidays: calendar.holidays_in_range(from, to, &region),
        known_region,
        region,
        from,
        to,
    };

    let mut message = format!("{} working days between {from} and {to}", report.working_days);
    if !known_region {
        message.push_str(" (unknown region; only weekends excluded)");
    }
    CommandResult::success_with_data("working-days", message, report)
}

pub fn holidays(region: &str, year: i32) -> CommandResult {
    let calendar = match load_calendar("holidays") {
        Ok(calendar) => calendar,
        Err(failure) => return failure,
    };

    let region = normalize_region(region);
    if !calendar.knows_region(&region) {
        return CommandResult::failure(
            "holidays",
            "unknown_region",
            format!("no holiday table for region `{region}`"),
            EXIT_CONFIG,
        );
    }

    let holidays = calendar.year_holidays(&region, year);
    let message = format!("{} holidays for {region} in {year}", holidays.len());
    CommandResult::success_with_data("holidays", message, YearHolidays { region, year, holidays })
}

pub fn regions() -> CommandResult {
    let calendar = match load_calendar("regions") {
        Ok(calendar) => calendar,
        Err(failure) => return failure,
    };

    let regions = calendar.available_regions();
    CommandResult::success_with_data("regions", format!("{} regions", regions.len()), regions)
}
