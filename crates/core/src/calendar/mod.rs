//! Working-day calendar.
//!
//! A day is non-working when it is a Saturday or Sunday, or when it matches a
//! holiday for the region in that calendar year. Holiday lookup prefers the
//! year-specific list for `(region, year)` and otherwise falls back to the
//! recurring month/day table for the region. Unknown regions only exclude
//! weekends.

mod tables;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
    pub note: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionInfo {
    pub code: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct RecurringHoliday {
    month: u32,
    day: u32,
    name: String,
}

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("could not read holidays file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse holidays file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("invalid recurring holiday for `{region}`: month {month}, day {day}")]
    InvalidRecurringDate { region: String, month: u32, day: u32 },
}

/// Additional holiday data loaded from TOML at startup.
///
/// ```toml
/// [regions]
/// lisbon = "Lisboa, Portugal"
///
/// [[holidays]]
/// region = "mexico"
/// date = "2027-01-01"
/// name = "Año Nuevo"
///
/// [[recurring]]
/// region = "lisbon"
/// month = 6
/// day = 13
/// name = "Santo António"
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CalendarExtension {
    #[serde(default)]
    pub regions: BTreeMap<String, String>,
    #[serde(default)]
    pub holidays: Vec<ExtensionHoliday>,
    #[serde(default)]
    pub recurring: Vec<ExtensionRecurring>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ExtensionHoliday {
    pub region: String,
    pub date: NaiveDate,
    pub name: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ExtensionRecurring {
    pub region: String,
    pub month: u32,
    pub day: u32,
    pub name: String,
}

impl CalendarExtension {
    pub fn from_toml_str(raw: &str, origin: &Path) -> Result<Self, CalendarError> {
        toml::from_str(raw)
            .map_err(|source| CalendarError::ParseFile { path: origin.to_path_buf(), source })
    }

    pub fn load(path: &Path) -> Result<Self, CalendarError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| CalendarError::ReadFile { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&raw, path)
    }
}

#[derive(Clone, Debug, Default)]
pub struct HolidayCalendar {
    year_specific: HashMap<String, BTreeMap<i32, Vec<Holiday>>>,
    recurring: HashMap<String, Vec<RecurringHoliday>>,
    region_names: BTreeMap<String, String>,
}

pub fn normalize_region(raw: &str) -> String {
    let key = raw.trim().to_ascii_lowercase();
    tables::REGION_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, canonical)| (*canonical).to_string())
        .unwrap_or(key)
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Counts working days in `start..=end` for `region` using the built-in tables.
pub fn count_working_days(start: NaiveDate, end: NaiveDate, region: &str) -> u32 {
    HolidayCalendar::shared().count_working_days(start, end, Some(region))
}

impl HolidayCalendar {
    pub fn builtin() -> Self {
        let mut calendar = Self::default();

        for (code, name) in tables::REGION_NAMES {
            calendar.region_names.insert((*code).to_string(), (*name).to_string());
        }

        for table in tables::YEAR_SPECIFIC {
            let holidays = table.entries.iter().filter_map(|(month, day, name, note)| {
                NaiveDate::from_ymd_opt(table.year, *month, *day).map(|date| Holiday {
                    date,
                    name: (*name).to_string(),
                    note: note.map(str::to_string),
                })
            });
            calendar
                .year_specific
                .entry(table.region.to_string())
                .or_default()
                .entry(table.year)
                .or_default()
                .extend(holidays);
        }

        for table in tables::RECURRING {
            calendar.recurring.entry(table.region.to_string()).or_default().extend(
                table.entries.iter().map(|(month, day, name)| RecurringHoliday {
                    month: *month,
                    day: *day,
                    name: (*name).to_string(),
                }),
            );
        }

        calendar
    }

    /// Process-wide calendar built from the compiled tables only.
    pub fn shared() -> &'static HolidayCalendar {
        static SHARED: OnceLock<HolidayCalendar> = OnceLock::new();
        SHARED.get_or_init(HolidayCalendar::builtin)
    }

    /// Built-in tables, extended with `holidays_path` when one is configured.
    pub fn load(holidays_path: Option<&Path>) -> Result<Self, CalendarError> {
        match holidays_path {
            Some(path) => Self::builtin().with_extension(CalendarExtension::load(path)?),
            None => Ok(Self::builtin()),
        }
    }

    pub fn with_extension(mut self, extension: CalendarExtension) -> Result<Self, CalendarError> {
        for (code, name) in extension.regions {
            self.region_names.insert(normalize_region(&code), name);
        }

        for holiday in extension.holidays {
            let region = normalize_region(&holiday.region);
            let year_list = self
                .year_specific
                .entry(region)
                .or_default()
                .entry(holiday.date.year())
                .or_default();
            year_list.retain(|existing| existing.date != holiday.date);
            year_list.push(Holiday { date: holiday.date, name: holiday.name, note: holiday.note });
            year_list.sort_by_key(|entry| entry.date);
        }

        for entry in extension.recurring {
            let region = normalize_region(&entry.region);
            // 2024 is a leap year, so Feb 29 passes; it only matches in leap years.
            if NaiveDate::from_ymd_opt(2024, entry.month, entry.day).is_none() {
                return Err(CalendarError::InvalidRecurringDate {
                    region,
                    month: entry.month,
                    day: entry.day,
                });
            }
            self.recurring.entry(region).or_default().push(RecurringHoliday {
                month: entry.month,
                day: entry.day,
                name: entry.name,
            });
        }

        Ok(self)
    }

    fn year_list(&self, region_key: &str, year: i32) -> Option<&[Holiday]> {
        self.year_specific
            .get(region_key)
            .and_then(|by_year| by_year.get(&year))
            .map(Vec::as_slice)
    }

    pub fn knows_region(&self, region: &str) -> bool {
        let key = normalize_region(region);
        self.year_specific.contains_key(&key) || self.recurring.contains_key(&key)
    }

    pub fn available_regions(&self) -> Vec<RegionInfo> {
        let mut codes: Vec<&String> =
            self.year_specific.keys().chain(self.recurring.keys()).collect();
        codes.sort();
        codes.dedup();

        codes
            .into_iter()
            .map(|code| RegionInfo {
                code: code.clone(),
                name: self.region_names.get(code).cloned().unwrap_or_else(|| code.clone()),
            })
            .collect()
    }

    pub fn holiday_on(&self, date: NaiveDate, region: &str) -> Option<Holiday> {
        let key = normalize_region(region);

        if let Some(year_list) = self.year_list(&key, date.year()) {
            return year_list.iter().find(|holiday| holiday.date == date).cloned();
        }

        self.recurring.get(&key).and_then(|patterns| {
            patterns
                .iter()
                .find(|pattern| pattern.month == date.month() && pattern.day == date.day())
                .map(|pattern| Holiday { date, name: pattern.name.clone(), note: None })
        })
    }

    pub fn is_holiday(&self, date: NaiveDate, region: &str) -> bool {
        self.holiday_on(date, region).is_some()
    }

    /// With no region only weekends are excluded.
    pub fn is_working_day(&self, date: NaiveDate, region: Option<&str>) -> bool {
        if is_weekend(date) {
            return false;
        }
        match region {
            Some(region) => !self.is_holiday(date, region),
            None => true,
        }
    }

    pub fn count_working_days(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        region: Option<&str>,
    ) -> u32 {
        if start > end {
            return 0;
        }

        let count = start
            .iter_days()
            .take_while(|day| *day <= end)
            .filter(|day| self.is_working_day(*day, region))
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    pub fn year_holidays(&self, region: &str, year: i32) -> Vec<Holiday> {
        let key = normalize_region(region);

        if let Some(year_list) = self.year_list(&key, year) {
            return year_list.to_vec();
        }

        let mut holidays: Vec<Holiday> = self
            .recurring
            .get(&key)
            .map(|patterns| {
                patterns
                    .iter()
                    .filter_map(|pattern| {
                        NaiveDate::from_ymd_opt(year, pattern.month, pattern.day).map(|date| {
                            Holiday { date, name: pattern.name.clone(), note: None }
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        holidays.sort_by_key(|holiday| holiday.date);
        holidays.dedup_by_key(|holiday| holiday.date);
        holidays
    }

    pub fn holidays_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        region: &str,
    ) -> Vec<Holiday> {
        if start > end {
            return Vec::new();
        }

        (start.year()..=end.year())
            .flat_map(|year| self.year_holidays(region, year))
            .filter(|holiday| holiday.date >= start && holiday.date <= end)
            .collect()
    }
}
