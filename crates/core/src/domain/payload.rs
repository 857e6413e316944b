use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calendar::{normalize_region, HolidayCalendar};
use crate::domain::request::RequestKind;
use crate::errors::ValidationError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "details", rename_all = "snake_case")]
pub enum RequestPayload {
    #[serde(rename = "timeoff")]
    TimeOff(TimeOffPayload),
    Travel(TravelPayload),
    Tool(ToolPayload),
    Asset(AssetPayload),
    Trip(TripPayload),
}

impl RequestPayload {
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::TimeOff(_) => RequestKind::TimeOff,
            Self::Travel(_) => RequestKind::Travel,
            Self::Tool(_) => RequestKind::Tool,
            Self::Asset(_) => RequestKind::Asset,
            Self::Trip(_) => RequestKind::Trip,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::TimeOff(payload) => payload.validate(),
            Self::Travel(payload) => payload.validate(),
            Self::Tool(payload) => payload.validate(),
            Self::Asset(payload) => payload.validate(),
            Self::Trip(payload) => payload.validate(),
        }
    }

    /// Date span used by range queries; tool and asset requests have none.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match self {
            Self::TimeOff(payload) => Some((payload.start_date, payload.end_date)),
            Self::Travel(payload) => Some((payload.start_date, payload.end_date)),
            Self::Trip(payload) => Some((payload.start_date, payload.end_date)),
            Self::Tool(_) | Self::Asset(_) => None,
        }
    }

    pub fn summary(&self) -> String {
        match self {
            Self::TimeOff(payload) => format!(
                "{} {}..{} ({} working days)",
                payload.timeoff_type.as_str(),
                payload.start_date,
                payload.end_date,
                payload.working_days_count
            ),
            Self::Travel(payload) => format!(
                "travel {} -> {} ({} {})",
                payload.origin,
                payload.destination,
                payload.total_estimated_cost(),
                payload.currency.as_str()
            ),
            Self::Tool(payload) => format!("tool: {}", payload.display_name()),
            Self::Asset(payload) => format!("asset: {}", payload.display_name()),
            Self::Trip(payload) => format!(
                "trip to {} {}..{} ({} {})",
                payload.destination,
                payload.start_date,
                payload.end_date,
                payload.estimated_budget,
                payload.currency.as_str()
            ),
        }
    }

    /// Fills derived fields that depend on the requester's calendar.
    pub fn prepare(
        &mut self,
        calendar: &HolidayCalendar,
        holiday_region: Option<&str>,
    ) -> Result<(), ValidationError> {
        if let Self::TimeOff(payload) = self {
            payload.holiday_region = holiday_region.map(normalize_region);
            payload.working_days_count = calendar.count_working_days(
                payload.start_date,
                payload.end_date,
                payload.holiday_region.as_deref(),
            );
            if payload.working_days_count == 0 {
                return Err(ValidationError::new(
                    "end_date",
                    "the requested range contains no working days",
                ));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOffType {
    Vacation,
    SickLeave,
    DayOff,
}

impl TimeOffType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vacation => "vacation",
            Self::SickLeave => "sick_leave",
            Self::DayOff => "day_off",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOffPayload {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub timeoff_type: TimeOffType,
    pub notes: Option<String>,
    pub holiday_region: Option<String>,
    pub working_days_count: u32,
}

impl TimeOffPayload {
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        timeoff_type: TimeOffType,
        notes: Option<String>,
    ) -> Self {
        Self {
            start_date,
            end_date,
            timeoff_type,
            notes,
            holiday_region: None,
            working_days_count: 0,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_ordered_dates(self.start_date, self.end_date)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Mxn,
    Usd,
    Eur,
    Cop,
    Clp,
}

impl Currency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mxn => "MXN",
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Cop => "COP",
            Self::Clp => "CLP",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Airfare,
    Accommodation,
    Meals,
    Transportation,
    ConferenceFees,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisbursementType {
    Advance,
    Reimbursement,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelExpense {
    pub category: ExpenseCategory,
    pub description: String,
    pub estimated_cost: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelPayload {
    pub origin: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub purpose: String,
    pub expenses: Vec<TravelExpense>,
    pub currency: Currency,
    pub disbursement_type: DisbursementType,
}

impl TravelPayload {
    pub fn total_estimated_cost(&self) -> Decimal {
        self.expenses.iter().map(|expense| expense.estimated_cost).sum()
    }

    pub fn expense_summary(&self) -> BTreeMap<ExpenseCategory, Decimal> {
        let mut summary = BTreeMap::new();
        for expense in &self.expenses {
            *summary.entry(expense.category).or_insert(Decimal::ZERO) += expense.estimated_cost;
        }
        summary
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("origin", &self.origin)?;
        require_text("destination", &self.destination)?;
        require_text("purpose", &self.purpose)?;
        require_ordered_dates(self.start_date, self.end_date)?;
        if self.expenses.is_empty() {
            return Err(ValidationError::new("expenses", "at least one expense is required"));
        }
        for expense in &self.expenses {
            require_text("expenses.description", &expense.description)?;
            require_non_negative("expenses.estimated_cost", expense.estimated_cost)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolType {
    Headphones,
    Laptop,
    Monitor,
    KeyboardMouse,
    Chair,
    Desk,
    Custom,
}

impl ToolType {
    pub fn label(self) -> &'static str {
        match self {
            Self::Headphones => "Headphones",
            Self::Laptop => "Laptop",
            Self::Monitor => "Monitor",
            Self::KeyboardMouse => "Keyboard & Mouse",
            Self::Chair => "Chair",
            Self::Desk => "Desk",
            Self::Custom => "Custom tool",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPayload {
    pub tool_type: ToolType,
    pub justification: String,
    pub custom_description: Option<String>,
    pub custom_price: Option<Decimal>,
    pub custom_link: Option<String>,
}

impl ToolPayload {
    pub fn display_name(&self) -> String {
        match (&self.tool_type, &self.custom_description) {
            (ToolType::Custom, Some(description)) => description.clone(),
            (tool_type, _) => tool_type.label().to_string(),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("justification", &self.justification)?;
        if self.tool_type == ToolType::Custom {
            require_present("custom_description", self.custom_description.as_deref())?;
        }
        if let Some(price) = self.custom_price {
            require_non_negative("custom_price", price)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetCategory {
    Laptop,
    Monitor,
    Keyboard,
    Mouse,
    Headphones,
    Chair,
    Desk,
    Workspace,
    Mailchimp,
    Odoo,
    Gain,
    Other,
    Misc,
}

impl AssetCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Laptop => "laptop",
            Self::Monitor => "monitor",
            Self::Keyboard => "keyboard",
            Self::Mouse => "mouse",
            Self::Headphones => "headphones",
            Self::Chair => "chair",
            Self::Desk => "desk",
            Self::Workspace => "workspace",
            Self::Mailchimp => "mailchimp",
            Self::Odoo => "odoo",
            Self::Gain => "gain",
            Self::Other => "other",
            Self::Misc => "misc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        [
            Self::Laptop,
            Self::Monitor,
            Self::Keyboard,
            Self::Mouse,
            Self::Headphones,
            Self::Chair,
            Self::Desk,
            Self::Workspace,
            Self::Mailchimp,
            Self::Odoo,
            Self::Gain,
            Self::Other,
            Self::Misc,
        ]
        .into_iter()
        .find(|category| category.as_str() == value)
    }

    pub fn is_subscription(self) -> bool {
        matches!(self, Self::Workspace | Self::Mailchimp | Self::Odoo | Self::Gain | Self::Other)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPayload {
    pub category: AssetCategory,
    pub business_justification: String,
    pub custom_description: Option<String>,
    pub purchase_url: Option<String>,
    pub estimated_cost: Option<Decimal>,
}

impl AssetPayload {
    pub fn is_misc(&self) -> bool {
        self.category == AssetCategory::Misc
    }

    pub fn display_name(&self) -> String {
        match (self.is_misc(), &self.custom_description) {
            (true, Some(description)) => description.clone(),
            _ => self.category.as_str().replace('_', " "),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("business_justification", &self.business_justification)?;
        if self.is_misc() {
            require_present("custom_description", self.custom_description.as_deref())?;
            require_present("purchase_url", self.purchase_url.as_deref())?;
            match self.estimated_cost {
                Some(cost) => require_non_negative("estimated_cost", cost)?,
                None => {
                    return Err(ValidationError::new(
                        "estimated_cost",
                        "required for misc assets",
                    ))
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripPayload {
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub purpose: String,
    pub expected_goal: String,
    pub estimated_budget: Decimal,
    pub currency: Currency,
    pub needs_advance_funding: bool,
    pub advance_amount: Option<Decimal>,
}

impl TripPayload {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("destination", &self.destination)?;
        require_text("purpose", &self.purpose)?;
        require_text("expected_goal", &self.expected_goal)?;
        require_ordered_dates(self.start_date, self.end_date)?;
        require_non_negative("estimated_budget", self.estimated_budget)?;

        match (self.needs_advance_funding, self.advance_amount) {
            (true, None) => Err(ValidationError::new(
                "advance_amount",
                "required when advance funding is needed",
            )),
            (true, Some(amount)) if amount <= Decimal::ZERO => {
                Err(ValidationError::new("advance_amount", "must be greater than zero"))
            }
            (true, Some(amount)) if amount > self.estimated_budget => {
                Err(ValidationError::new("advance_amount", "must not exceed the estimated budget"))
            }
            _ => Ok(()),
        }
    }
}

pub(crate) fn require_text(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "is required"));
    }
    Ok(())
}

pub(crate) fn require_present(field: &str, value: Option<&str>) -> Result<(), ValidationError> {
    require_text(field, value.unwrap_or_default())
}

pub(crate) fn require_non_negative(field: &str, value: Decimal) -> Result<(), ValidationError> {
    if value < Decimal::ZERO {
        return Err(ValidationError::new(field, "must not be negative"));
    }
    Ok(())
}

fn require_ordered_dates(start: NaiveDate, end: NaiveDate) -> Result<(), ValidationError> {
    if end < start {
        return Err(ValidationError::new("end_date", "must not be before start_date"));
    }
    Ok(())
}
