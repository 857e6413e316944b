use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::request::RequestId;
use crate::errors::ValidationError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JustificationId(pub String);

impl JustificationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JustificationStatus {
    PendingReview,
    Approved,
    Rejected,
}

impl JustificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingReview => "pending_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending_review" => Some(Self::PendingReview),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Post-trip expense reconciliation submitted by the traveller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripJustification {
    pub id: JustificationId,
    pub trip_request_id: RequestId,
    pub employee_email: String,
    pub submission_number: u32,
    pub status: JustificationStatus,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub admin_feedback: Option<String>,
    pub total_claimed: Option<Decimal>,
    pub total_approved: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JustificationSubmission {
    pub total_claimed: Option<Decimal>,
    pub notes: Option<String>,
}

impl JustificationSubmission {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.total_claimed.is_some_and(|total| total < Decimal::ZERO) {
            return Err(ValidationError::new("total_claimed", "must not be negative"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum JustificationReview {
    Approve { total_approved: Option<Decimal>, feedback: Option<String> },
    Reject { feedback: String },
}

impl JustificationReview {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Approve { total_approved: Some(total), .. } if *total < Decimal::ZERO => {
                Err(ValidationError::new("total_approved", "must not be negative"))
            }
            Self::Reject { feedback } if feedback.trim().is_empty() => {
                Err(ValidationError::new("feedback", "is required when rejecting"))
            }
            _ => Ok(()),
        }
    }

    pub fn is_approval(&self) -> bool {
        matches!(self, Self::Approve { .. })
    }
}

impl TripJustification {
    pub fn submit(
        trip_request_id: RequestId,
        employee_email: impl Into<String>,
        submission_number: u32,
        submission: JustificationSubmission,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: JustificationId::generate(),
            trip_request_id,
            employee_email: employee_email.into(),
            submission_number,
            status: JustificationStatus::PendingReview,
            submitted_at: now,
            reviewed_by: None,
            reviewed_at: None,
            admin_feedback: None,
            total_claimed: submission.total_claimed,
            total_approved: None,
            notes: submission.notes,
        }
    }

    /// Returns the reviewed copy; the approved total defaults to the claimed one.
    pub fn reviewed(
        &self,
        reviewer: impl Into<String>,
        review: &JustificationReview,
        now: DateTime<Utc>,
    ) -> Self {
        let mut next = self.clone();
        next.reviewed_by = Some(reviewer.into());
        next.reviewed_at = Some(now);
        match review {
            JustificationReview::Approve { total_approved, feedback } => {
                next.status = JustificationStatus::Approved;
                next.total_approved = total_approved.or(self.total_claimed);
                next.admin_feedback = feedback.clone();
            }
            JustificationReview::Reject { feedback } => {
                next.status = JustificationStatus::Rejected;
                next.admin_feedback = Some(feedback.clone());
            }
        }
        next
    }
}
