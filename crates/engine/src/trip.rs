use hrdesk_core::domain::justification::{
    JustificationReview, JustificationStatus, JustificationSubmission, TripJustification,
};
use hrdesk_core::domain::request::{Request, RequestId, RequestKind, RequestStatus};
use hrdesk_core::errors::{ApplicationError, DomainError};
use hrdesk_core::workflow::{Actor, TransitionError, WorkflowCommand};
use hrdesk_db::RequestFilter;

use crate::service::{RecordChange, RequestService};
use crate::stores::storage_error;

/// A trip after a justification step, with the justification it touched.
#[derive(Clone, Debug, PartialEq)]
pub struct TripUpdate {
    pub trip: Request,
    pub justification: TripJustification,
}

impl RequestService {
    /// Marks an approved trip as under way.
    pub async fn start_trip(
        &self,
        id: &RequestId,
        actor_email: &str,
    ) -> Result<Request, ApplicationError> {
        let plan = self.plan(id, actor_email, &WorkflowCommand::StartTrip).await?;
        let entry = plan.audit_entry();
        self.complete(plan, RecordChange::None, entry).await
    }

    pub async fn submit_justification(
        &self,
        id: &RequestId,
        actor_email: &str,
        submission: JustificationSubmission,
    ) -> Result<TripUpdate, ApplicationError> {
        submission.validate()?;
        let plan = self.plan(id, actor_email, &WorkflowCommand::SubmitJustification).await?;

        let prior = self
            .stores
            .justifications
            .list_for_trip(id)
            .await
            .map_err(|error| storage_error("trip_justification", error))?;
        let submission_number = u32::try_from(prior.len()).unwrap_or(u32::MAX).saturating_add(1);
        let justification = TripJustification::submit(
            plan.next.id.clone(),
            plan.actor.email.clone(),
            submission_number,
            submission,
            plan.now,
        );

        let entry = plan
            .audit_entry()
            .with_detail("justification_id", justification.id.0.clone())
            .with_detail("submission_number", submission_number.to_string());
        let trip = self
            .complete(plan, RecordChange::OpenJustification(justification.clone()), entry)
            .await?;
        Ok(TripUpdate { trip, justification })
    }

    /// Approves or rejects the trip's latest justification.
    pub async fn review_justification(
        &self,
        id: &RequestId,
        actor_email: &str,
        review: JustificationReview,
    ) -> Result<TripUpdate, ApplicationError> {
        review.validate()?;
        let command = if review.is_approval() {
            WorkflowCommand::ApproveJustification
        } else {
            WorkflowCommand::RejectJustification
        };
        let plan = self.plan(id, actor_email, &command).await?;

        let latest = self
            .stores
            .justifications
            .latest_for_trip(id)
            .await
            .map_err(|error| storage_error("trip_justification", error))?
            .filter(|justification| justification.status == JustificationStatus::PendingReview)
            .ok_or_else(|| {
                ApplicationError::Domain(DomainError::InvariantViolation(format!(
                    "trip `{id}` awaits review but has no pending justification"
                )))
            })?;
        let reviewed = latest.reviewed(plan.actor.email.clone(), &review, plan.now);

        let mut entry = plan
            .audit_entry()
            .with_detail("justification_id", reviewed.id.0.clone())
            .with_detail("submission_number", reviewed.submission_number.to_string());
        if let Some(feedback) = &reviewed.admin_feedback {
            entry = entry.with_detail("reason", feedback.clone());
        }
        if let Some(total) = reviewed.total_approved {
            entry = entry.with_detail("total_approved", total.to_string());
        }

        let record = RecordChange::ReviewJustification { before: latest, after: reviewed.clone() };
        let trip = self.complete(plan, record, entry).await?;
        Ok(TripUpdate { trip, justification: reviewed })
    }

    /// Every submission for a trip, oldest first.
    pub async fn list_justifications(
        &self,
        id: &RequestId,
        actor_email: &str,
    ) -> Result<Vec<TripJustification>, ApplicationError> {
        let trip = self.get(id, actor_email).await?;
        if trip.kind() != RequestKind::Trip {
            return Err(TransitionError::NotApplicable {
                operation: "list_justifications",
                kind: trip.kind(),
            }
            .into());
        }
        self.stores
            .justifications
            .list_for_trip(id)
            .await
            .map_err(|error| storage_error("trip_justification", error))
    }

    /// Trips waiting for an admin to review their justification.
    pub async fn list_pending_justification_reviews(
        &self,
        actor_email: &str,
    ) -> Result<Vec<Request>, ApplicationError> {
        let actor = Actor::resolve(actor_email, self.directory.as_ref());
        if !actor.is_admin {
            return Err(TransitionError::RoleRequired {
                operation: "list_pending_justification_reviews",
                role: "admins",
            }
            .into());
        }
        let filter = RequestFilter {
            statuses: vec![RequestStatus::JustificationSubmitted],
            kind: Some(RequestKind::Trip),
            ..RequestFilter::default()
        };
        self.stores.requests.list(&filter).await.map_err(|error| storage_error("request", error))
    }
}
