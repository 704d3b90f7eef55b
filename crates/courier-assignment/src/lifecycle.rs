//! Assignment status transitions.
//!
//! Local checks first, then the backend; the cached copy only ever changes to
//! what the backend confirmed.

use crate::backend::AssignmentBackend;
use crate::model::{
    AssignmentStatus, CodOutcome, ShippingAssignment, StatusUpdate, TransitionPayload,
};
use crate::session::Session;
use courier_core::{CourierError, Result};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Validates and applies shipping assignment status transitions.
///
/// Every check that can be made locally (transition graph, COD rules,
/// reasons) runs before the backend is contacted. The cached assignment is
/// replaced only with the backend's confirmed copy; on any error it is left
/// untouched.
#[derive(Clone)]
pub struct AssignmentLifecycle {
    backend: Arc<dyn AssignmentBackend>,
}

impl AssignmentLifecycle {
    pub fn new(backend: Arc<dyn AssignmentBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn AssignmentBackend> {
        &self.backend
    }

    /// Claim a `PENDING` assignment for the session's courier.
    ///
    /// # Errors
    /// * `Validation` if the assignment is not `PENDING`
    /// * `Conflict` if the backend reports another courier already took it
    /// * `Network` / `Validation` as classified by the backend
    #[instrument(skip(self, session, assignment), fields(assignment_id = %assignment.id))]
    pub async fn assign(
        &self,
        session: &Session,
        assignment: &mut ShippingAssignment,
    ) -> Result<()> {
        if assignment.status != AssignmentStatus::Pending {
            return Err(CourierError::validation(format!(
                "assignment {} is {}, only PENDING assignments can be accepted",
                assignment.id, assignment.status
            )));
        }

        let confirmed = self
            .backend
            .assign_to_me(session, &assignment.id)
            .await
            .inspect_err(|e| warn!(error = %e, "Assignment claim failed"))?;
        self.replace_cached(assignment, confirmed)
    }

    /// Move `assignment` to `target`.
    ///
    /// `PENDING -> ASSIGNED` is routed through the claim endpoint and must
    /// carry an empty payload; every other edge is a status update carrying
    /// `payload`.
    #[instrument(
        skip(self, session, assignment, payload),
        fields(assignment_id = %assignment.id, from = %assignment.status, to = %target)
    )]
    pub async fn transition(
        &self,
        session: &Session,
        assignment: &mut ShippingAssignment,
        target: AssignmentStatus,
        payload: TransitionPayload,
    ) -> Result<()> {
        if !assignment.status.can_transition_to(target) {
            return Err(CourierError::validation(format!(
                "cannot move assignment {} from {} to {}",
                assignment.id, assignment.status, target
            )));
        }
        payload.validate_for(target)?;

        let result = if target == AssignmentStatus::Assigned {
            self.backend.assign_to_me(session, &assignment.id).await
        } else {
            let update = StatusUpdate::new(target, payload);
            self.backend
                .update_status(session, &assignment.id, &update)
                .await
        };

        let confirmed = result.inspect_err(|e| warn!(error = %e, "Transition rejected"))?;
        self.replace_cached(assignment, confirmed)
    }

    /// Replace the cached copy with the backend's latest.
    #[instrument(skip(self, session, assignment), fields(assignment_id = %assignment.id))]
    pub async fn refresh(
        &self,
        session: &Session,
        assignment: &mut ShippingAssignment,
    ) -> Result<()> {
        let latest = self.backend.detail(session, &assignment.id).await?;
        self.replace_cached(assignment, latest)
    }

    pub async fn pick_up(
        &self,
        session: &Session,
        assignment: &mut ShippingAssignment,
    ) -> Result<()> {
        self.transition(
            session,
            assignment,
            AssignmentStatus::PickedUp,
            TransitionPayload::new(),
        )
        .await
    }

    pub async fn start_transit(
        &self,
        session: &Session,
        assignment: &mut ShippingAssignment,
    ) -> Result<()> {
        self.transition(
            session,
            assignment,
            AssignmentStatus::InTransit,
            TransitionPayload::new(),
        )
        .await
    }

    pub async fn out_for_delivery(
        &self,
        session: &Session,
        assignment: &mut ShippingAssignment,
    ) -> Result<()> {
        self.transition(
            session,
            assignment,
            AssignmentStatus::OutForDelivery,
            TransitionPayload::new(),
        )
        .await
    }

    /// Mark delivered with the cash-on-delivery outcome
    pub async fn complete(
        &self,
        session: &Session,
        assignment: &mut ShippingAssignment,
        cod: CodOutcome,
    ) -> Result<()> {
        self.transition(
            session,
            assignment,
            AssignmentStatus::Delivered,
            TransitionPayload::new().with_cod(cod),
        )
        .await
    }

    pub async fn fail(
        &self,
        session: &Session,
        assignment: &mut ShippingAssignment,
        reason: impl Into<String>,
    ) -> Result<()> {
        self.transition(
            session,
            assignment,
            AssignmentStatus::Failed,
            TransitionPayload::new().with_reason(reason),
        )
        .await
    }

    pub async fn return_order(
        &self,
        session: &Session,
        assignment: &mut ShippingAssignment,
        reason: impl Into<String>,
    ) -> Result<()> {
        self.transition(
            session,
            assignment,
            AssignmentStatus::Returned,
            TransitionPayload::new().with_reason(reason),
        )
        .await
    }

    fn replace_cached(
        &self,
        assignment: &mut ShippingAssignment,
        confirmed: ShippingAssignment,
    ) -> Result<()> {
        if confirmed.id != assignment.id {
            return Err(CourierError::network(format!(
                "backend answered with assignment {} for {}",
                confirmed.id, assignment.id
            )));
        }

        info!(
            assignment_id = %confirmed.id,
            status = %confirmed.status,
            "Assignment confirmed by backend"
        );
        *assignment = confirmed;
        Ok(())
    }
}
