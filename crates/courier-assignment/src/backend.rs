//! Backend abstraction for shipping assignments.

use crate::model::{ShippingAssignment, StatusUpdate};
use crate::session::Session;
use async_trait::async_trait;
use courier_core::Result;

/// Remote store of shipping assignments.
///
/// The backend is authoritative: every successful call returns the
/// server-confirmed assignment(s). Errors are classified as `Network`,
/// `Validation` or `Conflict`.
#[async_trait]
pub trait AssignmentBackend: Send + Sync {
    /// Assignments with no courier yet
    async fn available(&self, session: &Session) -> Result<Vec<ShippingAssignment>>;

    /// Assignments held by the session's courier
    async fn my_deliveries(&self, session: &Session) -> Result<Vec<ShippingAssignment>>;

    async fn detail(&self, session: &Session, id: &str) -> Result<ShippingAssignment>;

    /// All assignments for an order (an order may have been re-dispatched)
    async fn by_order(&self, session: &Session, order_id: &str) -> Result<Vec<ShippingAssignment>>;

    /// Claim an assignment for the session's courier.
    ///
    /// Fails with `Conflict` if another courier already holds it.
    async fn assign_to_me(&self, session: &Session, id: &str) -> Result<ShippingAssignment>;

    async fn update_status(
        &self,
        session: &Session,
        id: &str,
        update: &StatusUpdate,
    ) -> Result<ShippingAssignment>;
}
