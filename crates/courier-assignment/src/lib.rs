//! # courier-assignment
//!
//! Shipping assignment lifecycle: the status graph, cash-on-delivery rules,
//! and the backend that persists confirmed transitions.
//!
//! ```text
//! PENDING -> ASSIGNED -> PICKED_UP -> IN_TRANSIT -> OUT_FOR_DELIVERY -> DELIVERED
//!               |            |            |                |
//!               v            v            v                +-> FAILED
//!           CANCELLED      FAILED       FAILED             +-> RETURNED
//! ```
//!
//! [`AssignmentLifecycle`] validates every transition locally before the
//! backend is called and only ever replaces the cached assignment with a
//! server-confirmed copy. Authentication is an explicit [`Session`] passed into
//! each call.

pub mod backend;
pub mod http;
pub mod lifecycle;
pub mod model;
pub mod session;

pub use backend::AssignmentBackend;
pub use http::HttpAssignmentBackend;
pub use lifecycle::AssignmentLifecycle;
pub use model::{
    AssignmentStatus, CodOutcome, ShippingAssignment, StatusUpdate, TransitionPayload,
};
pub use session::Session;
