//! Shipping assignment model and status graph.

use chrono::{DateTime, Utc};
use courier_core::{CourierError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a shipping assignment.
///
/// Serialized in the backend's `SCREAMING_SNAKE_CASE` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    Pending,
    Assigned,
    PickedUp,
    InTransit,
    OutForDelivery,
    Delivered,
    Failed,
    Returned,
    Cancelled,
}

impl AssignmentStatus {
    pub const ALL: [AssignmentStatus; 9] = [
        AssignmentStatus::Pending,
        AssignmentStatus::Assigned,
        AssignmentStatus::PickedUp,
        AssignmentStatus::InTransit,
        AssignmentStatus::OutForDelivery,
        AssignmentStatus::Delivered,
        AssignmentStatus::Failed,
        AssignmentStatus::Returned,
        AssignmentStatus::Cancelled,
    ];

    /// Statuses reachable in one step from `self`
    pub fn allowed_targets(&self) -> &'static [AssignmentStatus] {
        use AssignmentStatus::*;
        match self {
            Pending => &[Assigned],
            Assigned => &[PickedUp, Cancelled],
            PickedUp => &[InTransit, Failed],
            InTransit => &[OutForDelivery, Failed],
            OutForDelivery => &[Delivered, Failed, Returned],
            Delivered | Failed | Returned | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, target: AssignmentStatus) -> bool {
        self.allowed_targets().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_targets().is_empty()
    }

    /// Wire name, e.g. `OUT_FOR_DELIVERY`
    pub fn as_str(&self) -> &'static str {
        use AssignmentStatus::*;
        match self {
            Pending => "PENDING",
            Assigned => "ASSIGNED",
            PickedUp => "PICKED_UP",
            InTransit => "IN_TRANSIT",
            OutForDelivery => "OUT_FOR_DELIVERY",
            Delivered => "DELIVERED",
            Failed => "FAILED",
            Returned => "RETURNED",
            Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentStatus {
    type Err = CourierError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| CourierError::validation(format!("unknown assignment status '{}'", s)))
    }
}

/// One courier's responsibility for delivering one order.
///
/// Owned by the backend. The client holds a cached copy that is replaced only
/// with server-confirmed data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAssignment {
    #[serde(rename = "shippingLogId")]
    pub id: String,
    pub order_id: String,
    pub status: AssignmentStatus,
    #[serde(rename = "shippingStaffId", default)]
    pub courier_id: Option<String>,
    #[serde(default)]
    pub is_cod_collected: bool,
    #[serde(default)]
    pub is_cod_transferred: bool,
    /// Order total as the backend reports it; not a collected amount
    #[serde(default, deserialize_with = "amount_from_wire")]
    pub total_amount: Option<f64>,
    #[serde(default, deserialize_with = "amount_from_wire")]
    pub shipping_fee: Option<f64>,
    #[serde(rename = "unexpectedCase", default)]
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub cod_collect_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivered_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub returned_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShippingAssignment {
    /// Whether the assignment is claimed by `courier_id`
    pub fn is_assigned_to(&self, courier_id: &str) -> bool {
        self.courier_id.as_deref() == Some(courier_id)
    }

    /// Cash collected on delivery.
    ///
    /// `Some` only for a `DELIVERED` assignment with COD collected; the
    /// backend's `totalAmount` is the order total in every other state.
    pub fn cod_amount(&self) -> Option<f64> {
        match self.status {
            AssignmentStatus::Delivered if self.is_cod_collected => self.total_amount,
            _ => None,
        }
    }
}

/// Money amounts arrive as decimal strings ("150000.00"), numbers, or null.
fn amount_from_wire<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Number(f64),
        Text(String),
    }

    match Option::<Amount>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Amount::Number(n)) => Ok(Some(n)),
        Some(Amount::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Amount::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid amount '{}'", s))),
    }
}

// ============================================================================
// Transition payload
// ============================================================================

/// Cash-on-delivery outcome reported when completing a delivery
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CodOutcome {
    /// Cash collected; amount in the order's currency units
    Collected(f64),
    /// No cash collected (prepaid order or courier did not collect)
    NotCollected,
}

/// Extra data accompanying a status transition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionPayload {
    pub note: Option<String>,
    /// Failure or return reason, sent as `unexpectedCase`
    pub reason: Option<String>,
    pub is_cod_collected: Option<bool>,
    pub cod_amount: Option<f64>,
}

impl TransitionPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_cod(mut self, outcome: CodOutcome) -> Self {
        match outcome {
            CodOutcome::Collected(amount) => {
                self.is_cod_collected = Some(true);
                self.cod_amount = Some(amount);
            }
            CodOutcome::NotCollected => {
                self.is_cod_collected = Some(false);
                self.cod_amount = None;
            }
        }
        self
    }

    /// Check target-specific constraints.
    ///
    /// - `DELIVERED` requires `is_cod_collected`; when true a finite,
    ///   non-negative `cod_amount` is required, when false it must be absent.
    /// - Any other target must carry no COD fields.
    /// - `ASSIGNED` is a claim and carries no payload at all.
    /// - `FAILED` and `RETURNED` require a non-empty reason.
    pub fn validate_for(&self, target: AssignmentStatus) -> Result<()> {
        match target {
            AssignmentStatus::Delivered => match (self.is_cod_collected, self.cod_amount) {
                (None, _) => Err(CourierError::validation(
                    "DELIVERED requires isCodCollected",
                )),
                (Some(true), None) => Err(CourierError::validation(
                    "codAmount is required when COD was collected",
                )),
                (Some(true), Some(amount)) if !amount.is_finite() || amount < 0.0 => {
                    Err(CourierError::validation(format!(
                        "codAmount must be a non-negative number, got {}",
                        amount
                    )))
                }
                (Some(false), Some(_)) => Err(CourierError::validation(
                    "codAmount must be absent when COD was not collected",
                )),
                _ => Ok(()),
            },
            _ if self.is_cod_collected.is_some() || self.cod_amount.is_some() => {
                Err(CourierError::validation(format!(
                    "COD fields are only accepted for DELIVERED, not {}",
                    target
                )))
            }
            AssignmentStatus::Assigned if self.note.is_some() || self.reason.is_some() => {
                Err(CourierError::validation(
                    "ASSIGNED is a claim and accepts no note or reason",
                ))
            }
            AssignmentStatus::Failed | AssignmentStatus::Returned => {
                match self.reason.as_deref().map(str::trim) {
                    Some(reason) if !reason.is_empty() => Ok(()),
                    _ => Err(CourierError::validation(format!(
                        "{} requires a reason",
                        target
                    ))),
                }
            }
            _ => Ok(()),
        }
    }
}

/// Body of a status update request:
/// `{status, note?, unexpectedCase?, isCodCollected?, totalAmount?}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: AssignmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unexpected_case: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_cod_collected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
}

impl StatusUpdate {
    pub fn new(status: AssignmentStatus, payload: TransitionPayload) -> Self {
        Self {
            status,
            note: payload.note,
            unexpected_case: payload.reason.map(|r| r.trim().to_string()),
            is_cod_collected: payload.is_cod_collected,
            total_amount: payload.cod_amount,
        }
    }
}
