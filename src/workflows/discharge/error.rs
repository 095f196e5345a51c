use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{PlacementStatus, TransportStatus};
use super::permissions::Action;

/// Entity named in a failure's context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Encounter,
    Signal,
    Task,
    Placement,
    Facility,
    TransportOrder,
}

impl EntityKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Encounter => "encounter",
            Self::Signal => "signal",
            Self::Task => "task",
            Self::Placement => "placement",
            Self::Facility => "facility",
            Self::TransportOrder => "transport_order",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which state-machine or ordering rule an operation broke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum StateViolation {
    EncounterDischarged,
    DischargeAlreadyStarted,
    DischargeNotStarted,
    AlreadyReady,
    NotReady,
    TimestampOutOfOrder {
        previous: DateTime<Utc>,
        attempted: DateTime<Utc>,
    },
    FacilityFull,
    FacilityMismatch,
    PlacementAlreadyAccepted,
    PlacementTransition {
        from: PlacementStatus,
        to: PlacementStatus,
    },
    TransportTransition {
        from: TransportStatus,
        to: TransportStatus,
    },
    PickupNotSet,
}

impl fmt::Display for StateViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EncounterDischarged => write!(f, "encounter already discharged"),
            Self::DischargeAlreadyStarted => write!(f, "discharge already started"),
            Self::DischargeNotStarted => write!(f, "discharge not started"),
            Self::AlreadyReady => write!(f, "already marked ready"),
            Self::NotReady => write!(f, "not marked ready"),
            Self::TimestampOutOfOrder {
                previous,
                attempted,
            } => write!(f, "{attempted} precedes {previous}"),
            Self::FacilityFull => write!(f, "facility at full capacity"),
            Self::FacilityMismatch => write!(f, "facility does not match request"),
            Self::PlacementAlreadyAccepted => write!(f, "a placement is already accepted"),
            Self::PlacementTransition { from, to } => {
                write!(f, "placement cannot move from {from:?} to {to:?}")
            }
            Self::TransportTransition { from, to } => {
                write!(f, "transport cannot move from {from:?} to {to:?}")
            }
            Self::PickupNotSet => write!(f, "pickup time not set"),
        }
    }
}

/// Structured failure returned by every discharge operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DischargeError {
    #[error("role '{role}' may not {action}")]
    PermissionDenied { role: String, action: Action },
    #[error("{entity} '{id}' not found")]
    NotFound { entity: EntityKind, id: String },
    #[error("{entity} '{id}': {violation}")]
    InvalidState {
        entity: EntityKind,
        id: String,
        violation: StateViolation,
    },
    #[error("invalid {field} '{value}'")]
    InvalidInput { field: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PermissionDenied,
    NotFound,
    InvalidState,
    InvalidInput,
}

impl DischargeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
        }
    }

    pub fn not_found(entity: EntityKind, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_state(
        entity: EntityKind,
        id: impl fmt::Display,
        violation: StateViolation,
    ) -> Self {
        Self::InvalidState {
            entity,
            id: id.to_string(),
            violation,
        }
    }

    pub fn invalid_input(field: &'static str, value: impl fmt::Display) -> Self {
        Self::InvalidInput {
            field,
            value: value.to_string(),
        }
    }
}
