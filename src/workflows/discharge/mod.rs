//! Discharge readiness orchestration.
//!
//! An [`Encounter`] aggregates readiness signals, tasks, placement requests,
//! and transport orders for one hospital stay. [`DischargeService`] serializes
//! mutations per encounter over an [`EncounterRepository`] and resolves
//! facilities through a [`FacilityDirectory`](crate::workflows::directory::FacilityDirectory).

pub mod census;
pub mod clock;
pub mod dashboard;
pub mod domain;
pub mod encounter;
pub mod error;
pub mod permissions;
pub(crate) mod placement;
pub mod policy;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub(crate) mod transport;

#[cfg(test)]
mod tests;

pub use census::SampleCensus;
pub use clock::{Clock, FixedClock, SystemClock};
pub use dashboard::{build_dashboard, DashboardQuery, DashboardRow, DashboardStats, DashboardView};
pub use domain::{
    CapacityStatus, EncounterId, EncounterStatus, Facility, FacilityId, FacilityKind, NewTask,
    NewTransportOrder, Patient, PatientId, PlacementId, PlacementRequest, PlacementStatus,
    ScoreBreakdownEntry, ScoreLabel, ScoreSnapshot, Sex, Signal, SignalId, SignalKind,
    SignalStatus, SnapshotId, Task, TaskId, TaskPriority, TaskStatus, TransportOrder,
    TransportOrderId, TransportStatus, User, UserId, UserRole,
};
pub use encounter::Encounter;
pub use error::{DischargeError, EntityKind, ErrorKind, StateViolation};
pub use permissions::{can_perform, can_perform_action, permitted_actions, Action};
pub use placement::accepted_placement;
pub use policy::{DischargePolicy, DuplicateSignalPolicy};
pub use repository::{EncounterRepository, InMemoryEncounterRepository, RepositoryError};
pub use router::discharge_router;
pub use scoring::{canonical_signals, compute_readiness_score, ReadinessScore};
pub use service::{DischargeService, DischargeServiceError};
