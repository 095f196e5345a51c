use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::clock::{Clock, SystemClock};
use super::dashboard::{build_dashboard, DashboardQuery, DashboardView};
use super::domain::{
    EncounterId, Facility, FacilityId, NewTask, NewTransportOrder, Patient, PlacementId,
    PlacementRequest, ScoreSnapshot, Signal, SignalId, SignalKind, SignalStatus, Task, TaskId,
    TaskStatus, TransportOrder, TransportOrderId, TransportStatus, UserRole,
};
use super::encounter::Encounter;
use super::error::{DischargeError, EntityKind, ErrorKind};
use super::permissions::{ensure_permitted, Action};
use super::policy::DischargePolicy;
use super::repository::{EncounterRepository, RepositoryError};
use super::scoring::ReadinessScore;
use crate::workflows::directory::FacilityDirectory;

static ENCOUNTER_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_encounter_id() -> EncounterId {
    let id = ENCOUNTER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    EncounterId(format!("enc-{id:06}"))
}

/// Service composing the encounter repository, facility directory, and clock.
///
/// Mutations on one encounter are serialized behind a per-encounter lock and
/// written back only when the operation succeeds.
pub struct DischargeService<R, F> {
    repository: Arc<R>,
    directory: Arc<F>,
    clock: Arc<dyn Clock>,
    policy: DischargePolicy,
    locks: Mutex<HashMap<EncounterId, Arc<Mutex<()>>>>,
}

impl<R, F> DischargeService<R, F>
where
    R: EncounterRepository + 'static,
    F: FacilityDirectory + 'static,
{
    pub fn new(repository: Arc<R>, directory: Arc<F>, policy: DischargePolicy) -> Self {
        Self::with_clock(repository, directory, policy, Arc::new(SystemClock))
    }

    pub fn with_clock(
        repository: Arc<R>,
        directory: Arc<F>,
        policy: DischargePolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            directory,
            clock,
            policy,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> DischargePolicy {
        self.policy
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Opens a new encounter for an admitted patient.
    pub fn admit(&self, patient: Patient) -> Result<Encounter, DischargeServiceError> {
        let encounter = Encounter::new(next_encounter_id(), patient);
        let stored = self.repository.insert(encounter)?;
        info!(encounter_id = %stored.id(), patient_id = %stored.patient().id, "encounter admitted");
        Ok(stored)
    }

    /// Stores a pre-built encounter, e.g. one loaded from a census.
    pub fn register(&self, encounter: Encounter) -> Result<Encounter, DischargeServiceError> {
        let stored = self.repository.insert(encounter)?;
        info!(encounter_id = %stored.id(), patient_id = %stored.patient().id, "encounter registered");
        Ok(stored)
    }

    pub fn encounter(&self, encounter_id: &EncounterId) -> Result<Encounter, DischargeServiceError> {
        self.repository
            .fetch(encounter_id)?
            .ok_or_else(|| DischargeError::not_found(EntityKind::Encounter, encounter_id).into())
    }

    pub fn encounters(&self) -> Result<Vec<Encounter>, DischargeServiceError> {
        Ok(self.repository.list()?)
    }

    pub fn list_signals(&self, encounter_id: &EncounterId) -> Result<Vec<Signal>, DischargeServiceError> {
        Ok(self.encounter(encounter_id)?.signals().to_vec())
    }

    pub fn score_history(
        &self,
        encounter_id: &EncounterId,
    ) -> Result<Vec<ScoreSnapshot>, DischargeServiceError> {
        Ok(self.encounter(encounter_id)?.score_history().to_vec())
    }

    pub fn facilities(&self) -> Vec<Facility> {
        self.directory.facilities()
    }

    pub fn dashboard(&self, query: &DashboardQuery) -> Result<DashboardView, DischargeServiceError> {
        let encounters = self.repository.list()?;
        Ok(build_dashboard(&encounters, query))
    }

    pub fn ingest_signal(
        &self,
        encounter_id: &EncounterId,
        kind: SignalKind,
        status: SignalStatus,
        details: Option<serde_json::Value>,
    ) -> Result<Signal, DischargeServiceError> {
        let policy = self.policy;
        self.mutate(encounter_id, "ingest_signal", None, |encounter, now| {
            encounter.ingest_signal(kind, status, details, now, &policy)
        })
    }

    pub fn transition_signal(
        &self,
        encounter_id: &EncounterId,
        signal_id: &SignalId,
        status: SignalStatus,
        actor: UserRole,
    ) -> Result<Signal, DischargeServiceError> {
        self.mutate(encounter_id, "transition_signal", Some(actor), |encounter, now| {
            encounter.transition_signal(signal_id, status, actor, now)
        })
    }

    pub fn record_patient_education(
        &self,
        encounter_id: &EncounterId,
        actor: UserRole,
    ) -> Result<Signal, DischargeServiceError> {
        self.mutate(
            encounter_id,
            "record_patient_education",
            Some(actor),
            |encounter, now| encounter.record_patient_education(actor, now),
        )
    }

    pub fn create_task(
        &self,
        encounter_id: &EncounterId,
        new_task: NewTask,
        actor: UserRole,
    ) -> Result<Task, DischargeServiceError> {
        self.mutate(encounter_id, "create_task", Some(actor), |encounter, _| {
            encounter.create_task(new_task, actor)
        })
    }

    pub fn transition_task(
        &self,
        encounter_id: &EncounterId,
        task_id: &TaskId,
        status: TaskStatus,
        actor: UserRole,
    ) -> Result<Task, DischargeServiceError> {
        self.mutate(encounter_id, "transition_task", Some(actor), |encounter, now| {
            encounter.transition_task(task_id, status, actor, now)
        })
    }

    pub fn send_placement(
        &self,
        encounter_id: &EncounterId,
        facility_id: &FacilityId,
        notes: Option<String>,
        actor: UserRole,
    ) -> Result<PlacementRequest, DischargeServiceError> {
        let policy = self.policy;
        self.mutate(encounter_id, "send_placement", Some(actor), |encounter, now| {
            ensure_permitted(actor, Action::SendPlacement)?;
            let facility = self.resolve_facility(facility_id)?;
            encounter.send_placement(&facility, notes, actor, now, &policy)
        })
    }

    pub fn record_placement_response(
        &self,
        encounter_id: &EncounterId,
        placement_id: &PlacementId,
        actor: UserRole,
    ) -> Result<PlacementRequest, DischargeServiceError> {
        self.mutate(
            encounter_id,
            "record_placement_response",
            Some(actor),
            |encounter, now| encounter.record_placement_response(placement_id, actor, now),
        )
    }

    /// Capacity is checked against the directory's current view of the facility.
    pub fn accept_placement(
        &self,
        encounter_id: &EncounterId,
        placement_id: &PlacementId,
        actor: UserRole,
    ) -> Result<PlacementRequest, DischargeServiceError> {
        let policy = self.policy;
        self.mutate(encounter_id, "accept_placement", Some(actor), |encounter, now| {
            ensure_permitted(actor, Action::AcceptPlacement)?;
            let facility_id = encounter
                .placement(placement_id)
                .map(|placement| placement.facility_id.clone())
                .ok_or_else(|| DischargeError::not_found(EntityKind::Placement, placement_id))?;
            let facility = self.resolve_facility(&facility_id)?;
            encounter.accept_placement(placement_id, &facility, actor, now, &policy)
        })
    }

    pub fn decline_placement(
        &self,
        encounter_id: &EncounterId,
        placement_id: &PlacementId,
        actor: UserRole,
    ) -> Result<PlacementRequest, DischargeServiceError> {
        self.mutate(encounter_id, "decline_placement", Some(actor), |encounter, now| {
            encounter.decline_placement(placement_id, actor, now)
        })
    }

    pub fn schedule_transport(
        &self,
        encounter_id: &EncounterId,
        order: NewTransportOrder,
        actor: UserRole,
    ) -> Result<TransportOrder, DischargeServiceError> {
        self.mutate(encounter_id, "schedule_transport", Some(actor), |encounter, _| {
            encounter.schedule_transport(order, actor)
        })
    }

    pub fn set_transport_pickup(
        &self,
        encounter_id: &EncounterId,
        order_id: &TransportOrderId,
        pickup_ts: DateTime<Utc>,
        actor: UserRole,
    ) -> Result<TransportOrder, DischargeServiceError> {
        self.mutate(encounter_id, "set_transport_pickup", Some(actor), |encounter, _| {
            encounter.set_transport_pickup(order_id, pickup_ts, actor)
        })
    }

    pub fn advance_transport(
        &self,
        encounter_id: &EncounterId,
        order_id: &TransportOrderId,
        next: TransportStatus,
        actor: UserRole,
    ) -> Result<TransportOrder, DischargeServiceError> {
        self.mutate(encounter_id, "advance_transport", Some(actor), |encounter, _| {
            encounter.advance_transport(order_id, next, actor)
        })
    }

    pub fn start_discharge(
        &self,
        encounter_id: &EncounterId,
        actor: UserRole,
    ) -> Result<DateTime<Utc>, DischargeServiceError> {
        self.mutate(encounter_id, "start_discharge", Some(actor), |encounter, now| {
            encounter.start_discharge(actor, now)
        })
    }

    pub fn mark_ready(
        &self,
        encounter_id: &EncounterId,
        actor: UserRole,
    ) -> Result<DateTime<Utc>, DischargeServiceError> {
        self.mutate(encounter_id, "mark_ready", Some(actor), |encounter, now| {
            encounter.mark_ready(actor, now)
        })
    }

    pub fn mark_discharged(
        &self,
        encounter_id: &EncounterId,
        actor: UserRole,
    ) -> Result<DateTime<Utc>, DischargeServiceError> {
        self.mutate(encounter_id, "mark_discharged", Some(actor), |encounter, now| {
            encounter.mark_discharged(actor, now)
        })
    }

    /// Recomputes the readiness score, recording a snapshot for active encounters.
    pub fn current_score(
        &self,
        encounter_id: &EncounterId,
    ) -> Result<ReadinessScore, DischargeServiceError> {
        self.mutate(encounter_id, "current_score", None, |encounter, now| {
            Ok(encounter.current_score(now))
        })
    }

    fn resolve_facility(&self, facility_id: &FacilityId) -> Result<Facility, DischargeError> {
        self.directory
            .facility(facility_id)
            .ok_or_else(|| DischargeError::not_found(EntityKind::Facility, facility_id))
    }

    /// Lock entries exist only for stored encounters.
    fn encounter_lock(
        &self,
        encounter_id: &EncounterId,
    ) -> Result<Arc<Mutex<()>>, DischargeServiceError> {
        if let Some(lock) = self.lock_table().get(encounter_id) {
            return Ok(lock.clone());
        }
        if self.repository.fetch(encounter_id)?.is_none() {
            return Err(DischargeError::not_found(EntityKind::Encounter, encounter_id).into());
        }
        Ok(self
            .lock_table()
            .entry(encounter_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    fn lock_table(&self) -> MutexGuard<'_, HashMap<EncounterId, Arc<Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    pub(crate) fn tracked_encounters(&self) -> usize {
        self.lock_table().len()
    }

    fn mutate<T>(
        &self,
        encounter_id: &EncounterId,
        operation: &'static str,
        actor: Option<UserRole>,
        apply: impl FnOnce(&mut Encounter, DateTime<Utc>) -> Result<T, DischargeError>,
    ) -> Result<T, DischargeServiceError> {
        let lock = self.encounter_lock(encounter_id)?;
        // Stored state only changes on success, so a poisoned guard is still consistent.
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut working = self.encounter(encounter_id)?;
        let now = self.clock.now();
        match apply(&mut working, now) {
            Ok(value) => {
                self.repository.update(working)?;
                info!(%encounter_id, operation, ?actor, "discharge operation applied");
                Ok(value)
            }
            Err(error) => {
                warn!(
                    %encounter_id,
                    operation,
                    ?actor,
                    kind = ?error.kind(),
                    %error,
                    "discharge operation rejected"
                );
                Err(error.into())
            }
        }
    }
}

/// Error raised by the discharge service.
#[derive(Debug, thiserror::Error)]
pub enum DischargeServiceError {
    #[error(transparent)]
    Discharge(#[from] DischargeError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl DischargeServiceError {
    /// Domain error kind, or `None` for storage failures.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Discharge(error) => Some(error.kind()),
            Self::Repository(_) => None,
        }
    }
}
