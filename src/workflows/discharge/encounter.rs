use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{
    EncounterId, EncounterStatus, Facility, NewTask, NewTransportOrder, Patient, PlacementId,
    PlacementRequest, PlacementStatus, ScoreSnapshot, Signal, SignalId, SignalKind, SignalStatus,
    SnapshotId, Task, TaskId, TaskPriority, TaskStatus, TransportOrder, TransportOrderId,
    TransportStatus, UserRole,
};
use super::error::{DischargeError, EntityKind, StateViolation};
use super::permissions::{ensure_permitted, Action};
use super::placement::accepted_placement;
use super::policy::{DischargePolicy, DuplicateSignalPolicy};
use super::scoring::{canonical_signals, compute_readiness_score, ReadinessScore};

static SIGNAL_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static TASK_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static PLACEMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static TRANSPORT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static SNAPSHOT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_id(sequence: &AtomicU64, prefix: &str) -> String {
    let id = sequence.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{id:06}")
}

/// Aggregate root for one hospital stay.
///
/// Every operation validates before it mutates, so a failed call leaves the
/// encounter untouched. Discharge timestamps fill in order and never precede
/// the previous milestone: `admit <= started <= ready <= left unit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    pub(super) id: EncounterId,
    pub(super) patient: Patient,
    pub(super) status: EncounterStatus,
    pub(super) started_discharge_ts: Option<DateTime<Utc>>,
    pub(super) discharge_ready_ts: Option<DateTime<Utc>>,
    pub(super) left_unit_ts: Option<DateTime<Utc>>,
    pub(super) signals: Vec<Signal>,
    pub(super) tasks: Vec<Task>,
    pub(super) placements: Vec<PlacementRequest>,
    pub(super) transport_orders: Vec<TransportOrder>,
    pub(super) score_snapshots: Vec<ScoreSnapshot>,
}

impl Encounter {
    pub fn new(id: EncounterId, patient: Patient) -> Self {
        Self {
            id,
            patient,
            status: EncounterStatus::Active,
            started_discharge_ts: None,
            discharge_ready_ts: None,
            left_unit_ts: None,
            signals: Vec::new(),
            tasks: Vec::new(),
            placements: Vec::new(),
            transport_orders: Vec::new(),
            score_snapshots: Vec::new(),
        }
    }

    pub fn id(&self) -> &EncounterId {
        &self.id
    }

    pub fn patient(&self) -> &Patient {
        &self.patient
    }

    pub fn status(&self) -> EncounterStatus {
        self.status
    }

    pub fn started_discharge_ts(&self) -> Option<DateTime<Utc>> {
        self.started_discharge_ts
    }

    pub fn discharge_ready_ts(&self) -> Option<DateTime<Utc>> {
        self.discharge_ready_ts
    }

    pub fn left_unit_ts(&self) -> Option<DateTime<Utc>> {
        self.left_unit_ts
    }

    /// Signals in creation order.
    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn placements(&self) -> &[PlacementRequest] {
        &self.placements
    }

    pub fn transport_orders(&self) -> &[TransportOrder] {
        &self.transport_orders
    }

    pub fn score_history(&self) -> &[ScoreSnapshot] {
        &self.score_snapshots
    }

    pub fn latest_snapshot(&self) -> Option<&ScoreSnapshot> {
        self.score_snapshots.last()
    }

    pub fn signal(&self, id: &SignalId) -> Option<&Signal> {
        self.signals.iter().find(|signal| &signal.id == id)
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    pub fn placement(&self, id: &PlacementId) -> Option<&PlacementRequest> {
        self.placements.iter().find(|placement| &placement.id == id)
    }

    pub fn transport_order(&self, id: &TransportOrderId) -> Option<&TransportOrder> {
        self.transport_orders.iter().find(|order| &order.id == id)
    }

    pub fn accepted_placement(&self) -> Option<&PlacementRequest> {
        accepted_placement(&self.placements)
    }

    pub fn open_task_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|task| task.status != TaskStatus::Complete)
            .count()
    }

    /// Discharged encounters are sealed and may be archived externally.
    pub fn is_archivable(&self) -> bool {
        self.status == EncounterStatus::Discharged
    }

    fn ensure_active(&self) -> Result<(), DischargeError> {
        match self.status {
            EncounterStatus::Active => Ok(()),
            EncounterStatus::Discharged => Err(self.violation(StateViolation::EncounterDischarged)),
        }
    }

    fn violation(&self, violation: StateViolation) -> DischargeError {
        DischargeError::invalid_state(EntityKind::Encounter, &self.id, violation)
    }

    fn ensure_not_before(
        &self,
        previous: DateTime<Utc>,
        attempted: DateTime<Utc>,
    ) -> Result<(), DischargeError> {
        if attempted < previous {
            Err(self.violation(StateViolation::TimestampOutOfOrder {
                previous,
                attempted,
            }))
        } else {
            Ok(())
        }
    }

    fn signal_index(&self, id: &SignalId) -> Result<usize, DischargeError> {
        self.signals
            .iter()
            .position(|signal| &signal.id == id)
            .ok_or_else(|| DischargeError::not_found(EntityKind::Signal, id))
    }

    fn task_index(&self, id: &TaskId) -> Result<usize, DischargeError> {
        self.tasks
            .iter()
            .position(|task| &task.id == id)
            .ok_or_else(|| DischargeError::not_found(EntityKind::Task, id))
    }

    fn placement_index(&self, id: &PlacementId) -> Result<usize, DischargeError> {
        self.placements
            .iter()
            .position(|placement| &placement.id == id)
            .ok_or_else(|| DischargeError::not_found(EntityKind::Placement, id))
    }

    fn transport_index(&self, id: &TransportOrderId) -> Result<usize, DischargeError> {
        self.transport_orders
            .iter()
            .position(|order| &order.id == id)
            .ok_or_else(|| DischargeError::not_found(EntityKind::TransportOrder, id))
    }

    // Signals

    /// Records a signal arriving from an upstream feed (lab results,
    /// pharmacy verification, payer responses). Not an actor operation.
    pub fn ingest_signal(
        &mut self,
        kind: SignalKind,
        status: SignalStatus,
        details: Option<serde_json::Value>,
        now: DateTime<Utc>,
        policy: &DischargePolicy,
    ) -> Result<Signal, DischargeError> {
        self.ensure_active()?;
        if policy.duplicate_signals == DuplicateSignalPolicy::Reject
            && self.signals.iter().any(|signal| signal.kind == kind)
        {
            return Err(DischargeError::invalid_input("kind", kind.as_str()));
        }

        let signal = Signal {
            id: SignalId(next_id(&SIGNAL_SEQUENCE, "sig")),
            encounter_id: self.id.clone(),
            kind,
            status,
            details,
            last_updated_ts: now,
        };
        self.signals.push(signal.clone());
        self.record_snapshot(now);
        Ok(signal)
    }

    /// Any status may follow any other; the timestamp refreshes even when the
    /// status is unchanged.
    pub fn transition_signal(
        &mut self,
        signal_id: &SignalId,
        status: SignalStatus,
        actor: UserRole,
        now: DateTime<Utc>,
    ) -> Result<Signal, DischargeError> {
        ensure_permitted(actor, Action::CompleteSignal)?;
        self.ensure_active()?;
        let index = self.signal_index(signal_id)?;

        let signal = &mut self.signals[index];
        signal.status = status;
        signal.last_updated_ts = now;
        let updated = signal.clone();

        self.record_snapshot(now);
        Ok(updated)
    }

    /// Marks the most recently updated education signal complete.
    pub fn record_patient_education(
        &mut self,
        actor: UserRole,
        now: DateTime<Utc>,
    ) -> Result<Signal, DischargeError> {
        ensure_permitted(actor, Action::PatientEducation)?;
        self.ensure_active()?;
        let index = self
            .signals
            .iter()
            .enumerate()
            .filter(|(_, signal)| signal.kind == SignalKind::Education)
            .max_by_key(|(_, signal)| signal.last_updated_ts)
            .map(|(index, _)| index)
            .ok_or_else(|| {
                DischargeError::not_found(EntityKind::Signal, SignalKind::Education.as_str())
            })?;

        let signal = &mut self.signals[index];
        signal.status = SignalStatus::Complete;
        signal.last_updated_ts = now;
        let updated = signal.clone();

        self.record_snapshot(now);
        Ok(updated)
    }

    // Tasks

    pub fn create_task(&mut self, new_task: NewTask, actor: UserRole) -> Result<Task, DischargeError> {
        ensure_permitted(actor, Action::CreateTask)?;
        self.ensure_active()?;

        let task_type = new_task.task_type.trim();
        if task_type.is_empty() {
            return Err(DischargeError::invalid_input("task_type", &new_task.task_type));
        }
        let priority = TaskPriority::try_from(new_task.priority)?;

        let task = Task {
            id: TaskId(next_id(&TASK_SEQUENCE, "task")),
            encounter_id: self.id.clone(),
            task_type: task_type.to_string(),
            owner_role: new_task.owner_role,
            owner_user_id: new_task.owner_user_id,
            status: TaskStatus::Open,
            priority,
            due_ts: new_task.due_ts,
            completed_ts: None,
            notes: new_task.notes,
        };
        self.tasks.push(task.clone());
        Ok(task)
    }

    /// `completed_ts` is set exactly while the task is complete.
    pub fn transition_task(
        &mut self,
        task_id: &TaskId,
        status: TaskStatus,
        actor: UserRole,
        now: DateTime<Utc>,
    ) -> Result<Task, DischargeError> {
        ensure_permitted(actor, Action::CompleteTask)?;
        self.ensure_active()?;
        let index = self.task_index(task_id)?;

        let task = &mut self.tasks[index];
        task.status = status;
        task.completed_ts = match status {
            TaskStatus::Complete => Some(now),
            TaskStatus::Open | TaskStatus::InProgress => None,
        };
        Ok(task.clone())
    }

    // Placements

    pub fn send_placement(
        &mut self,
        facility: &Facility,
        notes: Option<String>,
        actor: UserRole,
        now: DateTime<Utc>,
        policy: &DischargePolicy,
    ) -> Result<PlacementRequest, DischargeError> {
        ensure_permitted(actor, Action::SendPlacement)?;
        self.ensure_active()?;
        if policy.exclusive_placement && self.accepted_placement().is_some() {
            return Err(self.violation(StateViolation::PlacementAlreadyAccepted));
        }

        let placement = PlacementRequest::sent(
            PlacementId(next_id(&PLACEMENT_SEQUENCE, "plc")),
            self.id.clone(),
            facility,
            notes,
            now,
        );
        self.placements.push(placement.clone());
        Ok(placement)
    }

    pub fn record_placement_response(
        &mut self,
        placement_id: &PlacementId,
        actor: UserRole,
        now: DateTime<Utc>,
    ) -> Result<PlacementRequest, DischargeError> {
        ensure_permitted(actor, Action::SendPlacement)?;
        self.ensure_active()?;
        let index = self.placement_index(placement_id)?;

        let placement = &mut self.placements[index];
        placement.respond(now)?;
        Ok(placement.clone())
    }

    /// Under an exclusive policy the remaining open requests are declined in
    /// the same step.
    pub fn accept_placement(
        &mut self,
        placement_id: &PlacementId,
        facility: &Facility,
        actor: UserRole,
        now: DateTime<Utc>,
        policy: &DischargePolicy,
    ) -> Result<PlacementRequest, DischargeError> {
        ensure_permitted(actor, Action::AcceptPlacement)?;
        self.ensure_active()?;
        let index = self.placement_index(placement_id)?;
        self.placements[index].check_acceptable(facility)?;

        if policy.exclusive_placement && self.accepted_placement().is_some() {
            return Err(DischargeError::invalid_state(
                EntityKind::Placement,
                placement_id,
                StateViolation::PlacementAlreadyAccepted,
            ));
        }

        self.placements[index].accept(now);
        if policy.exclusive_placement {
            for (position, sibling) in self.placements.iter_mut().enumerate() {
                if position != index && sibling.status.is_open() {
                    sibling.status = PlacementStatus::Declined;
                    sibling.declined_ts = Some(now);
                }
            }
        }
        Ok(self.placements[index].clone())
    }

    pub fn decline_placement(
        &mut self,
        placement_id: &PlacementId,
        actor: UserRole,
        now: DateTime<Utc>,
    ) -> Result<PlacementRequest, DischargeError> {
        ensure_permitted(actor, Action::AcceptPlacement)?;
        self.ensure_active()?;
        let index = self.placement_index(placement_id)?;

        let placement = &mut self.placements[index];
        placement.decline(now)?;
        Ok(placement.clone())
    }

    // Transport

    pub fn schedule_transport(
        &mut self,
        order: NewTransportOrder,
        actor: UserRole,
    ) -> Result<TransportOrder, DischargeError> {
        ensure_permitted(actor, Action::ScheduleTransport)?;
        self.ensure_active()?;

        let vendor = order.vendor.trim();
        if vendor.is_empty() {
            return Err(DischargeError::invalid_input("vendor", &order.vendor));
        }

        let transport = TransportOrder::requested(
            TransportOrderId(next_id(&TRANSPORT_SEQUENCE, "trn")),
            self.id.clone(),
            vendor.to_string(),
            order.pickup_ts,
            order.notes,
        );
        self.transport_orders.push(transport.clone());
        Ok(transport)
    }

    pub fn set_transport_pickup(
        &mut self,
        order_id: &TransportOrderId,
        pickup_ts: DateTime<Utc>,
        actor: UserRole,
    ) -> Result<TransportOrder, DischargeError> {
        ensure_permitted(actor, Action::ScheduleTransport)?;
        self.ensure_active()?;
        let index = self.transport_index(order_id)?;

        let order = &mut self.transport_orders[index];
        order.set_pickup(pickup_ts)?;
        Ok(order.clone())
    }

    /// Moves an order exactly one step forward.
    pub fn advance_transport(
        &mut self,
        order_id: &TransportOrderId,
        next: TransportStatus,
        actor: UserRole,
    ) -> Result<TransportOrder, DischargeError> {
        ensure_permitted(actor, Action::ScheduleTransport)?;
        self.ensure_active()?;
        let index = self.transport_index(order_id)?;

        let order = &mut self.transport_orders[index];
        order.advance(next)?;
        Ok(order.clone())
    }

    // Discharge timeline

    pub fn start_discharge(
        &mut self,
        actor: UserRole,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, DischargeError> {
        ensure_permitted(actor, Action::StartDischarge)?;
        self.ensure_active()?;
        if self.started_discharge_ts.is_some() {
            return Err(self.violation(StateViolation::DischargeAlreadyStarted));
        }
        self.ensure_not_before(self.patient.admit_ts, now)?;

        self.started_discharge_ts = Some(now);
        Ok(now)
    }

    pub fn mark_ready(
        &mut self,
        actor: UserRole,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, DischargeError> {
        ensure_permitted(actor, Action::StartDischarge)?;
        self.ensure_active()?;
        let started = self
            .started_discharge_ts
            .ok_or_else(|| self.violation(StateViolation::DischargeNotStarted))?;
        if self.discharge_ready_ts.is_some() {
            return Err(self.violation(StateViolation::AlreadyReady));
        }
        self.ensure_not_before(started, now)?;

        self.discharge_ready_ts = Some(now);
        Ok(now)
    }

    /// Records the patient leaving the unit and seals the encounter.
    pub fn mark_discharged(
        &mut self,
        actor: UserRole,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, DischargeError> {
        ensure_permitted(actor, Action::StartDischarge)?;
        self.ensure_active()?;
        let ready = self
            .discharge_ready_ts
            .ok_or_else(|| self.violation(StateViolation::NotReady))?;
        self.ensure_not_before(ready, now)?;

        self.left_unit_ts = Some(now);
        self.status = EncounterStatus::Discharged;
        Ok(now)
    }

    // Scoring

    /// Score over the canonical signal set without recording it.
    pub fn preview_score(&self) -> ReadinessScore {
        compute_readiness_score(&canonical_signals(&self.signals))
    }

    /// Recomputes the score and appends a snapshot while the encounter is
    /// active; sealed encounters only report.
    pub fn current_score(&mut self, now: DateTime<Utc>) -> ReadinessScore {
        match self.status {
            EncounterStatus::Active => self.record_snapshot(now),
            EncounterStatus::Discharged => self.preview_score(),
        }
    }

    pub(super) fn record_snapshot(&mut self, now: DateTime<Utc>) -> ReadinessScore {
        let score = self.preview_score();
        debug!(
            encounter_id = %self.id,
            score = score.score,
            label = score.label.as_str(),
            pending = score.pending_count,
            critical = score.critical_count,
            "readiness score computed"
        );

        self.score_snapshots.push(ScoreSnapshot {
            id: SnapshotId(next_id(&SNAPSHOT_SEQUENCE, "snap")),
            encounter_id: self.id.clone(),
            score: score.score,
            label: score.label,
            pending_count: score.pending_count,
            critical_count: score.critical_count,
            computed_ts: now,
            breakdown: score.breakdown.clone(),
        });
        score
    }
}
