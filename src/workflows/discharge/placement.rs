use chrono::{DateTime, Utc};

use super::domain::{EncounterId, Facility, PlacementId, PlacementRequest, PlacementStatus};
use super::error::{DischargeError, EntityKind, StateViolation};

impl PlacementRequest {
    /// Sending skips an explicit draft: the packet goes out on creation.
    pub(crate) fn sent(
        id: PlacementId,
        encounter_id: EncounterId,
        facility: &Facility,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            encounter_id,
            facility_id: facility.id.clone(),
            status: PlacementStatus::Sent,
            packet_sent_ts: Some(now),
            responded_ts: None,
            accepted_ts: None,
            declined_ts: None,
            notes,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    pub(crate) fn check_transition(&self, to: PlacementStatus) -> Result<(), DischargeError> {
        if self.status.can_transition_to(to) {
            Ok(())
        } else {
            Err(DischargeError::invalid_state(
                EntityKind::Placement,
                &self.id,
                StateViolation::PlacementTransition {
                    from: self.status,
                    to,
                },
            ))
        }
    }

    pub(crate) fn check_acceptable(&self, facility: &Facility) -> Result<(), DischargeError> {
        if facility.id != self.facility_id {
            return Err(DischargeError::invalid_state(
                EntityKind::Placement,
                &self.id,
                StateViolation::FacilityMismatch,
            ));
        }
        if facility.is_full() {
            return Err(DischargeError::invalid_state(
                EntityKind::Placement,
                &self.id,
                StateViolation::FacilityFull,
            ));
        }
        self.check_transition(PlacementStatus::Accepted)
    }

    pub(crate) fn respond(&mut self, now: DateTime<Utc>) -> Result<(), DischargeError> {
        self.check_transition(PlacementStatus::Responded)?;
        self.status = PlacementStatus::Responded;
        self.responded_ts = Some(now);
        Ok(())
    }

    pub(crate) fn accept(&mut self, now: DateTime<Utc>) {
        self.status = PlacementStatus::Accepted;
        self.accepted_ts = Some(now);
    }

    pub(crate) fn decline(&mut self, now: DateTime<Utc>) -> Result<(), DischargeError> {
        self.check_transition(PlacementStatus::Declined)?;
        self.status = PlacementStatus::Declined;
        self.declined_ts = Some(now);
        Ok(())
    }
}

pub fn accepted_placement(placements: &[PlacementRequest]) -> Option<&PlacementRequest> {
    placements
        .iter()
        .find(|placement| placement.status == PlacementStatus::Accepted)
}
