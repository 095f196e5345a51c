use chrono::{DateTime, Utc};

use super::domain::{EncounterId, TransportOrder, TransportOrderId, TransportStatus};
use super::error::{DischargeError, EntityKind, StateViolation};

impl TransportOrder {
    /// Orders open as `requested` and move to `scheduled` once a pickup is known.
    pub(crate) fn requested(
        id: TransportOrderId,
        encounter_id: EncounterId,
        vendor: String,
        pickup_ts: Option<DateTime<Utc>>,
        notes: Option<String>,
    ) -> Self {
        let status = if pickup_ts.is_some() {
            TransportStatus::Scheduled
        } else {
            TransportStatus::Requested
        };

        Self {
            id,
            encounter_id,
            vendor: Some(vendor),
            pickup_ts,
            status,
            notes,
        }
    }

    fn violation(&self, violation: StateViolation) -> DischargeError {
        DischargeError::invalid_state(EntityKind::TransportOrder, &self.id, violation)
    }

    pub(crate) fn check_advance(&self, next: TransportStatus) -> Result<(), DischargeError> {
        if self.status.next() != Some(next) {
            return Err(self.violation(StateViolation::TransportTransition {
                from: self.status,
                to: next,
            }));
        }
        if next == TransportStatus::Scheduled && self.pickup_ts.is_none() {
            return Err(self.violation(StateViolation::PickupNotSet));
        }
        Ok(())
    }

    pub(crate) fn advance(&mut self, next: TransportStatus) -> Result<(), DischargeError> {
        self.check_advance(next)?;
        self.status = next;
        Ok(())
    }

    /// Pickup can change until the vehicle is en route.
    pub(crate) fn set_pickup(&mut self, pickup_ts: DateTime<Utc>) -> Result<(), DischargeError> {
        match self.status {
            TransportStatus::Requested => {
                self.pickup_ts = Some(pickup_ts);
                self.status = TransportStatus::Scheduled;
                Ok(())
            }
            TransportStatus::Scheduled => {
                self.pickup_ts = Some(pickup_ts);
                Ok(())
            }
            TransportStatus::EnRoute | TransportStatus::DepartedUnit => {
                Err(self.violation(StateViolation::TransportTransition {
                    from: self.status,
                    to: TransportStatus::Scheduled,
                }))
            }
        }
    }
}
