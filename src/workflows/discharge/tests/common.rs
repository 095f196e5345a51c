use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::directory::InMemoryFacilityDirectory;
use crate::workflows::discharge::domain::{
    CapacityStatus, EncounterId, Facility, FacilityId, FacilityKind, Patient, PatientId, Sex,
    Signal, SignalId, SignalKind, SignalStatus,
};
use crate::workflows::discharge::encounter::Encounter;
use crate::workflows::discharge::repository::{
    EncounterRepository, InMemoryEncounterRepository, RepositoryError,
};
use crate::workflows::discharge::router::ACTOR_ROLE_HEADER;
use crate::workflows::discharge::{
    DischargePolicy, DischargeService, FixedClock, SampleCensus,
};

pub(super) type CensusService = DischargeService<InMemoryEncounterRepository, InMemoryFacilityDirectory>;

pub(super) fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 29, hour, minute, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn admit_ts() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 27, 14, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn patient() -> Patient {
    Patient {
        id: PatientId::from("p-100"),
        mrn: "MRN000100".to_string(),
        name: "Ada Lovelace".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1948, 12, 10).expect("valid date"),
        sex: Sex::Female,
        payer: Some("Medicare".to_string()),
        unit: Some("Gen Med".to_string()),
        room: Some("101A".to_string()),
        service: Some("Hospitalist".to_string()),
        admit_ts: admit_ts(),
        los_days: 2,
    }
}

pub(super) fn encounter() -> Encounter {
    Encounter::new(EncounterId::from("enc-test"), patient())
}

/// Encounter whose signals were ingested in order, one minute apart from 08:00.
pub(super) fn encounter_with(signals: &[(SignalKind, SignalStatus)]) -> Encounter {
    let mut encounter = encounter();
    let policy = DischargePolicy::default();
    for (offset, (kind, status)) in signals.iter().enumerate() {
        encounter
            .ingest_signal(*kind, *status, None, at(8, offset as u32), &policy)
            .expect("signal ingested");
    }
    encounter
}

pub(super) fn signal(kind: SignalKind, status: SignalStatus) -> Signal {
    signal_at(kind, status, at(8, 0))
}

pub(super) fn signal_at(kind: SignalKind, status: SignalStatus, ts: DateTime<Utc>) -> Signal {
    Signal {
        id: SignalId(format!("sig-{}-{}", kind.as_str(), ts.timestamp())),
        encounter_id: EncounterId::from("enc-test"),
        kind,
        status,
        details: None,
        last_updated_ts: ts,
    }
}

pub(super) fn facility(id: &str, capacity: CapacityStatus) -> Facility {
    Facility {
        id: FacilityId::from(id),
        name: format!("Facility {id}"),
        kind: FacilityKind::Snf,
        distance_mi: Some(1.5),
        capacity_status: Some(capacity),
        contact_email: None,
    }
}

pub(super) fn census_service(policy: DischargePolicy) -> (Arc<CensusService>, Arc<FixedClock>) {
    let census = SampleCensus::standard();
    let repository = Arc::new(InMemoryEncounterRepository::default());
    for encounter in census.encounters {
        repository.insert(encounter).expect("census encounter stored");
    }
    let directory = Arc::new(InMemoryFacilityDirectory::new(census.facilities));
    let clock = Arc::new(FixedClock::new(SampleCensus::reference_time()));
    let service = DischargeService::with_clock(repository, directory, policy, clock.clone());
    (Arc::new(service), clock)
}

pub(super) fn advance(clock: &FixedClock, minutes: i64) -> DateTime<Utc> {
    clock.advance(Duration::minutes(minutes))
}

pub(super) fn encounter_id(value: &str) -> EncounterId {
    EncounterId::from(value)
}

pub(super) struct UnavailableRepository;

impl EncounterRepository for UnavailableRepository {
    fn insert(&self, _encounter: Encounter) -> Result<Encounter, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _encounter: Encounter) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &EncounterId) -> Result<Option<Encounter>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self) -> Result<Vec<Encounter>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn post_json(uri: &str, role: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(role) = role {
        builder = builder.header(ACTOR_ROLE_HEADER, role);
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
        .expect("request builds")
}

pub(super) fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
