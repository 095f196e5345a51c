//! Standard seed census: the staff, facility directory, and inpatient
//! encounters used by the CLI, the demo server, and tests.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use super::domain::{
    CapacityStatus, EncounterId, Facility, FacilityId, FacilityKind, Patient,
    PatientId, PlacementId, PlacementRequest, PlacementStatus, Sex, Signal, SignalId, SignalKind,
    SignalStatus, Task, TaskId, TaskPriority, TaskStatus, TransportOrder, TransportOrderId,
    TransportStatus, User, UserId, UserRole,
};
use super::encounter::Encounter;

#[derive(Debug, Clone)]
pub struct SampleCensus {
    pub users: Vec<User>,
    pub facilities: Vec<Facility>,
    pub encounters: Vec<Encounter>,
}

fn at(month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, month, day, hour, minute, 0)
        .single()
        .unwrap_or_default()
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

impl SampleCensus {
    /// Late morning on the census day; every seeded timestamp precedes it.
    pub fn reference_time() -> DateTime<Utc> {
        at(8, 29, 12, 0)
    }

    pub fn standard() -> Self {
        Self {
            users: users(),
            facilities: facilities(),
            encounters: encounters(),
        }
    }

    pub fn user(&self, role: UserRole) -> Option<&User> {
        self.users.iter().find(|user| user.role == role)
    }
}

fn users() -> Vec<User> {
    [
        ("1", "dr.smith@hospital.com", "Dr. Sarah Smith", UserRole::Doctor),
        ("2", "jane.doe@hospital.com", "Jane Doe", UserRole::CaseManager),
        ("3", "bob.nurse@hospital.com", "Bob Johnson", UserRole::Nurse),
        ("4", "admin@hospital.com", "System Admin", UserRole::Admin),
    ]
    .into_iter()
    .map(|(id, email, name, role)| User {
        id: UserId::from(id),
        email: email.to_string(),
        name: name.to_string(),
        role,
    })
    .collect()
}

fn facilities() -> Vec<Facility> {
    use CapacityStatus::{Full, Limited, Open};
    use FacilityKind::{HomeHealth, Hospice, Rehab, Snf};

    [
        ("1", "Sunrise Manor SNF", Snf, 2.5, Open, "intake@sunrisemanor.com"),
        ("2", "Compassionate Care Home Health", HomeHealth, 0.8, Limited, "referrals@cchealth.com"),
        ("3", "Premier Rehabilitation Center", Rehab, 4.2, Open, "admissions@premierrehab.com"),
        ("4", "Peaceful Paths Hospice", Hospice, 1.9, Full, "coordinator@peacefulpaths.org"),
        ("5", "Golden Years SNF", Snf, 6.1, Limited, "placement@goldenyears.com"),
        ("6", "Recovery Plus Rehab", Rehab, 3.7, Open, "intake@recoveryplus.com"),
    ]
    .into_iter()
    .map(|(id, name, kind, distance, capacity, contact)| Facility {
        id: FacilityId::from(id),
        name: name.to_string(),
        kind,
        distance_mi: Some(distance),
        capacity_status: Some(capacity),
        contact_email: Some(contact.to_string()),
    })
    .collect()
}

struct PatientSeed {
    mrn: &'static str,
    name: &'static str,
    dob: NaiveDate,
    sex: Sex,
    payer: &'static str,
    unit: &'static str,
    room: &'static str,
    service: &'static str,
    admit_ts: DateTime<Utc>,
    los_days: u32,
}

fn patients() -> Vec<Patient> {
    let seeds = [
        PatientSeed {
            mrn: "MRN123456",
            name: "Margaret Chen",
            dob: date(1942, 3, 15),
            sex: Sex::Female,
            payer: "Medicare",
            unit: "Gen Med",
            room: "312A",
            service: "Hospitalist",
            admit_ts: at(8, 27, 14, 30),
            los_days: 2,
        },
        PatientSeed {
            mrn: "MRN234567",
            name: "Robert Williams",
            dob: date(1938, 7, 22),
            sex: Sex::Male,
            payer: "Medicare",
            unit: "Post-Op",
            room: "205B",
            service: "Surgery",
            admit_ts: at(8, 25, 9, 15),
            los_days: 4,
        },
        PatientSeed {
            mrn: "MRN345678",
            name: "Linda Rodriguez",
            dob: date(1955, 11, 8),
            sex: Sex::Female,
            payer: "Medicaid",
            unit: "Gen Med",
            room: "418C",
            service: "Hospitalist",
            admit_ts: at(8, 24, 16, 45),
            los_days: 5,
        },
        PatientSeed {
            mrn: "MRN456789",
            name: "James Thompson",
            dob: date(1965, 2, 14),
            sex: Sex::Male,
            payer: "Blue Cross",
            unit: "Post-Op",
            room: "301A",
            service: "Cardiology",
            admit_ts: at(8, 28, 11, 20),
            los_days: 1,
        },
        PatientSeed {
            mrn: "MRN567890",
            name: "Mary Johnson",
            dob: date(1950, 9, 30),
            sex: Sex::Female,
            payer: "Medicare",
            unit: "Gen Med",
            room: "220B",
            service: "Hospitalist",
            admit_ts: at(8, 22, 8, 0),
            los_days: 7,
        },
        PatientSeed {
            mrn: "MRN678901",
            name: "David Lee",
            dob: date(1960, 5, 18),
            sex: Sex::Male,
            payer: "Aetna",
            unit: "Post-Op",
            room: "415A",
            service: "Orthopedics",
            admit_ts: at(8, 26, 13, 30),
            los_days: 3,
        },
        PatientSeed {
            mrn: "MRN789012",
            name: "Patricia Brown",
            dob: date(1945, 12, 3),
            sex: Sex::Female,
            payer: "Medicare",
            unit: "Gen Med",
            room: "325C",
            service: "Internal Medicine",
            admit_ts: at(8, 23, 10, 15),
            los_days: 6,
        },
        PatientSeed {
            mrn: "MRN890123",
            name: "Michael Davis",
            dob: date(1952, 8, 27),
            sex: Sex::Male,
            payer: "United Health",
            unit: "Post-Op",
            room: "202A",
            service: "Surgery",
            admit_ts: at(8, 27, 15, 45),
            los_days: 2,
        },
    ];

    seeds
        .into_iter()
        .enumerate()
        .map(|(index, seed)| Patient {
            id: PatientId(format!("{}", index + 1)),
            mrn: seed.mrn.to_string(),
            name: seed.name.to_string(),
            date_of_birth: seed.dob,
            sex: seed.sex,
            payer: Some(seed.payer.to_string()),
            unit: Some(seed.unit.to_string()),
            room: Some(seed.room.to_string()),
            service: Some(seed.service.to_string()),
            admit_ts: seed.admit_ts,
            los_days: seed.los_days,
        })
        .collect()
}

fn signal(
    id: &str,
    encounter_id: &EncounterId,
    kind: SignalKind,
    status: SignalStatus,
    last_updated_ts: DateTime<Utc>,
) -> Signal {
    Signal {
        id: SignalId::from(id),
        encounter_id: encounter_id.clone(),
        kind,
        status,
        details: None,
        last_updated_ts,
    }
}

fn task(
    id: &str,
    encounter_id: &EncounterId,
    task_type: &str,
    owner_role: UserRole,
    status: TaskStatus,
    priority: TaskPriority,
) -> Task {
    Task {
        id: TaskId::from(id),
        encounter_id: encounter_id.clone(),
        task_type: task_type.to_string(),
        owner_role: Some(owner_role),
        owner_user_id: None,
        status,
        priority,
        due_ts: None,
        completed_ts: None,
        notes: None,
    }
}

fn encounters() -> Vec<Encounter> {
    use SignalKind::{Education, Imaging, Insurance, Labs, Pharmacy, Placement, Transport};
    use SignalStatus::{Complete, Pending};

    let mut encounters: Vec<Encounter> = patients()
        .into_iter()
        .enumerate()
        .map(|(index, patient)| Encounter::new(EncounterId(format!("{}", index + 1)), patient))
        .collect();

    {
        let encounter = &mut encounters[0];
        let id = encounter.id.clone();
        encounter.started_discharge_ts = Some(at(8, 29, 8, 0));
        encounter.signals = vec![
            signal("s1", &id, Insurance, Pending, at(8, 29, 8, 0)),
            signal("s2", &id, Pharmacy, Complete, at(8, 29, 9, 30)),
            signal("s3", &id, Education, Pending, at(8, 29, 8, 15)),
            signal("s4", &id, Placement, Pending, at(8, 29, 8, 30)),
        ];
        let mut authorization = task(
            "t1",
            &id,
            "Insurance Authorization",
            UserRole::CaseManager,
            TaskStatus::InProgress,
            TaskPriority::High,
        );
        authorization.due_ts = Some(at(8, 29, 16, 0));
        let mut education = task(
            "t2",
            &id,
            "Patient Education",
            UserRole::Nurse,
            TaskStatus::Open,
            TaskPriority::Medium,
        );
        education.due_ts = Some(at(8, 29, 14, 0));
        encounter.tasks = vec![authorization, education];
        encounter.placements = vec![PlacementRequest {
            id: PlacementId::from("p1"),
            encounter_id: id.clone(),
            facility_id: FacilityId::from("1"),
            status: PlacementStatus::Sent,
            packet_sent_ts: Some(at(8, 29, 9, 0)),
            responded_ts: None,
            accepted_ts: None,
            declined_ts: None,
            notes: None,
        }];
    }

    {
        let encounter = &mut encounters[1];
        let id = encounter.id.clone();
        encounter.started_discharge_ts = Some(at(8, 29, 6, 30));
        encounter.signals = vec![
            signal("s5", &id, Labs, Complete, at(8, 29, 7, 0)),
            signal("s6", &id, Pharmacy, Complete, at(8, 29, 8, 0)),
            signal("s7", &id, Education, Complete, at(8, 29, 9, 0)),
            signal("s8", &id, Transport, Complete, at(8, 29, 10, 0)),
        ];
        let mut summary = task(
            "t3",
            &id,
            "Discharge Summary",
            UserRole::Doctor,
            TaskStatus::Complete,
            TaskPriority::High,
        );
        summary.completed_ts = Some(at(8, 29, 9, 30));
        encounter.tasks = vec![summary];
        encounter.transport_orders = vec![TransportOrder {
            id: TransportOrderId::from("to1"),
            encounter_id: id.clone(),
            vendor: Some("MedTransport Inc".to_string()),
            pickup_ts: Some(at(8, 29, 14, 0)),
            status: TransportStatus::Scheduled,
            notes: None,
        }];
    }

    {
        let encounter = &mut encounters[2];
        let id = encounter.id.clone();
        encounter.started_discharge_ts = Some(at(8, 29, 7, 15));
        encounter.signals = vec![
            signal("s9", &id, Pharmacy, Pending, at(8, 29, 7, 15)),
            signal("s10", &id, Education, Pending, at(8, 29, 7, 30)),
            signal("s11", &id, Labs, Complete, at(8, 29, 8, 0)),
        ];
        let mut reconciliation = task(
            "t4",
            &id,
            "Medication Reconciliation",
            UserRole::Nurse,
            TaskStatus::Open,
            TaskPriority::High,
        );
        reconciliation.due_ts = Some(at(8, 29, 15, 0));
        let mut follow_up = task(
            "t5",
            &id,
            "Follow-up Appointment",
            UserRole::CaseManager,
            TaskStatus::Open,
            TaskPriority::Medium,
        );
        follow_up.due_ts = Some(at(8, 30, 9, 0));
        encounter.tasks = vec![reconciliation, follow_up];
    }

    {
        let encounter = &mut encounters[3];
        let id = encounter.id.clone();
        encounter.signals = vec![
            signal("s12", &id, Labs, Complete, at(8, 29, 6, 0)),
            signal("s13", &id, Imaging, Complete, at(8, 29, 7, 0)),
        ];
    }

    // Remaining stays alternate between a pending pharmacy check and a clean
    // labs-plus-education pair.
    for (offset, encounter) in encounters.iter_mut().skip(4).enumerate() {
        let id = encounter.id.clone();
        let first = format!("s{}", 14 + offset * 2);
        encounter.signals = if offset % 2 == 0 {
            vec![signal(&first, &id, Pharmacy, Pending, at(8, 29, 8, 0))]
        } else {
            let second = format!("s{}", 15 + offset * 2);
            vec![
                signal(&first, &id, Labs, Complete, at(8, 29, 7, 0)),
                signal(&second, &id, Education, Complete, at(8, 29, 8, 0)),
            ]
        };
    }

    encounters
}
