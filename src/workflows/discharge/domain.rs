use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::error::DischargeError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of one hospital stay being tracked for discharge.
    EncounterId
);
string_id!(PatientId);
string_id!(UserId);
string_id!(SignalId);
string_id!(TaskId);
string_id!(PlacementId);
string_id!(TransportOrderId);
string_id!(
    /// Identifier of a facility in the external placement directory.
    FacilityId
);
string_id!(SnapshotId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Doctor,
    CaseManager,
    Nurse,
    Admin,
}

impl UserRole {
    pub const fn ordered() -> [Self; 4] {
        [Self::Doctor, Self::CaseManager, Self::Nurse, Self::Admin]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Doctor => "doctor",
            Self::CaseManager => "case_manager",
            Self::Nurse => "nurse",
            Self::Admin => "admin",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Doctor => "Doctor",
            Self::CaseManager => "Case Manager",
            Self::Nurse => "Nurse",
            Self::Admin => "Administrator",
        }
    }
}

impl FromStr for UserRole {
    type Err = DischargeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ordered()
            .into_iter()
            .find(|role| role.as_str() == value.trim())
            .ok_or_else(|| DischargeError::invalid_input("role", value))
    }
}

/// One discharge-readiness dimension tracked per encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Labs,
    Imaging,
    Pharmacy,
    Insurance,
    Education,
    Placement,
    Transport,
}

impl SignalKind {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::Labs,
            Self::Imaging,
            Self::Pharmacy,
            Self::Insurance,
            Self::Education,
            Self::Placement,
            Self::Transport,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Labs => "labs",
            Self::Imaging => "imaging",
            Self::Pharmacy => "pharmacy",
            Self::Insurance => "insurance",
            Self::Education => "education",
            Self::Placement => "placement",
            Self::Transport => "transport",
        }
    }

    /// Critical kinds force a Red score while pending.
    pub const fn is_critical(self) -> bool {
        matches!(self, Self::Insurance)
    }
}

impl FromStr for SignalKind {
    type Err = DischargeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| DischargeError::invalid_input("kind", value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStatus {
    Pending,
    Complete,
    Error,
}

impl SignalStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }
}

impl FromStr for SignalStatus {
    type Err = DischargeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "complete" => Ok(Self::Complete),
            "error" => Ok(Self::Error),
            _ => Err(DischargeError::invalid_input("status", value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    InProgress,
    Complete,
}

impl TaskStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::InProgress => "In Progress",
            Self::Complete => "Complete",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = DischargeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "in_progress" => Ok(Self::InProgress),
            "complete" => Ok(Self::Complete),
            _ => Err(DischargeError::invalid_input("status", value)),
        }
    }
}

/// Closed priority scale; serialized as its numeric rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TaskPriority {
    High = 1,
    Medium = 2,
    Low = 3,
}

impl TaskPriority {
    pub const fn rank(self) -> u8 {
        self as u8
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl TryFrom<u8> for TaskPriority {
    type Error = DischargeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::High),
            2 => Ok(Self::Medium),
            3 => Ok(Self::Low),
            other => Err(DischargeError::invalid_input("priority", other)),
        }
    }
}

impl TryFrom<i64> for TaskPriority {
    type Error = DischargeError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| DischargeError::invalid_input("priority", value))
            .and_then(Self::try_from)
    }
}

impl From<TaskPriority> for u8 {
    fn from(value: TaskPriority) -> Self {
        value.rank()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FacilityKind {
    #[serde(rename = "SNF")]
    Snf,
    HomeHealth,
    Rehab,
    Hospice,
}

impl FacilityKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Snf => "SNF",
            Self::HomeHealth => "Home Health",
            Self::Rehab => "Rehab",
            Self::Hospice => "Hospice",
        }
    }
}

impl FromStr for FacilityKind {
    type Err = DischargeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized: String = value
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "snf" => Ok(Self::Snf),
            "homehealth" => Ok(Self::HomeHealth),
            "rehab" => Ok(Self::Rehab),
            "hospice" => Ok(Self::Hospice),
            _ => Err(DischargeError::invalid_input("facility_kind", value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityStatus {
    Open,
    Limited,
    Full,
}

impl FromStr for CapacityStatus {
    type Err = DischargeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "limited" => Ok(Self::Limited),
            "full" => Ok(Self::Full),
            _ => Err(DischargeError::invalid_input("capacity_status", value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementStatus {
    Draft,
    Sent,
    Responded,
    Accepted,
    Declined,
}

impl PlacementStatus {
    /// Requests that can still be accepted or declined.
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Draft | Self::Sent | Self::Responded)
    }

    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Sent)
                | (Self::Draft, Self::Declined)
                | (Self::Sent, Self::Responded)
                | (Self::Sent | Self::Responded, Self::Accepted | Self::Declined)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportStatus {
    Requested,
    Scheduled,
    EnRoute,
    DepartedUnit,
}

impl TransportStatus {
    /// The only status an order may move to next.
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Requested => Some(Self::Scheduled),
            Self::Scheduled => Some(Self::EnRoute),
            Self::EnRoute => Some(Self::DepartedUnit),
            Self::DepartedUnit => None,
        }
    }
}

impl FromStr for TransportStatus {
    type Err = DischargeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "requested" => Ok(Self::Requested),
            "scheduled" => Ok(Self::Scheduled),
            "en_route" => Ok(Self::EnRoute),
            "departed_unit" => Ok(Self::DepartedUnit),
            _ => Err(DischargeError::invalid_input("status", value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterStatus {
    Active,
    Discharged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoreLabel {
    Green,
    Yellow,
    Red,
}

impl ScoreLabel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Green => "Green",
            Self::Yellow => "Yellow",
            Self::Red => "Red",
        }
    }
}

impl FromStr for ScoreLabel {
    type Err = DischargeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "green" => Ok(Self::Green),
            "yellow" => Ok(Self::Yellow),
            "red" => Ok(Self::Red),
            _ => Err(DischargeError::invalid_input("label", value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    Other,
}

/// Demographic and admission record; never mutated by the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub mrn: String,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub sex: Sex,
    pub payer: Option<String>,
    pub unit: Option<String>,
    pub room: Option<String>,
    pub service: Option<String>,
    pub admit_ts: DateTime<Utc>,
    pub los_days: u32,
}

/// Actor context for permission checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: FacilityId,
    pub name: String,
    pub kind: FacilityKind,
    pub distance_mi: Option<f32>,
    pub capacity_status: Option<CapacityStatus>,
    pub contact_email: Option<String>,
}

impl Facility {
    pub fn is_full(&self) -> bool {
        self.capacity_status == Some(CapacityStatus::Full)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: SignalId,
    pub encounter_id: EncounterId,
    pub kind: SignalKind,
    pub status: SignalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub last_updated_ts: DateTime<Utc>,
}

impl Signal {
    pub fn is_pending(&self) -> bool {
        self.status == SignalStatus::Pending
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub encounter_id: EncounterId,
    #[serde(rename = "type")]
    pub task_type: String,
    pub owner_role: Option<UserRole>,
    pub owner_user_id: Option<UserId>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_ts: Option<DateTime<Utc>>,
    pub completed_ts: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Caller-supplied fields for a new task; priority is validated on creation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct NewTask {
    #[serde(rename = "type")]
    pub task_type: String,
    #[serde(default)]
    pub owner_role: Option<UserRole>,
    #[serde(default)]
    pub owner_user_id: Option<UserId>,
    pub priority: i64,
    #[serde(default)]
    pub due_ts: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRequest {
    pub id: PlacementId,
    pub encounter_id: EncounterId,
    pub facility_id: FacilityId,
    pub status: PlacementStatus,
    pub packet_sent_ts: Option<DateTime<Utc>>,
    pub responded_ts: Option<DateTime<Utc>>,
    pub accepted_ts: Option<DateTime<Utc>>,
    pub declined_ts: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportOrder {
    pub id: TransportOrderId,
    pub encounter_id: EncounterId,
    pub vendor: Option<String>,
    pub pickup_ts: Option<DateTime<Utc>>,
    pub status: TransportStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct NewTransportOrder {
    pub vendor: String,
    #[serde(default)]
    pub pickup_ts: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdownEntry {
    pub kind: SignalKind,
    pub since: DateTime<Utc>,
    pub last_updated_ts: DateTime<Utc>,
}

/// Immutable record of one readiness computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    pub id: SnapshotId,
    pub encounter_id: EncounterId,
    pub score: u8,
    pub label: ScoreLabel,
    pub pending_count: usize,
    pub critical_count: usize,
    pub computed_ts: DateTime<Utc>,
    pub breakdown: Vec<ScoreBreakdownEntry>,
}
