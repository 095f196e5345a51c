//! Role to action grants.
//!
//! The table is closed: a role outside [`UserRole`] or an action outside
//! [`Action`] is denied when checked through [`can_perform`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::domain::UserRole;
use super::error::DischargeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    CompleteSignal,
    CreateTask,
    CompleteTask,
    StartDischarge,
    SendPlacement,
    AcceptPlacement,
    PatientEducation,
    ScheduleTransport,
}

impl Action {
    pub const fn ordered() -> [Self; 8] {
        [
            Self::CompleteSignal,
            Self::CreateTask,
            Self::CompleteTask,
            Self::StartDischarge,
            Self::SendPlacement,
            Self::AcceptPlacement,
            Self::PatientEducation,
            Self::ScheduleTransport,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CompleteSignal => "complete_signal",
            Self::CreateTask => "create_task",
            Self::CompleteTask => "complete_task",
            Self::StartDischarge => "start_discharge",
            Self::SendPlacement => "send_placement",
            Self::AcceptPlacement => "accept_placement",
            Self::PatientEducation => "patient_education",
            Self::ScheduleTransport => "schedule_transport",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = DischargeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ordered()
            .into_iter()
            .find(|action| action.as_str() == value.trim())
            .ok_or_else(|| DischargeError::invalid_input("action", value))
    }
}

enum Grant {
    Everything,
    Only(&'static [Action]),
}

const fn grant_for(role: UserRole) -> Grant {
    match role {
        UserRole::Admin => Grant::Everything,
        UserRole::Doctor => Grant::Only(&[
            Action::CompleteSignal,
            Action::CreateTask,
            Action::CompleteTask,
            Action::StartDischarge,
        ]),
        UserRole::CaseManager => Grant::Only(&[
            Action::CompleteSignal,
            Action::CreateTask,
            Action::CompleteTask,
            Action::SendPlacement,
            Action::AcceptPlacement,
            Action::ScheduleTransport,
        ]),
        UserRole::Nurse => Grant::Only(&[
            Action::CompleteSignal,
            Action::CreateTask,
            Action::CompleteTask,
            Action::PatientEducation,
        ]),
    }
}

pub fn can_perform_action(role: UserRole, action: Action) -> bool {
    match grant_for(role) {
        Grant::Everything => true,
        Grant::Only(actions) => actions.contains(&action),
    }
}

/// String form for boundaries that receive raw role and action names.
pub fn can_perform(role: &str, action: &str) -> bool {
    match (role.parse::<UserRole>(), action.parse::<Action>()) {
        (Ok(role), Ok(action)) => can_perform_action(role, action),
        _ => false,
    }
}

pub fn permitted_actions(role: UserRole) -> Vec<Action> {
    Action::ordered()
        .into_iter()
        .filter(|action| can_perform_action(role, *action))
        .collect()
}

pub fn ensure_permitted(role: UserRole, action: Action) -> Result<(), DischargeError> {
    if can_perform_action(role, action) {
        Ok(())
    } else {
        Err(DischargeError::PermissionDenied {
            role: role.as_str().to_string(),
            action,
        })
    }
}
