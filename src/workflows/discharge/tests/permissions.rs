use crate::workflows::discharge::domain::UserRole;
use crate::workflows::discharge::error::{DischargeError, ErrorKind};
use crate::workflows::discharge::permissions::{
    can_perform, can_perform_action, ensure_permitted, permitted_actions, Action,
};

#[test]
fn admin_may_perform_every_action() {
    for action in Action::ordered() {
        assert!(can_perform_action(UserRole::Admin, action), "{action}");
    }
}

#[test]
fn role_table_matches_grants() {
    use Action::*;

    assert_eq!(
        permitted_actions(UserRole::Doctor),
        vec![CompleteSignal, CreateTask, CompleteTask, StartDischarge]
    );
    assert_eq!(
        permitted_actions(UserRole::CaseManager),
        vec![
            CompleteSignal,
            CreateTask,
            CompleteTask,
            SendPlacement,
            AcceptPlacement,
            ScheduleTransport
        ]
    );
    assert_eq!(
        permitted_actions(UserRole::Nurse),
        vec![CompleteSignal, CreateTask, CompleteTask, PatientEducation]
    );
}

#[test]
fn nurse_cannot_start_discharge() {
    assert!(!can_perform_action(UserRole::Nurse, Action::StartDischarge));
    assert!(!can_perform("nurse", "start_discharge"));
}

#[test]
fn only_nurse_and_admin_record_education() {
    assert!(can_perform_action(UserRole::Nurse, Action::PatientEducation));
    assert!(!can_perform_action(UserRole::Doctor, Action::PatientEducation));
    assert!(!can_perform_action(UserRole::CaseManager, Action::PatientEducation));
}

#[test]
fn string_checks_deny_unknown_roles_and_actions() {
    assert!(can_perform("case_manager", "send_placement"));
    assert!(!can_perform("janitor", "complete_signal"));
    assert!(!can_perform("admin", "delete_encounter"));
    assert!(!can_perform("", ""));
}

#[test]
fn permission_checks_are_deterministic() {
    for role in UserRole::ordered() {
        for action in Action::ordered() {
            assert_eq!(
                can_perform_action(role, action),
                can_perform_action(role, action)
            );
            assert_eq!(
                can_perform_action(role, action),
                can_perform(role.as_str(), action.as_str())
            );
        }
    }
}

#[test]
fn ensure_permitted_reports_role_and_action() {
    let error = ensure_permitted(UserRole::Doctor, Action::SendPlacement)
        .expect_err("doctor cannot send placements");

    assert_eq!(error.kind(), ErrorKind::PermissionDenied);
    assert_eq!(
        error,
        DischargeError::PermissionDenied {
            role: "doctor".to_string(),
            action: Action::SendPlacement,
        }
    );
}

#[test]
fn permission_denied_serializes_with_kind_tag() {
    let error = ensure_permitted(UserRole::Nurse, Action::AcceptPlacement).expect_err("denied");
    let value = serde_json::to_value(&error).expect("serialize");

    assert_eq!(value["kind"], "permission_denied");
    assert_eq!(value["role"], "nurse");
    assert_eq!(value["action"], "accept_placement");
}
