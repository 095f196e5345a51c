use std::sync::Arc;

use discharge_orchestrator::workflows::directory::{
    FacilityDirectory, FacilityDirectoryImporter, FacilityImportError,
};
use discharge_orchestrator::workflows::discharge::{
    CapacityStatus, DischargePolicy, DischargeService, Encounter, EncounterId,
    EncounterRepository, FacilityId, FacilityKind, InMemoryEncounterRepository, SampleCensus,
    StateViolation, UserRole,
};
use discharge_orchestrator::workflows::discharge::{DischargeError, DischargeServiceError};

#[test]
fn bundled_directory_matches_seed_facilities() {
    let data = include_bytes!("../data/facilities.csv");
    let directory =
        FacilityDirectoryImporter::from_reader(&data[..]).expect("bundled directory imports");

    assert_eq!(directory.facilities(), SampleCensus::standard().facilities);

    let hospice = directory
        .facility(&FacilityId::from("4"))
        .expect("hospice present");
    assert_eq!(hospice.kind, FacilityKind::Hospice);
    assert_eq!(hospice.capacity_status, Some(CapacityStatus::Full));
    assert_eq!(hospice.distance_mi, Some(1.9));
}

#[test]
fn imported_directory_backs_placement_decisions() {
    let csv = "id,name,kind,distance_mi,capacity_status,contact_email\n\
f-10,Lakeside Rehab,Rehab,3.0,full,intake@lakeside.example\n\
f-11,Hilltop Home Health,home health,,open,\n";
    let directory = FacilityDirectoryImporter::from_reader(csv.as_bytes()).expect("import");

    let census = SampleCensus::standard();
    let repository = Arc::new(InMemoryEncounterRepository::default());
    let encounter: Encounter = census
        .encounters
        .into_iter()
        .find(|encounter| encounter.id().as_str() == "3")
        .expect("seed encounter");
    repository.insert(encounter).expect("stored");
    let service = DischargeService::new(repository, Arc::new(directory), DischargePolicy::default());
    let id = EncounterId::from("3");

    let full = service
        .send_placement(&id, &FacilityId::from("f-10"), None, UserRole::CaseManager)
        .expect("packets may go to full facilities");
    let error = service
        .accept_placement(&id, &full.id, UserRole::CaseManager)
        .expect_err("full facility cannot accept");
    assert!(matches!(
        error,
        DischargeServiceError::Discharge(DischargeError::InvalidState {
            violation: StateViolation::FacilityFull,
            ..
        })
    ));

    let open = service
        .send_placement(&id, &FacilityId::from("f-11"), None, UserRole::CaseManager)
        .expect("sent");
    service
        .accept_placement(&id, &open.id, UserRole::Admin)
        .expect("open facility accepts");

    let unknown = service
        .send_placement(&id, &FacilityId::from("1"), None, UserRole::CaseManager)
        .expect_err("seed facility not in imported directory");
    assert!(matches!(
        unknown,
        DischargeServiceError::Discharge(DischargeError::NotFound { .. })
    ));
}

#[test]
fn malformed_capacity_fails_whole_import() {
    let csv = "id,name,kind,distance_mi,capacity_status,contact_email\n\
f-1,Sunrise,SNF,1.0,open,\n\
f-2,Golden Years,SNF,2.0,overflowing,\n";

    match FacilityDirectoryImporter::from_reader(csv.as_bytes()) {
        Err(FacilityImportError::InvalidRow { line, reason }) => {
            assert_eq!(line, 3);
            assert!(reason.contains("overflowing"), "{reason}");
        }
        other => panic!("expected invalid row, got {other:?}"),
    }
}
