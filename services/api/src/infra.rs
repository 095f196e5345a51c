use discharge_orchestrator::error::AppError;
use discharge_orchestrator::workflows::directory::{
    FacilityDirectoryImporter, InMemoryFacilityDirectory,
};
use discharge_orchestrator::workflows::discharge::{
    Clock, DischargePolicy, DischargeService, DischargeServiceError, EncounterRepository,
    InMemoryEncounterRepository, SampleCensus, ScoreLabel, SystemClock,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

pub(crate) type CensusService = DischargeService<InMemoryEncounterRepository, InMemoryFacilityDirectory>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Seeds the standard census; the facility directory comes from `facilities_csv`
/// when given, otherwise from the census seed.
pub(crate) fn census_service(
    policy: DischargePolicy,
    facilities_csv: Option<&Path>,
    clock: Option<Arc<dyn Clock>>,
) -> Result<Arc<CensusService>, AppError> {
    let census = SampleCensus::standard();

    let directory = match facilities_csv {
        Some(path) => {
            let directory = FacilityDirectoryImporter::from_path(path)?;
            info!(path = %path.display(), facilities = directory.len(), "facility directory imported");
            directory
        }
        None => InMemoryFacilityDirectory::new(census.facilities),
    };

    let repository = Arc::new(InMemoryEncounterRepository::default());
    let encounters = census.encounters.len();
    for encounter in census.encounters {
        repository
            .insert(encounter)
            .map_err(DischargeServiceError::from)?;
    }
    info!(encounters, "census loaded");

    let clock = clock.unwrap_or_else(|| Arc::new(SystemClock));
    Ok(Arc::new(DischargeService::with_clock(
        repository,
        Arc::new(directory),
        policy,
        clock,
    )))
}

pub(crate) fn parse_label(raw: &str) -> Result<ScoreLabel, String> {
    raw.parse::<ScoreLabel>()
        .map_err(|_| format!("'{raw}' is not one of Green, Yellow, Red"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use discharge_orchestrator::workflows::discharge::FixedClock;

    #[test]
    fn census_service_seeds_encounters_and_facilities() {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(SampleCensus::reference_time()));
        let service = census_service(DischargePolicy::default(), None, Some(clock))
            .expect("census service");

        assert_eq!(service.encounters().expect("encounters").len(), 8);
        assert_eq!(service.facilities().len(), 6);
        assert_eq!(service.now(), SampleCensus::reference_time());
    }

    #[test]
    fn census_service_imports_directory_from_csv() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/facilities.csv");
        let service = census_service(DischargePolicy::default(), Some(&path), None)
            .expect("directory imported");

        let facilities = service.facilities();
        assert_eq!(facilities.len(), 6);
        assert_eq!(facilities[0].name, "Sunrise Manor SNF");
    }

    #[test]
    fn missing_directory_file_is_an_import_error() {
        let error = census_service(
            DischargePolicy::default(),
            Some(Path::new("./no-such-directory.csv")),
            None,
        )
        .err()
        .expect("missing file");
        assert!(matches!(error, AppError::Import(_)));
    }

    #[test]
    fn label_parser_accepts_any_case() {
        assert_eq!(parse_label("yellow"), Ok(ScoreLabel::Yellow));
        assert!(parse_label("amber").is_err());
    }
}
