use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::EncounterId;
use super::encounter::Encounter;

/// Storage abstraction so the service can be exercised in isolation.
pub trait EncounterRepository: Send + Sync {
    fn insert(&self, encounter: Encounter) -> Result<Encounter, RepositoryError>;
    fn update(&self, encounter: Encounter) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &EncounterId) -> Result<Option<Encounter>, RepositoryError>;
    /// All encounters in insertion order.
    fn list(&self) -> Result<Vec<Encounter>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Default)]
struct Records {
    order: Vec<EncounterId>,
    by_id: HashMap<EncounterId, Encounter>,
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryEncounterRepository {
    records: Arc<Mutex<Records>>,
}

impl InMemoryEncounterRepository {
    fn records(&self) -> Result<MutexGuard<'_, Records>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

impl EncounterRepository for InMemoryEncounterRepository {
    fn insert(&self, encounter: Encounter) -> Result<Encounter, RepositoryError> {
        let mut records = self.records()?;
        if records.by_id.contains_key(encounter.id()) {
            return Err(RepositoryError::Conflict);
        }
        records.order.push(encounter.id().clone());
        records
            .by_id
            .insert(encounter.id().clone(), encounter.clone());
        Ok(encounter)
    }

    fn update(&self, encounter: Encounter) -> Result<(), RepositoryError> {
        let mut records = self.records()?;
        match records.by_id.get_mut(encounter.id()) {
            Some(existing) => {
                *existing = encounter;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &EncounterId) -> Result<Option<Encounter>, RepositoryError> {
        let records = self.records()?;
        Ok(records.by_id.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<Encounter>, RepositoryError> {
        let records = self.records()?;
        Ok(records
            .order
            .iter()
            .filter_map(|id| records.by_id.get(id).cloned())
            .collect())
    }
}
