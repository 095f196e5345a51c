//! Placement facility directory and its CSV importer.

mod parser;

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::workflows::discharge::domain::{CapacityStatus, Facility, FacilityId, FacilityKind};

/// Read-only lookup of placement facilities.
pub trait FacilityDirectory: Send + Sync {
    fn facility(&self, id: &FacilityId) -> Option<Facility>;
    fn facilities(&self) -> Vec<Facility>;
}

/// Directory held in memory, listing facilities in load order.
#[derive(Debug, Default, Clone)]
pub struct InMemoryFacilityDirectory {
    facilities: Vec<Facility>,
    index: HashMap<FacilityId, usize>,
}

impl InMemoryFacilityDirectory {
    /// Later entries replace earlier ones with the same id.
    pub fn new(facilities: impl IntoIterator<Item = Facility>) -> Self {
        let mut directory = Self::default();
        for facility in facilities {
            directory.upsert(facility);
        }
        directory
    }

    pub fn upsert(&mut self, facility: Facility) {
        match self.index.get(&facility.id) {
            Some(&position) => self.facilities[position] = facility,
            None => {
                self.index
                    .insert(facility.id.clone(), self.facilities.len());
                self.facilities.push(facility);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.facilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facilities.is_empty()
    }
}

impl FacilityDirectory for InMemoryFacilityDirectory {
    fn facility(&self, id: &FacilityId) -> Option<Facility> {
        self.index
            .get(id)
            .map(|&position| self.facilities[position].clone())
    }

    fn facilities(&self) -> Vec<Facility> {
        self.facilities.clone()
    }
}

#[derive(Debug)]
pub enum FacilityImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { line: u64, reason: String },
}

impl std::fmt::Display for FacilityImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FacilityImportError::Io(err) => write!(f, "failed to read facility directory: {}", err),
            FacilityImportError::Csv(err) => write!(f, "invalid facility CSV data: {}", err),
            FacilityImportError::InvalidRow { line, reason } => {
                write!(f, "invalid facility on line {}: {}", line, reason)
            }
        }
    }
}

impl std::error::Error for FacilityImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FacilityImportError::Io(err) => Some(err),
            FacilityImportError::Csv(err) => Some(err),
            FacilityImportError::InvalidRow { .. } => None,
        }
    }
}

impl From<std::io::Error> for FacilityImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for FacilityImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

pub struct FacilityDirectoryImporter;

impl FacilityDirectoryImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<InMemoryFacilityDirectory, FacilityImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Rows without an id or name are skipped; any other bad cell fails the
    /// whole import.
    pub fn from_reader<R: Read>(reader: R) -> Result<InMemoryFacilityDirectory, FacilityImportError> {
        let mut directory = InMemoryFacilityDirectory::default();

        for numbered in parser::parse_rows(reader)? {
            let line = numbered.line;
            let row = numbered.row;
            let (Some(id), Some(name)) = (row.id, row.name) else {
                debug!(line, "skipping facility row without id or name");
                continue;
            };

            let invalid = |reason: String| FacilityImportError::InvalidRow { line, reason };

            let kind = row
                .kind
                .as_deref()
                .ok_or_else(|| invalid("missing kind".to_string()))?
                .parse::<FacilityKind>()
                .map_err(|err| invalid(err.to_string()))?;
            let distance_mi = row
                .distance_mi
                .as_deref()
                .map(|value| {
                    value
                        .parse::<f32>()
                        .ok()
                        .filter(|distance| distance.is_finite() && *distance >= 0.0)
                        .ok_or_else(|| invalid(format!("invalid distance_mi '{value}'")))
                })
                .transpose()?;
            let capacity_status = row
                .capacity_status
                .as_deref()
                .map(|value| {
                    value
                        .parse::<CapacityStatus>()
                        .map_err(|err| invalid(err.to_string()))
                })
                .transpose()?;

            directory.upsert(Facility {
                id: FacilityId(id),
                name,
                kind,
                distance_mi,
                capacity_status,
                contact_email: row.contact_email,
            });
        }

        Ok(directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: &str = "id,name,kind,distance_mi,capacity_status,contact_email\n";

    #[test]
    fn importer_builds_directory_in_file_order() {
        let csv = format!(
            "{HEADER}f-1,Sunrise Manor SNF,SNF,2.5,open,intake@sunrisemanor.com\n\
f-2,Compassionate Care,Home Health,0.8,limited,\n"
        );
        let directory = FacilityDirectoryImporter::from_reader(Cursor::new(csv)).expect("import");

        let facilities = directory.facilities();
        assert_eq!(facilities.len(), 2);
        assert_eq!(facilities[0].id.as_str(), "f-1");
        assert_eq!(facilities[1].kind, FacilityKind::HomeHealth);
        assert_eq!(facilities[1].capacity_status, Some(CapacityStatus::Limited));
        assert!(facilities[1].contact_email.is_none());
    }

    #[test]
    fn importer_skips_rows_without_id_or_name() {
        let csv = format!("{HEADER},Nameless,SNF,,,\nf-9,,Rehab,,,\nf-3,Premier,Rehab,,,\n");
        let directory = FacilityDirectoryImporter::from_reader(Cursor::new(csv)).expect("import");

        assert_eq!(directory.len(), 1);
        assert!(directory.facility(&FacilityId::from("f-3")).is_some());
    }

    #[test]
    fn importer_rejects_unknown_kind_with_line_number() {
        let csv = format!("{HEADER}f-1,Sunrise,SNF,,,\nf-2,Mystery,Spa,,,\n");
        let error = FacilityDirectoryImporter::from_reader(Cursor::new(csv))
            .expect_err("unknown kind");

        match error {
            FacilityImportError::InvalidRow { line, reason } => {
                assert_eq!(line, 3);
                assert!(reason.contains("Spa"), "{reason}");
            }
            other => panic!("expected invalid row, got {other:?}"),
        }
    }

    #[test]
    fn importer_rejects_negative_distance() {
        let csv = format!("{HEADER}f-1,Sunrise,SNF,-1,,\n");
        let error = FacilityDirectoryImporter::from_reader(Cursor::new(csv))
            .expect_err("negative distance");
        assert!(matches!(error, FacilityImportError::InvalidRow { line: 2, .. }));
    }

    #[test]
    fn later_rows_replace_earlier_ids() {
        let csv = format!("{HEADER}f-1,Sunrise,SNF,,open,\nf-1,Sunrise,SNF,,full,\n");
        let directory = FacilityDirectoryImporter::from_reader(Cursor::new(csv)).expect("import");

        assert_eq!(directory.len(), 1);
        let facility = directory.facility(&FacilityId::from("f-1")).expect("facility");
        assert!(facility.is_full());
    }

    #[test]
    fn importer_from_path_propagates_io_errors() {
        let error = FacilityDirectoryImporter::from_path("./does-not-exist.csv")
            .expect_err("expected io error");

        match error {
            FacilityImportError::Io(_) => {}
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
