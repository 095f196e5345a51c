//! Census view over active encounters: filtered rows plus unfiltered stats.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{EncounterId, EncounterStatus, ScoreLabel, SignalKind};
use super::encounter::Encounter;
use super::error::DischargeError;

/// Search and filter criteria. Blank or `all` filters match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DashboardQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub label: Option<ScoreLabel>,
}

impl DashboardQuery {
    /// Builds a query from raw parameters, treating `""` and `"all"` as unset.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, DischargeError> {
        let search = param(params, "search");
        let unit = param(params, "unit");
        let label = param(params, "label")
            .map(|value| value.parse::<ScoreLabel>())
            .transpose()?;
        Ok(Self {
            search,
            unit,
            label,
        })
    }

    fn matches(&self, row: &DashboardRow) -> bool {
        let matches_search = self.search.as_deref().map_or(true, |term| {
            let term = term.to_lowercase();
            row.patient_name.to_lowercase().contains(&term)
                || row.mrn.to_lowercase().contains(&term)
        });
        let matches_unit = self
            .unit
            .as_deref()
            .map_or(true, |unit| row.unit.as_deref() == Some(unit));
        let matches_label = self.label.map_or(true, |label| row.label == label);

        matches_search && matches_unit && matches_label
    }
}

fn param(params: &HashMap<String, String>, key: &str) -> Option<String> {
    params
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case("all"))
        .map(str::to_string)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardRow {
    pub encounter_id: EncounterId,
    pub patient_name: String,
    pub mrn: String,
    pub unit: Option<String>,
    pub room: Option<String>,
    pub los_days: u32,
    pub status: EncounterStatus,
    pub score: u8,
    pub label: ScoreLabel,
    pub pending: Vec<SignalKind>,
    pub open_tasks: usize,
    pub started_discharge_ts: Option<DateTime<Utc>>,
}

impl DashboardRow {
    pub fn from_encounter(encounter: &Encounter) -> Self {
        let score = encounter.preview_score();
        let patient = encounter.patient();
        Self {
            encounter_id: encounter.id().clone(),
            patient_name: patient.name.clone(),
            mrn: patient.mrn.clone(),
            unit: patient.unit.clone(),
            room: patient.room.clone(),
            los_days: patient.los_days,
            status: encounter.status(),
            score: score.score,
            label: score.label,
            pending: score.pending_kinds(),
            open_tasks: encounter.open_task_count(),
            started_discharge_ts: encounter.started_discharge_ts(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total: usize,
    pub green: usize,
    pub yellow: usize,
    pub red: usize,
    /// Mean length of stay rounded to whole days; zero for an empty census.
    pub avg_los_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub stats: DashboardStats,
    pub rows: Vec<DashboardRow>,
}

/// Scores are previewed, so building the dashboard never records snapshots.
pub fn build_dashboard(encounters: &[Encounter], query: &DashboardQuery) -> DashboardView {
    let all: Vec<DashboardRow> = encounters.iter().map(DashboardRow::from_encounter).collect();

    let mut stats = DashboardStats {
        total: all.len(),
        ..DashboardStats::default()
    };
    for row in &all {
        match row.label {
            ScoreLabel::Green => stats.green += 1,
            ScoreLabel::Yellow => stats.yellow += 1,
            ScoreLabel::Red => stats.red += 1,
        }
    }
    if !all.is_empty() {
        let total_los: u64 = all.iter().map(|row| u64::from(row.los_days)).sum();
        stats.avg_los_days = (total_los as f64 / all.len() as f64).round() as u32;
    }

    let rows = all.into_iter().filter(|row| query.matches(row)).collect();
    DashboardView { stats, rows }
}
