//! Readiness scoring over an encounter's signals.
//!
//! Thresholds are fixed policy: any pending critical signal or three pending
//! signals is Red (25), one or two pending signals is Yellow (60), and no
//! pending signals is Green (95). Signals in `error` status are not pending.

use std::collections::HashMap;

use serde::Serialize;

use super::domain::{ScoreBreakdownEntry, ScoreLabel, Signal, SignalKind};

pub const RED_SCORE: u8 = 25;
pub const YELLOW_SCORE: u8 = 60;
pub const GREEN_SCORE: u8 = 95;
pub const RED_PENDING_THRESHOLD: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadinessScore {
    pub score: u8,
    pub label: ScoreLabel,
    pub pending_count: usize,
    pub critical_count: usize,
    pub breakdown: Vec<ScoreBreakdownEntry>,
}

impl ReadinessScore {
    pub fn pending_kinds(&self) -> Vec<SignalKind> {
        self.breakdown.iter().map(|entry| entry.kind).collect()
    }
}

pub fn compute_readiness_score(signals: &[Signal]) -> ReadinessScore {
    let pending: Vec<&Signal> = signals.iter().filter(|signal| signal.is_pending()).collect();
    let pending_count = pending.len();
    let critical_count = pending
        .iter()
        .filter(|signal| signal.kind.is_critical())
        .count();

    let (score, label) = if critical_count > 0 || pending_count >= RED_PENDING_THRESHOLD {
        (RED_SCORE, ScoreLabel::Red)
    } else if pending_count >= 1 {
        (YELLOW_SCORE, ScoreLabel::Yellow)
    } else {
        (GREEN_SCORE, ScoreLabel::Green)
    };

    let breakdown = pending
        .iter()
        .map(|signal| ScoreBreakdownEntry {
            kind: signal.kind,
            since: signal.last_updated_ts,
            last_updated_ts: signal.last_updated_ts,
        })
        .collect();

    ReadinessScore {
        score,
        label,
        pending_count,
        critical_count,
        breakdown,
    }
}

/// Keeps the most recently updated signal per kind, in original order.
/// Ties go to the later entry.
pub fn canonical_signals(signals: &[Signal]) -> Vec<Signal> {
    let mut latest: HashMap<SignalKind, usize> = HashMap::new();
    for (index, signal) in signals.iter().enumerate() {
        let supersedes = latest.get(&signal.kind).map_or(true, |&current| {
            signals[current].last_updated_ts <= signal.last_updated_ts
        });
        if supersedes {
            latest.insert(signal.kind, index);
        }
    }

    let mut keep: Vec<usize> = latest.into_values().collect();
    keep.sort_unstable();
    keep.into_iter().map(|index| signals[index].clone()).collect()
}
