use super::common::*;

use crate::workflows::discharge::domain::{ScoreLabel, SignalKind, SignalStatus};
use crate::workflows::discharge::scoring::{
    canonical_signals, compute_readiness_score, GREEN_SCORE, RED_SCORE, YELLOW_SCORE,
};

use SignalKind::{Education, Imaging, Insurance, Labs, Pharmacy, Placement, Transport};
use SignalStatus::{Complete, Error, Pending};

#[test]
fn no_pending_signals_score_green() {
    let signals = vec![signal(Labs, Complete), signal(Imaging, Complete)];
    let score = compute_readiness_score(&signals);

    assert_eq!(score.score, GREEN_SCORE);
    assert_eq!(score.label, ScoreLabel::Green);
    assert_eq!(score.pending_count, 0);
    assert!(score.breakdown.is_empty());
}

#[test]
fn empty_signal_set_is_green() {
    let score = compute_readiness_score(&[]);
    assert_eq!((score.score, score.label), (95, ScoreLabel::Green));
}

#[test]
fn one_or_two_pending_non_critical_signals_score_yellow() {
    let one = compute_readiness_score(&[signal(Pharmacy, Pending), signal(Labs, Complete)]);
    assert_eq!((one.score, one.label), (YELLOW_SCORE, ScoreLabel::Yellow));
    assert_eq!(one.pending_count, 1);

    let two = compute_readiness_score(&[signal(Pharmacy, Pending), signal(Education, Pending)]);
    assert_eq!(two.label, ScoreLabel::Yellow);
    assert_eq!(two.pending_count, 2);
    assert_eq!(two.critical_count, 0);
}

#[test]
fn three_pending_signals_score_red_regardless_of_kind() {
    let signals = vec![
        signal(Labs, Pending),
        signal(Imaging, Pending),
        signal(Transport, Pending),
    ];
    let score = compute_readiness_score(&signals);

    assert_eq!((score.score, score.label), (RED_SCORE, ScoreLabel::Red));
    assert_eq!(score.critical_count, 0);
}

#[test]
fn pending_insurance_forces_red_on_its_own() {
    let signals = vec![
        signal(Insurance, Pending),
        signal(Labs, Complete),
        signal(Pharmacy, Complete),
    ];
    let score = compute_readiness_score(&signals);

    assert_eq!((score.score, score.label), (25, ScoreLabel::Red));
    assert_eq!(score.pending_count, 1);
    assert_eq!(score.critical_count, 1);
}

#[test]
fn completed_insurance_is_not_critical() {
    let score = compute_readiness_score(&[signal(Insurance, Complete), signal(Labs, Pending)]);
    assert_eq!(score.label, ScoreLabel::Yellow);
    assert_eq!(score.critical_count, 0);
}

#[test]
fn scoring_is_idempotent() {
    let signals = vec![
        signal(Insurance, Pending),
        signal(Education, Pending),
        signal(Labs, Complete),
    ];

    let first = compute_readiness_score(&signals);
    let second = compute_readiness_score(&signals);
    assert_eq!(first, second);
}

#[test]
fn mixed_census_signals_score_red_with_one_critical() {
    let signals = vec![
        signal(Insurance, Pending),
        signal(Pharmacy, Complete),
        signal(Education, Pending),
        signal(Placement, Pending),
    ];
    let score = compute_readiness_score(&signals);

    assert_eq!(score.pending_count, 3);
    assert_eq!(score.critical_count, 1);
    assert_eq!((score.score, score.label), (25, ScoreLabel::Red));
}

#[test]
fn fully_complete_signals_score_green() {
    let signals = vec![
        signal(Labs, Complete),
        signal(Pharmacy, Complete),
        signal(Education, Complete),
        signal(Transport, Complete),
    ];
    let score = compute_readiness_score(&signals);

    assert_eq!(score.pending_count, 0);
    assert_eq!((score.score, score.label), (95, ScoreLabel::Green));
}

// Known limitation: errored signals are neither pending nor critical, so an
// insurance feed failure reads as ready.
#[test]
fn error_signals_do_not_count_toward_score() {
    let signals = vec![
        signal(Insurance, Error),
        signal(Labs, Error),
        signal(Pharmacy, Error),
    ];
    let score = compute_readiness_score(&signals);

    assert_eq!(score.pending_count, 0);
    assert_eq!(score.critical_count, 0);
    assert_eq!(score.label, ScoreLabel::Green);
}

#[test]
fn breakdown_lists_pending_kinds_with_their_timestamps() {
    let signals = vec![
        signal_at(Pharmacy, Pending, at(7, 15)),
        signal_at(Labs, Complete, at(8, 0)),
        signal_at(Education, Pending, at(7, 30)),
    ];
    let score = compute_readiness_score(&signals);

    assert_eq!(score.pending_kinds(), vec![Pharmacy, Education]);
    assert_eq!(score.breakdown[0].since, at(7, 15));
    assert_eq!(score.breakdown[1].last_updated_ts, at(7, 30));
}

#[test]
fn canonical_signals_keep_latest_per_kind_in_original_order() {
    let signals = vec![
        signal_at(Pharmacy, Pending, at(7, 0)),
        signal_at(Labs, Complete, at(7, 5)),
        signal_at(Pharmacy, Complete, at(9, 0)),
        signal_at(Labs, Pending, at(6, 0)),
    ];
    let canonical = canonical_signals(&signals);

    assert_eq!(canonical.len(), 2);
    assert_eq!(canonical[0].kind, Labs);
    assert_eq!(canonical[0].status, Complete);
    assert_eq!(canonical[1].kind, Pharmacy);
    assert_eq!(canonical[1].status, Complete);
}

#[test]
fn canonical_signals_break_ties_toward_later_entry() {
    let signals = vec![
        signal_at(Education, Pending, at(8, 0)),
        signal_at(Education, Complete, at(8, 0)),
    ];
    let canonical = canonical_signals(&signals);

    assert_eq!(canonical.len(), 1);
    assert_eq!(canonical[0].status, Complete);
}
