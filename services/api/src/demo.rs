use crate::infra::{census_service, parse_label, CensusService};
use chrono::Duration;
use clap::Args;
use discharge_orchestrator::error::AppError;
use discharge_orchestrator::workflows::discharge::{
    Clock, DashboardQuery, DashboardView, DischargePolicy, EncounterId, FixedClock,
    NewTransportOrder, SampleCensus, ScoreLabel, SignalKind, SignalStatus, TransportStatus,
    UserRole,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DashboardArgs {
    /// Case-insensitive match on patient name or MRN
    #[arg(long)]
    pub(crate) search: Option<String>,
    /// Restrict rows to one unit (for example "Gen Med")
    #[arg(long)]
    pub(crate) unit: Option<String>,
    /// Restrict rows to one readiness label (green, yellow, red)
    #[arg(long, value_parser = parse_label)]
    pub(crate) label: Option<ScoreLabel>,
    /// Load the facility directory from a CSV export instead of the seed
    #[arg(long)]
    pub(crate) facilities_csv: Option<PathBuf>,
    /// Print the dashboard as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Encounter to walk through discharge
    #[arg(long, default_value = "1")]
    pub(crate) encounter: String,
    /// Minutes the demo clock advances between steps
    #[arg(long, default_value_t = 15)]
    pub(crate) step_minutes: i64,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            encounter: "1".to_string(),
            step_minutes: 15,
        }
    }
}

pub(crate) fn run_dashboard(args: DashboardArgs) -> Result<(), AppError> {
    let DashboardArgs {
        search,
        unit,
        label,
        facilities_csv,
        json,
    } = args;

    let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(SampleCensus::reference_time()));
    let service = census_service(
        DischargePolicy::default(),
        facilities_csv.as_deref(),
        Some(clock),
    )?;
    let view = service.dashboard(&DashboardQuery {
        search,
        unit,
        label,
    })?;

    if json {
        match serde_json::to_string_pretty(&view) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => eprintln!("failed to render dashboard: {err}"),
        }
    } else {
        render_dashboard(&view);
    }
    Ok(())
}

fn render_dashboard(view: &DashboardView) {
    let stats = &view.stats;
    println!(
        "Census: {} patients | {} green | {} yellow | {} red | avg LOS {} days",
        stats.total, stats.green, stats.yellow, stats.red, stats.avg_los_days
    );

    if view.rows.is_empty() {
        println!("No encounters match the current filters.");
        return;
    }

    for row in &view.rows {
        let pending = if row.pending.is_empty() {
            "none".to_string()
        } else {
            row.pending
                .iter()
                .map(|kind| kind.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!(
            "- [{:<6}] {:>2} {} ({}) {} {} | LOS {}d | pending: {} | open tasks: {}",
            row.label.as_str(),
            row.score,
            row.patient_name,
            row.mrn,
            row.unit.as_deref().unwrap_or("-"),
            row.room.as_deref().unwrap_or("-"),
            row.los_days,
            pending,
            row.open_tasks,
        );
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let clock = Arc::new(FixedClock::new(SampleCensus::reference_time()));
    let shared: Arc<dyn Clock> = clock.clone();
    let service = census_service(DischargePolicy::default(), None, Some(shared))?;
    let id = EncounterId(args.encounter);
    let step = Duration::minutes(args.step_minutes.max(1));

    let encounter = service.encounter(&id)?;
    println!(
        "Discharge demo for {} ({}), {} room {}",
        encounter.patient().name,
        encounter.patient().mrn,
        encounter.patient().unit.as_deref().unwrap_or("-"),
        encounter.patient().room.as_deref().unwrap_or("-"),
    );
    print_score(&service, &id, "admission review")?;

    clear_pending_signals(&service, &clock, &id, step)?;
    settle_placement(&service, &clock, &id, step)?;

    if service.encounter(&id)?.started_discharge_ts().is_none() {
        clock.advance(step);
        service.start_discharge(&id, UserRole::Doctor)?;
        println!("- doctor started discharge");
    }
    clock.advance(step);
    service.mark_ready(&id, UserRole::Doctor)?;
    println!("- doctor marked the patient ready");

    let order = service.schedule_transport(
        &id,
        NewTransportOrder {
            vendor: "MedTransport Inc".to_string(),
            pickup_ts: Some(clock.now() + Duration::hours(1)),
            notes: Some("Wheelchair van".to_string()),
        },
        UserRole::CaseManager,
    )?;
    println!("- case manager booked transport {}", order.id);
    for next in [TransportStatus::EnRoute, TransportStatus::DepartedUnit] {
        clock.advance(step);
        service.advance_transport(&id, &order.id, next, UserRole::CaseManager)?;
    }

    let left = service.mark_discharged(&id, UserRole::Doctor)?;
    println!("- patient left the unit at {}", left.format("%Y-%m-%d %H:%M UTC"));

    println!("\nScore history");
    for snapshot in service.score_history(&id)? {
        println!(
            "  {} {:<6} {:>2} ({} pending, {} critical)",
            snapshot.computed_ts.format("%H:%M"),
            snapshot.label.as_str(),
            snapshot.score,
            snapshot.pending_count,
            snapshot.critical_count,
        );
    }

    Ok(())
}

fn print_score(service: &CensusService, id: &EncounterId, context: &str) -> Result<(), AppError> {
    let score = service.current_score(id)?;
    let pending = score
        .pending_kinds()
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    println!(
        "  score after {context}: {} {} (pending: {})",
        score.label.as_str(),
        score.score,
        if pending.is_empty() { "none" } else { pending.as_str() }
    );
    Ok(())
}

fn clear_pending_signals(
    service: &CensusService,
    clock: &FixedClock,
    id: &EncounterId,
    step: Duration,
) -> Result<(), AppError> {
    let pending: Vec<_> = service
        .list_signals(id)?
        .into_iter()
        .filter(|signal| signal.status == SignalStatus::Pending)
        .collect();

    for signal in pending {
        clock.advance(step);
        if signal.kind == SignalKind::Education {
            service.record_patient_education(id, UserRole::Nurse)?;
            println!("- nurse documented patient education");
        } else {
            service.transition_signal(id, &signal.id, SignalStatus::Complete, UserRole::CaseManager)?;
            println!("- case manager cleared {}", signal.kind.as_str());
        }
        print_score(service, id, signal.kind.as_str())?;
    }
    Ok(())
}

fn settle_placement(
    service: &CensusService,
    clock: &FixedClock,
    id: &EncounterId,
    step: Duration,
) -> Result<(), AppError> {
    let encounter = service.encounter(id)?;
    if encounter.accepted_placement().is_some() {
        return Ok(());
    }
    let Some(open) = encounter.placements().iter().find(|placement| placement.is_open()) else {
        return Ok(());
    };

    clock.advance(step);
    match service.accept_placement(id, &open.id, UserRole::CaseManager) {
        Ok(accepted) => println!("- facility {} accepted the referral", accepted.facility_id),
        Err(err) => println!("- referral {} could not be accepted: {err}", open.id),
    }
    Ok(())
}
