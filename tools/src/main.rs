//! caseload-runner: headless driver for the counselor assignment core.
//!
//! Usage:
//!   caseload-runner --data-dir ./data --db desk.db --ticks 90 --seed 7
//!   caseload-runner --data-dir ./data --db desk.db --ipc-mode
//!
//! Without --ipc-mode it runs the load simulation and prints a summary.
//! With --ipc-mode it reads one JSON command per line on stdin and
//! answers one JSON line per command on stdout.

use anyhow::Result;
use caseload_core::{
    allocation::AssignmentResult,
    clock::{ManualClock, SystemClock},
    config::{DeskConfig, SimulationConfig},
    desk::Desk,
    ranker::RankedCandidate,
    reporting::{CategoryCoverage, CounselorWorkload},
    simulation::{LoadSimulation, SimulationReport},
    store::DeskStore,
    ticket::TicketAssignment,
    types::TicketId,
    validation::{SpecializationDraft, SpecializationUpdate},
};
use std::collections::HashMap;
use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Rank { category_id: String },
    OpenTicket { category_id: String },
    AssignManually { ticket_id: TicketId, counselor_id: String },
    CloseTicket { ticket_id: TicketId },
    AddSpecialization { draft: SpecializationDraft },
    UpdateSpecialization { counselor_id: String, category_id: String, update: SpecializationUpdate },
    RemoveSpecialization { counselor_id: String, category_id: String },
    ResetAll,
    Quit,
}

#[derive(serde::Serialize)]
struct DeskState {
    workload: Vec<CounselorWorkload>,
    coverage: Vec<CategoryCoverage>,
    open_tickets: usize,
}

#[derive(serde::Serialize)]
struct TicketReply<'a> {
    ticket: &'a TicketAssignment,
    #[serde(skip_serializing_if = "Option::is_none")]
    assignment: Option<AssignmentResult>,
}

#[derive(serde::Serialize)]
struct RankReply {
    category_id: String,
    candidates: Vec<RankedCandidate>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or(":memory:");
    let data_dir = args
        .windows(2)
        .find(|w| w[0] == "--data-dir")
        .map(|w| w[1].as_str())
        .unwrap_or("./data");

    let mut config = DeskConfig::load(data_dir)?;
    config.simulation.seed = parse_arg(&args, "--seed", config.simulation.seed);
    config.simulation.ticks = parse_arg(&args, "--ticks", config.simulation.ticks);

    if !ipc_mode {
        println!("caseload-runner");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!("  seed:      {}", config.simulation.seed);
        println!("  ticks:     {}", config.simulation.ticks);
        println!();
    }

    let store = DeskStore::open(db)?;
    store.migrate()?;

    if ipc_mode {
        let desk = Desk::build_sqlite(store, &config, Arc::new(SystemClock))?;
        run_ipc_loop(&desk)?;
    } else {
        let clock = Arc::new(ManualClock::epoch());
        let desk = Desk::build_sqlite(store, &config, clock.clone())?;
        let report = run_simulation(&desk, clock, config.simulation.clone())?;
        print_summary(&desk, &report);
    }

    Ok(())
}

fn run_simulation(desk: &Desk, clock: Arc<ManualClock>, sim: SimulationConfig) -> Result<SimulationReport> {
    let categories = desk.categories().cloned().collect();
    let mut simulation = LoadSimulation::new(Arc::clone(&desk.ledger), clock, categories, sim);
    Ok(simulation.run()?)
}

fn run_ipc_loop(desk: &Desk) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();
    let mut tickets: HashMap<TicketId, TicketAssignment> = HashMap::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                write_error(&mut stdout, &e.to_string())?;
                continue;
            }
        };
        if matches!(cmd, IpcCommand::Quit) {
            break;
        }

        match handle_command(desk, &mut tickets, cmd) {
            Ok(reply) => writeln!(stdout, "{reply}")?,
            Err(e) => write_error(&mut stdout, &format!("{e:#}"))?,
        }
        stdout.flush()?;
    }
    Ok(())
}

fn handle_command(
    desk: &Desk,
    tickets: &mut HashMap<TicketId, TicketAssignment>,
    cmd: IpcCommand,
) -> Result<serde_json::Value> {
    let reply = match cmd {
        IpcCommand::GetState | IpcCommand::Quit => serde_json::to_value(build_state(desk, tickets))?,
        IpcCommand::Rank { category_id } => {
            desk.category(&category_id)?;
            let candidates = desk.allocator.rank(&category_id);
            serde_json::to_value(RankReply { category_id, candidates })?
        }
        IpcCommand::OpenTicket { category_id } => {
            let (ticket, result) = desk.open_ticket(&category_id)?;
            let reply = serde_json::to_value(TicketReply { ticket: &ticket, assignment: Some(result) })?;
            tickets.insert(ticket.ticket_id.clone(), ticket);
            reply
        }
        IpcCommand::AssignManually { ticket_id, counselor_id } => {
            let ticket = find_ticket(tickets, &ticket_id)?;
            ticket.assign_manually(&desk.ledger, &counselor_id)?;
            serde_json::to_value(TicketReply { ticket, assignment: None })?
        }
        IpcCommand::CloseTicket { ticket_id } => {
            let ticket = find_ticket(tickets, &ticket_id)?;
            let outcome = ticket.release(&desk.ledger)?;
            let reply = serde_json::json!({ "ticket": ticket, "release": outcome });
            tickets.remove(&ticket_id);
            reply
        }
        IpcCommand::AddSpecialization { draft } => {
            serde_json::to_value(desk.ledger.add_specialization(&draft)?)?
        }
        IpcCommand::UpdateSpecialization { counselor_id, category_id, update } => serde_json::to_value(
            desk.ledger.update_specialization(&counselor_id, &category_id, &update)?,
        )?,
        IpcCommand::RemoveSpecialization { counselor_id, category_id } => serde_json::to_value(
            desk.ledger.remove_specialization(&counselor_id, &category_id)?,
        )?,
        IpcCommand::ResetAll => {
            let count = desk.ledger.reset_all()?;
            serde_json::json!({ "reset": count })
        }
    };
    Ok(reply)
}

fn find_ticket<'a>(
    tickets: &'a mut HashMap<TicketId, TicketAssignment>,
    ticket_id: &str,
) -> Result<&'a mut TicketAssignment> {
    tickets
        .get_mut(ticket_id)
        .ok_or_else(|| anyhow::anyhow!("Unknown ticket: {ticket_id}"))
}

fn build_state(desk: &Desk, tickets: &HashMap<TicketId, TicketAssignment>) -> DeskState {
    DeskState {
        workload: desk.ledger.workload_overview(),
        coverage: desk
            .categories()
            .map(|c| desk.ledger.category_coverage(&c.category_id))
            .collect(),
        open_tickets: tickets.len(),
    }
}

fn write_error(out: &mut impl Write, message: &str) -> Result<()> {
    let err_json = serde_json::json!({ "error": message });
    writeln!(out, "{err_json}")?;
    out.flush()?;
    Ok(())
}

fn print_summary(desk: &Desk, report: &SimulationReport) {
    println!("=== RUN SUMMARY ===");
    println!("  ticks run:      {}", report.ticks);
    println!("  created:        {}", report.created);
    println!("  auto-assigned:  {}", report.assigned);
    println!("  manual needed:  {}", report.fallbacks);
    println!("  resolved:       {}", report.released);
    println!("  still open:     {}", report.still_open);

    println!();
    println!("=== COUNSELOR WORKLOAD ===");
    if report.final_workload.is_empty() {
        println!("  (No specializations configured)");
    }
    for w in &report.final_workload {
        let assigned = report
            .assignments_by_counselor
            .get(&w.counselor_id)
            .copied()
            .unwrap_or(0);
        println!(
            "  {:<12} | {:>3}/{:<3} | {:>5.1}% | {} categories | {} assigned",
            w.counselor_id, w.current_workload, w.max_workload, w.utilization_rate, w.categories, assigned
        );
    }

    println!();
    println!("=== CATEGORY COVERAGE ===");
    for category in desk.categories() {
        let cov = desk.ledger.category_coverage(&category.category_id);
        let best = cov.best_score.map(|s| s.to_string()).unwrap_or_else(|| "-".into());
        println!(
            "  {:<12} | {}/{} available | {} slots free | best score {}{}",
            cov.category_id,
            cov.available_counselors,
            cov.counselors,
            cov.remaining_capacity,
            best,
            if category.auto_assign { "" } else { " | manual only" },
        );
    }
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
