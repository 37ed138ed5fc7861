//! Command-line interface for coursegen.
//!
//! This module provides the CLI commands and argument parsing for the
//! coursegen tool: plan diagnostics, phase listing, and selective repair.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use std::sync::Arc;

use coursegen_config::Config;
use coursegen_engine::{LogLevel, RepairEngine, RepairError, RunStatus, StallTimeout};
use coursegen_model::{CoursePlan, PlanId};
use coursegen_phase_api::{PhaseExecutor, PhaseStatus};
use coursegen_runner::ProcessExecutor;
use coursegen_store::{ArtifactStore, JsonFileStore};

use crate::exit_codes::ExitCode;
use crate::logging::init_tracing;

/// coursegen - pipeline diagnostics and selective repair for curricula
#[derive(Parser)]
#[command(name = "coursegen")]
#[command(about = "Diagnose and selectively repair generated training curricula")]
#[command(long_about = r#"
coursegen inspects a partially-built curriculum plan, reports per-phase
completeness, and re-invokes only the deficient generation phases without
disturbing already-complete work.

EXAMPLES:
  # Seed an empty plan document
  coursegen init onboarding-2026 --title "Onboarding 2026"

  # Show per-phase diagnostics
  coursegen status onboarding-2026
  coursegen status onboarding-2026 --json

  # List the registered pipeline phases
  coursegen phases

  # Repair the deficient phases, streaming progress
  coursegen repair onboarding-2026 --phase lesson_generation --phase enrichment

CONFIGURATION:
  The plan store and config live under $COURSEGEN_HOME (default .coursegen).
  Executor commands are configured per phase in config.toml:

    [phases.enrichment]
    command = "coursegen-enrich"
    args = ["--plan-id", "{plan_id}"]

PHASES:
  context_indexing -> master_plan -> lesson_generation -> enrichment
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Override the coursegen home directory
    #[arg(long, global = true)]
    pub home: Option<Utf8PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show per-phase diagnostics for a plan
    Status {
        /// Plan identifier
        plan_id: String,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List registered pipeline phases and their dependencies
    Phases,
    /// Seed an empty plan document in the store
    Init {
        /// Plan identifier
        plan_id: String,
        /// Course title
        #[arg(long, default_value = "Untitled course")]
        title: String,
    },
    /// Re-run deficient phases for a plan, streaming progress
    Repair {
        /// Plan identifier
        plan_id: String,
        /// Phase token to repair (repeatable)
        #[arg(long = "phase", required = true)]
        phases: Vec<String>,
        /// Stall timeout override in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}

/// Main CLI entry point.
///
/// Parses arguments, initializes logging, and executes the selected command.
/// Handles all output including errors; the caller only maps the returned
/// code to a process exit.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("warning: failed to initialize logging: {e}");
    }

    let home = cli
        .home
        .clone()
        .unwrap_or_else(coursegen_config::coursegen_home);

    let config = Config::discover(cli.config.as_deref(), &home).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::Usage
    })?;

    let store = JsonFileStore::with_root(home);

    match cli.command {
        Commands::Status { plan_id, json } => cmd_status(&store, &plan_id, json),
        Commands::Phases => cmd_phases(),
        Commands::Init { plan_id, title } => cmd_init(&store, &plan_id, &title),
        Commands::Repair {
            plan_id,
            phases,
            timeout,
        } => cmd_repair(store, &config, &plan_id, &phases, timeout),
    }
}

fn parse_plan_id(raw: &str) -> Result<PlanId, ExitCode> {
    raw.parse().map_err(|e| {
        eprintln!("error: invalid plan id: {e}");
        ExitCode::Usage
    })
}

fn repair_error(err: &RepairError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(err)
}

fn print_status_table(statuses: &[PhaseStatus]) {
    println!("{:<18} {:<10} DETAIL", "PHASE", "STATE");
    for status in statuses {
        println!(
            "{:<18} {:<10} {}",
            status.phase.as_str(),
            status.state.as_str(),
            status.detail
        );
    }
}

fn cmd_status(store: &JsonFileStore, plan_id: &str, json: bool) -> Result<(), ExitCode> {
    let plan_id = parse_plan_id(plan_id)?;
    let plan = store.load(&plan_id).map_err(|e| {
        eprintln!("error: {e}");
        match e {
            coursegen_store::StoreError::NotFound { .. } => ExitCode::NotFound,
            _ => ExitCode::General,
        }
    })?;

    let statuses = coursegen_status::evaluate(&plan);
    if json {
        let rendered = coursegen_status::emit_json_pretty(&statuses).map_err(|e| {
            eprintln!("error: {e}");
            ExitCode::General
        })?;
        println!("{rendered}");
    } else {
        println!("Plan: {} ({})", plan.id, plan.title);
        print_status_table(&statuses);
    }
    Ok(())
}

fn cmd_phases() -> Result<(), ExitCode> {
    println!("{:<18} {:<20} DEPENDS ON", "PHASE", "LABEL");
    for definition in coursegen_status::definitions() {
        let deps = if definition.depends_on.is_empty() {
            "-".to_string()
        } else {
            definition
                .depends_on
                .iter()
                .map(|d| d.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!("{:<18} {:<20} {deps}", definition.id.as_str(), definition.label);
    }
    Ok(())
}

fn cmd_init(store: &JsonFileStore, plan_id: &str, title: &str) -> Result<(), ExitCode> {
    let plan_id = parse_plan_id(plan_id)?;
    if store.exists(&plan_id) {
        eprintln!("error: plan '{plan_id}' already exists");
        return Err(ExitCode::Usage);
    }

    let plan = CoursePlan::new(plan_id, title);
    store.save(&plan).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::General
    })?;

    println!("Created plan '{}' at {}", plan.id, store.plan_root(&plan.id));
    Ok(())
}

fn cmd_repair(
    store: JsonFileStore,
    config: &Config,
    plan_id: &str,
    phases: &[String],
    timeout: Option<u64>,
) -> Result<(), ExitCode> {
    let plan_id = parse_plan_id(plan_id)?;

    let stall = timeout.map_or_else(
        || StallTimeout::from_duration(config.stall_timeout()),
        StallTimeout::from_secs,
    );

    let executor: Arc<dyn PhaseExecutor> = Arc::new(ProcessExecutor::from_config(config));
    let engine = RepairEngine::new(Arc::new(store), executor).with_stall_timeout(stall);

    let runtime = tokio::runtime::Runtime::new().map_err(|e| {
        eprintln!("error: failed to start runtime: {e}");
        ExitCode::General
    })?;

    runtime.block_on(async move {
        let handle = engine
            .request_repair_by_tokens(&plan_id, phases)
            .map_err(|e| repair_error(&e))?;

        // Ctrl-C requests a best-effort cancellation; the run reaches
        // Cancelled and releases the lock either way.
        {
            let handle = handle.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("cancellation requested, aborting repair...");
                    handle.cancel();
                }
            });
        }

        let mut logs = handle.logs();
        while let Some(record) = logs.next().await {
            match record.level {
                LogLevel::Info => println!("{}", record.message),
                LogLevel::Error => eprintln!("{}", record.message),
            }
        }

        let report = handle.wait().await;
        match report.status {
            RunStatus::Succeeded => {
                // Terminal state reached: show converged diagnostics.
                match engine.diagnostics(&plan_id) {
                    Ok(statuses) => print_status_table(&statuses),
                    Err(e) => eprintln!("warning: diagnostics unavailable: {e}"),
                }
                Ok(())
            }
            RunStatus::Cancelled => {
                eprintln!("repair cancelled; re-run 'coursegen status' to see plan state");
                Err(ExitCode::Cancelled)
            }
            _ => {
                if let Some(failure) = &report.failure {
                    eprintln!("repair failed: {failure}");
                }
                Err(ExitCode::RunFailed)
            }
        }
    })
}
