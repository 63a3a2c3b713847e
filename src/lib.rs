// src/lib.rs

pub mod agent;
pub mod cli;
pub mod config;
pub mod errors;
pub mod grammar;
pub mod logging;
pub mod planner;
pub mod report;
pub mod scheduler;
pub mod store;
pub mod types;

use std::io::Write;
use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::{debug, info, warn};

use crate::agent::{AgentOptions, AgentPool, LocalTaskSource, TaskSource};
use crate::cli::CliArgs;
use crate::config::loader::load_or_default;
use crate::config::model::ConfigFile;
use crate::report::Outcome;
use crate::scheduler::{Scheduler, SchedulerOptions};
use crate::store::MemoryStore;
use crate::types::{ExpressionId, OwnerId};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file, environment, CLI overrides)
/// - input validation
/// - scheduler over an in-memory store
/// - an in-process agent pool
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let mut cfg = load_or_default(args.config.as_deref())?;
    apply_cli_overrides(&mut cfg, &args)?;

    if args.dry_run {
        return print_dry_run(&args.expressions);
    }

    let scheduler = Arc::new(Scheduler::new(
        MemoryStore::new(),
        SchedulerOptions::from_config(&cfg),
    ));
    let source: Arc<dyn TaskSource> = Arc::new(LocalTaskSource::new(Arc::clone(&scheduler)));
    let pool = AgentPool::spawn(source, AgentOptions::from_config(&cfg.agent));

    let owner = OwnerId(args.owner);
    let mut outcomes: Vec<Option<Outcome>> = Vec::with_capacity(args.expressions.len());
    let mut pending: Vec<(usize, ExpressionId)> = Vec::new();

    for raw in &args.expressions {
        if let Err(err) = grammar::validate_input(raw) {
            warn!(expression = %raw, error = %err, "rejected before submission");
            outcomes.push(Some(Outcome::rejected(raw, err)));
            continue;
        }
        match scheduler.submit(owner, raw) {
            Ok(id) => {
                pending.push((outcomes.len(), id));
                outcomes.push(None);
            }
            Err(err) => outcomes.push(Some(Outcome::rejected(raw, err))),
        }
    }

    info!(submitted = pending.len(), "waiting for results");
    let interrupted = tokio::select! {
        waited = wait_all(&scheduler, &pending) => {
            for (slot, outcome) in waited? {
                outcomes[slot] = Some(outcome);
            }
            false
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "failed to listen for Ctrl+C");
            }
            true
        }
    };

    let stats = pool.shutdown().await?;
    debug!(?stats, "agents finished");

    if interrupted {
        bail!("interrupted before all expressions finished");
    }

    let outcomes: Vec<Outcome> = outcomes.into_iter().flatten().collect();
    let mut stdout = std::io::stdout().lock();
    if args.json {
        report::write_json(&mut stdout, &outcomes)?;
    } else {
        report::write_text(&mut stdout, &outcomes)?;
    }

    let failed = outcomes.iter().filter(|o| !o.succeeded()).count();
    if failed > 0 {
        bail!("{failed} of {} expressions failed", outcomes.len());
    }
    Ok(())
}

/// `--mode` and `--workers` win over the config file.
fn apply_cli_overrides(cfg: &mut ConfigFile, args: &CliArgs) -> Result<()> {
    if let Some(mode) = args.mode {
        cfg.scheduler.mode = mode;
    }
    if let Some(workers) = args.workers {
        if workers == 0 {
            bail!("--workers must be at least 1");
        }
        cfg.agent.computing_power = workers;
    }
    Ok(())
}

async fn wait_all(
    scheduler: &Scheduler<MemoryStore>,
    pending: &[(usize, ExpressionId)],
) -> errors::Result<Vec<(usize, Outcome)>> {
    let mut done = Vec::with_capacity(pending.len());
    for &(slot, id) in pending {
        let expression = scheduler.wait_for(id).await?;
        done.push((slot, Outcome::from_expression(expression)));
    }
    Ok(done)
}

/// Validate and decompose every expression, printing the units instead of
/// running them.
fn print_dry_run(expressions: &[String]) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    let mut failed = 0usize;

    for raw in expressions {
        let planned = grammar::validate_input(raw).and_then(|()| planner::plan(raw));
        match planned {
            Ok(plan) => report::write_plan(&mut stdout, raw, &plan)?,
            Err(err) => {
                failed += 1;
                writeln!(stdout, "{raw}\n  error: {err}")?;
            }
        }
    }

    debug!("dry-run complete (no execution)");
    if failed > 0 {
        bail!("{failed} of {} expressions are invalid", expressions.len());
    }
    Ok(())
}
