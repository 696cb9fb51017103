//! polyfold: multiply many polynomials across a coordinator and workers.
//!
//! # Usage
//!
//! ```bash
//! # Everything in one process: coordinator plus 3 worker tasks
//! polyfold run --workers 3 --count 16 --degree 2
//!
//! # One process per rank, endpoints from config/polyfold.toml
//! polyfold rank --rank 1 &
//! polyfold rank --rank 2 &
//! polyfold rank --rank 0 --count 16
//! ```
//!
//! The product goes to stdout; logs go to stderr.

mod cli;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use polyfold_comm::{Communicator, GroupConfig, LocalGroup, ZmqComm, COORDINATOR};
use polyfold_core::config::load_dotenv;
use polyfold_core::seed::{generate, SeedSpec};
use polyfold_core::{Convolution, RunConfig, WorkItem};
use polyfold_scheduler::{run_coordinator, run_worker, CoordinatorConfig, CoordinatorOutcome};

use crate::cli::{CliArgs, Command, RankArgs, RunArgs, SeedArgs};

#[tokio::main]
async fn main() -> ExitCode {
    // Logs on stderr so stdout carries only the result.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    match dispatch(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "polyfold failed");
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(args: CliArgs) -> Result<()> {
    match args.command {
        Command::Run(run) => {
            let config = run_config(&run.seeds)?;
            run_local(&run, &config).await
        }
        Command::Rank(rank) => {
            let config = run_config(&rank.seeds)?;
            run_rank(&rank, &config).await
        }
    }
}

fn run_config(seeds: &SeedArgs) -> Result<RunConfig> {
    load_dotenv();
    let mut config = RunConfig::from_env();
    seeds.apply(&mut config);
    config.validate().context("invalid run configuration")?;
    config.log_summary();
    Ok(config)
}

fn seed_items(config: &RunConfig) -> Result<Vec<WorkItem>> {
    let spec = SeedSpec::new(config.seed_count, config.seed_degree);
    let seeds = generate(&spec, config.rng_seed).context("failed to generate seed items")?;
    for (i, seed) in seeds.iter().enumerate() {
        tracing::debug!(index = i, polynomial = %seed, "seed");
    }
    Ok(seeds)
}

fn report(outcome: &CoordinatorOutcome) -> Result<()> {
    let metrics = serde_json::to_string(&outcome.metrics)?;
    info!(degree = ?outcome.item.degree(), %metrics, "reduction complete");
    println!("{}", outcome.item);
    Ok(())
}

async fn run_local(args: &RunArgs, config: &RunConfig) -> Result<()> {
    let seeds = seed_items(config)?;
    let group = LocalGroup::create(args.workers + 1);
    info!(workers = args.workers, "starting in-process group");

    let workers: Vec<_> = group[1..]
        .iter()
        .cloned()
        .map(|member| tokio::spawn(async move { run_worker(&member, &Convolution).await }))
        .collect();

    let outcome = run_coordinator(&group[0], &Convolution, seeds, &CoordinatorConfig::from(config)).await;

    let mut worker_failure = None;
    for handle in workers {
        match handle.await.context("worker task panicked")? {
            Ok(report) => tracing::debug!(rank = report.rank, tasks = report.tasks, "worker finished"),
            Err(e) if e.is_abort() => {}
            Err(e) => {
                warn!(error = %e, "worker failed");
                if worker_failure.is_none() {
                    worker_failure = Some(e);
                }
            }
        }
    }

    let outcome = outcome.context("coordinator failed")?;
    if let Some(e) = worker_failure {
        return Err(e).context("worker failed");
    }
    report(&outcome)
}

async fn run_rank(args: &RankArgs, config: &RunConfig) -> Result<()> {
    let group_config = GroupConfig::from_file(&args.config)
        .with_context(|| format!("failed to load group config {}", args.config.display()))?;
    let comm = ZmqComm::join(&group_config, args.rank)
        .await
        .context("failed to join group")?;

    if comm.rank() == COORDINATOR {
        let seeds = seed_items(config)?;
        let outcome = run_coordinator(&comm, &Convolution, seeds, &CoordinatorConfig::from(config))
            .await
            .context("coordinator failed")?;
        report(&outcome)
    } else {
        let report = run_worker(&comm, &Convolution).await.context("worker failed")?;
        info!(rank = report.rank, tasks = report.tasks, "worker finished");
        Ok(())
    }
}
