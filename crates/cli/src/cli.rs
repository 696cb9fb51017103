use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use polyfold_core::RunConfig;

/// Distributed polynomial product by pairwise convolution.
///
/// Rank 0 coordinates: it owns the work queue and hands pairs of
/// polynomials to idle workers until one polynomial is left, then prints it.
#[derive(Parser, Debug)]
#[command(name = "polyfold", version, about)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the coordinator and its workers inside this process.
    Run(RunArgs),
    /// Join a ZeroMQ group as one rank (one process per rank).
    Rank(RankArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Number of worker ranks besides the coordinator.
    #[arg(long, env = "POLYFOLD_WORKERS", default_value_t = 3)]
    pub workers: usize,

    #[command(flatten)]
    pub seeds: SeedArgs,
}

#[derive(Args, Debug)]
pub struct RankArgs {
    /// This process's rank; 0 coordinates.
    #[arg(long, env = "POLYFOLD_RANK")]
    pub rank: usize,

    /// Group configuration file listing every rank's endpoint.
    #[arg(long, env = "POLYFOLD_CONFIG", default_value = "config/polyfold.toml")]
    pub config: PathBuf,

    #[command(flatten)]
    pub seeds: SeedArgs,
}

/// Seed overrides. Unset flags keep the `POLYFOLD_*` environment values.
#[derive(Args, Debug, Default)]
pub struct SeedArgs {
    /// Number of seed polynomials.
    #[arg(long)]
    pub count: Option<usize>,

    /// Degree of every seed polynomial.
    #[arg(long)]
    pub degree: Option<usize>,

    /// Fixed RNG seed for a reproducible run.
    #[arg(long)]
    pub rng_seed: Option<u64>,
}

impl SeedArgs {
    pub fn apply(&self, config: &mut RunConfig) {
        if let Some(count) = self.count {
            config.seed_count = count;
        }
        if let Some(degree) = self.degree {
            config.seed_degree = degree;
        }
        if self.rng_seed.is_some() {
            config.rng_seed = self.rng_seed;
        }
    }
}
