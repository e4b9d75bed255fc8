mod client;
mod domain;
mod engine;
mod error;
mod eviction;
mod freshness;
mod scheduler;
mod testcase;

use anyhow::{Context, Result};
use clap::Parser;
use client::Client;
use domain::{ActionKind, Order};
use engine::StorageEngine;
use rand::Rng;
use scheduler::RunParams;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use testcase::TestCase;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Fulfill a food-order challenge against the remote grading server.
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Authorization token for the challenge server.
    auth_token: String,

    /// Inverse order placement rate, in milliseconds.
    #[arg(default_value_t = 500)]
    rate_ms: u64,

    /// Minimum pickup delay, in milliseconds.
    #[arg(default_value_t = 4_000)]
    min_pickup_ms: u64,

    /// Maximum pickup delay, in milliseconds.
    #[arg(default_value_t = 8_000)]
    max_pickup_ms: u64,

    /// Problem seed. Drawn at random and logged if omitted.
    seed: Option<u64>,

    /// Save the fetched challenge (and its result) to this path.
    #[arg(long = "save-test", value_name = "PATH")]
    save_test: Option<PathBuf>,

    /// Replay a previously saved test case instead of fetching a new one.
    #[arg(long = "load-test", value_name = "PATH")]
    load_test: Option<PathBuf>,

    /// Run the engine and print the ledger without submitting it.
    #[arg(long = "skip-submission")]
    skip_submission: bool,

    /// Optional problem name, routed to a named practice problem.
    #[arg(long)]
    name: Option<String>,
}

struct Timing {
    rate_micros: u64,
    min_pickup_micros: u64,
    max_pickup_micros: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = run() {
        error!(%err, "run failed");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let client = Client::new(&args.auth_token);

    let (orders, test_id, timing, seed): (Vec<Order>, String, Timing, Option<u64>) =
        if let Some(load_path) = &args.load_test {
            let case = testcase::load(load_path).context("loading test case")?;
            info!(path = %load_path.display(), test_id = %case.test_id, "loaded test case");
            let timing = Timing {
                rate_micros: case.rate_micros,
                min_pickup_micros: case.min_pickup_micros,
                max_pickup_micros: case.max_pickup_micros,
            };
            (case.orders, case.test_id, timing, case.seed)
        } else {
            let seed = args.seed.unwrap_or_else(|| {
                let drawn = rand::rng().random_range(0..client::MAX_SEED);
                info!(seed = drawn, "no seed supplied, drew one for this run");
                drawn
            });

            let challenge = client
                .fetch_challenge(Some(seed), args.name.as_deref())
                .context("fetching challenge")?;
            let timing = Timing {
                rate_micros: args.rate_ms * 1_000,
                min_pickup_micros: args.min_pickup_ms * 1_000,
                max_pickup_micros: args.max_pickup_ms * 1_000,
            };
            (challenge.orders, challenge.test_id, timing, Some(seed))
        };

    info!(order_count = orders.len(), test_id = %test_id, "starting run");

    let engine = Arc::new(StorageEngine::new());
    let params = RunParams {
        rate_micros: timing.rate_micros,
        min_pickup_micros: timing.min_pickup_micros,
        max_pickup_micros: timing.max_pickup_micros,
        seed,
    };
    let ledger = scheduler::run(engine, orders.clone(), params);

    let result = if args.skip_submission {
        info!("--skip-submission set, not contacting the challenge server");
        None
    } else {
        let verdict = client
            .submit_solution(
                &test_id,
                timing.rate_micros,
                timing.min_pickup_micros,
                timing.max_pickup_micros,
                &ledger,
            )
            .context("submitting solution")?;
        Some(verdict)
    };

    print_summary(&orders, &ledger, result.as_deref());

    if let Some(save_path) = &args.save_test {
        let now_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let previous = if save_path.exists() {
            testcase::load(save_path).ok()
        } else {
            None
        };
        let case = TestCase {
            test_id: test_id.clone(),
            orders,
            rate_micros: timing.rate_micros,
            min_pickup_micros: timing.min_pickup_micros,
            max_pickup_micros: timing.max_pickup_micros,
            seed,
            result: result.clone().or_else(|| previous.as_ref().and_then(|p| p.result.clone())),
            timestamp: Some(previous.as_ref().and_then(|p| p.timestamp).unwrap_or(now_secs)),
            rerun_timestamp: args.load_test.as_ref().map(|_| now_secs),
        };
        match testcase::save(save_path, &case) {
            Ok(()) => info!(path = %save_path.display(), "saved test case"),
            Err(err) => tracing::warn!(%err, "failed to save test case"),
        }
    }

    Ok(())
}

fn print_summary(orders: &[Order], ledger: &[domain::LedgerEntry], result: Option<&str>) {
    let count = |kind: ActionKind| ledger.iter().filter(|e| e.action == kind).count();
    println!(
        "orders={} place={} move={} pickup={} discard={}",
        orders.len(),
        count(ActionKind::Place),
        count(ActionKind::Move),
        count(ActionKind::Pickup),
        count(ActionKind::Discard),
    );
    match result {
        Some(verdict) => println!("result: {verdict}"),
        None => println!("result: submission skipped"),
    }
}
