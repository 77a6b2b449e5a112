mod cli;
mod config;
mod logger;

use anyhow::Context;
use clap::Parser;
use crate::cli::Args;
use crate::config::SimulatorConfig;
use dispatcher::simulated::{SimulatedError, SimulatedService, SimulatedServiceConfig};
use dispatcher::{BatchDispatcher, Cancellation, DispatchError, DispatchState, Limits};
use std::process::ExitCode;
use std::time::Duration;
use tokio::signal;
use tokio::time::Instant;

/// Outcome of one simulated dispatch.
#[derive(Debug)]
struct RunSummary {
    state: DispatchState,
    calls: usize,
    chunks_received: usize,
    items_received: usize,
    batch_size: usize,
    elapsed: Duration,
    error: Option<String>,
}

impl RunSummary {
    fn new(
        service: &SimulatedService<u64>,
        batch_size: usize,
        result: &Result<(), DispatchError<SimulatedError>>,
        elapsed: Duration,
    ) -> Self {
        let received = service.received();
        Self {
            state: DispatchState::of(result),
            calls: service.calls(),
            chunks_received: received.len(),
            items_received: received.iter().map(Vec::len).sum(),
            batch_size,
            elapsed,
            error: result.as_ref().err().map(ToString::to_string),
        }
    }

    fn succeeded(&self) -> bool {
        self.state == DispatchState::Succeeded
    }

    fn display(&self) {
        println!();
        println!("📊 Dispatch Summary ({:.2}s)", self.elapsed.as_secs_f64());
        println!("   🎯 Outcome: {}", self.state);
        println!(
            "   📤 Delivered: {}/{} items in {} chunks ({} calls)",
            self.items_received, self.batch_size, self.chunks_received, self.calls
        );
        if let Some(error) = &self.error {
            println!("   ❌ Error: {error}");
        }
    }
}

fn service_config(config: &SimulatorConfig) -> SimulatedServiceConfig {
    let limits = Limits::new(config.limits().chunk_size(), config.limits().interval());
    let mut service_config =
        SimulatedServiceConfig::new(limits).with_latency(config.downstream().latency());

    if let Some(chunk) = config.downstream().fail_at_chunk() {
        service_config = service_config.failing_at(chunk);
    }
    if config.downstream().enforce_quota() {
        service_config = service_config.enforcing_quota();
    }
    service_config
}

fn cancellation(config: &SimulatorConfig) -> Cancellation {
    match config.run().timeout() {
        Some(timeout) => Cancellation::with_timeout(timeout),
        None => Cancellation::new(),
    }
}

async fn simulate(config: &SimulatorConfig, ctx: &Cancellation) -> RunSummary {
    let service_config = service_config(config);
    let dispatcher: BatchDispatcher<SimulatedService<u64>> =
        BatchDispatcher::new(SimulatedService::new(service_config));
    let batch_size = config.batch().size();
    let batch: Vec<u64> = (0..batch_size as u64).collect();

    let started = Instant::now();
    let result = dispatcher.dispatch(ctx, batch).await;

    RunSummary::new(dispatcher.service(), batch_size, &result, started.elapsed())
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let mut config =
        config::load(&args.config).context("Failed to load simulator configuration")?;
    config.apply_overrides(&args);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("❌ {}\n", error.user_message());
        }
        return Ok(ExitCode::from(2));
    }

    logger::setup_logger(config.logging()).context("Failed to initialize logging")?;

    println!("🚀 Starting Dispatch Simulator");
    println!("📋 Configuration:");
    println!("   Batch: {} items", config.batch().size());
    println!(
        "   Limits: {} items every {} ms",
        config.limits().chunk_size(),
        config.limits().interval_ms()
    );
    println!(
        "   Downstream: {} ms latency, quota {}{}",
        config.downstream().latency_ms(),
        if config.downstream().enforce_quota() {
            "enforced"
        } else {
            "off"
        },
        config
            .downstream()
            .fail_at_chunk()
            .map(|chunk| format!(", failing at chunk {chunk}"))
            .unwrap_or_default()
    );
    if let Some(timeout_secs) = config.run().timeout_secs() {
        println!("   Timeout: {timeout_secs} s");
    }
    println!("🎯 Dispatching... (Press Ctrl+C to stop)");

    let ctx = cancellation(&config);
    let interrupt = ctx.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, cancelling dispatch");
            interrupt.cancel();
        }
    });

    let summary = simulate(&config, &ctx).await;
    summary.display();

    Ok(if summary.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {e:#}");
            ExitCode::FAILURE
        }
    }
}
