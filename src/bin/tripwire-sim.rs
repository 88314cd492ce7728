use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tripwire::config::{load_config, Settings};
use tripwire::observability::{logging, metrics};
use tripwire::{wrap, BreakerRegistry, Failure, Handlers, Phase};

#[derive(Parser)]
#[command(name = "tripwire-sim")]
#[command(about = "Drive a simulated flaky service through a circuit breaker", long_about = None)]
struct Cli {
    /// TOML settings file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run calls against a service that fails at the given rate
    Run {
        /// Number of calls to make.
        #[arg(long, default_value_t = 50)]
        calls: u32,

        /// Pause between calls in milliseconds.
        #[arg(long, default_value_t = 20)]
        interval_ms: u64,

        /// Probability (0.0 - 1.0) that a call fails.
        #[arg(long, default_value_t = 0.3)]
        failure_rate: f64,

        /// Print a JSON snapshot after every call.
        #[arg(long)]
        json: bool,
    },
    /// Check a settings file and exit
    Validate,
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Ok,
    Failed,
    Dropped,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => load_config(path)?,
        None => Settings::default(),
    };
    logging::init_logging(&settings.observability);
    metrics::set_enabled(settings.observability.metrics_enabled);

    match cli.command {
        Commands::Validate => {
            println!("{}", serde_json::to_string_pretty(&settings.breaker)?);
            println!("configuration OK");
        }
        Commands::Run {
            calls,
            interval_ms,
            failure_rate,
            json,
        } => {
            let service_calls = Arc::new(AtomicU64::new(0));
            let counter = service_calls.clone();
            let rate = failure_rate.clamp(0.0, 1.0);

            let handlers = Handlers::new(
                |_: &u32| Outcome::Dropped,
                |failure: Failure<String>| {
                    tracing::debug!(error = %failure.error, fail_count = failure.fail_count, "Call failed");
                    Outcome::Failed
                },
            );
            let breaker = wrap(
                "sim",
                move |_: &u32| {
                    counter.fetch_add(1, Ordering::Relaxed);
                    if fastrand::f64() < rate {
                        Err("simulated failure".to_string())
                    } else {
                        Ok(Outcome::Ok)
                    }
                },
                &settings.breaker,
                handlers,
            )?;

            let registry = BreakerRegistry::new();
            registry.register("sim", breaker.state());

            let (mut ok, mut failed, mut dropped) = (0u32, 0u32, 0u32);
            let mut last_phase = Phase::Closed;
            for i in 0..calls {
                match breaker.call(i) {
                    Outcome::Ok => ok += 1,
                    Outcome::Failed => failed += 1,
                    Outcome::Dropped => dropped += 1,
                }

                let phase = breaker.state().phase();
                if phase != last_phase {
                    tracing::info!(call = i, from = %last_phase, to = %phase, "Phase changed");
                    last_phase = phase;
                }
                if json {
                    println!("{}", serde_json::to_string(&registry.snapshot_all())?);
                }
                tokio::time::sleep(Duration::from_millis(interval_ms)).await;
            }

            breaker.shutdown();
            let summary = serde_json::json!({
                "calls": calls,
                "ok": ok,
                "failed": failed,
                "dropped": dropped,
                "service_invocations": service_calls.load(Ordering::Relaxed),
                "final": breaker.state().snapshot(),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
