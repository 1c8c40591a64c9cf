use std::process::ExitCode;

use hyperpath::scenario::Scenario;
use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a stderr subscriber filtered by `RUST_LOG`, defaulting to info.
fn init_logger() {
    let default_level = LevelFilter::INFO;
    let rust_log =
        std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| default_level.to_string());
    let filter = EnvFilter::try_new(rust_log).unwrap_or_else(|err| {
        eprintln!(
            "invalid {}, falling back to level '{}': {}",
            EnvFilter::DEFAULT_ENV,
            default_level,
            err,
        );
        EnvFilter::new(default_level.to_string())
    });
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    init_logger();

    let mut args = std::env::args().skip(1);
    let (Some(path), None) = (args.next(), args.next()) else {
        eprintln!("usage: hyperpath <scenario.json>");
        return ExitCode::from(2);
    };

    let scenario = match Scenario::load(&path) {
        Ok(scenario) => scenario,
        Err(e) => {
            error!(path = %path, error = %e, "failed to load scenario");
            return ExitCode::FAILURE;
        }
    };

    let report = match scenario.run() {
        Ok(report) => report,
        Err(e) => {
            error!(path = %path, error = %e, "scenario failed");
            return ExitCode::FAILURE;
        }
    };
    info!(
        destinations = report.runs.len(),
        assigned = report.volumes.assigned_demand,
        dropped = report.volumes.dropped_demand(),
        "scenario complete"
    );

    match serde_json::to_string_pretty(&report) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "failed to encode report");
            ExitCode::FAILURE
        }
    }
}
