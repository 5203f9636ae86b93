//! host-sentinel command line entry point
//!
//! Loads the configuration, wires the default sources into a sample loop and
//! runs it until Ctrl-C.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use host_sentinel::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Single-host telemetry sampler with threshold alerting
#[derive(Debug, Parser)]
#[command(name = "host-sentinel", version, about)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the sample interval in seconds
    #[arg(short, long)]
    interval: Option<f64>,

    /// Run a single tick, print the status report as JSON and exit
    #[arg(long)]
    once: bool,

    /// Append every event as a JSON line to this file
    #[arg(long)]
    events: Option<PathBuf>,

    /// Log level for host-sentinel, overridden by RUST_LOG
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_default_config: bool,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("host_sentinel={level}")));
    tracing_subscriber::registry().with(filter).with(fmt::layer().with_target(false)).init();
}

fn load_config(cli: &Cli) -> Result<MonitorConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration");
            MonitorConfig::load(path)?
        }
        None => {
            info!("Using default configuration");
            MonitorConfig::default()
        }
    };
    if let Some(interval) = cli.interval {
        config.interval_secs = interval;
    }
    config.validate()?;
    Ok(config)
}

fn build_sink(cli: &Cli) -> Result<Arc<dyn Sink>> {
    let mut sink = FanoutSink::new().with(TracingSink);
    if let Some(path) = &cli.events {
        sink = sink.with(JsonLinesSink::append(path)?);
    }
    Ok(Arc::new(sink))
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let registry = SourceRegistry::with_defaults(&config);
    let core = Arc::new(MonitorCore::new(config, build_sink(&cli)?)?);
    let sample_loop = SampleLoop::new(Arc::clone(&core), registry);

    if cli.once {
        sample_loop.tick().await;
        let report = serde_json::to_string_pretty(&core.status()).map_err(|e| Error::InvalidData(e.to_string()))?;
        println!("{report}");
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
        }
        shutdown.cancel();
    });

    sample_loop.run(cancel).await;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.print_default_config {
        return match MonitorConfig::default().to_toml_string() {
            Ok(toml) => {
                print!("{toml}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{e}");
                ExitCode::FAILURE
            }
        };
    }

    init_tracing(&cli.log_level);
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ (Error::ConfigInvalid(_) | Error::ConfigParse(_))) => {
            error!(error = %e, "Invalid configuration");
            ExitCode::from(2)
        }
        Err(e) => {
            error!(error = %e, "host-sentinel failed");
            ExitCode::FAILURE
        }
    }
}
