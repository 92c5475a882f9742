//! GOES imagery service.
//!
//! Answers "what is the newest image" by running the acquisition pipeline
//! on demand, and serves the resulting artifacts as static files. With
//! `--once` it runs a single invocation, prints the artifact name and exits.

mod server;
mod state;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use imagery::{ImageRequest, Orchestrator, S3Archive, ServiceConfig};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "imagery-api")]
#[command(about = "GOES satellite imagery pipeline and artifact server")]
struct Args {
    /// YAML service configuration
    #[arg(long, env = "IMAGERY_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// HTTP port (overrides config)
    #[arg(long, env = "IMAGERY_PORT")]
    port: Option<u16>,

    /// Directory for raw product files (overrides config)
    #[arg(long, env = "IMAGERY_DOWNLOAD_DIR")]
    download_dir: Option<PathBuf>,

    /// Directory for finished artifacts (overrides config)
    #[arg(long, env = "IMAGERY_ARTIFACTS_DIR")]
    artifacts_dir: Option<PathBuf>,

    /// Directory for per-run intermediates (overrides config)
    #[arg(long, env = "IMAGERY_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// Run one pipeline invocation and exit
    #[arg(long)]
    once: bool,

    /// Request for --once: "live" or YYYY-MM-DD_HHMMSS
    #[arg(long, default_value = "live")]
    request: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    netcdf_parser::silence_hdf5_errors();

    let mut config = match &args.config {
        Some(path) => ServiceConfig::load(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(dir) = args.download_dir {
        config.storage.download_dir = dir;
    }
    if let Some(dir) = args.artifacts_dir {
        config.storage.artifacts_dir = dir;
    }
    if let Some(dir) = args.work_dir {
        config.storage.work_dir = dir;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let pipeline = config.pipeline_config()?;
    for dir in [&pipeline.download_dir, &pipeline.artifacts_dir, &pipeline.work_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    info!(
        product = %pipeline.product.file_token(),
        satellite = pipeline.product.satellite,
        dataset = %pipeline.dataset.name,
        crs = %pipeline.target_crs,
        "Starting GOES imagery service"
    );

    let archive = Arc::new(S3Archive::new(&config.archive).await?);
    let orchestrator = Arc::new(Orchestrator::new(pipeline, archive));
    let timeout = Duration::from_secs(config.pipeline.timeout_secs);

    if args.once {
        let request: ImageRequest = args
            .request
            .parse()
            .with_context(|| format!("Invalid request {}", args.request))?;

        return match tokio::time::timeout(timeout, orchestrator.latest(request)).await {
            Ok(Ok(artifact)) => {
                println!("{}", artifact.name);
                Ok(())
            }
            Ok(Err(e)) if e.is_not_yet_available() => {
                println!("{}", server::NOT_AVAILABLE);
                Ok(())
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => bail!("Pipeline run exceeded {}s", timeout.as_secs()),
        };
    }

    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    imagery::metrics::describe();
    info!("Prometheus metrics exporter initialized");

    let state = Arc::new(AppState::new(orchestrator, timeout).with_prometheus(prometheus_handle));

    tokio::select! {
        result = server::run_server(state, config.server.port) => {
            if let Err(e) = &result {
                error!(error = %e, "Server failed");
            }
            result
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            Ok(())
        }
    }
}
