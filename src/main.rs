use std::process::ExitCode;
use std::sync::Arc;

use log_exporter::config::Config;
use log_exporter::logging::{init_tracing, LogConfig};
use log_exporter::state::JobContext;
use log_exporter::store::Store;
use log_exporter::workers::{self, WorkerManager, WorkerName};
use tokio::sync::broadcast;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(&LogConfig::default());
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&LogConfig::from(&config));
    tracing::info!(job = %config.job_name, "Starting log-exporter");
    tracing::debug!(?config, "Loaded configuration");

    let selected = match config.worker.run_once.as_deref().map(str::parse::<WorkerName>) {
        None => None,
        Some(Ok(name)) => Some(name),
        Some(Err(e)) => {
            tracing::error!(error = %e, "Invalid RUN_ONCE value");
            return ExitCode::FAILURE;
        }
    };

    let store = if workers::needs_store(&config.worker, selected) {
        match Store::open(&config.state_path) {
            Ok(store) => Some(Arc::new(store)),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    path = %config.state_path,
                    "Failed to open state store; export task summaries will fail"
                );
                None
            }
        }
    } else {
        None
    };

    let ctx = JobContext::from_aws(&config, store.clone()).await;

    let code = match selected {
        Some(name) => match workers::run_once(name, &ctx).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!(worker = name.as_str(), kind = e.kind(), error = %e, "Run failed");
                ExitCode::FAILURE
            }
        },
        None => run_scheduler(ctx, &config).await,
    };

    if let Some(store) = store {
        tracing::info!("Flushing store before exit");
        if let Err(e) = store.flush() {
            tracing::error!(error = %e, "Failed to flush store before exit");
        }
    }
    code
}

async fn run_scheduler(ctx: JobContext, config: &Config) -> ExitCode {
    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let manager = WorkerManager::new(ctx, shutdown_tx.subscribe(), &config.worker);

    tokio::spawn(shutdown_signal(shutdown_tx));

    match manager.start().await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Worker manager failed");
            ExitCode::FAILURE
        }
    }
}

async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received");
    let _ = shutdown_tx.send(());
}
