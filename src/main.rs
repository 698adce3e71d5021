//! Unifile server: assembles the file lifecycle engine, runs the processing
//! worker and logs every lifecycle event until shutdown.

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use unifile_core::config::AppConfig;
use unifile_core::error::AppError;
use unifile_core::events::EventFilter;
use unifile_service::{FileService, ServiceContext};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load `config/default`, the `UNIFILE_ENV` overlay and `UNIFILE__*`
/// variables.
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("UNIFILE_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        default_storage = %config.storage.default_provider,
        cache = %config.cache.provider,
        "Starting Unifile"
    );

    let ctx = ServiceContext::builder(config).build().await?;
    let service = FileService::new(ctx);
    service.initialize().await?;

    service.on_file_event(EventFilter::AnyEvent, |event| {
        tracing::info!(
            event = %event.event_type(),
            file_id = %event.file_id,
            error = event.payload.error(),
            "File event"
        );
    });

    let report = service.health_check().await;
    tracing::info!(
        healthy = report.is_healthy(),
        storage = ?report.storage,
        cache = report.cache,
        queue_capacity = report.queue_capacity,
        "Health check"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_handle = service.start_processing(shutdown_rx);
    tracing::info!("Processing worker started");

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping the processing worker...");
    let _ = shutdown_tx.send(true);

    if tokio::time::timeout(std::time::Duration::from_secs(30), worker_handle)
        .await
        .is_err()
    {
        tracing::warn!("Processing worker did not stop within 30s");
    }

    tracing::info!("Unifile shut down gracefully");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
