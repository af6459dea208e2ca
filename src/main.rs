//! Diabetes Risk Prediction Service - Main Entry Point
//!
//! Loads the model and scaler artifacts once, then serves `POST /predict`.
//! Missing or broken artifacts leave the service up in degraded mode.

use anyhow::{Context, Result};
use diabetes_risk_service::{
    backend::Backend,
    config::{AppConfig, LogFormat, LoggingConfig},
    metrics::{MetricsReporter, ServiceMetrics},
    server::{router, AppState},
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.logging)?;

    info!("Starting Diabetes Risk Prediction Service");

    let metrics = Arc::new(ServiceMetrics::new());
    let backend = Backend::load(&config.artifacts);

    if config.metrics.report_interval_secs > 0 {
        let metrics_clone = metrics.clone();
        let interval = config.metrics.report_interval_secs;
        tokio::spawn(async move {
            let reporter = MetricsReporter::new(metrics_clone, interval);
            reporter.start().await;
        });
    }

    let app = router(AppState::new(backend, metrics.clone()));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(address = %addr, "API available at http://{}/predict", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}

/// `RUST_LOG` wins over the configured level when set
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!("diabetes_risk_service={}", logging.level))
    })?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
