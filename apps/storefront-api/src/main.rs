//! # Storefront API
//!
//! HTTP server for storefront checkout and settlement.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront API Server                            │
//! │                                                                         │
//! │  Web client ───► HTTP (5000) ───► CheckoutEngine ───► SQLite            │
//! │                                         │                               │
//! │                                         ▼                               │
//! │                                  Payment processor                      │
//! │                              (Stripe or in-memory)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use storefront_api::{build_router, ApiConfig, AppState, ConfigError, ProcessorKind};
use storefront_checkout::{InMemoryProcessor, PaymentProcessor, StripeProcessor};
use storefront_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Starting Storefront API server...");

    // Load configuration
    let config = ApiConfig::load()?;
    let addr = config.socket_addr()?;
    info!(
        port = config.http_port,
        database = %config.database_path,
        processor = ?config.processor,
        checkout_currency = %config.checkout_currency,
        settlement_currency = %config.settlement_currency,
        settlement_rate = %config.settlement_rate.value(),
        promptpay = %config.promptpay_receiver,
        "Configuration loaded"
    );

    // Open database (runs migrations)
    let db = Database::new(DbConfig::new(&config.database_path)).await?;
    info!("Database ready");

    let processor: Arc<dyn PaymentProcessor> = match config.processor {
        ProcessorKind::Stripe => {
            let settings = config
                .stripe_settings()
                .ok_or_else(|| ConfigError::MissingRequired("STRIPE_SECRET_KEY".to_string()))?;
            Arc::new(StripeProcessor::new(settings)?)
        }
        ProcessorKind::Memory => {
            warn!("Using in-memory payment processor; sessions are paid immediately");
            Arc::new(InMemoryProcessor::new().auto_pay(true))
        }
    };

    let state = AppState::new(db.clone(), processor, config.checkout_settings()?);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received, starting graceful shutdown...");
}
