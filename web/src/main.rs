//! StagePass HTTP server.
//!
//! Ticket inventory and reservation engine over Postgres.

use stagepass_core::SystemClock;
use stagepass_engine::Environment;
use stagepass_store::{PostgresBookingStore, PostgresEventCatalog, PostgresUserDirectory};
use stagepass_web::adapters::{DevPaymentGateway, LogNotifier};
use stagepass_web::{build_router, AppState, Config};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stagepass=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(database_url = %config.database.url, "configuration loaded");

    let pool = stagepass_store::connect(&config.database.url, config.database.max_connections)
        .await?;
    if config.database.run_migrations {
        stagepass_store::run_migrations(&pool).await?;
        info!("migrations applied");
    }

    // Wire the workflows onto their collaborators
    let env = Environment::new(
        Arc::new(PostgresBookingStore::new(pool.clone())),
        Arc::new(PostgresEventCatalog::new(pool.clone())),
        Arc::new(PostgresUserDirectory::new(pool)),
        DevPaymentGateway::shared(),
        LogNotifier::shared(),
        SystemClock::shared(),
    );
    let app = build_router(AppState::new(env));

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "stagepass listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

/// Resolves when the process is asked to shut down.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Ctrl+C handler failed to install");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "SIGTERM handler failed to install");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Ctrl+C received, draining connections"),
        () = terminate => info!("SIGTERM received, draining connections"),
    }
}
