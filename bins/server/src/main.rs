//! Ledgerly API Server
//!
//! Serves the accounts payable / receivable routes and runs the scheduled
//! overdue sweep in the background.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ledgerly_api::{AppState, create_router};
use ledgerly_db::{LedgerPolicy, LedgerRepository, SweepScope, connect_with};
use ledgerly_shared::{AppConfig, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledgerly=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;

    let db = connect_with(&config.database).await?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    let jwt_service = JwtService::new(JwtConfig {
        secret: config.jwt.secret.clone(),
        access_token_expires_minutes: i64::try_from(config.jwt.access_token_expiry_secs / 60)
            .unwrap_or(i64::MAX),
    });

    let policy = LedgerPolicy::from(&config.ledger);
    info!(
        payment_tolerance = %policy.payment_tolerance,
        max_write_retries = policy.max_write_retries,
        sweep_include_partially_paid = policy.sweep.include_partially_paid,
        "Ledger policy loaded"
    );
    let ledger = LedgerRepository::with_policy(db, policy);

    let sweeper = spawn_overdue_sweeper(ledger.clone(), config.ledger.sweep_interval_secs);

    let state = AppState {
        ledger,
        jwt_service: Arc::new(jwt_service),
    };
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    info!("Server stopped");
    Ok(())
}

/// Runs the overdue sweep over every organization on a fixed interval.
///
/// The first tick fires immediately, so records that fell due while the
/// service was down are caught at startup. An interval of 0 disables it.
fn spawn_overdue_sweeper(ledger: LedgerRepository, interval_secs: u64) -> Option<JoinHandle<()>> {
    if interval_secs == 0 {
        info!("Scheduled overdue sweep disabled");
        return None;
    }

    info!(interval_secs, "Scheduled overdue sweep enabled");
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = ledger.sweep_overdue(Utc::now(), SweepScope::All).await {
                error!(error = %e, "Scheduled overdue sweep failed");
            }
        }
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
