use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use std::time::Duration;

use orderpay::config::Config;
use orderpay::db::{AppState, create_pool, init_db, queries};
use orderpay::handlers;
use orderpay::models::CreateOrder;

#[derive(Parser, Debug)]
#[command(name = "orderpay")]
#[command(about = "Order payment reconciliation service (Stripe, PhonePe, Razorpay)")]
struct Cli {
    /// Insert a demo pending order (dev mode only)
    #[arg(long)]
    seed: bool,

    /// Delete the database on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,
}

/// Seeds a pending order so the checkout endpoints can be tried locally.
/// Skipped if the demo order already exists.
fn seed_dev_data(state: &AppState, currency: &str) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    const DEMO_ORDER_NUMBER: &str = "ORD-DEV-1001";
    if queries::get_order_by_number(&conn, DEMO_ORDER_NUMBER)
        .expect("Failed to look up demo order")
        .is_some()
    {
        tracing::info!("Demo order already exists, skipping seed");
        return;
    }

    let order = queries::create_order(
        &conn,
        &CreateOrder {
            id: None,
            order_number: DEMO_ORDER_NUMBER.to_string(),
            amount_cents: 49950,
            currency: currency.to_string(),
            customer_email: Some("dev@orderpay.local".to_string()),
        },
    )
    .expect("Failed to create demo order");

    tracing::info!("============================================");
    tracing::info!("DEMO ORDER SEEDED");
    tracing::info!("Order ID: {}", order.id);
    tracing::info!("Order Number: {}", order.order_number);
    tracing::info!("Amount: {} {} (minor units)", order.amount_cents, order.currency);
    tracing::info!("============================================");
}

/// Spawns a background task that periodically purges old webhook event ids.
/// Runs every 5 minutes; a retention of 0 keeps them forever.
fn spawn_cleanup_task(state: AppState, retention_days: i64) {
    if retention_days <= 0 {
        tracing::info!("Webhook event retention disabled, ledger is kept forever");
        return;
    }

    tokio::spawn(async move {
        let interval = Duration::from_secs(5 * 60);

        loop {
            tokio::time::sleep(interval).await;

            match state.db.get() {
                Ok(conn) => match queries::purge_old_webhook_events(&conn, retention_days) {
                    Ok(count) => {
                        if count > 0 {
                            tracing::debug!("Purged {} old webhook events", count);
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to purge webhook events: {}", e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to get db connection for cleanup: {}", e);
                }
            }
        }
    });

    tracing::info!("Background cleanup task started (runs every 5 minutes)");
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "orderpay=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    let state = AppState::new(db_pool, &config);

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set ORDERPAY_ENV=dev)");
        } else {
            seed_dev_data(&state, &config.currency);
        }
    }

    spawn_cleanup_task(state.clone(), config.webhook_event_retention_days);

    let app = handlers::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    let cleanup_on_exit = cli.ephemeral && config.dev_mode;
    let db_path = config.database_path.clone();
    if cleanup_on_exit {
        tracing::info!("EPHEMERAL MODE: database will be deleted on exit");
    }

    tracing::info!("orderpay listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");

    if cleanup_on_exit {
        if let Err(e) = std::fs::remove_file(&db_path) {
            tracing::warn!("Failed to remove {}: {}", db_path, e);
        } else {
            tracing::info!("Removed {}", db_path);
        }
        let _ = std::fs::remove_file(format!("{}-wal", db_path));
        let _ = std::fs::remove_file(format!("{}-shm", db_path));
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
