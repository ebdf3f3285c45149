use axum::{routing::get, Router};
use tokio_cron_scheduler::{Job, JobScheduler};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arenasurf::api::middleware::session::{create_session_layer, AppState};
use arenasurf::config::Config;
use arenasurf::jobs::voucher_expiry;
use arenasurf::services::accounts;
use arenasurf::{api, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "arenasurf=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Arena Surf server...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Create the configured staff account if it is missing
    accounts::ensure_bootstrap_staff(&pool, &config).await?;

    // Create session layer
    let session_layer = create_session_layer(pool.clone()).await?;
    tracing::info!("Session layer initialized");

    // Nightly voucher expiry sweep
    let scheduler = JobScheduler::new()
        .await
        .map_err(|e| anyhow::anyhow!("failed to create job scheduler: {e:?}"))?;
    let job_pool = pool.clone();
    let sweep = Job::new_async("0 30 3 * * *", move |_id, _scheduler| {
        let pool = job_pool.clone();
        Box::pin(async move {
            if let Err(e) = voucher_expiry::expire_overdue_vouchers(&pool).await {
                tracing::error!(error = %e, "voucher expiry sweep failed");
            }
        })
    })
    .map_err(|e| anyhow::anyhow!("invalid sweep schedule: {e:?}"))?;
    scheduler
        .add(sweep)
        .await
        .map_err(|e| anyhow::anyhow!("failed to schedule voucher expiry sweep: {e:?}"))?;
    scheduler
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("failed to start job scheduler: {e:?}"))?;
    tracing::info!("Job scheduler started");

    // Build application state
    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
    };

    // Build router
    let app = Router::new()
        .route("/health", get(api::health::health_check))
        .merge(api::auth::router())
        .merge(api::customers::router())
        .merge(api::memberships::router())
        .merge(api::vouchers::router())
        .merge(api::panel::router())
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C signal handler");
    tracing::info!("Shutdown signal received, cleaning up...");
}
