use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use screenplan_core::plan::SimulatedPlanGenerator;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use screenplan_api::background;
use screenplan_api::config::ServerConfig;
use screenplan_api::engine::plan_runner::PlanRunner;
use screenplan_api::router::build_app_router;
use screenplan_api::staging::UploadStaging;
use screenplan_api::state::AppState;
use screenplan_api::storage::LocalImageStorage;
use screenplan_db::repositories::ScreenRepo;
use screenplan_db::DbPool;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = config.port,
        storage_root = %config.storage_root.display(),
        "Configuration loaded"
    );

    let pool = connect_database().await;

    // Generation tasks do not survive a restart; unlock their screens.
    let reset = ScreenRepo::reset_stale_generations(&pool)
        .await
        .expect("Failed to reset stale plan generations");
    if reset > 0 {
        tracing::warn!(reset, "Reset plan generations interrupted by a restart");
    }

    let storage = LocalImageStorage::new(&config.storage_root, &config.public_base_url);
    storage
        .ensure_root()
        .await
        .expect("Failed to create storage root");
    tracing::info!(root = %storage.root().display(), "Image storage ready");

    let generator = Arc::new(SimulatedPlanGenerator::new(config.plan_generation_delay()));
    let plan_runner = Arc::new(PlanRunner::new(pool.clone(), generator));

    // Abandoned uploads are dropped after UPLOAD_STAGING_TTL_SECS.
    let staging = Arc::new(UploadStaging::new());
    let cleanup_cancel = tokio_util::sync::CancellationToken::new();
    let cleanup_handle = tokio::spawn(background::staging_cleanup::run(
        Arc::clone(&staging),
        config.upload_staging_ttl(),
        cleanup_cancel.clone(),
    ));

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        storage: Arc::new(storage),
        staging,
        plan_runner: Arc::clone(&plan_runner),
    };

    let app = build_app_router(state, &config);
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind {addr}: {e}"));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // In-flight plans get SHUTDOWN_TIMEOUT_SECS to land in the database.
    plan_runner
        .shutdown(Duration::from_secs(config.shutdown_timeout_secs))
        .await;

    cleanup_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), cleanup_handle).await;
    tracing::info!("Shutdown complete");
}

/// `RUST_LOG` filtering, human-readable output unless `LOG_FORMAT=json`.
fn init_tracing() {
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "screenplan_api=debug,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(filter)
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();
}

/// Connect to `DATABASE_URL`, verify the connection and apply migrations.
async fn connect_database() -> DbPool {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = screenplan_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    screenplan_db::health_check(&pool)
        .await
        .expect("Database is not answering");
    screenplan_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");
    pool
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("SIGINT received, draining connections");
        }
        () = terminate => {
            tracing::info!("SIGTERM received, draining connections");
        }
    }
}
