use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use pilelog_api::config::{LogFormat, ServerConfig};
use pilelog_api::router::build_app_router;
use pilelog_api::state::AppState;
use pilelog_core::roles::RoleAuthorizer;
use pilelog_db::{DbPool, PgStore};
use pilelog_engine::Engine;
use pilelog_events::{BusNotifier, EventBus, NotificationPersistence};

const DEFAULT_LOG_FILTER: &str =
    "pilelog_api=debug,pilelog_engine=debug,pilelog_events=debug,tower_http=debug";

/// How long shutdown waits for queued notifications to be written.
const PERSISTENCE_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env().unwrap_or_else(|e| panic!("Invalid configuration: {e}"));
    init_tracing(config.log_format);
    tracing::info!(
        host = %config.host,
        port = config.port,
        max_batch = config.sync.max_batch,
        enforce_edit_lock = config.sync.enforce_edit_lock,
        "Configuration loaded"
    );

    let pool = connect_database().await;

    let bus = Arc::new(EventBus::default());
    let persistence = tokio::spawn(NotificationPersistence::run(pool.clone(), bus.subscribe()));

    let store = Arc::new(PgStore::new(pool));
    let engine = Engine::new(
        Arc::clone(&store),
        Arc::new(RoleAuthorizer),
        Arc::new(BusNotifier::new(Arc::clone(&bus))),
        config.engine_config(),
    );
    let state = AppState {
        store,
        engine: Arc::new(engine),
        config: Arc::new(config.clone()),
    };

    let addr = SocketAddr::new(
        config.host.parse().expect("HOST must be an IP address"),
        config.port,
    );
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    tracing::info!(%addr, "Listening");

    axum::serve(listener, build_app_router(state, &config))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // The router held the last notifier; dropping the bus closes the
    // channel so the persistence loop drains and returns.
    drop(bus);
    if tokio::time::timeout(PERSISTENCE_DRAIN_TIMEOUT, persistence)
        .await
        .is_err()
    {
        tracing::warn!("Notification persistence did not finish before the timeout");
    }
    tracing::info!("Shutdown complete");
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Connect, verify, and migrate. Any failure aborts startup.
async fn connect_database() -> DbPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = pilelog_db::create_pool(&url)
        .await
        .expect("Failed to connect to database");
    pilelog_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    pilelog_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");
    pool
}

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
        () = ctrl_c => tracing::info!("SIGINT received, shutting down"),
        () = terminate => tracing::info!("SIGTERM received, shutting down"),
    }
}
