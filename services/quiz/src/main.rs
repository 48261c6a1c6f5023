use anyhow::Result;
use common::database;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use quiz::{
    AppState,
    config::{ServiceConfig, StoreBackend},
    repositories::{MemoryStore, PgStore, QuizStore},
    routes,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting quiz service");

    let config = ServiceConfig::from_env()?;
    info!("Loaded configuration: {:?}", config);

    match config.store {
        StoreBackend::Postgres => {
            // Initialize database connection pool
            let db_config = database::DatabaseConfig::from_env()?;
            let pool = database::init_pool(&db_config).await?;

            // Check database connectivity
            if database::health_check(&pool).await? {
                info!("Database connection successful");
            } else {
                anyhow::bail!("Failed to connect to database");
            }

            database::run_migrations(&pool).await?;

            serve(PgStore::new(pool), &config).await
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; all data is lost on shutdown");
            serve(MemoryStore::new(), &config).await
        }
    }
}

async fn serve<S: QuizStore>(store: S, config: &ServiceConfig) -> Result<()> {
    let app_state = AppState::new(store, config.auth_policy(), config.session_ttl());

    // Held for the lifetime of the server; dropping it stops the sweep
    let _sweep = match config.session_sweep_schedule.as_deref() {
        Some(schedule) => Some(app_state.sessions.start_expiry_sweep(schedule).await?),
        None => None,
    };

    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Quiz service listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down quiz service");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
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
                warn!("Failed to listen for SIGTERM: {}", e);
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
