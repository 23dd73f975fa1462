//! BSS Workflow Engine Server
//!
//! Consumes customer and payment domain events, runs the matching workflows
//! and serves the execution management API.

use std::net::SocketAddr;
use std::sync::Arc;

use bss_workflow_actions::{create_default_registry, LogMailSender, NotificationHub};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bss_workflow_engine::{
    config::{DatabaseConfig, EngineConfig, StoreBackend},
    db::{
        connect_pool, ensure_schema, ExecutionStore, MemoryDefinitionStore, MemoryExecutionStore,
        PgDefinitionStore, PgExecutionStore, WorkflowDefinitionStore,
    },
    definitions::{
        builtin_definitions, load_definitions_file, replace_definitions, seed_definitions,
    },
    engine::{ExecutionController, StepDriver},
    handlers::build_router,
    nats::EventSubscriber,
    state::AppState,
    ResultExt,
};

/// Initialize tracing/logging.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,bss_workflow_engine=debug,tower_http=debug".into());

    let json = std::env::var("BSS_LOG_JSON")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Stores for the configured backend.
struct Stores {
    definitions: Arc<dyn WorkflowDefinitionStore>,
    executions: Arc<dyn ExecutionStore>,
    postgres: Option<PgExecutionStore>,
}

async fn open_stores(config: &EngineConfig) -> anyhow::Result<Stores> {
    match config.store {
        StoreBackend::Memory => Ok(Stores {
            definitions: Arc::new(MemoryDefinitionStore::new()),
            executions: Arc::new(MemoryExecutionStore::new()),
            postgres: None,
        }),
        StoreBackend::Postgres => {
            let db_config = DatabaseConfig::from_env().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to load database config, using defaults");
                DatabaseConfig::default()
            });
            let pool = connect_pool(&db_config).await?;
            ensure_schema(&pool).await?;

            let executions = PgExecutionStore::new(pool.clone());
            Ok(Stores {
                definitions: Arc::new(PgDefinitionStore::new(pool)),
                executions: Arc::new(executions.clone()),
                postgres: Some(executions),
            })
        }
    }
}

/// Connect to NATS if configured.
async fn connect_nats(config: &EngineConfig) -> Option<async_nats::Client> {
    if let Some(ref nats_url) = config.nats_url {
        match async_nats::connect(nats_url).await {
            Ok(client) => {
                tracing::info!(url = %nats_url, "Connected to NATS");
                Some(client)
            }
            Err(e) => {
                tracing::warn!(error = %e, url = %nats_url, "Failed to connect to NATS, continuing without it");
                None
            }
        }
    } else {
        tracing::info!("NATS not configured, events accepted over HTTP only");
        None
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting BSS Workflow Engine"
    );

    let config = EngineConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load engine config, using defaults");
        EngineConfig::default()
    });

    tracing::info!(
        host = %config.host,
        port = config.port,
        store = %config.store,
        worker_pool_size = config.worker_pool_size,
        "Configuration loaded"
    );

    let stores = open_stores(&config).await?;

    // An explicit definitions file is authoritative; built-ins only fill gaps.
    match config.definitions_path {
        Some(ref path) => {
            let definitions = load_definitions_file(path).await?;
            replace_definitions(stores.definitions.as_ref(), &definitions).await?;
        }
        None => {
            seed_definitions(stores.definitions.as_ref(), &builtin_definitions()?).await?;
        }
    }

    let notifications = NotificationHub::new();
    let registry = create_default_registry(
        Arc::new(LogMailSender),
        notifications.clone(),
        config.simulation(),
    );
    let driver = StepDriver::new(
        stores.executions.clone(),
        Arc::new(registry),
        config.worker_pool_size,
    );
    let controller = ExecutionController::new(stores.definitions, stores.executions, driver);

    let nats_client = connect_nats(&config).await.map(Arc::new);

    let mut state =
        AppState::new(controller, notifications, config.clone()).with_nats(nats_client.clone());
    if let Some(store) = stores.postgres {
        state = state.with_postgres(store);
    }

    if let Some(client) = nats_client {
        let subscriber = EventSubscriber::new(client, state.router.clone());
        tokio::spawn(async move {
            let _ = subscriber.run().await.log("consuming domain events");
        });
    }

    let app = build_router(state);

    let addr: SocketAddr = config.bind_address().parse()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
