use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use careline::api::{router, AppState};
use careline::config::EngineConfig;
use careline::protocol::ProtocolProvider;
use careline::store::{SqliteStore, TriageStore};
use careline::triage::TriageOrchestrator;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,careline=debug")),
        )
        .init();

    if let Err(err) = run().await {
        tracing::error!(error = %err, "Startup failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = EngineConfig::from_env()?;

    let store: Arc<dyn TriageStore> = Arc::new(SqliteStore::open(&config.db_path)?);
    tracing::info!(db_path = %config.db_path, "Store opened");

    let protocols = Arc::new(ProtocolProvider::new(store.clone()));
    let backend = config.build_backend();
    let deadline = config.resolve_deadline(backend.as_ref());
    match &backend {
        Some(backend) => tracing::info!(
            backend = backend.name(),
            deadline_secs = deadline.as_secs(),
            "Inference backend ready"
        ),
        None => tracing::warn!("Inference disabled; rule engine will answer every triage"),
    }

    let orchestrator = Arc::new(TriageOrchestrator::new(
        store.clone(),
        protocols.clone(),
        backend,
        deadline,
    ));

    let app = router(AppState {
        store,
        protocols,
        orchestrator,
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "Listening");
    axum::serve(listener, app).await?;
    Ok(())
}
