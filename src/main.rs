use embedding_service::api::{create_router, AppState};
use embedding_service::infrastructure::{AppConfig, HubModelLoader};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=debug,embedding_service=debug,tower_http=debug".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    let config = AppConfig::from_env()?;
    info!(
        model = %config.embedding.model_name,
        port = config.server.port,
        "Embedding service starting up"
    );

    let loader = Arc::new(HubModelLoader::from_config(&config.embedding));
    let state = AppState::new(config.clone(), loader);

    // Requests retry the load on their own if this fails.
    match state.provider.ensure_loaded().await {
        Ok(_) => info!("Model pre-loaded successfully"),
        Err(e) => error!(
            severity = "critical",
            error = %e,
            "Failed to load model during startup; continuing in degraded state"
        ),
    }

    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    info!("API server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
