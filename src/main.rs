use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use hrc_core::{ConsoleConfig, FileStorage, SessionStore};
use hrc_gateway::Gateway;

/// Main entry point for the health-record console
///
/// Resolves configuration once, reopens the persisted session and serves the console REST
/// API (with Swagger UI at `/swagger-ui`).
///
/// # Environment Variables
/// - `HRC_CONSOLE_ADDR`: console address (default: "127.0.0.1:4200")
/// - `HRC_<SERVICE>_URL`: base URL of each remote service (default: `http://127.0.0.1:8001`..)
/// - `HRC_PROBE_TIMEOUT_MS`: per-service health probe timeout (default: 5000)
/// - `HRC_STATE_DIR`: where the session file lives (default: ".hrc")
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("hrc=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ConsoleConfig::from_lookup(|key| std::env::var(key).ok())?;

    let storage = FileStorage::open(config.session_file())?;
    let session = Arc::new(SessionStore::open(Arc::new(storage)));
    if let Some(user) = session.current() {
        tracing::info!("++ Resuming session for {} (id {})", user.name, user.id);
    }

    let gateway = Gateway::new(config.endpoints().clone())?;
    let app = api_rest::router(AppState::new(gateway, session, config.probe_timeout()));

    tracing::info!("++ Starting health-record console on {}", config.console_addr());
    let listener = tokio::net::TcpListener::bind(config.console_addr()).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
