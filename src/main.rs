use std::sync::Arc;

use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use headline_desk::config::Config;
use headline_desk::desk::NewsDesk;
use headline_desk::routes::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "headline_desk=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::var("HEADLINE_DESK_CONFIG")
        .unwrap_or_else(|_| "headline-desk.toml".to_string());
    let mut config = Config::load(&config_path)?;
    if let Ok(database_url) = std::env::var("DATABASE_URL") {
        config.database_url = database_url;
    }
    info!("Loaded configuration from {}", config_path);

    let desk = NewsDesk::from_config(&config)?;
    info!(
        "Dark mode preference is {}",
        if desk.preference().await { "on" } else { "off" }
    );

    let state = Arc::new(AppState { desk });

    // Build router
    let app = routes::router(state).layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Server starting on http://{}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
