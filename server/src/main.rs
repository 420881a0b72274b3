//! SchoolHub Server binary.

use schoolhub_server::{build_router, config::Config, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "schoolhub_server=debug,schoolhub_realtime=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting SchoolHub Server on {}:{}", config.host, config.port);
    if config.auth_token.is_none() {
        tracing::warn!("AUTH_TOKEN is not set; HTTP requests without a token are accepted");
    }

    let addr = format!("{}:{}", config.host, config.port);
    let app = build_router(AppState::new(config))?;

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
