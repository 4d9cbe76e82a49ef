use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vista::config::Config;
use vista::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vista=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    info!("Starting Vista server on {}:{}", config.host, config.port);
    info!(
        versioned_mappings = config.versioned_value_mappings,
        blotter = ?config.blotter_attributes,
        max_viewports = config.max_viewports_per_grid,
        "View settings"
    );

    let addr = format!("{}:{}", config.host, config.port);
    let app = vista::app(AppState::new(config));

    // Start the server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Vista server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
