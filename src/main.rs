use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use article_feeds::config::Config;
use article_feeds::content::ContentStore;
use article_feeds::routes::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "article_feeds=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::var("SITE_CONFIG").unwrap_or_else(|_| "site.toml".to_string());
    let config = Config::load(&config_path)?;
    info!("Loaded configuration from {}", config_path);

    let site = std::env::var("SITE_URL").ok().or(config.site);
    match &site {
        Some(site) => info!("Serving feeds for {}", site),
        None => warn!("No site URL configured, feed requests will fail"),
    }

    let content = Arc::new(ContentStore::new(config.content_dir));
    info!("Reading articles from {}", content.root().display());

    // Create app state
    let state = Arc::new(AppState {
        content,
        site,
        feed: config.feed,
    });

    let app = routes::router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("Server starting on http://{}", config.bind);

    axum::serve(listener, app).await?;

    Ok(())
}
