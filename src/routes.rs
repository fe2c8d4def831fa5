use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::config::FeedConfig;
use crate::content::ContentStore;
use crate::feed::generate_feed;

const RSS_CONTENT_TYPE: &str = "application/xml";
const ATOM_CONTENT_TYPE: &str = "application/atom+xml";

pub struct AppState {
    pub content: Arc<ContentStore>,
    pub site: Option<String>,
    pub feed: FeedConfig,
}

// Wrapper for XML responses
struct Xml(&'static str, String);

impl IntoResponse for Xml {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, self.0)], self.1).into_response()
    }
}

// Custom error type
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("Feed request failed: {:#}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error: {}", self.0),
        )
            .into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/rss.xml", get(rss))
        .route("/atom.xml", get(atom))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Route handlers
pub async fn rss(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let feed = generate_feed(&state.content, state.site.as_deref(), &state.feed).await?;
    Ok(Xml(RSS_CONTENT_TYPE, feed.rss2()?))
}

pub async fn atom(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let feed = generate_feed(&state.content, state.site.as_deref(), &state.feed).await?;
    Ok(Xml(ATOM_CONTENT_TYPE, feed.atom1()?))
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}
