use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::chat::pacing::{ConversationalPacing, SharedPacing};
use crate::chat::session::ChatSession;
use crate::transform::reformat::{HttpFetchProxy, LocalReformatter};
use crate::transform::remote::HttpBackgroundRemover;
use crate::transform::{
    SharedBackgroundRemover, SharedFetchProxy, SharedImageReformatter,
};

/// Matches the upload limit of the original web tier.
pub const UPLOAD_BODY_LIMIT_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub service_name: &'static str,
    pub service_version: &'static str,
    pub started_unix_ms: u128,
    pub remover: SharedBackgroundRemover,
    pub fetcher: SharedFetchProxy,
    pub session: Arc<Mutex<ChatSession>>,
}

pub fn build_router() -> Router {
    let fetcher: SharedFetchProxy = Arc::new(HttpFetchProxy);
    let remover: SharedBackgroundRemover = Arc::new(HttpBackgroundRemover::from_env());
    let reformatter: SharedImageReformatter = Arc::new(LocalReformatter::new(fetcher.clone()));
    let pacing: SharedPacing = Arc::new(ConversationalPacing);
    build_router_with_collaborators(remover, fetcher, reformatter, pacing)
}

pub fn build_router_with_collaborators(
    remover: SharedBackgroundRemover,
    fetcher: SharedFetchProxy,
    reformatter: SharedImageReformatter,
    pacing: SharedPacing,
) -> Router {
    let session = Arc::new(Mutex::new(ChatSession::new(
        remover.clone(),
        reformatter,
        pacing,
    )));
    let state = AppState {
        service_name: "cutbot-backend-core",
        service_version: env!("CARGO_PKG_VERSION"),
        started_unix_ms: now_unix_ms(),
        remover,
        fetcher,
        session,
    };

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/remove-bg", post(crate::api::remove_bg::remove_bg_handler))
        .route("/api/proxy", get(crate::api::proxy::proxy_handler))
        .route("/api/session", get(crate::api::session::get_session_handler))
        .route(
            "/api/session/image",
            post(crate::api::session::submit_image_handler),
        )
        .route(
            "/api/session/action",
            post(crate::api::session::choose_action_handler),
        )
        .route(
            "/api/session/format",
            post(crate::api::session::choose_format_handler),
        )
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let app = build_router();
    info!(bind = %addr, "starting cutbot-backend-core HTTP surface");
    axum::serve(listener, app).await
}

async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "ok": true,
            "status": "ok",
            "service": state.service_name,
            "version": state.service_version,
            "started_unix_ms": state.started_unix_ms,
        })),
    )
}

fn now_unix_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_millis())
}
