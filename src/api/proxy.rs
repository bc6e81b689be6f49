use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::api::error::{error_response, internal_error, transform_error_response};
use crate::api::server::AppState;
use crate::chat::resolver;

const DEFAULT_PROXY_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyQuery {
    pub url: Option<String>,
}

/// Same-origin fetch of a remote image so renderers can read its pixels.
pub async fn proxy_handler(
    State(state): State<AppState>,
    Query(query): Query<ProxyQuery>,
) -> Response {
    let Some(url) = query
        .url
        .map(|value| value.trim().to_string())
        .filter(|value| resolver::is_http_url(value))
    else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid URL.").into_response();
    };

    let fetcher = state.fetcher.clone();
    let outcome = tokio::task::spawn_blocking(move || fetcher.fetch(url.as_str())).await;

    match outcome {
        Ok(Ok(fetched)) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                fetched
                    .content_type
                    .unwrap_or_else(|| String::from(DEFAULT_PROXY_CONTENT_TYPE)),
            )],
            fetched.bytes,
        )
            .into_response(),
        Ok(Err(error)) => transform_error_response(&error).into_response(),
        Err(join_error) => {
            internal_error(format!("proxy fetch task failed: {join_error}")).into_response()
        }
    }
}
