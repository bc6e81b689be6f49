use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::api::error::{error_response, internal_error, transform_error_response};
use crate::api::server::AppState;
use crate::chat::resolver::{self, ImageReference};

/// Multipart passthrough to the background-removal collaborator: an `image`
/// file field or an `imageUrl` text field, PNG bytes back.
pub async fn remove_bg_handler(State(state): State<AppState>, request: Request) -> Response {
    let reference = match read_image_reference(request).await {
        Ok(reference) => reference,
        Err(response) => return response,
    };

    let remover = state.remover.clone();
    let outcome = tokio::task::spawn_blocking(move || remover.remove_background(&reference)).await;

    match outcome {
        Ok(Ok(result)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, result.mime_type)],
            result.bytes,
        )
            .into_response(),
        Ok(Err(error)) => transform_error_response(&error).into_response(),
        Err(join_error) => {
            internal_error(format!("background removal task failed: {join_error}")).into_response()
        }
    }
}

async fn read_image_reference(request: Request) -> Result<ImageReference, Response> {
    let Ok(mut multipart) = Multipart::from_request(request, &()).await else {
        return Err(no_input_response());
    };

    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut image_url: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(error) => {
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Malformed upload: {error}"),
                )
                .into_response());
            }
        };

        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") => {
                let file_name = field.file_name().unwrap_or("upload.png").to_string();
                let bytes = match field.bytes().await {
                    Ok(bytes) => bytes.to_vec(),
                    Err(error) => {
                        return Err(error_response(
                            StatusCode::BAD_REQUEST,
                            format!("Malformed upload: {error}"),
                        )
                        .into_response());
                    }
                };
                upload = Some((file_name, bytes));
            }
            Some("imageUrl") => match field.text().await {
                Ok(url) => image_url = Some(url),
                Err(error) => {
                    return Err(error_response(
                        StatusCode::BAD_REQUEST,
                        format!("Malformed upload: {error}"),
                    )
                    .into_response());
                }
            },
            other => {
                debug!(field = other.unwrap_or("<unnamed>"), "ignoring extra field");
            }
        }
    }

    // The file field wins when both are supplied, matching the collaborator
    // contract of exactly one source per request.
    if let Some((file_name, bytes)) = upload {
        return Ok(resolver::resolve_upload(file_name.as_str(), bytes));
    }
    if let Some(url) = image_url {
        return resolver::resolve_url(url.as_str()).map_err(|error| {
            error_response(StatusCode::BAD_REQUEST, error.to_string()).into_response()
        });
    }
    Err(no_input_response())
}

fn no_input_response() -> Response {
    error_response(StatusCode::BAD_REQUEST, "No image or URL provided.").into_response()
}
