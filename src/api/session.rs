use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::{header, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::error::{error_response, internal_error, into_json, ApiObject};
use crate::api::server::AppState;
use crate::chat::events::{ActionChoice, PresentationEvent};
use crate::chat::session::{SessionCommand, SessionPhase};
use crate::transform::TargetFormat;

#[derive(Debug, Clone, Serialize)]
struct SessionStateResponse {
    ok: bool,
    phase: &'static str,
    pending_stem: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct SessionEventsResponse {
    ok: bool,
    phase: &'static str,
    count: usize,
    events: Vec<PresentationEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitUrlRequest {
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChooseActionRequest {
    pub action: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChooseFormatRequest {
    pub format: String,
}

pub async fn get_session_handler(State(state): State<AppState>) -> ApiObject<Value> {
    let Ok(session) = state.session.lock() else {
        return internal_error("session mutex poisoned");
    };
    (
        StatusCode::OK,
        into_json(SessionStateResponse {
            ok: true,
            phase: session.phase().as_str(),
            pending_stem: session.pending_stem().map(String::from),
        }),
    )
}

/// Accepts either a multipart `image` file or a JSON `{"imageUrl": ...}` body.
pub async fn submit_image_handler(
    State(state): State<AppState>,
    request: Request,
) -> ApiObject<Value> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"));

    let command = if is_multipart {
        match read_upload_command(request).await {
            Ok(command) => command,
            Err(response) => return response,
        }
    } else {
        match Json::<SubmitUrlRequest>::from_request(request, &()).await {
            Ok(Json(payload)) => SessionCommand::SubmitUrl {
                url: payload.image_url,
            },
            Err(_) => {
                return error_response(StatusCode::BAD_REQUEST, "No image or URL provided.");
            }
        }
    };

    dispatch(state, command).await
}

pub async fn choose_action_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChooseActionRequest>,
) -> ApiObject<Value> {
    let Some(choice) = ActionChoice::parse(payload.action.as_str()) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!(
                "Unknown action '{}'. Expected remove-background|convert-format.",
                payload.action
            ),
        );
    };
    dispatch(state, SessionCommand::ChooseAction(choice)).await
}

pub async fn choose_format_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChooseFormatRequest>,
) -> ApiObject<Value> {
    let Some(format) = TargetFormat::parse(payload.format.as_str()) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!(
                "Unsupported format '{}'. Expected png|jpg|jpeg|webp|gif.",
                payload.format
            ),
        );
    };
    dispatch(state, SessionCommand::ChooseFormat(format)).await
}

async fn read_upload_command(request: Request) -> Result<SessionCommand, ApiObject<Value>> {
    let Ok(mut multipart) = Multipart::from_request(request, &()).await else {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "No image or URL provided.",
        ));
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(error) => {
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Malformed upload: {error}"),
                ));
            }
        };
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload.png").to_string();
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(error) => {
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Malformed upload: {error}"),
                ));
            }
        };
        return Ok(SessionCommand::SubmitUpload { file_name, bytes });
    }

    Err(error_response(
        StatusCode::BAD_REQUEST,
        "No image or URL provided.",
    ))
}

/// Runs one command against the single session. The lock is held for the
/// whole validate → collaborator → settle sequence, so a command arriving
/// mid-processing waits and is then ignored by the phase check.
async fn dispatch(state: AppState, command: SessionCommand) -> ApiObject<Value> {
    let session = state.session.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let mut guard = session
            .lock()
            .map_err(|_| String::from("session mutex poisoned"))?;
        let events = guard.handle(command);
        Ok::<(Vec<PresentationEvent>, SessionPhase), String>((events, guard.phase()))
    })
    .await;

    match outcome {
        Ok(Ok((events, phase))) => (
            StatusCode::OK,
            into_json(SessionEventsResponse {
                ok: true,
                phase: phase.as_str(),
                count: events.len(),
                events,
            }),
        ),
        Ok(Err(detail)) => internal_error(detail),
        Err(join_error) => internal_error(format!("session command task failed: {join_error}")),
    }
}
