use reqwest::blocking::{multipart, Client};
use serde_json::Value;
use tracing::debug;

use crate::chat::resolver::{ImageReference, ImageSource};
use crate::config::RemoveBgSettings;
use crate::transform::{BackgroundRemover, TransformError, TransformResult};

/// Client for the background-removal service: multipart POST in, PNG bytes
/// out. One outbound call per invocation, no retry.
pub struct HttpBackgroundRemover {
    settings: RemoveBgSettings,
}

impl HttpBackgroundRemover {
    pub fn new(settings: RemoveBgSettings) -> Self {
        Self { settings }
    }

    pub fn from_env() -> Self {
        Self::new(RemoveBgSettings::from_env())
    }
}

impl BackgroundRemover for HttpBackgroundRemover {
    fn remove_background(
        &self,
        reference: &ImageReference,
    ) -> Result<TransformResult, TransformError> {
        let api_key = self.settings.api_key.clone().ok_or_else(|| {
            TransformError::Configuration(String::from("REMOVE_BG_API_KEY is not configured."))
        })?;

        let mut form = multipart::Form::new().text("size", String::from("auto"));
        form = match &reference.source {
            ImageSource::Upload { bytes, file_name } => {
                let file_name = if file_name.trim().is_empty() {
                    String::from("upload.png")
                } else {
                    file_name.clone()
                };
                let mime = mime_for_file_name(file_name.as_str());
                let part = multipart::Part::bytes(bytes.clone())
                    .file_name(file_name)
                    .mime_str(mime)
                    .map_err(|e| TransformError::Transport(format!("invalid mime '{mime}': {e}")))?;
                form.part("image_file", part)
            }
            ImageSource::RemoteUrl { url } => form.text("image_url", url.clone()),
        };

        let client = Client::builder()
            .build()
            .map_err(|e| TransformError::Transport(format!("http client init failed: {e}")))?;
        debug!(stem = %reference.display_stem, "requesting background removal");
        let response = client
            .post(self.settings.endpoint.as_str())
            .header("X-Api-Key", api_key)
            .multipart(form)
            .send()
            .map_err(|e| TransformError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(service_error(status.as_u16(), body.as_str()));
        }

        // The service is trusted to return valid PNG bytes on success.
        let bytes = response
            .bytes()
            .map_err(|e| TransformError::Transport(e.to_string()))?;
        Ok(TransformResult {
            bytes: bytes.to_vec(),
            mime_type: String::from("image/png"),
            file_name: format!("{}_nobg.png", reference.display_stem),
        })
    }
}

fn service_error(status: u16, body: &str) -> TransformError {
    let message = first_error_title(body)
        .unwrap_or_else(|| format!("Background removal failed (HTTP {status})"));
    TransformError::RemoteService { status, message }
}

fn first_error_title(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    parsed
        .get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
        .and_then(|entry| entry.get("title"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn mime_for_file_name(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit('.')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}
