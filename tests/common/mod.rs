use std::sync::{Arc, Mutex};

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use cutbot_backend_core::chat::pacing::NoPacing;
use cutbot_backend_core::chat::resolver::ImageReference;
use cutbot_backend_core::api::server::build_router_with_collaborators;
use cutbot_backend_core::transform::{
    BackgroundRemover, FetchProxy, FetchedImage, ImageReformatter, TargetFormat, TransformError,
    TransformResult,
};

pub const TEST_BOUNDARY: &str = "cutbot-test-boundary";

#[derive(Default)]
pub struct FakeRemover {
    pub next: Mutex<Option<Result<TransformResult, TransformError>>>,
    pub seen: Mutex<Vec<ImageReference>>,
}

impl FakeRemover {
    pub fn with_next(result: Result<TransformResult, TransformError>) -> Self {
        Self {
            next: Mutex::new(Some(result)),
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl BackgroundRemover for FakeRemover {
    fn remove_background(
        &self,
        reference: &ImageReference,
    ) -> Result<TransformResult, TransformError> {
        self.seen
            .lock()
            .expect("fake remover mutex poisoned")
            .push(reference.clone());
        self.next
            .lock()
            .expect("fake remover mutex poisoned")
            .take()
            .unwrap_or_else(|| {
                Ok(TransformResult {
                    bytes: vec![0],
                    mime_type: String::from("image/png"),
                    file_name: String::from("image_nobg.png"),
                })
            })
    }
}

#[derive(Default)]
pub struct FakeReformatter {
    pub next: Mutex<Option<Result<TransformResult, TransformError>>>,
    pub seen: Mutex<Vec<(ImageReference, TargetFormat)>>,
}

impl FakeReformatter {
    pub fn with_next(result: Result<TransformResult, TransformError>) -> Self {
        Self {
            next: Mutex::new(Some(result)),
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl ImageReformatter for FakeReformatter {
    fn reformat(
        &self,
        reference: &ImageReference,
        format: TargetFormat,
    ) -> Result<TransformResult, TransformError> {
        self.seen
            .lock()
            .expect("fake reformatter mutex poisoned")
            .push((reference.clone(), format));
        self.next
            .lock()
            .expect("fake reformatter mutex poisoned")
            .take()
            .unwrap_or_else(|| {
                Ok(TransformResult {
                    bytes: vec![0],
                    mime_type: String::from("image/png"),
                    file_name: String::from("image_converted.png"),
                })
            })
    }
}

#[derive(Default)]
pub struct FakeFetcher {
    pub next: Mutex<Option<Result<FetchedImage, TransformError>>>,
    pub seen: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn with_next(result: Result<FetchedImage, TransformError>) -> Self {
        Self {
            next: Mutex::new(Some(result)),
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl FetchProxy for FakeFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedImage, TransformError> {
        self.seen
            .lock()
            .expect("fake fetcher mutex poisoned")
            .push(url.to_string());
        self.next
            .lock()
            .expect("fake fetcher mutex poisoned")
            .take()
            .unwrap_or_else(|| {
                Ok(FetchedImage {
                    bytes: vec![0],
                    content_type: None,
                })
            })
    }
}

pub struct TestApp {
    pub router: Router,
    pub remover: Arc<FakeRemover>,
    pub reformatter: Arc<FakeReformatter>,
    pub fetcher: Arc<FakeFetcher>,
}

pub fn test_app() -> TestApp {
    test_app_with(
        Arc::new(FakeRemover::default()),
        Arc::new(FakeReformatter::default()),
        Arc::new(FakeFetcher::default()),
    )
}

pub fn test_app_with(
    remover: Arc<FakeRemover>,
    reformatter: Arc<FakeReformatter>,
    fetcher: Arc<FakeFetcher>,
) -> TestApp {
    let router = build_router_with_collaborators(
        remover.clone(),
        fetcher.clone(),
        reformatter.clone(),
        Arc::new(NoPacing),
    );
    TestApp {
        router,
        remover,
        reformatter,
        fetcher,
    }
}

pub async fn send_json(
    app: Router,
    method: Method,
    uri: &str,
    body: Body,
    expected_status: StatusCode,
) -> Value {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .expect("request should build");

    let response = app
        .oneshot(request)
        .await
        .expect("router should return response");
    assert_eq!(response.status(), expected_status);

    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(body.as_ref()).expect("response should be valid JSON")
}

/// Builds a multipart body: file parts carry a filename and content type,
/// text parts do not.
pub fn multipart_body(parts: &[MultipartPart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{TEST_BOUNDARY}\r\n").as_bytes());
        match part {
            MultipartPart::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            MultipartPart::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{TEST_BOUNDARY}--\r\n").as_bytes());
    body
}

pub enum MultipartPart<'a> {
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={TEST_BOUNDARY}")
}
