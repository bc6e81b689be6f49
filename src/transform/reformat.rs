use std::io::Cursor;
use std::sync::Arc;

use image::{imageops, DynamicImage, Rgba, RgbaImage};
use reqwest::blocking::Client;
use tracing::debug;

use crate::chat::resolver::{ImageReference, ImageSource};
use crate::transform::{
    FetchProxy, FetchedImage, ImageReformatter, SharedFetchProxy, TargetFormat, TransformError,
    TransformResult,
};

/// Fetches remote image bytes on behalf of the reformat engine and the
/// `/api/proxy` surface.
pub struct HttpFetchProxy;

impl FetchProxy for HttpFetchProxy {
    fn fetch(&self, url: &str) -> Result<FetchedImage, TransformError> {
        let client = Client::builder()
            .build()
            .map_err(|e| TransformError::fetch_proxy(format!("http client init failed: {e}")))?;
        let response = client
            .get(url)
            .send()
            .map_err(|e| TransformError::fetch_proxy(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransformError::FetchProxy {
                status: Some(status.as_u16()),
                message: format!("Failed to fetch image ({})", status.as_u16()),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(String::from);
        let bytes = response
            .bytes()
            .map_err(|e| TransformError::fetch_proxy(e.to_string()))?;
        Ok(FetchedImage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

/// Re-encodes an image into the requested target format entirely in-process.
/// Upload sources never touch the network; URL sources are fetched once.
pub struct LocalReformatter {
    fetcher: SharedFetchProxy,
}

impl LocalReformatter {
    pub fn new(fetcher: SharedFetchProxy) -> Self {
        Self { fetcher }
    }

    pub fn with_http_proxy() -> Self {
        Self::new(Arc::new(HttpFetchProxy))
    }
}

impl ImageReformatter for LocalReformatter {
    fn reformat(
        &self,
        reference: &ImageReference,
        format: TargetFormat,
    ) -> Result<TransformResult, TransformError> {
        let source_bytes = match &reference.source {
            ImageSource::Upload { bytes, .. } => bytes.clone(),
            ImageSource::RemoteUrl { url } => self.fetcher.fetch(url.as_str())?.bytes,
        };

        let decoded = image::load_from_memory(source_bytes.as_slice())
            .map_err(|e| TransformError::Decode(format!("could not decode image: {e}")))?;
        debug!(
            stem = %reference.display_stem,
            target = format.token(),
            "reformatting image"
        );

        let bytes = encode_to_format(&decoded, format)?;
        Ok(TransformResult {
            bytes,
            mime_type: String::from(format.mime_type()),
            file_name: format!("{}_converted.{}", reference.display_stem, format.token()),
        })
    }
}

fn encode_to_format(decoded: &DynamicImage, format: TargetFormat) -> Result<Vec<u8>, TransformError> {
    let source = decoded.to_rgba8();
    let (width, height) = source.dimensions();

    // A surface at the image's natural size; JPEG targets start opaque white
    // because the format carries no alpha channel.
    let mut surface = if format.flattens_alpha() {
        RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]))
    } else {
        RgbaImage::new(width, height)
    };
    imageops::overlay(&mut surface, &source, 0, 0);

    let output = if format.flattens_alpha() {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(surface).to_rgb8())
    } else {
        DynamicImage::ImageRgba8(surface)
    };

    let mut encoded = Cursor::new(Vec::new());
    output
        .write_to(&mut encoded, format.image_format())
        .map_err(|e| TransformError::Encode(format!("could not encode {}: {e}", format.token())))?;
    Ok(encoded.into_inner())
}
