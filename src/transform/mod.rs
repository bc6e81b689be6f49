pub mod reformat;
pub mod remote;

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::chat::resolver::ImageReference;

/// Formats the reformat engine can encode to. `Jpg` and `Jpeg` are distinct
/// tokens with identical encoding so the produced filename echoes whichever
/// the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Png,
    Jpg,
    Jpeg,
    Webp,
    Gif,
}

impl TargetFormat {
    /// Formats offered by the conversational format prompt.
    pub const PROMPT_CHOICES: [Self; 4] = [Self::Png, Self::Jpg, Self::Webp, Self::Gif];

    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" => Some(Self::Jpg),
            "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::Webp),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
            Self::Gif => "gif",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpg | Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    pub fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpg | Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Webp => image::ImageFormat::WebP,
            Self::Gif => image::ImageFormat::Gif,
        }
    }

    /// JPEG has no alpha channel; those targets get flattened onto white.
    pub fn flattens_alpha(self) -> bool {
        matches!(self, Self::Jpg | Self::Jpeg)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformResult {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorStage {
    RemoteService,
    FetchProxy,
    LocalDecode,
    LocalEncode,
}

impl ErrorStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RemoteService => "remote-service",
            Self::FetchProxy => "fetch-proxy",
            Self::LocalDecode => "local-decode",
            Self::LocalEncode => "local-encode",
        }
    }
}

/// Terminal failure of a single transform attempt. `Display` is the
/// user-facing message; nothing here is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("{message}")]
    RemoteService { status: u16, message: String },
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    Configuration(String),
    #[error("{message}")]
    FetchProxy {
        status: Option<u16>,
        message: String,
    },
    #[error("{0}")]
    Decode(String),
    #[error("{0}")]
    Encode(String),
}

impl TransformError {
    pub fn fetch_proxy(message: impl Into<String>) -> Self {
        Self::FetchProxy {
            status: None,
            message: message.into(),
        }
    }

    pub fn stage(&self) -> ErrorStage {
        match self {
            Self::RemoteService { .. } | Self::Transport(_) | Self::Configuration(_) => {
                ErrorStage::RemoteService
            }
            Self::FetchProxy { .. } => ErrorStage::FetchProxy,
            Self::Decode(_) => ErrorStage::LocalDecode,
            Self::Encode(_) => ErrorStage::LocalEncode,
        }
    }
}

pub trait BackgroundRemover: Send + Sync {
    fn remove_background(&self, reference: &ImageReference)
        -> Result<TransformResult, TransformError>;
}

pub type SharedBackgroundRemover = Arc<dyn BackgroundRemover>;

pub trait ImageReformatter: Send + Sync {
    fn reformat(
        &self,
        reference: &ImageReference,
        format: TargetFormat,
    ) -> Result<TransformResult, TransformError>;
}

pub type SharedImageReformatter = Arc<dyn ImageReformatter>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

pub trait FetchProxy: Send + Sync {
    fn fetch(&self, url: &str) -> Result<FetchedImage, TransformError>;
}

pub type SharedFetchProxy = Arc<dyn FetchProxy>;
