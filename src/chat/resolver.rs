use thiserror::Error;
use url::Url;

/// Display name used when no usable stem can be derived.
pub const FALLBACK_STEM: &str = "image";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Upload { bytes: Vec<u8>, file_name: String },
    RemoteUrl { url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub source: ImageSource,
    pub display_stem: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error(
        "That doesn't look like a valid URL. Try pasting a direct image URL, or upload a file instead."
    )]
    NotAUrl,
}

pub fn resolve_upload(file_name: &str, bytes: Vec<u8>) -> ImageReference {
    ImageReference {
        display_stem: non_empty_stem(strip_extension(file_name.trim())),
        source: ImageSource::Upload {
            bytes,
            file_name: file_name.to_string(),
        },
    }
}

pub fn resolve_url(input: &str) -> Result<ImageReference, ResolveError> {
    let trimmed = input.trim();
    if !is_http_url(trimmed) {
        return Err(ResolveError::NotAUrl);
    }
    Ok(ImageReference {
        display_stem: stem_from_url(trimmed),
        source: ImageSource::RemoteUrl {
            url: trimmed.to_string(),
        },
    })
}

pub fn is_http_url(input: &str) -> bool {
    let lower = input.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn stem_from_url(raw: &str) -> String {
    let Ok(parsed) = Url::parse(raw) else {
        return String::from(FALLBACK_STEM);
    };
    let last_segment = parsed
        .path_segments()
        .and_then(|segments| segments.last())
        .unwrap_or("");
    non_empty_stem(strip_extension(last_segment))
}

/// Removes the final dot-delimited extension; names without one are left as-is.
fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(index) if index + 1 < name.len() => &name[..index],
        _ => name,
    }
}

fn non_empty_stem(stem: &str) -> String {
    if stem.is_empty() {
        String::from(FALLBACK_STEM)
    } else {
        String::from(stem)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn upload_stem_drops_extension_regardless_of_case() {
        let reference = resolve_upload("photo.PNG", vec![1, 2, 3]);
        assert_eq!(reference.display_stem, "photo");
        assert_eq!(
            reference.source,
            ImageSource::Upload {
                bytes: vec![1, 2, 3],
                file_name: String::from("photo.PNG"),
            }
        );
    }

    #[test]
    fn upload_stem_without_dot_is_unchanged() {
        assert_eq!(resolve_upload("photo", Vec::new()).display_stem, "photo");
    }

    #[test]
    fn upload_stem_keeps_earlier_dots() {
        assert_eq!(
            resolve_upload("archive.tar.gz", Vec::new()).display_stem,
            "archive.tar"
        );
    }

    #[test]
    fn upload_stem_never_comes_out_empty() {
        assert_eq!(resolve_upload("", Vec::new()).display_stem, FALLBACK_STEM);
        assert_eq!(
            resolve_upload(".png", Vec::new()).display_stem,
            FALLBACK_STEM
        );
    }

    #[test]
    fn url_stem_uses_last_path_segment_without_query() {
        let reference =
            resolve_url("https://example.com/a/b/cat.jpg?x=1").expect("url should resolve");
        assert_eq!(reference.display_stem, "cat");
        assert_eq!(
            reference.source,
            ImageSource::RemoteUrl {
                url: String::from("https://example.com/a/b/cat.jpg?x=1"),
            }
        );
    }

    #[test]
    fn url_without_path_falls_back_to_generic_stem() {
        let reference = resolve_url("https://example.com").expect("url should resolve");
        assert_eq!(reference.display_stem, FALLBACK_STEM);
    }

    #[test]
    fn url_scheme_check_is_case_insensitive_and_trims() {
        assert!(is_http_url("  HTTPS://example.com/dog.png  "));
        assert!(is_http_url("HtTp://example.com"));
        assert!(!is_http_url("ftp://example.com/dog.png"));
        assert!(!is_http_url("example.com/dog.png"));
    }

    #[test]
    fn non_url_input_is_rejected_with_a_user_message() {
        let error = resolve_url("not a url").expect_err("plain text should be rejected");
        assert_eq!(error, ResolveError::NotAUrl);
        assert!(error.to_string().contains("valid URL"));
    }

    #[test]
    fn unparsable_but_http_prefixed_input_still_resolves_with_fallback_stem() {
        let reference = resolve_url("http://[half-open").expect("prefix match should be accepted");
        assert_eq!(reference.display_stem, FALLBACK_STEM);
    }

    #[test]
    fn url_trimming_applies_to_the_stored_payload() {
        let reference = resolve_url("  https://example.com/cat.png ").expect("should resolve");
        assert_eq!(
            reference.source,
            ImageSource::RemoteUrl {
                url: String::from("https://example.com/cat.png"),
            }
        );
    }
}
