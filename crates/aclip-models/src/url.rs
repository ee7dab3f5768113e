//! Source URL validation and video ID extraction.

use thiserror::Error;
use url::Url;

/// Errors from source URL validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("URL is not a YouTube URL")]
    NotYoutube,
    #[error("no video ID found in URL")]
    MissingVideoId,
    #[error("video ID has invalid format: {0:?}")]
    MalformedVideoId(String),
}

pub type UrlResult<T> = Result<T, UrlError>;

/// Fragments that introduce a video ID, tried in order.
const ID_PREFIXES: [&str; 6] = ["?v=", "&v=", "youtu.be/", "/shorts/", "/embed/", "/v/"];

/// Check whether a URL points at a YouTube property.
///
/// The host is checked after parsing, so a YouTube domain appearing in a
/// query string or path of some other site does not count.
pub fn is_youtube_url(url: &str) -> bool {
    parse_lenient(url).is_some_and(|u| host_is_youtube(&u))
}

/// Parse a URL, tolerating the scheme-less form pasted from address bars.
fn parse_lenient(url: &str) -> Option<Url> {
    let url = url.trim();
    match Url::parse(url) {
        Ok(u) => Some(u),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("https://{}", url)).ok()
        }
        Err(_) => None,
    }
}

fn host_is_youtube(url: &Url) -> bool {
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    host == "youtu.be" || host == "youtube.com" || host.ends_with(".youtube.com")
}

/// Extract the 11-character video ID from any recognized YouTube URL shape.
///
/// Handles `watch?v=`, `youtu.be/`, `/shorts/`, `/embed/`, and `/v/` URLs,
/// with or without extra query parameters or fragments.
pub fn extract_video_id(url: &str) -> UrlResult<String> {
    let url = url.trim();
    if !is_youtube_url(url) {
        return Err(UrlError::NotYoutube);
    }

    for prefix in ID_PREFIXES {
        if let Some(pos) = url.find(prefix) {
            let tail = &url[pos + prefix.len()..];
            let id = tail.split(['&', '#', '?', '/']).next().unwrap_or("").trim();
            return validate_video_id(id);
        }
    }

    Err(UrlError::MissingVideoId)
}

/// Video IDs are exactly 11 characters of alphanumerics, `-`, and `_`.
fn validate_video_id(id: &str) -> UrlResult<String> {
    let valid_chars = id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if id.len() == 11 && valid_chars {
        Ok(id.to_string())
    } else {
        Err(UrlError::MalformedVideoId(id.to_string()))
    }
}
