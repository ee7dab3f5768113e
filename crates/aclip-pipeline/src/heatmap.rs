//! "Most replayed" heatmap scraping.
//!
//! YouTube embeds engagement heatmaps in the watch page source as a JSON
//! array of `heatMarkerRenderer` objects. The array is located by scanning
//! for the `"markers":` key fragment and bracket-matching from there; the
//! surrounding document is too large and too unstable to parse whole.

use std::borrow::Cow;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use aclip_models::{rank_markers, ClientIdentity, EngagementMarker, MarkerFilter};

const MARKERS_KEY: &str = "\"markers\":";
const MARKERS_KEY_ESCAPED: &str = "\\\"markers\\\":";

/// Heatmap failures are soft: the selection cascade continues without
/// engagement data.
#[derive(Debug, Error)]
pub enum HeatmapError {
    #[error("No heatmap found in watch page")]
    NotAvailable,

    #[error("Heatmap data found but not parseable")]
    Malformed,

    #[error("Watch page request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Scrapes engagement heatmaps from public watch pages.
pub struct HeatmapClient {
    http: reqwest::Client,
    watch_base: String,
}

impl HeatmapClient {
    /// Create a client.
    ///
    /// `watch_base` is the prefix the video ID is appended to; tests point
    /// it at a local server.
    pub fn new(watch_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            watch_base: watch_base.into(),
        }
    }

    /// Fetch the heatmap for a video and rank it with `filter`.
    ///
    /// Returns markers sorted by intensity descending.
    pub async fn fetch(
        &self,
        video_id: &str,
        filter: &MarkerFilter,
    ) -> Result<Vec<EngagementMarker>, HeatmapError> {
        let url = format!("{}{}", self.watch_base, video_id);

        let body = self
            .http
            .get(&url)
            .header("User-Agent", ClientIdentity::Web.user_agent())
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let markers = extract_markers(&body)?;
        debug!(video_id = %video_id, count = markers.len(), "extracted heatmap markers");

        Ok(rank_markers(markers, filter))
    }
}

/// Locate and parse the first marker array in the page source.
fn extract_markers(page: &str) -> Result<Vec<EngagementMarker>, HeatmapError> {
    let mut saw_key = false;

    for (key, escaped) in [(MARKERS_KEY, false), (MARKERS_KEY_ESCAPED, true)] {
        let mut from = 0;
        while let Some(pos) = page[from..].find(key) {
            saw_key = true;
            let key_end = from + pos + key.len();
            from = key_end;

            // Inside script strings the JSON carries one extra level of
            // escaping; undo it so quote tracking sees real string bounds.
            let tail: Cow<'_, str> = if escaped {
                Cow::Owned(unescape_embedded(&page[key_end..]))
            } else {
                Cow::Borrowed(&page[key_end..])
            };

            let Some(array) = balanced_array(&tail) else {
                continue;
            };

            let markers = parse_marker_array(array);
            if !markers.is_empty() {
                return Ok(markers);
            }
        }
    }

    if saw_key {
        Err(HeatmapError::Malformed)
    } else {
        Err(HeatmapError::NotAvailable)
    }
}

/// Return the bracket-balanced `[...]` slice at the start of `text`
/// (ignoring leading whitespace), or `None` if no complete array is there.
///
/// Depth counting skips over JSON string literals, including escaped
/// quotes, so brackets inside marker titles cannot truncate the array.
fn balanced_array(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if i >= bytes.len() || bytes[i] != b'[' {
        return None;
    }

    let start = i;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
        } else {
            match b {
                b'"' => in_string = true,
                b'[' => depth += 1,
                b']' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&text[start..=i]);
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }

    None
}

/// Undo one level of string escaping (`\"` and `\\`); other escape pairs
/// pass through untouched.
fn unescape_embedded(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

#[derive(Debug, Deserialize)]
struct RawHeatmapEntry {
    #[serde(rename = "heatMarkerRenderer")]
    renderer: Option<RawHeatMarker>,
}

#[derive(Debug, Deserialize)]
struct RawHeatMarker {
    #[serde(alias = "timeRangeStartMillis", alias = "startMillis")]
    time_range_start_millis: u64,
    #[serde(alias = "markerDurationMillis", alias = "durationMillis")]
    marker_duration_millis: u64,
    #[serde(
        alias = "heatMarkerIntensityScoreNormalized",
        alias = "intensityScoreNormalized"
    )]
    intensity_score_normalized: f64,
}

/// Parse an extracted array, keeping only `heatMarkerRenderer` elements.
/// Arrays that fail to deserialize yield an empty list so the scan can
/// move on to the next occurrence.
fn parse_marker_array(json: &str) -> Vec<EngagementMarker> {
    let entries: Vec<RawHeatmapEntry> = match serde_json::from_str(json) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    entries
        .into_iter()
        .filter_map(|entry| entry.renderer)
        .map(|raw| EngagementMarker {
            start_offset_ms: raw.time_range_start_millis,
            duration_ms: raw.marker_duration_millis,
            intensity: raw.intensity_score_normalized,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PLAIN_PAGE: &str = r#"var ytInitialData = {"frameworkUpdates":{"markers":[
        {"heatMarkerRenderer":{"timeRangeStartMillis":0,"markerDurationMillis":10000,"heatMarkerIntensityScoreNormalized":0.3}},
        {"heatMarkerRenderer":{"timeRangeStartMillis":120000,"markerDurationMillis":20000,"heatMarkerIntensityScoreNormalized":0.9}},
        {"heatMarkerRenderer":{"timeRangeStartMillis":60000,"markerDurationMillis":10000,"heatMarkerIntensityScoreNormalized":0.05}}
    ]}};"#;

    #[test]
    fn test_balanced_array_nested() {
        let text = r#"[[1, 2], [3, [4]]] trailing"#;
        assert_eq!(balanced_array(text), Some("[[1, 2], [3, [4]]]"));
    }

    #[test]
    fn test_balanced_array_ignores_brackets_in_strings() {
        let text = r#"[{"title": "best ] part ["}, 2]"#;
        assert_eq!(balanced_array(text), Some(text));
    }

    #[test]
    fn test_balanced_array_handles_escaped_quotes() {
        let text = r#"[{"title": "say \"]\" aloud"}]"#;
        assert_eq!(balanced_array(text), Some(text));
    }

    #[test]
    fn test_balanced_array_rejects_unterminated() {
        assert_eq!(balanced_array("[1, 2"), None);
        assert_eq!(balanced_array("not an array"), None);
        assert_eq!(balanced_array("   "), None);
    }

    #[test]
    fn test_extract_markers_plain() {
        let markers = extract_markers(PLAIN_PAGE).unwrap();
        assert_eq!(markers.len(), 3);
        assert_eq!(markers[1].start_offset_ms, 120000);
        assert_eq!(markers[1].intensity, 0.9);
    }

    #[test]
    fn test_extract_markers_escaped_variant() {
        let page = r#"window.data = "{\"markers\":[{\"heatMarkerRenderer\":{\"timeRangeStartMillis\":5000,\"markerDurationMillis\":1000,\"heatMarkerIntensityScoreNormalized\":0.7}}]}";"#;
        let markers = extract_markers(page).unwrap();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].start_offset_ms, 5000);
        assert_eq!(markers[0].intensity, 0.7);
    }

    #[test]
    fn test_extract_markers_short_field_names() {
        let page = r#"{"markers":[{"heatMarkerRenderer":{"startMillis":1000,"durationMillis":2000,"intensityScoreNormalized":0.5}}]}"#;
        let markers = extract_markers(page).unwrap();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].duration_ms, 2000);
    }

    #[test]
    fn test_extract_markers_skips_non_renderer_arrays() {
        // The first markers array holds chapter data; the real heatmap
        // comes later in the page.
        let page = r#"{"markers":[{"chapterRenderer":{"title":"Intro"}}],
            "more":{"markers":[{"heatMarkerRenderer":{"timeRangeStartMillis":9000,"markerDurationMillis":1000,"heatMarkerIntensityScoreNormalized":0.8}}]}}"#;
        let markers = extract_markers(page).unwrap();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].start_offset_ms, 9000);
    }

    #[test]
    fn test_extract_markers_absent() {
        assert!(matches!(
            extract_markers("<html>no heatmap here</html>"),
            Err(HeatmapError::NotAvailable)
        ));
    }

    #[test]
    fn test_extract_markers_malformed() {
        assert!(matches!(
            extract_markers(r#"{"markers":[{"heatMarkerRenderer":"#),
            Err(HeatmapError::Malformed)
        ));
    }

    #[tokio::test]
    async fn test_fetch_filters_and_sorts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/watch"))
            .and(query_param("v", "dQw4w9WgXcQ"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PLAIN_PAGE))
            .mount(&server)
            .await;

        let client = HeatmapClient::new(format!("{}/watch?v=", server.uri()));
        let markers = client
            .fetch("dQw4w9WgXcQ", &MarkerFilter::default())
            .await
            .unwrap();

        // 0.05 falls below the intensity floor; the rest sort descending.
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].intensity, 0.9);
        assert_eq!(markers[1].intensity, 0.3);
    }

    #[tokio::test]
    async fn test_fetch_error_status_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = HeatmapClient::new(format!("{}/watch?v=", server.uri()));
        let result = client.fetch("dQw4w9WgXcQ", &MarkerFilter::default()).await;
        assert!(matches!(result, Err(HeatmapError::Http(_))));
    }
}
