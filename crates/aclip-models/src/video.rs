//! Video metadata models.

use serde::{Deserialize, Serialize};

use crate::timestamp::format_duration;

/// Metadata for a source video, as reported by `yt-dlp --dump-json`.
///
/// Only the fields the pipeline consumes are kept; the dump carries hundreds
/// more that serde ignores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Platform video ID.
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Channel name. Dumps carry both `channel` and `uploader`; `channel`
    /// wins and `uploader` backfills when it is absent.
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub uploader: String,
    /// Duration in seconds; 0.0 when the platform reports none (live streams).
    #[serde(default, rename = "duration")]
    pub duration_sec: f64,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl VideoMetadata {
    /// Parse the JSON object printed by `yt-dlp --dump-json`.
    pub fn from_dump_json(raw: &[u8]) -> Result<Self, serde_json::Error> {
        let mut meta: Self = serde_json::from_slice(raw)?;
        if meta.channel.is_empty() {
            meta.channel = std::mem::take(&mut meta.uploader);
        }
        Ok(meta)
    }

    /// `M:SS` duration label for logs and result summaries.
    pub fn duration_label(&self) -> String {
        format_duration(self.duration_sec)
    }
}

/// Human-readable platform label for a source URL.
pub fn platform_label(url: &str) -> &'static str {
    if url.contains("/shorts/") {
        "YouTube Shorts"
    } else {
        "YouTube"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_dump_json_full() {
        let raw = br#"{
            "id": "dQw4w9WgXcQ",
            "title": "Some Video",
            "channel": "Some Channel",
            "duration": 212.0,
            "webpage_url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "thumbnail": "https://i.ytimg.com/vi/dQw4w9WgXcQ/hq720.jpg",
            "view_count": 1000000
        }"#;
        let meta = VideoMetadata::from_dump_json(raw).unwrap();
        assert_eq!(meta.id, "dQw4w9WgXcQ");
        assert_eq!(meta.title, "Some Video");
        assert_eq!(meta.channel, "Some Channel");
        assert_eq!(meta.duration_sec, 212.0);
        assert_eq!(meta.duration_label(), "3:32");
    }

    #[test]
    fn test_from_dump_json_uploader_backfill() {
        let raw = br#"{"id": "dQw4w9WgXcQ", "title": "t", "uploader": "Uploader Name", "duration": 10}"#;
        let meta = VideoMetadata::from_dump_json(raw).unwrap();
        assert_eq!(meta.channel, "Uploader Name");
    }

    #[test]
    fn test_from_dump_json_channel_wins_over_uploader() {
        let raw = br#"{"id": "dQw4w9WgXcQ", "channel": "Channel Name", "uploader": "Uploader Name", "duration": 10}"#;
        let meta = VideoMetadata::from_dump_json(raw).unwrap();
        assert_eq!(meta.channel, "Channel Name");
    }

    #[test]
    fn test_from_dump_json_missing_duration_defaults_to_zero() {
        let raw = br#"{"id": "dQw4w9WgXcQ", "title": "live stream"}"#;
        let meta = VideoMetadata::from_dump_json(raw).unwrap();
        assert_eq!(meta.duration_sec, 0.0);
    }

    #[test]
    fn test_from_dump_json_rejects_garbage() {
        assert!(VideoMetadata::from_dump_json(b"WARNING: not json").is_err());
    }

    #[test]
    fn test_platform_label() {
        assert_eq!(
            platform_label("https://youtube.com/shorts/dQw4w9WgXcQ"),
            "YouTube Shorts"
        );
        assert_eq!(
            platform_label("https://youtube.com/watch?v=dQw4w9WgXcQ"),
            "YouTube"
        );
    }
}
