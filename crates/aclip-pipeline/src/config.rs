//! Pipeline configuration.

use std::path::PathBuf;

use aclip_models::parse_proxy_list;

/// Pipeline configuration.
///
/// Every tunable has a compiled default and an environment override; bad
/// values fall back to the default rather than aborting startup.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum clip length in seconds
    pub max_clip_secs: f64,
    /// Minimum clip length in seconds
    pub min_clip_secs: f64,
    /// Extra slack over max_clip_secs under which the whole video is kept
    pub full_video_slack_secs: f64,
    /// Minimum normalized intensity for a heatmap marker to be kept
    pub heatmap_min_intensity: f64,
    /// Markers kept when none pass the intensity threshold
    pub heatmap_keep_top: usize,
    /// Padding added around the best heatmap marker
    pub heatmap_pad_secs: f64,
    /// Trailing buffer appended after the planned duration
    pub trailing_buffer_secs: f64,
    /// Longest video the AI advisor is asked to watch
    pub max_ai_video_duration_secs: f64,
    /// Heuristic fallback clip length
    pub fallback_clip_secs: f64,
    /// Heuristic start position as a fraction of the video
    pub fallback_start_percent: f64,
    /// Videos longer than this start the heuristic clip past the intro
    pub long_video_threshold_secs: f64,
    /// Work directory for per-request scratch space
    pub work_dir: PathBuf,
    /// Directory finished clips are moved into
    pub output_dir: PathBuf,
    /// Netscape cookies file for credentialed download strategies
    pub cookies_file: Option<PathBuf>,
    /// Proxy URLs for fallback download strategies
    pub proxies: Vec<String>,
    /// Cobalt API endpoint for the post-exhaustion fallback
    pub cobalt_api_url: Option<String>,
    /// Per-attempt deadline for subprocess strategies; None disables it
    pub attempt_timeout_secs: Option<u64>,
    /// Subtitle languages requested for the caption transcript
    pub subtitle_langs: String,
    /// Watch page base URL, overridable so tests can point at a local server
    pub watch_page_base: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_clip_secs: 60.0,
            min_clip_secs: 15.0,
            full_video_slack_secs: 10.0,
            heatmap_min_intensity: 0.15,
            heatmap_keep_top: 5,
            heatmap_pad_secs: 5.0,
            trailing_buffer_secs: 5.0,
            max_ai_video_duration_secs: 1200.0,
            fallback_clip_secs: 45.0,
            fallback_start_percent: 0.2,
            long_video_threshold_secs: 300.0,
            work_dir: PathBuf::from("/tmp/aclip"),
            output_dir: PathBuf::from("clips"),
            cookies_file: None,
            proxies: Vec::new(),
            cobalt_api_url: None,
            attempt_timeout_secs: Some(600),
            subtitle_langs: "en,en-US".to_string(),
            watch_page_base: "https://www.youtube.com/watch?v=".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_clip_secs: env_parse("ACLIP_MAX_CLIP_SECS", defaults.max_clip_secs),
            min_clip_secs: env_parse("ACLIP_MIN_CLIP_SECS", defaults.min_clip_secs),
            full_video_slack_secs: env_parse(
                "ACLIP_FULL_VIDEO_SLACK_SECS",
                defaults.full_video_slack_secs,
            ),
            heatmap_min_intensity: env_parse(
                "ACLIP_HEATMAP_MIN_INTENSITY",
                defaults.heatmap_min_intensity,
            ),
            heatmap_keep_top: env_parse("ACLIP_HEATMAP_KEEP_TOP", defaults.heatmap_keep_top),
            heatmap_pad_secs: env_parse("ACLIP_HEATMAP_PAD_SECS", defaults.heatmap_pad_secs),
            trailing_buffer_secs: env_parse(
                "ACLIP_TRAILING_BUFFER_SECS",
                defaults.trailing_buffer_secs,
            ),
            max_ai_video_duration_secs: env_parse(
                "ACLIP_MAX_AI_VIDEO_SECS",
                defaults.max_ai_video_duration_secs,
            ),
            fallback_clip_secs: env_parse("ACLIP_FALLBACK_CLIP_SECS", defaults.fallback_clip_secs),
            fallback_start_percent: env_parse(
                "ACLIP_FALLBACK_START_PERCENT",
                defaults.fallback_start_percent,
            ),
            long_video_threshold_secs: env_parse(
                "ACLIP_LONG_VIDEO_THRESHOLD_SECS",
                defaults.long_video_threshold_secs,
            ),
            work_dir: std::env::var("ACLIP_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            output_dir: std::env::var("ACLIP_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            cookies_file: std::env::var("COOKIES_FILE").ok().map(PathBuf::from),
            proxies: std::env::var("PROXY_LIST")
                .map(|raw| parse_proxy_list(&raw))
                .unwrap_or_default(),
            cobalt_api_url: std::env::var("COBALT_API_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            attempt_timeout_secs: match env_parse::<u64>(
                "ACLIP_ATTEMPT_TIMEOUT_SECS",
                defaults.attempt_timeout_secs.unwrap_or(600),
            ) {
                0 => None,
                secs => Some(secs),
            },
            subtitle_langs: std::env::var("ACLIP_SUBTITLE_LANGS")
                .unwrap_or(defaults.subtitle_langs),
            watch_page_base: std::env::var("ACLIP_WATCH_PAGE_BASE")
                .unwrap_or(defaults.watch_page_base),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_clip_secs, 60.0);
        assert_eq!(config.min_clip_secs, 15.0);
        assert_eq!(config.heatmap_min_intensity, 0.15);
        assert_eq!(config.heatmap_keep_top, 5);
        assert_eq!(config.attempt_timeout_secs, Some(600));
        assert!(config.cookies_file.is_none());
        assert!(config.proxies.is_empty());
    }

    #[test]
    fn test_env_parse_rejects_garbage() {
        std::env::set_var("ACLIP_TEST_GARBAGE", "not-a-number");
        assert_eq!(env_parse("ACLIP_TEST_GARBAGE", 42u64), 42);
        std::env::remove_var("ACLIP_TEST_GARBAGE");
    }
}
