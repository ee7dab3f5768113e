//! Shared data models for the AutoClip pipeline.
//!
//! This crate provides the plain-data vocabulary used across the workspace:
//! - Engagement heatmap markers and their ranking rules
//! - Clip plans, segment candidates, and AI segment suggestions
//! - Retrieval strategies for the download cascade
//! - Video metadata as reported by yt-dlp
//! - Timestamp and source URL parsing helpers

pub mod marker;
pub mod plan;
pub mod strategy;
pub mod timestamp;
pub mod url;
pub mod video;

// Re-export common types
pub use marker::{rank_markers, EngagementMarker, MarkerFilter};
pub use plan::{ClipPlan, SegmentCandidate, SegmentOrigin, SegmentSuggestion};
pub use strategy::{build_strategy_table, parse_proxy_list, ClientIdentity, RetrievalStrategy};
pub use timestamp::{format_duration, format_seconds, parse_timestamp, TimestampError};
pub use url::{extract_video_id, is_youtube_url, UrlError, UrlResult};
pub use video::{platform_label, VideoMetadata};
