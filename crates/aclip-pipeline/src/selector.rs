//! Segment selection cascade.
//!
//! Four strategies in priority order pick the clip window: a full-video
//! shortcut for sources barely longer than a clip, the replay heatmap's
//! best marker, an AI advisor that watches the video, and a position
//! heuristic that always succeeds. The winning candidate is clamped into
//! a valid window by `finalize_plan`.

use async_trait::async_trait;
use tracing::{debug, info};

use aclip_models::{
    format_duration, ClipPlan, EngagementMarker, SegmentCandidate, SegmentOrigin,
    SegmentSuggestion, VideoMetadata,
};

use crate::config::PipelineConfig;

/// Source of AI clip suggestions.
#[async_trait]
pub trait ClipAdvisor: Send + Sync {
    /// Watch the video and propose a window. `None` means the advisor has
    /// nothing usable and the cascade falls through.
    async fn suggest_segment(
        &self,
        url: &str,
        title: &str,
        video_duration_sec: f64,
        max_clip_secs: f64,
    ) -> Option<SegmentSuggestion>;
}

/// Picks the clip window for a video.
pub struct SegmentSelector<'a> {
    config: &'a PipelineConfig,
    advisor: Option<&'a dyn ClipAdvisor>,
}

impl<'a> SegmentSelector<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self {
            config,
            advisor: None,
        }
    }

    pub fn with_advisor(mut self, advisor: &'a dyn ClipAdvisor) -> Self {
        self.advisor = Some(advisor);
        self
    }

    /// Run the cascade and finalize the winning candidate.
    pub async fn select(
        &self,
        meta: &VideoMetadata,
        url: &str,
        markers: &[EngagementMarker],
    ) -> ClipPlan {
        let candidate = self.pick_candidate(meta, url, markers).await;
        info!(
            origin = candidate.origin.as_str(),
            start = %format_duration(candidate.start_sec),
            reason = %candidate.reason,
            "segment selected"
        );

        finalize_plan(&candidate, meta.duration_sec, self.config)
    }

    async fn pick_candidate(
        &self,
        meta: &VideoMetadata,
        url: &str,
        markers: &[EngagementMarker],
    ) -> SegmentCandidate {
        let duration = meta.duration_sec;

        if duration <= self.config.max_clip_secs + self.config.full_video_slack_secs {
            debug!("video fits in a single clip, keeping all of it");
            return SegmentCandidate {
                start_sec: 0.0,
                end_sec: duration,
                score: 0.0,
                origin: SegmentOrigin::Heuristic,
                reason: "Full video".to_string(),
            };
        }

        if let Some(candidate) = self.from_heatmap(markers) {
            return candidate;
        }

        if let Some(candidate) = self.from_advisor(meta, url).await {
            return candidate;
        }

        self.heuristic(duration)
    }

    fn from_heatmap(&self, markers: &[EngagementMarker]) -> Option<SegmentCandidate> {
        // Input order is not trusted; scan for the peak directly. Ties keep
        // the earliest marker.
        let best = markers.iter().reduce(|best, marker| {
            if marker.intensity.total_cmp(&best.intensity).is_gt() {
                marker
            } else {
                best
            }
        })?;

        let pad = self.config.heatmap_pad_secs;
        let start = (best.start_sec() - pad).max(0.0);
        let end = best.start_sec() + best.duration_sec().min(self.config.max_clip_secs) + pad;

        info!(
            start = %format_duration(best.start_sec()),
            intensity = best.intensity,
            "most replayed segment found"
        );

        Some(SegmentCandidate {
            start_sec: start,
            end_sec: end,
            score: best.intensity,
            origin: SegmentOrigin::Heatmap,
            reason: "High engagement segment".to_string(),
        })
    }

    async fn from_advisor(&self, meta: &VideoMetadata, url: &str) -> Option<SegmentCandidate> {
        let advisor = self.advisor?;

        // Long videos blow past the model context window; skip straight to
        // the heuristic instead of burning an API call.
        if meta.duration_sec > self.config.max_ai_video_duration_secs {
            debug!(
                minutes = meta.duration_sec / 60.0,
                "video too long for AI analysis, skipping"
            );
            return None;
        }

        let suggestion = advisor
            .suggest_segment(url, &meta.title, meta.duration_sec, self.config.max_clip_secs)
            .await?;

        info!(
            start = %format_duration(suggestion.start_sec),
            duration_sec = suggestion.duration_sec,
            reason = %suggestion.reason,
            "AI found best moment"
        );

        Some(SegmentCandidate {
            start_sec: suggestion.start_sec,
            end_sec: suggestion.start_sec + suggestion.duration_sec,
            score: 0.0,
            origin: SegmentOrigin::AiWatch,
            reason: suggestion.reason,
        })
    }

    fn heuristic(&self, video_duration_sec: f64) -> SegmentCandidate {
        let (start, reason) = if video_duration_sec > self.config.long_video_threshold_secs {
            // Long videos rarely peak in the intro; skip ahead.
            (
                video_duration_sec * self.config.fallback_start_percent,
                "Early highlight",
            )
        } else {
            (0.0, "Video intro")
        };

        SegmentCandidate {
            start_sec: start,
            end_sec: start + self.config.fallback_clip_secs,
            score: 0.0,
            origin: SegmentOrigin::Heuristic,
            reason: reason.to_string(),
        }
    }
}

/// Clamp a raw candidate into a valid plan.
///
/// Duration lands in the configured bounds but never exceeds the video;
/// a window overrunning the end pulls its start back instead; the trailing
/// buffer extends the end for context without breaking either the video
/// bound or the maximum clip length.
fn finalize_plan(
    candidate: &SegmentCandidate,
    video_duration_sec: f64,
    config: &PipelineConfig,
) -> ClipPlan {
    let duration = (candidate.end_sec - candidate.start_sec)
        .clamp(config.min_clip_secs, config.max_clip_secs)
        .min(video_duration_sec);

    let mut start = candidate.start_sec;
    if start + duration > video_duration_sec {
        start = video_duration_sec - duration;
    }
    if start < 0.0 {
        start = 0.0;
    }

    let end = (start + duration + config.trailing_buffer_secs)
        .min(video_duration_sec)
        .min(start + config.max_clip_secs);

    ClipPlan {
        start_sec: start,
        end_sec: end,
        reason: candidate.reason.clone(),
    }
}
