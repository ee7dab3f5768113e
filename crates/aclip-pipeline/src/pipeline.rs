//! Pipeline orchestration.
//!
//! One `run` call takes a video URL through metadata fetch, segment
//! selection, retrieval, transcode, and captioning, emitting one progress
//! message per stage. Scratch files never outlive the request; the
//! finished clip in the output directory belongs to the caller.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rand::Rng;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use aclip_media::{
    check_ffmpeg, check_ffprobe, check_ytdlp, clip_duration, move_file, transcode_clip,
    MediaError, Retriever, SegmentRequest,
};
use aclip_models::{
    build_strategy_table, extract_video_id, format_duration, platform_label, ClipPlan,
    MarkerFilter, VideoMetadata,
};

use crate::cobalt::CobaltClient;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::gemini::{CaptionBundle, GeminiClient};
use crate::heatmap::HeatmapClient;
use crate::progress::ProgressSink;
use crate::selector::SegmentSelector;
use crate::transcript;

/// Stages of a clip request, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    FetchingMetadata,
    SelectingSegment,
    Retrieving,
    Transcoding,
    Captioning,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::FetchingMetadata => "fetching_metadata",
            PipelineStage::SelectingSegment => "selecting_segment",
            PipelineStage::Retrieving => "retrieving",
            PipelineStage::Transcoding => "transcoding",
            PipelineStage::Captioning => "captioning",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }

    /// Progress message shown to the requester.
    pub fn message(&self) -> &'static str {
        match self {
            PipelineStage::FetchingMetadata => "Fetching video info...",
            PipelineStage::SelectingSegment => "Finding the best moment...",
            PipelineStage::Retrieving => "Downloading...",
            PipelineStage::Transcoding => "Processing clip...",
            PipelineStage::Captioning => "Generating caption...",
            PipelineStage::Done => "Done!",
            PipelineStage::Failed => "Processing failed",
        }
    }
}

/// Per-request scratch directory under the work dir.
///
/// The token is unique per request, so concurrent requests for the same
/// video never collide on temp files.
pub struct RequestScratch {
    token: String,
    dir: PathBuf,
    cleaned: bool,
}

impl RequestScratch {
    pub async fn create(work_dir: &Path, video_id: &str) -> PipelineResult<Self> {
        let token = format!(
            "{}_{}_{}",
            video_id,
            Utc::now().timestamp_millis(),
            rand::rng().random_range(0..1000)
        );
        let dir = work_dir.join(&token);
        tokio::fs::create_dir_all(&dir).await?;

        Ok(Self {
            token,
            dir,
            cleaned: false,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the downloaded raw segment lands.
    pub fn raw_path(&self) -> PathBuf {
        self.dir.join(format!("raw_{}.mp4", self.token))
    }

    /// Where the transcoded clip lands before moving to the output dir.
    pub fn clip_path(&self) -> PathBuf {
        self.dir.join(format!("clip_{}.mp4", self.token))
    }

    /// Remove the scratch directory and everything in it.
    pub async fn cleanup(mut self) {
        self.cleaned = true;
        if let Err(e) = tokio::fs::remove_dir_all(&self.dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(dir = %self.dir.display(), error = %e, "failed to clean scratch dir");
            }
        }
    }
}

impl Drop for RequestScratch {
    fn drop(&mut self) {
        // Backstop for early returns and cancellation unwinds.
        if !self.cleaned {
            std::fs::remove_dir_all(&self.dir).ok();
        }
    }
}

/// Everything the caller needs about a finished clip.
#[derive(Debug, Clone)]
pub struct ClipResult {
    pub video_path: PathBuf,
    pub title: String,
    pub channel: String,
    pub duration_label: String,
    pub platform: String,
    pub caption: String,
    pub hashtags: String,
    pub reason: String,
    pub source_url: String,
}

/// The clip pipeline: one instance serves many sequential requests.
pub struct ClipPipeline {
    config: PipelineConfig,
    retriever: Retriever,
    heatmap: HeatmapClient,
    gemini: GeminiClient,
    cobalt: Option<CobaltClient>,
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl ClipPipeline {
    /// Build a pipeline from configuration.
    ///
    /// External tools are verified up front so a missing binary fails here
    /// rather than halfway through a request.
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        check_ytdlp()?;
        check_ffmpeg()?;
        check_ffprobe()?;

        let strategies = build_strategy_table(config.cookies_file.is_some(), &config.proxies);
        info!(count = strategies.len(), "built retrieval strategy table");

        let retriever = Retriever::new(strategies)
            .with_cookies_file(config.cookies_file.clone())
            .with_attempt_timeout(config.attempt_timeout_secs);

        let heatmap = HeatmapClient::new(config.watch_page_base.clone());
        let gemini =
            GeminiClient::new()?.with_clip_bounds(config.min_clip_secs, config.max_clip_secs);
        let cobalt = config.cobalt_api_url.clone().map(CobaltClient::new);

        Ok(Self {
            config,
            retriever,
            heatmap,
            gemini,
            cobalt,
            cancel_rx: None,
        })
    }

    /// Wire a shutdown signal into every subprocess the pipeline spawns.
    pub fn with_shutdown(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.retriever = self.retriever.with_cancel(cancel_rx.clone());
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// Process one video URL into a finished clip.
    pub async fn run(&self, url: &str, progress: &dyn ProgressSink) -> PipelineResult<ClipResult> {
        let video_id =
            extract_video_id(url).map_err(|e| PipelineError::invalid_input(e.to_string()))?;

        let scratch = RequestScratch::create(&self.config.work_dir, &video_id).await?;
        info!(request = %scratch.token(), url = %url, "processing clip request");

        let result = self.run_stages(url, &video_id, &scratch, progress).await;

        match &result {
            Ok(_) => progress.notify(PipelineStage::Done.message()).await,
            Err(e) => {
                warn!(request = %scratch.token(), error = %e, "clip request failed");
                progress.notify(PipelineStage::Failed.message()).await;
            }
        }

        scratch.cleanup().await;
        result
    }

    async fn run_stages(
        &self,
        url: &str,
        video_id: &str,
        scratch: &RequestScratch,
        progress: &dyn ProgressSink,
    ) -> PipelineResult<ClipResult> {
        progress.notify(PipelineStage::FetchingMetadata.message()).await;
        let meta = self.retriever.fetch_metadata(url).await?;
        if meta.duration_sec <= 0.0 {
            return Err(PipelineError::unsupported(
                "video reports no duration, it may be a live stream",
            ));
        }
        info!(
            title = %meta.title,
            channel = %meta.channel,
            duration = %meta.duration_label(),
            "fetched metadata"
        );

        progress.notify(PipelineStage::SelectingSegment.message()).await;
        let markers = match self.heatmap.fetch(video_id, &self.marker_filter()).await {
            Ok(markers) => markers,
            Err(e) => {
                debug!("heatmap unavailable: {}", e);
                Vec::new()
            }
        };

        let selector = SegmentSelector::new(&self.config).with_advisor(&self.gemini);
        let plan = selector.select(&meta, url, &markers).await;
        info!(
            start = %format_duration(plan.start_sec),
            end = %format_duration(plan.end_sec),
            reason = %plan.reason,
            "clip window planned"
        );

        progress.notify(PipelineStage::Retrieving.message()).await;
        let raw_path = self.retrieve(url, &plan, scratch).await?;

        progress.notify(PipelineStage::Transcoding.message()).await;
        let max_duration_sec = plan.duration_sec().min(self.config.max_clip_secs);
        let staged_clip = scratch.clip_path();
        transcode_clip(
            &raw_path,
            &staged_clip,
            max_duration_sec,
            self.cancel_rx.clone(),
        )
        .await?;

        let final_path = self
            .config
            .output_dir
            .join(format!("clip_{}.mp4", scratch.token()));
        move_file(&staged_clip, &final_path).await?;

        progress.notify(PipelineStage::Captioning.message()).await;
        let caption = self.caption_for(url, &meta, &plan, scratch).await;

        let duration_label = match clip_duration(&final_path).await {
            Ok(secs) => format_duration(secs),
            Err(e) => {
                debug!("probe failed ({}), labeling with planned duration", e);
                format_duration(plan.duration_sec())
            }
        };

        info!(
            request = %scratch.token(),
            clip = %final_path.display(),
            duration = %duration_label,
            "clip ready"
        );

        Ok(ClipResult {
            video_path: final_path,
            title: meta.title.clone(),
            channel: meta.channel.clone(),
            duration_label,
            platform: platform_label(url).to_string(),
            caption: caption.caption,
            hashtags: caption.hashtags,
            reason: plan.reason.clone(),
            source_url: url.to_string(),
        })
    }

    /// Download the planned window, falling over to Cobalt when every
    /// yt-dlp strategy is exhausted.
    async fn retrieve(
        &self,
        url: &str,
        plan: &ClipPlan,
        scratch: &RequestScratch,
    ) -> PipelineResult<PathBuf> {
        let request = SegmentRequest {
            url: url.to_string(),
            start_sec: plan.start_sec,
            end_sec: plan.end_sec,
            output_path: scratch.raw_path(),
        };

        match self.retriever.download_segment(&request).await {
            Ok(path) => Ok(path),
            Err(exhausted @ MediaError::StrategiesExhausted { .. }) => {
                let Some(cobalt) = &self.cobalt else {
                    return Err(exhausted.into());
                };

                warn!("all download strategies exhausted, trying cobalt fallback");
                match cobalt
                    .download_segment(
                        url,
                        &request.output_path,
                        plan.start_sec,
                        plan.end_sec,
                        self.config.attempt_timeout_secs,
                        self.cancel_rx.clone(),
                    )
                    .await
                {
                    Ok(()) => Ok(request.output_path),
                    Err(e) if e.is_cancelled() => Err(e),
                    Err(e) => {
                        // The exhaustion error names every strategy tried
                        // and is the more useful failure to surface.
                        warn!("cobalt fallback failed: {}", e);
                        Err(exhausted.into())
                    }
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Produce the caption. Never fails the pipeline.
    async fn caption_for(
        &self,
        url: &str,
        meta: &VideoMetadata,
        plan: &ClipPlan,
        scratch: &RequestScratch,
    ) -> CaptionBundle {
        let excerpt = match transcript::fetch_transcript(
            url,
            scratch.dir(),
            &self.config.subtitle_langs,
            self.config.attempt_timeout_secs,
            self.cancel_rx.clone(),
        )
        .await
        {
            Ok(text) if !text.is_empty() => Some(transcript::excerpt(&text)),
            Ok(_) => None,
            Err(e) => {
                debug!("transcript unavailable: {}", e);
                None
            }
        };

        match self
            .gemini
            .generate_caption(&meta.title, &meta.channel, &plan.reason, excerpt.as_deref())
            .await
        {
            Ok(bundle) => bundle,
            Err(e) => {
                warn!("caption generation failed ({}), falling back to title", e);
                CaptionBundle::fallback(&meta.title)
            }
        }
    }

    fn marker_filter(&self) -> MarkerFilter {
        MarkerFilter {
            min_intensity: self.config.heatmap_min_intensity,
            keep_top: self.config.heatmap_keep_top,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_stage_messages_are_distinct() {
        let stages = [
            PipelineStage::FetchingMetadata,
            PipelineStage::SelectingSegment,
            PipelineStage::Retrieving,
            PipelineStage::Transcoding,
            PipelineStage::Captioning,
            PipelineStage::Done,
            PipelineStage::Failed,
        ];

        for window in stages.windows(2) {
            assert_ne!(window[0].message(), window[1].message());
            assert_ne!(window[0].as_str(), window[1].as_str());
        }
    }

    #[tokio::test]
    async fn test_scratch_token_embeds_video_id() {
        let work_dir = TempDir::new().unwrap();
        let scratch = RequestScratch::create(work_dir.path(), "dQw4w9WgXcQ")
            .await
            .unwrap();

        assert!(scratch.token().starts_with("dQw4w9WgXcQ_"));
        assert!(scratch.dir().is_dir());
        assert!(scratch
            .raw_path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("raw_dQw4w9WgXcQ_"));

        scratch.cleanup().await;
    }

    #[tokio::test]
    async fn test_scratch_cleanup_removes_directory() {
        let work_dir = TempDir::new().unwrap();
        let scratch = RequestScratch::create(work_dir.path(), "dQw4w9WgXcQ")
            .await
            .unwrap();

        let dir = scratch.dir().to_path_buf();
        tokio::fs::write(dir.join("partial.mp4"), b"data")
            .await
            .unwrap();

        scratch.cleanup().await;
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_scratch_drop_is_a_backstop() {
        let work_dir = TempDir::new().unwrap();
        let dir = {
            let scratch = RequestScratch::create(work_dir.path(), "dQw4w9WgXcQ")
                .await
                .unwrap();
            scratch.dir().to_path_buf()
        };

        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_scratch_tokens_differ_per_request() {
        let work_dir = TempDir::new().unwrap();
        let a = RequestScratch::create(work_dir.path(), "aaaaaaaaaaa")
            .await
            .unwrap();
        let b = RequestScratch::create(work_dir.path(), "bbbbbbbbbbb")
            .await
            .unwrap();

        assert_ne!(a.token(), b.token());

        a.cleanup().await;
        b.cleanup().await;
    }
}
