//! Gemini API client for AI video analysis and caption writing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use aclip_models::{parse_timestamp, SegmentSuggestion};

use crate::error::{PipelineError, PipelineResult};
use crate::selector::ClipAdvisor;

/// Models tried in order; rate limits and transient errors fall through to
/// the next entry instead of sleeping on one model.
const GEMINI_MODELS: [&str; 3] = [
    "gemini-2.5-flash",
    "gemini-2.5-flash-lite",
    "gemini-2.5-pro",
];

const DEFAULT_HASHTAGS: &str = "#viral #fyp #trending #shorts";

/// Gemini API client.
pub struct GeminiClient {
    api_key: String,
    client: reqwest::Client,
    min_clip_secs: f64,
    max_clip_secs: f64,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "fileData", skip_serializing_if = "Option::is_none")]
    file_data: Option<FileData>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            file_data: None,
        }
    }

    fn video(uri: impl Into<String>) -> Self {
        Self {
            text: None,
            file_data: Some(FileData {
                file_uri: uri.into(),
                mime_type: "video/mp4".to_string(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct FileData {
    #[serde(rename = "fileUri")]
    file_uri: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f64,
    #[serde(rename = "topP")]
    top_p: f64,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: String,
}

/// Caption and hashtags for a finished clip.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionBundle {
    pub caption: String,
    pub hashtags: String,
}

impl CaptionBundle {
    /// What the pipeline publishes when caption generation is unavailable.
    pub fn fallback(title: &str) -> Self {
        Self {
            caption: title.to_string(),
            hashtags: DEFAULT_HASHTAGS.to_string(),
        }
    }
}

impl GeminiClient {
    /// Create a new Gemini client.
    pub fn new() -> PipelineResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| PipelineError::config_error("GEMINI_API_KEY not set"))?;

        Ok(Self {
            api_key,
            client: reqwest::Client::new(),
            min_clip_secs: 15.0,
            max_clip_secs: 60.0,
        })
    }

    pub fn with_clip_bounds(mut self, min_clip_secs: f64, max_clip_secs: f64) -> Self {
        self.min_clip_secs = min_clip_secs;
        self.max_clip_secs = max_clip_secs;
        self
    }

    /// Ask Gemini to watch a video and pick the best clip window.
    pub async fn watch_and_suggest(
        &self,
        video_url: &str,
        title: &str,
        video_duration_sec: f64,
        max_clip_secs: f64,
    ) -> PipelineResult<SegmentSuggestion> {
        let prompt = build_segment_prompt(
            title,
            video_duration_sec,
            self.min_clip_secs,
            max_clip_secs,
        );

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part::video(video_url), Part::text(prompt)],
            }],
            generation_config: GenerationConfig {
                temperature: 0.7,
                top_p: 0.9,
            },
        };

        info!("Asking Gemini to analyze the video");
        let text = self.generate("video analysis", &request).await?;

        Ok(parse_segment_response(
            &text,
            video_duration_sec,
            self.min_clip_secs,
            max_clip_secs,
        ))
    }

    /// Write a caption and hashtags for the clipped moment.
    pub async fn generate_caption(
        &self,
        title: &str,
        channel: &str,
        reason: &str,
        transcript_excerpt: Option<&str>,
    ) -> PipelineResult<CaptionBundle> {
        let prompt = build_caption_prompt(title, channel, reason, transcript_excerpt);

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part::text(prompt)],
            }],
            // Captions want variety more than precision.
            generation_config: GenerationConfig {
                temperature: 0.9,
                top_p: 0.95,
            },
        };

        let text = self.generate("caption", &request).await?;
        Ok(parse_caption_response(&text, title))
    }

    /// Call the API, walking the model fallback list until one answers.
    async fn generate(&self, what: &str, request: &GeminiRequest) -> PipelineResult<String> {
        let mut last_error = None;

        for model in GEMINI_MODELS {
            match self.call_api(model, request).await {
                Ok(text) => {
                    info!("Got {} from {}", what, model);
                    return Ok(text);
                }
                Err(e) => {
                    warn!("Failed {} with model {}: {}", what, model, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| PipelineError::ai_failed("All Gemini models failed")))
    }

    async fn call_api(&self, model: &str, request: &GeminiRequest) -> PipelineResult<String> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| PipelineError::ai_failed(format!("Gemini API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::ai_failed(format!(
                "Gemini API returned {}: {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            PipelineError::ai_failed(format!("Failed to parse Gemini response: {}", e))
        })?;

        let text = gemini_response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .ok_or_else(|| PipelineError::ai_failed("No content in Gemini response"))?;

        Ok(strip_code_fences(text).to_string())
    }
}

#[async_trait]
impl ClipAdvisor for GeminiClient {
    async fn suggest_segment(
        &self,
        url: &str,
        title: &str,
        video_duration_sec: f64,
        max_clip_secs: f64,
    ) -> Option<SegmentSuggestion> {
        match self
            .watch_and_suggest(url, title, video_duration_sec, max_clip_secs)
            .await
        {
            Ok(suggestion) => Some(suggestion),
            Err(e) => {
                warn!("AI video analysis failed: {}", e);
                None
            }
        }
    }
}

fn build_segment_prompt(
    title: &str,
    video_duration_sec: f64,
    min_clip_secs: f64,
    max_clip_secs: f64,
) -> String {
    format!(
        "You are a video analyst hunting for the most VIRAL moment to turn into a short clip.\n\
         \n\
         VIDEO: {} ({:.0} seconds total)\n\
         \n\
         Watch the video and find the MOST interesting moment. Look for:\n\
         - Funny or surprising moments\n\
         - Emotional peaks (excitement, tension, a reveal)\n\
         - The highlight or climax\n\
         - Memorable quotes\n\
         - Fast action\n\
         \n\
         IMPORTANT: clip duration must be DYNAMIC ({:.0}-{:.0} seconds) depending on the content:\n\
         - Short moments (a joke, a reaction) want the low end\n\
         - Moments that need context sit in the middle\n\
         - Long moments (a story, an epic play) can run to the high end\n\
         \n\
         Respond in EXACTLY this format:\n\
         START_SECOND: [start time in seconds]\n\
         DURATION: [duration in seconds, {:.0}-{:.0}]\n\
         REASON: [one short sentence on why this moment works]\n\
         \n\
         Important: the start time must be between 0 and {:.0} seconds.",
        title,
        video_duration_sec,
        min_clip_secs,
        max_clip_secs,
        min_clip_secs,
        max_clip_secs,
        video_duration_sec - max_clip_secs,
    )
}

fn build_caption_prompt(
    title: &str,
    channel: &str,
    reason: &str,
    transcript_excerpt: Option<&str>,
) -> String {
    let mut prompt = format!(
        "You are a creative social media caption writer.\n\
         \n\
         VIDEO DATA:\n\
         - Title: {}\n\
         - Channel: {}\n\
         - Clipped moment: {}\n",
        title, channel, reason
    );

    if let Some(excerpt) = transcript_excerpt {
        prompt.push_str(&format!("- What is said in the clip: {}\n", excerpt));
    }

    prompt.push_str(
        "\n\
         Write a caption that:\n\
         1. Is catchy and sparks curiosity (1-2 sentences)\n\
         2. Uses casual language that lands with a young audience\n\
         3. Makes people want to watch and share\n\
         \n\
         Also generate 5-7 relevant hashtags.\n\
         \n\
         Format response:\n\
         CAPTION: [your caption]\n\
         HASHTAGS: #hashtag1 #hashtag2 #hashtag3 #hashtag4 #hashtag5",
    );

    prompt
}

/// Parse a segment suggestion from model output.
///
/// Every field is optional: unparseable or missing lines keep their
/// defaults, so this function always returns a usable suggestion. The
/// duration is clamped into the clip bounds and the start pulled into the
/// video.
pub fn parse_segment_response(
    text: &str,
    video_duration_sec: f64,
    min_clip_secs: f64,
    max_clip_secs: f64,
) -> SegmentSuggestion {
    let mut suggestion = SegmentSuggestion {
        start_sec: 0.0,
        duration_sec: 60.0,
        reason: "Best moment".to_string(),
    };

    for line in text.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("START_SECOND:") {
            if let Ok(secs) = parse_timestamp(rest.trim()) {
                suggestion.start_sec = secs;
            }
        } else if let Some(rest) = line.strip_prefix("DURATION:") {
            // Tolerate trailing words like "40 seconds".
            if let Some(secs) = rest.split_whitespace().next().and_then(|t| t.parse().ok()) {
                suggestion.duration_sec = secs;
            }
        } else if let Some(rest) = line.strip_prefix("REASON:") {
            let reason = rest.trim();
            if !reason.is_empty() {
                suggestion.reason = reason.to_string();
            }
        }
    }

    suggestion.duration_sec = suggestion.duration_sec.clamp(min_clip_secs, max_clip_secs);

    if suggestion.start_sec < 0.0 {
        suggestion.start_sec = 0.0;
    }
    if suggestion.start_sec + suggestion.duration_sec > video_duration_sec {
        suggestion.start_sec = (video_duration_sec - suggestion.duration_sec).max(0.0);
    }

    suggestion
}

/// Parse caption output; either field falls back rather than failing.
pub fn parse_caption_response(text: &str, title: &str) -> CaptionBundle {
    let mut caption = String::new();
    let mut hashtags = String::new();

    for line in text.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("CAPTION:") {
            caption = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("HASHTAGS:") {
            hashtags = rest.trim().to_string();
        }
    }

    if caption.is_empty() {
        caption = title.to_string();
    }
    if hashtags.is_empty() {
        hashtags = DEFAULT_HASHTAGS.to_string();
    }

    CaptionBundle { caption, hashtags }
}

fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let text = text.strip_prefix("```json").unwrap_or(text);
    let text = text.strip_prefix("```").unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}
