//! Clip extraction pipeline.
//!
//! This crate provides:
//! - Engagement heatmap scraping from watch pages
//! - Segment selection (heatmap, AI, heuristic)
//! - Resilient download with a Cobalt fallback
//! - Caption generation with transcript context
//! - Pipeline orchestration with progress and cleanup

pub mod cobalt;
pub mod config;
pub mod error;
pub mod gemini;
pub mod heatmap;
pub mod pipeline;
pub mod progress;
pub mod selector;
pub mod transcript;

pub use cobalt::CobaltClient;
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use gemini::{CaptionBundle, GeminiClient};
pub use heatmap::{HeatmapClient, HeatmapError};
pub use pipeline::{ClipPipeline, ClipResult, PipelineStage, RequestScratch};
pub use progress::{NullSink, ProgressSink, RecordingSink, StdoutSink};
pub use selector::{ClipAdvisor, SegmentSelector};
