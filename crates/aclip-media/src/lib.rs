#![deny(unreachable_patterns)]
//! yt-dlp and FFmpeg subprocess layer for the AutoClip pipeline.
//!
//! This crate provides:
//! - Strategy-cascade retrieval of metadata and video segments via yt-dlp
//! - Type-safe FFmpeg command building with timeout and cancellation
//! - Delivery-clip transcoding and ffprobe inspection
//! - Cross-device-safe moves of finished clips

pub mod command;
pub mod error;
pub mod fs_utils;
pub mod probe;
pub mod transcode;
pub mod ytdlp;

pub use command::{check_ffmpeg, check_ffprobe, check_ytdlp, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use fs_utils::move_file;
pub use probe::{clip_duration, probe_clip, ClipProbe};
pub use transcode::transcode_clip;
pub use ytdlp::{run_strategy_cascade, Retriever, SegmentRequest};
