//! FFprobe clip inspection.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::process::Command;

use crate::command::{check_ffprobe, wait_with_limits};
use crate::error::{MediaError, MediaResult};

/// Facts about a finished clip file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipProbe {
    /// Duration in seconds
    pub duration_sec: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// File size in bytes
    pub size_bytes: u64,
}

/// FFprobe JSON output shape.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
}

/// Probe a clip file.
pub async fn probe_clip(path: impl AsRef<Path>) -> MediaResult<ClipProbe> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }
    check_ffprobe()?;

    let mut command = Command::new("ffprobe");
    command
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path);

    let output = wait_with_limits(command, "ffprobe", None, None).await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MediaError::tool_failed(
            "ffprobe",
            stderr.lines().last().unwrap_or("probe failed").to_string(),
            output.status.code(),
        ));
    }

    parse_probe_output(&output.stdout)
}

/// Get clip duration in seconds.
pub async fn clip_duration(path: impl AsRef<Path>) -> MediaResult<f64> {
    Ok(probe_clip(path).await?.duration_sec)
}

fn parse_probe_output(raw: &[u8]) -> MediaResult<ClipProbe> {
    let probe: FfprobeOutput = serde_json::from_slice(raw)?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::InvalidVideo("no video stream found".to_string()))?;

    // ffprobe reports numbers as strings in the format section
    let duration_sec = probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);
    let size_bytes = probe
        .format
        .size
        .as_deref()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    Ok(ClipProbe {
        duration_sec,
        width: video_stream.width.unwrap_or(0),
        height: video_stream.height.unwrap_or(0),
        size_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_output() {
        let raw = br#"{
            "streams": [
                {"codec_type": "audio"},
                {"codec_type": "video", "width": 1080, "height": 1920}
            ],
            "format": {"duration": "34.567", "size": "1048576"}
        }"#;
        let probe = parse_probe_output(raw).unwrap();
        assert!((probe.duration_sec - 34.567).abs() < 0.001);
        assert_eq!(probe.width, 1080);
        assert_eq!(probe.height, 1920);
        assert_eq!(probe.size_bytes, 1_048_576);
    }

    #[test]
    fn test_parse_probe_output_without_video_stream() {
        let raw = br#"{"streams": [{"codec_type": "audio"}], "format": {}}"#;
        assert!(matches!(
            parse_probe_output(raw),
            Err(MediaError::InvalidVideo(_))
        ));
    }

    #[test]
    fn test_parse_probe_output_tolerates_missing_numbers() {
        let raw = br#"{"streams": [{"codec_type": "video"}], "format": {"duration": "N/A"}}"#;
        let probe = parse_probe_output(raw).unwrap();
        assert_eq!(probe.duration_sec, 0.0);
        assert_eq!(probe.size_bytes, 0);
    }
}
