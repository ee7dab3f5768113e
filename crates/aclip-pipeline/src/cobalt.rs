//! Cobalt API fallback downloader.
//!
//! When every yt-dlp strategy is exhausted, a configured Cobalt instance
//! can still resolve a direct stream URL. The clip segment is then cut
//! straight out of that stream with ffmpeg over HTTP rather than
//! downloading the whole video.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info};

use aclip_media::{FfmpegCommand, FfmpegRunner, MediaError};

use crate::error::{PipelineError, PipelineResult};

/// Client for a Cobalt download API instance.
pub struct CobaltClient {
    api_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct DownloadRequest<'a> {
    url: &'a str,
    #[serde(rename = "videoQuality")]
    video_quality: &'a str,
    #[serde(rename = "downloadMode")]
    download_mode: &'a str,
}

#[derive(Debug, Deserialize)]
struct DownloadResponse {
    status: String,
    url: Option<String>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
}

impl CobaltClient {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Cut `[start_sec, end_sec]` of the video into `output_path` via a
    /// Cobalt-resolved stream.
    pub async fn download_segment(
        &self,
        video_url: &str,
        output_path: &Path,
        start_sec: f64,
        end_sec: f64,
        timeout_secs: Option<u64>,
        cancel_rx: Option<watch::Receiver<bool>>,
    ) -> PipelineResult<()> {
        let stream_url = self.resolve_stream_url(video_url).await?;
        info!(start_sec, end_sec, "resolved cobalt stream, cutting segment with ffmpeg");

        let mut runner = FfmpegRunner::new();
        if let Some(rx) = cancel_rx {
            runner = runner.with_cancel(rx);
        }
        if let Some(secs) = timeout_secs {
            runner = runner.with_timeout(secs);
        }

        let copy = build_copy_command(&stream_url, output_path, start_sec, end_sec);
        match runner.run(&copy).await {
            Ok(()) => {}
            Err(MediaError::Cancelled) => return Err(MediaError::Cancelled.into()),
            Err(copy_err) => {
                // HTTP seeking often lands off a keyframe and breaks stream
                // copy; a re-encode accepts any seek point.
                debug!("stream copy failed ({}), retrying with re-encode", copy_err);
                let reencode = build_reencode_command(&stream_url, output_path, start_sec, end_sec);
                runner.run(&reencode).await?;
            }
        }

        verify_output(output_path)
    }

    /// Ask the API for a direct stream URL.
    async fn resolve_stream_url(&self, video_url: &str) -> PipelineResult<String> {
        let request = DownloadRequest {
            url: video_url,
            video_quality: "1080",
            download_mode: "auto",
        };

        let response = self
            .http
            .post(&self.api_url)
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::fallback_failed(format!("cobalt request failed: {}", e)))?;

        let body: DownloadResponse = response.json().await.map_err(|e| {
            PipelineError::fallback_failed(format!("cobalt response unreadable: {}", e))
        })?;

        stream_url_from_response(body)
    }
}

fn stream_url_from_response(response: DownloadResponse) -> PipelineResult<String> {
    if response.status == "error" {
        let code = response
            .error
            .map(|e| e.code)
            .unwrap_or_else(|| "unknown".to_string());
        return Err(PipelineError::fallback_failed(format!(
            "cobalt error: {}",
            code
        )));
    }

    match response.status.as_str() {
        "tunnel" | "redirect" => response
            .url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| PipelineError::fallback_failed("cobalt returned no download URL")),
        other => Err(PipelineError::fallback_failed(format!(
            "unsupported cobalt status: {}",
            other
        ))),
    }
}

fn build_copy_command(
    stream_url: &str,
    output: &Path,
    start_sec: f64,
    end_sec: f64,
) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new(stream_url, output).seek(start_sec);
    if end_sec > start_sec {
        cmd = cmd.duration(end_sec - start_sec);
    }
    cmd.output_args(["-c", "copy", "-movflags", "+faststart"])
}

fn build_reencode_command(
    stream_url: &str,
    output: &Path,
    start_sec: f64,
    end_sec: f64,
) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new(stream_url, output).seek(start_sec);
    if end_sec > start_sec {
        cmd = cmd.duration(end_sec - start_sec);
    }
    cmd.video_codec("libx264")
        .preset("fast")
        .crf(23)
        .audio_codec("aac")
        .audio_bitrate("128k")
        .output_args(["-movflags", "+faststart"])
}

fn verify_output(path: &Path) -> PipelineResult<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => Ok(()),
        _ => Err(PipelineError::fallback_failed(
            "cobalt output missing or empty",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_stream_url_from_tunnel_response() {
        let response = DownloadResponse {
            status: "tunnel".to_string(),
            url: Some("https://cobalt.example/stream/abc".to_string()),
            error: None,
        };
        assert_eq!(
            stream_url_from_response(response).unwrap(),
            "https://cobalt.example/stream/abc"
        );
    }

    #[test]
    fn test_stream_url_from_error_response() {
        let response = DownloadResponse {
            status: "error".to_string(),
            url: None,
            error: Some(ApiError {
                code: "error.api.youtube.login".to_string(),
            }),
        };
        let err = stream_url_from_response(response).unwrap_err();
        assert!(err.to_string().contains("error.api.youtube.login"));
    }

    #[test]
    fn test_stream_url_rejects_other_statuses() {
        let response = DownloadResponse {
            status: "picker".to_string(),
            url: Some("https://cobalt.example/a".to_string()),
            error: None,
        };
        assert!(stream_url_from_response(response).is_err());
    }

    #[test]
    fn test_stream_url_requires_url() {
        let response = DownloadResponse {
            status: "tunnel".to_string(),
            url: Some(String::new()),
            error: None,
        };
        assert!(stream_url_from_response(response).is_err());
    }

    #[test]
    fn test_copy_command_args() {
        let cmd = build_copy_command(
            "https://cobalt.example/stream",
            Path::new("/tmp/out.mp4"),
            115.0,
            150.0,
        );
        let args = cmd.build_args();

        let ss = args.iter().position(|a| a == "-ss").unwrap();
        assert_eq!(args[ss + 1], "115.000");
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "35.000");
        assert!(args.windows(2).any(|w| w[0] == "-c" && w[1] == "copy"));
        assert!(args.contains(&"+faststart".to_string()));
    }

    #[test]
    fn test_reencode_command_args() {
        let cmd = build_reencode_command(
            "https://cobalt.example/stream",
            Path::new("/tmp/out.mp4"),
            0.0,
            45.0,
        );
        let args = cmd.build_args();

        assert!(args.windows(2).any(|w| w[0] == "-c:v" && w[1] == "libx264"));
        assert!(args.windows(2).any(|w| w[0] == "-crf" && w[1] == "23"));
        assert!(args.windows(2).any(|w| w[0] == "-b:a" && w[1] == "128k"));
    }

    #[tokio::test]
    async fn test_resolve_stream_url_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "tunnel",
                "url": "https://cobalt.example/stream/xyz",
                "filename": "clip.mp4"
            })))
            .mount(&server)
            .await;

        let client = CobaltClient::new(server.uri());
        let url = client
            .resolve_stream_url("https://youtu.be/dQw4w9WgXcQ")
            .await
            .unwrap();
        assert_eq!(url, "https://cobalt.example/stream/xyz");
    }

    #[tokio::test]
    async fn test_resolve_stream_url_surfaces_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "error",
                "error": { "code": "error.api.rate_exceeded" }
            })))
            .mount(&server)
            .await;

        let client = CobaltClient::new(server.uri());
        let err = client
            .resolve_stream_url("https://youtu.be/dQw4w9WgXcQ")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rate_exceeded"));
    }
}
