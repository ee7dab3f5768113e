//! Delivery clip transcoding.

use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Constant rate factor tuned for short-form delivery.
const CLIP_CRF: u8 = 26;
const CLIP_PRESET: &str = "fast";
/// Peak bitrate cap and rate-control buffer.
const CLIP_MAXRATE: &str = "4M";
const CLIP_BUFSIZE: &str = "8M";
const CLIP_AUDIO_BITRATE: &str = "128k";

/// Re-encode a raw segment into the bitrate-capped H.264/AAC delivery clip.
///
/// The output duration is hard-capped with `-t` so an over-long raw segment
/// never produces an over-long clip.
pub async fn transcode_clip(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    max_duration_sec: f64,
    cancel_rx: Option<watch::Receiver<bool>>,
) -> MediaResult<PathBuf> {
    let input = input.as_ref();
    let output = output.as_ref();

    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }

    let cmd = build_transcode_command(input, output, max_duration_sec);

    let mut runner = FfmpegRunner::new();
    if let Some(rx) = cancel_rx {
        runner = runner.with_cancel(rx);
    }
    runner.run(&cmd).await?;

    if !output.exists() {
        return Err(MediaError::tool_failed(
            "ffmpeg",
            "transcode produced no output file",
            None,
        ));
    }

    info!(output = %output.display(), "transcoded delivery clip");
    Ok(output.to_path_buf())
}

fn build_transcode_command(input: &Path, output: &Path, max_duration_sec: f64) -> FfmpegCommand {
    FfmpegCommand::new(input, output)
        .video_codec("libx264")
        .crf(CLIP_CRF)
        .preset(CLIP_PRESET)
        .output_args(["-maxrate", CLIP_MAXRATE, "-bufsize", CLIP_BUFSIZE])
        .audio_codec("aac")
        .audio_bitrate(CLIP_AUDIO_BITRATE)
        .duration(max_duration_sec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcode_command_args() {
        let cmd = build_transcode_command(
            Path::new("raw_abc.mp4"),
            Path::new("clip_abc.mp4"),
            65.0,
        );
        let args = cmd.build_args();

        let expect_pair = |flag: &str, value: &str| {
            let pos = args
                .iter()
                .position(|a| a == flag)
                .unwrap_or_else(|| panic!("missing {}", flag));
            assert_eq!(args[pos + 1], value, "wrong value for {}", flag);
        };

        expect_pair("-c:v", "libx264");
        expect_pair("-crf", "26");
        expect_pair("-preset", "fast");
        expect_pair("-maxrate", "4M");
        expect_pair("-bufsize", "8M");
        expect_pair("-c:a", "aac");
        expect_pair("-b:a", "128k");
        expect_pair("-t", "65.000");
        assert_eq!(args.last().unwrap(), "clip_abc.mp4");
    }
}
