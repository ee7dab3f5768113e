//! Subtitle transcript fetching for caption context.
//!
//! Downloads auto-generated VTT subtitles with yt-dlp and flattens them to
//! plain text. Everything here is best-effort: the caller degrades to a
//! caption without transcript context when this module fails.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tokio::sync::watch;
use tracing::debug;

use aclip_media::command::wait_with_limits;
use aclip_media::MediaError;

use crate::error::PipelineResult;

/// Longest excerpt fed into the caption prompt.
const EXCERPT_MAX_CHARS: usize = 2000;

/// Fetch the subtitle transcript for a video.
///
/// Subtitle files land in `workdir` and are removed after parsing.
pub async fn fetch_transcript(
    video_url: &str,
    workdir: &Path,
    langs: &str,
    timeout_secs: Option<u64>,
    cancel_rx: Option<watch::Receiver<bool>>,
) -> PipelineResult<String> {
    debug!(url = %video_url, "fetching subtitles for caption context");

    let output_template = workdir.join("subs");

    let mut command = Command::new("yt-dlp");
    command
        .args(["--write-auto-sub", "--write-sub", "--sub-lang"])
        .arg(langs)
        .args([
            "--skip-download",
            "--sub-format",
            "vtt",
            "--no-warnings",
            "--no-playlist",
            "-o",
        ])
        .arg(&output_template)
        .arg(video_url);

    let output = wait_with_limits(command, "yt-dlp", timeout_secs, cancel_rx).await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MediaError::tool_failed(
            "yt-dlp",
            stderr
                .lines()
                .last()
                .unwrap_or("subtitle download failed")
                .to_string(),
            output.status.code(),
        )
        .into());
    }

    let files = find_subtitle_files(workdir)?;
    let Some(first) = files.first() else {
        return Err(
            MediaError::download_failed("no subtitle file downloaded, video may lack captions")
                .into(),
        );
    };

    let content = tokio::fs::read_to_string(first).await?;
    let transcript = parse_vtt(&content);

    for file in &files {
        tokio::fs::remove_file(file).await.ok();
    }

    Ok(transcript)
}

/// Trim a transcript down to prompt size.
pub fn excerpt(transcript: &str) -> String {
    if transcript.len() <= EXCERPT_MAX_CHARS {
        return transcript.to_string();
    }

    let mut cut = EXCERPT_MAX_CHARS;
    while !transcript.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &transcript[..cut])
}

fn find_subtitle_files(workdir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(workdir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("vtt"))
        .collect();

    // Prefer an English track when several languages came down.
    files.sort_by_key(|path| {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if name.contains(".en") {
            0
        } else {
            1
        }
    });

    Ok(files)
}

/// Flatten VTT subtitle content to plain text.
///
/// Headers, cue numbers, and timing lines are dropped, inline tags are
/// stripped, and the repeated lines of rolling captions are deduplicated.
fn parse_vtt(content: &str) -> String {
    use regex::Regex;

    let tag_pattern = Regex::new(r"<[^>]+>").unwrap();

    let mut lines: Vec<String> = Vec::new();

    for raw in content.lines() {
        let line = raw.trim();

        if line.is_empty()
            || line == "WEBVTT"
            || line.starts_with("Kind:")
            || line.starts_with("Language:")
            || line.starts_with("NOTE")
            || line.contains("-->")
        {
            continue;
        }

        // Cue numbers
        if line.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }

        let cleaned = tag_pattern.replace_all(line, "");
        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            continue;
        }

        if lines.last().map(|l| l.as_str()) != Some(cleaned) {
            lines.push(cleaned.to_string());
        }
    }

    lines.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_VTT: &str = "\
WEBVTT
Kind: captions
Language: en

1
00:00:00.000 --> 00:00:02.500 align:start position:0%
so<00:00:00.320><c> today</c><00:00:00.640><c> we're</c>

2
00:00:02.500 --> 00:00:05.000
so today we're
going to break this down

3
00:00:05.000 --> 00:00:07.000
going to break this down
and it gets wild
";

    #[test]
    fn test_parse_vtt_strips_structure() {
        let transcript = parse_vtt(SAMPLE_VTT);
        assert_eq!(
            transcript,
            "so today we're going to break this down and it gets wild"
        );
    }

    #[test]
    fn test_parse_vtt_dedupes_consecutive_lines() {
        let transcript = parse_vtt(SAMPLE_VTT);
        assert_eq!(transcript.matches("going to break this down").count(), 1);
    }

    #[test]
    fn test_parse_vtt_empty_input() {
        assert_eq!(parse_vtt("WEBVTT\n\n"), "");
    }

    #[test]
    fn test_excerpt_passes_short_text_through() {
        assert_eq!(excerpt("short"), "short");
    }

    #[test]
    fn test_excerpt_truncates_long_text() {
        let long = "word ".repeat(1000);
        let cut = excerpt(&long);
        assert!(cut.len() <= EXCERPT_MAX_CHARS + 3);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let long = "é".repeat(1500);
        let cut = excerpt(&long);
        assert!(cut.ends_with("..."));
    }
}
