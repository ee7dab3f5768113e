//! Engagement heatmap markers.
//!
//! A marker is one window of the "most replayed" heatmap published on a
//! video's watch page. The fetcher scrapes them; the selector ranks them.

use serde::{Deserialize, Serialize};

/// One window of the replay heatmap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngagementMarker {
    /// Offset of the window from the start of the video, in milliseconds.
    pub start_offset_ms: u64,
    /// Length of the window in milliseconds.
    pub duration_ms: u64,
    /// Normalized replay intensity in `[0.0, 1.0]`.
    pub intensity: f64,
}

impl EngagementMarker {
    /// Window start in seconds.
    pub fn start_sec(&self) -> f64 {
        self.start_offset_ms as f64 / 1000.0
    }

    /// Window length in seconds.
    pub fn duration_sec(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }
}

/// Ranking rules applied to scraped markers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerFilter {
    /// Markers below this intensity are dropped.
    pub min_intensity: f64,
    /// When the threshold would drop every marker, keep this many of the
    /// strongest instead.
    pub keep_top: usize,
}

impl Default for MarkerFilter {
    fn default() -> Self {
        Self {
            min_intensity: 0.15,
            keep_top: 5,
        }
    }
}

/// Sort markers by intensity, strongest first, and apply the filter.
///
/// A non-empty input never ranks down to nothing: when no marker clears the
/// threshold, the top `keep_top` markers survive instead.
pub fn rank_markers(
    mut markers: Vec<EngagementMarker>,
    filter: &MarkerFilter,
) -> Vec<EngagementMarker> {
    markers.sort_by(|a, b| b.intensity.total_cmp(&a.intensity));
    if markers.iter().any(|m| m.intensity >= filter.min_intensity) {
        markers.retain(|m| m.intensity >= filter.min_intensity);
    } else {
        markers.truncate(filter.keep_top);
    }
    markers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(start_offset_ms: u64, intensity: f64) -> EngagementMarker {
        EngagementMarker {
            start_offset_ms,
            duration_ms: 20_000,
            intensity,
        }
    }

    #[test]
    fn test_second_accessors() {
        let m = EngagementMarker {
            start_offset_ms: 120_000,
            duration_ms: 20_000,
            intensity: 0.9,
        };
        assert_eq!(m.start_sec(), 120.0);
        assert_eq!(m.duration_sec(), 20.0);
    }

    #[test]
    fn test_rank_sorts_strongest_first() {
        let ranked = rank_markers(
            vec![marker(0, 0.3), marker(1, 0.9), marker(2, 0.5)],
            &MarkerFilter::default(),
        );
        let scores: Vec<f64> = ranked.iter().map(|m| m.intensity).collect();
        assert_eq!(scores, vec![0.9, 0.5, 0.3]);
    }

    #[test]
    fn test_rank_drops_below_threshold() {
        let ranked = rank_markers(
            vec![marker(0, 0.05), marker(1, 0.9), marker(2, 0.1)],
            &MarkerFilter {
                min_intensity: 0.15,
                keep_top: 5,
            },
        );
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].intensity, 0.9);
    }

    #[test]
    fn test_rank_keeps_top_when_threshold_would_empty() {
        let ranked = rank_markers(
            vec![
                marker(0, 0.01),
                marker(1, 0.05),
                marker(2, 0.03),
                marker(3, 0.02),
            ],
            &MarkerFilter {
                min_intensity: 0.5,
                keep_top: 2,
            },
        );
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].intensity, 0.05);
        assert_eq!(ranked[1].intensity, 0.03);
    }

    #[test]
    fn test_rank_empty_input() {
        assert!(rank_markers(Vec::new(), &MarkerFilter::default()).is_empty());
    }
}
