//! Clip planning types shared by the selector, retriever, and orchestrator.

use serde::{Deserialize, Serialize};

/// Which step of the selection cascade produced a candidate window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentOrigin {
    /// Replay heatmap best marker
    Heatmap,
    /// AI watched the video and suggested a window
    AiWatch,
    /// Deterministic position heuristic
    Heuristic,
}

impl SegmentOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentOrigin::Heatmap => "heatmap",
            SegmentOrigin::AiWatch => "ai_watch",
            SegmentOrigin::Heuristic => "heuristic",
        }
    }
}

/// A candidate clip window produced by one step of the selection cascade.
///
/// Candidates are raw: they may overrun the video or the configured clip
/// bounds. Finalization clamps them into a valid [`ClipPlan`].
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentCandidate {
    pub start_sec: f64,
    pub end_sec: f64,
    /// Engagement score backing the candidate; 0.0 when the origin has none.
    pub score: f64,
    pub origin: SegmentOrigin,
    pub reason: String,
}

/// The final clip window handed to the retriever and the transcoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipPlan {
    pub start_sec: f64,
    pub end_sec: f64,
    /// Human-readable explanation of why this window was chosen.
    pub reason: String,
}

impl ClipPlan {
    pub fn duration_sec(&self) -> f64 {
        (self.end_sec - self.start_sec).max(0.0)
    }
}

/// A window suggested by an AI advisor, already parsed and clamped.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSuggestion {
    pub start_sec: f64,
    pub duration_sec: f64,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_as_str() {
        assert_eq!(SegmentOrigin::Heatmap.as_str(), "heatmap");
        assert_eq!(SegmentOrigin::AiWatch.as_str(), "ai_watch");
        assert_eq!(SegmentOrigin::Heuristic.as_str(), "heuristic");
    }

    #[test]
    fn test_plan_duration() {
        let plan = ClipPlan {
            start_sec: 115.0,
            end_sec: 150.0,
            reason: "High engagement".to_string(),
        };
        assert_eq!(plan.duration_sec(), 35.0);
    }

    #[test]
    fn test_plan_duration_never_negative() {
        let plan = ClipPlan {
            start_sec: 10.0,
            end_sec: 5.0,
            reason: String::new(),
        };
        assert_eq!(plan.duration_sec(), 0.0);
    }
}
