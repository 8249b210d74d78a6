use serde::Serialize;

use crate::model::Assignment;

/// Tally of one anchor's edges. Derived purely from a snapshot, never
/// stored: there are no counters to drift out of sync with the edge set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub assigned: u64,
    pub completed: u64,
}

impl Completion {
    pub fn tally(edges: &[Assignment]) -> Self {
        let assigned = edges.len() as u64;
        let completed = edges.iter().filter(|edge| edge.is_completed).count() as u64;

        Self {
            assigned,
            completed,
        }
    }

    /// Raw completion ratio in `[0, 1]`. Zero when nothing is assigned,
    /// never NaN.
    pub fn ratio(self) -> f64 {
        if self.assigned == 0 {
            return 0.0;
        }

        self.completed as f64 / self.assigned as f64
    }

    /// The display percentage. The raw ratio is kept internal; rounding
    /// (half away from zero) happens only here, and both projections go
    /// through it.
    pub fn percent(self) -> u32 {
        (self.ratio() * 100.0).round() as u32
    }
}

/// Aggregate numbers for one video across every user it is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VideoStats {
    pub assigned_count: u64,
    pub completion_rate: u32,
}

/// Aggregate numbers for one user across every video assigned to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub num_assigned: u64,
    pub completion: u32,
}

/// Project video-level stats from edges already filtered to that video.
pub fn video_stats(edges: &[Assignment]) -> VideoStats {
    let completion = Completion::tally(edges);

    VideoStats {
        assigned_count: completion.assigned,
        completion_rate: completion.percent(),
    }
}

/// Project user-level stats from edges already filtered to that user.
pub fn user_stats(edges: &[Assignment]) -> UserStats {
    let completion = Completion::tally(edges);

    UserStats {
        num_assigned: completion.assigned,
        completion: completion.percent(),
    }
}
