use chrono::Duration;

use crate::model::{Assignment, AssignmentPatch, LastAction, Timestamp, Video};

/// Completions on annual-renewal videos go stale after a fixed 365-day
/// window. Deliberately not a calendar year: no leap-day handling, and a
/// renewal assigned on Feb 29 drifts. Compatibility with existing rows
/// depends on keeping it this way.
pub fn window() -> Duration {
    Duration::days(365)
}

/// Whether the edge's annual window has lapsed and the next watch should
/// reset it. An edge with no `assigned_date` never comes due: its renewal
/// clock never started.
pub fn is_renewal_due(edge: &Assignment, video: &Video, now: Timestamp) -> bool {
    let Some(assigned) = edge.assigned_date else {
        return false;
    };

    video.is_annual_renewal && now - assigned > window()
}

/// The update a watch event applies to the edge.
///
/// When the renewal window has lapsed, the watch restarts the annual cycle
/// from this moment rather than from the original assignment: completion
/// is dropped, `completed_date` cleared, and `assigned_date` re-stamped.
/// Otherwise it is a plain progress touch; watching again after completion
/// keeps the `completed` tag.
pub fn watch_patch(edge: &Assignment, video: &Video, now: Timestamp) -> AssignmentPatch {
    if is_renewal_due(edge, video, now) {
        return AssignmentPatch {
            is_completed: Some(false),
            assigned_date: Some(now),
            last_watched: Some(now),
            modified_date: Some(now),
            completed_date: Some(None),
            last_action: Some(LastAction::Watched),
        };
    }

    let action = if edge.is_completed {
        LastAction::Completed
    } else {
        LastAction::Watched
    };

    AssignmentPatch {
        last_watched: Some(now),
        modified_date: Some(now),
        last_action: Some(action),
        ..Default::default()
    }
}

/// The update for an explicit "mark completed" action. Not gated by the
/// renewal rule and never touches `assigned_date`.
pub fn completion_patch(now: Timestamp) -> AssignmentPatch {
    AssignmentPatch {
        is_completed: Some(true),
        completed_date: Some(Some(now)),
        modified_date: Some(now),
        last_action: Some(LastAction::Completed),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Record;
    use crate::model::now;

    fn video(is_annual_renewal: bool) -> Video {
        let mut video = Video::new(
            "Defensive driving".to_string(),
            "Following distance and hazard anticipation".to_string(),
            "https://youtu.be/dQw4w9WgXcQ".parse().unwrap(),
            "safety".to_string(),
            Record::random(),
        );
        video.is_annual_renewal = is_annual_renewal;
        video
    }

    fn edge_assigned_at(at: Timestamp) -> Assignment {
        Assignment::assigned(Record::random(), Record::random(), at)
    }

    #[test]
    fn due_just_past_the_window() {
        let now = now();
        let edge = edge_assigned_at(now - (window() + Duration::milliseconds(1)));

        assert!(is_renewal_due(&edge, &video(true), now));
    }

    #[test]
    fn not_due_just_inside_the_window() {
        let now = now();
        let edge = edge_assigned_at(now - (window() - Duration::milliseconds(1)));

        assert!(!is_renewal_due(&edge, &video(true), now));
    }

    #[test]
    fn not_due_at_exactly_the_window() {
        let now = now();
        let edge = edge_assigned_at(now - window());

        assert!(
            !is_renewal_due(&edge, &video(true), now),
            "the comparison is strict: exactly 365 days is not yet due"
        );
    }

    #[test]
    fn never_due_without_the_renewal_flag() {
        let now = now();
        let edge = edge_assigned_at(now - Duration::days(400));

        assert!(!is_renewal_due(&edge, &video(false), now));
    }

    #[test]
    fn never_due_without_an_assigned_date() {
        let now = now();
        let mut edge = edge_assigned_at(now);
        edge.assigned_date = None;

        assert!(!is_renewal_due(&edge, &video(true), now));
    }

    #[test]
    fn lapsed_watch_resets_the_edge() {
        let now = now();
        let mut edge = edge_assigned_at(now - Duration::days(366));
        edge.is_completed = true;
        edge.completed_date = Some(now - Duration::days(300));

        let patch = watch_patch(&edge, &video(true), now);

        assert_eq!(patch.is_completed, Some(false));
        assert_eq!(patch.assigned_date, Some(now), "the annual cycle restarts from the watch");
        assert_eq!(patch.completed_date, Some(None), "completion date is explicitly cleared");
        assert_eq!(patch.last_watched, Some(now));
        assert_eq!(patch.last_action, Some(LastAction::Watched));
    }

    #[test]
    fn ordinary_watch_only_touches_progress() {
        let now = now();
        let edge = edge_assigned_at(now - Duration::days(10));

        let patch = watch_patch(&edge, &video(true), now);

        assert_eq!(patch.last_watched, Some(now));
        assert_eq!(patch.last_action, Some(LastAction::Watched));
        assert_eq!(patch.is_completed, None, "completion state is left alone");
        assert_eq!(patch.assigned_date, None, "the renewal clock keeps running");
        assert_eq!(patch.completed_date, None);
    }

    #[test]
    fn rewatching_a_completed_video_keeps_the_completed_tag() {
        let now = now();
        let mut edge = edge_assigned_at(now - Duration::days(10));
        edge.is_completed = true;

        let patch = watch_patch(&edge, &video(true), now);

        assert_eq!(patch.last_action, Some(LastAction::Completed));
        assert_eq!(patch.is_completed, None);
    }

    #[test]
    fn completion_never_touches_the_renewal_clock() {
        let now = now();
        let patch = completion_patch(now);

        assert_eq!(patch.is_completed, Some(true));
        assert_eq!(patch.completed_date, Some(Some(now)));
        assert_eq!(patch.last_action, Some(LastAction::Completed));
        assert_eq!(patch.assigned_date, None);
        assert_eq!(patch.last_watched, None);
    }
}
