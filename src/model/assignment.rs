use serde_with::skip_serializing_none;

use crate::model::{User, Video};
use crate::prelude::*;

/// One edge of the user-video relation. The store keeps at most one edge
/// per (user, video) pair; every mutation identifies the edge by that pair
/// or by its record id, never both.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, new)]
pub struct Assignment {
    #[new(default)]
    pub id: Record<Assignment>,
    pub user: Record<User>,
    pub video: Record<Video>,

    #[new(value = "false")]
    #[serde(default)]
    pub is_completed: bool,

    /// When the edge was created or last reset by the renewal rule.
    /// Absent on legacy rows; the renewal clock never started for those.
    #[serde(default)]
    #[new(default)]
    pub assigned_date: Option<Timestamp>,
    #[serde(default)]
    #[new(default)]
    pub last_watched: Option<Timestamp>,
    #[serde(default)]
    #[new(default)]
    pub completed_date: Option<Timestamp>,
    #[serde(default)]
    #[new(default)]
    pub modified_date: Option<Timestamp>,
    #[serde(default)]
    #[new(default)]
    pub last_action: Option<LastAction>,
}

impl Assignment {
    /// A fresh edge for a counterpart that was just assigned.
    pub fn assigned(user: Record<User>, video: Record<Video>, at: Timestamp) -> Self {
        Self {
            assigned_date: Some(at),
            ..Self::new(user, video)
        }
    }
}

define_table!("assignments" : Assignment = id);

define_relation! {
    Assignment > by_user(user: &Record<User>) > Vec<Assignment>
        where "SELECT * FROM assignments WHERE user = $user"
}

define_relation! {
    Assignment > by_video(video: &Record<Video>) > Vec<Assignment>
        where "SELECT * FROM assignments WHERE video = $video"
}

define_relation! {
    Assignment > find(user: &Record<User>, video: &Record<Video>) > Option<Assignment>
        where "SELECT * FROM assignments WHERE user = $user AND video = $video LIMIT 1"
}

define_relation! {
    Assignment > insert(edges: Vec<Assignment>) > Vec<Assignment>
        where "INSERT INTO assignments $edges"
}

define_relation! {
    Assignment > remove_videos(user: &Record<User>, videos: Vec<Record<Video>>) > Vec<Assignment>
        where "DELETE assignments WHERE user = $user AND video IN $videos RETURN BEFORE"
}

define_relation! {
    Assignment > remove_users(video: &Record<Video>, users: Vec<Record<User>>) > Vec<Assignment>
        where "DELETE assignments WHERE video = $video AND user IN $users RETURN BEFORE"
}

define_relation! {
    Assignment > purge_video(video: &Record<Video>) > Vec<Assignment>
        where "DELETE assignments WHERE video = $video RETURN BEFORE"
}

define_relation! {
    Assignment > patch(id: &Record<Assignment>, patch: AssignmentPatch) > Option<Assignment>
        where "UPDATE $id MERGE $patch RETURN AFTER"
}

/// The most recent thing that happened to an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LastAction {
    Watched,
    Completed,
}

/// A partial edge update. Absent fields are left untouched by the merge;
/// `completed_date` distinguishes "untouched" (outer `None`) from an
/// explicit clear (`Some(None)`, serialized as null).
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssignmentPatch {
    pub is_completed: Option<bool>,
    pub assigned_date: Option<Timestamp>,
    pub last_watched: Option<Timestamp>,
    pub modified_date: Option<Timestamp>,
    #[serde(with = "serde_with::rust::double_option")]
    pub completed_date: Option<Option<Timestamp>>,
    pub last_action: Option<LastAction>,
}

/// Which side of the user-video relation a reconciliation is pinned to.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Anchor {
    User(Record<User>),
    Video(Record<Video>),
}

impl std::fmt::Display for Anchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anchor::User(id) => write!(f, "user `{id}`"),
            Anchor::Video(id) => write!(f, "video `{id}`"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge() -> Assignment {
        Assignment::new(Record::random(), Record::random())
    }

    #[test]
    fn fresh_edge_starts_incomplete() {
        let at = now();
        let edge = Assignment::assigned(Record::random(), Record::random(), at);

        assert!(!edge.is_completed);
        assert_eq!(edge.assigned_date, Some(at));
        assert_eq!(edge.last_watched, None);
        assert_eq!(edge.completed_date, None);
        assert_eq!(edge.last_action, None);
    }

    #[test]
    fn patch_serializes_only_touched_fields() {
        let patch = AssignmentPatch {
            last_watched: Some(now()),
            ..Default::default()
        };

        let value = serde_json::to_value(&patch).unwrap();
        let object = value.as_object().unwrap();

        assert!(object.contains_key("last_watched"));
        assert!(
            !object.contains_key("completed_date"),
            "untouched fields must stay out of the merge"
        );
        assert!(!object.contains_key("is_completed"));
    }

    #[test]
    fn cleared_completed_date_serializes_as_null() {
        let patch = AssignmentPatch {
            completed_date: Some(None),
            ..Default::default()
        };

        let value = serde_json::to_value(&patch).unwrap();
        assert!(
            value.as_object().unwrap()["completed_date"].is_null(),
            "an explicit clear must reach the store as null, not vanish"
        );
    }

    #[test]
    fn edge_round_trips_through_serde() {
        let mut original = edge();
        original.is_completed = true;
        original.completed_date = Some(now());

        let json = serde_json::to_string(&original).unwrap();
        let restored: Assignment = serde_json::from_str(&json).unwrap();

        assert_eq!(original, restored);
    }
}
