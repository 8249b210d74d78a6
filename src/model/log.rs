use crate::model::{Anchor, Assignment, Video};
use crate::prelude::*;

/// An append-only audit record describing one mutation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, new)]
pub struct Log {
    #[new(default)]
    pub id: Record<Log>,
    #[new(value = "now()")]
    pub created_at: Timestamp,
    pub message: LogData,
}

define_table!("logs" : Log = id);
define_model!(Log);

define_relation! {
    Log > recent() > Vec<Log>
        where "SELECT * FROM logs ORDER BY created_at DESC LIMIT 100"
}

impl From<LogData> for Log {
    fn from(message: LogData) -> Self {
        Self::new(message)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum LogData {
    AssignmentsReconciled {
        anchor: Anchor,
        added: usize,
        removed: usize,
    },
    WatchRecorded {
        assignment: Record<Assignment>,
        renewed: bool,
    },
    CompletionRecorded {
        assignment: Record<Assignment>,
    },
    VideoCreated {
        video: Record<Video>,
    },
    VideoUpdated {
        video: Record<Video>,
    },
    VideoDeleted {
        video: Record<Video>,
        assignments_removed: usize,
    },
}
