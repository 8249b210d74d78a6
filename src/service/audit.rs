use derive_new::new;

use crate::database::{Database, Record};
use crate::model::{Anchor, Assignment, Log, LogData, Video};

/// Writes append-only [Log] records for every mutation. Auditing is
/// best-effort: a failed write is logged and swallowed, the mutation it
/// describes has already happened.
#[derive(Debug, Clone, new)]
pub struct Audit {
    database: Database,
}

impl Audit {
    async fn record(&self, message: LogData) {
        if let Err(err) = Log::from(message).create(&self.database).await {
            tracing::warn!(error = ?err, "failed to write an audit record");
        }
    }

    pub async fn reconciled(&self, anchor: Anchor, added: usize, removed: usize) {
        self.record(LogData::AssignmentsReconciled {
            anchor,
            added,
            removed,
        })
        .await;
    }

    pub async fn watch_recorded(&self, assignment: Record<Assignment>, renewed: bool) {
        self.record(LogData::WatchRecorded {
            assignment,
            renewed,
        })
        .await;
    }

    pub async fn completion_recorded(&self, assignment: Record<Assignment>) {
        self.record(LogData::CompletionRecorded { assignment }).await;
    }

    pub async fn video_created(&self, video: Record<Video>) {
        self.record(LogData::VideoCreated { video }).await;
    }

    pub async fn video_updated(&self, video: Record<Video>) {
        self.record(LogData::VideoUpdated { video }).await;
    }

    pub async fn video_deleted(&self, video: Record<Video>, assignments_removed: usize) {
        self.record(LogData::VideoDeleted {
            video,
            assignments_removed,
        })
        .await;
    }
}
