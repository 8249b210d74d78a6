use tracing::instrument;

use crate::model::{Assignment, User, Video};
use crate::prelude::*;
use crate::service::{renewal, Audit};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ProgressError {
    /// Distinct from an existing assignment with no progress: there is no
    /// edge between this user and video at all.
    #[snafu(display("video `{video}` is not assigned to user `{user}`"))]
    Unassigned {
        user: Record<User>,
        video: Record<Video>,
        #[snafu(implicit)]
        location: Location,
    },

    /// The edge exists but its video row is gone.
    #[snafu(display("video `{video}` no longer exists"))]
    MissingVideo {
        video: Record<Video>,
        #[snafu(implicit)]
        location: Location,
    },

    /// The edge disappeared between the read and the update.
    #[snafu(display("assignment `{assignment}` vanished mid-update"))]
    Vanished {
        assignment: Record<Assignment>,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(transparent)]
    Database { source: DatabaseError },
}

/// What a watch event did to the edge.
#[derive(Debug, Clone, PartialEq, Serialize, new)]
pub struct WatchOutcome {
    pub assignment: Assignment,
    /// Whether this watch reset a lapsed annual renewal.
    pub renewed: bool,
}

/// Applies watch and completion events to a single edge. Each event is one
/// read and one merge; the renewal decision is made against the snapshot
/// read at the start of the event.
#[derive(Debug, Clone, new)]
pub struct Progress {
    database: Database,
    audit: Audit,
}

impl Progress {
    /// Record that `user` watched `video`, rolling the annual window
    /// forward when it has lapsed.
    #[instrument(skip(self))]
    pub async fn record_watch(
        &self,
        user: &Record<User>,
        video: &Record<Video>,
        now: Timestamp,
    ) -> Result<WatchOutcome, ProgressError> {
        let edge = Assignment::find(user, video, &self.database)
            .await?
            .context(UnassignedSnafu {
                user: user.clone(),
                video: video.clone(),
            })?;

        let meta = Video::get(video, &self.database)
            .await?
            .context(MissingVideoSnafu {
                video: video.clone(),
            })?;

        let renewed = renewal::is_renewal_due(&edge, &meta, now);
        let patch = renewal::watch_patch(&edge, &meta, now);

        let updated = Assignment::patch(&edge.id, patch, &self.database)
            .await?
            .context(VanishedSnafu {
                assignment: edge.id.clone(),
            })?;

        self.audit.watch_recorded(updated.id.clone(), renewed).await;

        Ok(WatchOutcome::new(updated, renewed))
    }

    /// Record an explicit "mark completed" action. Not gated by the
    /// renewal rule and never touches `assigned_date`.
    #[instrument(skip(self))]
    pub async fn record_completion(
        &self,
        user: &Record<User>,
        video: &Record<Video>,
        now: Timestamp,
    ) -> Result<Assignment, ProgressError> {
        let edge = Assignment::find(user, video, &self.database)
            .await?
            .context(UnassignedSnafu {
                user: user.clone(),
                video: video.clone(),
            })?;

        let updated = Assignment::patch(&edge.id, renewal::completion_patch(now), &self.database)
            .await?
            .context(VanishedSnafu {
                assignment: edge.id.clone(),
            })?;

        self.audit.completion_recorded(updated.id.clone()).await;

        Ok(updated)
    }
}
