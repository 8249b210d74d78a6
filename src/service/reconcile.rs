use std::collections::HashSet;
use std::hash::Hash;

use itertools::Itertools;
use tracing::instrument;

use crate::model::{Anchor, Assignment, User, Video};
use crate::prelude::*;
use crate::service::Audit;

/// The half of the diff-apply sequence that failed. Exposed so callers can
/// decide what state the edge set was left in; retrying with the same
/// desired set is safe in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Fetch,
    Remove,
    Add,
    Refresh,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ReconcileError {
    /// Reading the current edge set failed; nothing was written.
    #[snafu(display("could not load the current assignments for {anchor}"))]
    Fetch {
        anchor: Anchor,
        source: DatabaseError,
        #[snafu(implicit)]
        location: Location,
    },

    /// The delete half failed. Inserts were not attempted, so nothing was
    /// added without its matching removal.
    #[snafu(display("could not remove {count} stale assignments for {anchor}"))]
    Remove {
        anchor: Anchor,
        count: usize,
        source: DatabaseError,
        #[snafu(implicit)]
        location: Location,
    },

    /// The insert half failed after removals went through: the edge set is
    /// in a removed-but-not-added intermediate state. Re-running with the
    /// same desired set converges on the intended state.
    #[snafu(display("could not insert {count} new assignments for {anchor}"))]
    Add {
        anchor: Anchor,
        count: usize,
        source: DatabaseError,
        #[snafu(implicit)]
        location: Location,
    },

    /// The final re-read failed; the writes themselves went through.
    #[snafu(display("could not re-read the assignments for {anchor}"))]
    Refresh {
        anchor: Anchor,
        source: DatabaseError,
        #[snafu(implicit)]
        location: Location,
    },
}

impl ReconcileError {
    pub fn phase(&self) -> Phase {
        match self {
            ReconcileError::Fetch { .. } => Phase::Fetch,
            ReconcileError::Remove { .. } => Phase::Remove,
            ReconcileError::Add { .. } => Phase::Add,
            ReconcileError::Refresh { .. } => Phase::Refresh,
        }
    }
}

/// The minimal write set that turns `current` into `desired`. Ids present
/// in both sets appear in neither list: their edges are left untouched, so
/// completion state and timestamps survive reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff<T> {
    pub to_add: Vec<T>,
    pub to_remove: Vec<T>,
}

pub fn diff<T>(current: &HashSet<T>, desired: &HashSet<T>) -> Diff<T>
where
    T: Clone + Eq + Hash,
{
    let to_add = desired.difference(current).cloned().collect_vec();
    let to_remove = current.difference(desired).cloned().collect_vec();

    Diff { to_add, to_remove }
}

/// Makes the stored edge set for one anchor match a desired counterpart
/// set exactly: load, diff, delete the stale edges, insert the new ones,
/// re-read. Removals always run before inserts, and the whole operation is
/// idempotent; see [ReconcileError] for what each failure leaves behind.
///
/// Two concurrent reconciliations of the same anchor race read-diff-write
/// and the last writer wins. Accepted: a caller can always re-reconcile to
/// restore the intended set.
#[derive(Debug, Clone, new)]
pub struct Reconciler {
    database: Database,
    audit: Audit,
}

impl Reconciler {
    /// Make the set of videos assigned to `user` match `desired` exactly.
    /// An empty `desired` unassigns everything.
    #[instrument(skip(self))]
    pub async fn assign_videos(
        &self,
        user: &Record<User>,
        desired: HashSet<Record<Video>>,
    ) -> Result<Vec<Assignment>, ReconcileError> {
        let anchor = Anchor::User(user.clone());

        let current: HashSet<_> = Assignment::by_user(user, &self.database)
            .await
            .context(FetchSnafu {
                anchor: anchor.clone(),
            })?
            .into_iter()
            .map(|edge| edge.video)
            .collect();

        let Diff { to_add, to_remove } = diff(&current, &desired);
        let (added, removed) = (to_add.len(), to_remove.len());

        if !to_remove.is_empty() {
            Assignment::remove_videos(user, to_remove, &self.database)
                .await
                .context(RemoveSnafu {
                    anchor: anchor.clone(),
                    count: removed,
                })?;
        }

        if !to_add.is_empty() {
            let at = now();
            let edges = to_add
                .into_iter()
                .map(|video| Assignment::assigned(user.clone(), video, at))
                .collect_vec();

            Assignment::insert(edges, &self.database)
                .await
                .context(AddSnafu {
                    anchor: anchor.clone(),
                    count: added,
                })?;
        }

        let refreshed = Assignment::by_user(user, &self.database)
            .await
            .context(RefreshSnafu {
                anchor: anchor.clone(),
            })?;

        if added > 0 || removed > 0 {
            self.audit.reconciled(anchor, added, removed).await;
        }

        Ok(refreshed)
    }

    /// Make the set of users a video is assigned to match `desired`
    /// exactly. The mirror image of [Reconciler::assign_videos].
    #[instrument(skip(self))]
    pub async fn assign_users(
        &self,
        video: &Record<Video>,
        desired: HashSet<Record<User>>,
    ) -> Result<Vec<Assignment>, ReconcileError> {
        let anchor = Anchor::Video(video.clone());

        let current: HashSet<_> = Assignment::by_video(video, &self.database)
            .await
            .context(FetchSnafu {
                anchor: anchor.clone(),
            })?
            .into_iter()
            .map(|edge| edge.user)
            .collect();

        let Diff { to_add, to_remove } = diff(&current, &desired);
        let (added, removed) = (to_add.len(), to_remove.len());

        if !to_remove.is_empty() {
            Assignment::remove_users(video, to_remove, &self.database)
                .await
                .context(RemoveSnafu {
                    anchor: anchor.clone(),
                    count: removed,
                })?;
        }

        if !to_add.is_empty() {
            let at = now();
            let edges = to_add
                .into_iter()
                .map(|user| Assignment::assigned(user, video.clone(), at))
                .collect_vec();

            Assignment::insert(edges, &self.database)
                .await
                .context(AddSnafu {
                    anchor: anchor.clone(),
                    count: added,
                })?;
        }

        let refreshed = Assignment::by_video(video, &self.database)
            .await
            .context(RefreshSnafu {
                anchor: anchor.clone(),
            })?;

        if added > 0 || removed > 0 {
            self.audit.reconciled(anchor, added, removed).await;
        }

        Ok(refreshed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Log, LogData, Role};
    use crate::service::{renewal, video_stats};
    use crate::testing;

    fn set<T: Eq + Hash>(items: impl IntoIterator<Item = T>) -> HashSet<T> {
        items.into_iter().collect()
    }

    #[test]
    fn diff_splits_adds_and_removes() {
        let current = set(["a", "b", "c"]);
        let desired = set(["b", "c", "d"]);

        let diff = diff(&current, &desired);

        assert_eq!(diff.to_add, vec!["d"]);
        assert_eq!(diff.to_remove, vec!["a"]);
    }

    #[test]
    fn diff_of_identical_sets_is_empty() {
        let current = set([1, 2, 3]);

        let diff = diff(&current, &current.clone());

        assert!(diff.to_add.is_empty());
        assert!(diff.to_remove.is_empty());
    }

    #[test]
    fn diff_against_an_empty_desired_set_removes_everything() {
        let current = set([1, 2]);

        let diff = diff(&current, &HashSet::new());

        assert!(diff.to_add.is_empty());
        assert_eq!(diff.to_remove.len(), 2);
    }

    async fn setup() -> (Database, Reconciler) {
        let database = testing::database().await;
        let reconciler = Reconciler::new(database.clone(), Audit::new(database.clone()));
        (database, reconciler)
    }

    async fn driver(db: &Database, name: &str) -> Record<User> {
        let mut created = User::new(Some(name.to_string()), Role::Driver)
            .create(db)
            .await
            .unwrap();
        created.remove(0).id
    }

    async fn video(db: &Database, title: &str) -> Record<Video> {
        let mut created = Video::new(
            title.to_string(),
            "".to_string(),
            "https://youtu.be/dQw4w9WgXcQ".parse().unwrap(),
            "safety".to_string(),
            Record::random(),
        )
        .create(db)
        .await
        .unwrap();
        created.remove(0).id
    }

    fn by_id(edges: &[Assignment]) -> Vec<(String, Option<Timestamp>)> {
        edges
            .iter()
            .map(|edge| (edge.id.to_string(), edge.assigned_date))
            .sorted()
            .collect_vec()
    }

    #[tokio::test]
    async fn assigning_from_scratch_creates_incomplete_edges() {
        let (db, reconciler) = setup().await;
        let user = driver(&db, "Ina").await;
        let (v1, v2) = (video(&db, "one").await, video(&db, "two").await);

        let edges = reconciler
            .assign_videos(&user, set([v1.clone(), v2.clone()]))
            .await
            .unwrap();

        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|edge| !edge.is_completed));
        assert!(edges.iter().all(|edge| edge.assigned_date.is_some()));
        assert_eq!(
            set(edges.iter().map(|edge| edge.video.clone())),
            set([v1, v2])
        );
    }

    #[tokio::test]
    async fn reconciling_twice_performs_zero_writes() {
        let (db, reconciler) = setup().await;
        let user = driver(&db, "Ina").await;
        let (v1, v2) = (video(&db, "one").await, video(&db, "two").await);

        let first = reconciler
            .assign_videos(&user, set([v1.clone(), v2.clone()]))
            .await
            .unwrap();
        let second = reconciler.assign_videos(&user, set([v1, v2])).await.unwrap();

        assert_eq!(
            by_id(&first),
            by_id(&second),
            "the second call must leave every edge untouched, ids and timestamps included"
        );
    }

    #[tokio::test]
    async fn progress_survives_reconciliation() {
        let (db, reconciler) = setup().await;
        let user = driver(&db, "Ina").await;
        let (v1, v2, v3) = (
            video(&db, "one").await,
            video(&db, "two").await,
            video(&db, "three").await,
        );

        let edges = reconciler
            .assign_videos(&user, set([v1.clone(), v2.clone()]))
            .await
            .unwrap();
        let watched = edges.iter().find(|edge| edge.video == v1).unwrap();
        Assignment::patch(&watched.id, renewal::completion_patch(now()), &db)
            .await
            .unwrap()
            .unwrap();

        let edges = reconciler
            .assign_videos(&user, set([v1.clone(), v3.clone()]))
            .await
            .unwrap();

        let kept = edges.iter().find(|edge| edge.video == v1).unwrap();
        assert_eq!(kept.id, watched.id, "the kept edge is the same record");
        assert!(kept.is_completed, "completion survives");
        assert!(kept.completed_date.is_some());

        assert!(edges.iter().all(|edge| edge.video != v2), "v2 was unassigned");
        let fresh = edges.iter().find(|edge| edge.video == v3).unwrap();
        assert!(!fresh.is_completed);
    }

    #[tokio::test]
    async fn empty_desired_set_unassigns_everything() {
        let (db, reconciler) = setup().await;
        let user = driver(&db, "Ina").await;
        let v1 = video(&db, "one").await;

        reconciler
            .assign_videos(&user, set([v1]))
            .await
            .unwrap();
        let edges = reconciler.assign_videos(&user, HashSet::new()).await.unwrap();

        assert!(edges.is_empty());
        assert!(Assignment::by_user(&user, &db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reassigning_a_video_preserves_completions() {
        let (db, reconciler) = setup().await;
        let v = video(&db, "winter driving").await;
        let (a, b, c, d) = (
            driver(&db, "Ina").await,
            driver(&db, "Mabelle").await,
            driver(&db, "Michael").await,
            driver(&db, "Stokes").await,
        );

        reconciler
            .assign_users(&v, set([a.clone(), b.clone(), c.clone()]))
            .await
            .unwrap();

        let completed = Assignment::find(&b, &v, &db).await.unwrap().unwrap();
        Assignment::patch(&completed.id, renewal::completion_patch(now()), &db)
            .await
            .unwrap()
            .unwrap();

        let edges = reconciler
            .assign_users(&v, set([b.clone(), c.clone(), d.clone()]))
            .await
            .unwrap();

        assert!(edges.iter().all(|edge| edge.user != a), "A was removed");

        let kept = edges.iter().find(|edge| edge.user == b).unwrap();
        assert_eq!(kept.id, completed.id);
        assert!(kept.is_completed, "B's completion is untouched");

        assert!(edges.iter().any(|edge| edge.user == c));
        let fresh = edges.iter().find(|edge| edge.user == d).unwrap();
        assert!(!fresh.is_completed, "D starts incomplete");

        let projected = video_stats(&edges);
        assert_eq!(projected.assigned_count, 3);
        assert_eq!(projected.completion_rate, 33);
    }

    #[tokio::test]
    async fn reconciliation_is_audited() {
        let (db, reconciler) = setup().await;
        let user = driver(&db, "Ina").await;
        let v1 = video(&db, "one").await;

        reconciler
            .assign_videos(&user, set([v1]))
            .await
            .unwrap();

        let logs = Log::recent(&db).await.unwrap();
        assert!(logs.iter().any(|log| matches!(
            &log.message,
            LogData::AssignmentsReconciled { added: 1, removed: 0, .. }
        )));
    }
}
