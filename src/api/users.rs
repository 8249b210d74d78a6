use axum::extract::{Path, State};
use axum::Json;
use tracing::instrument;

use crate::auth::{Admin, Claims};
use crate::model::{Assignment, User, Video};
use crate::prelude::*;
use crate::service::{renewal, user_stats, video_stats, UserStats, VideoStats};

use super::error::UserNotFoundSnafu;
use super::{App, Result};

/// A user joined with their derived stats.
#[derive(Debug, Serialize, new)]
pub struct UserSummary {
    #[serde(flatten)]
    pub user: User,
    #[serde(flatten)]
    pub stats: UserStats,
}

/// One assignment joined with the video it points at, that video's
/// overall stats, and whether the annual window has lapsed for this user.
#[derive(Debug, Serialize, new)]
pub struct AssignedVideo {
    pub assignment: Assignment,
    pub video: Video,
    pub stats: VideoStats,
    pub renewal_due: bool,
}

#[instrument(skip(app))]
pub async fn list(_admin: Admin, State(app): State<App>) -> Result<Json<Vec<UserSummary>>> {
    let users = User::list_active(&app).await?;

    let mut summaries = Vec::with_capacity(users.len());
    for user in users {
        let edges = Assignment::by_user(&user.id, &app).await?;
        summaries.push(UserSummary::new(user, user_stats(&edges)));
    }

    Ok(Json(summaries))
}

#[instrument(skip(app))]
pub async fn videos(
    _admin: Admin,
    State(app): State<App>,
    Path(id): Path<String>,
) -> Result<Json<Vec<AssignedVideo>>> {
    let id = Record::<User>::new(id);
    let user = User::get(&id, &app)
        .await?
        .context(UserNotFoundSnafu { id })?;

    Ok(Json(assigned_videos(&app, &user.id).await?))
}

#[instrument(skip(app))]
pub async fn my_videos(claims: Claims, State(app): State<App>) -> Result<Json<Vec<AssignedVideo>>> {
    Ok(Json(assigned_videos(&app, &claims.sub).await?))
}

async fn assigned_videos(app: &App, user: &Record<User>) -> Result<Vec<AssignedVideo>> {
    let edges = Assignment::by_user(user, app).await?;
    let at = now();

    let mut assigned = Vec::with_capacity(edges.len());
    for edge in edges {
        // an edge can briefly outlive its video while a delete cascades
        let Some(video) = Video::get(&edge.video, app).await? else {
            continue;
        };

        let peers = Assignment::by_video(&video.id, app).await?;
        let renewal_due = renewal::is_renewal_due(&edge, &video, at);

        assigned.push(AssignedVideo::new(
            edge,
            video,
            video_stats(&peers),
            renewal_due,
        ));
    }

    Ok(assigned)
}
