use axum::extract::{Path, State};
use axum::Json;
use tracing::instrument;

use crate::auth::{Admin, Claims};
use crate::model::{Assignment, User, Video};
use crate::prelude::*;
use crate::service::WatchOutcome;

use super::error::{UserNotFoundSnafu, VideoNotFoundSnafu};
use super::{App, Result};

#[derive(Debug, Deserialize)]
pub struct DesiredVideos {
    pub video_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct DesiredUsers {
    pub user_ids: Vec<String>,
}

/// Make the user's assigned video set match the request exactly. An empty
/// list unassigns everything.
#[instrument(skip(app))]
pub async fn assign_videos(
    _admin: Admin,
    State(app): State<App>,
    Path(id): Path<String>,
    Json(desired): Json<DesiredVideos>,
) -> Result<Json<Vec<Assignment>>> {
    let id = Record::<User>::new(id);
    let user = User::get(&id, &app)
        .await?
        .context(UserNotFoundSnafu { id })?;

    let desired = desired.video_ids.into_iter().map(Record::<Video>::new).collect();
    let edges = app.reconciler.assign_videos(&user.id, desired).await?;

    Ok(Json(edges))
}

/// The mirror image: make the video's assignee set match the request.
#[instrument(skip(app))]
pub async fn assign_users(
    _admin: Admin,
    State(app): State<App>,
    Path(id): Path<String>,
    Json(desired): Json<DesiredUsers>,
) -> Result<Json<Vec<Assignment>>> {
    let id = Record::<Video>::new(id);
    let video = Video::get(&id, &app)
        .await?
        .context(VideoNotFoundSnafu { id })?;

    let desired = desired.user_ids.into_iter().map(Record::<User>::new).collect();
    let edges = app.reconciler.assign_users(&video.id, desired).await?;

    Ok(Json(edges))
}

#[instrument(skip(app))]
pub async fn watch(
    claims: Claims,
    State(app): State<App>,
    Path(id): Path<String>,
) -> Result<Json<WatchOutcome>> {
    let video = Record::<Video>::new(id);
    let outcome = app.progress.record_watch(&claims.sub, &video, now()).await?;

    Ok(Json(outcome))
}

#[instrument(skip(app))]
pub async fn complete(
    claims: Claims,
    State(app): State<App>,
    Path(id): Path<String>,
) -> Result<Json<Assignment>> {
    let video = Record::<Video>::new(id);
    let edge = app
        .progress
        .record_completion(&claims.sub, &video, now())
        .await?;

    Ok(Json(edge))
}
