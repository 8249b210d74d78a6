use axum::extract::{Path, Query, State};
use axum::Json;
use tracing::instrument;
use url::Url;

use crate::auth::Admin;
use crate::model::{Assignment, Video};
use crate::prelude::*;
use crate::service::{video_stats, VideoStats};

use super::error::VideoNotFoundSnafu;
use super::{App, Result};

/// A video joined with its derived stats.
#[derive(Debug, Serialize, new)]
pub struct VideoSummary {
    #[serde(flatten)]
    pub video: Video,
    #[serde(flatten)]
    pub stats: VideoStats,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoForm {
    pub title: String,
    pub description: String,
    pub youtube_url: Url,
    pub category: String,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub is_annual_renewal: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListFilter {
    pub category: Option<String>,
}

#[instrument(skip(app))]
pub async fn list(
    _admin: Admin,
    State(app): State<App>,
    Query(filter): Query<ListFilter>,
) -> Result<Json<Vec<VideoSummary>>> {
    let videos = Video::recent(&app).await?;

    let videos = videos.into_iter().filter(|video| match &filter.category {
        Some(category) => video.category.eq_ignore_ascii_case(category),
        None => true,
    });

    let mut summaries = Vec::new();
    for video in videos {
        let edges = Assignment::by_video(&video.id, &app).await?;
        summaries.push(VideoSummary::new(video, video_stats(&edges)));
    }

    Ok(Json(summaries))
}

#[instrument(skip(app))]
pub async fn get(
    _admin: Admin,
    State(app): State<App>,
    Path(id): Path<String>,
) -> Result<Json<VideoSummary>> {
    let id = Record::<Video>::new(id);
    let video = Video::get(&id, &app)
        .await?
        .context(VideoNotFoundSnafu { id })?;

    let edges = Assignment::by_video(&video.id, &app).await?;

    Ok(Json(VideoSummary::new(video, video_stats(&edges))))
}

#[instrument(skip(app))]
pub async fn create(
    Admin(claims): Admin,
    State(app): State<App>,
    Json(form): Json<VideoForm>,
) -> Result<Json<Video>> {
    let mut video = Video::new(
        form.title,
        form.description,
        form.youtube_url,
        form.category,
        claims.sub,
    );
    video.duration = form.duration;
    video.is_annual_renewal = form.is_annual_renewal;

    video.create(&app).await?;
    app.audit.video_created(video.id.clone()).await;

    Ok(Json(video))
}

#[instrument(skip(app))]
pub async fn update(
    _admin: Admin,
    State(app): State<App>,
    Path(id): Path<String>,
    Json(form): Json<VideoForm>,
) -> Result<Json<Video>> {
    let id = Record::<Video>::new(id);
    let mut video = Video::get(&id, &app)
        .await?
        .context(VideoNotFoundSnafu { id: id.clone() })?;

    video.title = form.title;
    video.description = form.description;
    video.youtube_url = form.youtube_url;
    video.category = form.category;
    video.duration = form.duration;
    video.is_annual_renewal = form.is_annual_renewal;

    let updated = video
        .update(&app)
        .await?
        .context(VideoNotFoundSnafu { id })?;
    app.audit.video_updated(updated.id.clone()).await;

    Ok(Json(updated))
}

/// Deletes the video and its edges. The assignments go first; re-running
/// the delete converges after a partial failure.
#[instrument(skip(app))]
pub async fn remove(
    _admin: Admin,
    State(app): State<App>,
    Path(id): Path<String>,
) -> Result<Json<Video>> {
    let id = Record::<Video>::new(id);
    let video = Video::get(&id, &app)
        .await?
        .context(VideoNotFoundSnafu { id })?;

    let removed = Assignment::purge_video(&video.id, &app).await?;
    video.delete(&app).await?;
    app.audit.video_deleted(video.id.clone(), removed.len()).await;

    Ok(Json(video))
}
