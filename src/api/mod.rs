use axum::routing::{get, post, put};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod assignments;
mod error;
mod state;
mod users;
mod videos;

pub use error::*;
pub use state::*;

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

pub fn create_router(app: App) -> Router {
    Router::new()
        .route("/videos", get(videos::list).post(videos::create))
        .route(
            "/videos/:id",
            get(videos::get).put(videos::update).delete(videos::remove),
        )
        .route("/videos/:id/assignees", put(assignments::assign_users))
        .route("/videos/:id/watch", post(assignments::watch))
        .route("/videos/:id/complete", post(assignments::complete))
        .route("/users", get(users::list))
        .route(
            "/users/:id/videos",
            get(users::videos).put(assignments::assign_videos),
        )
        .route("/me/videos", get(users::my_videos))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(app)
}
