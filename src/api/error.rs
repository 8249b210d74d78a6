use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use snafu::Snafu;

use crate::database::{DatabaseError, Record};
use crate::model::{User, Video};
use crate::service::{Phase, ProgressError, ReconcileError};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ApiError {
    #[snafu(display("video `{id}` was not found"))]
    VideoNotFound { id: Record<Video> },

    #[snafu(display("user `{id}` was not found"))]
    UserNotFound { id: Record<User> },

    #[snafu(transparent)]
    Progress { source: ProgressError },

    #[snafu(transparent)]
    Reconcile { source: ReconcileError },

    #[snafu(transparent)]
    Database { source: DatabaseError },
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::VideoNotFound { .. } | ApiError::UserNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Progress {
                source: ProgressError::Unassigned { .. } | ProgressError::MissingVideo { .. },
            } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Which half of a reconciliation failed, when one did. Callers use
    /// this to tell whether the edge set was left in the intermediate
    /// removed-but-not-added state; retrying the same request is always
    /// safe.
    fn phase(&self) -> Option<Phase> {
        match self {
            ApiError::Reconcile { source } => Some(source.phase()),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    phase: Option<Phase>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let body = ErrorBody {
            message: self.to_string(),
            phase: self.phase(),
        };

        (status, Json(body)).into_response()
    }
}
