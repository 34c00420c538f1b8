use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use waypoint_core::error::WaypointError;

/// Gateway failure rendered as a JSON `{error}` body with a matching status.
#[derive(Debug)]
pub enum ApiError {
    /// The engine refused or failed the request.
    Engine(WaypointError),
    /// The request body was not valid JSON for the endpoint.
    Body(JsonRejection),
}

impl From<WaypointError> for ApiError {
    fn from(e: WaypointError) -> Self {
        Self::Engine(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Body(rejection)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            // 400 for syntax errors, 422 for shape mismatches, 415 without a JSON content type
            Self::Body(rejection) => rejection.status(),
            Self::Engine(WaypointError::GraphNotFound(_) | WaypointError::RunNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            Self::Engine(
                WaypointError::UnknownNodeFunction(_)
                | WaypointError::InvalidStartNode(_)
                | WaypointError::InvalidEdgeReference { .. }
                | WaypointError::ToolNotFound(_)
                | WaypointError::ToolValidation(_)
                | WaypointError::Json(_),
            ) => StatusCode::BAD_REQUEST,
            Self::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Body(rejection) => serde_json::json!({ "error": rejection.body_text() }),
            Self::Engine(err) => {
                let mut body = serde_json::json!({ "error": err.to_string() });
                // Failed runs are stored; hand back the id so the caller can inspect them.
                if let WaypointError::NodeFailed { run_id, .. }
                | WaypointError::InvalidTransition { run_id, .. } = err
                {
                    body["run_id"] = serde_json::json!(run_id);
                }
                body
            }
        };

        (status, Json(body)).into_response()
    }
}
