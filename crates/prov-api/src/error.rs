use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError { status: StatusCode::BAD_REQUEST, message: msg.into() }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError { status: StatusCode::NOT_FOUND, message: msg.into() }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError { status: StatusCode::INTERNAL_SERVER_ERROR, message: msg.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

impl From<prov_store::StoreError> for ApiError {
    fn from(e: prov_store::StoreError) -> Self {
        match e {
            prov_store::StoreError::NodeNotFound(_) | prov_store::StoreError::ClusterNotFound(_) => {
                ApiError::not_found(e.to_string())
            }
            _ => ApiError::internal(e.to_string()),
        }
    }
}

impl From<prov_graph::GraphError> for ApiError {
    fn from(e: prov_graph::GraphError) -> Self {
        match e {
            prov_graph::GraphError::EmptyCluster(_) => ApiError::not_found(e.to_string()),
            _ => ApiError::internal(e.to_string()),
        }
    }
}

impl From<prov_executor::ExecutorError> for ApiError {
    fn from(e: prov_executor::ExecutorError) -> Self {
        ApiError::internal(e.to_string())
    }
}
