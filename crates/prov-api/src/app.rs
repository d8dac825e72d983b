use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use prov_provider::Provider;
use prov_store::Store;
use tower_http::trace::TraceLayer;

use crate::auth::require_bearer_token;
use crate::handlers;
use crate::state::AppState;

pub fn build_app(store: Arc<dyn Store>, provider: Arc<dyn Provider>, auth_token: Arc<String>) -> Router {
    let state = AppState { store, provider, auth_token };

    Router::new()
        .route("/health", get(handlers::health))
        .route("/clusters", post(handlers::create_cluster))
        .route("/clusters/:id/run", post(handlers::run_cluster_phase))
        .route("/clusters/:id/status", get(handlers::get_status))
        .route("/clusters/:id/graph", get(handlers::get_graph))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer_token))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use prov_provider::LocalProvider;
    use prov_store::InMemoryStore;
    use tower::util::ServiceExt;

    const TEST_TOKEN: &str = "test-token";

    fn test_app() -> Router {
        let store = Arc::new(InMemoryStore::new());
        let provider = Arc::new(LocalProvider::new());
        build_app(store, provider, Arc::new(TEST_TOKEN.to_string()))
    }

    fn authed(req: axum::http::request::Builder) -> axum::http::request::Builder {
        req.header("Authorization", format!("Bearer {}", TEST_TOKEN))
    }

    #[tokio::test]
    async fn unauthenticated_request_returns_401() {
        let app = test_app();
        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn health_returns_200_when_authenticated() {
        let app = test_app();
        let resp = app
            .oneshot(authed(Request::builder().uri("/health")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn status_of_unknown_cluster_returns_404() {
        let app = test_app();
        let id = uuid::Uuid::new_v4();
        let resp = app
            .oneshot(
                authed(Request::builder().uri(format!("/clusters/{id}/status")))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn creating_a_cluster_returns_its_id() {
        let app = test_app();
        let body = serde_json::json!({ "name": "t1", "n_nodes": 1, "n_dcs": 1 });
        let resp = app
            .oneshot(
                authed(
                    Request::builder()
                        .method("POST")
                        .uri("/clusters")
                        .header("content-type", "application/json"),
                )
                .body(Body::from(body.to_string()))
                .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
