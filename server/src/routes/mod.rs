//! HTTP route definitions.

mod changes;
mod feeds;
mod health;
mod types;
mod ws;

use crate::AppState;
use axum::Router;

/// Create all application routes.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(types::routes())
        .merge(changes::routes())
        .merge(feeds::routes())
        .merge(ws::routes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(config: Config) -> Router {
        create_routes().with_state(AppState::new(config))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn sample_changes() -> Value {
        json!({
            "puts": [
                {"id": "B2", "type": "BuyOrder", "content": {"qty": 2, "px": 1.5}},
                {"id": "B1", "type": "BuyOrder", "content": {"qty": 1}},
                {"id": "S1", "type": "SellOrder", "content": {"qty": 5}},
                {"id": "N1", "type": "Note", "content": "hello"}
            ],
            "removes": [{"id": "missing"}]
        })
    }

    #[tokio::test]
    async fn test_health() {
        let app = app(Config::default());
        let (status, body) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["records"], 0);
    }

    #[tokio::test]
    async fn test_push_then_query() {
        let app = app(Config::default());

        let (status, report) = send(&app, post_json("/changes", sample_changes(), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["puts"], 4);
        assert_eq!(report["removesApplied"], 0);
        assert_eq!(report["added"], json!(["BuyOrder", "Note", "SellOrder"]));

        let (status, body) = send(&app, get("/types")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["types"], json!(["BuyOrder", "Note", "SellOrder"]));

        let (_, body) = send(&app, get("/types?filter=Order%24")).await;
        assert_eq!(body["types"], json!(["BuyOrder", "SellOrder"]));
        assert_eq!(body["total"], 3);

        let (status, body) = send(&app, get("/types/BuyOrder/records")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["records"],
            json!([
                {"id": "B1", "type": "BuyOrder", "qty": 1},
                {"id": "B2", "type": "BuyOrder", "qty": 2, "px": 1.5}
            ])
        );

        let (status, body) = send(&app, get("/types/Note/columns")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["contentKind"], "string");
        let fields: Vec<_> = body["columns"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["field"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(fields, vec!["content", "id", "type"]);
        assert_eq!(body["columns"][0]["headerName"], "content");
    }

    #[tokio::test]
    async fn test_unknown_type_is_404() {
        let app = app(Config::default());
        let (status, body) = send(&app, get("/types/Nope/records")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("Nope"));

        let (status, _) = send(&app, get("/types/Nope/columns")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_filter_is_400() {
        let app = app(Config::default());
        let (status, body) = send(&app, get("/types?filter=%28")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"], "invalid_filter");
    }

    #[tokio::test]
    async fn test_clear() {
        let app = app(Config::default());
        send(&app, post_json("/changes", sample_changes(), None)).await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/clear")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let (_, body) = send(&app, get("/types")).await;
        assert_eq!(body["types"], json!([]));
    }

    #[tokio::test]
    async fn test_writes_require_secret_when_configured() {
        let app = app(Config {
            auth_secret: Some("s3cret".to_string()),
            ..Config::default()
        });

        let (status, _) = send(&app, post_json("/changes", sample_changes(), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, post_json("/changes", sample_changes(), Some("nope"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) =
            send(&app, post_json("/changes", sample_changes(), Some("s3cret"))).await;
        assert_eq!(status, StatusCode::OK);

        // Reads stay open.
        let (status, _) = send(&app, get("/types")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_feeds_empty() {
        let app = app(Config::default());
        let (status, body) = send(&app, get("/feeds")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["feeds"], json!([]));
    }
}
