//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers); tighten for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/game", post(http::http_new_game))
        .route("/api/v1/ask", post(http::http_post_ask))
        .route("/api/v1/reveal", post(http::http_post_reveal))
        .route("/api/v1/history", get(http::http_get_history))
        .route("/api/v1/oracle", post(http::http_post_oracle))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;
    use wiremock::MockServer;

    use super::*;
    use crate::config::GameConfig;
    use crate::deepseek::test_support::{client_for, reply_with};

    async fn call(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_llm_state() {
        let app = build_router(Arc::new(AppState::with_parts(None, GameConfig::default())));
        let (status, body) = call(app, Request::get("/api/v1/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "ok": true, "llm": false, "games": 0 }));
    }

    #[tokio::test]
    async fn new_game_without_key_is_503() {
        let app = build_router(Arc::new(AppState::with_parts(None, GameConfig::default())));
        let (status, body) = call(app, Request::post("/api/v1/game").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn full_game_over_http() {
        let server = MockServer::start().await;
        reply_with(&server, "谜题：门开着。\n核心条件：1.风很大 2.没人在家\n汤底：风把门吹开了。").await;
        let state = Arc::new(AppState::with_parts(Some(client_for(&server)), GameConfig::default()));

        let (status, game) = call(build_router(state.clone()), Request::post("/api/v1/game").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(game["puzzle"], "门开着。");
        assert_eq!(game["conditionCount"], 2);
        assert!(game.get("solution").is_none());
        let id = game["id"].as_str().unwrap().to_string();

        server.reset().await;
        reply_with(&server, "是").await;
        let (status, answer) = call(
            build_router(state.clone()),
            post_json("/api/v1/ask", serde_json::json!({ "gameId": id, "question": "有风吗？" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(answer["answer"], "是");
        assert_eq!(answer["verdict"], "yes");
        assert_eq!(answer["isCorrect"], false);
        assert_eq!(answer["questionsAsked"], 1);

        let (status, hist) = call(
            build_router(state.clone()),
            Request::get(format!("/api/v1/history?gameId={id}")).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(hist["turns"].as_array().unwrap().len(), 2);
        assert_eq!(hist["turns"][0]["role"], "user");

        let (status, revealed) = call(
            build_router(state),
            post_json("/api/v1/reveal", serde_json::json!({ "gameId": id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(revealed["solution"], "风把门吹开了。");
    }

    #[tokio::test]
    async fn upstream_failure_is_generic_502() {
        let server = MockServer::start().await;
        let state = Arc::new(AppState::with_parts(Some(client_for(&server)), GameConfig::default()));
        let (status, body) = call(build_router(state), Request::post("/api/v1/game").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], crate::error::GENERATION_FAILED_MSG);
    }

    #[tokio::test]
    async fn unknown_game_is_404() {
        let server = MockServer::start().await;
        let state = Arc::new(AppState::with_parts(Some(client_for(&server)), GameConfig::default()));
        let (status, _) = call(
            build_router(state),
            post_json("/api/v1/ask", serde_json::json!({ "gameId": "missing", "question": "q" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn stateless_oracle_normalizes_reply() {
        let server = MockServer::start().await;
        reply_with(&server, "maybe").await;
        let state = Arc::new(AppState::with_parts(Some(client_for(&server)), GameConfig::default()));
        let (status, body) = call(
            build_router(state),
            post_json(
                "/api/v1/oracle",
                serde_json::json!({
                    "puzzle": "谜面",
                    "solution": "汤底",
                    "conditions": ["条件"],
                    "history": [{ "role": "user" }, { "role": "user", "content": "问一" }],
                    "question": "问二"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "无法回答");
        assert_eq!(body["verdict"], "cannot_determine");
    }
}
