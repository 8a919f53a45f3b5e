use std::sync::Arc;

use arena_storage::repository::MemoryRatingStore;
use arena_storage::{Arena, EloSettings};
use arena_web::middleware::auth::ApiKeys;
use arena_web::{AppState, build_router};
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

fn test_app() -> Router {
    let arena = Arena::new(Arc::new(MemoryRatingStore::new()), EloSettings::default()).unwrap();
    build_router(AppState::new(
        arena,
        ApiKeys::from_comma_separated("secret"),
    ))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn vote_request(study: &str, model1: &str, model2: &str, winner: &str) -> Request<Body> {
    let body = json!({
        "model1": model1,
        "model2": model2,
        "winner": winner,
        "image1": format!("gs://arena/{model1}.png"),
        "image2": format!("gs://arena/{model2}.png"),
        "prompt": "a watercolor harbor at sunrise",
    });

    Request::builder()
        .method("POST")
        .uri(format!("/api/studies/{study}/votes"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let response = test_app().oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["fleet_mirror"], false);
}

#[tokio::test]
async fn test_record_vote_returns_receipt() {
    let response = test_app()
        .oneshot(vote_request("demo", "imagenA", "imagenB", "imagenA"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["study"], "demo");
    assert_eq!(body["model1_rating"], 1016.0);
    assert_eq!(body["model2_rating"], 984.0);
    assert_eq!(body["mirror"]["status"], "disabled");
}

#[tokio::test]
async fn test_leaderboard_reflects_votes() {
    let app = test_app();

    for (model1, model2, winner) in [
        ("imagenA", "imagenB", "imagenA"),
        ("imagenA", "imagenC", "imagenC"),
    ] {
        let response = app
            .clone()
            .oneshot(vote_request("demo", model1, model2, winner))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .oneshot(get("/api/studies/demo/leaderboard"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let models: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["model"].as_str().unwrap())
        .collect();
    assert_eq!(models, vec!["imagenC", "imagenA", "imagenB"]);
    assert_eq!(body[0]["rank"], 1);
    assert_eq!(body[0]["rating"], 1016.74);
}

#[tokio::test]
async fn test_leaderboard_of_unknown_study_is_empty() {
    let response = test_app()
        .oneshot(get("/api/studies/nobody/leaderboard"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn test_invalid_winner_is_rejected() {
    let app = test_app();
    let response = app
        .clone()
        .oneshot(vote_request("demo", "imagenA", "imagenB", "imagenZ"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());

    let response = app
        .oneshot(get("/api/studies/demo/leaderboard"))
        .await
        .unwrap();
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn test_recent_votes_limit() {
    let app = test_app();

    for winner in ["imagenA", "imagenB", "imagenA"] {
        app.clone()
            .oneshot(vote_request("demo", "imagenA", "imagenB", winner))
            .await
            .unwrap();
    }

    let response = app
        .clone()
        .oneshot(get("/api/studies/demo/votes?limit=2"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["winner"], "imagenA");

    let response = app
        .oneshot(get("/api/studies/demo/votes?limit=0"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_requires_api_key() {
    let app = test_app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/admin/studies/demo")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/admin/studies/demo/recompute")
                .header(header::AUTHORIZATION, "Bearer wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_purge_clears_leaderboard() {
    let app = test_app();
    app.clone()
        .oneshot(vote_request("demo", "imagenA", "imagenB", "imagenA"))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/admin/studies/demo")
                .header(header::AUTHORIZATION, "Bearer secret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "study": "demo", "purged": true })
    );

    let response = app
        .oneshot(get("/api/studies/demo/leaderboard"))
        .await
        .unwrap();
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn test_recompute_reports_replayed_votes() {
    let app = test_app();
    app.clone()
        .oneshot(vote_request("demo", "imagenA", "imagenB", "imagenB"))
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/admin/studies/demo/recompute")
                .header(header::AUTHORIZATION, "Bearer secret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["votes_replayed"], 1);
    assert_eq!(body["models"], 2);
}

#[tokio::test]
async fn test_model_history_without_mirror_is_empty() {
    let response = test_app()
        .oneshot(get("/api/models/imagenA/ratings"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let response = test_app()
        .oneshot(get("/api-docs/openapi.json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["paths"]["/api/studies/{study}/votes"].is_object());
}
