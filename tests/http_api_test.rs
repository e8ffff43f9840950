//! Tests for the REST routes.

mod common;

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use common::TestStore;
use serde_json::{Value, json};
use strictly_mancala::{GameServer, GameStore};
use tower::ServiceExt;

fn app(store: &Arc<TestStore>) -> Router {
    let store: Arc<dyn GameStore> = store.clone();
    GameServer::new(store).router()
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let store = TestStore::new();
    let (status, body) = call(&app(&store), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_users_get_or_create() {
    let store = TestStore::new();
    let app = app(&store);

    let (status, first) = call(&app, Method::POST, "/users", Some(json!({"username": "ada"}))).await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = call(&app, Method::POST, "/users", Some(json!({"username": "ada"}))).await;
    assert_eq!(first["id"], second["id"]);
    assert_eq!(first["gamesPlayed"], 0);

    let (status, _) = call(&app, Method::POST, "/users", Some(json!({"username": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats_route() {
    let store = TestStore::new();
    let app = app(&store);

    let (status, _) = call(&app, Method::GET, "/users/ghost/stats", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    call(&app, Method::POST, "/users", Some(json!({"username": "bea"}))).await;
    let (status, body) = call(&app, Method::GET, "/users/bea/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "bea");
    assert_eq!(body["gamesPlayed"], 0);
    assert_eq!(body["winRate"], 0.0);
}

#[tokio::test]
async fn test_game_lifecycle_routes() {
    let store = TestStore::new();
    let app = app(&store);

    let (_, p1) = call(&app, Method::POST, "/users", Some(json!({"username": "cy"}))).await;
    let (_, p2) = call(&app, Method::POST, "/users", Some(json!({"username": "di"}))).await;

    let (status, game) = call(
        &app,
        Method::POST,
        "/games",
        Some(json!({"roomName": "pit", "playerId": p1["id"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(game["status"], "waiting");

    let (status, _) = call(
        &app,
        Method::POST,
        "/games",
        Some(json!({"roomName": "pit", "playerId": p1["id"]})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, waiting) = call(&app, Method::GET, "/games", None).await;
    assert_eq!(waiting.as_array().unwrap().len(), 1);

    let (status, started) = call(
        &app,
        Method::POST,
        "/games/pit/join",
        Some(json!({"playerId": p2["id"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["status"], "inProgress");
    assert_eq!(started["player2"]["username"], "di");

    let (_, waiting) = call(&app, Method::GET, "/games", None).await;
    assert!(waiting.as_array().unwrap().is_empty());

    let (status, fetched) = call(&app, Method::GET, "/games/pit", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["roomName"], "pit");
    assert_eq!(fetched["player1"]["username"], "cy");

    let (status, _) = call(&app, Method::GET, "/games/nowhere", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_messages_route() {
    let store = TestStore::new();
    let app = app(&store);

    let (status, stored) = call(
        &app,
        Method::POST,
        "/messages",
        Some(json!({"message": "gg", "username": "eve", "url": "https://example.org/a.svg"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["message"], "gg");
    assert_eq!(stored["url"], "https://example.org/a.svg");

    let (status, _) = call(
        &app,
        Method::POST,
        "/messages",
        Some(json!({"message": "", "username": "eve"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
