// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::Fixture;
use axum::body::{to_bytes, Body};
use axum::http::Request;
use hv_core::{HealPhase, HealStatus};
use hv_engine::test_support::{FakePlatform, FakeSession};
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt;

struct Api {
    fixture: Fixture,
    state: Arc<AppState>,
}

impl Api {
    fn new(platform: FakePlatform) -> Self {
        Self::with_session(platform, FakeSession::new(Duration::ZERO))
    }

    fn with_session(platform: FakePlatform, session: FakeSession) -> Self {
        let fixture = Fixture::new(platform);
        let state = Arc::new(AppState {
            engine: fixture.engine(),
            queue: InteractionQueue::new(session, 1, SystemClock),
        });
        Self { fixture, state }
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = router(Arc::clone(&self.state)).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }
}

fn search_body(target: &str) -> Value {
    json!({ "target": target, "role": "engineer", "credentialsRef": "cred-test" })
}

#[tokio::test]
async fn health_is_ok() {
    let api = Api::new(FakePlatform::new());
    let response = router(Arc::clone(&api.state))
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn completed_search_reports_stats() {
    let api = Api::new(FakePlatform::new().with_last_page(1, &["a", "b"]));

    let (status, body) = api.post("/search", search_body("Acme")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["analyzed"], 2);
    assert_eq!(body["classified"], 0);
    assert!(body["jobId"].as_str().unwrap().starts_with("job-"));
    assert_eq!(api.fixture.platform.resolve_calls(), 1);
}

#[tokio::test]
async fn search_that_hands_off_answers_healing() {
    let api = Api::new(FakePlatform::new());

    let (status, body) = api.post("/search", search_body("Acme")).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "healing");
    assert_eq!(body["healPhase"], "enumeration");
    let launched = api.fixture.launcher.launched();
    assert_eq!(launched.len(), 1);
    assert_eq!(body["checkpoint"], launched[0].as_str());
}

#[tokio::test]
async fn rejected_credentials_answer_unauthorized() {
    let api = Api::new(FakePlatform::new().rejecting_credentials());

    let (status, body) = api.post("/search", search_body("Acme")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn invalid_search_is_rejected() {
    let api = Api::new(FakePlatform::new());
    let bodies = [
        json!({ "target": "", "credentialsRef": "cred-test" }),
        json!({ "target": "   ", "credentialsRef": "cred-test" }),
        json!({ "target": "Acme", "credentialsRef": "" }),
    ];

    for body in bodies {
        let (status, _) = api.post("/search", body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    }
    assert_eq!(api.fixture.platform.resolve_calls(), 0);
}

#[tokio::test]
async fn heal_status_shows_pending_session() {
    let api = Api::new(FakePlatform::new());
    let (status, body) = api.get("/heal-restore/status").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["session"].is_null());

    let job = JobState::builder().heal_phase(HealPhase::ItemAnalysis).build();
    let session = api.state.engine.gate.open(&job).await.unwrap();

    let (_, body) = api.get("/heal-restore/status").await;
    assert_eq!(body["session"]["id"], session.id.as_str());
    assert_eq!(body["session"]["heal_phase"], "item-analysis");
}

#[tokio::test]
async fn authorize_resolves_once() {
    let api = Api::new(FakePlatform::new());
    let job = JobState::builder().heal_phase(HealPhase::Enumeration).build();
    let session = api.state.engine.gate.open(&job).await.unwrap();
    let request = json!({ "sessionId": session.id, "autoApprove": true });

    let (status, body) = api.post("/heal-restore/authorize", request.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["session"]["status"], "authorized");
    assert!(api.fixture.heal_store().policy().unwrap().allows("cred-test"));

    let (status, _) = api.post("/heal-restore/authorize", request).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn cancel_marks_session_cancelled() {
    let api = Api::new(FakePlatform::new());
    let job = JobState::builder().heal_phase(HealPhase::Enumeration).build();
    let session = api.state.engine.gate.open(&job).await.unwrap();

    let (status, body) =
        api.post("/heal-restore/cancel", json!({ "sessionId": session.id })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"]["status"], "cancelled");
    let stored = api.fixture.heal_store().get(&session.id).unwrap();
    assert_eq!(stored.status, HealStatus::Cancelled);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let api = Api::new(FakePlatform::new());

    for uri in ["/heal-restore/authorize", "/heal-restore/cancel"] {
        let (status, _) = api.post(uri, json!({ "sessionId": "heal-missing" })).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn actions_run_through_the_queue() {
    let api = Api::new(FakePlatform::new());

    let (status, body) = api
        .post("/actions/send-message", json!({ "recipient": "r1", "message": "hello" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["performed"], "send-message");

    let (status, body) = api.post("/actions/add-connection", json!({ "profile": "p1" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["performed"], "add-connection");

    let (status, body) = api.get("/queue").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn failed_action_is_bad_gateway() {
    let session = FakeSession::new(Duration::ZERO).failing_on("create-post");
    let api = Api::with_session(FakePlatform::new(), session);

    let (status, body) = api.post("/actions/create-post", json!({ "content": "hi" })).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("create-post failed"));
}
