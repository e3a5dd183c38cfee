// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use axum::http::{HeaderMap, StatusCode as HttpStatus};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}")
}

fn fake_sidecar() -> Router {
    Router::new()
        .route(
            "/resolve",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["credentials_ref"], "cred-1");
                let target = body["target"].as_str().unwrap_or_default().to_lowercase();
                Json(json!({ "entity_id": format!("ent-{target}") }))
            }),
        )
        .route(
            "/pages",
            post(|Json(body): Json<Value>| async move {
                let page = body["page"].as_u64().unwrap_or_default();
                Json(json!({
                    "items": [format!("{}-{page}", body["entity_id"].as_str().unwrap_or_default())],
                    "is_last": page == 2,
                }))
            }),
        )
        .route(
            "/activity",
            post(|Json(body): Json<Value>| async move {
                match body["index"].as_u64() {
                    Some(0) => Json(json!({ "sample": { "hour": 1, "day": 0, "week": 1 } })),
                    _ => Json(json!({ "sample": null })),
                }
            }),
        )
        .route(
            "/actions",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer secret") {
                    return Err((HttpStatus::UNAUTHORIZED, "bad token"));
                }
                Ok(Json(json!({ "ok": true, "echo": body["action"] })))
            }),
        )
}

fn filters() -> SearchFilters {
    SearchFilters { target: "Acme".into(), role: Some("engineer".into()), location: None }
}

#[tokio::test]
async fn platform_calls_round_trip_through_sidecar() {
    let base = serve(fake_sidecar()).await;
    let client = SidecarClient::new(&format!("{base}/"), None).unwrap();

    let target = client.resolve_target("cred-1", &filters()).await.unwrap();
    assert_eq!(target, ResolvedTarget { entity_id: "ent-acme".into(), location_id: None });

    let page = client.fetch_page(&target, Some("engineer"), 2).await.unwrap();
    assert_eq!(page.items, vec!["ent-acme-2"]);
    assert!(page.is_last);

    let sample = client.activity_sample("ent-acme-2", 0).await.unwrap();
    assert_eq!(sample, Some(ActivitySample::new(1, 0, 1)));
    assert_eq!(client.activity_sample("ent-acme-2", 1).await.unwrap(), None);
}

#[tokio::test]
async fn session_sends_bearer_token() {
    let base = serve(fake_sidecar()).await;
    let action = Interaction::CreatePost { content: "hello".into() };

    let authed = SidecarClient::new(&base, Some("secret")).unwrap().session();
    let value = authed.perform(&action).await.unwrap();
    assert_eq!(value, json!({ "ok": true, "echo": "create-post" }));

    let anonymous = SidecarClient::new(&base, None).unwrap().session();
    let err = anonymous.perform(&action).await.unwrap_err();
    assert_eq!(err, PlatformError::Auth("bad token".into()));
}

#[tokio::test]
async fn unreachable_sidecar_is_a_request_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = SidecarClient::new(&format!("http://{addr}"), None).unwrap();
    let err = client.resolve_target("cred-1", &filters()).await.unwrap_err();
    assert!(matches!(err, PlatformError::Request(_)));
}

#[yare::parameterized(
    unauthorized = { StatusCode::UNAUTHORIZED, "auth" },
    forbidden = { StatusCode::FORBIDDEN, "auth" },
    rate_limited = { StatusCode::TOO_MANY_REQUESTS, "rate" },
    missing = { StatusCode::NOT_FOUND, "missing" },
    server_error = { StatusCode::BAD_GATEWAY, "request" },
)]
fn status_codes_map_to_platform_errors(status: StatusCode, kind: &str) {
    let err = status_error(status, "nope".to_string());
    let actual = match err {
        PlatformError::Auth(_) => "auth",
        PlatformError::RateLimited(_) => "rate",
        PlatformError::NotFound(_) => "missing",
        PlatformError::Request(_) => "request",
    };
    assert_eq!(actual, kind);
}

#[test]
fn empty_error_body_falls_back_to_status_text() {
    let err = status_error(StatusCode::TOO_MANY_REQUESTS, String::new());
    assert_eq!(err, PlatformError::RateLimited("429 Too Many Requests".into()));
}
