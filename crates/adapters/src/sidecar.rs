// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the browser-automation sidecar.
//!
//! The sidecar owns the browser and the platform-specific page navigation.
//! This client speaks its small JSON API:
//!
//! | route              | body                                  | response              |
//! |--------------------|---------------------------------------|-----------------------|
//! | `POST /resolve`    | credentials ref + filters             | `ResolvedTarget`      |
//! | `POST /pages`      | resolved target, role, page number    | `EnumerationPage`     |
//! | `POST /activity`   | item id, sample index                 | `{sample: .. / null}` |
//! | `POST /actions`    | one `Interaction`                     | action result (JSON)  |
//!
//! Requests carry `Authorization: Bearer <token>` when a token is configured.

use async_trait::async_trait;
use hv_core::{ActivitySample, Interaction, SearchFilters};
use hv_engine::{AutomationSession, EnumerationPage, Platform, PlatformError, ResolvedTarget};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum SidecarError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Serialize)]
struct ResolveRequest<'a> {
    credentials_ref: &'a str,
    #[serde(flatten)]
    filters: &'a SearchFilters,
}

#[derive(Serialize)]
struct PageRequest<'a> {
    #[serde(flatten)]
    target: &'a ResolvedTarget,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    page: usize,
}

#[derive(Serialize)]
struct ActivityRequest<'a> {
    item_id: &'a str,
    index: usize,
}

#[derive(Deserialize)]
struct ActivityResponse {
    #[serde(default)]
    sample: Option<ActivitySample>,
}

/// Read-side sidecar driver implementing [`Platform`].
#[derive(Clone)]
pub struct SidecarClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl SidecarClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self, SidecarError> {
        let client = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Session for interactive actions. Hand it to an `InteractionQueue`.
    pub fn session(&self) -> SidecarSession {
        SidecarSession { client: self.clone() }
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, PlatformError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        let mut request = self.client.post(&url).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| PlatformError::Request(format!("POST {path}: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            tracing::debug!(path, status = status.as_u16(), %message, "sidecar request rejected");
            return Err(status_error(status, message));
        }
        resp.json()
            .await
            .map_err(|e| PlatformError::Request(format!("POST {path}: invalid response: {e}")))
    }
}

fn status_error(status: StatusCode, message: String) -> PlatformError {
    let message = if message.is_empty() { status.to_string() } else { message };
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PlatformError::Auth(message),
        StatusCode::TOO_MANY_REQUESTS => PlatformError::RateLimited(message),
        StatusCode::NOT_FOUND => PlatformError::NotFound(message),
        _ => PlatformError::Request(format!("status {}: {message}", status.as_u16())),
    }
}

#[async_trait]
impl Platform for SidecarClient {
    async fn resolve_target(
        &self,
        credentials_ref: &str,
        filters: &SearchFilters,
    ) -> Result<ResolvedTarget, PlatformError> {
        self.post("/resolve", &ResolveRequest { credentials_ref, filters }).await
    }

    async fn fetch_page(
        &self,
        target: &ResolvedTarget,
        role: Option<&str>,
        page: usize,
    ) -> Result<EnumerationPage, PlatformError> {
        self.post("/pages", &PageRequest { target, role, page }).await
    }

    async fn activity_sample(
        &self,
        item_id: &str,
        index: usize,
    ) -> Result<Option<ActivitySample>, PlatformError> {
        let resp: ActivityResponse = self.post("/activity", &ActivityRequest { item_id, index }).await?;
        Ok(resp.sample)
    }
}

/// The sidecar's live browser session, driven by interactive actions.
pub struct SidecarSession {
    client: SidecarClient,
}

#[async_trait]
impl AutomationSession for SidecarSession {
    async fn perform(&self, action: &Interaction) -> Result<serde_json::Value, PlatformError> {
        self.client.post("/actions", action).await
    }
}

#[cfg(test)]
#[path = "sidecar_tests.rs"]
mod tests;
