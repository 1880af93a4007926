//! Tribe REST client for stories
//!
//! Consumed endpoints:
//! - `GET /api/stories` → story groups
//! - `POST /stories/{id}/like` → `{liked, likes_count}`
//! - `GET /stories/{id}/like-status` → `{liked, likes_count}`
//!
//! No request is ever retried; each failure is returned to the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use tribe_common::models::{retain_playable, LikeStatus, StoryGroup};

use super::csrf::{extract_csrf_token, CSRF_HEADER};
use crate::error::{Error, Result};
use crate::likes::LikeApi;

const USER_AGENT: &str = concat!("tribe-stories/", env!("CARGO_PKG_VERSION"));

/// Longest error body kept in `Error::Api`
const MAX_ERROR_BODY: usize = 512;

/// HTTP client for the stories endpoints
#[derive(Debug, Clone)]
pub struct StoriesClient {
    http: reqwest::Client,
    base_url: String,
    csrf_token: Option<String>,
}

impl StoriesClient {
    /// Create a client for `base_url` (e.g. `https://tribe.dev`)
    pub fn new(base_url: &str, csrf_token: Option<String>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            csrf_token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }

    pub fn set_csrf_token(&mut self, token: Option<String>) {
        self.csrf_token = token;
    }

    /// Fetch a page and pull the CSRF token out of its meta tag
    pub async fn fetch_csrf_token(&self, page_path: &str) -> Result<String> {
        let url = self.url(page_path);
        debug!(url = %url, "Fetching CSRF token");
        let response = self
            .http
            .get(&url)
            .header(ACCEPT, "text/html")
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        let response = check_status(response).await?;
        let html = response
            .text()
            .await
            .map_err(|e| Error::Decode(e.to_string()))?;
        extract_csrf_token(&html)
            .ok_or_else(|| Error::Decode(format!("No csrf-token meta tag in {}", page_path)))
    }

    /// `GET /api/stories`; groups without stories are dropped
    pub async fn fetch_stories(&self) -> Result<Vec<StoryGroup>> {
        let url = self.url("/api/stories");
        debug!(url = %url, "Fetching stories");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        let groups: Vec<StoryGroup> = decode(response).await?;
        let fetched = groups.len();
        let groups = retain_playable(groups);
        if groups.len() != fetched {
            debug!(dropped = fetched - groups.len(), "Dropped empty story groups");
        }
        Ok(groups)
    }

    /// `POST /stories/{id}/like`
    pub async fn toggle_like(&self, story_id: u64) -> Result<LikeStatus> {
        let url = self.url(&format!("/stories/{}/like", story_id));
        let mut request = self.http.post(&url);
        match &self.csrf_token {
            Some(token) => request = request.header(CSRF_HEADER, token),
            None => warn!(story_id, "Sending like without CSRF token"),
        }
        debug!(url = %url, "Toggling like");
        let response = request
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        decode(response).await
    }

    /// `GET /stories/{id}/like-status`
    pub async fn like_status(&self, story_id: u64) -> Result<LikeStatus> {
        let url = self.url(&format!("/stories/{}/like-status", story_id));
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        decode(response).await
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl LikeApi for StoriesClient {
    async fn toggle_like(&self, story_id: u64) -> Result<LikeStatus> {
        StoriesClient::toggle_like(self, story_id).await
    }

    async fn like_status(&self, story_id: u64) -> Result<LikeStatus> {
        StoriesClient::like_status(self, story_id).await
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let mut message = response.text().await.unwrap_or_default();
    if message.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !message.is_char_boundary(cut) {
            cut -= 1;
        }
        message.truncate(cut);
    }
    if message.is_empty() {
        message = status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string();
    }
    // 419: Laravel's "page expired", i.e. a stale or missing CSRF token
    if status.as_u16() == 419 || status == StatusCode::FORBIDDEN {
        warn!(status = status.as_u16(), "Backend rejected request; CSRF token may be stale");
    }
    Err(Error::Api {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = check_status(response).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| Error::Decode(e.to_string()))
}
