//! Post storage API (`/posts`)

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use super::{expect_status, http_client, Timed};
use crate::error::E2eResult;
use crate::expect_that;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    pub body: String,
    pub user_id: u64,
}

impl NewPost {
    pub fn new(title: impl Into<String>, body: impl Into<String>, user_id: u64) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            user_id,
        }
    }
}

/// A stored post as echoed back by the API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub user_id: Option<u64>,
}

impl Post {
    /// Check the created post carries a fresh id and the submitted fields
    pub fn verify_echo(&self, sent: &NewPost) -> E2eResult<()> {
        expect_that!(
            matches!(self.id, Some(id) if id > 0),
            "expected a positive generated id, got {:?}",
            self.id
        );
        expect_that!(
            self.title.as_deref() == Some(sent.title.as_str()),
            "expected title '{}', got {:?}",
            sent.title,
            self.title
        );
        expect_that!(
            self.body.as_deref() == Some(sent.body.as_str()),
            "expected body '{}', got {:?}",
            sent.body,
            self.body
        );
        expect_that!(
            self.user_id == Some(sent.user_id),
            "expected userId {}, got {:?}",
            sent.user_id,
            self.user_id
        );
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PostsClient {
    http: reqwest::Client,
    base_url: String,
}

impl PostsClient {
    pub fn new(base_url: &str) -> E2eResult<Self> {
        Ok(Self {
            http: http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn posts_url(&self) -> String {
        format!("{}/posts", self.base_url)
    }

    /// Create a post; expects 201 Created
    pub async fn create(&self, post: &NewPost) -> E2eResult<Timed<Post>> {
        let url = self.posts_url();
        let start = Instant::now();

        let response = self.http.post(&url).json(post).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let elapsed = start.elapsed();

        debug!("POST {} -> {} in {:?}", url, status, elapsed);
        expect_status(&url, status, StatusCode::CREATED)?;

        Ok(Timed {
            status,
            elapsed,
            body: serde_json::from_slice(&bytes)?,
        })
    }
}
