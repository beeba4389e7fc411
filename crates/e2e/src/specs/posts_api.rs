//! Post creation against the post store

use std::sync::Arc;

use super::POSTS_API_PROJECT;
use crate::api::{NewPost, PostsClient};
use crate::config::Endpoints;
use crate::error::E2eResult;
use crate::harness::Suite;
use crate::logger::TestLogger;

/// Payloads sent by each case
pub fn cases() -> Vec<(&'static str, NewPost)> {
    vec![
        (
            "POST - Create new post",
            NewPost::new(
                "Test Automation Post",
                "This is a test post created by automation testing framework",
                1,
            ),
        ),
        (
            "POST - Create post with empty body",
            NewPost::new("Post with empty body", "", 2),
        ),
        (
            "POST - Create post with different user",
            NewPost::new("User 10 Test Post", "Testing with different user ID", 10),
        ),
    ]
}

pub fn register(suite: &mut Suite, endpoints: &Endpoints) {
    let posts_url: Arc<str> = Arc::from(endpoints.posts_url.as_str());

    for (name, payload) in cases() {
        let posts_url = Arc::clone(&posts_url);
        suite.test::<TestLogger, _, _>(POSTS_API_PROJECT, name, move |_ctx, logger| {
            let posts_url = Arc::clone(&posts_url);
            let payload = payload.clone();
            async move { create(&posts_url, &payload, logger).await }
        });
    }
}

async fn create(posts_url: &str, payload: &NewPost, logger: TestLogger) -> E2eResult<()> {
    let client = PostsClient::new(posts_url)?;
    let created = client.create(payload).await?.body;
    created.verify_echo(payload)?;

    logger.log(format!(
        "Created post for user {} with ID: {}",
        payload.user_id,
        created.id.unwrap_or_default()
    ));
    logger.end();
    Ok(())
}
