use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::multipart;
use serde_json::Value;
use validator::Validate;

use crate::api::ApiClient;
use crate::error::ClientError;
use crate::models::{BlogPost, NewBlogPost};
use crate::stores::AuthStore;
use crate::utils::retry::{retry_async_with_config, RetryConfig};

/// Devotional blog. Reads are public; writes are admin only and go up as
/// multipart forms because posts carry image attachments.
pub struct BlogStore {
    api: Arc<ApiClient>,
    auth: Arc<AuthStore>,
}

impl BlogStore {
    pub fn new(api: Arc<ApiClient>, auth: Arc<AuthStore>) -> Self {
        BlogStore { api, auth }
    }

    /// All posts, newest first. The list endpoint is the one place the
    /// backend returns a bare array with no envelope, so this goes through
    /// the raw read path.
    pub async fn list(&self) -> Result<Vec<BlogPost>, ClientError> {
        let body = retry_async_with_config(RetryConfig::default(), || async {
            self.api.get_raw("blog").await
        })
        .await?;
        decode_posts(&body)
    }

    /// Title and content search. A blank query returns the full list instead
    /// of hitting the search route with an empty path segment.
    pub async fn search(&self, query: &str) -> Result<Vec<BlogPost>, ClientError> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return self.list().await;
        }

        let encoded = utf8_percent_encode(trimmed, NON_ALPHANUMERIC).to_string();
        let body = self.api.get_raw(&format!("blog/search/{}", encoded)).await?;
        decode_posts(&body)
    }

    /// Publishes a post. Admin only; at most three media attachments.
    pub async fn create(&self, post: &NewBlogPost) -> Result<(), ClientError> {
        self.auth.require_admin()?;
        post.validate()?;
        let form = build_form(post)?;
        self.api.post_multipart("blog/create", form).await?;
        Ok(())
    }

    pub async fn update(&self, post_id: &str, post: &NewBlogPost) -> Result<(), ClientError> {
        self.auth.require_admin()?;
        post.validate()?;
        let form = build_form(post)?;
        self.api
            .post_multipart(&format!("blog/update/{}", post_id), form)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, post_id: &str) -> Result<(), ClientError> {
        self.auth.require_admin()?;
        self.api.delete(&format!("blog/delete/{}", post_id)).await?;
        Ok(())
    }
}

fn build_form(post: &NewBlogPost) -> Result<multipart::Form, ClientError> {
    let mut form = multipart::Form::new()
        .text("title", post.title.clone())
        .text("content", post.content.clone());

    for media in &post.media {
        let part = multipart::Part::bytes(media.bytes.clone())
            .file_name(media.file_name.clone())
            .mime_str(&media.mime_type)
            .map_err(|_| {
                ClientError::validation(format!("Invalid media type: {}", media.mime_type))
            })?;
        form = form.part("media", part);
    }
    Ok(form)
}

/// The list endpoint has served a bare array, `{blogs}` and `{data}` over
/// time; all three decode. Ordering is settled here because the backend
/// returns insertion order.
fn decode_posts(body: &Value) -> Result<Vec<BlogPost>, ClientError> {
    let list = super::array_field(body, &["blogs", "data"])
        .ok_or_else(|| ClientError::shape("no post list in response"))?;
    let mut posts: Vec<BlogPost> = serde_json::from_value(list.clone())
        .map_err(|e| ClientError::shape(format!("post list did not decode: {}", e)))?;
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(posts)
}
