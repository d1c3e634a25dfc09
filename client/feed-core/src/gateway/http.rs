//! REST binding of [`FeedGateway`]
//!
//! Talks to the `/api/*` routes of the feed web app. Deadlines are enforced
//! one level up by the network client, not here.
//!
//! Users are addressed by their row UUID: `/api/users/{id}` and the
//! `userId` page filter must resolve that id on the host. Hosts whose routes
//! key users by an identity-provider handle put a UUID-resolving route in
//! front. `GET /api/comments?postId=` is not part of the web app's own
//! surface; hosts that call [`FeedGateway::fetch_comments`] supply it.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use resilience::TransportError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use super::FeedGateway;
use crate::domain::{Comment, Page, PageRequest, Post, PostDraft, Profile};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostsEnvelope {
    posts: Vec<Post>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Deserialize)]
struct PostEnvelope {
    post: Post,
}

#[derive(Deserialize)]
struct CommentEnvelope {
    comment: Comment,
}

#[derive(Deserialize)]
struct CommentsEnvelope {
    comments: Vec<Comment>,
}

#[derive(Deserialize)]
struct UserEnvelope {
    user: Profile,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for the feed REST surface
#[derive(Clone)]
pub struct HttpFeedGateway {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpFeedGateway {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let client = Client::builder()
            .build()
            .map_err(|e| TransportError::Network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        info!(base_url = %base_url, "Feed HTTP gateway initialized");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer_token: None,
        }
    }

    /// Session token forwarded as `Authorization: Bearer ..`
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, TransportError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| TransportError::Network(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .text()
            .await
            .ok()
            .and_then(|body| serde_json::from_str::<ErrorBody>(&body).ok())
            .map(|body| body.error);
        debug!(status = status.as_u16(), message = ?message, "Feed API error response");
        Err(TransportError::Http {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, TransportError> {
        let response = self.send(request).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(format!("Failed to read body: {}", e)))?;
        serde_json::from_slice(&body)
            .map_err(|e| TransportError::Malformed(format!("Parse failed: {}", e)))
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<(), TransportError> {
        self.send(request).await.map(|_| ())
    }
}

#[async_trait]
impl FeedGateway for HttpFeedGateway {
    async fn fetch_page(&self, request: PageRequest) -> Result<Page, TransportError> {
        let mut query = vec![
            ("limit", request.limit.to_string()),
            ("offset", request.offset.to_string()),
        ];
        if let Some(author_id) = request.author_id {
            query.push(("userId", author_id.to_string()));
        }

        let envelope: PostsEnvelope = self
            .send_json(self.client.get(self.url("/api/posts")).query(&query))
            .await?;
        Ok(Page {
            items: envelope.posts,
            took_all: !envelope.has_more,
        })
    }

    async fn fetch_post(&self, post_id: Uuid) -> Result<Post, TransportError> {
        let envelope: PostEnvelope = self
            .send_json(
                self.client
                    .get(self.url("/api/posts"))
                    .query(&[("postId", post_id.to_string())]),
            )
            .await?;
        Ok(envelope.post)
    }

    async fn fetch_profile(&self, user_id: Uuid) -> Result<Profile, TransportError> {
        let envelope: UserEnvelope = self
            .send_json(self.client.get(self.url(&format!("/api/users/{}", user_id))))
            .await?;
        Ok(envelope.user)
    }

    async fn fetch_comments(&self, post_id: Uuid) -> Result<Vec<Comment>, TransportError> {
        let envelope: CommentsEnvelope = self
            .send_json(
                self.client
                    .get(self.url("/api/comments"))
                    .query(&[("postId", post_id.to_string())]),
            )
            .await?;
        Ok(envelope.comments)
    }

    async fn create_like(&self, post_id: Uuid) -> Result<(), TransportError> {
        self.send_empty(
            self.client
                .post(self.url("/api/likes"))
                .json(&json!({ "postId": post_id })),
        )
        .await
    }

    async fn delete_like(&self, post_id: Uuid) -> Result<(), TransportError> {
        self.send_empty(
            self.client
                .delete(self.url("/api/likes"))
                .query(&[("postId", post_id.to_string())]),
        )
        .await
    }

    async fn create_follow(&self, target_id: Uuid) -> Result<(), TransportError> {
        self.send_empty(
            self.client
                .post(self.url("/api/follows"))
                .json(&json!({ "followingId": target_id })),
        )
        .await
    }

    async fn delete_follow(&self, target_id: Uuid) -> Result<(), TransportError> {
        self.send_empty(
            self.client
                .delete(self.url("/api/follows"))
                .query(&[("followingId", target_id.to_string())]),
        )
        .await
    }

    async fn create_comment(
        &self,
        post_id: Uuid,
        content: String,
    ) -> Result<Comment, TransportError> {
        let envelope: CommentEnvelope = self
            .send_json(
                self.client
                    .post(self.url("/api/comments"))
                    .json(&json!({ "postId": post_id, "content": content })),
            )
            .await?;
        Ok(envelope.comment)
    }

    async fn delete_comment(&self, comment_id: Uuid) -> Result<(), TransportError> {
        self.send_empty(
            self.client
                .delete(self.url("/api/comments"))
                .query(&[("commentId", comment_id.to_string())]),
        )
        .await
    }

    async fn create_post(&self, draft: PostDraft) -> Result<Post, TransportError> {
        let image = Part::bytes(draft.media.bytes)
            .file_name(draft.media.file_name)
            .mime_str(&draft.media.content_type)
            .map_err(|e| TransportError::Network(format!("Invalid media type: {}", e)))?;
        let form = Form::new()
            .part("image", image)
            .text("caption", draft.caption.unwrap_or_default());

        let envelope: PostEnvelope = self
            .send_json(self.client.post(self.url("/api/posts")).multipart(form))
            .await?;
        Ok(envelope.post)
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<(), TransportError> {
        self.send_empty(self.client.delete(self.url(&format!("/api/posts/{}", post_id))))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let gateway = HttpFeedGateway::new("http://localhost:3000/").unwrap();
        assert_eq!(gateway.url("/api/posts"), "http://localhost:3000/api/posts");
    }

    #[test]
    fn test_posts_envelope_maps_has_more() {
        let envelope: PostsEnvelope =
            serde_json::from_value(serde_json::json!({ "posts": [], "hasMore": false })).unwrap();
        assert!(envelope.posts.is_empty());
        assert!(!envelope.has_more);
    }
}
