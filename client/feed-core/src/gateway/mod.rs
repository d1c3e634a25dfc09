//! Collaborator interfaces consumed by the consistency layer
//!
//! Storage, identity and object storage live behind these traits. The core
//! never assumes a transport; [`http::HttpFeedGateway`] is the REST binding.

pub mod http;

use async_trait::async_trait;
use resilience::TransportError;
use uuid::Uuid;

use crate::domain::{Comment, Page, PageRequest, Post, PostDraft, Profile};

pub use http::HttpFeedGateway;

/// Read and write operations against the feed's storage layer
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedGateway: Send + Sync {
    /// Server-ordered window over posts, optionally limited to one author
    async fn fetch_page(&self, request: PageRequest) -> Result<Page, TransportError>;

    async fn fetch_post(&self, post_id: Uuid) -> Result<Post, TransportError>;

    async fn fetch_profile(&self, user_id: Uuid) -> Result<Profile, TransportError>;

    /// Comments of one post, oldest first
    async fn fetch_comments(&self, post_id: Uuid) -> Result<Vec<Comment>, TransportError>;

    async fn create_like(&self, post_id: Uuid) -> Result<(), TransportError>;

    async fn delete_like(&self, post_id: Uuid) -> Result<(), TransportError>;

    async fn create_follow(&self, target_id: Uuid) -> Result<(), TransportError>;

    async fn delete_follow(&self, target_id: Uuid) -> Result<(), TransportError>;

    async fn create_comment(&self, post_id: Uuid, content: String)
        -> Result<Comment, TransportError>;

    async fn delete_comment(&self, comment_id: Uuid) -> Result<(), TransportError>;

    /// Uploads the image and creates the post record
    async fn create_post(&self, draft: PostDraft) -> Result<Post, TransportError>;

    /// Deletes the post and releases its stored image
    async fn delete_post(&self, post_id: Uuid) -> Result<(), TransportError>;
}

/// Session identity
#[cfg_attr(test, mockall::automock)]
pub trait IdentityProvider: Send + Sync {
    /// `None` means not signed in
    fn current_actor_id(&self) -> Option<Uuid>;
}

/// Fixed identity, for hosts that resolve the actor once per session
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticIdentity(pub Option<Uuid>);

impl IdentityProvider for StaticIdentity {
    fn current_actor_id(&self) -> Option<Uuid> {
        self.0
    }
}
