use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::FeedError;

/// Post author as embedded in feed payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: Uuid,
    pub name: String,
}

/// Post entity - an image post with its derived counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    #[serde(rename = "user_id")]
    pub author_id: Uuid,
    pub image_url: String,
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub likes_count: u64,
    #[serde(default)]
    pub comments_count: u64,
    /// Viewer's like state; `None` when the payload did not carry it
    #[serde(default, rename = "is_liked", skip_serializing_if = "Option::is_none")]
    pub viewer_has_liked: Option<bool>,
    #[serde(default, rename = "user", skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorSummary>,
}

/// Comment entity - chronological, append-at-tail per post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    #[serde(rename = "user_id")]
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Locally appended, not yet confirmed by the server
    #[serde(skip)]
    pub provisional: bool,
}

/// Profile entity - user with follow/post counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub posts_count: u64,
    #[serde(default)]
    pub followers_count: u64,
    #[serde(default)]
    pub following_count: u64,
    /// Whether the viewer follows this profile; `None` when unknown
    #[serde(default, rename = "is_following", skip_serializing_if = "Option::is_none")]
    pub viewer_follows: Option<bool>,
}

/// Like edge - at most one per (post, actor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LikeEdge {
    pub post_id: Uuid,
    pub actor_id: Uuid,
}

/// Follow edge - at most one per ordered pair, never a self-edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FollowEdge {
    follower_id: Uuid,
    followee_id: Uuid,
}

impl FollowEdge {
    pub fn new(follower_id: Uuid, followee_id: Uuid) -> Result<Self, FeedError> {
        if follower_id == followee_id {
            return Err(FeedError::Validation("cannot follow yourself".to_string()));
        }
        Ok(Self {
            follower_id,
            followee_id,
        })
    }

    pub fn follower_id(&self) -> Uuid {
        self.follower_id
    }

    pub fn followee_id(&self) -> Uuid {
        self.followee_id
    }
}

/// Anything the cache tracks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Post(Post),
    Comment(Comment),
    Profile(Profile),
}

impl Entity {
    pub fn key(&self) -> EntityKey {
        match self {
            Entity::Post(p) => EntityKey::Post(p.id),
            Entity::Comment(c) => EntityKey::Comment(c.id),
            Entity::Profile(p) => EntityKey::Profile(p.id),
        }
    }
}

/// Cache key of one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Post(Uuid),
    Comment(Uuid),
    Profile(Uuid),
}

impl EntityKey {
    pub fn id(&self) -> Uuid {
        match self {
            EntityKey::Post(id) | EntityKey::Comment(id) | EntityKey::Profile(id) => *id,
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Post(id) => write!(f, "post:{}", id),
            EntityKey::Comment(id) => write!(f, "comment:{}", id),
            EntityKey::Profile(id) => write!(f, "profile:{}", id),
        }
    }
}

/// Derived counters that the cache can adjust
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterField {
    Likes,
    Comments,
    Posts,
    Followers,
    Following,
}

impl CounterField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterField::Likes => "likes_count",
            CounterField::Comments => "comments_count",
            CounterField::Posts => "posts_count",
            CounterField::Followers => "followers_count",
            CounterField::Following => "following_count",
        }
    }
}

/// Which collection a cursor pages over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedFilter {
    /// Home feed, newest first
    #[default]
    All,
    /// One author's posts (profile grid)
    Author(Uuid),
}

impl FeedFilter {
    pub fn author_id(&self) -> Option<Uuid> {
        match self {
            FeedFilter::All => None,
            FeedFilter::Author(id) => Some(*id),
        }
    }
}

/// Arguments of one page read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
    pub author_id: Option<Uuid>,
}

/// One page of server-ordered posts
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Page {
    pub items: Vec<Post>,
    /// Server hint that the collection is exhausted
    pub took_all: bool,
}

/// Image attached to a new post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// New post before upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub caption: Option<String>,
    pub media: MediaUpload,
}
