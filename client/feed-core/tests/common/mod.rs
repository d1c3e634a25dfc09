//! Shared fixtures for feed-core integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use feed_core::{
    Comment, FeedConfig, FeedGateway, FeedSession, Notice, Notifier, Page, PageRequest, Post,
    PostDraft, Profile, SessionOptions, StaticIdentity,
};
use parking_lot::Mutex;
use resilience::TransportError;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use uuid::Uuid;

/// One recorded collaborator call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    FetchPage(PageRequest),
    FetchPost(Uuid),
    FetchProfile(Uuid),
    FetchComments(Uuid),
    CreateLike(Uuid),
    DeleteLike(Uuid),
    CreateFollow(Uuid),
    DeleteFollow(Uuid),
    CreateComment(Uuid, String),
    DeleteComment(Uuid),
    CreatePost,
    DeletePost(Uuid),
}

/// In-memory gateway. Calls are recorded on entry; when gated, each call
/// then waits for a permit from [`FakeGateway::release`].
pub struct FakeGateway {
    pub actor: Option<Uuid>,
    pub pages: Mutex<VecDeque<Result<Page, TransportError>>>,
    pub writes: Mutex<VecDeque<Result<(), TransportError>>>,
    pub posts: Mutex<HashMap<Uuid, Post>>,
    pub profiles: Mutex<HashMap<Uuid, Profile>>,
    pub comments: Mutex<HashMap<Uuid, Vec<Comment>>>,
    calls: Mutex<Vec<Call>>,
    gated: AtomicBool,
    gate: Semaphore,
}

impl FakeGateway {
    pub fn new(actor: Option<Uuid>) -> Self {
        Self {
            actor,
            pages: Mutex::new(VecDeque::new()),
            writes: Mutex::new(VecDeque::new()),
            posts: Mutex::new(HashMap::new()),
            profiles: Mutex::new(HashMap::new()),
            comments: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            gated: AtomicBool::new(false),
            gate: Semaphore::new(0),
        }
    }

    pub fn gated(self) -> Self {
        self.gated.store(true, Ordering::SeqCst);
        self
    }

    pub fn release(&self, permits: usize) {
        self.gate.add_permits(permits);
    }

    pub fn push_page(&self, items: Vec<Post>) {
        self.pages.lock().push_back(Ok(Page {
            items,
            took_all: false,
        }));
    }

    pub fn push_page_error(&self, error: TransportError) {
        self.pages.lock().push_back(Err(error));
    }

    pub fn push_write(&self, result: Result<(), TransportError>) {
        self.writes.lock().push_back(result);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| matches(call)).count()
    }

    async fn enter(&self, call: Call) {
        self.calls.lock().push(call);
        if self.gated.load(Ordering::SeqCst) {
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
        } else {
            tokio::task::yield_now().await;
        }
    }

    fn next_write(&self) -> Result<(), TransportError> {
        self.writes.lock().pop_front().unwrap_or(Ok(()))
    }

    fn not_found(what: &str) -> TransportError {
        TransportError::Http {
            status: 404,
            message: Some(format!("{} not found", what)),
        }
    }
}

#[async_trait]
impl FeedGateway for FakeGateway {
    async fn fetch_page(&self, request: PageRequest) -> Result<Page, TransportError> {
        self.enter(Call::FetchPage(request)).await;
        self.pages.lock().pop_front().unwrap_or(Ok(Page::default()))
    }

    async fn fetch_post(&self, post_id: Uuid) -> Result<Post, TransportError> {
        self.enter(Call::FetchPost(post_id)).await;
        self.posts
            .lock()
            .get(&post_id)
            .cloned()
            .ok_or_else(|| Self::not_found("Post"))
    }

    async fn fetch_profile(&self, user_id: Uuid) -> Result<Profile, TransportError> {
        self.enter(Call::FetchProfile(user_id)).await;
        self.profiles
            .lock()
            .get(&user_id)
            .cloned()
            .ok_or_else(|| Self::not_found("User"))
    }

    async fn fetch_comments(&self, post_id: Uuid) -> Result<Vec<Comment>, TransportError> {
        self.enter(Call::FetchComments(post_id)).await;
        Ok(self.comments.lock().get(&post_id).cloned().unwrap_or_default())
    }

    async fn create_like(&self, post_id: Uuid) -> Result<(), TransportError> {
        self.enter(Call::CreateLike(post_id)).await;
        self.next_write()
    }

    async fn delete_like(&self, post_id: Uuid) -> Result<(), TransportError> {
        self.enter(Call::DeleteLike(post_id)).await;
        self.next_write()
    }

    async fn create_follow(&self, target_id: Uuid) -> Result<(), TransportError> {
        self.enter(Call::CreateFollow(target_id)).await;
        self.next_write()
    }

    async fn delete_follow(&self, target_id: Uuid) -> Result<(), TransportError> {
        self.enter(Call::DeleteFollow(target_id)).await;
        self.next_write()
    }

    async fn create_comment(
        &self,
        post_id: Uuid,
        content: String,
    ) -> Result<Comment, TransportError> {
        self.enter(Call::CreateComment(post_id, content.clone())).await;
        self.next_write()?;
        Ok(Comment {
            id: Uuid::new_v4(),
            post_id,
            author_id: self.actor.unwrap_or_else(Uuid::new_v4),
            content,
            created_at: Utc::now(),
            provisional: false,
        })
    }

    async fn delete_comment(&self, comment_id: Uuid) -> Result<(), TransportError> {
        self.enter(Call::DeleteComment(comment_id)).await;
        self.next_write()
    }

    async fn create_post(&self, draft: PostDraft) -> Result<Post, TransportError> {
        self.enter(Call::CreatePost).await;
        self.next_write()?;
        let mut created = post(self.actor.unwrap_or_else(Uuid::new_v4), 0);
        created.caption = draft.caption;
        created.created_at = Utc::now();
        Ok(created)
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<(), TransportError> {
        self.enter(Call::DeletePost(post_id)).await;
        self.next_write()
    }
}

/// Notifier that keeps everything it was handed
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn errors(&self) -> usize {
        self.notices
            .lock()
            .iter()
            .filter(|notice| matches!(notice, Notice::Error(_)))
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}

pub fn post(author_id: Uuid, likes: u64) -> Post {
    Post {
        id: Uuid::new_v4(),
        author_id,
        image_url: "https://cdn.example/image.jpg".to_string(),
        caption: Some("golden hour".to_string()),
        created_at: Utc::now() - ChronoDuration::minutes(5),
        likes_count: likes,
        comments_count: 0,
        viewer_has_liked: None,
        author: None,
    }
}

pub fn posts(n: usize) -> Vec<Post> {
    (0..n).map(|_| post(Uuid::new_v4(), 0)).collect()
}

pub fn profile(id: Uuid, followers: u64, following: u64) -> Profile {
    Profile {
        id,
        name: "sam".to_string(),
        posts_count: 0,
        followers_count: followers,
        following_count: following,
        viewer_follows: None,
    }
}

pub fn config(page_size: usize) -> FeedConfig {
    let mut config = FeedConfig::default();
    config.paging.page_size = page_size;
    config
}

pub struct Harness {
    pub session: FeedSession,
    pub gateway: Arc<FakeGateway>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn harness(gateway: FakeGateway, page_size: usize, options: SessionOptions) -> Harness {
    let gateway = Arc::new(gateway);
    let notifier = Arc::new(RecordingNotifier::default());
    let session = FeedSession::with_options(
        config(page_size),
        gateway.clone(),
        Arc::new(StaticIdentity(gateway.actor)),
        notifier.clone(),
        options,
    );
    Harness {
        session,
        gateway,
        notifier,
    }
}
