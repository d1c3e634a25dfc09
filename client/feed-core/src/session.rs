//! Feed session
//!
//! One [`FeedSession`] per feed or profile view. It owns that view's cache,
//! cursor, mutation engine and navigator, and is the surface the rendering
//! layer calls into. Dropping it, or calling [`FeedSession::teardown`], ends
//! the view.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::EntityCache;
use crate::config::FeedConfig;
use crate::context::FeedContext;
use crate::cursor::{CursorState, FetchOutcome, PaginationCursor};
use crate::domain::{Comment, Entity, EntityKey, FeedFilter, Post, PostDraft, Profile};
use crate::error::{FeedError, FeedResult};
use crate::gateway::{FeedGateway, IdentityProvider};
use crate::gesture::{DoubleTapDetector, SwipeConfig, Tap};
use crate::mutation::{MutationEngine, MutationOutcome};
use crate::navigator::{DetailNavigator, NavKey, Navigation};
use crate::network::{CallKind, NetworkClient};
use crate::notify::Notifier;
use crate::scope::ViewScope;
use crate::stats::{FeedStats, StatsCollector};
use resilience::TransportError;

/// How a view starts out
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub filter: FeedFilter,
    /// First page rendered before the session existed; never re-fetched
    pub initial_posts: Vec<Post>,
    /// Route the sign-in prompt returns to
    pub return_to: Option<String>,
}

struct TapState {
    post_id: Option<Uuid>,
    detector: DoubleTapDetector,
}

pub struct FeedSession {
    config: FeedConfig,
    ctx: FeedContext,
    cursor: PaginationCursor,
    engine: MutationEngine,
    navigator: Mutex<DetailNavigator>,
    taps: Mutex<TapState>,
}

impl FeedSession {
    /// Home feed with nothing pre-rendered
    pub fn new(
        config: FeedConfig,
        gateway: Arc<dyn FeedGateway>,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::with_options(config, gateway, identity, notifier, SessionOptions::default())
    }

    pub fn with_options(
        config: FeedConfig,
        gateway: Arc<dyn FeedGateway>,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
        options: SessionOptions,
    ) -> Self {
        let cache = EntityCache::new(identity.current_actor_id());
        let initial_count = options.initial_posts.len();
        cache.upsert_many(options.initial_posts.into_iter().map(Entity::Post));

        let ctx = FeedContext {
            gateway,
            identity,
            notifier,
            network: NetworkClient::new(config.request_timeout()),
            cache: cache.clone(),
            stats: StatsCollector::new(),
            scope: ViewScope::new(),
            return_to: options.return_to,
        };

        let cursor = PaginationCursor::new(
            ctx.clone(),
            options.filter,
            config.paging.page_size,
            initial_count,
        );
        let engine = MutationEngine::new(ctx.clone(), config.limits.clone());
        let navigator = DetailNavigator::new(&cache, SwipeConfig::from(&config.gestures));
        let taps = TapState {
            post_id: None,
            detector: DoubleTapDetector::new(config.double_tap_window()),
        };

        info!(
            filter = ?options.filter,
            initial_count,
            viewer = ?cache.viewer(),
            "Feed session started"
        );

        Self {
            config,
            ctx,
            cursor,
            engine,
            navigator: Mutex::new(navigator),
            taps: Mutex::new(taps),
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn cache(&self) -> &EntityCache {
        &self.ctx.cache
    }

    pub fn engine(&self) -> &MutationEngine {
        &self.engine
    }

    pub fn stats(&self) -> FeedStats {
        self.ctx.stats.snapshot()
    }

    pub fn stats_collector(&self) -> &StatsCollector {
        &self.ctx.stats
    }

    pub fn set_online(&self, online: bool) {
        self.ctx.network.set_online(online);
    }

    pub fn is_online(&self) -> bool {
        self.ctx.network.is_online()
    }

    // ========== Paging ==========

    pub async fn fetch_next(&self) -> FetchOutcome {
        self.cursor.fetch_next().await
    }

    pub fn cursor_state(&self) -> CursorState {
        self.cursor.state()
    }

    /// Switch the collection this view pages over
    pub fn reset(&self, filter: FeedFilter) {
        self.navigator.lock().close();
        self.cursor.reset(filter);
    }

    // ========== Mutations ==========

    pub async fn toggle_like(&self, post_id: Uuid) -> MutationOutcome {
        self.engine.toggle_like(post_id).await
    }

    pub async fn like(&self, post_id: Uuid) -> MutationOutcome {
        self.engine.like(post_id).await
    }

    /// Feed a tap on a post's media. A double tap likes the post; it never
    /// unlikes. Single taps return `None`.
    pub async fn handle_tap(&self, post_id: Uuid, at: Instant) -> Option<MutationOutcome> {
        let tap = {
            let mut taps = self.taps.lock();
            if taps.post_id != Some(post_id) {
                taps.detector.reset();
                taps.post_id = Some(post_id);
            }
            taps.detector.register_tap(at)
        };
        match tap {
            Tap::Single => None,
            Tap::Double => {
                debug!(post_id = %post_id, "Double tap");
                Some(self.engine.like(post_id).await)
            }
        }
    }

    pub async fn toggle_follow(&self, target_id: Uuid) -> MutationOutcome {
        self.engine.toggle_follow(target_id).await
    }

    pub async fn add_comment(&self, post_id: Uuid, content: &str) -> MutationOutcome<Comment> {
        self.engine.add_comment(post_id, content).await
    }

    pub async fn delete_comment(&self, comment_id: Uuid) -> MutationOutcome {
        self.engine.delete_comment(comment_id).await
    }

    /// Confirmation-gated delete. On success the post leaves every list, the
    /// detail view closes if it showed the post, and the cursor steps back.
    pub async fn delete_post(&self, post_id: Uuid) -> MutationOutcome {
        let outcome = self.engine.delete_post(post_id).await;
        if let MutationOutcome::Committed(in_feed) = &outcome {
            if *in_feed {
                self.cursor.note_removed();
            }
            self.navigator.lock().sync();
        }
        outcome.map(|_| ())
    }

    /// Upload a new post. It is inserted at the head of this view's list, so
    /// views should offer creation only where the viewer's own posts belong.
    pub async fn create_post(&self, draft: PostDraft) -> MutationOutcome<Post> {
        let outcome = self.engine.create_post(draft).await;
        if outcome.is_committed() {
            self.cursor.note_inserted();
        }
        outcome
    }

    // ========== Background loads ==========

    /// Re-read one post. The local like state survives when the payload lacks
    /// it. A post outside the paged list is stored but never joins it. A post
    /// that vanished server-side is removed. `Ok(None)` means the answer was
    /// discarded or the post is gone.
    pub async fn refresh_post(&self, post_id: Uuid) -> FeedResult<Option<Post>> {
        let gateway = self.ctx.gateway.clone();
        let result = self
            .load("fetch_post", move || async move { gateway.fetch_post(post_id).await })
            .await;

        match result {
            Ok(Some(post)) => {
                self.ctx.cache.merge(Entity::Post(post));
                Ok(self.ctx.cache.post(post_id))
            }
            Ok(None) => Ok(None),
            Err(FeedError::NotFound(_)) => {
                info!(post_id = %post_id, "Post vanished server-side");
                let in_feed = self.ctx.cache.transact(|tx| {
                    let in_feed = tx.in_feed(post_id);
                    tx.remove(EntityKey::Post(post_id));
                    in_feed
                });
                if in_feed {
                    self.cursor.note_removed();
                }
                self.navigator.lock().sync();
                Ok(None)
            }
            Err(e) => Err(self.surface_load_error("fetch_post", e)),
        }
    }

    pub async fn load_comments(&self, post_id: Uuid) -> FeedResult<Option<Vec<Comment>>> {
        let gateway = self.ctx.gateway.clone();
        let result = self
            .load("fetch_comments", move || async move {
                gateway.fetch_comments(post_id).await
            })
            .await;

        match result {
            Ok(Some(comments)) => {
                self.ctx
                    .cache
                    .upsert_many(comments.into_iter().map(Entity::Comment));
                Ok(Some(self.ctx.cache.comments(post_id)))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(self.surface_load_error("fetch_comments", e)),
        }
    }

    pub async fn load_profile(&self, user_id: Uuid) -> FeedResult<Option<Profile>> {
        let gateway = self.ctx.gateway.clone();
        let result = self
            .load("fetch_profile", move || async move {
                gateway.fetch_profile(user_id).await
            })
            .await;

        match result {
            Ok(Some(profile)) => {
                self.ctx.cache.merge(Entity::Profile(profile));
                Ok(self.ctx.cache.profile(user_id))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(self.surface_load_error("fetch_profile", e)),
        }
    }

    /// Read through the network client; `Ok(None)` once the view is gone
    async fn load<T, F, Fut>(&self, operation: &'static str, make_call: F) -> FeedResult<Option<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let result = self.ctx.network.call(CallKind::Read, operation, make_call).await;
        if self.ctx.scope.is_closed() {
            debug!(operation, "View torn down; load discarded");
            self.ctx.stats.record_discard();
            return Ok(None);
        }
        result.map(Some)
    }

    fn surface_load_error(&self, operation: &'static str, error: FeedError) -> FeedError {
        warn!(operation, error = %error, "Load failed");
        self.ctx.notify_error(error.user_message());
        error
    }

    // ========== Detail view ==========

    pub fn open_detail(&self, post_id: Uuid) -> bool {
        self.navigator.lock().open(post_id)
    }

    pub fn close_detail(&self) {
        self.navigator.lock().close();
    }

    pub fn current_detail(&self) -> Option<Post> {
        let mut navigator = self.navigator.lock();
        navigator.sync();
        navigator.current_post()
    }

    pub fn detail_id(&self) -> Option<Uuid> {
        let mut navigator = self.navigator.lock();
        navigator.sync();
        navigator.current()
    }

    pub fn next(&self) -> Navigation {
        self.navigator.lock().next()
    }

    pub fn previous(&self) -> Navigation {
        self.navigator.lock().previous()
    }

    pub fn navigate(&self, key: NavKey) -> Navigation {
        self.navigator.lock().handle_key(key)
    }

    pub fn swipe(&self, dx: f32, dy: f32) -> Navigation {
        self.navigator.lock().handle_swipe(dx, dy)
    }

    // ========== Lifecycle ==========

    /// End the view. Anything still in flight is ignored when it lands.
    pub fn teardown(&self) {
        if self.ctx.scope.is_closed() {
            return;
        }
        self.ctx.scope.close();
        self.navigator.lock().close();
        info!(stats = ?self.ctx.stats.snapshot(), "Feed session torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.ctx.scope.is_closed()
    }
}

impl Drop for FeedSession {
    fn drop(&mut self) {
        self.ctx.scope.close();
    }
}
