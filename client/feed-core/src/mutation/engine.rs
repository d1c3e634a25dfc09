use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::state::{
    MutationKind, MutationOutcome, MutationPhase, PendingGuard, PendingSet, RejectReason,
};
use crate::config::ContentLimits;
use crate::context::FeedContext;
use crate::domain::{Comment, CounterField, Entity, EntityKey, Post, PostDraft};
use crate::error::FeedError;
use crate::network::CallKind;
use crate::notify::Notice;
use crate::validation::{validate_caption, validate_comment, validate_media};

/// Result of the local half of an optimistic write
enum Applied<S> {
    Missing,
    Noop,
    Done(S),
}

#[derive(Debug, Clone, Copy)]
struct LikeSnapshot {
    liked: bool,
    likes: u64,
}

#[derive(Debug, Clone, Copy)]
struct FollowSnapshot {
    following: bool,
    followers: Option<u64>,
    actor_following: Option<u64>,
}

/// The only component allowed to write user actions into the cache.
///
/// Likes, follows and comments are optimistic: the cache changes first and is
/// restored to its exact snapshot if the server refuses. Deletes and post
/// creation are confirmation-gated: nothing changes until the server answers.
/// Every apply step reads the live cache value inside the transaction.
pub struct MutationEngine {
    ctx: FeedContext,
    limits: ContentLimits,
    pending: PendingSet,
}

impl MutationEngine {
    pub fn new(ctx: FeedContext, limits: ContentLimits) -> Self {
        Self {
            ctx,
            limits,
            pending: PendingSet::default(),
        }
    }

    pub fn phase(&self, key: EntityKey, kind: MutationKind) -> MutationPhase {
        self.pending.phase(key, kind)
    }

    /// Rendering uses this to disable buttons during confirmation-gated calls
    pub fn is_pending(&self, key: EntityKey, kind: MutationKind) -> bool {
        self.phase(key, kind) == MutationPhase::Applying
    }

    // ========== Likes ==========

    /// Flip the viewer's like on a post
    pub async fn toggle_like(&self, post_id: Uuid) -> MutationOutcome {
        self.write_like(post_id, None).await
    }

    /// Ensure the post is liked. Already liked is `Unchanged`, never an unlike.
    pub async fn like(&self, post_id: Uuid) -> MutationOutcome {
        self.write_like(post_id, Some(true)).await
    }

    async fn write_like(&self, post_id: Uuid, desired: Option<bool>) -> MutationOutcome {
        let kind = MutationKind::Like;
        let key = EntityKey::Post(post_id);
        let Some(actor) = self.actor(kind) else {
            return MutationOutcome::SignInRequired;
        };
        let Some(guard) = self.pending.try_begin(key, kind) else {
            return self.reject(kind, key, RejectReason::AlreadyPending);
        };

        let applied = self.ctx.cache.transact(|tx| {
            let Some(likes) = tx.counter(key, CounterField::Likes) else {
                return Applied::Missing;
            };
            let liked = tx.is_liked(post_id, actor);
            let target = desired.unwrap_or(!liked);
            if target == liked {
                return Applied::Noop;
            }
            tx.set_liked(post_id, actor, target);
            tx.adjust_counter(key, CounterField::Likes, if target { 1 } else { -1 });
            Applied::Done(LikeSnapshot { liked, likes })
        });

        let snapshot = match applied {
            Applied::Missing => return self.reject(kind, key, RejectReason::NotCached),
            Applied::Noop => {
                debug!(post_id = %post_id, "Already liked; nothing to do");
                return MutationOutcome::Unchanged;
            }
            Applied::Done(snapshot) => snapshot,
        };

        let target = !snapshot.liked;
        info!(post_id = %post_id, liked = target, "Like applying");

        let gateway = self.ctx.gateway.clone();
        let operation = if target { "create_like" } else { "delete_like" };
        let result = self
            .ctx
            .network
            .call(CallKind::Write, operation, move || async move {
                if target {
                    gateway.create_like(post_id).await
                } else {
                    gateway.delete_like(post_id).await
                }
            })
            .await;

        if self.ctx.scope.is_closed() {
            return self.discard(kind, key, guard);
        }

        match result {
            Ok(()) => self.commit(kind, key, guard, ()),
            Err(e) => {
                self.ctx.cache.transact(|tx| {
                    // A confirmed delete may have landed meanwhile
                    if tx.contains(key) {
                        tx.set_liked(post_id, actor, snapshot.liked);
                        tx.set_counter(key, CounterField::Likes, snapshot.likes);
                    }
                });
                self.rollback(kind, key, guard, e)
            }
        }
    }

    // ========== Follows ==========

    /// Flip the viewer's follow of `target_id`. The target's follower count and
    /// the viewer's following count move in the same local transaction.
    pub async fn toggle_follow(&self, target_id: Uuid) -> MutationOutcome {
        let kind = MutationKind::Follow;
        let key = EntityKey::Profile(target_id);
        let Some(actor) = self.actor(kind) else {
            return MutationOutcome::SignInRequired;
        };
        if actor == target_id {
            return self.reject(kind, key, RejectReason::SelfFollow);
        }
        let Some(guard) = self.pending.try_begin(key, kind) else {
            return self.reject(kind, key, RejectReason::AlreadyPending);
        };

        let actor_key = EntityKey::Profile(actor);
        let applied = self.ctx.cache.transact(|tx| {
            let following = tx.is_following(actor, target_id);
            let snapshot = FollowSnapshot {
                following,
                followers: tx.counter(key, CounterField::Followers),
                actor_following: tx.counter(actor_key, CounterField::Following),
            };
            tx.set_following(actor, target_id, !following)?;
            let delta = if following { -1 } else { 1 };
            tx.adjust_counter(key, CounterField::Followers, delta);
            tx.adjust_counter(actor_key, CounterField::Following, delta);
            Ok::<_, FeedError>(snapshot)
        });
        let snapshot = match applied {
            Ok(snapshot) => snapshot,
            Err(e) => return self.reject(kind, key, RejectReason::Invalid(e)),
        };

        let target = !snapshot.following;
        info!(target_id = %target_id, following = target, "Follow applying");

        let gateway = self.ctx.gateway.clone();
        let operation = if target { "create_follow" } else { "delete_follow" };
        let result = self
            .ctx
            .network
            .call(CallKind::Write, operation, move || async move {
                if target {
                    gateway.create_follow(target_id).await
                } else {
                    gateway.delete_follow(target_id).await
                }
            })
            .await;

        if self.ctx.scope.is_closed() {
            return self.discard(kind, key, guard);
        }

        match result {
            Ok(()) => self.commit(kind, key, guard, ()),
            Err(e) => {
                self.ctx.cache.transact(|tx| {
                    // Self-edges were ruled out above
                    let _ = tx.set_following(actor, target_id, snapshot.following);
                    if let Some(followers) = snapshot.followers {
                        tx.set_counter(key, CounterField::Followers, followers);
                    }
                    if let Some(following) = snapshot.actor_following {
                        tx.set_counter(actor_key, CounterField::Following, following);
                    }
                });
                self.rollback(kind, key, guard, e)
            }
        }
    }

    // ========== Comments ==========

    /// Append a comment at the tail of the post's thread. The local record is
    /// provisional until the server returns the stored one.
    pub async fn add_comment(&self, post_id: Uuid, content: &str) -> MutationOutcome<Comment> {
        let kind = MutationKind::Comment;
        let key = EntityKey::Post(post_id);
        let Some(actor) = self.actor(kind) else {
            return MutationOutcome::SignInRequired;
        };
        let text = match validate_comment(content, &self.limits) {
            Ok(text) => text,
            Err(e) => return self.reject(kind, key, RejectReason::Invalid(e)),
        };
        let Some(guard) = self.pending.try_begin(key, kind) else {
            return self.reject(kind, key, RejectReason::AlreadyPending);
        };

        let provisional = Comment {
            id: Uuid::new_v4(),
            post_id,
            author_id: actor,
            content: text.clone(),
            created_at: Utc::now(),
            provisional: true,
        };
        let provisional_id = provisional.id;
        let comments_before = self.ctx.cache.transact(|tx| {
            let before = tx.counter(key, CounterField::Comments);
            tx.upsert(Entity::Comment(provisional));
            tx.adjust_counter(key, CounterField::Comments, 1);
            before
        });
        info!(post_id = %post_id, "Comment applying");

        let gateway = self.ctx.gateway.clone();
        let result = self
            .ctx
            .network
            .call(CallKind::Write, "create_comment", move || async move {
                gateway.create_comment(post_id, text).await
            })
            .await;

        if self.ctx.scope.is_closed() {
            return self.discard(kind, key, guard);
        }

        match result {
            Ok(comment) => {
                let stored = comment.clone();
                self.ctx.cache.transact(|tx| {
                    if !tx.replace_comment(provisional_id, stored) {
                        debug!(post_id = %post_id, "Provisional comment gone; post was removed");
                    }
                });
                self.commit(kind, key, guard, comment)
            }
            Err(e) => {
                self.ctx.cache.transact(|tx| {
                    tx.remove(EntityKey::Comment(provisional_id));
                    if let Some(count) = comments_before {
                        tx.set_counter(key, CounterField::Comments, count);
                    }
                });
                self.rollback(kind, key, guard, e)
            }
        }
    }

    /// Confirmation-gated; only the author may delete
    pub async fn delete_comment(&self, comment_id: Uuid) -> MutationOutcome {
        let kind = MutationKind::DeleteComment;
        let key = EntityKey::Comment(comment_id);
        let Some(actor) = self.actor(kind) else {
            return MutationOutcome::SignInRequired;
        };
        let Some(comment) = self.ctx.cache.comment(comment_id) else {
            return self.reject(kind, key, RejectReason::NotCached);
        };
        if comment.provisional {
            return self.reject(kind, key, RejectReason::AlreadyPending);
        }
        if comment.author_id != actor {
            let e = FeedError::Forbidden("you can only delete your own comments".to_string());
            return self.reject(kind, key, RejectReason::Invalid(e));
        }
        let Some(guard) = self.pending.try_begin(key, kind) else {
            return self.reject(kind, key, RejectReason::AlreadyPending);
        };
        info!(comment_id = %comment_id, "Comment delete pending");

        let gateway = self.ctx.gateway.clone();
        let result = self
            .ctx
            .network
            .call(CallKind::Write, "delete_comment", move || async move {
                gateway.delete_comment(comment_id).await
            })
            .await;

        if self.ctx.scope.is_closed() {
            return self.discard(kind, key, guard);
        }

        match result {
            Ok(()) | Err(FeedError::NotFound(_)) => {
                let post_key = EntityKey::Post(comment.post_id);
                self.ctx.cache.transact(|tx| {
                    if tx.remove(key) {
                        tx.adjust_counter(post_key, CounterField::Comments, -1);
                    }
                });
                self.commit(kind, key, guard, ())
            }
            Err(e) => self.fail(kind, key, guard, e),
        }
    }

    // ========== Posts ==========

    /// Upload and create a post; on success it heads the feed list
    pub async fn create_post(&self, draft: PostDraft) -> MutationOutcome<Post> {
        let kind = MutationKind::CreatePost;
        let Some(actor) = self.actor(kind) else {
            return MutationOutcome::SignInRequired;
        };
        let key = EntityKey::Profile(actor);
        let caption = match validate_caption(draft.caption.as_deref(), &self.limits)
            .and_then(|caption| validate_media(&draft.media, &self.limits).map(|_| caption))
        {
            Ok(caption) => caption,
            Err(e) => return self.reject(kind, key, RejectReason::Invalid(e)),
        };
        let Some(guard) = self.pending.try_begin(key, kind) else {
            return self.reject(kind, key, RejectReason::AlreadyPending);
        };
        info!(
            bytes = draft.media.bytes.len(),
            content_type = %draft.media.content_type,
            "Post upload pending"
        );

        let draft = PostDraft {
            caption,
            media: draft.media,
        };
        let gateway = self.ctx.gateway.clone();
        let result = self
            .ctx
            .network
            .call(CallKind::Upload, "create_post", move || async move {
                gateway.create_post(draft).await
            })
            .await;

        if self.ctx.scope.is_closed() {
            return self.discard(kind, key, guard);
        }

        match result {
            Ok(post) => {
                let stored = post.clone();
                self.ctx.cache.transact(|tx| {
                    tx.prepend_post(stored);
                    tx.adjust_counter(key, CounterField::Posts, 1);
                });
                self.ctx
                    .notifier
                    .notify(Notice::Success("Post shared.".to_string()));
                self.commit(kind, key, guard, post)
            }
            Err(e) => self.fail(kind, key, guard, e),
        }
    }

    /// Confirmation-gated; the server also releases the post's image.
    /// Commits with whether the post was part of the feed list.
    pub async fn delete_post(&self, post_id: Uuid) -> MutationOutcome<bool> {
        let kind = MutationKind::DeletePost;
        let key = EntityKey::Post(post_id);
        let Some(actor) = self.actor(kind) else {
            return MutationOutcome::SignInRequired;
        };
        let Some(post) = self.ctx.cache.post(post_id) else {
            return self.reject(kind, key, RejectReason::NotCached);
        };
        if post.author_id != actor {
            let e = FeedError::Forbidden("you can only delete your own posts".to_string());
            return self.reject(kind, key, RejectReason::Invalid(e));
        }
        let Some(guard) = self.pending.try_begin(key, kind) else {
            return self.reject(kind, key, RejectReason::AlreadyPending);
        };
        info!(post_id = %post_id, "Post delete pending");

        let gateway = self.ctx.gateway.clone();
        let result = self
            .ctx
            .network
            .call(CallKind::Write, "delete_post", move || async move {
                gateway.delete_post(post_id).await
            })
            .await;

        if self.ctx.scope.is_closed() {
            return self.discard(kind, key, guard);
        }

        match result {
            Ok(()) | Err(FeedError::NotFound(_)) => {
                let author_key = EntityKey::Profile(post.author_id);
                let in_feed = self.ctx.cache.transact(|tx| {
                    let in_feed = tx.in_feed(post_id);
                    if tx.remove(key) {
                        tx.adjust_counter(author_key, CounterField::Posts, -1);
                    }
                    in_feed
                });
                self.ctx
                    .notifier
                    .notify(Notice::Success("Post deleted.".to_string()));
                self.commit(kind, key, guard, in_feed)
            }
            Err(e) => self.fail(kind, key, guard, e),
        }
    }

    // ========== Outcomes ==========

    fn actor(&self, kind: MutationKind) -> Option<Uuid> {
        let actor = self.ctx.identity.current_actor_id();
        if actor.is_none() {
            info!(action = kind.as_str(), "No identity; prompting sign-in");
            self.ctx.prompt_sign_in();
        }
        actor
    }

    fn surface(&self, error: &FeedError) {
        match error {
            FeedError::Unauthenticated => self.ctx.prompt_sign_in(),
            other => self.ctx.notify_error(other.user_message()),
        }
    }

    fn reject<T>(
        &self,
        kind: MutationKind,
        key: EntityKey,
        reason: RejectReason,
    ) -> MutationOutcome<T> {
        self.ctx.stats.record_rejection();
        info!(entity = %key, action = kind.as_str(), reason = ?reason, "Mutation rejected");
        match &reason {
            RejectReason::Invalid(e) => self.surface(e),
            RejectReason::SelfFollow => self
                .ctx
                .notify_error("You can't follow yourself.".to_string()),
            RejectReason::AlreadyPending | RejectReason::NotCached => {}
        }
        MutationOutcome::Rejected(reason)
    }

    fn commit<T>(
        &self,
        kind: MutationKind,
        key: EntityKey,
        guard: PendingGuard,
        value: T,
    ) -> MutationOutcome<T> {
        guard.settle(MutationPhase::Committed);
        self.ctx.stats.record_commit();
        info!(entity = %key, action = kind.as_str(), "Mutation committed");
        MutationOutcome::Committed(value)
    }

    fn rollback<T>(
        &self,
        kind: MutationKind,
        key: EntityKey,
        guard: PendingGuard,
        error: FeedError,
    ) -> MutationOutcome<T> {
        guard.settle(MutationPhase::RolledBack);
        self.ctx.stats.record_rollback();
        warn!(entity = %key, action = kind.as_str(), error = %error, "Mutation rolled back");
        self.surface(&error);
        MutationOutcome::RolledBack(error)
    }

    fn fail<T>(
        &self,
        kind: MutationKind,
        key: EntityKey,
        guard: PendingGuard,
        error: FeedError,
    ) -> MutationOutcome<T> {
        drop(guard);
        self.ctx.stats.record_failure();
        warn!(entity = %key, action = kind.as_str(), error = %error, "Mutation failed");
        self.surface(&error);
        MutationOutcome::Failed(error)
    }

    fn discard<T>(
        &self,
        kind: MutationKind,
        key: EntityKey,
        guard: PendingGuard,
    ) -> MutationOutcome<T> {
        drop(guard);
        self.ctx.stats.record_discard();
        debug!(entity = %key, action = kind.as_str(), "View torn down; completion discarded");
        MutationOutcome::Discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::EntityCache;
    use crate::config::FeedConfig;
    use crate::domain::{MediaUpload, Profile};
    use crate::gateway::{MockFeedGateway, StaticIdentity};
    use crate::network::NetworkClient;
    use crate::notify::Notifier;
    use crate::scope::ViewScope;
    use crate::stats::StatsCollector;
    use parking_lot::Mutex;
    use resilience::TransportError;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorded(Mutex<Vec<Notice>>);

    impl Notifier for Recorded {
        fn notify(&self, notice: Notice) {
            self.0.lock().push(notice);
        }
    }

    struct Harness {
        engine: MutationEngine,
        cache: EntityCache,
        stats: StatsCollector,
        notices: Arc<Recorded>,
    }

    fn harness(gateway: MockFeedGateway, actor: Option<Uuid>) -> Harness {
        let cache = EntityCache::new(actor);
        let stats = StatsCollector::new();
        let notices = Arc::new(Recorded::default());
        let ctx = FeedContext {
            gateway: Arc::new(gateway),
            identity: Arc::new(StaticIdentity(actor)),
            notifier: notices.clone(),
            network: NetworkClient::new(Duration::from_secs(1)),
            cache: cache.clone(),
            stats: stats.clone(),
            scope: ViewScope::new(),
            return_to: Some("/feed".to_string()),
        };
        Harness {
            engine: MutationEngine::new(ctx, FeedConfig::default().limits),
            cache,
            stats,
            notices,
        }
    }

    fn seed_post(cache: &EntityCache, author_id: Uuid, likes: u64) -> Uuid {
        let id = Uuid::new_v4();
        cache.upsert(Entity::Post(Post {
            id,
            author_id,
            image_url: "https://cdn.example/p.jpg".to_string(),
            caption: Some("hello".to_string()),
            created_at: Utc::now(),
            likes_count: likes,
            comments_count: 0,
            viewer_has_liked: Some(false),
            author: None,
        }));
        id
    }

    fn seed_profile(cache: &EntityCache, id: Uuid, followers: u64, following: u64) {
        cache.upsert(Entity::Profile(Profile {
            id,
            name: "someone".to_string(),
            posts_count: 1,
            followers_count: followers,
            following_count: following,
            viewer_follows: None,
        }));
    }

    #[tokio::test]
    async fn test_like_commits_optimistic_state() {
        let actor = Uuid::new_v4();
        let mut gateway = MockFeedGateway::new();
        gateway.expect_create_like().times(1).returning(|_| Ok(()));
        let h = harness(gateway, Some(actor));
        let post_id = seed_post(&h.cache, Uuid::new_v4(), 4);

        let outcome = h.engine.toggle_like(post_id).await;

        assert_eq!(outcome, MutationOutcome::Committed(()));
        let post = h.cache.post(post_id).unwrap();
        assert_eq!(post.viewer_has_liked, Some(true));
        assert_eq!(post.likes_count, 5);
        assert_eq!(
            h.engine.phase(EntityKey::Post(post_id), MutationKind::Like),
            MutationPhase::Committed
        );
    }

    #[tokio::test]
    async fn test_like_failure_restores_snapshot() {
        let actor = Uuid::new_v4();
        let mut gateway = MockFeedGateway::new();
        gateway
            .expect_create_like()
            .times(1)
            .returning(|_| Err(TransportError::Network("connection refused".to_string())));
        let h = harness(gateway, Some(actor));
        let post_id = seed_post(&h.cache, Uuid::new_v4(), 4);

        let outcome = h.engine.toggle_like(post_id).await;

        assert!(matches!(outcome, MutationOutcome::RolledBack(FeedError::Network(_))));
        let post = h.cache.post(post_id).unwrap();
        assert_eq!(post.viewer_has_liked, Some(false));
        assert_eq!(post.likes_count, 4);
        assert_eq!(h.stats.snapshot().mutations_rolled_back, 1);
        assert!(matches!(h.notices.0.lock()[0], Notice::Error(_)));
    }

    #[tokio::test]
    async fn test_failed_unlike_after_delete_restores_nothing() {
        let actor = Uuid::new_v4();
        let slot: Arc<Mutex<Option<EntityCache>>> = Arc::new(Mutex::new(None));
        let deleted_by = slot.clone();
        let mut gateway = MockFeedGateway::new();
        gateway.expect_delete_like().times(1).returning(move |post_id| {
            // The author's confirmed delete lands while the unlike is out
            if let Some(cache) = deleted_by.lock().as_ref() {
                cache.remove(EntityKey::Post(post_id));
            }
            Err(TransportError::Http {
                status: 500,
                message: None,
            })
        });
        let h = harness(gateway, Some(actor));
        *slot.lock() = Some(h.cache.clone());
        let post_id = seed_post(&h.cache, Uuid::new_v4(), 1);
        h.cache.transact(|tx| tx.set_liked(post_id, actor, true));

        let outcome = h.engine.toggle_like(post_id).await;

        assert!(matches!(outcome, MutationOutcome::RolledBack(_)));
        assert!(h.cache.post(post_id).is_none());
        assert!(!h.cache.is_liked(post_id, actor));
    }

    #[tokio::test]
    async fn test_like_when_liked_is_unchanged() {
        let actor = Uuid::new_v4();
        let h = harness(MockFeedGateway::new(), Some(actor));
        let post_id = seed_post(&h.cache, Uuid::new_v4(), 1);
        h.cache.transact(|tx| tx.set_liked(post_id, actor, true));

        assert_eq!(h.engine.like(post_id).await, MutationOutcome::Unchanged);
        assert_eq!(h.cache.post(post_id).unwrap().likes_count, 1);
    }

    #[tokio::test]
    async fn test_signed_out_prompts_without_state_change() {
        let h = harness(MockFeedGateway::new(), None);
        let post_id = seed_post(&h.cache, Uuid::new_v4(), 2);

        assert_eq!(h.engine.toggle_like(post_id).await, MutationOutcome::SignInRequired);
        assert_eq!(h.cache.post(post_id).unwrap().likes_count, 2);
        assert_eq!(
            h.notices.0.lock().as_slice(),
            &[Notice::SignInRequired {
                return_to: Some("/feed".to_string())
            }]
        );
    }

    #[tokio::test]
    async fn test_self_follow_never_dispatched() {
        let actor = Uuid::new_v4();
        // No expectations: any gateway call panics
        let h = harness(MockFeedGateway::new(), Some(actor));
        seed_profile(&h.cache, actor, 3, 3);

        let outcome = h.engine.toggle_follow(actor).await;

        assert_eq!(outcome, MutationOutcome::Rejected(RejectReason::SelfFollow));
        assert_eq!(h.cache.profile(actor).unwrap().followers_count, 3);
        assert_eq!(h.stats.snapshot().mutations_rejected, 1);
    }

    #[tokio::test]
    async fn test_follow_rollback_restores_both_profiles() {
        let actor = Uuid::new_v4();
        let target = Uuid::new_v4();
        let mut gateway = MockFeedGateway::new();
        gateway
            .expect_create_follow()
            .withf(move |id| *id == target)
            .times(1)
            .returning(|_| Err(TransportError::Http { status: 500, message: None }));
        let h = harness(gateway, Some(actor));
        seed_profile(&h.cache, actor, 0, 7);
        seed_profile(&h.cache, target, 10, 0);

        let outcome = h.engine.toggle_follow(target).await;

        assert_eq!(
            outcome,
            MutationOutcome::RolledBack(FeedError::ServerError { status: 500 })
        );
        assert!(!h.cache.is_following(actor, target));
        assert_eq!(h.cache.profile(target).unwrap().followers_count, 10);
        assert_eq!(h.cache.profile(actor).unwrap().following_count, 7);
    }

    #[tokio::test]
    async fn test_follow_commit_moves_both_counters() {
        let actor = Uuid::new_v4();
        let target = Uuid::new_v4();
        let mut gateway = MockFeedGateway::new();
        gateway.expect_create_follow().times(1).returning(|_| Ok(()));
        let h = harness(gateway, Some(actor));
        seed_profile(&h.cache, actor, 0, 7);
        seed_profile(&h.cache, target, 10, 0);

        assert!(h.engine.toggle_follow(target).await.is_committed());
        let profile = h.cache.profile(target).unwrap();
        assert_eq!(profile.followers_count, 11);
        assert_eq!(profile.viewer_follows, Some(true));
        assert_eq!(h.cache.profile(actor).unwrap().following_count, 8);
    }

    #[tokio::test]
    async fn test_blank_comment_rejected_before_apply() {
        let actor = Uuid::new_v4();
        let h = harness(MockFeedGateway::new(), Some(actor));
        let post_id = seed_post(&h.cache, Uuid::new_v4(), 0);

        let outcome = h.engine.add_comment(post_id, "   ").await;

        assert!(matches!(
            outcome,
            MutationOutcome::Rejected(RejectReason::Invalid(FeedError::Validation(_)))
        ));
        assert!(h.cache.comments(post_id).is_empty());
        assert_eq!(h.cache.post(post_id).unwrap().comments_count, 0);
    }

    #[tokio::test]
    async fn test_comment_replaces_provisional_record() {
        let actor = Uuid::new_v4();
        let mut gateway = MockFeedGateway::new();
        gateway
            .expect_create_comment()
            .withf(|_, content| content == "great shot")
            .times(1)
            .returning(move |post_id, content| {
                Ok(Comment {
                    id: Uuid::new_v4(),
                    post_id,
                    author_id: actor,
                    content,
                    created_at: Utc::now(),
                    provisional: false,
                })
            });
        let h = harness(gateway, Some(actor));
        let post_id = seed_post(&h.cache, Uuid::new_v4(), 0);

        let outcome = h.engine.add_comment(post_id, "  great shot ").await;

        let MutationOutcome::Committed(stored) = outcome else {
            panic!("expected commit, got {:?}", outcome);
        };
        let thread = h.cache.comments(post_id);
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].id, stored.id);
        assert!(!thread[0].provisional);
        assert_eq!(h.cache.post(post_id).unwrap().comments_count, 1);
    }

    #[tokio::test]
    async fn test_comment_failure_removes_provisional() {
        let actor = Uuid::new_v4();
        let mut gateway = MockFeedGateway::new();
        gateway
            .expect_create_comment()
            .returning(|_, _| Err(TransportError::Network("reset".to_string())));
        let h = harness(gateway, Some(actor));
        let post_id = seed_post(&h.cache, Uuid::new_v4(), 0);

        let outcome = h.engine.add_comment(post_id, "hello").await;

        assert!(matches!(outcome, MutationOutcome::RolledBack(_)));
        assert!(h.cache.comments(post_id).is_empty());
        assert_eq!(h.cache.post(post_id).unwrap().comments_count, 0);
    }

    #[tokio::test]
    async fn test_delete_others_comment_forbidden() {
        let actor = Uuid::new_v4();
        let h = harness(MockFeedGateway::new(), Some(actor));
        let post_id = seed_post(&h.cache, actor, 0);
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id,
            author_id: Uuid::new_v4(),
            content: "not mine".to_string(),
            created_at: Utc::now(),
            provisional: false,
        };
        h.cache.upsert(Entity::Comment(comment.clone()));

        let outcome = h.engine.delete_comment(comment.id).await;

        assert!(matches!(
            outcome,
            MutationOutcome::Rejected(RejectReason::Invalid(FeedError::Forbidden(_)))
        ));
        assert!(h.cache.comment(comment.id).is_some());
    }

    #[tokio::test]
    async fn test_delete_post_not_found_counts_as_committed() {
        let actor = Uuid::new_v4();
        let mut gateway = MockFeedGateway::new();
        gateway.expect_delete_post().times(1).returning(|_| {
            Err(TransportError::Http {
                status: 404,
                message: Some("Post not found".to_string()),
            })
        });
        let h = harness(gateway, Some(actor));
        seed_profile(&h.cache, actor, 0, 0);
        let post_id = seed_post(&h.cache, actor, 0);

        let outcome = h.engine.delete_post(post_id).await;

        assert_eq!(outcome, MutationOutcome::Committed(true));
        assert!(h.cache.post(post_id).is_none());
        assert_eq!(h.cache.profile(actor).unwrap().posts_count, 0);
    }

    #[tokio::test]
    async fn test_delete_post_failure_keeps_post() {
        let actor = Uuid::new_v4();
        let mut gateway = MockFeedGateway::new();
        gateway
            .expect_delete_post()
            .returning(|_| Err(TransportError::Http { status: 502, message: None }));
        let h = harness(gateway, Some(actor));
        let post_id = seed_post(&h.cache, actor, 0);

        let outcome = h.engine.delete_post(post_id).await;

        assert_eq!(outcome, MutationOutcome::Failed(FeedError::ServerError { status: 502 }));
        assert!(h.cache.post(post_id).is_some());
        assert!(!h.engine.is_pending(EntityKey::Post(post_id), MutationKind::DeletePost));
        assert_eq!(h.stats.snapshot().mutations_failed, 1);
    }

    #[tokio::test]
    async fn test_create_post_rejects_non_image() {
        let actor = Uuid::new_v4();
        let h = harness(MockFeedGateway::new(), Some(actor));

        let outcome = h
            .engine
            .create_post(PostDraft {
                caption: Some("clip".to_string()),
                media: MediaUpload {
                    file_name: "clip.mp4".to_string(),
                    content_type: "video/mp4".to_string(),
                    bytes: vec![1, 2, 3],
                },
            })
            .await;

        assert!(matches!(
            outcome,
            MutationOutcome::Rejected(RejectReason::Invalid(FeedError::Validation(_)))
        ));
        assert_eq!(h.cache.feed_len(), 0);
    }
}
