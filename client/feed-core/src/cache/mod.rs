//! Entity cache
//!
//! One keyed store per view: posts, comments and profiles plus the like and
//! follow edges of the signed-in viewer. Every list the view renders is a list
//! of ids into this store, so a single write is visible everywhere at once.
//!
//! All writes go through [`EntityCache::transact`]; the closure runs under the
//! write lock and the resulting [`CacheEvent`]s are broadcast after it is
//! released. The lock is never held across an `.await`.

mod events;
mod state;

pub use events::CacheEvent;
pub use state::CacheTx;

use parking_lot::RwLock;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::domain::{Comment, CounterField, Entity, EntityKey, Post, Profile};
use state::CacheState;

const EVENT_CHANNEL_CAPACITY: usize = 256;

struct CacheInner {
    state: RwLock<CacheState>,
    events: broadcast::Sender<CacheEvent>,
    viewer: Option<Uuid>,
}

/// Shared handle to one view's entity store
#[derive(Clone)]
pub struct EntityCache {
    inner: Arc<CacheInner>,
}

/// Non-owning handle; components that must not keep the view's cache alive
/// hold this instead of [`EntityCache`]
#[derive(Clone)]
pub struct WeakEntityCache(Weak<CacheInner>);

impl WeakEntityCache {
    pub fn upgrade(&self) -> Option<EntityCache> {
        self.0.upgrade().map(|inner| EntityCache { inner })
    }
}

impl EntityCache {
    /// `viewer` is the signed-in actor whose like and follow state is tracked
    pub fn new(viewer: Option<Uuid>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(CacheInner {
                state: RwLock::new(CacheState::default()),
                events,
                viewer,
            }),
        }
    }

    pub fn viewer(&self) -> Option<Uuid> {
        self.inner.viewer
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    pub fn downgrade(&self) -> WeakEntityCache {
        WeakEntityCache(Arc::downgrade(&self.inner))
    }

    /// Apply one atomic local change
    pub fn transact<R>(&self, f: impl FnOnce(&mut CacheTx<'_>) -> R) -> R {
        let (result, events) = {
            let mut guard = self.inner.state.write();
            let mut tx = CacheTx::new(&mut guard, self.inner.viewer);
            let result = f(&mut tx);
            (result, tx.into_events())
        };

        for event in events {
            trace!(key = %event.key(), "Cache event");
            // No subscribers is fine
            let _ = self.inner.events.send(event);
        }
        result
    }

    // ========== Reads ==========

    pub fn post(&self, id: Uuid) -> Option<Post> {
        self.inner.state.read().post(id, self.inner.viewer)
    }

    /// Posts in feed order
    pub fn posts(&self) -> Vec<Post> {
        let state = self.inner.state.read();
        state
            .feed()
            .iter()
            .filter_map(|id| state.post(*id, self.inner.viewer))
            .collect()
    }

    pub fn post_ids(&self) -> Vec<Uuid> {
        self.inner.state.read().feed().to_vec()
    }

    pub fn feed_len(&self) -> usize {
        self.inner.state.read().feed().len()
    }

    pub fn position(&self, post_id: Uuid) -> Option<usize> {
        self.inner
            .state
            .read()
            .feed()
            .iter()
            .position(|id| *id == post_id)
    }

    pub fn post_at(&self, index: usize) -> Option<Uuid> {
        self.inner.state.read().feed().get(index).copied()
    }

    /// Comments of a post, oldest first
    pub fn comments(&self, post_id: Uuid) -> Vec<Comment> {
        self.inner.state.read().thread(post_id)
    }

    pub fn comment(&self, id: Uuid) -> Option<Comment> {
        self.inner.state.read().comment(id).cloned()
    }

    pub fn profile(&self, id: Uuid) -> Option<Profile> {
        self.inner.state.read().profile(id, self.inner.viewer)
    }

    pub fn is_liked(&self, post_id: Uuid, actor_id: Uuid) -> bool {
        self.inner.state.read().is_liked(post_id, actor_id)
    }

    pub fn is_following(&self, follower_id: Uuid, followee_id: Uuid) -> bool {
        self.inner.state.read().is_following(follower_id, followee_id)
    }

    pub fn counter(&self, key: EntityKey, field: CounterField) -> Option<u64> {
        self.inner.state.read().counter(key, field)
    }

    // ========== Writes ==========

    /// Merge a batch in order. Returns how many entities were not cached before.
    pub fn upsert_many(&self, entities: impl IntoIterator<Item = Entity>) -> usize {
        let inserted = self.transact(|tx| {
            entities
                .into_iter()
                .map(|entity| tx.upsert(entity))
                .filter(|added| *added)
                .count()
        });
        debug!(inserted, "Merged entities into cache");
        inserted
    }

    pub fn upsert(&self, entity: Entity) -> bool {
        self.transact(|tx| tx.upsert(entity))
    }

    /// Store without placing a post in the feed list
    pub fn merge(&self, entity: Entity) -> bool {
        self.transact(|tx| tx.merge(entity))
    }

    /// Removing an absent key is a no-op and publishes nothing
    pub fn remove(&self, key: EntityKey) -> bool {
        self.transact(|tx| tx.remove(key))
    }

    pub fn adjust_counter(&self, key: EntityKey, field: CounterField, delta: i64) -> Option<u64> {
        self.transact(|tx| tx.adjust_counter(key, field, delta))
    }
}
