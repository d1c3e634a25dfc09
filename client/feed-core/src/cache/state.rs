use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::events::CacheEvent;
use crate::domain::{
    Comment, CounterField, Entity, EntityKey, FollowEdge, LikeEdge, Post, Profile,
};
use crate::error::FeedResult;

/// Everything one view knows about its entities
#[derive(Debug, Default)]
pub(crate) struct CacheState {
    posts: HashMap<Uuid, Post>,
    /// Server order of the feed the view renders
    feed: Vec<Uuid>,
    comments: HashMap<Uuid, Comment>,
    /// post id -> comment ids, oldest first
    threads: HashMap<Uuid, Vec<Uuid>>,
    profiles: HashMap<Uuid, Profile>,
    likes: HashSet<LikeEdge>,
    follows: HashSet<FollowEdge>,
}

impl CacheState {
    pub(crate) fn post(&self, id: Uuid, viewer: Option<Uuid>) -> Option<Post> {
        self.posts.get(&id).map(|stored| {
            let mut post = stored.clone();
            post.viewer_has_liked = viewer.map(|actor| self.is_liked(id, actor));
            post
        })
    }

    pub(crate) fn profile(&self, id: Uuid, viewer: Option<Uuid>) -> Option<Profile> {
        self.profiles.get(&id).map(|stored| {
            let mut profile = stored.clone();
            profile.viewer_follows = viewer
                .filter(|actor| *actor != id)
                .map(|actor| self.is_following(actor, id));
            profile
        })
    }

    pub(crate) fn comment(&self, id: Uuid) -> Option<&Comment> {
        self.comments.get(&id)
    }

    pub(crate) fn thread(&self, post_id: Uuid) -> Vec<Comment> {
        self.threads
            .get(&post_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.comments.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn feed(&self) -> &[Uuid] {
        &self.feed
    }

    pub(crate) fn is_liked(&self, post_id: Uuid, actor_id: Uuid) -> bool {
        self.likes.contains(&LikeEdge { post_id, actor_id })
    }

    pub(crate) fn is_following(&self, follower_id: Uuid, followee_id: Uuid) -> bool {
        FollowEdge::new(follower_id, followee_id)
            .map(|edge| self.follows.contains(&edge))
            .unwrap_or(false)
    }

    pub(crate) fn counter(&self, key: EntityKey, field: CounterField) -> Option<u64> {
        match (key, field) {
            (EntityKey::Post(id), CounterField::Likes) => self.posts.get(&id).map(|p| p.likes_count),
            (EntityKey::Post(id), CounterField::Comments) => {
                self.posts.get(&id).map(|p| p.comments_count)
            }
            (EntityKey::Profile(id), CounterField::Posts) => {
                self.profiles.get(&id).map(|p| p.posts_count)
            }
            (EntityKey::Profile(id), CounterField::Followers) => {
                self.profiles.get(&id).map(|p| p.followers_count)
            }
            (EntityKey::Profile(id), CounterField::Following) => {
                self.profiles.get(&id).map(|p| p.following_count)
            }
            _ => None,
        }
    }

    fn counter_mut(&mut self, key: EntityKey, field: CounterField) -> Option<&mut u64> {
        match (key, field) {
            (EntityKey::Post(id), CounterField::Likes) => {
                self.posts.get_mut(&id).map(|p| &mut p.likes_count)
            }
            (EntityKey::Post(id), CounterField::Comments) => {
                self.posts.get_mut(&id).map(|p| &mut p.comments_count)
            }
            (EntityKey::Profile(id), CounterField::Posts) => {
                self.profiles.get_mut(&id).map(|p| &mut p.posts_count)
            }
            (EntityKey::Profile(id), CounterField::Followers) => {
                self.profiles.get_mut(&id).map(|p| &mut p.followers_count)
            }
            (EntityKey::Profile(id), CounterField::Following) => {
                self.profiles.get_mut(&id).map(|p| &mut p.following_count)
            }
            _ => None,
        }
    }
}

/// Mutable access to the cache for the duration of one atomic local change.
///
/// Events are collected here and published once the write lock is released.
pub struct CacheTx<'a> {
    state: &'a mut CacheState,
    viewer: Option<Uuid>,
    events: Vec<CacheEvent>,
}

impl<'a> CacheTx<'a> {
    pub(crate) fn new(state: &'a mut CacheState, viewer: Option<Uuid>) -> Self {
        Self {
            state,
            viewer,
            events: Vec::new(),
        }
    }

    pub(crate) fn into_events(self) -> Vec<CacheEvent> {
        self.events
    }

    // ========== Reads ==========

    pub fn post(&self, id: Uuid) -> Option<Post> {
        self.state.post(id, self.viewer)
    }

    pub fn profile(&self, id: Uuid) -> Option<Profile> {
        self.state.profile(id, self.viewer)
    }

    pub fn comment(&self, id: Uuid) -> Option<Comment> {
        self.state.comment(id).cloned()
    }

    pub fn contains(&self, key: EntityKey) -> bool {
        match key {
            EntityKey::Post(id) => self.state.posts.contains_key(&id),
            EntityKey::Comment(id) => self.state.comments.contains_key(&id),
            EntityKey::Profile(id) => self.state.profiles.contains_key(&id),
        }
    }

    pub fn is_liked(&self, post_id: Uuid, actor_id: Uuid) -> bool {
        self.state.is_liked(post_id, actor_id)
    }

    pub fn is_following(&self, follower_id: Uuid, followee_id: Uuid) -> bool {
        self.state.is_following(follower_id, followee_id)
    }

    pub fn counter(&self, key: EntityKey, field: CounterField) -> Option<u64> {
        self.state.counter(key, field)
    }

    pub fn in_feed(&self, post_id: Uuid) -> bool {
        self.state.feed.contains(&post_id)
    }

    pub fn feed_ids(&self) -> Vec<Uuid> {
        self.state.feed.clone()
    }

    // ========== Writes ==========

    /// Merge one entity. Posts not yet in the feed list join it at the tail and
    /// unseen comments join their post's thread at the tail. A payload without
    /// a like or follow flag leaves the locally known edge untouched. Returns
    /// whether the entity was added (to the list, for posts).
    pub fn upsert(&mut self, entity: Entity) -> bool {
        self.write(entity, true)
    }

    /// Like [`CacheTx::upsert`], but a post not already in the feed list stays
    /// out of it. For single reads outside the paged collection.
    pub fn merge(&mut self, entity: Entity) -> bool {
        self.write(entity, false)
    }

    fn write(&mut self, entity: Entity, join_feed: bool) -> bool {
        let key = entity.key();
        let is_new = !self.contains(key);

        let added = match entity {
            Entity::Post(mut post) => {
                if let (Some(actor), Some(liked)) = (self.viewer, post.viewer_has_liked.take()) {
                    self.write_like(post.id, actor, liked);
                }
                let joins = join_feed && !self.in_feed(post.id);
                if joins {
                    self.state.feed.push(post.id);
                }
                self.state.posts.insert(post.id, post);
                if join_feed {
                    joins
                } else {
                    is_new
                }
            }
            Entity::Comment(comment) => {
                if is_new {
                    self.state
                        .threads
                        .entry(comment.post_id)
                        .or_default()
                        .push(comment.id);
                }
                self.state.comments.insert(comment.id, comment);
                is_new
            }
            Entity::Profile(mut profile) => {
                let follows = profile.viewer_follows.take();
                if let (Some(actor), Some(following)) = (self.viewer, follows) {
                    if let Ok(edge) = FollowEdge::new(actor, profile.id) {
                        self.write_follow(edge, following);
                    }
                }
                self.state.profiles.insert(profile.id, profile);
                is_new
            }
        };

        self.events.push(CacheEvent::Upserted(key));
        added
    }

    /// Insert a post at the head of the feed list (freshly created post)
    pub fn prepend_post(&mut self, mut post: Post) {
        let id = post.id;
        post.viewer_has_liked = None;
        self.state.feed.retain(|existing| *existing != id);
        self.state.feed.insert(0, id);
        self.state.posts.insert(id, post);
        self.events.push(CacheEvent::Upserted(EntityKey::Post(id)));
    }

    /// Swap a provisional comment for the server's record, keeping its position
    pub fn replace_comment(&mut self, provisional_id: Uuid, comment: Comment) -> bool {
        let Some(previous) = self.state.comments.remove(&provisional_id) else {
            return false;
        };
        if let Some(thread) = self.state.threads.get_mut(&previous.post_id) {
            if let Some(slot) = thread.iter_mut().find(|id| **id == provisional_id) {
                *slot = comment.id;
            }
        }
        let key = EntityKey::Comment(comment.id);
        self.state.comments.insert(comment.id, comment);
        self.events
            .push(CacheEvent::Removed(EntityKey::Comment(provisional_id)));
        self.events.push(CacheEvent::Upserted(key));
        true
    }

    /// Delete an entity and every reference to it. Idempotent.
    pub fn remove(&mut self, key: EntityKey) -> bool {
        let removed = match key {
            EntityKey::Post(id) => {
                let existed = self.state.posts.remove(&id).is_some();
                self.state.feed.retain(|existing| *existing != id);
                if let Some(comment_ids) = self.state.threads.remove(&id) {
                    for comment_id in comment_ids {
                        self.state.comments.remove(&comment_id);
                    }
                }
                self.state.likes.retain(|edge| edge.post_id != id);
                existed
            }
            EntityKey::Comment(id) => match self.state.comments.remove(&id) {
                Some(comment) => {
                    if let Some(thread) = self.state.threads.get_mut(&comment.post_id) {
                        thread.retain(|existing| *existing != id);
                    }
                    true
                }
                None => false,
            },
            EntityKey::Profile(id) => self.state.profiles.remove(&id).is_some(),
        };

        if removed {
            self.events.push(CacheEvent::Removed(key));
        }
        removed
    }

    /// Signed adjustment, clamped at zero. `None` when the counter is not cached.
    pub fn adjust_counter(&mut self, key: EntityKey, field: CounterField, delta: i64) -> Option<u64> {
        let slot = self.state.counter_mut(key, field)?;
        let before = *slot;
        *slot = if delta.is_negative() {
            before.saturating_sub(delta.unsigned_abs())
        } else {
            before.saturating_add(delta as u64)
        };
        let value = *slot;
        if value != before {
            self.events
                .push(CacheEvent::CounterChanged { key, field, value });
        }
        Some(value)
    }

    /// Exact write, used to restore a snapshot
    pub fn set_counter(&mut self, key: EntityKey, field: CounterField, value: u64) -> bool {
        let Some(slot) = self.state.counter_mut(key, field) else {
            return false;
        };
        if *slot != value {
            *slot = value;
            self.events
                .push(CacheEvent::CounterChanged { key, field, value });
        }
        true
    }

    pub fn set_liked(&mut self, post_id: Uuid, actor_id: Uuid, liked: bool) -> bool {
        self.write_like(post_id, actor_id, liked)
    }

    pub fn set_following(
        &mut self,
        follower_id: Uuid,
        followee_id: Uuid,
        following: bool,
    ) -> FeedResult<bool> {
        let edge = FollowEdge::new(follower_id, followee_id)?;
        Ok(self.write_follow(edge, following))
    }

    fn write_like(&mut self, post_id: Uuid, actor_id: Uuid, liked: bool) -> bool {
        let edge = LikeEdge { post_id, actor_id };
        let changed = if liked {
            self.state.likes.insert(edge)
        } else {
            self.state.likes.remove(&edge)
        };
        if changed {
            self.events
                .push(CacheEvent::EdgeChanged(EntityKey::Post(post_id)));
        }
        changed
    }

    fn write_follow(&mut self, edge: FollowEdge, following: bool) -> bool {
        let changed = if following {
            self.state.follows.insert(edge)
        } else {
            self.state.follows.remove(&edge)
        };
        if changed {
            self.events
                .push(CacheEvent::EdgeChanged(EntityKey::Profile(edge.followee_id())));
        }
        changed
    }
}

