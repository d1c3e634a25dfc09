//! Detail-view navigator
//!
//! Tracks which post is open over the same feed list the cache holds. The
//! navigator never owns that list; every move re-resolves the current id
//! against the live list.

use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::{CacheEvent, EntityCache, WeakEntityCache};
use crate::domain::{EntityKey, Post};
use crate::gesture::{classify_swipe, Swipe, SwipeConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Left,
    Right,
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Moved(Uuid),
    /// At a boundary or nothing open; nothing changed
    Stayed,
    Closed,
}

pub struct DetailNavigator {
    cache: WeakEntityCache,
    events: broadcast::Receiver<CacheEvent>,
    current: Option<Uuid>,
    swipe: SwipeConfig,
}

impl DetailNavigator {
    pub fn new(cache: &EntityCache, swipe: SwipeConfig) -> Self {
        Self {
            cache: cache.downgrade(),
            events: cache.subscribe(),
            current: None,
            swipe,
        }
    }

    /// Open `post_id`; refused when it is not in the feed list
    pub fn open(&mut self, post_id: Uuid) -> bool {
        self.sync();
        let present = self
            .cache
            .upgrade()
            .and_then(|cache| cache.position(post_id))
            .is_some();
        if present {
            debug!(post_id = %post_id, "Detail view opened");
            self.current = Some(post_id);
        }
        present
    }

    pub fn close(&mut self) {
        if let Some(post_id) = self.current.take() {
            debug!(post_id = %post_id, "Detail view closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<Uuid> {
        self.current
    }

    pub fn current_post(&self) -> Option<Post> {
        let id = self.current?;
        self.cache.upgrade()?.post(id)
    }

    /// Index of the current post in the live list; closes on a dangling id
    fn current_index(&mut self) -> Option<(EntityCache, usize)> {
        let id = self.current?;
        let Some(cache) = self.cache.upgrade() else {
            self.current = None;
            return None;
        };
        match cache.position(id) {
            Some(index) => Some((cache, index)),
            None => {
                self.on_entity_removed(id);
                None
            }
        }
    }

    pub fn has_next(&mut self) -> bool {
        self.current_index()
            .map(|(cache, index)| index + 1 < cache.feed_len())
            .unwrap_or(false)
    }

    pub fn has_previous(&mut self) -> bool {
        self.current_index()
            .map(|(_, index)| index > 0)
            .unwrap_or(false)
    }

    /// Move one item forward; no-op at the last item
    pub fn next(&mut self) -> Navigation {
        self.sync();
        let Some((cache, index)) = self.current_index() else {
            return self.closed_or_stayed();
        };
        match cache.post_at(index + 1) {
            Some(id) => {
                self.current = Some(id);
                Navigation::Moved(id)
            }
            None => Navigation::Stayed,
        }
    }

    /// Move one item back; no-op at the first item
    pub fn previous(&mut self) -> Navigation {
        self.sync();
        let Some((cache, index)) = self.current_index() else {
            return self.closed_or_stayed();
        };
        let Some(prev) = index.checked_sub(1) else {
            return Navigation::Stayed;
        };
        match cache.post_at(prev) {
            Some(id) => {
                self.current = Some(id);
                Navigation::Moved(id)
            }
            None => Navigation::Stayed,
        }
    }

    fn closed_or_stayed(&self) -> Navigation {
        if self.current.is_none() {
            Navigation::Closed
        } else {
            Navigation::Stayed
        }
    }

    /// Close the view when the current post went away
    pub fn on_entity_removed(&mut self, post_id: Uuid) -> bool {
        if self.current == Some(post_id) {
            info!(post_id = %post_id, "Open post removed; closing detail view");
            self.current = None;
            return true;
        }
        false
    }

    /// Drain cache events published since the last call. Returns `true` when
    /// the view was closed.
    pub fn sync(&mut self) -> bool {
        let mut closed = false;
        loop {
            match self.events.try_recv() {
                Ok(CacheEvent::Removed(EntityKey::Post(id))) => {
                    closed |= self.on_entity_removed(id);
                }
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Navigator lagged behind cache events");
                    // Fall back to checking the live list directly
                    if let Some(id) = self.current {
                        let present = self
                            .cache
                            .upgrade()
                            .and_then(|cache| cache.position(id))
                            .is_some();
                        if !present {
                            closed |= self.on_entity_removed(id);
                        }
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        closed
    }

    pub fn handle_key(&mut self, key: NavKey) -> Navigation {
        if !self.is_open() {
            return Navigation::Stayed;
        }
        match key {
            NavKey::Left => self.previous(),
            NavKey::Right => self.next(),
            NavKey::Escape => {
                self.close();
                Navigation::Closed
            }
        }
    }

    /// `dx`/`dy` are end minus start of one drag
    pub fn handle_swipe(&mut self, dx: f32, dy: f32) -> Navigation {
        if !self.is_open() {
            return Navigation::Stayed;
        }
        match classify_swipe(dx, dy, &self.swipe) {
            Swipe::Dismiss => {
                self.close();
                Navigation::Closed
            }
            Swipe::Next => self.next(),
            Swipe::Previous => self.previous(),
            Swipe::None => Navigation::Stayed,
        }
    }
}
