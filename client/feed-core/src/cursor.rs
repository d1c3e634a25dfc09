//! Pagination cursor
//!
//! Offset/limit bookkeeping for one server-ordered collection. At most one
//! page request is in flight; a short page ends the collection for good.

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::context::FeedContext;
use crate::domain::{Entity, EntityKey, FeedFilter, PageRequest};
use crate::error::FeedError;
use crate::network::CallKind;

/// Observable cursor state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorState {
    pub filter: FeedFilter,
    pub offset: usize,
    pub limit: usize,
    pub has_more: bool,
    pub in_flight: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    InFlight,
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// `received` items came back, `appended` of them were new to the list
    Appended { received: usize, appended: usize },
    /// No request was made
    Skipped(SkipReason),
    /// The request failed; the cursor is now exhausted
    Failed(FeedError),
    /// The response arrived for a torn-down view or an older generation
    Discarded,
}

#[derive(Debug)]
struct Inner {
    state: CursorState,
    /// Bumped by `reset`; responses from an older generation are dropped
    generation: u64,
}

pub struct PaginationCursor {
    ctx: FeedContext,
    inner: Mutex<Inner>,
}

/// Clears the in-flight flag when the fetch ends, including on cancellation
struct InFlightGuard<'a> {
    inner: &'a Mutex<Inner>,
    generation: u64,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.inner.lock();
        if inner.generation == self.generation {
            inner.state.in_flight = false;
        }
    }
}

impl PaginationCursor {
    /// `initial_count` items were already rendered (server-side first page)
    /// and are never re-fetched.
    pub fn new(ctx: FeedContext, filter: FeedFilter, limit: usize, initial_count: usize) -> Self {
        Self {
            ctx,
            inner: Mutex::new(Inner {
                state: CursorState {
                    filter,
                    offset: initial_count,
                    limit: limit.max(1),
                    has_more: true,
                    in_flight: false,
                },
                generation: 0,
            }),
        }
    }

    pub fn state(&self) -> CursorState {
        self.inner.lock().state
    }

    pub fn has_more(&self) -> bool {
        self.inner.lock().state.has_more
    }

    /// Load the next page into the cache. No-op while a fetch is pending or
    /// once the collection is exhausted.
    pub async fn fetch_next(&self) -> FetchOutcome {
        let (request, generation) = {
            let mut inner = self.inner.lock();
            if inner.state.in_flight {
                debug!("Page fetch already in flight; skipped");
                return FetchOutcome::Skipped(SkipReason::InFlight);
            }
            if !inner.state.has_more {
                debug!(offset = inner.state.offset, "Collection exhausted; skipped");
                return FetchOutcome::Skipped(SkipReason::Exhausted);
            }
            inner.state.in_flight = true;
            let request = PageRequest {
                offset: inner.state.offset,
                limit: inner.state.limit,
                author_id: inner.state.filter.author_id(),
            };
            (request, inner.generation)
        };
        let _guard = InFlightGuard {
            inner: &self.inner,
            generation,
        };

        debug!(offset = request.offset, limit = request.limit, "Fetching page");
        let gateway = self.ctx.gateway.clone();
        let result = self
            .ctx
            .network
            .call(CallKind::Read, "fetch_page", move || async move {
                gateway.fetch_page(request).await
            })
            .await;

        if self.ctx.scope.is_closed() || self.inner.lock().generation != generation {
            debug!(offset = request.offset, "Page arrived for a stale view; discarded");
            self.ctx.stats.record_discard();
            return FetchOutcome::Discarded;
        }

        match result {
            Ok(page) => {
                let received = page.items.len();
                let appended = self
                    .ctx
                    .cache
                    .upsert_many(page.items.into_iter().map(Entity::Post));

                let mut inner = self.inner.lock();
                inner.state.offset += received;
                inner.state.has_more = received == inner.state.limit;
                self.ctx.stats.record_page();
                info!(
                    received,
                    appended,
                    offset = inner.state.offset,
                    has_more = inner.state.has_more,
                    took_all = page.took_all,
                    "Page fetched"
                );
                FetchOutcome::Appended { received, appended }
            }
            Err(e) => {
                self.inner.lock().state.has_more = false;
                self.ctx.stats.record_page_failure();
                warn!(offset = request.offset, error = %e, "Page fetch failed");
                self.ctx.notify_error(e.user_message());
                FetchOutcome::Failed(e)
            }
        }
    }

    /// Start over for `filter`. Cached feed posts are dropped and any page
    /// still in flight is discarded when it lands.
    pub fn reset(&self, filter: FeedFilter) {
        {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            inner.state = CursorState {
                filter,
                offset: 0,
                limit: inner.state.limit,
                has_more: true,
                in_flight: false,
            };
        }
        self.ctx.cache.transact(|tx| {
            for id in tx.feed_ids() {
                tx.remove(EntityKey::Post(id));
            }
        });
        info!(filter = ?filter, "Cursor reset");
    }

    /// A post was inserted at the head of the collection server-side
    pub fn note_inserted(&self) {
        self.inner.lock().state.offset += 1;
    }

    /// A post inside the fetched window was deleted server-side
    pub fn note_removed(&self) {
        let mut inner = self.inner.lock();
        inner.state.offset = inner.state.offset.saturating_sub(1);
    }
}
