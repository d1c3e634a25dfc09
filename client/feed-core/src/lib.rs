/// Feed Core Library
///
/// Client-side interaction and consistency layer for the social feed.
///
/// Keeps per-post like state, like/comment counters, infinite-scroll cursors
/// and the detail-view cursor consistent across optimistic mutations,
/// background re-fetches and deletes, while tolerating network failure and
/// out-of-order responses.
///
/// # Architecture
///
/// - `cache`: per-view entity store with change notifications
/// - `cursor`: offset/limit paging with in-flight and exhaustion guards
/// - `mutation`: optimistic and confirmation-gated writes
/// - `navigator`: detail-view prev/next over the live feed list
/// - `network`: timeout, failure classification and online tracking
/// - `session`: wires the above together for one view
pub mod cache;
pub mod config;
pub mod context;
pub mod cursor;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod gesture;
pub mod logging;
pub mod mutation;
pub mod navigator;
pub mod network;
pub mod notify;
pub mod scope;
pub mod session;
pub mod stats;
pub mod validation;

pub use cache::{CacheEvent, EntityCache, WeakEntityCache};
pub use config::FeedConfig;
pub use cursor::{CursorState, FetchOutcome, PaginationCursor, SkipReason};
pub use domain::*;
pub use error::{FeedError, FeedResult};
pub use gateway::{FeedGateway, HttpFeedGateway, IdentityProvider, StaticIdentity};
pub use gesture::{classify_swipe, DoubleTapDetector, Swipe, SwipeConfig, Tap};
pub use mutation::{MutationEngine, MutationKind, MutationOutcome, MutationPhase, RejectReason};
pub use navigator::{DetailNavigator, NavKey, Navigation};
pub use network::{CallKind, NetworkClient};
pub use notify::{LogNotifier, Notice, Notifier};
pub use scope::ViewScope;
pub use session::{FeedSession, SessionOptions};
pub use stats::{FeedStats, StatsCollector};
