use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::EntityKey;
use crate::error::FeedError;

/// What a mutation does to its entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Like,
    Follow,
    Comment,
    DeleteComment,
    DeletePost,
    CreatePost,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Like => "like",
            MutationKind::Follow => "follow",
            MutationKind::Comment => "comment",
            MutationKind::DeleteComment => "delete_comment",
            MutationKind::DeletePost => "delete_post",
            MutationKind::CreatePost => "create_post",
        }
    }
}

/// Lifecycle of one mutation per entity+action
///
/// `Idle -> Applying -> { Committed | RolledBack }`. Confirmation-gated
/// mutations that fail go back to `Idle`; they never changed anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationPhase {
    #[default]
    Idle,
    Applying,
    Committed,
    RolledBack,
}

/// Why a mutation was refused before anything was dispatched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Same entity+action already in flight
    AlreadyPending,
    SelfFollow,
    /// The entity is not in the cache
    NotCached,
    /// Failed a local pre-flight check (content limits, ownership)
    Invalid(FeedError),
}

/// Result of one user-initiated mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome<T = ()> {
    /// Server confirmed; local state is authoritative
    Committed(T),
    /// Optimistic write was reverted to its snapshot
    RolledBack(FeedError),
    /// Confirmation-gated write refused by the server; nothing changed locally
    Failed(FeedError),
    /// No identity; the user was sent to sign in and nothing changed
    SignInRequired,
    Rejected(RejectReason),
    /// Completion arrived after the view was torn down
    Discarded,
    /// Already in the requested state; nothing dispatched
    Unchanged,
}

impl<T> MutationOutcome<T> {
    pub fn is_committed(&self) -> bool {
        matches!(self, MutationOutcome::Committed(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> MutationOutcome<U> {
        match self {
            MutationOutcome::Committed(value) => MutationOutcome::Committed(f(value)),
            MutationOutcome::RolledBack(e) => MutationOutcome::RolledBack(e),
            MutationOutcome::Failed(e) => MutationOutcome::Failed(e),
            MutationOutcome::SignInRequired => MutationOutcome::SignInRequired,
            MutationOutcome::Rejected(reason) => MutationOutcome::Rejected(reason),
            MutationOutcome::Discarded => MutationOutcome::Discarded,
            MutationOutcome::Unchanged => MutationOutcome::Unchanged,
        }
    }

    pub fn error(&self) -> Option<&FeedError> {
        match self {
            MutationOutcome::RolledBack(e) | MutationOutcome::Failed(e) => Some(e),
            MutationOutcome::Rejected(RejectReason::Invalid(e)) => Some(e),
            _ => None,
        }
    }
}

type PhaseKey = (EntityKey, MutationKind);

/// In-flight flags, one per entity+action
#[derive(Clone, Default)]
pub(crate) struct PendingSet {
    phases: Arc<Mutex<HashMap<PhaseKey, MutationPhase>>>,
}

impl PendingSet {
    /// `None` while the same entity+action is already applying
    pub(crate) fn try_begin(&self, key: EntityKey, kind: MutationKind) -> Option<PendingGuard> {
        let mut phases = self.phases.lock();
        let phase = phases.entry((key, kind)).or_default();
        if *phase == MutationPhase::Applying {
            return None;
        }
        *phase = MutationPhase::Applying;
        Some(PendingGuard {
            phases: self.phases.clone(),
            key: (key, kind),
            settled: false,
        })
    }

    pub(crate) fn phase(&self, key: EntityKey, kind: MutationKind) -> MutationPhase {
        self.phases
            .lock()
            .get(&(key, kind))
            .copied()
            .unwrap_or_default()
    }
}

/// Holds the in-flight flag; dropping it unsettled returns the phase to `Idle`
pub(crate) struct PendingGuard {
    phases: Arc<Mutex<HashMap<PhaseKey, MutationPhase>>>,
    key: PhaseKey,
    settled: bool,
}

impl PendingGuard {
    pub(crate) fn settle(mut self, phase: MutationPhase) {
        self.phases.lock().insert(self.key, phase);
        self.settled = true;
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if !self.settled {
            self.phases.lock().insert(self.key, MutationPhase::Idle);
        }
    }
}
