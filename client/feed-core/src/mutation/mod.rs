//! Optimistic mutation engine

mod engine;
mod state;

pub use engine::MutationEngine;
pub use state::{MutationKind, MutationOutcome, MutationPhase, RejectReason};
