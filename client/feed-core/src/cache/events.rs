use crate::domain::{CounterField, EntityKey};

/// Change notification published after every mutating cache call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// Entity inserted or merged
    Upserted(EntityKey),
    /// Entity deleted; every list that referenced it no longer does
    Removed(EntityKey),
    /// A derived counter moved
    CounterChanged {
        key: EntityKey,
        field: CounterField,
        value: u64,
    },
    /// The viewer's like (post key) or follow (profile key) state flipped
    EdgeChanged(EntityKey),
}

impl CacheEvent {
    pub fn key(&self) -> EntityKey {
        match self {
            CacheEvent::Upserted(key)
            | CacheEvent::Removed(key)
            | CacheEvent::EdgeChanged(key) => *key,
            CacheEvent::CounterChanged { key, .. } => *key,
        }
    }
}
