//! Identifier generation.
//!
//! Widget ids are minted when the wizard confirms a new widget and when a
//! stored widget arrives without one. Both paths take an [`IdGenerator`]
//! so that tests can use [`SequentialIds`] and get reproducible output.

use std::sync::atomic::{AtomicU64, Ordering};

/// Capability for minting fresh identifiers.
pub trait IdGenerator: Send + Sync {
    /// Return a new identifier, unique for the lifetime of the generator.
    fn next_id(&self, prefix: &str) -> String;
}

/// Random v4 UUIDs, used in production.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", uuid::Uuid::new_v4().simple())
    }
}

/// Deterministic `{prefix}-{n}` identifiers starting at 1.
#[derive(Debug, Default)]
pub struct SequentialIds {
    counter: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{prefix}-{n}")
    }
}
