//! Correlation-id strategies.

use std::sync::atomic::{AtomicU64, Ordering};

use tdlink_types::CorrelationId;

/// Produces a fresh token for every outgoing request.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> CorrelationId;
}

/// Random version-4 UUIDs; unique for the life of the process without coordination.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV4Ids;

impl IdGenerator for UuidV4Ids {
    fn next_id(&self) -> CorrelationId {
        CorrelationId::new(uuid::Uuid::new_v4().to_string())
    }
}

/// `{prefix}{n}` with a monotonically increasing `n`, for deterministic tests.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> CorrelationId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        CorrelationId::new(format!("{}{n}", self.prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn uuid_ids_are_well_formed_and_distinct() {
        let ids = UuidV4Ids;
        let seen: HashSet<_> = (0..1000).map(|_| ids.next_id()).collect();
        assert_eq!(seen.len(), 1000);
        let sample = ids.next_id();
        let parsed = uuid::Uuid::parse_str(sample.as_str()).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn sequential_ids_count_up() {
        let ids = SequentialIds::new("req-");
        assert_eq!(ids.next_id().as_str(), "req-1");
        assert_eq!(ids.next_id().as_str(), "req-2");
    }
}
