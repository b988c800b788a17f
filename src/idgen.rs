use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

/// Source of association identifiers, injected into every transform.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

#[derive(Debug, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        format!("uuid:{}", Uuid::new_v4())
    }
}

/// Deterministic ids (`uuid:0`, `uuid:1`, ...) for tests and reproducible runs.
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    counter: AtomicUsize,
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        format!("uuid:{}", self.counter.fetch_add(1, Ordering::SeqCst))
    }
}
