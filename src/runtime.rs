//! Runtime context: injected time and record-id generation.
//!
//! Every record id and timestamp the engine writes goes through these
//! traits, so tests can pin both with the `Fake*` implementations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Shared handles for time and id generation, cloned into every component
/// that constructs records.
#[derive(Clone)]
pub struct RuntimeContext {
    pub time_provider: Arc<dyn TimeProvider>,
    pub id_generator: Arc<dyn IdGenerator>,
}

impl Default for RuntimeContext {
    fn default() -> Self {
        Self {
            time_provider: Arc::new(RealTimeProvider),
            id_generator: Arc::new(RealIdGenerator),
        }
    }
}

impl RuntimeContext {
    pub fn new(time_provider: Arc<dyn TimeProvider>, id_generator: Arc<dyn IdGenerator>) -> Self {
        Self {
            time_provider,
            id_generator,
        }
    }

    /// Unix timestamp in seconds.
    pub fn now(&self) -> i64 {
        self.time_provider.now_timestamp()
    }

    /// Fresh record id.
    pub fn next_id(&self) -> String {
        self.id_generator.next_id()
    }
}

pub trait TimeProvider: Send + Sync {
    fn now_timestamp(&self) -> i64;
}

pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

// --- Real implementations ---

pub struct RealTimeProvider;

impl TimeProvider for RealTimeProvider {
    fn now_timestamp(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }
}

pub struct RealIdGenerator;

impl IdGenerator for RealIdGenerator {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

// --- Fake implementations for tests ---

pub struct FakeTimeProvider {
    pub fixed_timestamp: i64,
}

impl TimeProvider for FakeTimeProvider {
    fn now_timestamp(&self) -> i64 {
        self.fixed_timestamp
    }
}

pub struct FakeIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl FakeIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for FakeIdGenerator {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", self.prefix, n)
    }
}
