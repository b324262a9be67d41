//! Render context identity.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use serde::{Serialize, Serializer};

/// Unique identifier for a render context.
///
/// Ids are strings so hosts can embed their own component naming. They are
/// stable for the lifetime of the context and never reused within a process
/// when produced by [`SequentialIds`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(Arc<str>);

impl ContextId {
    /// Wrap an externally assigned id.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Take the next id from the process-wide generator.
    pub fn next() -> Self {
        process_ids().next_id()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ContextId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Source of context ids.
///
/// Inject one where deterministic ids matter (tests, snapshot output).
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> ContextId;
}

/// Prefixed counter ids: `ctx-0`, `ctx-1`, ...
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::starting_at(prefix, 0)
    }

    pub fn starting_at(prefix: impl Into<String>, start: u64) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(start),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> ContextId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        ContextId::new(format!("{}-{}", self.prefix, n))
    }
}

fn process_ids() -> &'static SequentialIds {
    static IDS: OnceLock<SequentialIds> = OnceLock::new();
    IDS.get_or_init(|| SequentialIds::new("ctx"))
}
