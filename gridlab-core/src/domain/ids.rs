use serde::{Deserialize, Serialize};
use std::fmt;

/// Correlation id attached to every order at submission and echoed back by
/// the execution venue on every lifecycle event (fill/cancel/reject).
///
/// Replaces the string-encoded order comments some venues truncate or
/// re-encode: the id is opaque, fixed-width, and owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(pub u64);

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic correlation id source, one per engine instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorrelationIdGen {
    next: u64,
}

impl CorrelationIdGen {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_id(&mut self) -> CorrelationId {
        let id = CorrelationId(self.next);
        self.next += 1;
        id
    }
}
