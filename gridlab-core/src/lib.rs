//! GridLab Core — grid/averaging position engine.
//!
//! This crate contains the heart of the grid trading engine:
//! - Domain types (bars, instrument scale, levels, ladders, orders, events)
//! - Volume progression policies (fixed, multiplier, Fibonacci, risk-percent)
//! - Spacing policy for averaging entries
//! - Protection calculator (per-level stop/take, basket target, break-even,
//!   trailing) with the stop ratchet invariant
//! - Order lifecycle tracker keyed by correlation id
//! - Risk breaker (drawdown / absolute floating loss)
//! - The per-instrument `GridEngine` state machine tying it all together
//!
//! The engine is single-threaded and event-driven: market events and order
//! lifecycle events are applied one at a time to an exclusively owned pair
//! of ladders (long/short). Order submission is fire-and-forget; the engine
//! never assumes synchronous acknowledgement.

pub mod domain;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod progression;
pub mod protection;
pub mod risk;
pub mod spacing;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: engine and domain types are Send + Sync, so a
    /// host may run one engine per instrument on a worker thread.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::InstrumentScale>();
        require_sync::<domain::InstrumentScale>();
        require_send::<domain::Level>();
        require_sync::<domain::Level>();
        require_send::<domain::Ladder>();
        require_sync::<domain::Ladder>();
        require_send::<domain::OrderRequest>();
        require_sync::<domain::OrderRequest>();
        require_send::<domain::ExecutionEvent>();
        require_sync::<domain::ExecutionEvent>();

        require_send::<lifecycle::OrderLifecycleTracker>();
        require_sync::<lifecycle::OrderLifecycleTracker>();
        require_send::<risk::RiskBreaker>();
        require_sync::<risk::RiskBreaker>();
        require_send::<engine::EngineConfig>();
        require_sync::<engine::EngineConfig>();
        require_send::<engine::GridEngine>();
        require_sync::<engine::GridEngine>();
    }
}
