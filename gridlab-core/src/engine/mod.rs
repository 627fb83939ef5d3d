//! The grid engine: configuration and the per-instrument state machine.

pub mod config;
pub mod grid_engine;

pub use config::EngineConfig;
pub use grid_engine::{GridEngine, Phase};
