//! Domain types for the grid engine.

pub mod bar;
pub mod ids;
pub mod instrument;
pub mod ladder;
pub mod level;
pub mod order;
pub mod side;
pub mod signal;

pub use bar::Bar;
pub use ids::{CorrelationId, CorrelationIdGen};
pub use instrument::InstrumentScale;
pub use ladder::Ladder;
pub use level::{Level, LevelState};
pub use order::{CancelOrder, ExecutionEvent, OrderKind, OrderRequest, SubmitOrder};
pub use side::Side;
pub use signal::Signal;
