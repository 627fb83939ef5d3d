//! Outbound order requests and inbound execution lifecycle events.

use super::ids::CorrelationId;
use super::side::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What kind of order to place at the venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    /// Fill at the current bid/ask.
    Market,
    /// Fill at `price` or better.
    Limit,
    /// Trigger at `price`, then fill as market.
    Stop,
}

/// A new order request sent to the execution venue.
///
/// Fire-and-forget: the venue reports the outcome asynchronously via
/// [`ExecutionEvent`]s carrying the same correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitOrder {
    pub id: CorrelationId,
    pub side: Side,
    pub kind: OrderKind,
    /// Required for Limit/Stop, ignored for Market.
    pub price: Option<Decimal>,
    pub volume: Decimal,
    /// Exit orders only reduce an existing position, never open one.
    pub reduce_only: bool,
}

/// Cancellation request. Idempotent at the venue: cancelling an already
/// filled or already cancelled order is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    pub id: CorrelationId,
}

/// Everything the engine may ask the venue to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderRequest {
    Submit(SubmitOrder),
    Cancel(CancelOrder),
}

impl OrderRequest {
    pub fn correlation_id(&self) -> CorrelationId {
        match self {
            OrderRequest::Submit(s) => s.id,
            OrderRequest::Cancel(c) => c.id,
        }
    }
}

/// Asynchronous order lifecycle report from the venue.
///
/// `volume` on a fill is the venue's *cumulative* filled volume for the
/// order. The venue's number always wins over local expectations; duplicate
/// delivery of the same report is therefore harmless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionEvent {
    Fill {
        id: CorrelationId,
        price: Decimal,
        volume: Decimal,
    },
    Cancelled {
        id: CorrelationId,
    },
    Rejected {
        id: CorrelationId,
    },
}

impl ExecutionEvent {
    pub fn correlation_id(&self) -> CorrelationId {
        match self {
            ExecutionEvent::Fill { id, .. } => *id,
            ExecutionEvent::Cancelled { id } => *id,
            ExecutionEvent::Rejected { id } => *id,
        }
    }
}
