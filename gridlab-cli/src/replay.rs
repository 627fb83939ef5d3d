//! CSV bar replay through a simulated execution venue.
//!
//! The venue model is deliberately small: market orders fill in full at the
//! bar's quote, limit and stop orders rest until the bar range touches
//! them, cancels acknowledge if the order is still resting. Fills report
//! cumulative volume, matching what the engine expects from a real venue.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use gridlab_core::domain::{
    Bar, ExecutionEvent, OrderKind, OrderRequest, Side, Signal, SubmitOrder,
};
use gridlab_core::engine::GridEngine;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// One CSV row: a finished bar plus an optional signal column.
#[derive(Debug, Deserialize)]
struct BarRecord {
    timestamp: DateTime<Utc>,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    bid: Decimal,
    ask: Decimal,
    #[serde(default)]
    signal: Option<String>,
}

/// Load `(bar, signal)` pairs from a CSV file with columns
/// `timestamp,open,high,low,close,bid,ask[,signal]`.
pub fn load_bars(path: &Path, symbol: &str) -> Result<Vec<(Bar, Signal)>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut bars = Vec::new();
    for (line, record) in reader.deserialize().enumerate() {
        let record: BarRecord = record.with_context(|| format!("bar record {}", line + 1))?;
        let signal = match record.signal.as_deref() {
            None | Some("") => Signal::none(),
            Some("long") => Signal::long(),
            Some("short") => Signal::short(),
            Some(other) => bail!("unknown signal '{other}' in record {}", line + 1),
        };
        bars.push((
            Bar {
                symbol: symbol.to_string(),
                timestamp: record.timestamp,
                open: record.open,
                high: record.high,
                low: record.low,
                close: record.close,
                bid: record.bid,
                ask: record.ask,
            },
            signal,
        ));
    }
    Ok(bars)
}

/// In-memory venue. Orders rest here; fills and cancel acks come back as
/// [`ExecutionEvent`]s against the bar they trade on.
#[derive(Debug, Default)]
struct SimVenue {
    resting: Vec<SubmitOrder>,
}

impl SimVenue {
    fn submit(&mut self, request: OrderRequest, bar: &Bar, out: &mut Vec<ExecutionEvent>) {
        match request {
            OrderRequest::Submit(order) => match order.kind {
                OrderKind::Market => out.push(Self::fill_at_quote(&order, bar)),
                OrderKind::Limit | OrderKind::Stop => self.resting.push(order),
            },
            OrderRequest::Cancel(cancel) => {
                let before = self.resting.len();
                self.resting.retain(|o| o.id != cancel.id);
                if self.resting.len() < before {
                    out.push(ExecutionEvent::Cancelled { id: cancel.id });
                }
            }
        }
    }

    /// Match resting orders against a new bar's range.
    fn sweep(&mut self, bar: &Bar, out: &mut Vec<ExecutionEvent>) {
        let mut still = Vec::with_capacity(self.resting.len());
        for order in self.resting.drain(..) {
            let Some(trigger) = order.price else {
                out.push(Self::fill_at_quote(&order, bar));
                continue;
            };
            let crossed = match (order.kind, order.side) {
                (OrderKind::Limit, Side::Long) => bar.low <= trigger,
                (OrderKind::Limit, Side::Short) => bar.high >= trigger,
                (OrderKind::Stop, Side::Long) => bar.high >= trigger,
                (OrderKind::Stop, Side::Short) => bar.low <= trigger,
                (OrderKind::Market, _) => true,
            };
            if crossed {
                let price = match order.kind {
                    OrderKind::Limit => trigger,
                    _ => match order.side {
                        Side::Long => bar.ask,
                        Side::Short => bar.bid,
                    },
                };
                out.push(ExecutionEvent::Fill {
                    id: order.id,
                    price,
                    volume: order.volume,
                });
            } else {
                still.push(order);
            }
        }
        self.resting = still;
    }

    fn fill_at_quote(order: &SubmitOrder, bar: &Bar) -> ExecutionEvent {
        let price = match order.side {
            Side::Long => bar.ask,
            Side::Short => bar.bid,
        };
        ExecutionEvent::Fill {
            id: order.id,
            price,
            volume: order.volume,
        }
    }
}

/// End-of-run accounting for the operator summary.
#[derive(Debug, Clone)]
pub struct ReplaySummary {
    pub symbol: String,
    pub bars: usize,
    pub orders_submitted: usize,
    pub cancels_requested: usize,
    pub fills: usize,
    pub realized_pnl: Decimal,
    pub ending_equity: Decimal,
    pub peak_equity: Decimal,
    pub max_drawdown: Decimal,
    pub open_volume: Decimal,
    pub suspended: bool,
}

/// Drive every bar through the engine and the simulated venue.
pub fn replay(
    engine: &mut GridEngine,
    bars: &[(Bar, Signal)],
    initial_equity: Decimal,
) -> ReplaySummary {
    let mut venue = SimVenue::default();
    let mut equity = initial_equity;
    let mut peak = initial_equity;
    let mut max_drawdown = Decimal::ZERO;
    let mut orders_submitted = 0usize;
    let mut cancels_requested = 0usize;
    let mut fills = 0usize;
    let mut symbol = String::new();

    for (bar, signal) in bars {
        symbol = bar.symbol.clone();

        // Resting orders trade against the new bar before the engine sees it.
        let mut events = Vec::new();
        venue.sweep(bar, &mut events);
        for event in &events {
            if matches!(event, ExecutionEvent::Fill { .. }) {
                fills += 1;
            }
            engine.on_execution(event);
        }

        let requests = engine.on_market(signal, bar, equity);
        let mut events = Vec::new();
        for request in requests {
            match &request {
                OrderRequest::Submit(_) => orders_submitted += 1,
                OrderRequest::Cancel(_) => cancels_requested += 1,
            }
            venue.submit(request, bar, &mut events);
        }
        for event in &events {
            if matches!(event, ExecutionEvent::Fill { .. }) {
                fills += 1;
            }
            engine.on_execution(event);
        }

        equity = initial_equity + engine.realized_pnl() + engine.floating_pnl(bar.close);
        peak = peak.max(equity);
        max_drawdown = max_drawdown.max(peak - equity);
    }

    info!(bars = bars.len(), orders_submitted, fills, "replay finished");
    ReplaySummary {
        symbol,
        bars: bars.len(),
        orders_submitted,
        cancels_requested,
        fills,
        realized_pnl: engine.realized_pnl(),
        ending_equity: equity,
        peak_equity: peak,
        max_drawdown,
        open_volume: engine.open_volume(),
        suspended: engine.is_suspended(),
    }
}
