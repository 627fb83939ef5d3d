//! Bar — the fundamental market data unit.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// OHLC bar plus best bid/ask for a single symbol.
///
/// Grid spacing and protection checks use bid/ask (the prices a market
/// order would actually trade at); high/low drive intrabar trigger checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
}

impl Bar {
    /// Basic sanity check: high >= low, OHLC within [low, high], positive prices.
    pub fn is_sane(&self) -> bool {
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > Decimal::ZERO
            && self.close > Decimal::ZERO
            && self.bid > Decimal::ZERO
            && self.ask >= self.bid
    }

    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }
}
