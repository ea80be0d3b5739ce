//! Depth-market-data record.
//!
//! A `Tick` is one snapshot of an instrument as delivered by the feed. It is created
//! by the feed binding, stamped with `record_time` when the persistence engine accepts
//! it, and never mutated after that.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One depth-market-data snapshot for an instrument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Instrument identifier (e.g. `IF2012`).
    pub instrument_id: String,
    /// Exchange identifier.
    pub exchange_id: String,
    /// Instrument identifier as used by the exchange.
    pub exchange_inst_id: String,
    /// Trading day reported by the feed, `YYYYMMDD`.
    pub trading_day: String,
    /// Calendar day of the action.
    pub action_day: String,
    /// Wall-clock time of the action.
    pub action_time: String,
    /// Last update time reported by the feed, `HH:MM:SS`.
    pub update_time: String,
    /// Millisecond offset within `update_time`.
    pub update_millisec: i32,

    /// Last traded price.
    pub last_price: f64,
    /// Open of the record's interval.
    pub open: f64,
    /// High of the record's interval.
    pub high: f64,
    /// Low of the record's interval.
    pub low: f64,
    /// Close of the record's interval.
    pub close: f64,
    /// Session open price.
    pub open_price: f64,
    /// Session highest price.
    pub highest_price: f64,
    /// Session lowest price.
    pub lowest_price: f64,
    /// Settlement price.
    pub settlement_price: f64,
    /// Previous settlement price.
    pub pre_settlement_price: f64,
    /// Previous close price.
    pub pre_close_price: f64,
    /// Upper limit price.
    pub upper_limit_price: f64,
    /// Lower limit price.
    pub lower_limit_price: f64,
    /// Average price.
    pub average_price: f64,

    /// Volume traded within the record. Zero means no trading happened.
    pub volume: i64,
    /// Cumulative volume as reported by the feed.
    pub market_volume: i64,
    /// Turnover.
    pub turnover: f64,
    /// Open interest.
    pub open_interest: f64,
    /// Previous open interest.
    pub pre_open_interest: f64,

    /// Best bid price.
    pub bid_price1: f64,
    /// Best bid volume.
    pub bid_volume1: i64,
    /// Best ask price.
    pub ask_price1: f64,
    /// Best ask volume.
    pub ask_volume1: i64,
    /// Second level bid price.
    pub bid_price2: f64,
    /// Second level bid volume.
    pub bid_volume2: i64,
    /// Second level ask price.
    pub ask_price2: f64,
    /// Second level ask volume.
    pub ask_volume2: i64,

    /// Sink partition the record is routed to.
    pub destination_id: String,
    /// Ingestion timestamp, set when the record is accepted for persistence.
    pub record_time: Option<DateTime<Utc>>,
}

impl Tick {
    /// Creates an empty tick for `instrument_id` routed to `destination_id`.
    pub fn new(instrument_id: &str, destination_id: &str) -> Self {
        Tick {
            instrument_id: String::from(instrument_id),
            destination_id: String::from(destination_id),
            ..Default::default()
        }
    }

    /// Returns `true` when the record carries trading activity.
    ///
    /// Records with zero volume are non-trading noise and are never persisted.
    pub fn is_trading(&self) -> bool {
        self.volume != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_volume_is_not_trading() {
        let mut tick = Tick::new("IF2012", "futures");
        assert!(!tick.is_trading());

        tick.volume = 120;
        assert!(tick.is_trading());
    }

    #[test]
    fn new_sets_routing_fields_only() {
        let tick = Tick::new("IF2012", "futures");
        assert_eq!(tick.instrument_id, "IF2012");
        assert_eq!(tick.destination_id, "futures");
        assert_eq!(tick.last_price, 0.0);
        assert!(tick.record_time.is_none());
    }
}
