//! Mapping from `Tick` to the persisted document.
//!
//! The key names are the external schema consumers query against and must not
//! change.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tick_common::{Result, Tick};

/// Persisted form of a tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickDocument<'a> {
    pub id: &'a str,
    #[serde(rename = "actionDate")]
    pub action_date: &'a str,
    #[serde(rename = "actionTime")]
    pub action_time: &'a str,
    pub exchange: &'a str,
    pub high: f64,
    pub close: f64,
    pub open: f64,
    pub low: f64,
    pub volume: i64,
    #[serde(rename = "marketVol")]
    pub market_vol: i64,
    #[serde(rename = "highestPrice")]
    pub highest_price: f64,
    #[serde(rename = "lowestPrice")]
    pub lowest_price: f64,
    #[serde(rename = "openPrice")]
    pub open_price: f64,
    #[serde(rename = "preSettlementPrice")]
    pub pre_settlement_price: f64,
    #[serde(rename = "preClosePrice")]
    pub pre_close_price: f64,
    #[serde(rename = "Turnover")]
    pub turnover: f64,
    #[serde(rename = "PreOpenInterest")]
    pub pre_open_interest: f64,
    #[serde(rename = "OpenInterest")]
    pub open_interest: f64,
    #[serde(rename = "UpperLimitPrice")]
    pub upper_limit_price: f64,
    #[serde(rename = "LowerLimitPrice")]
    pub lower_limit_price: f64,
    #[serde(rename = "mdTradingDay")]
    pub md_trading_day: &'a str,
    #[serde(rename = "mdUpdateTime")]
    pub md_update_time: &'a str,
    #[serde(rename = "recordTime")]
    pub record_time: DateTime<Utc>,
}

impl<'a> TickDocument<'a> {
    /// Borrows the persisted fields of `tick`.
    ///
    /// A tick that was never stamped by the engine gets the current time.
    pub fn from_tick(tick: &'a Tick) -> Self {
        TickDocument {
            id: &tick.instrument_id,
            action_date: &tick.action_day,
            action_time: &tick.action_time,
            exchange: &tick.exchange_id,
            high: tick.high,
            close: tick.close,
            open: tick.open,
            low: tick.low,
            volume: tick.volume,
            market_vol: tick.market_volume,
            highest_price: tick.highest_price,
            lowest_price: tick.lowest_price,
            open_price: tick.open_price,
            pre_settlement_price: tick.pre_settlement_price,
            pre_close_price: tick.pre_close_price,
            turnover: tick.turnover,
            pre_open_interest: tick.pre_open_interest,
            open_interest: tick.open_interest,
            upper_limit_price: tick.upper_limit_price,
            lower_limit_price: tick.lower_limit_price,
            md_trading_day: &tick.trading_day,
            md_update_time: &tick.update_time,
            record_time: tick.record_time.unwrap_or_else(Utc::now),
        }
    }

    /// Encodes the document as a JSON value.
    pub fn to_value(&self) -> Result<serde_json::Value> {
        let value = serde_json::to_value(self)?;
        Ok(value)
    }
}
