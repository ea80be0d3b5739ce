//! Feed event kinds and response payloads.
//!
//! These are the values a market-data feed binding hands to the dispatcher. They only
//! carry data; session handling and the wire format stay inside the binding.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::error::RecorderError;

/// Every kind of event a handler can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum EventKind {
    /// Connection to the feed front established.
    Connected,
    /// Connection to the feed front lost, with a reason code.
    Disconnected,
    /// Response to a login request.
    LoginResult,
    /// Response to a logout request.
    LogoutResult,
    /// Unsolicited error response.
    Error,
    /// Response to a depth-data subscription.
    SubscribeResult,
    /// Response to a depth-data unsubscription.
    UnsubscribeResult,
    /// Response to a quote-request subscription.
    QuoteSubscribeResult,
    /// Response to a quote-request unsubscription.
    QuoteUnsubscribeResult,
    /// Depth-market-data tick.
    Tick,
    /// Quote-request response.
    Quote,
}

/// Error information attached to feed responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RspInfo {
    /// Zero on success.
    pub error_id: i32,
    /// Human readable message.
    pub error_msg: String,
}

impl RspInfo {
    /// Creates an error payload.
    pub fn new(error_id: i32, error_msg: &str) -> Self {
        RspInfo {
            error_id,
            error_msg: String::from(error_msg),
        }
    }

    /// Returns `true` when the payload carries a nonzero error code.
    pub fn is_error(&self) -> bool {
        self.error_id != 0
    }
}

impl From<&RspInfo> for RecorderError {
    fn from(info: &RspInfo) -> Self {
        RecorderError::FeedError {
            error_id: info.error_id,
            error_msg: info.error_msg.clone(),
        }
    }
}

/// Successful login details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Trading day the session belongs to.
    pub trading_day: String,
    /// Login time reported by the front.
    pub login_time: String,
    /// Broker identifier.
    pub broker_id: String,
    /// User identifier.
    pub user_id: String,
    /// Front identifier.
    pub front_id: i32,
    /// Session identifier.
    pub session_id: i32,
}

/// Logout details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutResponse {
    /// Broker identifier.
    pub broker_id: String,
    /// User identifier.
    pub user_id: String,
}

/// Instrument named in a subscription response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecificInstrument {
    /// Instrument identifier.
    pub instrument_id: String,
}

impl SpecificInstrument {
    /// Wraps an instrument id.
    pub fn new(instrument_id: &str) -> Self {
        SpecificInstrument {
            instrument_id: String::from(instrument_id),
        }
    }
}

/// Quote-request response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForQuoteResponse {
    /// Trading day.
    pub trading_day: String,
    /// Instrument identifier.
    pub instrument_id: String,
    /// Exchange-assigned quote request id.
    pub for_quote_sys_id: String,
    /// Time of the quote request.
    pub for_quote_time: String,
    /// Calendar day of the request.
    pub action_day: String,
    /// Exchange identifier.
    pub exchange_id: String,
}
