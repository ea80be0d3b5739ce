//! Feed-facing callback interface.
//!
//! A concrete market-data binding owns the delivery thread and calls one method per
//! event it receives. The recorder only sees this trait, so bindings can be swapped
//! (a real exchange API, the `simulator`, a test double) without touching the
//! dispatcher.

use log::warn;
use tick_common::Tick;
use tick_common::feed::{ForQuoteResponse, LoginResponse, LogoutResponse, RspInfo, SpecificInstrument};

/// Receiver of feed events, called from the feed's delivery thread.
///
/// Implementations must return quickly: the feed delivers the next event only after
/// the current call returns.
pub trait FeedEventSink: Send + Sync {
    /// Connection to the front established.
    fn on_front_connected(&self);

    /// Connection to the front lost.
    fn on_front_disconnected(&self, reason: i32);

    /// No heartbeat for `time_lapse` seconds.
    fn on_heartbeat_warning(&self, time_lapse: i32) {
        warn!("Feed {}s no heartbeat!", time_lapse);
    }

    /// Login response.
    fn on_rsp_user_login(
        &self,
        login: Option<&LoginResponse>,
        info: Option<&RspInfo>,
        request_id: i32,
        is_last: bool,
    );

    /// Logout response.
    fn on_rsp_user_logout(
        &self,
        logout: Option<&LogoutResponse>,
        info: Option<&RspInfo>,
        request_id: i32,
        is_last: bool,
    );

    /// Unsolicited error response.
    fn on_rsp_error(&self, info: Option<&RspInfo>, request_id: i32, is_last: bool);

    /// Depth-data subscription response.
    fn on_rsp_sub_market_data(
        &self,
        instrument: Option<&SpecificInstrument>,
        info: Option<&RspInfo>,
        request_id: i32,
        is_last: bool,
    );

    /// Depth-data unsubscription response.
    fn on_rsp_unsub_market_data(
        &self,
        instrument: Option<&SpecificInstrument>,
        info: Option<&RspInfo>,
        request_id: i32,
        is_last: bool,
    );

    /// Quote-request subscription response.
    fn on_rsp_sub_for_quote(
        &self,
        instrument: Option<&SpecificInstrument>,
        info: Option<&RspInfo>,
        request_id: i32,
        is_last: bool,
    );

    /// Quote-request unsubscription response.
    fn on_rsp_unsub_for_quote(
        &self,
        instrument: Option<&SpecificInstrument>,
        info: Option<&RspInfo>,
        request_id: i32,
        is_last: bool,
    );

    /// Depth-market-data tick. Ownership passes to the sink.
    fn on_rtn_depth_market_data(&self, tick: Tick);

    /// Quote-request response.
    fn on_rtn_for_quote_rsp(&self, quote: &ForQuoteResponse);
}
