//! Feed event dispatcher.
//!
//! `FeedDispatcher` sits between the feed's delivery thread and application logic. It
//! keeps at most one handler per `EventKind` and implements `FeedEventSink`, so a feed
//! binding calls straight into it.
//!
//! Locking contract:
//! - Every dispatch takes the table lock, looks up the handler and invokes it while
//!   still holding the lock. A `register`/`clear` racing with a dispatch of the same
//!   kind therefore either happens fully before or fully after that invocation.
//! - The lock is not reentrant. A handler that calls `register`, `clear` or
//!   `clear_all` on the same dispatcher deadlocks the feed thread.
//! - A slow handler stalls the feed thread, and every other dispatch, for its whole
//!   duration. Handlers should only hand data off (e.g. enqueue into the persistence
//!   engine) and return.
//!
//! Responses with a nonzero error code are logged at error level before the handler
//! sees them; the log level never decides whether the handler runs. Ticks with zero
//! volume are dropped before reaching the `Tick` handler.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, error, info, log, Level};
use tick_common::feed::{ForQuoteResponse, LoginResponse, LogoutResponse, RspInfo, SpecificInstrument};
use tick_common::{EventKind, Tick};

use crate::feed::FeedEventSink;

type ResponseFn<T> = Box<dyn FnMut(Option<&T>, Option<&RspInfo>) + Send>;

/// A callback bound to one event kind.
pub enum Handler {
    Connected(Box<dyn FnMut() + Send>),
    Disconnected(Box<dyn FnMut(i32) + Send>),
    LoginResult(ResponseFn<LoginResponse>),
    LogoutResult(ResponseFn<LogoutResponse>),
    Error(Box<dyn FnMut(Option<&RspInfo>) + Send>),
    SubscribeResult(ResponseFn<SpecificInstrument>),
    UnsubscribeResult(ResponseFn<SpecificInstrument>),
    QuoteSubscribeResult(ResponseFn<SpecificInstrument>),
    QuoteUnsubscribeResult(ResponseFn<SpecificInstrument>),
    Tick(Box<dyn FnMut(Tick) + Send>),
    Quote(Box<dyn FnMut(&ForQuoteResponse) + Send>),
}

impl Handler {
    pub fn connected(f: impl FnMut() + Send + 'static) -> Self {
        Handler::Connected(Box::new(f))
    }

    pub fn disconnected(f: impl FnMut(i32) + Send + 'static) -> Self {
        Handler::Disconnected(Box::new(f))
    }

    pub fn login_result(
        f: impl FnMut(Option<&LoginResponse>, Option<&RspInfo>) + Send + 'static,
    ) -> Self {
        Handler::LoginResult(Box::new(f))
    }

    pub fn logout_result(
        f: impl FnMut(Option<&LogoutResponse>, Option<&RspInfo>) + Send + 'static,
    ) -> Self {
        Handler::LogoutResult(Box::new(f))
    }

    pub fn error(f: impl FnMut(Option<&RspInfo>) + Send + 'static) -> Self {
        Handler::Error(Box::new(f))
    }

    pub fn subscribe_result(
        f: impl FnMut(Option<&SpecificInstrument>, Option<&RspInfo>) + Send + 'static,
    ) -> Self {
        Handler::SubscribeResult(Box::new(f))
    }

    pub fn unsubscribe_result(
        f: impl FnMut(Option<&SpecificInstrument>, Option<&RspInfo>) + Send + 'static,
    ) -> Self {
        Handler::UnsubscribeResult(Box::new(f))
    }

    pub fn quote_subscribe_result(
        f: impl FnMut(Option<&SpecificInstrument>, Option<&RspInfo>) + Send + 'static,
    ) -> Self {
        Handler::QuoteSubscribeResult(Box::new(f))
    }

    pub fn quote_unsubscribe_result(
        f: impl FnMut(Option<&SpecificInstrument>, Option<&RspInfo>) + Send + 'static,
    ) -> Self {
        Handler::QuoteUnsubscribeResult(Box::new(f))
    }

    pub fn tick(f: impl FnMut(Tick) + Send + 'static) -> Self {
        Handler::Tick(Box::new(f))
    }

    pub fn quote(f: impl FnMut(&ForQuoteResponse) + Send + 'static) -> Self {
        Handler::Quote(Box::new(f))
    }

    /// The event kind this handler is registered under.
    pub fn kind(&self) -> EventKind {
        match self {
            Handler::Connected(_) => EventKind::Connected,
            Handler::Disconnected(_) => EventKind::Disconnected,
            Handler::LoginResult(_) => EventKind::LoginResult,
            Handler::LogoutResult(_) => EventKind::LogoutResult,
            Handler::Error(_) => EventKind::Error,
            Handler::SubscribeResult(_) => EventKind::SubscribeResult,
            Handler::UnsubscribeResult(_) => EventKind::UnsubscribeResult,
            Handler::QuoteSubscribeResult(_) => EventKind::QuoteSubscribeResult,
            Handler::QuoteUnsubscribeResult(_) => EventKind::QuoteUnsubscribeResult,
            Handler::Tick(_) => EventKind::Tick,
            Handler::Quote(_) => EventKind::Quote,
        }
    }
}

/// How a feed response is reported in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// Nonzero error code.
    Failed,
    /// Payload present, last response of the request, no error code.
    Succeeded,
    /// Anything else, e.g. an intermediate response of a multi-part reply.
    Partial,
}

impl ResponseOutcome {
    pub fn classify(has_payload: bool, info: Option<&RspInfo>, is_last: bool) -> Self {
        if info.is_some_and(RspInfo::is_error) {
            ResponseOutcome::Failed
        } else if has_payload && is_last {
            ResponseOutcome::Succeeded
        } else {
            ResponseOutcome::Partial
        }
    }

    fn level(self) -> Level {
        match self {
            ResponseOutcome::Failed => Level::Error,
            ResponseOutcome::Succeeded => Level::Info,
            ResponseOutcome::Partial => Level::Debug,
        }
    }
}

/// Logs a response at the level picked by `ResponseOutcome` and returns the outcome.
fn log_response(
    action: &str,
    detail: &str,
    has_payload: bool,
    info: Option<&RspInfo>,
    request_id: i32,
    is_last: bool,
) -> ResponseOutcome {
    let outcome = ResponseOutcome::classify(has_payload, info, is_last);
    let level = outcome.level();
    match (outcome, info) {
        (ResponseOutcome::Failed, Some(info)) => log!(
            level,
            "Feed {} failed! RequestID:{},IsLast:{},ErrorID:{},ErrorMsg:{}",
            action,
            request_id,
            is_last,
            info.error_id,
            info.error_msg
        ),
        _ => log!(
            level,
            "Feed {} {}! RequestID:{},IsLast:{}{}",
            action,
            if outcome == ResponseOutcome::Succeeded { "success" } else { "response" },
            request_id,
            is_last,
            detail
        ),
    }
    outcome
}

fn instrument_detail(instrument: Option<&SpecificInstrument>) -> String {
    instrument
        .map(|i| format!(",InstrumentID:{}", i.instrument_id))
        .unwrap_or_default()
}

/// Thread-safe event-kind → handler registry driven by the feed thread.
#[derive(Default)]
pub struct FeedDispatcher {
    handlers: Mutex<HashMap<EventKind, Handler>>,
}

impl FeedDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `handler`, replacing any handler of the same kind.
    pub fn register(&self, handler: Handler) {
        let kind = handler.kind();
        let previous = self.table().insert(kind, handler);
        debug!(
            "Handler for {} {}",
            kind,
            if previous.is_some() { "replaced" } else { "registered" }
        );
    }

    /// Removes the handler of `kind`, if any.
    pub fn clear(&self, kind: EventKind) {
        self.table().remove(&kind);
    }

    /// Removes every handler.
    ///
    /// Once this returns no handler will be invoked until a new one is registered.
    pub fn clear_all(&self) {
        self.table().clear();
        debug!("All feed handlers cleared");
    }

    pub fn is_registered(&self, kind: EventKind) -> bool {
        self.table().contains_key(&kind)
    }

    fn table(&self) -> MutexGuard<'_, HashMap<EventKind, Handler>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `invoke` on the handler of `kind` while the table lock is held.
    ///
    /// A missing handler is a silent no-op. A panicking handler is logged and
    /// swallowed so it never unwinds into the feed thread.
    fn dispatch(&self, kind: EventKind, invoke: impl FnOnce(&mut Handler)) {
        let mut table = self.table();
        if let Some(handler) = table.get_mut(&kind) {
            if panic::catch_unwind(AssertUnwindSafe(|| invoke(handler))).is_err() {
                error!("Handler for {} panicked", kind);
            }
        }
    }

    fn dispatch_instrument_response(
        &self,
        kind: EventKind,
        action: &str,
        instrument: Option<&SpecificInstrument>,
        info: Option<&RspInfo>,
        request_id: i32,
        is_last: bool,
    ) {
        log_response(
            action,
            &instrument_detail(instrument),
            instrument.is_some(),
            info,
            request_id,
            is_last,
        );
        self.dispatch(kind, |handler| match handler {
            Handler::SubscribeResult(f)
            | Handler::UnsubscribeResult(f)
            | Handler::QuoteSubscribeResult(f)
            | Handler::QuoteUnsubscribeResult(f) => f(instrument, info),
            _ => {}
        });
    }
}

impl FeedEventSink for FeedDispatcher {
    fn on_front_connected(&self) {
        info!("Feed connected to front.");
        self.dispatch(EventKind::Connected, |handler| {
            if let Handler::Connected(f) = handler {
                f();
            }
        });
    }

    fn on_front_disconnected(&self, reason: i32) {
        info!("Feed disconnected from front! Reason:{}", reason);
        self.dispatch(EventKind::Disconnected, |handler| {
            if let Handler::Disconnected(f) = handler {
                f(reason);
            }
        });
    }

    fn on_rsp_user_login(
        &self,
        login: Option<&LoginResponse>,
        info: Option<&RspInfo>,
        request_id: i32,
        is_last: bool,
    ) {
        let detail = login
            .map(|l| format!(",TradingDay:{},SessionID:{}", l.trading_day, l.session_id))
            .unwrap_or_default();
        log_response("Login", &detail, login.is_some(), info, request_id, is_last);
        self.dispatch(EventKind::LoginResult, |handler| {
            if let Handler::LoginResult(f) = handler {
                f(login, info);
            }
        });
    }

    fn on_rsp_user_logout(
        &self,
        logout: Option<&LogoutResponse>,
        info: Option<&RspInfo>,
        request_id: i32,
        is_last: bool,
    ) {
        log_response("Logout", "", logout.is_some(), info, request_id, is_last);
        self.dispatch(EventKind::LogoutResult, |handler| {
            if let Handler::LogoutResult(f) = handler {
                f(logout, info);
            }
        });
    }

    fn on_rsp_error(&self, info: Option<&RspInfo>, request_id: i32, is_last: bool) {
        match info {
            Some(i) => error!(
                "Feed error happened RequestID:{},IsLast:{},ErrorID:{},ErrorMsg:{}",
                request_id, is_last, i.error_id, i.error_msg
            ),
            None => error!("Feed error happened RequestID:{},IsLast:{}", request_id, is_last),
        }
        self.dispatch(EventKind::Error, |handler| {
            if let Handler::Error(f) = handler {
                f(info);
            }
        });
    }

    fn on_rsp_sub_market_data(
        &self,
        instrument: Option<&SpecificInstrument>,
        info: Option<&RspInfo>,
        request_id: i32,
        is_last: bool,
    ) {
        self.dispatch_instrument_response(
            EventKind::SubscribeResult,
            "SubMarketData",
            instrument,
            info,
            request_id,
            is_last,
        );
    }

    fn on_rsp_unsub_market_data(
        &self,
        instrument: Option<&SpecificInstrument>,
        info: Option<&RspInfo>,
        request_id: i32,
        is_last: bool,
    ) {
        self.dispatch_instrument_response(
            EventKind::UnsubscribeResult,
            "UnSubMarketData",
            instrument,
            info,
            request_id,
            is_last,
        );
    }

    fn on_rsp_sub_for_quote(
        &self,
        instrument: Option<&SpecificInstrument>,
        info: Option<&RspInfo>,
        request_id: i32,
        is_last: bool,
    ) {
        self.dispatch_instrument_response(
            EventKind::QuoteSubscribeResult,
            "SubForQuote",
            instrument,
            info,
            request_id,
            is_last,
        );
    }

    fn on_rsp_unsub_for_quote(
        &self,
        instrument: Option<&SpecificInstrument>,
        info: Option<&RspInfo>,
        request_id: i32,
        is_last: bool,
    ) {
        self.dispatch_instrument_response(
            EventKind::QuoteUnsubscribeResult,
            "UnSubForQuote",
            instrument,
            info,
            request_id,
            is_last,
        );
    }

    fn on_rtn_depth_market_data(&self, tick: Tick) {
        debug!(
            "Feed receive MarketData. InstrumentID:{},ExchangeID:{},LastPrice:{},Volume:{},UpdateTime:{}.{:03}",
            tick.instrument_id,
            tick.exchange_id,
            tick.last_price,
            tick.volume,
            tick.update_time,
            tick.update_millisec
        );
        // Outside trading hours the feed keeps sending snapshots with zero volume.
        if !tick.is_trading() {
            return;
        }
        self.dispatch(EventKind::Tick, move |handler| {
            if let Handler::Tick(f) = handler {
                f(tick);
            }
        });
    }

    fn on_rtn_for_quote_rsp(&self, quote: &ForQuoteResponse) {
        debug!("Feed receive QuoteRsp. InstrumentID:{}", quote.instrument_id);
        self.dispatch(EventKind::Quote, |handler| {
            if let Handler::Quote(f) = handler {
                f(quote);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use strum::IntoEnumIterator;

    fn counting_tick_handler(counter: &Arc<AtomicUsize>) -> Handler {
        let counter = Arc::clone(counter);
        Handler::tick(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn tick(volume: i64) -> Tick {
        let mut tick = Tick::new("IF2012", "ticks");
        tick.volume = volume;
        tick
    }

    #[test]
    fn classify_prefers_error_code() {
        let err = RspInfo::new(7, "bad");
        let ok = RspInfo::default();

        assert_eq!(ResponseOutcome::classify(true, Some(&err), true), ResponseOutcome::Failed);
        assert_eq!(ResponseOutcome::classify(false, Some(&err), false), ResponseOutcome::Failed);
        assert_eq!(ResponseOutcome::classify(true, Some(&ok), true), ResponseOutcome::Succeeded);
        assert_eq!(ResponseOutcome::classify(true, None, true), ResponseOutcome::Succeeded);
        assert_eq!(ResponseOutcome::classify(true, None, false), ResponseOutcome::Partial);
        assert_eq!(ResponseOutcome::classify(false, None, true), ResponseOutcome::Partial);
    }

    #[test]
    fn handler_kind_matches_variant() {
        assert_eq!(Handler::connected(|| {}).kind(), EventKind::Connected);
        assert_eq!(Handler::tick(|_| {}).kind(), EventKind::Tick);
        assert_eq!(Handler::quote(|_| {}).kind(), EventKind::Quote);
        assert_eq!(
            Handler::quote_unsubscribe_result(|_, _| {}).kind(),
            EventKind::QuoteUnsubscribeResult
        );
    }

    #[test]
    fn missing_handler_is_a_noop() {
        let dispatcher = FeedDispatcher::new();
        dispatcher.on_front_connected();
        dispatcher.on_rtn_depth_market_data(tick(5));
        dispatcher.on_rsp_error(None, 1, true);
    }

    #[test]
    fn zero_volume_ticks_are_filtered() {
        let dispatcher = FeedDispatcher::new();
        let counter = Arc::new(AtomicUsize::new(0));
        dispatcher.register(counting_tick_handler(&counter));

        dispatcher.on_rtn_depth_market_data(tick(0));
        dispatcher.on_rtn_depth_market_data(tick(10));
        dispatcher.on_rtn_depth_market_data(tick(0));

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn register_replaces_previous_handler() {
        let dispatcher = FeedDispatcher::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        dispatcher.register(counting_tick_handler(&first));
        dispatcher.on_rtn_depth_market_data(tick(1));
        dispatcher.register(counting_tick_handler(&second));
        dispatcher.on_rtn_depth_market_data(tick(1));

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clear_all_silences_every_kind() {
        let dispatcher = FeedDispatcher::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        dispatcher.register(Handler::connected(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        dispatcher.register(counting_tick_handler(&counter));

        dispatcher.clear_all();
        for kind in EventKind::iter() {
            assert!(!dispatcher.is_registered(kind));
        }

        dispatcher.on_front_connected();
        dispatcher.on_rtn_depth_market_data(tick(3));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn clear_removes_one_kind() {
        let dispatcher = FeedDispatcher::new();
        dispatcher.register(Handler::connected(|| {}));
        dispatcher.register(Handler::tick(|_| {}));

        dispatcher.clear(EventKind::Tick);

        assert!(dispatcher.is_registered(EventKind::Connected));
        assert!(!dispatcher.is_registered(EventKind::Tick));
    }

    #[test]
    fn failed_response_is_still_forwarded() {
        let dispatcher = FeedDispatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        dispatcher.register(Handler::subscribe_result(move |instrument, info| {
            s.lock().unwrap().push((
                instrument.map(|i| i.instrument_id.clone()),
                info.map(|i| i.error_id),
            ));
        }));

        let instrument = SpecificInstrument::new("IF2012");
        dispatcher.on_rsp_sub_market_data(Some(&instrument), None, 1, true);
        dispatcher.on_rsp_sub_market_data(Some(&instrument), Some(&RspInfo::new(16, "no such instrument")), 2, true);

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (Some(String::from("IF2012")), None),
                (Some(String::from("IF2012")), Some(16)),
            ]
        );
    }

    #[test]
    fn panicking_handler_does_not_poison_dispatch() {
        let dispatcher = FeedDispatcher::new();
        dispatcher.register(Handler::connected(|| panic!("handler bug")));
        dispatcher.on_front_connected();

        let counter = Arc::new(AtomicUsize::new(0));
        dispatcher.register(counting_tick_handler(&counter));
        dispatcher.on_rtn_depth_market_data(tick(1));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn other_kinds_are_forwarded() {
        let dispatcher = FeedDispatcher::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&counter);
        dispatcher.register(Handler::disconnected(move |reason| {
            assert_eq!(reason, 4097);
            c.fetch_add(1, Ordering::SeqCst);
        }));
        let c = Arc::clone(&counter);
        dispatcher.register(Handler::quote(move |quote| {
            assert_eq!(quote.instrument_id, "IF2012");
            c.fetch_add(1, Ordering::SeqCst);
        }));
        let c = Arc::clone(&counter);
        dispatcher.register(Handler::logout_result(move |logout, _| {
            assert!(logout.is_some());
            c.fetch_add(1, Ordering::SeqCst);
        }));

        dispatcher.on_front_disconnected(4097);
        dispatcher.on_rtn_for_quote_rsp(&ForQuoteResponse {
            instrument_id: String::from("IF2012"),
            ..Default::default()
        });
        dispatcher.on_rsp_user_logout(Some(&LogoutResponse::default()), None, 3, true);

        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }
}
