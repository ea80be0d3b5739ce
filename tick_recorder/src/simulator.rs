//! Simulated market-data feed.
//!
//! `SimulatedFeed` plays the part of an exchange binding: it owns a delivery thread
//! and calls a `FeedEventSink` the way a real feed would. After the session events
//! (connected, login, one subscription response per instrument) it emits one tick per
//! instrument every `tick_interval`, moving prices with a small random walk. About one
//! tick in ten has zero volume, like snapshots sent outside trading hours.
//!
//! `stop()` emits a logout response and a disconnect before joining the thread.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Local;
use crossbeam_channel::{Sender, bounded, select};
use log::{error, info};
use rand::Rng;
use tick_common::feed::{LoginResponse, LogoutResponse, SpecificInstrument};
use tick_common::{RecorderError, Result, Tick};

use crate::feed::FeedEventSink;

const INITIAL_PRICE: f64 = 3500.0;
/// Reason code reported on a voluntary disconnect.
pub const DISCONNECT_REASON_CLOSED: i32 = 0x1001;

/// What the simulated feed publishes.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub instruments: Vec<String>,
    pub exchange_id: String,
    pub destination_id: String,
    pub tick_interval: Duration,
}

/// Background thread driving a `FeedEventSink`.
pub struct SimulatedFeed {
    handle: Option<JoinHandle<()>>,
    stop_tx: Sender<()>,
}

impl SimulatedFeed {
    /// Starts the delivery thread.
    pub fn start(sink: Arc<dyn FeedEventSink>, settings: FeedSettings) -> Result<Self> {
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let handle = thread::Builder::new()
            .name(String::from("feed-sim"))
            .spawn(move || {
                info!("Simulated feed started (Thread ID: {:?})", thread::current().id());
                open_session(sink.as_ref(), &settings);

                let mut state = PriceState::new(&settings.instruments);
                loop {
                    for instrument in &settings.instruments {
                        let tick = state.next_tick(instrument, &settings);
                        sink.on_rtn_depth_market_data(tick);
                    }
                    select! {
                        recv(stop_rx) -> _ => break,
                        default(settings.tick_interval) => {}
                    }
                }

                close_session(sink.as_ref());
                info!("Simulated feed stopped");
            })?;

        Ok(Self {
            handle: Some(handle),
            stop_tx,
        })
    }

    /// Signals the delivery thread and waits for it to finish.
    pub fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let _ = self.stop_tx.try_send(());
        handle.join().map_err(|_| {
            error!("Simulated feed thread panicked");
            RecorderError::WorkerPanicked
        })
    }
}

impl Drop for SimulatedFeed {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("Simulated feed stop failed: {}", e);
        }
    }
}

fn open_session(sink: &dyn FeedEventSink, settings: &FeedSettings) {
    sink.on_front_connected();

    let login = LoginResponse {
        trading_day: Local::now().format("%Y%m%d").to_string(),
        login_time: Local::now().format("%H:%M:%S").to_string(),
        broker_id: String::from("sim"),
        user_id: String::from("sim"),
        front_id: 1,
        session_id: 1,
    };
    sink.on_rsp_user_login(Some(&login), None, 1, true);

    let count = settings.instruments.len();
    for (i, instrument) in settings.instruments.iter().enumerate() {
        let instrument = SpecificInstrument::new(instrument);
        sink.on_rsp_sub_market_data(Some(&instrument), None, 2, i + 1 == count);
    }
}

fn close_session(sink: &dyn FeedEventSink) {
    let logout = LogoutResponse {
        broker_id: String::from("sim"),
        user_id: String::from("sim"),
    };
    sink.on_rsp_user_logout(Some(&logout), None, 3, true);
    sink.on_front_disconnected(DISCONNECT_REASON_CLOSED);
}

/// Per-instrument session state of the random walk.
struct Session {
    open: f64,
    last: f64,
    high: f64,
    low: f64,
    volume: i64,
    turnover: f64,
}

impl Session {
    fn new() -> Self {
        Session {
            open: INITIAL_PRICE,
            last: INITIAL_PRICE,
            high: INITIAL_PRICE,
            low: INITIAL_PRICE,
            volume: 0,
            turnover: 0.0,
        }
    }
}

struct PriceState {
    sessions: HashMap<String, Session>,
}

impl PriceState {
    fn new(instruments: &[String]) -> Self {
        let sessions = instruments
            .iter()
            .map(|i| (i.clone(), Session::new()))
            .collect();
        Self { sessions }
    }

    fn next_tick(&mut self, instrument: &str, settings: &FeedSettings) -> Tick {
        let mut rng = rand::rng();
        let session = self
            .sessions
            .entry(String::from(instrument))
            .or_insert_with(Session::new);

        let previous = session.last;
        let price = next_price(previous);
        let volume = if rng.random_range(0..10) == 0 {
            0
        } else {
            rng.random_range(1..500)
        };

        session.last = price;
        session.high = session.high.max(price);
        session.low = session.low.min(price);
        session.volume += volume;
        session.turnover += price * volume as f64;

        let now = Local::now();
        let mut tick = Tick::new(instrument, &settings.destination_id);
        tick.exchange_id = settings.exchange_id.clone();
        tick.exchange_inst_id = String::from(instrument);
        tick.trading_day = now.format("%Y%m%d").to_string();
        tick.action_day = now.format("%Y-%m-%d").to_string();
        tick.action_time = now.format("%H:%M:%S").to_string();
        tick.update_time = now.format("%H:%M:%S").to_string();
        tick.update_millisec = now.timestamp_subsec_millis() as i32;
        tick.last_price = price;
        tick.open = previous;
        tick.close = price;
        tick.high = previous.max(price);
        tick.low = previous.min(price);
        tick.open_price = session.open;
        tick.highest_price = session.high;
        tick.lowest_price = session.low;
        tick.pre_settlement_price = INITIAL_PRICE;
        tick.pre_close_price = INITIAL_PRICE;
        tick.upper_limit_price = INITIAL_PRICE * 1.1;
        tick.lower_limit_price = INITIAL_PRICE * 0.9;
        tick.average_price = if session.volume > 0 {
            session.turnover / session.volume as f64
        } else {
            price
        };
        tick.volume = volume;
        tick.market_volume = session.volume;
        tick.turnover = session.turnover;
        tick.bid_price1 = price - 0.2;
        tick.ask_price1 = price + 0.2;
        tick.bid_volume1 = rng.random_range(1..50);
        tick.ask_volume1 = rng.random_range(1..50);
        tick.bid_price2 = price - 0.4;
        tick.ask_price2 = price + 0.4;
        tick.bid_volume2 = rng.random_range(1..50);
        tick.ask_volume2 = rng.random_range(1..50);
        tick
    }
}

/// Next price of a ±1% random walk, never below 0.01.
pub fn next_price(current_price: f64) -> f64 {
    let mut rng = rand::rng();
    let change: f64 = rng.random_range(-0.01..0.01);
    let new_price = current_price * (1.0 + change);
    new_price.max(0.01)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{FeedDispatcher, Handler};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn next_price_stays_within_one_percent() {
        for _ in 0..1000 {
            let price = next_price(100.0);
            assert!((99.0..=101.0).contains(&price));
        }
        assert!(next_price(0.0) >= 0.01);
    }

    #[test]
    fn session_state_accumulates() {
        let settings = FeedSettings {
            instruments: vec![String::from("IF2012")],
            exchange_id: String::from("CFFEX"),
            destination_id: String::from("ticks"),
            tick_interval: Duration::from_millis(1),
        };
        let mut state = PriceState::new(&settings.instruments);

        let mut total = 0;
        for _ in 0..50 {
            let tick = state.next_tick("IF2012", &settings);
            total += tick.volume;
            assert_eq!(tick.market_volume, total);
            assert!(tick.highest_price >= tick.lowest_price);
            assert_eq!(tick.destination_id, "ticks");
        }
    }

    #[test]
    fn drives_session_and_ticks_through_dispatcher() {
        let dispatcher = Arc::new(FeedDispatcher::new());
        let ticks = Arc::new(AtomicUsize::new(0));
        let events = Arc::new(Mutex::new(Vec::new()));

        let t = Arc::clone(&ticks);
        dispatcher.register(Handler::tick(move |tick| {
            assert!(tick.is_trading());
            t.fetch_add(1, Ordering::SeqCst);
        }));
        let e = Arc::clone(&events);
        dispatcher.register(Handler::login_result(move |login, _| {
            e.lock().unwrap().push(format!("login:{}", login.is_some()));
        }));
        let e = Arc::clone(&events);
        dispatcher.register(Handler::disconnected(move |reason| {
            e.lock().unwrap().push(format!("disconnected:{}", reason));
        }));

        let mut feed = SimulatedFeed::start(
            dispatcher.clone(),
            FeedSettings {
                instruments: vec![String::from("IF2012"), String::from("IC2012")],
                exchange_id: String::from("CFFEX"),
                destination_id: String::from("ticks"),
                tick_interval: Duration::from_millis(2),
            },
        )
        .unwrap();
        thread::sleep(Duration::from_millis(100));
        feed.stop().unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.first().map(String::as_str), Some("login:true"));
        assert_eq!(
            events.last().cloned(),
            Some(format!("disconnected:{}", DISCONNECT_REASON_CLOSED))
        );
        assert!(ticks.load(Ordering::SeqCst) > 0);
    }
}
