use std::sync::{Arc, Mutex, OnceLock};

use log::{Level, LevelFilter, Log, Metadata, Record};
use tick_common::feed::{LoginResponse, RspInfo};
use tick_recorder::{FeedDispatcher, FeedEventSink, Handler};

/// Timeline shared by the logger and the handler under test.
fn timeline() -> &'static Mutex<Vec<(Option<Level>, String)>> {
    static TIMELINE: OnceLock<Mutex<Vec<(Option<Level>, String)>>> = OnceLock::new();
    TIMELINE.get_or_init(|| Mutex::new(Vec::new()))
}

struct CaptureLogger;

static LOGGER: CaptureLogger = CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        timeline()
            .lock()
            .unwrap()
            .push((Some(record.level()), record.args().to_string()));
    }

    fn flush(&self) {}
}

#[test]
fn login_results_are_logged_then_forwarded() {
    log::set_logger(&LOGGER).unwrap();
    log::set_max_level(LevelFilter::Trace);

    let dispatcher = FeedDispatcher::new();
    let received = Arc::new(Mutex::new(Vec::new()));
    let r = Arc::clone(&received);
    dispatcher.register(Handler::login_result(move |login, info| {
        r.lock()
            .unwrap()
            .push((login.cloned(), info.map(|i| i.error_id)));
        timeline().lock().unwrap().push((None, String::from("handler")));
    }));

    let login = LoginResponse {
        trading_day: String::from("20201201"),
        session_id: 42,
        ..Default::default()
    };
    dispatcher.on_rsp_user_login(Some(&login), Some(&RspInfo::default()), 1, true);
    {
        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].0.as_ref().map(|l| l.session_id), Some(42));
    }

    timeline().lock().unwrap().clear();
    dispatcher.on_rsp_user_login(None, Some(&RspInfo::new(3, "invalid password")), 2, true);

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 2);
    assert_eq!(received[1], (None, Some(3)));

    let timeline = timeline().lock().unwrap();
    let error_at = timeline
        .iter()
        .position(|(level, msg)| *level == Some(Level::Error) && msg.contains("ErrorID:3"))
        .expect("failure must be logged at error level");
    let handler_at = timeline
        .iter()
        .position(|(level, msg)| level.is_none() && msg == "handler")
        .expect("handler must run");
    assert!(error_at < handler_at);
}
