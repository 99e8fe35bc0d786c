use bourse::{config::Config, middleware::TradingReplyReceiver};
use bourse_instrument::{
    cache::Cache,
    instrument::{Instrument, SecurityType, Symbol},
    sources::MemorySource,
};
use bourse_protocol::{
    TradingReply,
    phase::TradingPhase,
    session::{FixSession, Session},
};
use chrono::NaiveTime;
use parking_lot::{Mutex, MutexGuard};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

/// The middleware channel slots are process-wide; tests constructing a `TradingSystem`
/// must not interleave.
static SYSTEM_GUARD: Mutex<()> = Mutex::new(());

pub fn system_guard() -> MutexGuard<'static, ()> {
    SYSTEM_GUARD.lock()
}

/// Reply-channel receiver recording every message for later inspection.
#[derive(Debug, Default)]
pub struct RecordingReplyReceiver {
    replies: Mutex<Vec<TradingReply>>,
}

impl RecordingReplyReceiver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn replies(&self) -> Vec<TradingReply> {
        self.replies.lock().clone()
    }

    pub fn clear(&self) {
        self.replies.lock().clear();
    }

    /// Block until the recorded replies satisfy the predicate, or panic on timeout.
    pub fn wait_for<F>(&self, description: &str, predicate: F) -> Vec<TradingReply>
    where
        F: Fn(&[TradingReply]) -> bool,
    {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            {
                let replies = self.replies.lock();
                if predicate(&replies) {
                    return replies.clone();
                }
                if Instant::now() > deadline {
                    panic!("timed out waiting for {description}, recorded: {replies:#?}");
                }
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    pub fn wait_for_count(&self, count: usize) -> Vec<TradingReply> {
        self.wait_for(&format!("{count} replies"), |replies| replies.len() >= count)
    }
}

impl TradingReplyReceiver for RecordingReplyReceiver {
    fn process(&self, reply: TradingReply) {
        self.replies.lock().push(reply);
    }
}

pub fn listing(symbol: &str) -> Instrument {
    Instrument {
        symbol: Some(Symbol::new(symbol)),
        security_type: Some(SecurityType::CommonStock),
        ..Default::default()
    }
}

pub fn cache_of(instruments: Vec<Instrument>) -> Cache {
    let mut cache = Cache::new();
    cache.load(&MemorySource::new(instruments));
    cache
}

/// Venue configuration with a single all-day open phase.
pub fn open_venue_config() -> Config {
    Config {
        trading_phases_schedule: vec![bourse::events::schedule::PhaseScheduleEntry::new(
            TradingPhase::Open,
            NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
        )],
        ..Config::default()
    }
}

pub fn fix_session(sender: &str) -> Session {
    Session::Fix(FixSession::fix44(sender, "BOURSE"))
}
