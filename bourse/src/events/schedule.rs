use bourse_protocol::phase::TradingPhase;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// One scheduled phase window over venue-local time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PhaseScheduleEntry {
    pub phase: TradingPhase,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Optional randomisation window (seconds) applied by some venues to auction ends.
    #[serde(default)]
    pub end_time_range: Option<u32>,
    #[serde(default)]
    pub allow_cancels: bool,
}

impl PhaseScheduleEntry {
    pub fn new(phase: TradingPhase, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            phase,
            start_time,
            end_time,
            end_time_range: None,
            allow_cancels: false,
        }
    }

    fn contains(&self, time: NaiveTime) -> bool {
        self.start_time <= time && time < self.end_time
    }
}

/// Ordered sequence of scheduled phase windows.
///
/// Times outside every window mean the venue is closed.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PhaseSchedule {
    entries: Vec<PhaseScheduleEntry>,
}

impl PhaseSchedule {
    pub fn new(entries: Vec<PhaseScheduleEntry>) -> Self {
        Self { entries }
    }

    /// The first schedule entry covering the given venue-local time.
    pub fn entry_at(&self, time: NaiveTime) -> Option<&PhaseScheduleEntry> {
        self.entries.iter().find(|entry| entry.contains(time))
    }

    /// Scheduled phase at the given venue-local time; [`TradingPhase::Closed`] outside
    /// every window.
    pub fn phase_at(&self, time: NaiveTime) -> TradingPhase {
        self.entry_at(time)
            .map_or(TradingPhase::Closed, |entry| entry.phase)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
