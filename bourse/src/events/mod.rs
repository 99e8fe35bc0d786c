use bourse_protocol::{
    admin::{
        HaltPhaseReply, HaltPhaseRequest, HaltPhaseResult, ResumePhaseReply, ResumePhaseRequest,
        ResumePhaseResult,
    },
    phase::TradingPhase,
};
use chrono::{DateTime, Utc};
use clock::TzClock;
use parking_lot::Mutex;
use schedule::PhaseSchedule;
use std::{sync::Arc, time::Duration};
use tokio::sync::watch;
use tracing::{debug, info};

/// Timezone-aware venue clock.
pub mod clock;

/// Trading-phase schedule over venue-local time.
pub mod schedule;

/// Event-loop cadence. The schedule granularity is whole seconds, so one tick per second
/// is sufficient to observe every phase boundary.
const LOOP_PERIOD: Duration = Duration::from_secs(1);

/// Periodic event emitted once per event-loop period.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Tick {
    pub time: DateTime<Utc>,
}

/// Emitted when the venue moves into a new trading phase.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PhaseTransition {
    pub phase: TradingPhase,
    pub allow_cancels: bool,
    pub time: DateTime<Utc>,
}

type TickListener = Box<dyn Fn(&Tick) + Send + Sync>;
type PhaseListener = Box<dyn Fn(&PhaseTransition) + Send + Sync>;

#[derive(Debug, Copy, Clone)]
struct HaltState {
    allow_cancels: bool,
}

struct ControllerState {
    clock: TzClock,
    schedule: PhaseSchedule,
    tick_listeners: Vec<TickListener>,
    phase_listeners: Vec<PhaseListener>,
    last_scheduled: Option<TradingPhase>,
    halt: Option<HaltState>,
}

impl ControllerState {
    fn emit_tick(&self, tick: Tick) {
        for listener in &self.tick_listeners {
            listener(&tick);
        }
    }

    fn emit_phase_transition(&self, transition: PhaseTransition) {
        info!(
            phase = %transition.phase,
            allow_cancels = transition.allow_cancels,
            "trading phase transition"
        );
        for listener in &self.phase_listeners {
            listener(&transition);
        }
    }
}

impl std::fmt::Debug for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerState")
            .field("last_scheduled", &self.last_scheduled)
            .field("halt", &self.halt)
            .finish()
    }
}

/// Drives the venue's internal event system.
///
/// Owns the timezone clock and the phase schedule; a cooperative loop task fires once per
/// [`LOOP_PERIOD`], emitting a [`Tick`] to every bound listener and a [`PhaseTransition`]
/// at each schedule boundary crossing. Admin halt/resume requests are serviced on the
/// caller's thread and suppress scheduled transitions while the halt is in force.
#[derive(Debug, Clone)]
pub struct EventController {
    state: Arc<Mutex<ControllerState>>,
}

impl EventController {
    pub fn new(clock: TzClock, schedule: PhaseSchedule) -> Self {
        Self {
            state: Arc::new(Mutex::new(ControllerState {
                clock,
                schedule,
                tick_listeners: Vec::new(),
                phase_listeners: Vec::new(),
                last_scheduled: None,
                halt: None,
            })),
        }
    }

    /// Register a callback invoked on every [`Tick`].
    pub fn bind_tick_listener<F>(&self, listener: F) -> &Self
    where
        F: Fn(&Tick) + Send + Sync + 'static,
    {
        self.state.lock().tick_listeners.push(Box::new(listener));
        self
    }

    /// Register a callback invoked on every [`PhaseTransition`].
    pub fn bind_phase_listener<F>(&self, listener: F) -> &Self
    where
        F: Fn(&PhaseTransition) + Send + Sync + 'static,
    {
        self.state.lock().phase_listeners.push(Box::new(listener));
        self
    }

    /// Derive the phase in force right now and prime the boundary detector with it.
    ///
    /// Called once at startup so engines begin in the scheduled phase without waiting for
    /// the first loop iteration.
    pub fn initial_transition(&self) -> PhaseTransition {
        let mut state = self.state.lock();
        let time = state.clock.local_time();
        let entry = state.schedule.entry_at(time);
        let phase = state.schedule.phase_at(time);
        let allow_cancels = entry.is_some_and(|entry| entry.allow_cancels);
        state.last_scheduled = Some(phase);

        PhaseTransition {
            phase,
            allow_cancels,
            time: Utc::now(),
        }
    }

    /// Spawn the event-loop task on the given runtime.
    pub fn run(&self, handle: &tokio::runtime::Handle, mut shutdown_rx: watch::Receiver<bool>) {
        let controller = self.clone();
        handle.spawn(async move {
            let mut interval = tokio::time::interval(LOOP_PERIOD);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => controller.poll(),
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("event loop terminated");
        });
    }

    /// One event-loop iteration: emit the tick and any crossed phase boundary.
    pub(crate) fn poll(&self) {
        let mut state = self.state.lock();
        let now = Utc::now();
        state.emit_tick(Tick { time: now });

        if state.halt.is_some() {
            // Scheduled transitions stay suppressed until the halt is resumed.
            return;
        }

        let time = state.clock.local_time();
        let scheduled = state.schedule.phase_at(time);
        if state.last_scheduled != Some(scheduled) {
            let allow_cancels = state
                .schedule
                .entry_at(time)
                .is_some_and(|entry| entry.allow_cancels);
            state.last_scheduled = Some(scheduled);
            state.emit_phase_transition(PhaseTransition {
                phase: scheduled,
                allow_cancels,
                time: now,
            });
        }
    }

    /// Service an admin halt request.
    ///
    /// Halting is only permitted from an active [`TradingPhase::Open`] window; auctions
    /// can not be interrupted and outside every window there is no phase to halt.
    pub fn process_halt(&self, request: HaltPhaseRequest) -> HaltPhaseReply {
        let mut state = self.state.lock();

        if state.halt.is_some() {
            return HaltPhaseReply::new(HaltPhaseResult::AlreadyHaltedByRequest);
        }

        let time = state.clock.local_time();
        let result = match state.schedule.entry_at(time) {
            None => return HaltPhaseReply::new(HaltPhaseResult::NoActivePhase),
            Some(entry) if entry.phase != TradingPhase::Open => {
                return HaltPhaseReply::new(HaltPhaseResult::UnableToHalt);
            }
            Some(_) => HaltPhaseResult::Halted,
        };

        state.halt = Some(HaltState {
            allow_cancels: request.allow_cancels,
        });
        state.emit_phase_transition(PhaseTransition {
            phase: TradingPhase::Halted,
            allow_cancels: request.allow_cancels,
            time: Utc::now(),
        });

        HaltPhaseReply::new(result)
    }

    /// Service an admin resume request, re-deriving the scheduled phase for now.
    pub fn process_resume(&self, _: ResumePhaseRequest) -> ResumePhaseReply {
        let mut state = self.state.lock();

        if state.halt.take().is_none() {
            return ResumePhaseReply::new(ResumePhaseResult::NoRequestedHalt);
        }

        let time = state.clock.local_time();
        let scheduled = state.schedule.phase_at(time);
        let allow_cancels = state
            .schedule
            .entry_at(time)
            .is_some_and(|entry| entry.allow_cancels);
        state.last_scheduled = Some(scheduled);
        state.emit_phase_transition(PhaseTransition {
            phase: scheduled,
            allow_cancels,
            time: Utc::now(),
        });

        ResumePhaseReply::new(ResumePhaseResult::Resumed)
    }
}

#[cfg(test)]
mod tests {
    use super::{schedule::PhaseScheduleEntry, *};
    use chrono::NaiveTime;

    fn all_day(phase: TradingPhase) -> PhaseSchedule {
        PhaseSchedule::new(vec![PhaseScheduleEntry::new(
            phase,
            NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
        )])
    }

    fn controller(schedule: PhaseSchedule) -> (EventController, Arc<Mutex<Vec<PhaseTransition>>>) {
        let controller = EventController::new(TzClock::utc(), schedule);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        controller.bind_phase_listener(move |transition| sink.lock().push(*transition));
        (controller, seen)
    }

    #[test]
    fn test_halt_then_halt_again() {
        let (controller, seen) = controller(all_day(TradingPhase::Open));

        let first = controller.process_halt(HaltPhaseRequest::new(true));
        assert_eq!(first.result, HaltPhaseResult::Halted);

        let second = controller.process_halt(HaltPhaseRequest::new(false));
        assert_eq!(second.result, HaltPhaseResult::AlreadyHaltedByRequest);

        let transitions = seen.lock();
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].phase, TradingPhase::Halted);
        assert!(transitions[0].allow_cancels);
    }

    #[test]
    fn test_resume_without_halt() {
        let (controller, _) = controller(all_day(TradingPhase::Open));

        let reply = controller.process_resume(ResumePhaseRequest);
        assert_eq!(reply.result, ResumePhaseResult::NoRequestedHalt);
    }

    #[test]
    fn test_halt_resume_round_trip() {
        let (controller, seen) = controller(all_day(TradingPhase::Open));

        assert_eq!(
            controller.process_halt(HaltPhaseRequest::new(false)).result,
            HaltPhaseResult::Halted
        );
        assert_eq!(
            controller.process_resume(ResumePhaseRequest).result,
            ResumePhaseResult::Resumed
        );
        assert_eq!(
            controller.process_resume(ResumePhaseRequest).result,
            ResumePhaseResult::NoRequestedHalt
        );

        let transitions = seen.lock();
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[1].phase, TradingPhase::Open);
    }

    #[test]
    fn test_halt_with_no_active_phase() {
        let (controller, _) = controller(PhaseSchedule::default());

        assert_eq!(
            controller.process_halt(HaltPhaseRequest::new(false)).result,
            HaltPhaseResult::NoActivePhase
        );
    }

    #[test]
    fn test_halt_during_auction_is_refused() {
        let (controller, _) = controller(all_day(TradingPhase::OpeningAuction));

        assert_eq!(
            controller.process_halt(HaltPhaseRequest::new(false)).result,
            HaltPhaseResult::UnableToHalt
        );
    }

    #[test]
    fn test_poll_suppresses_scheduled_transitions_while_halted() {
        let (controller, seen) = controller(all_day(TradingPhase::Open));

        // Prime with the scheduled phase, then halt.
        let initial = controller.initial_transition();
        assert_eq!(initial.phase, TradingPhase::Open);
        controller.process_halt(HaltPhaseRequest::new(false));

        controller.poll();
        let transitions = seen.lock();
        assert_eq!(transitions.len(), 1, "only the halt transition is emitted");
    }

    #[test]
    fn test_poll_emits_tick_to_bound_listeners() {
        let (controller, _) = controller(all_day(TradingPhase::Open));
        let ticks = Arc::new(Mutex::new(0_usize));
        let sink = Arc::clone(&ticks);
        controller.bind_tick_listener(move |_| *sink.lock() += 1);

        controller.initial_transition();
        controller.poll();
        controller.poll();

        assert_eq!(*ticks.lock(), 2);
    }
}
